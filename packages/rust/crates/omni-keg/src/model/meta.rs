//! `meta.yaml`: user-editable node metadata.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

use crate::error::{KegError, KegResult};

/// Structured node metadata.
///
/// `title`, `tags` and `lead` (alias `summary`) are recognized; every other
/// key is carried through untouched in `attrs`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMeta {
    /// Title override.
    pub title: Option<String>,
    /// Normalized, sorted, unique tags.
    pub tags: Vec<String>,
    /// Lead/summary override.
    pub lead: Option<String>,
    /// Free-form attributes.
    pub attrs: BTreeMap<String, Value>,
}

/// Normalize a tag: trim, lowercase, inner whitespace collapsed to `-`.
#[must_use]
pub fn normalize_tag(raw: &str) -> Option<String> {
    let joined = raw
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if joined.is_empty() { None } else { Some(joined) }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn parse_tags(value: &Value, subject: &str) -> KegResult<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    match value {
        Value::Null => {}
        Value::Sequence(seq) => {
            for item in seq {
                let raw = scalar_to_string(item)
                    .ok_or_else(|| KegError::parse(subject, "tags must be scalar values"))?;
                out.extend(normalize_tag(&raw));
            }
        }
        other => {
            let raw = scalar_to_string(other)
                .ok_or_else(|| KegError::parse(subject, "tags must be a list or a string"))?;
            out.extend(raw.split(',').filter_map(normalize_tag));
        }
    }
    out.sort();
    out.dedup();
    Ok(out)
}

fn parse_text_field(value: &Value, key: &str, subject: &str) -> KegResult<Option<String>> {
    match value {
        Value::Null => Ok(None),
        other => scalar_to_string(other)
            .map(|raw| non_empty(&raw))
            .ok_or_else(|| KegError::parse(subject, format!("'{key}' must be a string"))),
    }
}

impl NodeMeta {
    /// Parse and validate raw YAML. Empty input yields default metadata.
    ///
    /// # Errors
    ///
    /// Returns [`KegError::ParseFailure`] when the text is not YAML, is not a
    /// mapping, or a recognized key has the wrong shape.
    pub fn parse(raw: &str, subject: &str) -> KegResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_yaml::from_str(raw).map_err(|e| KegError::parse(subject, e))?;
        Self::from_value(&value, subject)
    }

    /// Build from an already parsed YAML value.
    ///
    /// # Errors
    ///
    /// Returns [`KegError::ParseFailure`] on a non-mapping document or bad field shapes.
    pub fn from_value(value: &Value, subject: &str) -> KegResult<Self> {
        let mapping = match value {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => mapping,
            _ => return Err(KegError::parse(subject, "expected a key/value mapping")),
        };
        let mut meta = Self::default();
        for (key, value) in mapping {
            let Some(key) = key.as_str() else {
                return Err(KegError::parse(subject, "keys must be strings"));
            };
            match key {
                "title" => meta.title = parse_text_field(value, key, subject)?,
                "lead" | "summary" => meta.lead = parse_text_field(value, key, subject)?,
                "tags" => meta.tags = parse_tags(value, subject)?,
                _ => {
                    meta.attrs.insert(key.to_string(), value.clone());
                }
            }
        }
        Ok(meta)
    }

    /// Replace tags, normalizing them.
    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = tags
            .into_iter()
            .filter_map(|tag| normalize_tag(tag.as_ref()))
            .collect();
        out.sort();
        out.dedup();
        self.tags = out;
    }

    /// Whether the node carries the given (normalized) tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        normalize_tag(tag).is_some_and(|tag| self.tags.binary_search(&tag).is_ok())
    }

    /// Render as YAML (`title`, `lead`, `tags`, then attributes).
    ///
    /// # Errors
    ///
    /// Returns [`KegError::ParseFailure`] if an attribute value cannot be serialized.
    pub fn to_yaml(&self) -> KegResult<String> {
        let mut mapping = Mapping::new();
        if let Some(title) = &self.title {
            mapping.insert(Value::from("title"), Value::from(title.as_str()));
        }
        if let Some(lead) = &self.lead {
            mapping.insert(Value::from("lead"), Value::from(lead.as_str()));
        }
        if !self.tags.is_empty() {
            let tags = self.tags.iter().map(|t| Value::from(t.as_str())).collect();
            mapping.insert(Value::from("tags"), Value::Sequence(tags));
        }
        for (key, value) in &self.attrs {
            mapping.insert(Value::from(key.as_str()), value.clone());
        }
        if mapping.is_empty() {
            return Ok(String::new());
        }
        serde_yaml::to_string(&Value::Mapping(mapping)).map_err(|e| KegError::parse("meta", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_recognized_and_extra_keys() -> Result<(), KegError> {
        let meta = NodeMeta::parse(
            "title: Rust Notes\nsummary: short\ntags: [Rust, ' Async IO ', rust]\nowner: me\n",
            "meta",
        )?;
        assert_eq!(meta.title.as_deref(), Some("Rust Notes"));
        assert_eq!(meta.lead.as_deref(), Some("short"));
        assert_eq!(meta.tags, vec!["async-io".to_string(), "rust".to_string()]);
        assert_eq!(meta.attrs.get("owner"), Some(&Value::from("me")));
        Ok(())
    }

    #[test]
    fn test_parse_comma_separated_tag_string() -> Result<(), KegError> {
        let meta = NodeMeta::parse("tags: a, b,c\n", "meta")?;
        assert_eq!(meta.tags, vec!["a", "b", "c"]);
        Ok(())
    }

    #[test]
    fn test_parse_rejects_non_mapping() {
        let err = NodeMeta::parse("- just\n- a list\n", "meta").err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::ParseFailure));
        let err = NodeMeta::parse("title: [unclosed\n", "meta").err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::ParseFailure));
    }

    #[test]
    fn test_yaml_round_trip() -> Result<(), KegError> {
        let mut meta = NodeMeta {
            title: Some("T".to_string()),
            lead: Some("L".to_string()),
            ..NodeMeta::default()
        };
        meta.set_tags(["b", "A"]);
        let reparsed = NodeMeta::parse(&meta.to_yaml()?, "meta")?;
        assert_eq!(reparsed, meta);
        Ok(())
    }
}
