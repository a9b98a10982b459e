//! Sequential node identifiers.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::KegError;

/// Node identifier: a sequential number with an optional disambiguating code.
///
/// Renders as `"<id>"` or `"<id>-<code>"`, which is also the node's directory
/// name in a filesystem keg.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NodeId {
    id: u64,
    code: Option<String>,
}

impl NodeId {
    /// The keg's permanent placeholder node.
    pub const ZERO: Self = Self { id: 0, code: None };

    /// Plain numeric id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self { id, code: None }
    }

    /// Numeric id with a disambiguating code.
    ///
    /// # Errors
    ///
    /// Returns [`KegError::Invalid`] when the code is empty or not ASCII alphanumeric.
    pub fn with_code(id: u64, code: &str) -> Result<Self, KegError> {
        validate_code(code)?;
        Ok(Self {
            id,
            code: Some(code.to_string()),
        })
    }

    /// Sequential number.
    #[must_use]
    pub const fn number(&self) -> u64 {
        self.id
    }

    /// Disambiguating code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Whether this is node `0`.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.id == 0 && self.code.is_none()
    }

    /// Directory / link path form.
    #[must_use]
    pub fn path(&self) -> String {
        self.to_string()
    }

    /// Id following this one, dropping any code.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self::new(self.id + 1)
    }
}

fn validate_code(code: &str) -> Result<(), KegError> {
    if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(KegError::invalid(
            "node id",
            format!("code '{code}' must be non-empty ASCII alphanumerics"),
        ));
    }
    Ok(())
}

impl FromStr for NodeId {
    type Err = KegError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        let (number, code) = match trimmed.split_once('-') {
            Some((number, code)) => (number, Some(code)),
            None => (trimmed, None),
        };
        if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
            return Err(KegError::invalid(
                "node id",
                format!("'{raw}' is not a non-negative integer"),
            ));
        }
        if number.len() > 1 && number.starts_with('0') {
            return Err(KegError::invalid(
                "node id",
                format!("'{raw}' has leading zeros"),
            ));
        }
        let id = number.parse::<u64>().map_err(|e| {
            KegError::invalid("node id", format!("'{raw}' is out of range: {e}"))
        })?;
        match code {
            Some(code) => Self::with_code(id, code),
            None => Ok(Self::new(id)),
        }
    }
}

impl TryFrom<String> for NodeId {
    type Error = KegError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NodeId> for String {
    fn from(value: NodeId) -> Self {
        value.to_string()
    }
}

impl From<u64> for NodeId {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}-{code}", self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id
            .cmp(&other.id)
            .then_with(|| self.code.cmp(&other.code))
    }
}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_plain_and_coded() -> Result<(), KegError> {
        assert_eq!("42".parse::<NodeId>()?, NodeId::new(42));
        let coded: NodeId = "1-0423".parse()?;
        assert_eq!(coded.number(), 1);
        assert_eq!(coded.code(), Some("0423"));
        assert_eq!(coded.path(), "1-0423");
        Ok(())
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in ["", "-1", "abc", "1-", "1-a b", "1.5", "007", "00", "01-a"] {
            let err = raw.parse::<NodeId>().err();
            assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Invalid), "{raw}");
        }
    }

    #[test]
    fn test_ordering_numeric_then_code() -> Result<(), KegError> {
        let mut ids: Vec<NodeId> = ["10", "2", "2-b", "2-a", "0"]
            .iter()
            .map(|raw| raw.parse())
            .collect::<Result<_, _>>()?;
        ids.sort();
        let rendered: Vec<String> = ids.iter().map(NodeId::path).collect();
        assert_eq!(rendered, vec!["0", "2", "2-a", "2-b", "10"]);
        Ok(())
    }
}
