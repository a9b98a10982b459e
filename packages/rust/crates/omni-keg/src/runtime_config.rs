//! Process-level settings for the `keg` binary.
//!
//! Layers, lowest to highest: built-in defaults, an optional YAML file,
//! environment variables, then explicit CLI flags (applied by the caller).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::editor::EditorConfig;
use crate::error::{KegError, KegResult};
use crate::store::KegTarget;

/// Editor command override, checked before `EDITOR`.
pub const KEG_EDITOR_ENV: &str = "KEG_EDITOR";
/// Conventional editor variable.
pub const EDITOR_ENV: &str = "EDITOR";
/// Debounce window in milliseconds for editor saves.
pub const KEG_EDIT_DEBOUNCE_MS_ENV: &str = "KEG_EDIT_DEBOUNCE_MS";
/// Default keg target (`memory:`, `file:<dir>`, or a path).
pub const KEG_TARGET_ENV: &str = "KEG_TARGET";

const DEFAULT_EDITOR: &str = "vi";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EditorSection {
    command: Option<String>,
    debounce_ms: Option<u64>,
    tick_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RuntimeConfigFile {
    keg: Option<String>,
    editor: EditorSection,
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Keg to operate on when no `--keg` flag is given.
    pub target: Option<KegTarget>,
    /// Editor integration settings.
    pub editor: EditorConfig,
}

fn parse_positive_u64(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|value| *value > 0)
}

fn first_non_empty(values: &[Option<String>]) -> Option<String> {
    values.iter().flatten().find_map(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn read_file(path: &Path) -> KegResult<RuntimeConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| KegError::from_io(path, e, &path.display().to_string()))?;
    if raw.trim().is_empty() {
        return Ok(RuntimeConfigFile::default());
    }
    serde_yaml::from_str(&raw)
        .map_err(|e| KegError::parse(format!("runtime config {}", path.display()), e))
}

impl RuntimeConfig {
    /// Resolve from an optional file and the process environment.
    ///
    /// # Errors
    ///
    /// Unreadable or malformed config file; invalid keg target.
    pub fn load(file: Option<&Path>) -> KegResult<Self> {
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Resolve with an injectable environment lookup.
    ///
    /// # Errors
    ///
    /// Same as [`RuntimeConfig::load`].
    pub fn resolve<F>(file: Option<&Path>, env: F) -> KegResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match file {
            Some(path) => read_file(path)?,
            None => RuntimeConfigFile::default(),
        };
        let defaults = EditorConfig::default();

        let command = first_non_empty(&[env(KEG_EDITOR_ENV), env(EDITOR_ENV), file.editor.command])
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string());
        let debounce_ms = env(KEG_EDIT_DEBOUNCE_MS_ENV)
            .as_deref()
            .and_then(parse_positive_u64)
            .or(file.editor.debounce_ms.filter(|value| *value > 0));
        let tick_ms = file.editor.tick_ms.filter(|value| *value > 0);

        let mut editor = EditorConfig::from_command(&command)?;
        editor.debounce = debounce_ms.map_or(defaults.debounce, Duration::from_millis);
        editor.tick = tick_ms.map_or(defaults.tick, Duration::from_millis);

        let target = first_non_empty(&[env(KEG_TARGET_ENV), file.keg])
            .map(|raw| KegTarget::parse(&raw))
            .transpose()?;

        Ok(Self { target, editor })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file_or_env() -> KegResult<()> {
        let config = RuntimeConfig::resolve(None, env_from(&[]))?;
        assert_eq!(config.editor.program, DEFAULT_EDITOR);
        assert_eq!(config.editor.debounce, Duration::from_millis(120));
        assert_eq!(config.target, None);
        Ok(())
    }

    #[test]
    fn test_env_overrides_file() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("keg.yaml");
        std::fs::write(
            &path,
            "keg: /srv/notes\neditor:\n  command: nano\n  debounce_ms: 300\n",
        )?;

        let from_file = RuntimeConfig::resolve(Some(&path), env_from(&[]))?;
        assert_eq!(from_file.editor.program, "nano");
        assert_eq!(from_file.editor.debounce, Duration::from_millis(300));
        assert_eq!(from_file.target, Some(KegTarget::Local(PathBuf::from("/srv/notes"))));

        let env = env_from(&[
            (EDITOR_ENV, "emacs"),
            (KEG_EDITOR_ENV, "code --wait"),
            (KEG_EDIT_DEBOUNCE_MS_ENV, "50"),
            (KEG_TARGET_ENV, "memory:"),
        ]);
        let layered = RuntimeConfig::resolve(Some(&path), env)?;
        assert_eq!(layered.editor.program, "code");
        assert_eq!(layered.editor.args, vec!["--wait".to_string()]);
        assert_eq!(layered.editor.debounce, Duration::from_millis(50));
        assert_eq!(layered.target, Some(KegTarget::Memory));
        Ok(())
    }

    #[test]
    fn test_bad_debounce_falls_back() -> KegResult<()> {
        let config = RuntimeConfig::resolve(None, env_from(&[(KEG_EDIT_DEBOUNCE_MS_ENV, "0")]))?;
        assert_eq!(config.editor.debounce, Duration::from_millis(120));
        Ok(())
    }
}
