//! Interactive editing: an external editor runs while the buffer file is
//! watched, and each debounced save is validated and applied to the node.

mod buffer;
mod session;
mod state;

use std::time::Duration;

use crate::error::{KegError, KegResult};

pub use self::buffer::{EditOutcome, edit_node};
pub use self::session::{EditSummary, run_edit_session};
pub use self::state::WatchState;

/// Quiescence required before a change is treated as a save.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(120);
/// Poll interval of the debounce timer.
pub const DEFAULT_TICK: Duration = Duration::from_millis(20);

/// How to launch the editor and pace the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorConfig {
    /// Executable.
    pub program: String,
    /// Arguments placed before the buffer path.
    pub args: Vec<String>,
    /// Quiescence window.
    pub debounce: Duration,
    /// Timer granularity.
    pub tick: Duration,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            program: "vi".to_string(),
            args: Vec::new(),
            debounce: DEFAULT_DEBOUNCE,
            tick: DEFAULT_TICK,
        }
    }
}

impl EditorConfig {
    /// Split a command line such as `code --wait` on whitespace.
    ///
    /// # Errors
    ///
    /// [`KegError::Invalid`] for a blank command.
    pub fn from_command(command: &str) -> KegResult<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| KegError::invalid("editor command", "command is empty"))?;
        Ok(Self {
            program,
            args: parts.collect(),
            ..Self::default()
        })
    }
}
