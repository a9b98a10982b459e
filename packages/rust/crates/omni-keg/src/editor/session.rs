use std::path::{Path, PathBuf};
use std::time::Instant;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::buffer::EditOutcome;
use super::{EditorConfig, WatchState};
use crate::error::{KegError, KegResult};

/// Result of a finished edit session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditSummary {
    /// Saves that were applied.
    pub saved: usize,
    /// Saves whose bytes matched what was already applied.
    pub unchanged: usize,
}

fn watch_error(path: &Path, err: &notify::Error) -> KegError {
    KegError::io(path, std::io::Error::other(err.to_string()))
}

/// Applies buffer snapshots, skipping ones identical to the last applied.
struct Saver<'a, F> {
    path: &'a Path,
    last: Vec<u8>,
    summary: EditSummary,
    failure: Option<KegError>,
    on_save: F,
}

impl<F> Saver<'_, F>
where
    F: FnMut(&[u8]) -> KegResult<EditOutcome>,
{
    fn flush(&mut self) -> KegResult<()> {
        let bytes = match std::fs::read(self.path) {
            Ok(bytes) => bytes,
            // Editors that save via rename briefly leave no file behind.
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(KegError::io(self.path, err)),
        };
        if bytes == self.last {
            return Ok(());
        }
        match (self.on_save)(&bytes) {
            Ok(EditOutcome::Saved) => {
                self.summary.saved += 1;
                self.failure = None;
            }
            Ok(EditOutcome::Unchanged) => {
                self.summary.unchanged += 1;
                self.failure = None;
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "edit rejected");
                self.failure = Some(err);
            }
        }
        self.last = bytes;
        Ok(())
    }
}

async fn watch<F>(
    saver: &mut Saver<'_, F>,
    config: &EditorConfig,
    cancel: CancellationToken,
) -> KegResult<()>
where
    F: FnMut(&[u8]) -> KegResult<EditOutcome>,
{
    let path = saver.path;
    let dir = path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let file_name = path.file_name().map(std::ffi::OsStr::to_os_string);

    let (tx, mut rx) = mpsc::channel::<Result<Event, notify::Error>>(100);
    let mut watcher = RecommendedWatcher::new(
        move |result: Result<Event, notify::Error>| {
            let _ = tx.blocking_send(result);
        },
        Config::default(),
    )
    .map_err(|e| watch_error(path, &e))?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| watch_error(&dir, &e))?;

    let mut ticker = tokio::time::interval(config.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut state = WatchState::Idle;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            event = rx.recv() => match event {
                Some(Ok(event)) => {
                    let touches_buffer = event
                        .paths
                        .iter()
                        .any(|p| p.file_name().map(std::ffi::OsStr::to_os_string) == file_name);
                    if touches_buffer {
                        state = state.on_change(Instant::now());
                    }
                }
                Some(Err(err)) => warn!(error = %err, "watcher error"),
                None => break,
            },
            _ = ticker.tick() => {
                let (next, fire) = state.on_tick(Instant::now(), config.debounce);
                state = next;
                if fire {
                    saver.flush()?;
                }
            }
        }
    }
    drop(watcher);
    debug!(path = %path.display(), "watcher stopped");
    Ok(())
}

async fn run_editor(config: &EditorConfig, path: &Path, cancel: &CancellationToken) -> KegResult<()> {
    let mut child = Command::new(&config.program)
        .args(&config.args)
        .arg(path)
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| KegError::io(&config.program, e))?;

    let status = tokio::select! {
        status = child.wait() => Some(status),
        () = cancel.cancelled() => None,
    };
    match status {
        Some(status) => {
            let status = status.map_err(|e| KegError::io(&config.program, e))?;
            if status.success() {
                Ok(())
            } else {
                Err(KegError::invalid(
                    "editor",
                    format!("{} exited with {status}", config.program),
                ))
            }
        }
        None => {
            if let Err(err) = child.kill().await {
                warn!(error = %err, "failed to stop editor");
            }
            Err(KegError::Cancelled)
        }
    }
}

/// Launch the editor on `path` and apply debounced saves until it exits.
///
/// A last flush runs after the editor exits, so the final buffer is always
/// applied. Cancelling `cancel` kills the editor and stops the watcher.
///
/// # Errors
///
/// [`KegError::Cancelled`] on cancellation, editor launch/exit failures, and
/// the error of the last save if it was rejected and never superseded.
pub async fn run_edit_session<F>(
    path: &Path,
    config: &EditorConfig,
    cancel: &CancellationToken,
    on_save: F,
) -> KegResult<EditSummary>
where
    F: FnMut(&[u8]) -> KegResult<EditOutcome>,
{
    let last = std::fs::read(path).map_err(|e| KegError::from_io(path, e, &path.display().to_string()))?;
    let mut saver = Saver {
        path,
        last,
        summary: EditSummary::default(),
        failure: None,
        on_save,
    };

    let watch_cancel = cancel.child_token();
    let editor = async {
        let result = run_editor(config, path, cancel).await;
        watch_cancel.cancel();
        result
    };
    let watcher = watch(&mut saver, config, watch_cancel.clone());
    let (editor_result, watch_result) = tokio::join!(editor, watcher);

    editor_result?;
    if let Err(err) = watch_result {
        warn!(error = %err, "watcher failed; applying final buffer");
    }
    saver.flush()?;
    match saver.failure {
        Some(err) => Err(err),
        None => Ok(saver.summary),
    }
}
