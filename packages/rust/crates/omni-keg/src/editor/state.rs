use std::time::{Duration, Instant};

/// Debounce state of the buffer watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// No unsaved change observed.
    Idle,
    /// A change was seen at `since`; waiting for quiescence.
    PendingSave {
        /// Time of the most recent change notification.
        since: Instant,
    },
}

impl WatchState {
    /// A change notification arrived. Restarts the quiescence window.
    #[must_use]
    pub const fn on_change(self, now: Instant) -> Self {
        Self::PendingSave { since: now }
    }

    /// Timer tick. Returns the next state and whether a save should fire.
    #[must_use]
    pub fn on_tick(self, now: Instant, debounce: Duration) -> (Self, bool) {
        match self {
            Self::PendingSave { since } if now.saturating_duration_since(since) >= debounce => {
                (Self::Idle, true)
            }
            other => (other, false),
        }
    }

    /// Whether a save is waiting for quiescence.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::PendingSave { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_burst_of_changes_fires_once_after_quiescence() {
        let debounce = Duration::from_millis(100);
        let start = Instant::now();
        let mut state = WatchState::Idle;
        state = state.on_change(start);
        state = state.on_change(start + Duration::from_millis(60));

        let (next, fire) = state.on_tick(start + Duration::from_millis(120), debounce);
        assert!(!fire);
        assert!(next.is_pending());

        let (next, fire) = next.on_tick(start + Duration::from_millis(160), debounce);
        assert!(fire);
        assert_eq!(next, WatchState::Idle);

        let (_, fire) = next.on_tick(start + Duration::from_millis(400), debounce);
        assert!(!fire);
    }
}
