//! Clip timer pair

use cadence_core::CommandId;
use tokio::task::JoinHandle;
use tracing::debug;

/// The progress interval and clip-end timeout of one stabilized clip
///
/// Both handles are installed and cleared together, and installing a new
/// pair clears the previous one first, so at most one pair is ever live.
#[derive(Debug, Default)]
pub struct ClipTimers {
    live: Option<Pair>,
}

#[derive(Debug)]
struct Pair {
    command: CommandId,
    progress: JoinHandle<()>,
    clip_end: JoinHandle<()>,
}

impl ClipTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, command: CommandId, progress: JoinHandle<()>, clip_end: JoinHandle<()>) {
        self.clear();
        debug!(command = %command, "Clip timers scheduled");
        self.live = Some(Pair {
            command,
            progress,
            clip_end,
        });
    }

    /// Abort both timers; no-op when none are live
    pub fn clear(&mut self) {
        if let Some(pair) = self.live.take() {
            pair.progress.abort();
            pair.clip_end.abort();
            debug!(command = %pair.command, "Clip timers cleared");
        }
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    /// Command the live pair belongs to
    pub fn command(&self) -> Option<CommandId> {
        self.live.as_ref().map(|p| p.command)
    }
}

impl Drop for ClipTimers {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sleeper() -> JoinHandle<()> {
        tokio::spawn(tokio::time::sleep(Duration::from_secs(3600)))
    }

    /// A timer whose receiver resolves with an error once the task is aborted
    fn watched() -> (JoinHandle<()>, tokio::sync::oneshot::Receiver<()>) {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            drop(tx);
        });
        (handle, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_replaces_previous_pair() {
        let mut timers = ClipTimers::new();
        let (first_progress, progress_rx) = watched();
        let (first_end, end_rx) = watched();

        timers.install(CommandId::new(1), first_progress, first_end);
        timers.install(CommandId::new(2), sleeper(), sleeper());

        // Aborted well before the hour-long sleeps could finish
        let aborted = tokio::time::timeout(Duration::from_secs(1), async {
            assert!(progress_rx.await.is_err());
            assert!(end_rx.await.is_err());
        })
        .await;
        assert!(aborted.is_ok());
        assert_eq!(timers.command(), Some(CommandId::new(2)));
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let mut timers = ClipTimers::new();
        timers.install(CommandId::new(1), sleeper(), sleeper());
        timers.clear();
        timers.clear();
        assert!(!timers.is_live());
        assert!(timers.command().is_none());
    }
}
