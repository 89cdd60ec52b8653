//! services/api/src/web/debounce.rs
//!
//! A single-slot delayed task. Scheduling a new task cancels the one still
//! waiting, so only the last call in a burst runs.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct Debouncer {
    delay: Duration,
    pending: Option<(CancellationToken, JoinHandle<()>)>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Runs `task` after the delay unless another call or `cancel` comes first.
    /// A task that already started is left to finish.
    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let token = CancellationToken::new();
        let child = token.clone();
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => {}
                _ = tokio::time::sleep(delay) => task.await,
            }
        });
        self.pending = Some((token, handle));
    }

    pub fn cancel(&mut self) {
        if let Some((token, _)) = self.pending.take() {
            token.cancel();
        }
    }

    /// True while a scheduled task has not yet finished.
    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|(token, handle)| !token.is_cancelled() && !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
