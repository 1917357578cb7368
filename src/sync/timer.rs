use std::future::Future;
use tokio::time::{self, Duration, MissedTickBehavior};

// ── TickTimer ───────────────────────────────────────────────────────────────

/// A cancellable repeating timer.
///
/// Runs `tick` every `interval` on a spawned task until either the callback
/// asks to stop (returns `false`) or the handle is cancelled. The handle MUST
/// be cancelled on every phase exit that makes the timer stale; dropping the
/// handle also aborts the task, so a timer can never outlive its owner.
pub struct TickTimer {
    handle: tokio::task::JoinHandle<()>,
}

impl TickTimer {
    /// Spawn the timer task. The first tick fires after one full `interval`.
    ///
    /// `tick` returns `true` to keep ticking, `false` to stop the timer from
    /// inside (e.g. after performing a deadline auto-transition).
    pub fn spawn<F, Fut>(interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval() fires immediately; swallow that first tick so the
            // cadence starts one interval after spawn.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !tick().await {
                    break;
                }
            }
        });
        Self { handle }
    }

    /// Stop the timer. Safe to call more than once.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

impl Drop for TickTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
