use owo_colors::OwoColorize;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

/// Coordinates graceful shutdown (spec §4.2): a first SIGINT/SIGTERM asks
/// in-flight work to wind down within a grace period; a second signal
/// force-exits immediately. The framework additionally waits out a grace
/// window after the last *deletion* reconcile activity, since those are
/// the reconciles most likely to be mid-way through an external backend
/// call when the signal arrives.
#[derive(Clone)]
pub struct ShutdownGuard {
    token: CancellationToken,
    grace_period: Duration,
    last_deletion_activity: Arc<AtomicI64>,
}

impl ShutdownGuard {
    pub fn new(grace_period: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            grace_period,
            last_deletion_activity: Arc::new(AtomicI64::new(0)),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Records that a deletion-path reconcile just ran; `now` is a
    /// monotonic second counter supplied by the caller (the framework
    /// never calls `Instant::now()`/`SystemTime::now()` itself so this
    /// type stays deterministic and testable).
    pub fn record_deletion_activity(&self, now_secs: i64) {
        self.last_deletion_activity.store(now_secs, Ordering::Relaxed);
    }

    pub fn last_deletion_activity(&self) -> i64 {
        self.last_deletion_activity.load(Ordering::Relaxed)
    }

    /// Waits for the first termination signal (or for `self.token` to be
    /// cancelled by some other means, e.g. losing leadership), cancels the
    /// token, then waits out `grace_period` of *quiet* — no deletion-path
    /// reconcile activity — before returning so the caller can exit. Each
    /// call to [`Self::record_deletion_activity`] pushes the deadline back
    /// out to a full `grace_period` from that call, rather than the window
    /// being a single flat sleep from the moment shutdown began, so a
    /// deletion mid-flight when the signal arrives is not cut off (spec
    /// §4.2 "waits up to a configurable grace period during which deletion
    /// work items are still processed"). A second signal still forces an
    /// immediate exit regardless of how much quiet time remains.
    pub async fn wait_for_shutdown(&self) {
        tokio::select! {
            _ = first_signal() => {
                eprintln!("{}", "received shutdown signal, starting graceful drain".yellow());
            }
            _ = self.token.cancelled() => {
                eprintln!("{}", "shutdown requested, starting graceful drain".yellow());
            }
        }
        self.token.cancel();

        let cancelled_at = now_secs();
        let poll = Duration::from_secs(1).min(self.grace_period);
        loop {
            tokio::select! {
                _ = tokio::time::sleep(poll) => {}
                _ = first_signal() => {
                    eprintln!("{}", "second signal received, forcing exit".red());
                    return;
                }
            }
            let last_activity = self.last_deletion_activity();
            let baseline = if last_activity > 0 { last_activity } else { cancelled_at };
            let quiet_for = now_secs() - baseline;
            if quiet_for >= self.grace_period.as_secs() as i64 {
                eprintln!("{}", "grace period elapsed, exiting".yellow());
                return;
            }
        }
    }
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

async fn first_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigint = signal(SignalKind::interrupt()).expect("install SIGINT handler");
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = sigint.recv() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("install Ctrl+C handler");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_last_deletion_activity() {
        let guard = ShutdownGuard::new(Duration::from_secs(5));
        assert_eq!(guard.last_deletion_activity(), 0);
        guard.record_deletion_activity(42);
        assert_eq!(guard.last_deletion_activity(), 42);
    }
}
