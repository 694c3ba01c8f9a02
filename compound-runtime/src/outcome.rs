use kube::runtime::controller::Action;
use std::time::Duration;

/// What a single reconcile attempt decided to do next (spec §4.2). Every
/// concrete reconciler (Provider, Entry, zone) returns this instead of a
/// bare `kube::runtime::controller::Action` so the framework can apply a
/// uniform backoff/classification policy before handing the decision to
/// `kube-rs`.
#[derive(Debug)]
pub enum ReconcileOutcome<E> {
    /// Fully reconciled; check again only on the next watch event or after
    /// the default probe interval.
    Succeeded,
    /// Reconciled enough to make progress, but ask to be seen again after
    /// a specific delay even absent a new event (e.g. waiting out a
    /// propagation window).
    Repeat(Option<Duration>),
    /// An error occurred. The framework classifies it (spec §7) to decide
    /// whether and how long to back off before the retry.
    Failed(E),
}

impl<E> ReconcileOutcome<E> {
    pub fn into_action(self, default_requeue: Duration, on_error_delay: impl Fn(&E) -> Duration) -> Action
    where
        E: std::fmt::Debug,
    {
        match self {
            ReconcileOutcome::Succeeded => Action::requeue(default_requeue),
            ReconcileOutcome::Repeat(Some(d)) => Action::requeue(d),
            ReconcileOutcome::Repeat(None) => Action::await_change(),
            ReconcileOutcome::Failed(err) => {
                let delay = on_error_delay(&err);
                tracing::warn!(?err, ?delay, "reconcile failed");
                Action::requeue(delay)
            }
        }
    }
}
