//! The reconciler capability surface consumed from concrete reconcilers
//! (spec §4.2). `compound-controller`'s Provider/Entry loops run atop
//! `kube::runtime::Controller`, which already supplies the per-key queue,
//! dedup-while-in-flight, and backoff-driven requeue machinery; this
//! trait is the thin, uniform shape every reconciler the framework hosts
//! presents on top of that, so lease-gating and one-shot setup ordering
//! stay generic across reconcilers instead of hard-coded per resource
//! kind.

use async_trait::async_trait;

/// Capabilities a reconciler opts into beyond the bare `reconcile`
/// function `kube::runtime::Controller` already calls directly.
#[async_trait]
pub trait Reconciler: Send + Sync {
    type Error;

    /// Whether this reconciler's lease group must hold cluster leadership
    /// before it is allowed to run (spec §4.2 "reconcilers declare
    /// whether they require leadership"). Every reconciler in this
    /// controller requires it by default; a future read-only reconciler
    /// could override this to `false` to start immediately.
    fn requires_leadership(&self) -> bool {
        true
    }

    /// One-shot initialization run after watches are ready but before the
    /// first work item is processed (spec §4.2 "setup()").
    async fn setup(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}
