//! Reconciler Framework (spec §4.2, §5): the lease-gated start/stop loop,
//! the shutdown protocol, the outcome vocabulary reconcilers return, and a
//! jittered exponential backoff shared by every retry path in the process.

pub mod backoff;
pub mod leadership;
pub mod outcome;
pub mod reconciler;
pub mod shutdown;

pub use leadership::{LeaseGroup, LeaseGroupConfig};
pub use outcome::ReconcileOutcome;
pub use reconciler::Reconciler;
pub use shutdown::ShutdownGuard;
