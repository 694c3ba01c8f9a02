//! Provider reconciler wiring (spec §4.4, §3 "Provider ... Lifecycle").

pub mod actions;
pub mod reconcile;

pub use reconcile::{on_error, rebuild_registry, reconcile as run};
