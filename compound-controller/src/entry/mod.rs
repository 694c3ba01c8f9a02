//! Entry reconciler wiring (spec §4.3, §3 "Entry ... Lifecycle").

pub mod actions;
pub mod compile;
pub mod reconcile;

pub use reconcile::{on_error, reconcile as run};
