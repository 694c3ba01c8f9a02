//! Zone Reconciler wiring (spec §4.5): the registry of per-zone state
//! this process owns and the ticker task that drives its apply cycle.
//! The pure diff/rate-limit/back-pressure logic itself lives in
//! `compound_zone`; this module is the controller-level glue that knows
//! about `kube::Client`, the backend registry, and Entry status
//! write-back.

pub mod registry;
pub mod ticker;

pub use registry::{Contribution, EntryRef, ZoneRecord, ZoneRegistry};
