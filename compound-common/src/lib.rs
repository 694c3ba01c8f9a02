use owo_colors::OwoColorize;

pub mod config;
pub mod error;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod shutdown;

pub use error::{Classify, ErrorKind};

/// Annotation/finalizer keys shared by every reconciler. `FINALIZER` is
/// the single fixed string identifying this controller's responsibility
/// (spec §6 "Finalizer key"): unique per controller identity, so multiple
/// controllers can coexist on the same cluster without fighting over
/// each other's finalizers.
pub mod annotations {
    use std::hash::{Hash, Hasher};

    /// Hash of the object's `spec` at the last time this controller's
    /// finalizer bookkeeping touched it. Lets an external reader (or a
    /// future reconcile) tell a spec edit apart from a status-only or
    /// label-only update without diffing the whole object.
    pub const SPEC_HASH: &str = "dns.compound.io/spec-hash";
    /// Controller identity that first took ownership of this object, set
    /// once and never overwritten afterward.
    pub const CREATED_BY: &str = "dns.compound.io/created-by";

    /// Identity stamped into [`CREATED_BY`] by this controller.
    pub const CONTROLLER_IDENTITY: &str = "compound-controller";

    /// Hex digest of `obj`'s `spec` field, stable across field-order
    /// round-trips since `serde_json::Value`'s object map is ordered.
    pub fn spec_hash<T: serde::Serialize>(obj: &T) -> String {
        let value = serde_json::to_value(obj).unwrap_or(serde_json::Value::Null);
        let spec = value.get("spec").cloned().unwrap_or(serde_json::Value::Null);
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        spec.to_string().hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }
}

pub const FINALIZER: &str = "dns.compound.io/compound";

/// Sets up the process-wide `tracing` subscriber. Level is controlled by
/// `RUST_LOG`/`--log-level` (spec §6 "Core flags ... log level").
pub fn init_logging(level: &str) {
    let disable_colors = ["1", "true"].contains(
        &std::env::var("DISABLE_COLORS")
            .unwrap_or_default()
            .to_lowercase()
            .as_str(),
    );
    owo_colors::set_override(!disable_colors);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Writes a readiness marker file, following the same convention the
/// orchestrator's liveness/readiness probe looks for.
pub fn signal_ready() {
    if let Ok(path) = std::env::var("READY_FILE") {
        let _ = std::fs::write(path, "ready");
    }
}

pub fn print_error(msg: impl std::fmt::Display) {
    eprintln!("{} {}", "error:".red(), msg);
}

pub fn print_warning(msg: impl std::fmt::Display) {
    eprintln!("{} {}", "warning:".yellow(), msg);
}
