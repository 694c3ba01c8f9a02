//! CLI flags (spec §6 "Core flags"), every one of which is also settable
//! via environment variable (`clap`'s `env` feature) and overridable by
//! the merged YAML config file loaded in [`crate::config`].

use std::time::Duration;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "DNS record controller reconciliation core")]
pub struct Cli {
    /// Path to a YAML config file merged under the flags/env defaults.
    #[arg(long, env = "COMPOUND_CONFIG")]
    pub config: Option<String>,

    /// Name this process addresses its own cluster by (spec §4.1 "one or
    /// more named clusters"); multi-cluster fan-out is driven by adding
    /// more named connections to the same `ClusterRegistry`.
    #[arg(long, env = "CLUSTER_NAME", default_value = "default")]
    pub cluster_name: String,

    /// Namespace leadership leases and the metrics/health endpoint bind
    /// to; also where `POD_NAME`-less fallback holder ids are reported.
    #[arg(long, env = "NAMESPACE", default_value = "default")]
    pub namespace: String,

    /// Reconcile worker count for the Provider and Entry queues (spec
    /// §4.2 "fixed number of worker goroutines ... default small").
    #[arg(long, env = "WORKERS", default_value_t = 2)]
    pub workers: u16,

    /// How often the zone reconciler sweeps for pending changes absent
    /// any triggering Entry/Provider event (spec §4.5 apply tick).
    #[arg(long, env = "ZONE_TICK_INTERVAL", default_value = "5s", value_parser = parse_duration::parse)]
    pub zone_tick_interval: Duration,

    /// Graceful shutdown grace period (spec §4.2 "waits up to a
    /// configurable grace period during which deletion work items are
    /// still processed").
    #[arg(long, env = "SHUTDOWN_GRACE_PERIOD", default_value = "20s", value_parser = parse_duration::parse)]
    pub shutdown_grace_period: Duration,

    /// How long a zone's backend errors must persist before an otherwise
    /// Ready Entry contributing to it is downgraded to `Error` (spec §4.5
    /// "never clear a Ready status due to a transient backend error
    /// shorter than a configurable threshold — prevents flapping").
    #[arg(long, env = "FLAP_SUPPRESSION", default_value = "60s", value_parser = parse_duration::parse)]
    pub flap_suppression: Duration,

    /// Lease duration for leader election (spec §4.2 "Lease
    /// parameters... configurable").
    #[arg(long, env = "LEASE_TTL", default_value = "15s", value_parser = parse_duration::parse)]
    pub lease_ttl: Duration,

    /// How often the held lease is renewed.
    #[arg(long, env = "LEASE_RENEW_EVERY", default_value = "5s", value_parser = parse_duration::parse)]
    pub lease_renew_every: Duration,

    /// Bypasses leader election entirely (spec §4.2 "a development mode
    /// may bypass the lease entirely").
    #[arg(long, env = "DEV_MODE", default_value_t = false)]
    pub dev_mode: bool,

    /// `tracing`/`RUST_LOG`-style log level used when `RUST_LOG` itself
    /// is unset.
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// HTTP port serving `/metrics` and `/healthz`.
    #[arg(long, env = "METRICS_PORT", default_value_t = 8080)]
    pub metrics_port: u16,
}
