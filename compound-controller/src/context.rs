//! Shared state handed to every reconcile invocation (spec §4.2 "context
//! injected with each reconcile"), generalized off the teacher's
//! single-field `ContextData` into the handful of process-wide holders
//! this controller actually needs: the typed caches, the provider
//! selection index, the backend registry, the per-zone registry, and the
//! shutdown/metrics plumbing.

use std::time::Duration;

use kube::{Client, runtime::reflector};

use compound_backend::BackendRegistry;
use compound_provider::ProviderRegistry;
use compound_runtime::ShutdownGuard;
use compound_types::{DNSEntry, DNSProvider};
use parking_lot::Mutex;

#[cfg(feature = "metrics")]
use compound_common::metrics::ControllerMetrics;

use crate::zone::ZoneRegistry;

pub struct ControllerContext {
    pub client: Client,
    pub cluster: String,
    pub providers: reflector::Store<DNSProvider>,
    pub entries: reflector::Store<DNSEntry>,
    pub provider_registry: ProviderRegistry,
    pub backends: Mutex<BackendRegistry>,
    pub zones: ZoneRegistry,
    pub shutdown: ShutdownGuard,
    /// Threshold a zone's backend errors must persist past before a
    /// contributing Entry's Ready status is downgraded (spec §4.5 flap
    /// prevention).
    pub flap_suppression: Duration,
    #[cfg(feature = "metrics")]
    pub metrics: ControllerMetrics,
}
