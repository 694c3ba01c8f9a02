//! DNS record controller reconciliation core (spec §1 OVERVIEW):
//! a Kubernetes controller that reconciles `DNSProvider` and `DNSEntry`
//! custom resources into records applied against pluggable DNS backend
//! adapters.

pub mod args;
pub mod config;
pub mod context;
pub mod entry;
pub mod error;
pub mod metrics_server;
pub mod provider;
pub mod zone;
