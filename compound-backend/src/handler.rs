//! Backend Handler capability interface (spec §4.6). Every backend
//! adapter — the concrete AWS/GCP/Azure/etc. SDK glue — is out of this
//! core's scope; it is specified only by this trait.

use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};

use compound_types::ProviderType;

use crate::record::{ChangeOutcome, ChangeSet, Record};

#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    #[error("transient backend error: {0}")]
    Transient(String),
    #[error("permanent backend error: {0}")]
    Permanent(String),
}

/// The narrow, dynamically-dispatched interface every DNS backend adapter
/// implements (spec §4.6, spec §9 "Dynamic dispatch over backends ...
/// express as a capability interface plus a registry keyed by
/// `provider.type`. No shared concrete base; each adapter is a value
/// behind the interface.").
#[async_trait]
pub trait BackendHandler: Send + Sync {
    /// Finds the backend zone that would own `fqdn`, if any.
    async fn probe_zone_for_name(&self, fqdn: &str) -> Result<Option<String>, BackendError>;

    /// Lists every record currently present in `zone_id`. Adapters
    /// paginate internally; the core only ever sees the fully materialized
    /// list (spec §4.6 "Adapters are responsible for ... paginating
    /// lists").
    async fn list_records(&self, zone_id: &str) -> Result<Vec<Record>, BackendError>;

    /// Applies a batch of changes, returning one outcome per change in
    /// the same order they appear in `batch.ops` (spec §4.5 "the batch is
    /// submitted via the backend handler's applyChangeSet call").
    async fn apply_change_set(
        &self,
        zone_id: &str,
        batch: &ChangeSet,
    ) -> Result<Vec<ChangeOutcome>, BackendError>;

    /// Releases any held connections/credentials.
    async fn close(&self) -> Result<(), BackendError>;
}

/// Maps a [`ProviderType`] to the handler instance that backs it. One
/// handler instance per provider (not per type) since each Provider has
/// its own credentials/sub-config — the registry is keyed by the
/// provider's resource identity, with the type recorded only for
/// telemetry labeling.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    handlers: HashMap<String, (ProviderType, Arc<dyn BackendHandler>)>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    pub fn register(&mut self, provider_key: impl Into<String>, provider_type: ProviderType, handler: Arc<dyn BackendHandler>) {
        self.handlers.insert(provider_key.into(), (provider_type, handler));
    }

    pub fn deregister(&mut self, provider_key: &str) -> Option<Arc<dyn BackendHandler>> {
        self.handlers.remove(provider_key).map(|(_, h)| h)
    }

    pub fn get(&self, provider_key: &str) -> Option<Arc<dyn BackendHandler>> {
        self.handlers.get(provider_key).map(|(_, h)| h.clone())
    }

    pub fn provider_type(&self, provider_key: &str) -> Option<ProviderType> {
        self.handlers.get(provider_key).map(|(t, _)| *t)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
