//! The controller's own error type: wraps every lower-crate error this
//! binary can produce and classifies it per spec §7's taxonomy so the
//! reconcile loops can decide retry/backoff uniformly.

use compound_common::{Classify, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),
    #[error(transparent)]
    Status(#[from] compound_model::Error),
    #[error(transparent)]
    Cluster(#[from] compound_cluster::Error),
    #[error("entry is invalid: {0}")]
    Validation(#[from] compound_model::ValidationError),
    #[error("backend error: {0}")]
    Backend(#[from] compound_backend::BackendError),
    #[error("no matching provider for dns name {0:?}")]
    NoMatchingProvider(String),
    #[error("provider {0} has no adapter registered for backend type {1}")]
    NoAdapter(String, compound_types::ProviderType),
    #[error("provider {0} is still referenced by at least one entry")]
    ProviderStillReferenced(String),
    #[error("resource {0} is missing required metadata.namespace")]
    MissingNamespace(String),
}

impl Classify for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Kube(kube::Error::Api(ae)) if ae.code == 409 => ErrorKind::Conflict,
            Error::Kube(_) => ErrorKind::TransientBackend,
            Error::Status(inner) => inner.kind(),
            Error::Cluster(compound_cluster::Error::Kube(kube::Error::Api(ae))) if ae.code == 409 => {
                ErrorKind::Conflict
            }
            Error::Cluster(_) => ErrorKind::TransientBackend,
            Error::Validation(_) => ErrorKind::Validation,
            Error::Backend(compound_backend::BackendError::Transient(_)) => ErrorKind::TransientBackend,
            Error::Backend(compound_backend::BackendError::Permanent(_)) => ErrorKind::PermanentBackend,
            Error::NoMatchingProvider(_) => ErrorKind::Selection,
            Error::NoAdapter(..) => ErrorKind::PermanentBackend,
            Error::ProviderStillReferenced(_) => ErrorKind::Selection,
            Error::MissingNamespace(_) => ErrorKind::Validation,
        }
    }
}
