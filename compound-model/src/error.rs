use compound_common::{Classify, ErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),
    #[error("status serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Classify for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::Kube(kube::Error::Api(ae)) if ae.code == 409 => ErrorKind::Conflict,
            Error::Kube(_) => ErrorKind::TransientBackend,
            Error::Serde(_) => ErrorKind::Internal,
        }
    }
}
