//! Error types for crm-sync-close.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// The transport error behind this one, if any.
    pub fn client_error(&self) -> Option<&crm_sync_client::Error> {
        self.source.as_deref()?.downcast_ref()
    }

    /// Returns true if the remote system rejected the request with
    /// field-level errors.
    pub fn is_validation(&self) -> bool {
        self.client_error().is_some_and(|e| e.is_validation())
    }

    /// Returns true if the remote resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.client_error().is_some_and(|e| e.is_not_found())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("Client error: {0}")]
    Client(String),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<crm_sync_client::Error> for Error {
    fn from(err: crm_sync_client::Error) -> Self {
        Error {
            kind: ErrorKind::Client(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Json(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}
