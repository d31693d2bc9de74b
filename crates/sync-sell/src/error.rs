//! Error types for crm-sync-sell.

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

    /// Returns true if the API answered 429. Rate limits are surfaced to
    /// the caller, never retried by this client.
    pub fn is_rate_limited(&self) -> bool {
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<crm_sync_client::Error>())
            .is_some_and(crm_sync_client::Error::is_rate_limited)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("Client error: {0}")]
    Client(String),
    #[error("Deal {0} has no contact")]
    NoContact(String),
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl From<crm_sync_client::Error> for Error {
    fn from(err: crm_sync_client::Error) -> Self {
        Error {
            kind: ErrorKind::Client(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}
