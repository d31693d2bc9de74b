//! Batch items and their partitioned outcomes.

use serde_json::{Map, Value};

use crm_sync_client::Record;

use crate::error::{Error, ErrorKind, Result};

/// Slice size for mutating batches.
pub const DEFAULT_SLICE_SIZE: usize = 5;

/// Slice size for read-only batches.
pub const DEFAULT_READ_SLICE_SIZE: usize = 10;

/// One request of a batch: an endpoint and an optional JSON payload.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub endpoint: String,
    pub payload: Option<Value>,
}

impl BatchItem {
    /// An item without a body (GET, DELETE).
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            payload: None,
        }
    }

    /// An item with a JSON body (POST, PUT).
    pub fn with_payload(endpoint: impl Into<String>, payload: Value) -> Self {
        Self {
            endpoint: endpoint.into(),
            payload: Some(payload),
        }
    }
}

/// One listing to drain as part of a concurrent fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub endpoint: String,
    pub params: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }
}

/// How a batch is sliced and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Maximum number of requests in flight at once. Must be non-zero.
    pub slice_size: usize,
    /// Also log each successful item and a per-slice summary. Failures are
    /// always logged.
    pub verbose: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            slice_size: DEFAULT_SLICE_SIZE,
            verbose: false,
        }
    }
}

impl DispatchOptions {
    /// Defaults for read-only batches.
    pub fn for_reads() -> Self {
        Self {
            slice_size: DEFAULT_READ_SLICE_SIZE,
            verbose: false,
        }
    }

    pub fn with_slice_size(mut self, slice_size: usize) -> Self {
        self.slice_size = slice_size;
        self
    }

    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.slice_size == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument(
                "slice_size must be at least 1".to_string(),
            )));
        }
        Ok(())
    }
}

/// A batch item that did not succeed.
#[derive(Debug)]
pub enum BatchFailure {
    /// The server rejected the payload with structured errors. The original
    /// payload is kept so the caller can fix and resend it.
    Validation {
        index: usize,
        endpoint: String,
        errors: Vec<Value>,
        field_errors: Map<String, Value>,
        payload: Option<Value>,
    },
    /// Anything else: network failure, exhausted retries, unexpected status.
    Hard {
        index: usize,
        endpoint: String,
        error: crm_sync_client::Error,
    },
}

impl BatchFailure {
    /// Position of the failed item in the input batch.
    pub fn index(&self) -> usize {
        match self {
            BatchFailure::Validation { index, .. } | BatchFailure::Hard { index, .. } => *index,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            BatchFailure::Validation { endpoint, .. } | BatchFailure::Hard { endpoint, .. } => {
                endpoint
            }
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, BatchFailure::Validation { .. })
    }
}

/// Partitioned result of a batch: every input item lands in exactly one of
/// the two lists.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub successes: Vec<Record>,
    pub failures: Vec<BatchFailure>,
}

impl BatchOutcome {
    /// Number of items accounted for.
    pub fn len(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A listing that could not be drained.
#[derive(Debug)]
pub struct FetchFailure {
    pub index: usize,
    pub endpoint: String,
    pub error: Error,
}

/// Result of [`crate::CloseClient::get_all_concurrently`].
#[derive(Debug, Default)]
pub struct ConcurrentFetch {
    /// Records of every successful listing, concatenated in input order.
    pub records: Vec<Record>,
    pub errors: Vec<FetchFailure>,
}

/// Sort a finished item into the success or failure partition.
pub(crate) fn classify(
    outcome: &mut BatchOutcome,
    index: usize,
    item: &BatchItem,
    result: crm_sync_client::Result<Value>,
) {
    let error = match result {
        Ok(Value::Object(record)) => {
            outcome.successes.push(record);
            return;
        }
        Ok(Value::Null) => {
            outcome.successes.push(Record::new());
            return;
        }
        Ok(other) => crm_sync_client::Error::new(crm_sync_client::ErrorKind::MalformedResponse(
            format!("expected an object, got {}", other),
        )),
        Err(error) => error,
    };

    let failure = match error.kind {
        crm_sync_client::ErrorKind::Validation {
            errors,
            field_errors,
            ..
        } => BatchFailure::Validation {
            index,
            endpoint: item.endpoint.clone(),
            errors,
            field_errors,
            payload: item.payload.clone(),
        },
        kind => BatchFailure::Hard {
            index,
            endpoint: item.endpoint.clone(),
            error: crm_sync_client::Error {
                kind,
                source: error.source,
            },
        },
    };
    outcome.failures.push(failure);
}
