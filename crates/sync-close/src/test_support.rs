//! In-memory transport for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crm_sync_client::{RequestBuilder, Transport};
use serde_json::Value;

type Handler = dyn Fn(&RequestBuilder) -> crm_sync_client::Result<Value> + Send + Sync;

/// Answers every request with a closure, recording requests and the peak
/// number of requests in flight at once.
pub(crate) struct MockTransport {
    handler: Box<Handler>,
    delay: Duration,
    requests: Mutex<Vec<RequestBuilder>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockTransport {
    pub(crate) fn new(
        handler: impl Fn(&RequestBuilder) -> crm_sync_client::Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Hold every request for `delay` before answering.
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn requests(&self) -> Vec<RequestBuilder> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    async fn send(&self, request: RequestBuilder) -> crm_sync_client::Result<Value> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let result = (self.handler)(&request);
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// A validation rejection as the transport would classify it.
pub(crate) fn validation_error(field: &str, message: &str) -> crm_sync_client::Error {
    let mut field_errors = serde_json::Map::new();
    field_errors.insert(field.to_string(), Value::String(message.to_string()));
    crm_sync_client::Error::new(crm_sync_client::ErrorKind::Validation {
        status: 400,
        message: None,
        errors: Vec::new(),
        field_errors,
    })
}
