//! The seam between API clients and the network.
//!
//! API clients (`crm-sync-close`, `crm-sync-ctm`, ...) are generic over
//! [`Transport`] and never talk to `reqwest` directly. Production code uses
//! [`crate::ApiClient`]; tests plug in an in-memory implementation.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;
use crate::request::{RequestBuilder, RequestMethod};

/// Sends one request and returns its JSON body.
///
/// Implementations own retry, authentication and error classification:
/// a returned `Err` is final from the caller's point of view, and its
/// [`crate::ErrorKind`] says whether it was a validation rejection or a
/// hard failure. An empty body is returned as `Value::Null`.
pub trait Transport: Send + Sync {
    /// Send a request.
    fn send(&self, request: RequestBuilder) -> impl Future<Output = Result<Value>> + Send;

    /// GET `endpoint` with query parameters.
    fn get(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> impl Future<Output = Result<Value>> + Send {
        let request = RequestBuilder::new(RequestMethod::Get, endpoint)
            .query_pairs(params.iter().cloned());
        self.send(request)
    }

    /// POST a JSON body to `endpoint`.
    fn post(&self, endpoint: &str, body: Value) -> impl Future<Output = Result<Value>> + Send {
        self.send(RequestBuilder::new(RequestMethod::Post, endpoint).json_value(body))
    }

    /// PUT a JSON body to `endpoint`.
    fn put(&self, endpoint: &str, body: Value) -> impl Future<Output = Result<Value>> + Send {
        self.send(RequestBuilder::new(RequestMethod::Put, endpoint).json_value(body))
    }

    /// DELETE `endpoint`.
    fn delete(&self, endpoint: &str) -> impl Future<Output = Result<Value>> + Send {
        self.send(RequestBuilder::new(RequestMethod::Delete, endpoint))
    }
}

impl<T: Transport> Transport for Arc<T> {
    fn send(&self, request: RequestBuilder) -> impl Future<Output = Result<Value>> + Send {
        (**self).send(request)
    }
}

impl<T: Transport> Transport for &T {
    fn send(&self, request: RequestBuilder) -> impl Future<Output = Result<Value>> + Send {
        (**self).send(request)
    }
}
