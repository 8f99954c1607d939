//! Outbound HTTP client.
//!
//! # Responsibilities
//! - Hide the concrete client behind a narrow async seam
//! - Hold one shared connection pool for the whole process
//!
//! `call` returns immediately with a future that resolves exactly once, to
//! either the backend response or the transport error.

use axum::body::Body;
use axum::http::{Request, Response};
use futures_util::future::BoxFuture;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::error::BoxError;

/// Future resolving to the outcome of one outbound call.
pub type ResponseFuture = BoxFuture<'static, Result<Response<Body>, BoxError>>;

/// Issues outbound requests.
pub trait OutboundClient: Send + Sync + std::fmt::Debug + 'static {
    fn call(&self, request: Request<Body>) -> ResponseFuture;
}

/// Shared hyper client. Cloning shares the underlying connection pool.
#[derive(Clone, Debug)]
pub struct HyperClient {
    inner: Client<HttpConnector, Body>,
}

impl HyperClient {
    pub fn new() -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self { inner: client }
    }
}

impl Default for HyperClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OutboundClient for HyperClient {
    fn call(&self, request: Request<Body>) -> ResponseFuture {
        let pending = self.inner.request(request);
        Box::pin(async move {
            let response = pending.await?;
            Ok::<_, BoxError>(response.map(Body::new))
        })
    }
}
