//! Outbound dispatch.
//!
//! # Responsibilities
//! - Select a backend through the endpoint router
//! - Build the outbound URL and request, then run the request filter on it
//! - Submit the call to the bounded worker pool
//! - Complete exactly once: relay the backend response, or answer 502/504
//!
//! # Design Decisions
//! - Everything up to and including filtering happens on the submitting task,
//!   so a filter failure is reported before any network activity
//! - A pool worker only starts the call; completion runs on its own task,
//!   which keeps workers free while backends are slow

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{HeaderValue, Response};

use crate::config::GatewayConfig;
use crate::error::{BoxError, GatewayError};
use crate::filter::{HeaderRequestFilter, HeaderResponseFilter, RequestFilter};
use crate::http::client::{HyperClient, OutboundClient, ResponseFuture};
use crate::http::request::{build_outbound_request, outbound_url, InboundRequest};
use crate::http::response::{upstream_failure, ResponseRelay};
use crate::net::ConnectionHandle;
use crate::observability::metrics::{self, Outcome};
use crate::pool::{Execution, PoolSize, WorkerPool};
use crate::routing::{EndpointRouter, RoutingTable};

/// Everything the completion step needs. Created per dispatch, consumed once.
struct OutboundCall {
    url: String,
    inbound: InboundRequest,
    connection: ConnectionHandle,
}

/// Forwards inbound requests to a selected backend.
#[derive(Debug)]
pub struct Dispatcher {
    table: Arc<RoutingTable>,
    router: Arc<dyn EndpointRouter>,
    request_filter: Arc<dyn RequestFilter>,
    client: Arc<dyn OutboundClient>,
    relay: ResponseRelay,
    pool: WorkerPool,
    gateway_id: HeaderValue,
    timeout: Option<Duration>,
}

impl Dispatcher {
    /// Assemble a dispatcher from validated configuration, using the shared
    /// hyper client.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client: Arc<dyn OutboundClient> = Arc::new(HyperClient::new());
        Self::with_client(config, client)
    }

    /// Assemble a dispatcher with an explicit outbound client.
    pub fn with_client(config: &GatewayConfig, client: Arc<dyn OutboundClient>) -> Result<Self, GatewayError> {
        let table = Arc::new(RoutingTable::from_entries(&config.routing.backends)?);
        let gateway_id = HeaderValue::from_str(&config.gateway.id).map_err(|e| {
            GatewayError::InvalidConfiguration(format!("gateway.id is not a header value: {e}"))
        })?;
        let request_filter = Arc::new(HeaderRequestFilter::new(&config.filters.request_headers)?);
        let response_filter = Arc::new(HeaderResponseFilter::new(&config.filters.response_headers)?);
        let pool = WorkerPool::new("outbound", PoolSize::from_config(&config.pool))?;

        Ok(Self {
            table,
            router: config.routing.policy.build(),
            request_filter,
            client,
            relay: ResponseRelay::new(response_filter, config.upstream.max_body_bytes),
            pool,
            gateway_id,
            timeout: match config.upstream.timeout_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        })
    }

    /// Replace the request filter.
    pub fn with_request_filter(mut self, filter: Arc<dyn RequestFilter>) -> Self {
        self.request_filter = filter;
        self
    }

    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Route, filter, and submit one request.
    ///
    /// An `Err` means nothing was submitted and `connection` has been dropped
    /// unwritten. Once submitted, the connection is written exactly once.
    pub async fn dispatch(
        &self,
        inbound: InboundRequest,
        connection: ConnectionHandle,
    ) -> Result<Execution, GatewayError> {
        let target = self.router.route(self.table.targets())?;
        let url = outbound_url(target, inbound.path_and_query());

        let mut outbound = build_outbound_request(&url, &self.gateway_id)?;
        self.request_filter.filter(&mut outbound)?;

        tracing::debug!(
            connection_id = %connection.id(),
            method = %inbound.method(),
            version = ?inbound.version(),
            target = %target.address(),
            url = %url,
            "Dispatching request"
        );

        let call = OutboundCall {
            url,
            inbound,
            connection,
        };
        let client = self.client.clone();
        let relay = self.relay.clone();
        let timeout = self.timeout;

        let execution = self
            .pool
            .execute(async move {
                let pending = client.call(outbound);
                tokio::spawn(complete(pending, timeout, call, relay));
            })
            .await;

        Ok(execution)
    }
}

async fn complete(
    pending: ResponseFuture,
    timeout: Option<Duration>,
    call: OutboundCall,
    relay: ResponseRelay,
) {
    let started = Instant::now();
    let outcome = await_response(pending, timeout, &call.url).await;
    metrics::record_upstream_latency(started);

    match outcome {
        Ok(response) => relay.relay(&call.inbound, call.connection, response).await,
        Err(e) => {
            tracing::error!(
                connection_id = %call.connection.id(),
                url = %call.url,
                error = %e,
                "Upstream call failed"
            );
            metrics::record_outcome(Outcome::UpstreamFailed);
            call.connection.write(upstream_failure(&e), call.inbound.keep_alive());
        }
    }
}

async fn await_response(
    pending: ResponseFuture,
    timeout: Option<Duration>,
    url: &str,
) -> Result<Response<Body>, GatewayError> {
    let result: Result<Response<Body>, BoxError> = match timeout {
        None => pending.await,
        Some(limit) => match tokio::time::timeout(limit, pending).await {
            Ok(result) => result,
            Err(_) => {
                return Err(GatewayError::Timeout {
                    url: url.to_string(),
                    elapsed_ms: limit.as_millis() as u64,
                })
            }
        },
    };

    result.map_err(|source| GatewayError::Dispatch {
        url: url.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FilterError;
    use axum::http::{header, Request, StatusCode, Version};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    type CapturedRequest = Request<Body>;

    /// Records requests; fails the first `failures` calls, then answers 200.
    #[derive(Debug)]
    struct ScriptedClient {
        seen: mpsc::UnboundedSender<CapturedRequest>,
        failures: AtomicUsize,
    }

    impl OutboundClient for ScriptedClient {
        fn call(&self, request: Request<Body>) -> ResponseFuture {
            let _ = self.seen.send(request);
            let fail = self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            Box::pin(async move {
                let result: Result<Response<Body>, BoxError> = if fail {
                    Err("connection refused".into())
                } else {
                    Ok(Response::builder()
                        .header(header::CONTENT_LENGTH, "8")
                        .body(Body::from(r#"{"a":10}"#))
                        .unwrap())
                };
                result
            })
        }
    }

    /// Never completes.
    #[derive(Debug)]
    struct HangingClient;

    impl OutboundClient for HangingClient {
        fn call(&self, _request: Request<Body>) -> ResponseFuture {
            Box::pin(std::future::pending::<Result<Response<Body>, BoxError>>())
        }
    }

    #[derive(Debug)]
    struct RejectingFilter;

    impl RequestFilter for RejectingFilter {
        fn filter(&self, _request: &mut Request<Body>) -> Result<(), FilterError> {
            Err(FilterError::new("rejecting", "no"))
        }
    }

    #[derive(Debug, Default)]
    struct OrderProbe(Mutex<Vec<&'static str>>);

    impl RequestFilter for OrderProbe {
        fn filter(&self, request: &mut Request<Body>) -> Result<(), FilterError> {
            self.0.lock().unwrap().push("filter");
            request.headers_mut().insert("x-probe", HeaderValue::from_static("1"));
            Ok(())
        }
    }

    fn config(backends: &[&str]) -> GatewayConfig {
        let mut config = GatewayConfig::default();
        config.routing.backends = backends.iter().map(|s| s.to_string()).collect();
        config.gateway.id = "test-gw".into();
        config.pool.core_workers = 1;
        config.pool.max_workers = 2;
        config.pool.queue_capacity = 4;
        config
    }

    fn scripted(failures: usize) -> (Arc<ScriptedClient>, mpsc::UnboundedReceiver<CapturedRequest>) {
        let (seen, rx) = mpsc::unbounded_channel();
        let client = Arc::new(ScriptedClient {
            seen,
            failures: AtomicUsize::new(failures),
        });
        (client, rx)
    }

    fn inbound(uri: &str) -> InboundRequest {
        InboundRequest::from_request(Request::builder().uri(uri).body(Body::empty()).unwrap())
    }

    fn connection() -> (ConnectionHandle, crate::net::ResponseSlot) {
        ConnectionHandle::new("127.0.0.1:40000".parse().unwrap(), Version::HTTP_11)
    }

    #[tokio::test]
    async fn forwards_get_with_gateway_headers_and_relays() {
        let (client, mut seen) = scripted(0);
        let dispatcher = Dispatcher::with_client(&config(&["http://b:80/->1"]), client).unwrap();

        let (handle, slot) = connection();
        dispatcher.dispatch(inbound("/foo?x=1"), handle).await.unwrap();

        let request = seen.recv().await.unwrap();
        assert_eq!(request.method(), axum::http::Method::GET);
        assert_eq!(request.uri(), "http://b:80/foo?x=1");
        assert_eq!(request.headers().get(header::CONNECTION).unwrap(), "keep-alive");
        assert_eq!(request.headers().get("x-from").unwrap(), "test-gw");

        let response = slot.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "8");
    }

    #[tokio::test]
    async fn request_filter_runs_before_the_call() {
        let (client, mut seen) = scripted(0);
        let probe = Arc::new(OrderProbe::default());
        let dispatcher = Dispatcher::with_client(&config(&["http://b:80->1"]), client)
            .unwrap()
            .with_request_filter(probe.clone());

        let (handle, slot) = connection();
        dispatcher.dispatch(inbound("/"), handle).await.unwrap();

        let request = seen.recv().await.unwrap();
        assert_eq!(request.headers().get("x-probe").unwrap(), "1");
        assert_eq!(*probe.0.lock().unwrap(), ["filter"]);
        slot.await.unwrap();
    }

    #[tokio::test]
    async fn filter_rejection_submits_nothing() {
        let (client, mut seen) = scripted(0);
        let dispatcher = Dispatcher::with_client(&config(&["http://b:80->1"]), client)
            .unwrap()
            .with_request_filter(Arc::new(RejectingFilter));

        let (handle, slot) = connection();
        let err = dispatcher.dispatch(inbound("/"), handle).await.unwrap_err();

        assert!(matches!(err, GatewayError::Filter(_)));
        assert!(slot.await.is_err());
        assert!(seen.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_call_answers_bad_gateway_and_next_dispatch_succeeds() {
        let (client, _seen) = scripted(1);
        let dispatcher = Dispatcher::with_client(&config(&["http://b:80->1"]), client).unwrap();

        let (handle, slot) = connection();
        dispatcher.dispatch(inbound("/first"), handle).await.unwrap();
        assert_eq!(slot.await.unwrap().status(), StatusCode::BAD_GATEWAY);

        let (handle, slot) = connection();
        dispatcher.dispatch(inbound("/second"), handle).await.unwrap();
        assert_eq!(slot.await.unwrap().status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn timeout_answers_gateway_timeout() {
        let mut config = config(&["http://b:80->1"]);
        config.upstream.timeout_ms = 20;
        let dispatcher = Dispatcher::with_client(&config, Arc::new(HangingClient)).unwrap();

        let (handle, slot) = connection();
        dispatcher.dispatch(inbound("/"), handle).await.unwrap();
        assert_eq!(slot.await.unwrap().status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[tokio::test]
    async fn many_concurrent_dispatches_all_complete() {
        let (client, _seen) = scripted(0);
        let mut config = config(&["http://a:80->3", "http://b:80->1"]);
        config.pool.queue_capacity = 1;
        config.pool.max_workers = 1;
        let dispatcher = Arc::new(Dispatcher::with_client(&config, client).unwrap());

        let mut slots = Vec::new();
        for i in 0..64 {
            let (handle, slot) = connection();
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher.dispatch(inbound(&format!("/{i}")), handle).await.unwrap();
            });
            slots.push(slot);
        }

        for slot in slots {
            assert_eq!(slot.await.unwrap().status(), StatusCode::OK);
        }
    }

    #[test]
    fn rejects_invalid_backends() {
        let (client, _seen) = scripted(0);
        let err = Dispatcher::with_client(&config(&[]), client).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidConfiguration(_)));
    }
}
