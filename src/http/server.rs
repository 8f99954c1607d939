//! HTTP server setup and the inbound handler.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all inbound handler
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener and shut down gracefully
//! - Hand each complete request to the dispatcher and await its response slot
//! - Contain every dispatch fault at this boundary

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, Response, StatusCode},
    routing::any,
    Router,
};
use futures_util::FutureExt;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::Instrument;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::client::OutboundClient;
use crate::http::dispatcher::Dispatcher;
use crate::http::request::InboundRequest;
use crate::http::X_REQUEST_ID;
use crate::net::ConnectionHandle;
use crate::observability::metrics::{self, Outcome};

/// Application state injected into handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// Fails with `InvalidConfiguration` if the backend list or pool settings
    /// are unusable.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        let dispatcher = Dispatcher::from_config(&config)?;
        Ok(Self::with_dispatcher(config, dispatcher))
    }

    /// Create a server around a custom outbound client.
    pub fn with_client(config: GatewayConfig, client: Arc<dyn OutboundClient>) -> Result<Self, GatewayError> {
        let dispatcher = Dispatcher::with_client(&config, client)?;
        Ok(Self::with_dispatcher(config, dispatcher))
    }

    fn with_dispatcher(config: GatewayConfig, dispatcher: Dispatcher) -> Self {
        tracing::info!(
            backends = dispatcher.table().len(),
            total_weight = dispatcher.table().total_weight(),
            policy = ?config.routing.policy,
            pool = ?dispatcher.pool(),
            "Dispatcher ready"
        );

        let state = AppState {
            dispatcher: Arc::new(dispatcher),
        };
        Self {
            router: Self::build_router(state),
            config,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(inbound_handler))
            .route("/", any(inbound_handler))
            .with_state(state)
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// The router without connection info; used to serve in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Entry point for every complete inbound request.
///
/// Dispatch errors and panics are logged and answered with 502; they never
/// reach the connection task.
async fn inbound_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response<Body> {
    let request_id = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let (connection, slot) = ConnectionHandle::new(peer, request.version());
    let span = tracing::info_span!(
        "inbound",
        request_id = %request_id,
        connection_id = %connection.id(),
        peer = %peer,
    );

    async move {
        let inbound = InboundRequest::from_request(request);
        tracing::debug!(method = %inbound.method(), uri = %inbound.uri(), "Request received");

        let dispatched = AssertUnwindSafe(state.dispatcher.dispatch(inbound, connection))
            .catch_unwind()
            .await;
        match dispatched {
            Ok(Ok(execution)) => {
                tracing::trace!(execution = execution.as_str(), "Request submitted");
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Dispatch failed");
                metrics::record_outcome(Outcome::HandlerFault);
            }
            Err(_) => {
                tracing::error!("Dispatch panicked");
                metrics::record_outcome(Outcome::HandlerFault);
            }
        }

        match slot.await {
            Ok(response) => response,
            Err(_) => {
                let mut response = Response::new(Body::empty());
                *response.status_mut() = StatusCode::BAD_GATEWAY;
                response
            }
        }
    }
    .instrument(span)
    .await
}
