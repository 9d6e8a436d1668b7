//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Serve until the shutdown signal fires

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderName, Request},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::blobstore::BlobStore;
use crate::config::ServerConfig;
use crate::http::handlers;
use crate::ledger::{Ledger, Wallet};
use crate::lifecycle::Shutdown;
use crate::orchestrator::{DocumentOrchestrator, SessionRegistry};

/// Request correlation header.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into handlers.
pub struct AppState<L, B> {
    pub orchestrator: Arc<DocumentOrchestrator<L, B>>,
    pub sessions: SessionRegistry,
    pub wallet: Arc<Wallet>,
}

impl<L, B> Clone for AppState<L, B> {
    fn clone(&self) -> Self {
        Self {
            orchestrator: self.orchestrator.clone(),
            sessions: self.sessions.clone(),
            wallet: self.wallet.clone(),
        }
    }
}

/// HTTP front end for the document orchestrator.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new<L, B>(config: &ServerConfig, state: AppState<L, B>) -> Self
    where
        L: Ledger + 'static,
        B: BlobStore + 'static,
    {
        Self {
            router: build_router(config, state),
        }
    }

    /// Run the server until `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let mut signal = shutdown.subscribe();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = signal.recv().await;
                tracing::info!("HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Span for one request, tagged with its correlation id.
fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

/// Build the Axum router with all middleware layers.
#[allow(deprecated)]
pub fn build_router<L, B>(config: &ServerConfig, state: AppState<L, B>) -> Router
where
    L: Ledger + 'static,
    B: BlobStore + 'static,
{
    let request_id = HeaderName::from_static(X_REQUEST_ID);

    Router::new()
        .route("/health", get(handlers::health::<L, B>))
        .route("/sessions/{session}", get(handlers::session_status::<L, B>))
        .route("/sessions/{session}/upload", post(handlers::arm_session::<L, B>))
        .route("/sessions/{session}/files/{name}", put(handlers::upload_file::<L, B>))
        .route(
            "/documents/{id}",
            get(handlers::get_document::<L, B>).delete(handlers::delete_document::<L, B>),
        )
        .route("/documents/{id}/content", get(handlers::get_content::<L, B>))
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(RequestBodyLimitLayer::new(config.max_upload_bytes))
                .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
        )
}
