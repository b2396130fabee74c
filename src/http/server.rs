//! HTTP server setup and request pipeline.
//!
//! # Responsibilities
//! - Create the Axum Router with one catch-all handler
//! - Wire up middleware (tracing, request ID, CORS)
//! - Run each request through normalize → preferences → merge → engine →
//!   diagnostics → emit, routing any failure to the error emitter
//! - Bind and drain the listener (`listen` / `close`)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    middleware::from_fn,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{AdapterConfig, EngineConfig};
use crate::engine::Engine;
use crate::http::middleware::cors_middleware;
use crate::http::problem::{ProblemError, UNKNOWN};
use crate::http::request::{normalize, NormalizedRequest};
use crate::http::response::{emit_error, emit_output, Reply};
use crate::lifecycle::Shutdown;
use crate::mocking::resolve_mock_config;
use crate::observability::metrics;
use crate::validation::{Diagnostics, SL_VIOLATIONS};

const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Transport errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind the listener.
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    /// The server stopped with an I/O error.
    #[error("Server I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serving task panicked or was cancelled.
    #[error("Server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Server is already listening")]
    AlreadyListening,

    #[error("Server is not listening")]
    NotListening,
}

/// Application state injected into handlers.
pub struct AppState<E: Engine> {
    pub engine: Arc<E>,
    pub operations: Arc<[E::Operation]>,
    pub config: Arc<AdapterConfig>,
}

impl<E: Engine> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            operations: Arc::clone(&self.operations),
            config: Arc::clone(&self.config),
        }
    }
}

/// HTTP front end for an [`Engine`].
pub struct MockServer<E: Engine> {
    router: Router,
    state: AppState<E>,
    shutdown: Shutdown,
    task: Option<JoinHandle<Result<(), std::io::Error>>>,
}

impl<E: Engine> MockServer<E> {
    /// Create a server over `engine` and its `operations`.
    pub fn new(engine: E, operations: Vec<E::Operation>, config: AdapterConfig) -> Self {
        let state = AppState {
            engine: Arc::new(engine),
            operations: Arc::from(operations),
            config: Arc::new(config),
        };
        let router = Self::build_router(&state);
        Self {
            router,
            state,
            shutdown: Shutdown::new(),
            task: None,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: &AppState<E>) -> Router {
        let router = Router::new()
            .route("/{*path}", any(mock_handler::<E>))
            .route("/", any(mock_handler::<E>))
            .with_state(state.clone());

        let router = if state.config.cors {
            router.layer(from_fn(cors_middleware))
        } else {
            router
        };

        router
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// The router, for serving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn engine(&self) -> &E {
        &self.state.engine
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.state.config
    }

    /// Bind `host:port` from the listener config and start serving.
    ///
    /// Resolves to the bound address as a URL (`http://127.0.0.1:4010`).
    pub async fn listen(&mut self, port: u16) -> Result<String, ServerError> {
        if self.task.is_some() {
            return Err(ServerError::AlreadyListening);
        }

        let address = format!("{}:{}", self.state.config.listener.host, port);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.clone(),
                source,
            })?;
        let local_addr: SocketAddr = listener.local_addr()?;

        tracing::info!(address = %local_addr, "HTTP server starting");

        let app = self.router.clone();
        let shutdown = self.shutdown.wait();
        self.task = Some(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await
        }));

        Ok(format!("http://{}", local_addr))
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    pub async fn close(&mut self) -> Result<(), ServerError> {
        let task = self.task.take().ok_or(ServerError::NotListening)?;
        self.shutdown.trigger();
        task.await??;
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every method, every path.
async fn mock_handler<E: Engine>(
    State(state): State<AppState<E>>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let mut reply = Reply::new();
    match normalize(request, state.config.limits.max_body_bytes).await {
        Ok(input) => {
            tracing::info!(request_id = %request_id, input = %input, "Request received");
            if let Err(e) = run_pipeline(&state, &input, &mut reply).await {
                emit_error(&mut reply, &e, Some(&input));
            }
        }
        Err(e) => emit_error(&mut reply, &e, None),
    }

    metrics::record_request(&method, reply.status().as_u16(), start_time);
    reply.into_response()
}

async fn run_pipeline<E: Engine>(
    state: &AppState<E>,
    input: &NormalizedRequest,
    reply: &mut Reply,
) -> Result<(), ProblemError> {
    let server_config = &state.config.engine;
    let config = EngineConfig {
        mock: resolve_mock_config(&server_config.mock, input)?,
        ..server_config.clone()
    };

    let response = state
        .engine
        .request(input, &state.operations, &config)
        .await?;

    let diagnostics = Diagnostics::from_engine(&response.validations);
    diagnostics.log();
    let header = diagnostics.header_value().map_err(|e| {
        ProblemError::from_template(UNKNOWN, format!("Failed to encode violations: {}", e))
    })?;
    if let Some(header) = header {
        reply.set_header(SL_VIOLATIONS, &header)?;
    }
    diagnostics.enforce(server_config.errors)?;

    emit_output(reply, &response.output)
}
