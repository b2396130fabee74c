//! Shared utilities for integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use tower::ServiceExt;

use mock_adapter::config::{AdapterConfig, EngineConfig};
use mock_adapter::engine::{Engine, EngineResponse};
use mock_adapter::http::NormalizedRequest;
use mock_adapter::{MockServer, ProblemError};

/// Every call the stub engine received.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct RecordedCall {
    pub input: NormalizedRequest,
    pub config: EngineConfig,
}

/// Engine returning a fixed result and recording its inputs.
#[derive(Clone)]
pub struct StubEngine {
    result: Result<EngineResponse, ProblemError>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl StubEngine {
    pub fn returning(result: Result<EngineResponse, ProblemError>) -> Self {
        Self {
            result,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Engine for StubEngine {
    type Operation = ();

    async fn request(
        &self,
        input: &NormalizedRequest,
        _operations: &[()],
        config: &EngineConfig,
    ) -> Result<EngineResponse, ProblemError> {
        self.calls.lock().unwrap().push(RecordedCall {
            input: input.clone(),
            config: config.clone(),
        });
        self.result.clone()
    }
}

/// Build a server around a stub engine and keep a handle on the engine.
pub fn server(
    result: Result<EngineResponse, ProblemError>,
    config: AdapterConfig,
) -> (MockServer<StubEngine>, StubEngine) {
    let engine = StubEngine::returning(result);
    let server = MockServer::new(engine.clone(), Vec::new(), config);
    (server, engine)
}

/// Send one request through the router in-process.
pub async fn send(router: Router, request: Request<Body>) -> Response {
    router.oneshot(request).await.unwrap()
}

/// Read a whole response body.
pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap()
        .to_vec()
}
