//! Boundary to the mock/validation engine.
//!
//! The adapter never generates or validates payloads itself. It hands a
//! [`NormalizedRequest`] plus the effective [`EngineConfig`] to an
//! [`Engine`] and renders whatever comes back.

pub mod fixture;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::http::problem::ProblemError;
use crate::http::request::NormalizedRequest;
use crate::validation::DiagnosticSeverity;

pub use fixture::{FixtureEngine, FixtureOperation};

/// A mock/validation engine.
///
/// Operations are supplied once at server construction and are never
/// mutated by the adapter.
#[async_trait]
pub trait Engine: Send + Sync + 'static {
    /// Engine-specific description of one API operation.
    type Operation: Send + Sync + 'static;

    /// Produce a response for `input`.
    async fn request(
        &self,
        input: &NormalizedRequest,
        operations: &[Self::Operation],
        config: &EngineConfig,
    ) -> Result<EngineResponse, ProblemError>;
}

/// Result of a successful engine call.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EngineResponse {
    pub output: EngineOutput,
    #[serde(default)]
    pub validations: EngineValidations,
}

/// What should be written back to the client.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOutput {
    pub status_code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl Default for EngineOutput {
    fn default() -> Self {
        Self {
            status_code: 200,
            headers: None,
            body: None,
        }
    }
}

/// Findings from validating the request and the generated response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EngineValidations {
    #[serde(default)]
    pub input: Vec<EngineDiagnostic>,
    #[serde(default)]
    pub output: Vec<EngineDiagnostic>,
}

/// A raw finding, before it is tagged with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EngineDiagnostic {
    #[serde(default)]
    pub path: Vec<String>,
    pub severity: DiagnosticSeverity,
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}
