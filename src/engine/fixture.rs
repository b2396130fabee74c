//! Static fixture engine.
//!
//! Serves canned examples from a TOML file of operations. It understands
//! the `code`, `mediaTypes` and `exampleKey` mock settings; it cannot
//! generate payloads, so `dynamic` is reported as an informational
//! diagnostic and the static example is served instead.
//!
//! ```toml
//! [[operations]]
//! method = "get"
//! path = "/pets/{id}"
//!
//! [[operations.responses]]
//! code = "200"
//! media_type = "application/json"
//! examples = { cat = { id = 1, name = "Tom" } }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EngineConfig;
use crate::engine::{Engine, EngineDiagnostic, EngineOutput, EngineResponse, EngineValidations};
use crate::http::problem::{ProblemError, NOT_FOUND, NOT_IMPLEMENTED, NO_PATH_MATCHED};
use crate::http::request::{HttpMethod, NormalizedRequest};
use crate::mocking::MockConfig;
use crate::validation::DiagnosticSeverity;

const DEFAULT_MEDIA_TYPE: &str = "application/json";

/// One operation the fixture engine can answer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FixtureOperation {
    pub method: HttpMethod,

    /// Path template; `{name}` segments match any single segment.
    pub path: String,

    /// Emit a request-side error diagnostic when the body is missing.
    #[serde(default)]
    pub request_body_required: bool,

    #[serde(default)]
    pub responses: Vec<FixtureResponse>,
}

/// A canned response for one status code.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FixtureResponse {
    pub code: String,

    #[serde(default)]
    pub media_type: Option<String>,

    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Named examples; the first (by name) is the default.
    #[serde(default)]
    pub examples: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct FixtureFile {
    #[serde(default)]
    operations: Vec<FixtureOperation>,
}

/// Error loading a fixture file.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Load operations from a TOML fixture file.
pub fn load_operations(path: &Path) -> Result<Vec<FixtureOperation>, FixtureError> {
    let content = fs::read_to_string(path)?;
    let file: FixtureFile = toml::from_str(&content)?;
    tracing::info!(path = ?path, operations = file.operations.len(), "Fixtures loaded");
    Ok(file.operations)
}

/// Engine answering from [`FixtureOperation`]s.
#[derive(Debug, Clone, Default)]
pub struct FixtureEngine;

impl FixtureEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Engine for FixtureEngine {
    type Operation = FixtureOperation;

    async fn request(
        &self,
        input: &NormalizedRequest,
        operations: &[FixtureOperation],
        config: &EngineConfig,
    ) -> Result<EngineResponse, ProblemError> {
        let operation = operations
            .iter()
            .find(|op| op.method == input.method && path_matches(&op.path, &input.url.path))
            .ok_or_else(|| {
                ProblemError::from_template(
                    NO_PATH_MATCHED,
                    format!(
                        "The route {} {} hasn't been found in the fixtures",
                        input.method, input.url.path
                    ),
                )
            })?;

        let options = match &config.mock {
            MockConfig::Enabled(options) => options,
            MockConfig::Disabled => {
                return Err(ProblemError::from_template(
                    NOT_IMPLEMENTED,
                    "The fixture engine can only serve mocked responses",
                ))
            }
        };

        let mut validations = EngineValidations::default();
        if config.validate_request && operation.request_body_required && input.body.is_none() {
            validations.input.push(EngineDiagnostic {
                path: vec!["body".to_string()],
                severity: DiagnosticSeverity::Error,
                code: Some("required".to_string()),
                message: "Body parameter is required".to_string(),
            });
        }

        let response = select_response(operation, options.code.as_deref())?;
        let media_type = select_media_type(response, options.media_types.as_deref())?;

        if options.dynamic == Some(true) {
            validations.output.push(EngineDiagnostic {
                path: Vec::new(),
                severity: DiagnosticSeverity::Information,
                code: Some("dynamic".to_string()),
                message: "Dynamic generation is not supported by fixtures; serving a static example"
                    .to_string(),
            });
        }

        let body = match &options.example_key {
            Some(key) => Some(response.examples.get(key).cloned().ok_or_else(|| {
                ProblemError::from_template(
                    NOT_FOUND,
                    format!(
                        "Response for contentType: {} and exampleKey: {} does not exist.",
                        media_type, key
                    ),
                )
            })?),
            None => response.examples.values().next().cloned(),
        };

        let code = response.code.parse::<u16>().map_err(|_| {
            ProblemError::plain(format!("Fixture response code '{}' is not numeric", response.code))
        })?;

        let mut headers = response.headers.clone();
        if body.is_some() {
            headers.insert("content-type".to_string(), media_type);
        }

        Ok(EngineResponse {
            output: EngineOutput {
                status_code: code,
                headers: Some(headers),
                body,
            },
            validations,
        })
    }
}

fn path_matches(template: &str, path: &str) -> bool {
    let mut template_segments = template.trim_matches('/').split('/');
    let mut path_segments = path.trim_matches('/').split('/');
    loop {
        match (template_segments.next(), path_segments.next()) {
            (None, None) => return true,
            (Some(t), Some(p)) => {
                let is_param = t.starts_with('{') && t.ends_with('}');
                if !is_param && t != p {
                    return false;
                }
                if is_param && p.is_empty() {
                    return false;
                }
            }
            _ => return false,
        }
    }
}

/// Requested code, else the lowest 2xx, else the first declared.
fn select_response<'a>(
    operation: &'a FixtureOperation,
    code: Option<&str>,
) -> Result<&'a FixtureResponse, ProblemError> {
    if let Some(code) = code {
        return operation
            .responses
            .iter()
            .find(|r| r.code == code)
            .ok_or_else(|| {
                ProblemError::from_template(
                    NOT_FOUND,
                    format!("Requested status code {} is not defined for {}", code, operation.path),
                )
            });
    }

    operation
        .responses
        .iter()
        .filter(|r| r.code.starts_with('2'))
        .min_by(|a, b| a.code.cmp(&b.code))
        .or_else(|| operation.responses.first())
        .ok_or_else(|| {
            ProblemError::from_template(
                NOT_FOUND,
                format!("No responses are defined for {}", operation.path),
            )
        })
}

fn select_media_type(
    response: &FixtureResponse,
    accepted: Option<&[String]>,
) -> Result<String, ProblemError> {
    let declared = response
        .media_type
        .clone()
        .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());

    match accepted {
        None => Ok(declared),
        Some([]) => Ok(declared),
        Some(accepted) => accepted
            .iter()
            .find(|m| m.eq_ignore_ascii_case(&declared))
            .cloned()
            .ok_or_else(|| {
                ProblemError::from_template(
                    NOT_FOUND,
                    format!(
                        "Unable to find content for {:?}; response {} declares {}",
                        accepted, response.code, declared
                    ),
                )
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocking::MockOptions;
    use serde_json::json;

    const FIXTURES: &str = r#"
        [[operations]]
        method = "get"
        path = "/pets/{id}"

        [[operations.responses]]
        code = "404"
        examples = { missing = { message = "not found" } }

        [[operations.responses]]
        code = "200"
        media_type = "application/json"
        headers = { x-source = "fixture" }
        examples = { cat = { name = "Tom" }, dog = { name = "Rex" } }

        [[operations]]
        method = "post"
        path = "/pets"
        request_body_required = true

        [[operations.responses]]
        code = "201"
    "#;

    fn operations() -> Vec<FixtureOperation> {
        toml::from_str::<FixtureFile>(FIXTURES).unwrap().operations
    }

    fn input(method: HttpMethod, path: &str) -> NormalizedRequest {
        let mut input = NormalizedRequest::default();
        input.method = method;
        input.url.path = path.to_string();
        input
    }

    fn config(options: MockOptions) -> EngineConfig {
        EngineConfig {
            mock: MockConfig::Enabled(options),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_serves_first_2xx_and_first_example() {
        let res = FixtureEngine::new()
            .request(&input(HttpMethod::Get, "/pets/7"), &operations(), &config(MockOptions::default()))
            .await
            .unwrap();
        assert_eq!(res.output.status_code, 200);
        assert_eq!(res.output.body, Some(json!({"name": "Tom"})));
        let headers = res.output.headers.unwrap();
        assert_eq!(headers["x-source"], "fixture");
        assert_eq!(headers["content-type"], "application/json");
    }

    #[tokio::test]
    async fn test_honours_code_and_example_key() {
        let options = MockOptions {
            code: Some("200".into()),
            example_key: Some("dog".into()),
            ..Default::default()
        };
        let res = FixtureEngine::new()
            .request(&input(HttpMethod::Get, "/pets/7"), &operations(), &config(options))
            .await
            .unwrap();
        assert_eq!(res.output.body, Some(json!({"name": "Rex"})));

        let options = MockOptions {
            code: Some("404".into()),
            ..Default::default()
        };
        let res = FixtureEngine::new()
            .request(&input(HttpMethod::Get, "/pets/7"), &operations(), &config(options))
            .await
            .unwrap();
        assert_eq!(res.output.status_code, 404);
    }

    #[tokio::test]
    async fn test_unknown_path_is_404_problem() {
        let err = FixtureEngine::new()
            .request(&input(HttpMethod::Get, "/owners"), &operations(), &config(MockOptions::default()))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.kind, "NO_PATH_MATCHED_ERROR");
    }

    #[tokio::test]
    async fn test_missing_example_is_404() {
        let options = MockOptions {
            example_key: Some("hamster".into()),
            ..Default::default()
        };
        let err = FixtureEngine::new()
            .request(&input(HttpMethod::Get, "/pets/7"), &operations(), &config(options))
            .await
            .unwrap_err();
        assert_eq!(err.kind, "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_unacceptable_media_type_is_404() {
        let options = MockOptions {
            media_types: Some(vec!["application/xml".into()]),
            ..Default::default()
        };
        let err = FixtureEngine::new()
            .request(&input(HttpMethod::Get, "/pets/7"), &operations(), &config(options))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_missing_required_body_is_request_error() {
        let res = FixtureEngine::new()
            .request(&input(HttpMethod::Post, "/pets"), &operations(), &config(MockOptions::default()))
            .await
            .unwrap();
        assert_eq!(res.output.status_code, 201);
        assert_eq!(res.output.body, None);
        assert_eq!(res.validations.input.len(), 1);
        assert_eq!(res.validations.input[0].severity, DiagnosticSeverity::Error);
    }

    #[tokio::test]
    async fn test_dynamic_reports_information() {
        let options = MockOptions {
            dynamic: Some(true),
            ..Default::default()
        };
        let res = FixtureEngine::new()
            .request(&input(HttpMethod::Get, "/pets/1"), &operations(), &config(options))
            .await
            .unwrap();
        assert_eq!(res.validations.output[0].severity, DiagnosticSeverity::Information);
    }

    #[tokio::test]
    async fn test_disabled_mocking_is_501() {
        let cfg = EngineConfig {
            mock: MockConfig::Disabled,
            ..Default::default()
        };
        let err = FixtureEngine::new()
            .request(&input(HttpMethod::Get, "/pets/1"), &operations(), &cfg)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 501);
    }

    #[test]
    fn test_path_matching() {
        assert!(path_matches("/pets/{id}", "/pets/1"));
        assert!(path_matches("/pets", "/pets/"));
        assert!(!path_matches("/pets/{id}", "/pets"));
        assert!(!path_matches("/pets/{id}", "/pets/1/toys"));
        assert!(!path_matches("/pets", "/owners"));
    }
}
