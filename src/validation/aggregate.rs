//! Diagnostic aggregation and severity routing.
//!
//! # Responsibilities
//! - Prefix every engine diagnostic with its origin
//! - Log each diagnostic at a level derived from its severity
//! - Encode the full list for the `sl-violations` response header
//! - Turn response-side errors into a failure when strict errors are on

use crate::engine::{EngineDiagnostic, EngineValidations};
use crate::http::problem::{ProblemError, VIOLATIONS};
use crate::observability::metrics;
use crate::validation::{DiagnosticSeverity, Origin, ValidationDiagnostic};

/// Response header carrying the JSON-encoded diagnostic list.
pub const SL_VIOLATIONS: &str = "sl-violations";

const STRICT_ERRORS_DETAIL: &str = "Your request/response is not valid and strict errors are enabled, \
     so this error is generated instead of the mocked response.";

/// Diagnostics of one engine call, request-side first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<ValidationDiagnostic>,
}

impl Diagnostics {
    /// Tag and concatenate the input and output diagnostics of an engine call.
    pub fn from_engine(validations: &EngineValidations) -> Self {
        let items = validations
            .input
            .iter()
            .map(|d| tag(Origin::Request, d))
            .chain(validations.output.iter().map(|d| tag(Origin::Response, d)))
            .collect();
        Self { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationDiagnostic> {
        self.items.iter()
    }

    /// Emit one log event per diagnostic.
    pub fn log(&self) {
        for diagnostic in &self.items {
            let message = format!(
                "Violation: {} {}",
                diagnostic.location.join("."),
                diagnostic.message
            );
            match diagnostic.severity {
                DiagnosticSeverity::Error => tracing::error!(target: "validator", "{}", message),
                DiagnosticSeverity::Warning => tracing::warn!(target: "validator", "{}", message),
                _ => tracing::info!(target: "validator", "{}", message),
            }

            let origin = diagnostic.origin().map(|o| o.as_str()).unwrap_or("unknown");
            metrics::record_violation(origin, diagnostic.severity.as_str());
        }
    }

    /// Value of the `sl-violations` header, or `None` when there is nothing to report.
    pub fn header_value(&self) -> Result<Option<String>, serde_json::Error> {
        if self.items.is_empty() {
            return Ok(None);
        }
        serde_json::to_string(&self.items).map(Some)
    }

    /// Response-side diagnostics with `Error` severity.
    pub fn response_errors(&self) -> Vec<ValidationDiagnostic> {
        self.items
            .iter()
            .filter(|d| d.origin() == Some(Origin::Response) && d.is_error())
            .cloned()
            .collect()
    }

    /// Fail with a `VIOLATIONS` problem when strict errors are on and the
    /// response has at least one error.
    pub fn enforce(&self, strict_errors: bool) -> Result<(), ProblemError> {
        if !strict_errors {
            return Ok(());
        }
        let errors = self.response_errors();
        if errors.is_empty() {
            return Ok(());
        }
        Err(ProblemError::from_template(VIOLATIONS, STRICT_ERRORS_DETAIL).with_validation(errors))
    }
}

fn tag(origin: Origin, diagnostic: &EngineDiagnostic) -> ValidationDiagnostic {
    let mut location = Vec::with_capacity(diagnostic.path.len() + 1);
    location.push(origin.as_str().to_string());
    location.extend(diagnostic.path.iter().cloned());

    ValidationDiagnostic {
        location,
        severity: diagnostic.severity,
        code: diagnostic.code.clone(),
        message: diagnostic.message.clone(),
    }
}
