//! Validation diagnostics reported by the engine.
//!
//! # Data Flow
//! ```text
//! engine response
//!     → validations.input  (request-side findings)
//!     → validations.output (response-side findings)
//!     → aggregate.rs (tag by origin, log, sl-violations header, strict check)
//! ```

pub mod aggregate;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use aggregate::{Diagnostics, SL_VIOLATIONS};

/// Severity of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Information,
    Hint,
}

impl DiagnosticSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticSeverity::Error => "Error",
            DiagnosticSeverity::Warning => "Warning",
            DiagnosticSeverity::Information => "Information",
            DiagnosticSeverity::Hint => "Hint",
        }
    }
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which side of the exchange a diagnostic was raised against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Request,
    Response,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Request => "request",
            Origin::Response => "response",
        }
    }
}

/// A diagnostic as reported to clients and logs.
///
/// `location[0]` is always the origin tag (`request` or `response`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ValidationDiagnostic {
    pub location: Vec<String>,
    pub severity: DiagnosticSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub message: String,
}

impl ValidationDiagnostic {
    pub fn origin(&self) -> Option<Origin> {
        match self.location.first().map(String::as_str) {
            Some("request") => Some(Origin::Request),
            Some("response") => Some(Origin::Response),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}
