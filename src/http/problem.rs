//! Problem documents (`application/problem+json`) and the error type that
//! carries them through the request pipeline.
//!
//! Every failure in the pipeline (preference decoding, body parsing, the
//! engine call, strict validation, response serialization) is expressed as a
//! [`ProblemError`] so that one emitter can turn it into a wire response.

use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

use crate::validation::ValidationDiagnostic;

/// Media type used for every error body.
pub const PROBLEM_JSON: &str = "application/problem+json";

/// Prefix of the `type` member of every problem document.
pub const PROBLEM_TYPE_BASE: &str = "urn:mock-adapter:errors#";

/// Static description of a class of errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemTemplate {
    pub kind: &'static str,
    pub title: &'static str,
    pub status: u16,
}

pub const UNPROCESSABLE_ENTITY: ProblemTemplate = ProblemTemplate {
    kind: "UNPROCESSABLE_ENTITY",
    title: "Invalid request",
    status: 422,
};

pub const BAD_REQUEST: ProblemTemplate = ProblemTemplate {
    kind: "BAD_REQUEST",
    title: "Malformed request",
    status: 400,
};

pub const INVALID_REQUEST_BODY: ProblemTemplate = ProblemTemplate {
    kind: "INVALID_REQUEST_BODY",
    title: "Request body could not be parsed",
    status: 400,
};

pub const PAYLOAD_TOO_LARGE: ProblemTemplate = ProblemTemplate {
    kind: "PAYLOAD_TOO_LARGE",
    title: "Request body exceeds the configured limit",
    status: 413,
};

pub const METHOD_NOT_ALLOWED: ProblemTemplate = ProblemTemplate {
    kind: "METHOD_NOT_ALLOWED",
    title: "HTTP method not supported",
    status: 405,
};

pub const VIOLATIONS: ProblemTemplate = ProblemTemplate {
    kind: "VIOLATIONS",
    title: "Request/Response not valid",
    status: 500,
};

pub const NO_PATH_MATCHED: ProblemTemplate = ProblemTemplate {
    kind: "NO_PATH_MATCHED_ERROR",
    title: "Route not resolved, no path matched",
    status: 404,
};

pub const NOT_FOUND: ProblemTemplate = ProblemTemplate {
    kind: "NOT_FOUND",
    title: "The server cannot find the requested content",
    status: 404,
};

pub const NOT_IMPLEMENTED: ProblemTemplate = ProblemTemplate {
    kind: "NOT_IMPLEMENTED",
    title: "Mocking is disabled and no upstream is available",
    status: 501,
};

pub const UNKNOWN: ProblemTemplate = ProblemTemplate {
    kind: "UNKNOWN",
    title: "Unexpected error",
    status: 500,
};

/// Extra context attached to a problem.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProblemAdditional {
    /// Written as response headers by the error emitter, never into the body.
    #[serde(skip)]
    pub headers: BTreeMap<String, String>,

    /// Offending diagnostics for `VIOLATIONS` problems.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Vec<ValidationDiagnostic>>,
}

/// An error that renders as a problem document.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{title}: {detail}")]
pub struct ProblemError {
    pub kind: String,
    pub title: String,
    /// `None` renders as 500.
    pub status: Option<u16>,
    pub detail: String,
    pub additional: ProblemAdditional,
}

impl ProblemError {
    /// Build an error from a template and a human-readable detail.
    pub fn from_template(template: ProblemTemplate, detail: impl Into<String>) -> Self {
        Self {
            kind: template.kind.to_string(),
            title: template.title.to_string(),
            status: Some(template.status),
            detail: detail.into(),
            additional: ProblemAdditional::default(),
        }
    }

    /// Build an error with no status, as engines do for unexpected faults.
    pub fn plain(title: impl Into<String>) -> Self {
        Self {
            kind: UNKNOWN.kind.to_string(),
            title: title.into(),
            status: None,
            detail: String::new(),
            additional: ProblemAdditional::default(),
        }
    }

    pub fn with_validation(mut self, diagnostics: Vec<ValidationDiagnostic>) -> Self {
        self.additional.validation = Some(diagnostics);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.additional.headers.insert(name.into(), value.into());
        self
    }

    /// Status written on the wire.
    pub fn status_code(&self) -> u16 {
        self.status.unwrap_or(500)
    }

    /// The wire representation of this error.
    pub fn document(&self) -> ProblemDocument<'_> {
        ProblemDocument {
            kind: format!("{}{}", PROBLEM_TYPE_BASE, self.kind),
            title: &self.title,
            status: self.status_code(),
            detail: &self.detail,
            additional: &self.additional,
        }
    }
}

/// Serialized body of an error response.
#[derive(Debug, Serialize)]
pub struct ProblemDocument<'a> {
    #[serde(rename = "type")]
    pub kind: String,
    pub title: &'a str,
    pub status: u16,
    pub detail: &'a str,
    #[serde(flatten)]
    pub additional: &'a ProblemAdditional,
}
