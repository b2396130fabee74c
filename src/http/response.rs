//! Response writing.
//!
//! # Responsibilities
//! - Accumulate headers set by each pipeline stage on one [`Reply`]
//! - Serialize engine bodies according to the negotiated content type
//! - Render any [`ProblemError`] as `application/problem+json`
//!
//! # Design Decisions
//! - Headers set before a failure stay on the error response
//! - Once a reply is finished it is never written again; a late error only
//!   ends it
//! - Serialization failures become 500 problems instead of panics

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::engine::EngineOutput;
use crate::http::problem::{ProblemError, PROBLEM_JSON, UNKNOWN};
use crate::http::request::{is_json_media_type, NormalizedRequest};

/// Outgoing response under construction.
#[derive(Debug, Default)]
pub struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    finished: bool,
}

impl Reply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) a header.
    pub fn set_header(&mut self, name: &str, value: &str) -> Result<(), ProblemError> {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            emitter_error(format!("Invalid response header name {:?}: {}", name, e))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| {
            emitter_error(format!("Invalid value for response header {:?}: {}", name, e))
        })?;
        self.headers.insert(header_name, header_value);
        Ok(())
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Write status and body and finish the reply.
    pub fn send(&mut self, status: StatusCode, body: impl Into<Bytes>) {
        if self.finished {
            tracing::warn!(status = %status, "Reply already finished, dropping second write");
            return;
        }
        self.status = status;
        self.body = body.into();
        self.finished = true;
    }

    /// Finish the reply without writing anything further.
    pub fn end(&mut self) {
        self.finished = true;
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Write a successful engine output.
pub fn emit_output(reply: &mut Reply, output: &EngineOutput) -> Result<(), ProblemError> {
    if let Some(headers) = &output.headers {
        for (name, value) in headers {
            reply.set_header(name, value)?;
        }
    }

    let status = StatusCode::from_u16(output.status_code).map_err(|_| {
        emitter_error(format!("Engine produced invalid status code {}", output.status_code))
    })?;
    let content_type = reply.header(header::CONTENT_TYPE.as_str()).map(str::to_owned);
    let body = serialize(output.body.as_ref(), content_type.as_deref())?;

    reply.send(status, body);
    Ok(())
}

/// Serialize a body for the given content type.
pub fn serialize(
    body: Option<&serde_json::Value>,
    content_type: Option<&str>,
) -> Result<Bytes, ProblemError> {
    let Some(body) = body else {
        return Ok(Bytes::new());
    };
    if let serde_json::Value::String(text) = body {
        return Ok(Bytes::from(text.clone()));
    }

    match content_type {
        Some(ct) if is_xml_media_type(ct) => Err(emitter_error(format!(
            "Cannot serialize a structured body as {}",
            ct
        ))),
        Some(ct) if !is_json_media_type(ct) => {
            tracing::debug!(content_type = %ct, "Serializing non-JSON media type as JSON text");
            to_json(body)
        }
        _ => to_json(body),
    }
}

fn to_json(body: &serde_json::Value) -> Result<Bytes, ProblemError> {
    serde_json::to_vec(body)
        .map(Bytes::from)
        .map_err(|e| emitter_error(format!("Failed to serialize response body: {}", e)))
}

fn is_xml_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence.ends_with("/xml") || essence.ends_with("+xml")
}

fn emitter_error(detail: String) -> ProblemError {
    ProblemError::from_template(UNKNOWN, detail)
}

/// Render an error on the reply, or just end it if it was already written.
pub fn emit_error(reply: &mut Reply, error: &ProblemError, input: Option<&NormalizedRequest>) {
    if reply.is_finished() {
        reply.end();
    } else {
        reply
            .headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(PROBLEM_JSON));
        for (name, value) in &error.additional.headers {
            if let Err(e) = reply.set_header(name, value) {
                tracing::warn!(header = %name, error = %e, "Skipping invalid problem header");
            }
        }

        let status =
            StatusCode::from_u16(error.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::to_vec(&error.document()).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to serialize problem document");
            Vec::new()
        });
        reply.send(status, body);
    }

    match input {
        Some(input) => {
            tracing::error!(input = %input, "Request terminated with error: {}", error)
        }
        None => tracing::error!("Request terminated with error: {}", error),
    }
}
