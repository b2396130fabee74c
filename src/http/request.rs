//! Request normalization.
//!
//! # Responsibilities
//! - Lowercase and validate the HTTP method
//! - Split the URL into path, query and override base URL (`__server`)
//! - Flatten headers into a name → value map
//! - Read and parse the body according to its content type
//!
//! # Design Decisions
//! - The body is never read when the request announces none
//! - Body size is bounded by `limits.max_body_bytes`; only exceeding it is a 413
//! - An empty body is `null` whatever its content type
//! - The result is immutable and built exactly once per request

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::LazyLock;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Method, Request};
use http_body_util::LengthLimitError;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::http::problem::{
    ProblemError, BAD_REQUEST, INVALID_REQUEST_BODY, METHOD_NOT_ALLOWED, PAYLOAD_TOO_LARGE,
};

/// Query parameter that overrides the base URL handed to the engine.
pub const SERVER_QUERY_PARAM: &str = "__server";

/// Arbitrary base used to resolve request targets; only path and query are kept.
static PARSE_BASE: LazyLock<Url> =
    LazyLock::new(|| Url::parse("http://example.com").expect("static base URL is valid"));

/// HTTP verbs understood by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn from_method(method: &Method) -> Option<Self> {
        match *method {
            Method::GET => Some(HttpMethod::Get),
            Method::PUT => Some(HttpMethod::Put),
            Method::POST => Some(HttpMethod::Post),
            Method::DELETE => Some(HttpMethod::Delete),
            Method::OPTIONS => Some(HttpMethod::Options),
            Method::HEAD => Some(HttpMethod::Head),
            Method::PATCH => Some(HttpMethod::Patch),
            Method::TRACE => Some(HttpMethod::Trace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Patch => "patch",
            HttpMethod::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A query parameter value: scalar when it occurs once, list otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multiple(Vec<String>),
}

impl QueryValue {
    pub fn as_single(&self) -> Option<&str> {
        match self {
            QueryValue::Single(value) => Some(value),
            QueryValue::Multiple(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestUrl {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default)]
    pub query: BTreeMap<String, QueryValue>,
}

/// The engine's view of an incoming request.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct NormalizedRequest {
    #[serde(default)]
    pub method: HttpMethod,
    pub url: RequestUrl,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub body: Option<serde_json::Value>,
}

impl NormalizedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

impl fmt::Display for NormalizedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => write!(f, "{} {}", self.method, self.url.path),
        }
    }
}

/// Convert an incoming request into a [`NormalizedRequest`].
pub async fn normalize(
    request: Request<Body>,
    body_limit: usize,
) -> Result<NormalizedRequest, ProblemError> {
    let (parts, body) = request.into_parts();

    let method = HttpMethod::from_method(&parts.method).ok_or_else(|| {
        ProblemError::from_template(
            METHOD_NOT_ALLOWED,
            format!("Method {} is not supported", parts.method),
        )
    })?;

    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let url = parse_url(target)?;
    let headers = flatten_headers(&parts.headers);
    let body = read_body(&parts.headers, body, body_limit).await?;

    Ok(NormalizedRequest {
        method,
        url,
        headers,
        body,
    })
}

fn parse_url(target: &str) -> Result<RequestUrl, ProblemError> {
    let url = PARSE_BASE.join(target).map_err(|e| {
        ProblemError::from_template(BAD_REQUEST, format!("Invalid request target: {}", e))
    })?;

    let mut query: BTreeMap<String, QueryValue> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        let value = value.into_owned();
        match query.get_mut(name.as_ref()) {
            None => {
                query.insert(name.into_owned(), QueryValue::Single(value));
            }
            Some(existing) => {
                let previous = std::mem::replace(existing, QueryValue::Multiple(Vec::new()));
                *existing = match previous {
                    QueryValue::Single(first) => QueryValue::Multiple(vec![first, value]),
                    QueryValue::Multiple(mut values) => {
                        values.push(value);
                        QueryValue::Multiple(values)
                    }
                };
            }
        }
    }

    let base_url = url
        .query_pairs()
        .find(|(name, _)| name == SERVER_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty());

    Ok(RequestUrl {
        path: url.path().to_string(),
        base_url,
        query,
    })
}

fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flat: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flat.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    flat
}

/// A request carries no body when it says so explicitly (`content-length: 0`)
/// or announces none of length, type or transfer encoding.
fn has_no_body(headers: &HeaderMap) -> bool {
    let content_length = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .map(str::trim);

    content_length == Some("0")
        || (content_length.is_none()
            && !headers.contains_key(header::CONTENT_TYPE)
            && !headers.contains_key(header::TRANSFER_ENCODING))
}

/// `application/json` or any `application/*+json`.
pub fn is_json_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    essence == "application/json"
        || essence
            .strip_prefix("application/")
            .is_some_and(|subtype| subtype.ends_with("+json"))
}

async fn read_body(
    headers: &HeaderMap,
    body: Body,
    limit: usize,
) -> Result<Option<serde_json::Value>, ProblemError> {
    if has_no_body(headers) {
        return Ok(None);
    }

    let bytes = to_bytes(body, limit).await.map_err(|e| {
        if exceeded_limit(&e) {
            ProblemError::from_template(
                PAYLOAD_TOO_LARGE,
                format!("Request body exceeds {} bytes", limit),
            )
        } else {
            ProblemError::from_template(BAD_REQUEST, format!("Failed to read request body: {}", e))
        }
    })?;
    if bytes.is_empty() {
        return Ok(None);
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_json_media_type);

    if is_json {
        let value = serde_json::from_slice(&bytes).map_err(|e| {
            ProblemError::from_template(INVALID_REQUEST_BODY, format!("Invalid JSON: {}", e))
        })?;
        Ok(Some(value))
    } else {
        Ok(Some(serde_json::Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        )))
    }
}

fn exceeded_limit(error: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}
