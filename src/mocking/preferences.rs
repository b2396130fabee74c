//! Preference resolution and decoding.
//!
//! # Responsibilities
//! - Pick the preference source: a non-blank `Prefer` header, else `__*`
//!   query parameters
//! - Decode the candidate against the known shape
//! - Report every field failure at once as a 422 problem
//!
//! # Design Decisions
//! - Sources are mutually exclusive; query parameters are ignored entirely
//!   whenever a `Prefer` header is present
//! - Unknown preference names are ignored
//! - A type mismatch on a known name fails the whole decode

use std::collections::BTreeMap;

use serde::Serialize;

use crate::http::problem::{ProblemError, UNPROCESSABLE_ENTITY};
use crate::http::request::QueryValue;
use crate::mocking::prefer_header::{parse_prefer_header, PreferenceCandidate, PreferenceValue};

pub const PREFER_HEADER: &str = "prefer";
pub const CODE_QUERY_PARAM: &str = "__code";
pub const DYNAMIC_QUERY_PARAM: &str = "__dynamic";
pub const EXAMPLE_QUERY_PARAM: &str = "__example";

/// Decoded per-request preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<bool>,
}

/// Resolve preferences from the request headers or, failing that, its query.
///
/// Returns `Ok(None)` when neither source carries anything.
pub fn resolve(
    headers: &BTreeMap<String, String>,
    query: &BTreeMap<String, QueryValue>,
) -> Result<Option<Preferences>, ProblemError> {
    match candidate(headers, query) {
        Some(candidate) => decode(&candidate).map(Some),
        None => Ok(None),
    }
}

fn candidate(
    headers: &BTreeMap<String, String>,
    query: &BTreeMap<String, QueryValue>,
) -> Option<PreferenceCandidate> {
    // A blank header counts as absent.
    if let Some(prefer) = headers
        .get(PREFER_HEADER)
        .filter(|value| !value.trim().is_empty())
    {
        return Some(parse_prefer_header(prefer));
    }

    let mut candidate = PreferenceCandidate::new();
    for (param, name) in [
        (CODE_QUERY_PARAM, "code"),
        (DYNAMIC_QUERY_PARAM, "dynamic"),
        (EXAMPLE_QUERY_PARAM, "example"),
    ] {
        if let Some(value) = query.get(param) {
            let value = match value {
                QueryValue::Single(text) => PreferenceValue::Text(text.clone()),
                QueryValue::Multiple(values) => PreferenceValue::List(values.clone()),
            };
            candidate.insert(name.to_string(), value);
        }
    }

    if candidate.is_empty() {
        None
    } else {
        Some(candidate)
    }
}

fn decode(candidate: &PreferenceCandidate) -> Result<Preferences, ProblemError> {
    let mut errors = Vec::new();

    let code = decode_string(candidate, "code", &mut errors);
    let example_key = decode_string(candidate, "example", &mut errors);
    let dynamic = decode_string(candidate, "dynamic", &mut errors).and_then(|raw| {
        match parse_boolean(&raw) {
            Some(flag) => Some(flag),
            None => {
                errors.push(format!(
                    "Invalid value {:?} supplied to Preferences/dynamic: expected \"true\" or \"false\"",
                    raw
                ));
                None
            }
        }
    });

    if !errors.is_empty() {
        return Err(ProblemError::from_template(UNPROCESSABLE_ENTITY, errors.join("; ")));
    }

    Ok(Preferences {
        code,
        example_key,
        dynamic,
    })
}

fn decode_string(
    candidate: &PreferenceCandidate,
    name: &str,
    errors: &mut Vec<String>,
) -> Option<String> {
    match candidate.get(name)? {
        PreferenceValue::Text(text) => Some(text.clone()),
        other => {
            errors.push(format!(
                "Invalid value {} supplied to Preferences/{}: expected string",
                other.describe(),
                name
            ));
            None
        }
    }
}

fn parse_boolean(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
