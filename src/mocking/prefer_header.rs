//! `Prefer` header tokenizer (RFC 7240 style).
//!
//! Tokens are separated by `,` or `;`. A token is either a bare name (a flag)
//! or `name=value`. Names are case-insensitive and the first occurrence of a
//! name wins. Quoted values are unquoted; no further RFC grammar is enforced.

use std::collections::BTreeMap;

/// A raw preference value before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceValue {
    /// `name` with no `=value`.
    Flag,
    Text(String),
    /// A query parameter supplied more than once.
    List(Vec<String>),
}

impl PreferenceValue {
    /// Short description used in decode error messages.
    pub fn describe(&self) -> String {
        match self {
            PreferenceValue::Flag => "<flag>".to_string(),
            PreferenceValue::Text(text) => format!("{:?}", text),
            PreferenceValue::List(values) => format!("{:?}", values),
        }
    }
}

/// Preference name (lowercase) → raw value.
pub type PreferenceCandidate = BTreeMap<String, PreferenceValue>;

pub fn parse_prefer_header(header: &str) -> PreferenceCandidate {
    let mut preferences = PreferenceCandidate::new();

    for token in header.split([',', ';']) {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let (name, value) = match token.split_once('=') {
            Some((name, value)) => (name.trim(), PreferenceValue::Text(unquote(value.trim()).to_string())),
            None => (token, PreferenceValue::Flag),
        };
        if name.is_empty() {
            continue;
        }

        preferences.entry(name.to_ascii_lowercase()).or_insert(value);
    }

    preferences
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}
