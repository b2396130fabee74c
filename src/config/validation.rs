//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (body limit > 0, status codes in range)
//! - Check addresses parse before anything binds
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AdapterConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::config::schema::AdapterConfig;
use crate::mocking::MockConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check every semantic constraint and report all violations.
pub fn validate_config(config: &AdapterConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.host.parse::<IpAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.host",
            format!("'{}' is not an IP address", config.listener.host),
        ));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::new(
            "limits.max_body_bytes",
            "must be greater than zero",
        ));
    }

    if let MockConfig::Enabled(options) = &config.engine.mock {
        if let Some(code) = &options.code {
            let in_range = code
                .parse::<u16>()
                .map(|c| (100..=599).contains(&c))
                .unwrap_or(false);
            if !in_range {
                errors.push(ValidationError::new(
                    "engine.mock.code",
                    format!("'{}' is not an HTTP status code", code),
                ));
            }
        }
        if let Some(media_types) = &options.media_types {
            if media_types.iter().any(|m| !m.contains('/')) {
                errors.push(ValidationError::new(
                    "engine.mock.media_types",
                    "every entry must be a type/subtype media type",
                ));
            }
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocking::MockOptions;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AdapterConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_error() {
        let mut config = AdapterConfig::default();
        config.listener.host = "localhost:80".into();
        config.limits.max_body_bytes = 0;
        config.engine.mock = MockConfig::Enabled(MockOptions {
            code: Some("2000".into()),
            media_types: Some(vec!["json".into()]),
            ..Default::default()
        });
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nowhere".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.host",
                "limits.max_body_bytes",
                "engine.mock.code",
                "engine.mock.media_types",
                "observability.metrics_address",
            ]
        );
    }

    #[test]
    fn test_disabled_mock_skips_mock_checks() {
        let mut config = AdapterConfig::default();
        config.engine.mock = MockConfig::Disabled;
        assert!(validate_config(&config).is_ok());
    }
}
