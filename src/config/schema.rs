//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the adapter.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::mocking::MockConfig;

/// Root configuration for the mock adapter.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Listener configuration (host, port).
    pub listener: ListenerConfig,

    /// Answer CORS preflights and decorate responses with access-control headers.
    pub cors: bool,

    /// Settings handed to the engine on every request.
    pub engine: EngineConfig,

    /// Request limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            cors: true,
            engine: EngineConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "127.0.0.1").
    pub host: String,

    /// Port to bind; 0 picks a free port.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4010,
        }
    }
}

/// Engine configuration.
///
/// The per-request copy differs from the server copy only in `mock`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Mocking defaults, or `false` to disable mocking.
    pub mock: MockConfig,

    /// Enforce security schemes declared by operations.
    #[serde(alias = "check_security")]
    pub check_security: bool,

    /// Validate incoming requests.
    #[serde(alias = "validate_request")]
    pub validate_request: bool,

    /// Validate generated responses.
    #[serde(alias = "validate_response")]
    pub validate_response: bool,

    /// Strict errors: response validation errors fail the request.
    pub errors: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mock: MockConfig::default(),
            check_security: true,
            validate_request: true,
            validate_response: true,
            errors: false,
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` overrides it.
    pub log_level: String,

    /// Human-readable or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocking::MockOptions;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config: AdapterConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.port, 4010);
        assert!(config.cors);
        assert_eq!(config.engine.mock, MockConfig::default());
        assert!(!config.engine.errors);
    }

    #[test]
    fn test_full_file() {
        let config: AdapterConfig = toml::from_str(
            r#"
            cors = false

            [listener]
            host = "0.0.0.0"
            port = 8080

            [engine]
            errors = true
            validate_response = false

            [engine.mock]
            code = "200"
            dynamic = true

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert!(!config.cors);
        assert_eq!(config.listener.host, "0.0.0.0");
        assert!(config.engine.errors);
        assert!(!config.engine.validate_response);
        assert_eq!(
            config.engine.mock,
            MockConfig::Enabled(MockOptions {
                code: Some("200".into()),
                dynamic: Some(true),
                ..Default::default()
            })
        );
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_mock_disabled() {
        let config: AdapterConfig = toml::from_str("[engine]\nmock = false").unwrap();
        assert_eq!(config.engine.mock, MockConfig::Disabled);
    }
}
