//! Per-request mocking preferences.
//!
//! # Data Flow
//! ```text
//! Prefer header ──┐
//!                 ├─→ preferences.rs (decode, accumulate field errors)
//! __code/__dynamic/__example query (fallback only)
//!                 └─→ Preferences
//!                       → merge.rs (server MockConfig + Preferences)
//!                       → MockConfig handed to the engine
//! ```

pub mod merge;
pub mod prefer_header;
pub mod preferences;

use serde::{Deserialize, Serialize};

pub use merge::{merge, resolve_mock_config};
pub use preferences::{resolve, Preferences};

/// Effective mocking behaviour.
///
/// Written as `mock = false`, `mock = true` or a `[engine.mock]` table in
/// configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "MockSetting", into = "MockSetting")]
pub enum MockConfig {
    Disabled,
    Enabled(MockOptions),
}

impl MockConfig {
    pub fn is_enabled(&self) -> bool {
        matches!(self, MockConfig::Enabled(_))
    }

    pub fn options(&self) -> Option<&MockOptions> {
        match self {
            MockConfig::Enabled(options) => Some(options),
            MockConfig::Disabled => None,
        }
    }
}

impl Default for MockConfig {
    fn default() -> Self {
        MockConfig::Enabled(MockOptions::default())
    }
}

/// Mocking knobs shared by server defaults and request preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MockOptions {
    /// Status code to respond with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Acceptable response media types, in order of preference.
    #[serde(alias = "media_types", skip_serializing_if = "Option::is_none")]
    pub media_types: Option<Vec<String>>,

    /// Named example to serve.
    #[serde(alias = "example_key", skip_serializing_if = "Option::is_none")]
    pub example_key: Option<String>,

    /// Generate payloads dynamically instead of serving static examples.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic: Option<bool>,
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum MockSetting {
    Flag(bool),
    Options(MockOptions),
}

impl From<MockSetting> for MockConfig {
    fn from(setting: MockSetting) -> Self {
        match setting {
            MockSetting::Flag(false) => MockConfig::Disabled,
            MockSetting::Flag(true) => MockConfig::Enabled(MockOptions::default()),
            MockSetting::Options(options) => MockConfig::Enabled(options),
        }
    }
}

impl From<MockConfig> for MockSetting {
    fn from(config: MockConfig) -> Self {
        match config {
            MockConfig::Disabled => MockSetting::Flag(false),
            MockConfig::Enabled(options) => MockSetting::Options(options),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Wrapper {
        mock: MockConfig,
    }

    #[test]
    fn test_mock_flags_and_tables() {
        let off: Wrapper = toml::from_str("mock = false").unwrap();
        assert_eq!(off.mock, MockConfig::Disabled);

        let on: Wrapper = toml::from_str("mock = true").unwrap();
        assert_eq!(on.mock, MockConfig::Enabled(MockOptions::default()));

        let table: Wrapper =
            toml::from_str("[mock]\ncode = \"201\"\nmedia_types = [\"application/json\"]").unwrap();
        let options = table.mock.options().unwrap();
        assert_eq!(options.code.as_deref(), Some("201"));
        assert_eq!(options.media_types, Some(vec!["application/json".to_string()]));
    }

    #[test]
    fn test_serializes_disabled_as_false() {
        assert_eq!(serde_json::to_value(MockConfig::Disabled).unwrap(), json!(false));
        let enabled = MockConfig::Enabled(MockOptions {
            example_key: Some("cat".into()),
            ..Default::default()
        });
        assert_eq!(serde_json::to_value(enabled).unwrap(), json!({"exampleKey": "cat"}));
    }
}
