//! Server defaults + request preferences → effective [`MockConfig`].

use crate::http::problem::ProblemError;
use crate::http::request::NormalizedRequest;
use crate::mocking::preferences::{resolve, Preferences};
use crate::mocking::{MockConfig, MockOptions};

/// Merge request preferences over the server mock configuration.
///
/// Disabled mocking stays disabled. Otherwise every preference that is set
/// replaces the server value and every unset one falls through.
pub fn merge(server: &MockConfig, preferences: Option<&Preferences>) -> MockConfig {
    let defaults = match server {
        MockConfig::Disabled => return MockConfig::Disabled,
        MockConfig::Enabled(options) => options,
    };
    let Some(preferences) = preferences else {
        return server.clone();
    };

    MockConfig::Enabled(MockOptions {
        code: preferences.code.clone().or_else(|| defaults.code.clone()),
        media_types: defaults.media_types.clone(),
        example_key: preferences
            .example_key
            .clone()
            .or_else(|| defaults.example_key.clone()),
        dynamic: preferences.dynamic.or(defaults.dynamic),
    })
}

/// Resolve the preferences of `input` and merge them over `server`.
///
/// Preferences are not even decoded when mocking is disabled, so malformed
/// ones cannot fail such a request.
pub fn resolve_mock_config(
    server: &MockConfig,
    input: &NormalizedRequest,
) -> Result<MockConfig, ProblemError> {
    if !server.is_enabled() {
        return Ok(MockConfig::Disabled);
    }
    let preferences = resolve(&input.headers, &input.url.query)?;
    Ok(merge(server, preferences.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::QueryValue;

    fn server_defaults() -> MockConfig {
        MockConfig::Enabled(MockOptions {
            code: Some("200".into()),
            media_types: Some(vec!["application/xml".into()]),
            example_key: Some("default".into()),
            dynamic: Some(false),
        })
    }

    #[test]
    fn test_disabled_ignores_preferences() {
        let prefs = Preferences {
            code: Some("500".into()),
            ..Default::default()
        };
        assert_eq!(merge(&MockConfig::Disabled, Some(&prefs)), MockConfig::Disabled);
    }

    #[test]
    fn test_preferences_override_key_by_key() {
        let prefs = Preferences {
            code: Some("404".into()),
            ..Default::default()
        };
        let merged = merge(&server_defaults(), Some(&prefs));
        let options = merged.options().unwrap();
        assert_eq!(options.code.as_deref(), Some("404"));
        assert_eq!(options.example_key.as_deref(), Some("default"));
        assert_eq!(options.dynamic, Some(false));
        assert_eq!(options.media_types, Some(vec!["application/xml".to_string()]));
    }

    #[test]
    fn test_fully_specified_preferences_win_over_any_defaults() {
        let prefs = Preferences {
            code: Some("201".into()),
            example_key: Some("cat".into()),
            dynamic: Some(true),
        };
        for server in [MockConfig::default(), server_defaults()] {
            let merged = merge(&server, Some(&prefs));
            let options = merged.options().unwrap();
            assert_eq!(options.code, prefs.code);
            assert_eq!(options.example_key, prefs.example_key);
            assert_eq!(options.dynamic, prefs.dynamic);

            // Merging again changes nothing.
            assert_eq!(merge(&merged, Some(&prefs)), merged);
        }
    }

    #[test]
    fn test_no_preferences_keeps_server_config() {
        assert_eq!(merge(&server_defaults(), None), server_defaults());
    }

    #[test]
    fn test_query_code_against_plain_mock() {
        let mut input = NormalizedRequest::default();
        input.url.path = "/widgets".into();
        input
            .url
            .query
            .insert("__code".into(), QueryValue::Single("201".into()));

        let merged = resolve_mock_config(&MockConfig::default(), &input).unwrap();
        assert_eq!(
            serde_json::to_value(&merged).unwrap(),
            serde_json::json!({"code": "201"})
        );
    }

    #[test]
    fn test_malformed_preferences_ignored_when_disabled() {
        let mut input = NormalizedRequest::default();
        input.headers.insert("prefer".into(), "dynamic=maybe".into());
        assert_eq!(
            resolve_mock_config(&MockConfig::Disabled, &input).unwrap(),
            MockConfig::Disabled
        );
        assert!(resolve_mock_config(&MockConfig::default(), &input).is_err());
    }
}
