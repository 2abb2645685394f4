use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::FeedScope;

/// Feed client configuration.
///
/// Apps usually build this from their own settings; the CLI parses it
/// from flags via [`FeedConfig::from_args`] or from a TOML table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// API base URL, e.g. `http://localhost:8080/api`.
    pub base_url: String,

    /// Per-request timeout in milliseconds. Surfaces as `FeedError::Timeout`.
    pub timeout_ms: u64,

    /// Which feed the fetcher pages through.
    pub scope: FeedScope,

    /// Maximum post body length in characters. `None` disables the check.
    pub max_body_chars: Option<usize>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout_ms: 10_000,
            scope: FeedScope::Global,
            max_body_chars: Some(280),
        }
    }
}

impl FeedConfig {
    /// Parse configuration from command-line style arguments.
    ///
    /// Supported flags:
    /// - `--server=URL`
    /// - `--timeout-ms=N`
    /// - `--user=ID` (scope the feed to one user's posts)
    /// - `--max-body=N` (`0` disables the limit)
    ///
    /// Unknown flags and unparsable numbers are ignored.
    pub fn from_args(args: &[String]) -> Self {
        let mut config = FeedConfig::default();

        for arg in args {
            if let Some(val) = arg.strip_prefix("--server=") {
                config.base_url = val.to_string();
            } else if let Some(val) = arg.strip_prefix("--timeout-ms=") {
                if let Ok(ms) = val.parse() {
                    config.timeout_ms = ms;
                }
            } else if let Some(val) = arg.strip_prefix("--user=") {
                config.scope = FeedScope::User(val.to_string());
            } else if let Some(val) = arg.strip_prefix("--max-body=") {
                if let Ok(n) = val.parse::<usize>() {
                    config.max_body_chars = (n > 0).then_some(n);
                }
            }
        }

        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args() {
        let args = vec![
            "--server=http://api.test".to_string(),
            "--timeout-ms=2500".to_string(),
            "--user=u7".to_string(),
            "--max-body=0".to_string(),
            "--unknown=1".to_string(),
        ];
        let config = FeedConfig::from_args(&args);
        assert_eq!(config.base_url, "http://api.test");
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert_eq!(config.scope, FeedScope::User("u7".into()));
        assert_eq!(config.max_body_chars, None);
    }

    #[test]
    fn test_bad_numbers_keep_defaults() {
        let config = FeedConfig::from_args(&["--timeout-ms=soon".to_string()]);
        assert_eq!(config.timeout_ms, 10_000);
        assert_eq!(config.max_body_chars, Some(280));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: FeedConfig =
            serde_json::from_str(r#"{"base_url": "http://x", "scope": {"user": "9"}}"#).unwrap();
        assert_eq!(config.base_url, "http://x");
        assert_eq!(config.scope, FeedScope::User("9".into()));
        assert_eq!(config.timeout_ms, 10_000);
    }
}
