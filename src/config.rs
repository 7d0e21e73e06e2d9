use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

pub const DEFAULT_FORUM_NAME: &str = "Uniswap Proposal Discussion";
pub const DEFAULT_CATEGORY_URL: &str = "https://gov.uniswap.org/c/proposal-discussion/5.json";
pub const DEFAULT_BASE_URL: &str = "https://gov.uniswap.org";
pub const DEFAULT_STATE_FILE: &str = "uniswap_last_seen.json";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Job configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Forum
    pub forum_name: String,
    pub category_url: String,
    pub base_url: String,

    // Watermark
    pub state_path: PathBuf,

    // Telegram
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_url: String,

    // Run behaviour
    pub force_latest: bool,
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Telegram credentials are optional here; they are only required once a
    /// message is actually sent.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Forum
            forum_name: env_or_default("FORUM_NAME", DEFAULT_FORUM_NAME),
            category_url: env_or_default("FORUM_CATEGORY_URL", DEFAULT_CATEGORY_URL),
            base_url: env_or_default("FORUM_BASE_URL", DEFAULT_BASE_URL),

            // Watermark
            state_path: PathBuf::from(env_or_default("STATE_FILE", DEFAULT_STATE_FILE)),

            // Telegram
            telegram_bot_token: optional_env("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: optional_env("TELEGRAM_CHAT_ID"),
            telegram_api_url: env_or_default("TELEGRAM_API_URL", DEFAULT_TELEGRAM_API_URL),

            // Run behaviour
            force_latest: parse_env_bool("FORCE_LATEST", false)?,
            http_timeout: Duration::from_secs(parse_env_u64("HTTP_TIMEOUT_SECS", 15)?),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.forum_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "FORUM_NAME".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        // The name sits inside a bold entity, where legacy Markdown has no escapes.
        if let Some(c) = self
            .forum_name
            .chars()
            .find(|c| matches!(c, '_' | '*' | '`' | '['))
        {
            return Err(ConfigError::InvalidValue {
                name: "FORUM_NAME".to_string(),
                message: format!("cannot contain Markdown marker '{c}'"),
            });
        }
        validate_url("FORUM_CATEGORY_URL", &self.category_url)?;
        validate_url("FORUM_BASE_URL", &self.base_url)?;
        validate_url("TELEGRAM_API_URL", &self.telegram_api_url)?;
        if self.state_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "STATE_FILE".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if self.http_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "HTTP_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Configuration with default endpoints and no credentials, for tests.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            forum_name: "Test Forum".to_string(),
            category_url: "http://127.0.0.1:1/c/test/1.json".to_string(),
            base_url: "https://forum.example.com".to_string(),
            state_path: PathBuf::from("last_seen.json"),
            telegram_bot_token: None,
            telegram_chat_id: None,
            telegram_api_url: "http://127.0.0.1:1".to_string(),
            force_latest: false,
            http_timeout: Duration::from_secs(5),
        }
    }
}

fn validate_url(name: &str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| ConfigError::InvalidValue {
        name: name.to_string(),
        message: format!("not a valid URL: {e}"),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("unsupported scheme '{}'", parsed.scheme()),
        });
    }
    Ok(())
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => parse_bool(name, &val),
        _ => Ok(default),
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::ParseBool {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("FORCE_LATEST", "true").unwrap());
        assert!(parse_bool("FORCE_LATEST", "YES").unwrap());
        assert!(parse_bool("FORCE_LATEST", " 1 ").unwrap());
        assert!(!parse_bool("FORCE_LATEST", "off").unwrap());
        assert!(!parse_bool("FORCE_LATEST", "0").unwrap());
        assert!(parse_bool("FORCE_LATEST", "maybe").is_err());
    }

    #[test]
    fn test_parse_env_defaults() {
        assert!(parse_env_bool("NONEXISTENT_FORUM_ALERT_VAR", true).unwrap());
        assert!(!parse_env_bool("NONEXISTENT_FORUM_ALERT_VAR", false).unwrap());
        assert_eq!(parse_env_u64("NONEXISTENT_FORUM_ALERT_VAR", 15).unwrap(), 15);
    }

    #[test]
    fn test_validate_accepts_testing_config() {
        assert!(Config::for_testing().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let config = Config {
            base_url: "not a url".to_string(),
            ..Config::for_testing()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { name, .. }) if name == "FORUM_BASE_URL"
        ));

        let config = Config {
            category_url: "ftp://forum.example.com/c/1.json".to_string(),
            ..Config::for_testing()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let config = Config {
            http_timeout: Duration::ZERO,
            ..Config::for_testing()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_markdown_in_forum_name() {
        for name in ["Arbitrum_DAO", "*Uniswap*", "Gov `v2`", "[RFC] Forum"] {
            let config = Config {
                forum_name: name.to_string(),
                ..Config::for_testing()
            };
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::InvalidValue { ref name, .. }) if name == "FORUM_NAME"
                ),
                "expected {name:?} to be rejected"
            );
        }

        let config = Config {
            forum_name: "Arbitrum DAO (Proposals)".to_string(),
            ..Config::for_testing()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_forum_name() {
        let config = Config {
            forum_name: "   ".to_string(),
            ..Config::for_testing()
        };
        assert!(config.validate().is_err());
    }
}
