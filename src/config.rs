//! Configuration types for imagegen-dl

use crate::error::{Error, Result};
use crate::types::AspectRatio;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remote endpoint configuration (credentials, models, base URL)
///
/// Groups settings for reaching the generative endpoints.
/// Used as a nested sub-config within [`Config`].
///
/// The API key is always an explicit configuration value supplied by the
/// embedding application; the library never reads ambient credentials.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API key appended to every request as the `key` query parameter
    pub api_key: String,

    /// Base URL of the generative API (default: Google Generative Language v1beta)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used for text operations (prompt translation/enhancement)
    #[serde(default = "default_text_model")]
    pub text_model: String,

    /// Model used for image production
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Per-request timeout (default: 60 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            text_model: default_text_model(),
            image_model: default_image_model(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Batch generation behavior configuration
///
/// Groups settings that shape how a requested image count is split into
/// sequential batch requests. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Number of images requested per batch (default: 4)
    ///
    /// The remote endpoint caps how many samples a single request may ask
    /// for; larger totals are fulfilled as a sequence of batches of at most
    /// this size.
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// Maximum total images accepted per generation run (default: 30)
    #[serde(default = "default_max_images")]
    pub max_images: u32,

    /// Aspect ratio applied when the caller does not choose one
    #[serde(default)]
    pub default_aspect_ratio: AspectRatio,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_images: default_max_images(),
            default_aspect_ratio: AspectRatio::default(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 5)
    ///
    /// The total number of attempts is `max_attempts + 1` (the initial call
    /// plus up to `max_attempts` retries). Zero means a single attempt.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Main configuration for [`ImageGenerator`](crate::ImageGenerator)
///
/// Fields are organized into logical sub-configs:
/// - [`api`](ApiConfig) — endpoint URLs, models, credentials
/// - [`generation`](GenerationConfig) — batch sizing and request limits
/// - [`retry`](RetryConfig) — exponential backoff for transient failures
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote endpoint settings (credentials, models, base URL)
    #[serde(default)]
    pub api: ApiConfig,

    /// Batch generation behavior
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Retry behavior for transient endpoint failures
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Validate the configuration, returning the first problem found.
    ///
    /// Checked invariants:
    /// - `api.api_key` must not be empty
    /// - `api.base_url` must parse as an absolute URL
    /// - `generation.batch_size` must be at least 1
    /// - `generation.max_images` must be at least 1
    pub fn validate(&self) -> Result<()> {
        if self.api.api_key.trim().is_empty() {
            return Err(Error::Config {
                message: "API key must not be empty".to_string(),
                key: Some("api.api_key".to_string()),
            });
        }
        if url::Url::parse(&self.api.base_url).is_err() {
            return Err(Error::Config {
                message: format!("base URL is not a valid URL: {}", self.api.base_url),
                key: Some("api.base_url".to_string()),
            });
        }
        if self.generation.batch_size == 0 {
            return Err(Error::Config {
                message: "batch size must be at least 1".to_string(),
                key: Some("generation.batch_size".to_string()),
            });
        }
        if self.generation.max_images == 0 {
            return Err(Error::Config {
                message: "max images must be at least 1".to_string(),
                key: Some("generation.max_images".to_string()),
            });
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_text_model() -> String {
    "gemini-2.5-flash-preview-05-20".to_string()
}

fn default_image_model() -> String {
    "imagen-3.0-generate-002".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_batch_size() -> u32 {
    4
}

fn default_max_images() -> u32 {
    30
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_true() -> bool {
    true
}

/// Serialize/deserialize Duration as seconds
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            api: ApiConfig {
                api_key: "test-key".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = Config::default();
        assert_eq!(config.generation.batch_size, 4);
        assert_eq!(config.generation.max_images, 30);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay, Duration::from_secs(1));
        assert_eq!(config.retry.backoff_multiplier, 2.0);
        assert!(config.retry.jitter);
        assert!(config.api.base_url.starts_with("https://"));
    }

    #[test]
    fn validate_accepts_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_api_key() {
        let config = Config::default();
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("api.api_key")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = valid_config();
        config.generation.batch_size = 0;
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => {
                assert_eq!(key.as_deref(), Some("generation.batch_size"))
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_zero_max_images() {
        let mut config = valid_config();
        config.generation.max_images = 0;
        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => {
                assert_eq!(key.as_deref(), Some("generation.max_images"))
            }
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_invalid_base_url() {
        let mut config = valid_config();
        config.api.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn duration_serde_round_trips_as_seconds() {
        let config = valid_config();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"initial_delay\":1"));
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.retry.initial_delay, Duration::from_secs(1));
        assert_eq!(parsed.api.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: Config = serde_json::from_str(r#"{"api":{"api_key":"k"}}"#).unwrap();
        assert_eq!(parsed.api.api_key, "k");
        assert_eq!(parsed.generation.batch_size, 4);
        assert_eq!(parsed.retry.max_attempts, 5);
        assert!(parsed.validate().is_ok());
    }
}
