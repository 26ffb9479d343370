use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Default Replicate API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.replicate.com/v1";

/// Default MusicGen model version hash on Replicate
pub const DEFAULT_MODEL_VERSION: &str = "671ac645ce5e552cc63a54a2bbff63fcf798043055d2dac5fc9e36a837eedcfb";

/// Remote music generation API configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MusicConfig {
    /// API token sent as a bearer credential
    pub api_token: SecretString,
    /// Base URL override
    #[serde(default = "default_base_url")]
    pub base_url: Url,
    /// Model version identifier passed with every prediction
    #[serde(default = "default_version")]
    pub version: String,
    /// Interval between prediction status polls
    #[serde(default = "default_poll_interval", deserialize_with = "deserialize_duration")]
    pub poll_interval: Duration,
    /// Upper bound on how long a single generation is followed
    #[serde(default = "default_max_wait", deserialize_with = "deserialize_duration")]
    pub max_wait: Duration,
    /// Audio container requested from the model
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl MusicConfig {
    /// Build a configuration with defaults for everything but the token
    pub fn with_token(api_token: impl Into<String>) -> Self {
        Self {
            api_token: SecretString::from(api_token.into()),
            base_url: default_base_url(),
            version: default_version(),
            poll_interval: default_poll_interval(),
            max_wait: default_max_wait(),
            output_format: OutputFormat::default(),
        }
    }
}

/// Audio container produced by the remote model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// MPEG layer III
    #[default]
    Mp3,
    /// Uncompressed WAV
    Wav,
}

impl OutputFormat {
    /// Wire name and file extension
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Wav => "wav",
        }
    }
}

fn default_base_url() -> Url {
    Url::parse(DEFAULT_BASE_URL).expect("default base URL must parse")
}

fn default_version() -> String {
    DEFAULT_MODEL_VERSION.to_string()
}

/// Parse human-readable durations such as `"2s"` or `"5m"`
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    duration_str::parse(&raw).map_err(|e| serde::de::Error::custom(format!("invalid duration '{raw}': {e}")))
}

const fn default_poll_interval() -> Duration {
    Duration::from_secs(2)
}

const fn default_max_wait() -> Duration {
    Duration::from_secs(300)
}
