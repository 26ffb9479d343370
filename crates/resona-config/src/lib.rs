#![allow(clippy::must_use_candidate)]

pub mod cors;
mod env;
pub mod health;
mod loader;
pub mod music;
pub mod server;
pub mod storage;
pub mod telemetry;

use serde::Deserialize;

pub use cors::*;
pub use env::ExpandError;
pub use health::*;
pub use music::*;
pub use server::*;
pub use storage::*;
pub use telemetry::TelemetryConfig;

/// Top-level Resona configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Remote music generation API configuration
    pub music: MusicConfig,
    /// Local audio storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Telemetry configuration
    #[serde(default)]
    pub telemetry: Option<TelemetryConfig>,
}
