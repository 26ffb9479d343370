pub(crate) mod replicate;

use async_trait::async_trait;

use crate::{error::Result, models::ModelSize, types::RemoteStatus};

/// Parameters for one remote generation
#[derive(Debug, Clone, Copy)]
pub(crate) struct GenerationInput<'a> {
    pub prompt: &'a str,
    pub duration: u32,
    pub model: ModelSize,
}

/// Audio produced by the remote model
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GeneratedAudio {
    /// Where the audio can be fetched from
    pub audio_url: String,
    /// Model time reported by the remote, in seconds
    pub predict_time: Option<f64>,
}

/// Trait for remote music generation backends
#[async_trait]
pub(crate) trait MusicGenProvider: Send + Sync {
    /// Run a single generation and wait for its output
    async fn generate(&self, input: GenerationInput<'_>) -> Result<GeneratedAudio>;

    /// Lightweight availability probe
    async fn check_status(&self) -> Result<RemoteStatus>;

    /// Get the provider name
    fn name(&self) -> &str;
}
