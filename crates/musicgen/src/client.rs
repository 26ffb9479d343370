use std::time::Instant;

use resona_telemetry::metrics::GenerationMetrics;

use crate::{
    models::ModelSize,
    provider::{GenerationInput, MusicGenProvider},
    types::{GenerationResult, RemoteStatus},
};

/// Result of probing the remote API
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiStatus {
    Available(RemoteStatus),
    Unavailable { error: String },
}

/// Remote generation client
///
/// Expected failures never escape as errors: they come back as
/// [`GenerationResult::Failure`] or [`ApiStatus::Unavailable`].
pub struct GenerationClient {
    provider: Box<dyn MusicGenProvider>,
    metrics: GenerationMetrics,
}

impl GenerationClient {
    pub(crate) fn new(provider: Box<dyn MusicGenProvider>, metrics: GenerationMetrics) -> Self {
        Self { provider, metrics }
    }

    /// Generate one clip; a single attempt
    pub async fn generate_music(&self, prompt: &str, duration: u32, model: ModelSize) -> GenerationResult {
        let started = Instant::now();

        let result = match self
            .provider
            .generate(GenerationInput {
                prompt,
                duration,
                model,
            })
            .await
        {
            Ok(audio) => GenerationResult::Success {
                audio_url: audio.audio_url,
                generation_time: audio
                    .predict_time
                    .or_else(|| Some(started.elapsed().as_secs_f64())),
            },
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), error = %e, "music generation failed");
                GenerationResult::Failure {
                    error: e.client_message(),
                }
            }
        };

        self.metrics
            .record(started.elapsed(), model.into(), result.is_success());

        result
    }

    /// Probe the remote API without failing the caller
    pub async fn check_api_status(&self) -> ApiStatus {
        match self.provider.check_status().await {
            Ok(status) => ApiStatus::Available(status),
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), error = %e, "status probe failed");
                ApiStatus::Unavailable {
                    error: e.client_message(),
                }
            }
        }
    }
}
