use std::sync::Arc;

use resona_config::Config;
use resona_telemetry::metrics::{self, DownloadMetrics, GenerationMetrics};

use crate::{
    client::GenerationClient,
    error::{MusicGenError, Result},
    http_client::build_http_client,
    provider::{MusicGenProvider, replicate::ReplicateProvider},
    store::AudioStore,
};

/// Name reported for the Replicate backend in logs and status payloads
const PROVIDER_NAME: &str = "replicate";

/// Music generation service shared by every route
pub struct MusicService {
    client: GenerationClient,
    store: Arc<AudioStore>,
}

impl MusicService {
    pub(crate) fn new(provider: Box<dyn MusicGenProvider>, store: AudioStore) -> Self {
        let meter = metrics::meter();

        Self {
            client: GenerationClient::new(provider, GenerationMetrics::new(&meter)),
            store: Arc::new(store),
        }
    }

    pub fn client(&self) -> &GenerationClient {
        &self.client
    }

    pub fn store(&self) -> &Arc<AudioStore> {
        &self.store
    }

    /// Wait for detached downloads before the process exits
    pub async fn shutdown(&self) {
        self.store.shutdown().await;
    }
}

/// Builder for constructing the music service from configuration
pub struct MusicServiceBuilder<'a> {
    config: &'a Config,
}

impl<'a> MusicServiceBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub fn build(self) -> Result<MusicService> {
        let http = build_http_client()
            .map_err(|e| MusicGenError::ConfigError(format!("Failed to build HTTP client: {e}")))?;

        let music = &self.config.music;
        tracing::debug!(
            provider = PROVIDER_NAME,
            base_url = %music.base_url,
            poll_interval = ?music.poll_interval,
            max_wait = ?music.max_wait,
            "initializing music generation provider"
        );

        let provider = ReplicateProvider::new(PROVIDER_NAME.to_string(), http.clone(), music);

        let store = AudioStore::open(
            &self.config.storage.directory,
            http,
            music.output_format,
            DownloadMetrics::new(&metrics::meter()),
        )?;

        Ok(MusicService::new(Box::new(provider), store))
    }
}
