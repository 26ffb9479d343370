//! Programmatic configuration builder for integration tests

use std::{net::SocketAddr, path::Path, time::Duration};

use resona_config::{Config, CorsConfig, HealthConfig, MusicConfig, ServerConfig, StorageConfig};

/// Token the mock Replicate server accepts
pub const TEST_TOKEN: &str = "r8_test_token";

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder pointed at a mock remote and a storage directory
    pub fn new(base_url: &str, storage: &Path) -> Self {
        let mut music = MusicConfig::with_token(TEST_TOKEN);
        music.base_url = base_url.parse().expect("valid URL");
        music.poll_interval = Duration::from_millis(20);
        music.max_wait = Duration::from_secs(5);

        Self {
            config: Config {
                server: ServerConfig {
                    listen_address: Some(SocketAddr::from(([127, 0, 0, 1], 0))),
                    health: HealthConfig {
                        enabled: true,
                        ..HealthConfig::default()
                    },
                    ..ServerConfig::default()
                },
                music,
                storage: StorageConfig {
                    directory: storage.to_path_buf(),
                },
                telemetry: None,
            },
        }
    }

    /// Use a different API token
    pub fn with_token(mut self, token: &str) -> Self {
        self.config.music.api_token = token.to_owned().into();
        self
    }

    /// Bound how long a generation is polled
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.config.music.max_wait = max_wait;
        self
    }

    /// Set CORS configuration
    pub fn with_cors(mut self, config: CorsConfig) -> Self {
        self.config.server.cors = Some(config);
        self
    }

    /// Move the health endpoint
    pub fn with_health_path(mut self, path: &str) -> Self {
        path.clone_into(&mut self.config.server.health.path);
        self
    }

    /// Disable health endpoint
    pub fn without_health(mut self) -> Self {
        self.config.server.health.enabled = false;
        self
    }

    /// Build the final config
    pub fn build(self) -> Config {
        self.config
    }
}
