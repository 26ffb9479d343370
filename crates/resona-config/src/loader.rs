use std::path::Path;

use secrecy::ExposeSecret;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded = crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if the API token is empty, the polling settings are
    /// inconsistent, or the health path is malformed
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_music_config()?;
        self.validate_storage_config()?;
        self.validate_health_config()?;
        Ok(())
    }

    fn validate_music_config(&self) -> anyhow::Result<()> {
        let music = &self.music;

        if music.api_token.expose_secret().trim().is_empty() {
            anyhow::bail!("music.api_token must not be empty");
        }

        if music.poll_interval.is_zero() {
            anyhow::bail!("music.poll_interval must be greater than 0");
        }

        if music.max_wait < music.poll_interval {
            anyhow::bail!("music.max_wait must be at least music.poll_interval");
        }

        if music.version.trim().is_empty() {
            anyhow::bail!("music.version must not be empty");
        }

        Ok(())
    }

    fn validate_storage_config(&self) -> anyhow::Result<()> {
        if self.storage.directory.as_os_str().is_empty() {
            anyhow::bail!("storage.directory must not be empty");
        }

        Ok(())
    }

    fn validate_health_config(&self) -> anyhow::Result<()> {
        if self.server.health.enabled && !self.server.health.path.starts_with('/') {
            anyhow::bail!("server.health.path must start with '/'");
        }

        Ok(())
    }
}
