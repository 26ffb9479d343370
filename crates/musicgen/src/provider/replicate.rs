use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use resona_config::{MusicConfig, OutputFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::time::Instant;
use url::{Origin, Url};

use super::{GeneratedAudio, GenerationInput, MusicGenProvider};
use crate::{
    error::{MusicGenError, Result},
    types::RemoteStatus,
};

/// Loudness normalization applied by the model
const NORMALIZATION_STRATEGY: &str = "peak";

/// Replicate-hosted MusicGen provider
///
/// Creates one prediction per call and follows it until it reaches a
/// terminal state.
pub(crate) struct ReplicateProvider {
    name: String,
    client: Client,
    api_token: SecretString,
    base_url: String,
    /// Only poll URLs with this origin receive the token
    base_origin: Origin,
    version: String,
    poll_interval: Duration,
    max_wait: Duration,
    output_format: OutputFormat,
}

impl ReplicateProvider {
    pub fn new(name: String, client: Client, config: &MusicConfig) -> Self {
        Self {
            name,
            client,
            api_token: config.api_token.clone(),
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
            base_origin: config.base_url.origin(),
            version: config.version.clone(),
            poll_interval: config.poll_interval,
            max_wait: config.max_wait,
            output_format: config.output_format,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// Decode a successful response or map the remote error
    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = error_detail(&body);

            tracing::error!(
                provider = %self.name,
                status = %status,
                error = %message,
                "Replicate API error"
            );

            return Err(match status.as_u16() {
                401 | 403 => MusicGenError::AuthenticationFailed(message),
                _ => MusicGenError::ProviderApiError {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        response.json().await.map_err(|e| {
            tracing::error!(provider = %self.name, error = %e, "failed to parse Replicate response");
            MusicGenError::InternalError(Some(format!("Invalid response from music generation API: {e}")))
        })
    }

    fn connection_error(&self, e: &reqwest::Error) -> MusicGenError {
        tracing::error!(provider = %self.name, error = %e, "Replicate request failed");
        MusicGenError::ConnectionError(format!("Failed to reach music generation API: {e}"))
    }

    async fn create_prediction(&self, input: GenerationInput<'_>) -> Result<Prediction> {
        let body = PredictionRequest {
            version: &self.version,
            input: PredictionInput {
                prompt: input.prompt,
                duration: input.duration,
                model_version: input.model.descriptor().upstream_version,
                output_format: self.output_format.as_str(),
                normalization_strategy: NORMALIZATION_STRATEGY,
            },
        };

        let response = self
            .client
            .post(self.endpoint("predictions"))
            .bearer_auth(self.api_token.expose_secret())
            .header("Prefer", "wait")
            .json(&body)
            .send()
            .await
            .map_err(|e| self.connection_error(&e))?;

        self.decode(response).await
    }

    /// Where to poll a prediction
    ///
    /// `urls.get` is followed only when it shares the configured API origin;
    /// anything else falls back to `{base_url}/predictions/{id}`.
    fn poll_url(&self, prediction: &Prediction) -> String {
        let advertised = prediction.urls.as_ref().and_then(|urls| urls.get.as_deref());

        match advertised.map(Url::parse) {
            Some(Ok(url)) if url.origin() == self.base_origin => url.into(),
            Some(_) => {
                tracing::warn!(
                    provider = %self.name,
                    id = %prediction.id,
                    "ignoring prediction URL outside the configured API origin"
                );
                self.endpoint(&format!("predictions/{}", prediction.id))
            }
            None => self.endpoint(&format!("predictions/{}", prediction.id)),
        }
    }

    async fn fetch_prediction(&self, prediction: &Prediction) -> Result<Prediction> {
        let url = self.poll_url(prediction);

        let response = self
            .client
            .get(url)
            .bearer_auth(self.api_token.expose_secret())
            .send()
            .await
            .map_err(|e| self.connection_error(&e))?;

        self.decode(response).await
    }
}

#[derive(Serialize)]
struct PredictionRequest<'a> {
    version: &'a str,
    input: PredictionInput<'a>,
}

#[derive(Serialize)]
struct PredictionInput<'a> {
    prompt: &'a str,
    duration: u32,
    model_version: &'a str,
    output_format: &'a str,
    normalization_strategy: &'a str,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    id: String,
    status: PredictionStatus,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
    #[serde(default)]
    metrics: Option<PredictionMetrics>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl PredictionStatus {
    const fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

#[derive(Debug, Deserialize)]
struct PredictionMetrics {
    #[serde(default)]
    predict_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    #[serde(default)]
    get: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Account {
    #[serde(default)]
    username: Option<String>,
    #[serde(default, rename = "type")]
    account_type: Option<String>,
}

/// First audio URL in a prediction output (a string or a list of strings)
fn output_url(output: &Value) -> Option<String> {
    match output {
        Value::String(url) if !url.is_empty() => Some(url.clone()),
        Value::Array(items) => items.iter().find_map(output_url),
        _ => None,
    }
}

/// Human-readable message from a Replicate error body
fn error_detail(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|json| {
            json.get("detail")
                .or_else(|| json.get("error"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

fn prediction_error(prediction: &Prediction) -> String {
    match &prediction.error {
        Some(Value::String(message)) if !message.is_empty() => message.clone(),
        Some(Value::Null) | None => format!("Prediction {} failed", prediction.id),
        Some(other) => other.to_string(),
    }
}

#[async_trait]
impl MusicGenProvider for ReplicateProvider {
    async fn generate(&self, input: GenerationInput<'_>) -> Result<GeneratedAudio> {
        tracing::debug!(
            provider = %self.name,
            model = %input.model,
            duration = input.duration,
            "creating prediction"
        );

        let deadline = Instant::now() + self.max_wait;
        let mut prediction = self.create_prediction(input).await?;

        while !prediction.status.is_terminal() {
            if Instant::now() + self.poll_interval > deadline {
                return Err(MusicGenError::GenerationFailed(format!(
                    "Prediction {} did not finish within {} seconds",
                    prediction.id,
                    self.max_wait.as_secs()
                )));
            }

            tokio::time::sleep(self.poll_interval).await;
            prediction = self.fetch_prediction(&prediction).await?;

            tracing::trace!(provider = %self.name, id = %prediction.id, status = ?prediction.status, "polled prediction");
        }

        match prediction.status {
            PredictionStatus::Succeeded => {
                let audio_url = prediction.output.as_ref().and_then(output_url).ok_or_else(|| {
                    MusicGenError::GenerationFailed(format!("Prediction {} returned no audio output", prediction.id))
                })?;

                tracing::debug!(provider = %self.name, id = %prediction.id, "prediction succeeded");

                Ok(GeneratedAudio {
                    audio_url,
                    predict_time: prediction.metrics.and_then(|m| m.predict_time),
                })
            }
            PredictionStatus::Canceled => Err(MusicGenError::GenerationFailed(format!(
                "Prediction {} was canceled",
                prediction.id
            ))),
            _ => Err(MusicGenError::GenerationFailed(prediction_error(&prediction))),
        }
    }

    async fn check_status(&self) -> Result<RemoteStatus> {
        let response = self
            .client
            .get(self.endpoint("account"))
            .bearer_auth(self.api_token.expose_secret())
            .send()
            .await
            .map_err(|e| self.connection_error(&e))?;

        let account: Account = self.decode(response).await?;

        Ok(RemoteStatus {
            provider: self.name.clone(),
            status: "available",
            account: account.username,
            account_type: account.account_type,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn provider(base_url: &str) -> ReplicateProvider {
        let mut config = MusicConfig::with_token("r8_test");
        config.base_url = base_url.parse().unwrap();
        ReplicateProvider::new("replicate".to_string(), Client::new(), &config)
    }

    fn pending(get: Option<&str>) -> Prediction {
        serde_json::from_value(json!({"id": "abc123", "status": "processing", "urls": {"get": get}})).unwrap()
    }

    #[test]
    fn poll_url_follows_same_origin_link() {
        let provider = provider("https://api.replicate.com/v1");
        let prediction = pending(Some("https://api.replicate.com/v1/predictions/abc123"));

        assert_eq!(provider.poll_url(&prediction), "https://api.replicate.com/v1/predictions/abc123");
    }

    #[test]
    fn poll_url_never_follows_foreign_origin() {
        let provider = provider("https://api.replicate.com/v1");

        for foreign in [
            "https://attacker.example/v1/predictions/abc123",
            "http://api.replicate.com/v1/predictions/abc123",
            "https://api.replicate.com:8443/v1/predictions/abc123",
            "not a url",
        ] {
            assert_eq!(
                provider.poll_url(&pending(Some(foreign))),
                "https://api.replicate.com/v1/predictions/abc123",
                "{foreign}"
            );
        }
    }

    #[test]
    fn poll_url_without_link_uses_base() {
        let provider = provider("http://127.0.0.1:9000/v1/");

        assert_eq!(provider.poll_url(&pending(None)), "http://127.0.0.1:9000/v1/predictions/abc123");
    }

    #[test]
    fn output_may_be_string_or_list() {
        assert_eq!(
            output_url(&json!("https://cdn.example/a.mp3")),
            Some("https://cdn.example/a.mp3".to_string())
        );
        assert_eq!(
            output_url(&json!(["https://cdn.example/b.mp3"])),
            Some("https://cdn.example/b.mp3".to_string())
        );
        assert_eq!(output_url(&json!(null)), None);
        assert_eq!(output_url(&json!([])), None);
    }

    #[test]
    fn error_detail_prefers_json_detail() {
        assert_eq!(error_detail(r#"{"detail": "Invalid token."}"#), "Invalid token.");
        assert_eq!(error_detail("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn unknown_status_is_not_terminal() {
        let prediction: Prediction = serde_json::from_value(json!({"id": "p1", "status": "queued"})).unwrap();
        assert_eq!(prediction.status, PredictionStatus::Unknown);
        assert!(!prediction.status.is_terminal());
    }

    #[test]
    fn failed_prediction_surfaces_remote_error() {
        let prediction: Prediction =
            serde_json::from_value(json!({"id": "p2", "status": "failed", "error": "CUDA out of memory"})).unwrap();
        assert_eq!(prediction_error(&prediction), "CUDA out of memory");

        let prediction: Prediction = serde_json::from_value(json!({"id": "p3", "status": "failed"})).unwrap();
        assert_eq!(prediction_error(&prediction), "Prediction p3 failed");
    }
}
