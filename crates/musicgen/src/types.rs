use serde::{Deserialize, Serialize};

use crate::{
    error::{MusicGenError, Result},
    models::{ModelDescriptor, ModelSize},
    prompt::{PromptExample, PromptFields, PromptSource},
    store::SavedAudioFile,
};

/// Shortest clip the remote model accepts, in seconds
pub const MIN_DURATION: u32 = 1;
/// Longest clip the remote model accepts, in seconds
pub const MAX_DURATION: u32 = 30;

/// Music generation request body
///
/// Either `prompt` or at least one structured field must be present.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    /// Direct text prompt
    #[serde(default)]
    pub prompt: Option<String>,
    /// Structured alternative to `prompt`
    #[serde(flatten)]
    pub fields: PromptFields,
    /// Clip length in seconds
    #[serde(default = "default_duration")]
    pub duration: u32,
    /// Model size tier
    #[serde(default)]
    pub model: ModelSize,
    /// Download the result into the audio store after responding
    #[serde(default = "default_save_locally")]
    pub save_locally: bool,
    /// Filename to store the audio under
    #[serde(default)]
    pub custom_filename: Option<String>,
}

fn default_duration() -> u32 {
    15
}

fn default_save_locally() -> bool {
    true
}

/// Generation settings that accompany a resolved prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationParams {
    pub duration: u32,
    pub model: ModelSize,
    pub save_locally: bool,
    pub custom_filename: Option<String>,
}

impl GenerationRequest {
    /// Split the body into its prompt source and validated parameters
    pub fn into_parts(self) -> Result<(PromptSource, GenerationParams)> {
        if !(MIN_DURATION..=MAX_DURATION).contains(&self.duration) {
            return Err(MusicGenError::InvalidRequest(format!(
                "duration must be between {MIN_DURATION} and {MAX_DURATION} seconds, got {}",
                self.duration
            )));
        }

        let params = GenerationParams {
            duration: self.duration,
            model: self.model,
            save_locally: self.save_locally,
            custom_filename: self.custom_filename.filter(|name| !name.trim().is_empty()),
        };

        Ok((PromptSource::resolve(self.prompt, self.fields), params))
    }
}

/// Outcome of one remote generation call
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationResult {
    Success {
        audio_url: String,
        /// Seconds spent generating
        generation_time: Option<f64>,
    },
    Failure {
        error: String,
    },
}

impl GenerationResult {
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Response body for a successful generation
#[derive(Debug, Serialize)]
pub struct MusicGenerationResponse {
    pub success: bool,
    pub audio_url: String,
    pub prompt: String,
    pub duration: u32,
    pub model: ModelSize,
    pub generation_time: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ExamplesResponse {
    pub examples: &'static [PromptExample],
}

#[derive(Debug, Serialize)]
pub struct ModelsResponse {
    pub models: indexmap::IndexMap<&'static str, &'static ModelDescriptor>,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub count: usize,
    pub files: Vec<SavedAudioFile>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Service status; `remote` and `error` are mutually exclusive
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Availability reported by the remote API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteStatus {
    pub provider: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_type: Option<String>,
}
