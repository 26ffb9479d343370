#![allow(
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions
)]

mod client;
mod error;
mod handler;
mod http_client;
mod models;
mod prompt;
mod provider;
mod request;
mod server;
mod store;
mod types;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

pub use client::{ApiStatus, GenerationClient};
pub use error::{MusicGenError, Result};
pub use models::{ModelDescriptor, ModelSize, catalog};
pub use prompt::{PromptExample, PromptFields, PromptSource, build_prompt, example_prompts};
pub use server::{MusicService, MusicServiceBuilder};
pub use store::{AudioStore, SaveRequest, SavedAudioFile, StoreError};
pub use types::{GenerationRequest, GenerationResult, MusicGenerationResponse, RemoteStatus};

/// Build the music service from configuration
pub fn build_service(config: &resona_config::Config) -> anyhow::Result<Arc<MusicService>> {
    let service = Arc::new(
        MusicServiceBuilder::new(config)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to initialize music service: {e}"))?,
    );
    Ok(service)
}

/// Create the endpoint router for music generation and file management
pub fn endpoint_router() -> Router<Arc<MusicService>> {
    Router::new()
        .route("/music/generate", post(handler::generate))
        .route("/music/examples", get(handler::examples))
        .route("/music/models", get(handler::list_models))
        .route("/music/files", get(handler::list_files))
        .route("/music/files/{filename}", delete(handler::delete_file))
        .route("/music/download/{filename}", get(handler::download))
        .route("/music/status", get(handler::status))
}
