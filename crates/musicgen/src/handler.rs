//! Axum route handlers for the `/music` endpoints

use std::{io, sync::Arc};

use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

use crate::{
    client::ApiStatus,
    error::{MusicGenError, Result},
    models,
    prompt,
    request::ExtractPayload,
    server::MusicService,
    store::{SaveRequest, StoreError},
    types::{
        DeleteResponse, ExamplesResponse, FileListResponse, GenerationRequest, GenerationResult, ModelsResponse,
        MusicGenerationResponse, StatusResponse,
    },
};

/// Handle `POST /music/generate`
pub(crate) async fn generate(
    State(service): State<Arc<MusicService>>,
    ExtractPayload(request): ExtractPayload<GenerationRequest>,
) -> Result<Json<MusicGenerationResponse>> {
    let (source, params) = request.into_parts()?;
    let mode = source.mode();
    let prompt = source.into_prompt();

    if prompt.is_empty() {
        return Err(MusicGenError::InvalidRequest(
            "Either 'prompt' or at least one of 'genre', 'mood', 'instruments', 'tempo', 'description' is required"
                .to_string(),
        ));
    }

    tracing::info!(
        mode,
        model = %params.model,
        duration = params.duration,
        save_locally = params.save_locally,
        "generating music"
    );

    match service
        .client()
        .generate_music(&prompt, params.duration, params.model)
        .await
    {
        GenerationResult::Success {
            audio_url,
            generation_time,
        } => {
            if params.save_locally {
                service.store().spawn_save(SaveRequest {
                    source_url: audio_url.clone(),
                    prompt: prompt.clone(),
                    custom_filename: params.custom_filename,
                });
            }

            Ok(Json(MusicGenerationResponse {
                success: true,
                audio_url,
                prompt,
                duration: params.duration,
                model: params.model,
                generation_time,
            }))
        }
        GenerationResult::Failure { error } => Err(MusicGenError::GenerationFailed(error)),
    }
}

/// Handle `GET /music/examples`
pub(crate) async fn examples() -> Json<ExamplesResponse> {
    Json(ExamplesResponse {
        examples: prompt::example_prompts(),
    })
}

/// Handle `GET /music/models`
pub(crate) async fn list_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: models::catalog(),
    })
}

/// Handle `GET /music/files`
pub(crate) async fn list_files(State(service): State<Arc<MusicService>>) -> Result<Json<FileListResponse>> {
    let files = service.store().list_saved().await?;

    Ok(Json(FileListResponse {
        count: files.len(),
        files,
    }))
}

/// Handle `GET /music/download/{filename}`
pub(crate) async fn download(
    State(service): State<Arc<MusicService>>,
    Path(filename): Path<String>,
) -> Result<Response> {
    let path = service
        .store()
        .get_path(&filename)
        .await?
        .ok_or_else(|| file_not_found(&filename))?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        // deleted after the lookup
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(file_not_found(&filename)),
        Err(e) => return Err(StoreError::Io(e).into()),
    };
    let length = file.metadata().await.map_err(StoreError::Io)?.len();

    tracing::debug!(filename, length, "serving audio file");

    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static(audio_content_type(&filename))),
        (header::CONTENT_LENGTH, HeaderValue::from(length)),
        (header::CONTENT_DISPOSITION, content_disposition(&filename)),
    ];

    Ok((headers, Body::from_stream(ReaderStream::new(file))).into_response())
}

/// Handle `DELETE /music/files/{filename}`
pub(crate) async fn delete_file(
    State(service): State<Arc<MusicService>>,
    Path(filename): Path<String>,
) -> Result<Json<DeleteResponse>> {
    if !service.store().delete(&filename).await? {
        return Err(file_not_found(&filename));
    }

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("File '{filename}' deleted"),
    }))
}

/// Handle `GET /music/status`
///
/// Always 200; a failed probe turns into a degraded payload.
pub(crate) async fn status(State(service): State<Arc<MusicService>>) -> Json<StatusResponse> {
    let response = match service.client().check_api_status().await {
        ApiStatus::Available(remote) => StatusResponse {
            service: "operational",
            remote: Some(remote),
            error: None,
        },
        ApiStatus::Unavailable { error } => StatusResponse {
            service: "degraded",
            remote: None,
            error: Some(error),
        },
    };

    Json(response)
}

fn file_not_found(filename: &str) -> MusicGenError {
    MusicGenError::NotFound(format!("File '{filename}' not found"))
}

/// MIME type from the file extension, `audio/mpeg` when unknown
fn audio_content_type(filename: &str) -> &'static str {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("wav") => "audio/wav",
        Some("flac") => "audio/flac",
        Some("ogg") => "audio/ogg",
        _ => "audio/mpeg",
    }
}

fn content_disposition(filename: &str) -> HeaderValue {
    let quoted = filename.replace(['"', '\\'], "_");

    HeaderValue::from_str(&format!("attachment; filename=\"{quoted}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
