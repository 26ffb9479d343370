use axum::body::Body;
use serde::de::DeserializeOwned;

use crate::error::MusicGenError;

/// Extractor for JSON request bodies
///
/// Rejections are [`MusicGenError`]s so they render with the same error
/// envelope as every other failure.
pub(crate) struct ExtractPayload<T>(pub T);

/// Body limit for music requests (1 MiB)
const BODY_LIMIT_BYTES: usize = 1 << 20;

impl<S, T: DeserializeOwned> axum::extract::FromRequest<S> for ExtractPayload<T>
where
    S: Send + Sync,
{
    type Rejection = MusicGenError;

    async fn from_request(request: http::Request<Body>, _state: &S) -> Result<Self, Self::Rejection> {
        let (parts, body) = request.into_parts();

        if !parts
            .headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(is_json)
        {
            return Err(MusicGenError::UnsupportedMediaType);
        }

        let bytes = axum::body::to_bytes(body, BODY_LIMIT_BYTES).await.map_err(|err| {
            if std::error::Error::source(&err).is_some_and(|source| source.is::<http_body_util::LengthLimitError>()) {
                MusicGenError::PayloadTooLarge(BODY_LIMIT_BYTES)
            } else {
                MusicGenError::InvalidRequest(format!("Failed to read request body: {err}"))
            }
        })?;

        serde_json::from_slice::<T>(&bytes)
            .map(Self)
            .map_err(|e| MusicGenError::InvalidRequest(format!("Failed to parse request body: {e}")))
    }
}

/// `application/json`, optionally with parameters such as a charset
fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}
