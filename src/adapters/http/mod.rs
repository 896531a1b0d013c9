//! Inbound HTTP/WebSocket adapter.

pub mod video;
pub mod ws;

use crate::adapters::events::EventHub;
use crate::adapters::ffmpeg::Ffmpeg;
use crate::adapters::memory::InMemoryVideoRepository;
use crate::application::library::VideoLibrary;
use crate::application::orchestrator::TranscodeService;
use crate::error::{MediaError, ServiceError};
use axum::extract::{DefaultBodyLimit, FromRequestParts};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{async_trait, Json, Router};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;

pub type Transcoder = TranscodeService<Ffmpeg, Ffmpeg, Ffmpeg, InMemoryVideoRepository>;

#[derive(Clone)]
pub struct AppState {
    pub transcoder: Arc<Transcoder>,
    pub library: Arc<VideoLibrary<InMemoryVideoRepository>>,
    pub hub: Arc<EventHub>,
    pub upload_dir: PathBuf,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/video",
            get(video::list_published).post(video::upload),
        )
        .route("/video/my", get(video::list_mine))
        .route(
            "/video/:video_id",
            get(video::get_one)
                .patch(video::update)
                .delete(video::remove),
        )
        .route("/video/:video_id/hls.m3u8", get(video::master_manifest))
        .route("/ws", get(ws::connect))
        .layer(DefaultBodyLimit::disable())
        .with_state(state)
}

/// Identity of the caller, supplied by the session collaborator in front
/// of this service. A request without one never reaches the handlers.
pub struct AuthedUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(|value| AuthedUser(value.to_string()))
            .ok_or((StatusCode::UNAUTHORIZED, "missing user identity"))
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::NotFound => StatusCode::NOT_FOUND,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::IncompleteProcessing | ServiceError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Media(MediaError::NoVideoStream | MediaError::NoThumbnails) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ServiceError::Media(_) | ServiceError::Repository(_) | ServiceError::Cleanup(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("request failed: {}", self);
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
