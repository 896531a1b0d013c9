use super::{AppState, AuthedUser};
use crate::domain::video::Video;
use axum::body::Bytes;
use axum::extract::{Multipart, Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{BoxError, Json};
use futures::{Stream, TryStreamExt};
use serde::Deserialize;
use std::io;
use std::path::Path;
use tokio::fs::File;
use tokio::io::BufWriter;
use tokio_util::io::StreamReader;
use tracing::info;
use uuid::Uuid;

/// Container types the original upload form accepts.
const ACCEPTED_MIME_TYPES: [&str; 4] =
    ["video/mpeg", "video/mp4", "video/webm", "video/x-msvideo"];

// Handler that accepts a multipart upload, streams the video field to disk
// and kicks off the transcoding pipeline. Responds as soon as the record
// exists; renditions keep encoding in the background.
pub async fn upload(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    mut multipart: Multipart,
) -> Result<Json<Video>, Response> {
    while let Ok(Some(field)) = multipart.next_field().await {
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let accepted = field
            .content_type()
            .map(|mime| ACCEPTED_MIME_TYPES.contains(&mime))
            .unwrap_or(false);
        if !accepted {
            continue;
        }
        if !is_plain_file_name(&file_name) {
            return Err((StatusCode::BAD_REQUEST, "invalid file name").into_response());
        }

        let output_dir = state.upload_dir.join(format!("{}-video", Uuid::new_v4()));
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|err| {
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
            })?;

        let source = output_dir.join(&file_name);
        info!("saving new upload to {}", source.display());
        stream_to_file(&source, field)
            .await
            .map_err(IntoResponse::into_response)?;

        return match state
            .transcoder
            .start_pipeline(&user_id, &source, &output_dir)
            .await
        {
            Ok(video) => Ok(Json(video)),
            Err(err) => {
                // Nothing was recorded, so nothing should stay on disk.
                let _ = tokio::fs::remove_dir_all(&output_dir).await;
                Err(err.into_response())
            }
        };
    }

    Err((StatusCode::CONFLICT, "no acceptable video field in request").into_response())
}

pub async fn list_published(
    State(state): State<AppState>,
    AuthedUser(_): AuthedUser,
) -> Result<Json<Vec<Video>>, Response> {
    let videos = state
        .library
        .list_published()
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(Json(videos))
}

pub async fn list_mine(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
) -> Result<Json<Vec<Video>>, Response> {
    let videos = state
        .library
        .list_by_author(&user_id)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(Json(videos))
}

pub async fn get_one(
    State(state): State<AppState>,
    AuthedUser(_): AuthedUser,
    UrlPath(video_id): UrlPath<String>,
) -> Result<Json<Video>, Response> {
    let video = state
        .library
        .get_published(&video_id)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(Json(video))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVideoRequest {
    pub name: String,
    pub active_preview: usize,
}

pub async fn update(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    UrlPath(video_id): UrlPath<String>,
    Json(request): Json<UpdateVideoRequest>,
) -> Result<Json<Video>, Response> {
    let video = state
        .library
        .update_details(&user_id, &video_id, &request.name, request.active_preview)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(Json(video))
}

pub async fn remove(
    State(state): State<AppState>,
    AuthedUser(user_id): AuthedUser,
    UrlPath(video_id): UrlPath<String>,
) -> Result<Json<Video>, Response> {
    let video = state
        .library
        .delete(&user_id, &video_id)
        .await
        .map_err(IntoResponse::into_response)?;
    Ok(Json(video))
}

pub async fn master_manifest(
    State(state): State<AppState>,
    AuthedUser(_): AuthedUser,
    UrlPath(video_id): UrlPath<String>,
) -> Result<Response, Response> {
    let manifest = state
        .library
        .master_manifest(&video_id)
        .await
        .map_err(IntoResponse::into_response)?;

    Ok((
        [(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")],
        manifest,
    )
        .into_response())
}

// Save a `Stream` to a file
async fn stream_to_file<S, E>(path: &Path, stream: S) -> Result<(), (StatusCode, String)>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    async {
        let body_with_io_error =
            stream.map_err(|err| io::Error::new(io::ErrorKind::Other, err));
        let body_reader = StreamReader::new(body_with_io_error);
        futures::pin_mut!(body_reader);

        let mut file = BufWriter::new(File::create(path).await?);
        tokio::io::copy(&mut body_reader, &mut file).await?;

        Ok::<_, io::Error>(())
    }
    .await
    .map_err(|err| (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
}

/// Uploaded file names must stay inside their upload directory: a single
/// path component, no traversal.
fn is_plain_file_name(name: &str) -> bool {
    let path = Path::new(name);
    path.file_name() == Some(std::ffi::OsStr::new(name))
}
