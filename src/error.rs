//! Error types for the transcoding pipeline and its service layer.

use thiserror::Error;

/// Boxed error used at the storage port seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while driving the external encoder/prober.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("ffmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("ffprobe not found in PATH")]
    FfprobeNotFound,

    /// The source contains no decodable video track. Terminal, not retried.
    #[error("source has no decodable video stream")]
    NoVideoStream,

    /// Thumbnail extraction finished without reporting any output files.
    #[error("thumbnail extraction produced no images")]
    NoThumbnails,

    #[error("encoder exited with status {code:?}: {stderr}")]
    EncoderFailed {
        code: Option<i32>,
        stderr: String,
    },

    #[error("probe failed: {stderr}")]
    ProbeFailed { stderr: String },

    #[error("could not parse probe output: {0}")]
    ProbeParse(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the user-facing operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("video not found")]
    NotFound,

    #[error("video does not belong to the caller")]
    Unauthorized,

    /// Deletion requested while some renditions are still processing.
    /// Recoverable by waiting for the remaining jobs to settle.
    #[error("all renditions must finish processing before this operation")]
    IncompleteProcessing,

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("storage operation failed: {0}")]
    Repository(BoxError),

    /// Output-directory removal failed mid-deletion; the record is kept so
    /// that neither side of the operation is left orphaned.
    #[error("failed to remove video artifacts: {0}")]
    Cleanup(std::io::Error),
}
