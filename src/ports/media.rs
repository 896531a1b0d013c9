use crate::domain::profiles::Profile;
use crate::domain::progress::EncodeProgress;
use crate::error::MediaError;
use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

/// What probing tells us about an uploaded source.
#[derive(Debug, Clone, Copy)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// Duration in seconds.
    pub duration: f64,
}

impl SourceInfo {
    pub fn duration_ms(&self) -> i64 {
        (self.duration * 1000.0) as i64
    }
}

/// Inspect a source file. Fails with `NoVideoStream` when the file has no
/// decodable video track.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProbe: Send + Sync {
    async fn probe(&self, source: &Path) -> Result<SourceInfo, MediaError>;
}

/// Produce still-image previews for a source, returning their filenames
/// relative to the output directory. Never returns an empty list; a run
/// that yields no images is `NoThumbnails`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ThumbnailExtractor: Send + Sync {
    async fn extract(
        &self,
        source: &Path,
        output_dir: &Path,
        info: SourceInfo,
    ) -> Result<Vec<String>, MediaError>;
}

/// Encode one rendition to segmented output in the output directory.
///
/// Progress snapshots are pushed through `progress` as the encoder runs;
/// the channel is dropped when the job settles. Exactly one of `Ok`/`Err`
/// is returned per job, and the external process must be gone by then.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RenditionEncoder: Send + Sync {
    async fn encode(
        &self,
        source: &Path,
        output_dir: &Path,
        profile: &'static Profile,
        info: SourceInfo,
        progress: mpsc::UnboundedSender<EncodeProgress>,
    ) -> Result<(), MediaError>;
}
