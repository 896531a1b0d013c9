use crate::domain::manifest::MasterPlaylist;
use crate::domain::video::Video;
use crate::error::ServiceError;
use crate::ports::repository::VideoRepository;
use std::io::ErrorKind;
use tracing::info;

/// User-facing operations over stored videos: lookups, listings,
/// publishing edits, master-manifest composition and guarded deletion.
pub struct VideoLibrary<R> {
    repo: R,
    /// URL root under which output directories are served to players.
    public_prefix: String,
}

impl<R> VideoLibrary<R>
where
    R: VideoRepository,
{
    pub fn new(repo: R, public_prefix: &str) -> Self {
        Self {
            repo,
            public_prefix: public_prefix.trim_end_matches('/').to_string(),
        }
    }

    async fn load(&self, video_id: &str) -> Result<Video, ServiceError> {
        self.repo
            .load(video_id)
            .await
            .map_err(ServiceError::Repository)?
            .ok_or(ServiceError::NotFound)
    }

    async fn load_owned(&self, user_id: &str, video_id: &str) -> Result<Video, ServiceError> {
        let video = self.load(video_id).await?;
        if video.author_id != user_id {
            return Err(ServiceError::Unauthorized);
        }
        Ok(video)
    }

    /// A published, watchable video for playback pages.
    pub async fn get_published(&self, video_id: &str) -> Result<Video, ServiceError> {
        let video = self.load(video_id).await?;
        if !video.is_published() || !video.has_playable_rendition() {
            return Err(ServiceError::NotFound);
        }
        Ok(video)
    }

    pub async fn list_published(&self) -> Result<Vec<Video>, ServiceError> {
        self.repo
            .list_published()
            .await
            .map_err(ServiceError::Repository)
    }

    pub async fn list_by_author(&self, user_id: &str) -> Result<Vec<Video>, ServiceError> {
        self.repo
            .list_by_author(user_id)
            .await
            .map_err(ServiceError::Repository)
    }

    /// Rename and pick the active preview. A non-empty name publishes the
    /// video; the preview index must point into `previews`.
    pub async fn update_details(
        &self,
        user_id: &str,
        video_id: &str,
        name: &str,
        active_preview: usize,
    ) -> Result<Video, ServiceError> {
        let mut video = self.load_owned(user_id, video_id).await?;

        if name.is_empty() {
            return Err(ServiceError::InvalidInput("name must not be empty".to_string()));
        }
        if active_preview >= video.previews.len() {
            return Err(ServiceError::InvalidInput(format!(
                "active preview {} is out of range",
                active_preview
            )));
        }

        video.name = name.to_string();
        video.active_preview = active_preview;
        self.repo
            .save(&video)
            .await
            .map_err(ServiceError::Repository)?;

        Ok(video)
    }

    /// Master playlist for adaptive playback of one video.
    pub async fn master_manifest(&self, video_id: &str) -> Result<String, ServiceError> {
        let video = self.load(video_id).await?;
        Ok(MasterPlaylist::for_video(&video, &self.public_prefix).render())
    }

    /// Destroy a video and its generated artifacts, but only once every
    /// target rendition has been produced. The output directory goes
    /// first; if that fails the record stays, so neither orphaned files
    /// nor an orphaned record can result.
    pub async fn delete(&self, user_id: &str, video_id: &str) -> Result<Video, ServiceError> {
        let video = self.load_owned(user_id, video_id).await?;

        if !video.is_fully_processed() {
            return Err(ServiceError::IncompleteProcessing);
        }

        match tokio::fs::remove_dir_all(&video.output_dir).await {
            Ok(()) => {}
            // Nothing left on disk means nothing left to orphan.
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(ServiceError::Cleanup(err)),
        }

        self.repo
            .delete(&video.id)
            .await
            .map_err(ServiceError::Repository)?;

        info!(video = %video.id, "video deleted");
        Ok(video)
    }
}
