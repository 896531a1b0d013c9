use crate::domain::video::Video;
use crate::error::BoxError;
use async_trait::async_trait;

/// Load/save contract over the external video store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoRepository: Send + Sync {
    async fn load(&self, id: &str) -> Result<Option<Video>, BoxError>;

    async fn create(&self, video: &Video) -> Result<(), BoxError>;

    async fn save(&self, video: &Video) -> Result<(), BoxError>;

    async fn delete(&self, id: &str) -> Result<(), BoxError>;

    /// Named videos with at least one playable rendition, oldest first.
    async fn list_published(&self) -> Result<Vec<Video>, BoxError>;

    /// Every video belonging to one author, newest first.
    async fn list_by_author(&self, author_id: &str) -> Result<Vec<Video>, BoxError>;
}
