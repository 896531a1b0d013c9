//! In-memory stand-in for the external video store, used by the monolith
//! binary and the service tests.

use crate::domain::video::Video;
use crate::error::BoxError;
use crate::ports::repository::VideoRepository;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryVideoRepository {
    // Insertion sequence stands in for the autoincrement id ordering of a
    // relational store.
    seq: Arc<AtomicU64>,
    videos: Arc<RwLock<HashMap<String, (u64, Video)>>>,
}

impl InMemoryVideoRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VideoRepository for InMemoryVideoRepository {
    async fn load(&self, id: &str) -> Result<Option<Video>, BoxError> {
        let videos = self.videos.read().await;
        Ok(videos.get(id).map(|(_, video)| video.clone()))
    }

    async fn create(&self, video: &Video) -> Result<(), BoxError> {
        let mut videos = self.videos.write().await;
        if videos.contains_key(&video.id) {
            return Err(format!("video {} already exists", video.id).into());
        }
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        videos.insert(video.id.clone(), (seq, video.clone()));
        Ok(())
    }

    async fn save(&self, video: &Video) -> Result<(), BoxError> {
        let mut videos = self.videos.write().await;
        match videos.get_mut(&video.id) {
            Some(slot) => {
                slot.1 = video.clone();
                Ok(())
            }
            None => Err(format!("video {} does not exist", video.id).into()),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), BoxError> {
        let mut videos = self.videos.write().await;
        videos.remove(id);
        Ok(())
    }

    async fn list_published(&self) -> Result<Vec<Video>, BoxError> {
        let videos = self.videos.read().await;
        let mut published: Vec<(u64, Video)> = videos
            .values()
            .filter(|(_, video)| video.is_published() && video.has_playable_rendition())
            .cloned()
            .collect();
        published.sort_by_key(|(seq, _)| *seq);
        Ok(published.into_iter().map(|(_, video)| video).collect())
    }

    async fn list_by_author(&self, author_id: &str) -> Result<Vec<Video>, BoxError> {
        let videos = self.videos.read().await;
        let mut own: Vec<(u64, Video)> = videos
            .values()
            .filter(|(_, video)| video.author_id == author_id)
            .cloned()
            .collect();
        own.sort_by_key(|(seq, _)| std::cmp::Reverse(*seq));
        Ok(own.into_iter().map(|(_, video)| video).collect())
    }
}
