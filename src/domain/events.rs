//! Events pushed to connected clients over the notification bus.

use super::progress::EncodeProgress;
use serde::Serialize;

/// Wire shape is `{"event": "...", "data": {...}}` with camelCase fields.
///
/// Progress and completion events go to the owning user only; `NewComment`
/// is broadcast to everyone by the comment-posting collaborator and carries
/// that collaborator's payload untouched.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum Event {
    VideoProgress {
        video_id: String,
        profile_height: u32,
        progress: EncodeProgress,
    },
    VideoEnd {
        video_id: String,
        profile_height: u32,
    },
    NewComment(serde_json::Value),
}
