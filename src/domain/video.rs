use super::profiles::Quality;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One uploaded video and the durable state of its renditions.
///
/// `qualities` is the target set fixed at creation time;
/// `available_qualities` grows by one label per successfully encoded
/// rendition and is always a subset of `qualities`. An empty `name` means
/// the video has not been published yet and stays out of public listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub author_id: String,
    pub source_path: PathBuf,
    pub output_dir: PathBuf,
    pub name: String,
    pub previews: Vec<String>,
    pub active_preview: usize,
    pub qualities: Vec<Quality>,
    pub available_qualities: Vec<Quality>,
}

impl Video {
    pub fn new(
        author_id: &str,
        source_path: &Path,
        output_dir: &Path,
        previews: Vec<String>,
        qualities: Vec<Quality>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            author_id: author_id.to_string(),
            source_path: source_path.to_path_buf(),
            output_dir: output_dir.to_path_buf(),
            name: String::new(),
            previews,
            active_preview: 0,
            qualities,
            available_qualities: Vec::new(),
        }
    }

    /// Last component of the output directory, used in public artifact paths.
    pub fn dir_name(&self) -> &str {
        self.output_dir
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }

    pub fn is_published(&self) -> bool {
        !self.name.is_empty()
    }

    pub fn has_playable_rendition(&self) -> bool {
        !self.available_qualities.is_empty()
    }

    /// All target renditions have been produced (compared as sets).
    /// Precondition for safe deletion.
    pub fn is_fully_processed(&self) -> bool {
        let targets: HashSet<Quality> = self.qualities.iter().copied().collect();
        let available: HashSet<Quality> = self.available_qualities.iter().copied().collect();
        targets == available
    }

    /// Record one completed rendition. Returns whether the label was
    /// appended; labels outside the target set or already present are
    /// ignored so the subset invariant cannot be violated.
    pub fn mark_available(&mut self, quality: Quality) -> bool {
        if !self.qualities.contains(&quality) || self.available_qualities.contains(&quality) {
            return false;
        }
        self.available_qualities.push(quality);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn video_with(qualities: Vec<Quality>) -> Video {
        Video::new(
            "user-1",
            &PathBuf::from("/uploads/abc-video/source.mp4"),
            &PathBuf::from("/uploads/abc-video"),
            vec!["thumb_1.png".to_string()],
            qualities,
        )
    }

    #[test]
    fn mark_available_appends_each_target_once() {
        let mut video = video_with(vec![Quality::P360, Quality::P480]);

        assert!(video.mark_available(Quality::P360));
        assert!(!video.mark_available(Quality::P360));
        assert_eq!(video.available_qualities, vec![Quality::P360]);
    }

    #[test]
    fn mark_available_rejects_untargeted_quality() {
        let mut video = video_with(vec![Quality::P360]);

        assert!(!video.mark_available(Quality::P1080));
        assert!(video.available_qualities.is_empty());
    }

    #[test]
    fn fully_processed_compares_as_sets() {
        let mut video = video_with(vec![Quality::P360, Quality::P480, Quality::P720]);
        assert!(!video.is_fully_processed());

        // Completion order differs from the target order.
        video.mark_available(Quality::P720);
        video.mark_available(Quality::P360);
        assert!(!video.is_fully_processed());

        video.mark_available(Quality::P480);
        assert!(video.is_fully_processed());
    }

    #[test]
    fn unnamed_video_is_unpublished() {
        let mut video = video_with(vec![Quality::P360]);
        assert!(!video.is_published());

        video.name = "My first upload".to_string();
        assert!(video.is_published());
    }

    #[test]
    fn dir_name_is_last_component() {
        let video = video_with(vec![Quality::P360]);
        assert_eq!(video.dir_name(), "abc-video");
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let video = video_with(vec![Quality::P360]);
        let value = serde_json::to_value(&video).unwrap();

        assert!(value.get("authorId").is_some());
        assert!(value.get("availableQualities").is_some());
        assert_eq!(value["qualities"][0], "360");
    }
}
