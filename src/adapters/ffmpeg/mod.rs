//! Adapters driving the external ffmpeg/ffprobe binaries as black-box
//! processes.

pub mod encode;
pub mod probe;
pub mod thumbnails;

use crate::error::MediaError;
use std::path::PathBuf;

/// The ffmpeg-backed implementation of the media ports.
#[derive(Clone, Copy)]
pub struct Ffmpeg;

impl Ffmpeg {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn ffmpeg_bin() -> Result<PathBuf, MediaError> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

pub(crate) fn ffprobe_bin() -> Result<PathBuf, MediaError> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}
