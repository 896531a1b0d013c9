use super::{ffmpeg_bin, Ffmpeg};
use crate::error::MediaError;
use crate::ports::media::{SourceInfo, ThumbnailExtractor};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Number of preview stills extracted per upload.
pub const PREVIEW_COUNT: u32 = 4;

/// Pixel size of each preview still.
pub const PREVIEW_SIZE: &str = "210x118";

#[async_trait]
impl ThumbnailExtractor for Ffmpeg {
    async fn extract(
        &self,
        source: &Path,
        output_dir: &Path,
        info: SourceInfo,
    ) -> Result<Vec<String>, MediaError> {
        let ffmpeg = ffmpeg_bin()?;
        tokio::fs::create_dir_all(output_dir).await?;

        let mut filenames = Vec::with_capacity(PREVIEW_COUNT as usize);

        for index in 0..PREVIEW_COUNT {
            let offset = preview_offset(info.duration, index);
            let filename = format!("thumb_{}.png", index + 1);
            let dest = output_dir.join(&filename);

            let output = Command::new(&ffmpeg)
                .arg("-y")
                .args(["-v", "error"])
                .args(["-ss", &format!("{:.3}", offset)])
                .arg("-i")
                .arg(source)
                .args(["-vframes", "1"])
                .args(["-s", PREVIEW_SIZE])
                .arg(&dest)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .output()
                .await?;

            if !output.status.success() {
                return Err(MediaError::EncoderFailed {
                    code: output.status.code(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                });
            }

            if dest.exists() {
                debug!(thumbnail = %dest.display(), "extracted preview");
                filenames.push(filename);
            }
        }

        if filenames.is_empty() {
            return Err(MediaError::NoThumbnails);
        }

        Ok(filenames)
    }
}

/// Seek offsets are spread evenly across the open interval of the source
/// duration, so the first still is never the black leading frame.
fn preview_offset(duration: f64, index: u32) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    duration * f64::from(index + 1) / f64::from(PREVIEW_COUNT + 1)
}
