use super::{ffprobe_bin, Ffmpeg};
use crate::error::MediaError;
use crate::ports::media::{MediaProbe, SourceInfo};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
}

#[async_trait]
impl MediaProbe for Ffmpeg {
    async fn probe(&self, source: &Path) -> Result<SourceInfo, MediaError> {
        let ffprobe = ffprobe_bin()?;

        let output = Command::new(ffprobe)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(source)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            return Err(MediaError::ProbeFailed {
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
        parse_source_info(&probe)
    }
}

fn parse_source_info(probe: &FfprobeOutput) -> Result<SourceInfo, MediaError> {
    let video_stream = probe
        .streams
        .iter()
        .find(|stream| stream.codec_type == "video")
        .ok_or(MediaError::NoVideoStream)?;

    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|value| value.parse::<f64>().ok())
        .unwrap_or(0.0);

    Ok(SourceInfo {
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        duration,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_from(json: &str) -> FfprobeOutput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn reads_dimensions_and_duration_from_the_first_video_stream() {
        let probe = probe_from(
            r#"{
                "format": {"duration": "12.480000"},
                "streams": [
                    {"codec_type": "audio"},
                    {"codec_type": "video", "width": 1920, "height": 1080},
                    {"codec_type": "video", "width": 640, "height": 360}
                ]
            }"#,
        );

        let info = parse_source_info(&probe).unwrap();
        assert_eq!(info.width, 1920);
        assert_eq!(info.height, 1080);
        assert!((info.duration - 12.48).abs() < 0.001);
        assert_eq!(info.duration_ms(), 12_480);
    }

    #[test]
    fn audio_only_source_is_rejected() {
        let probe = probe_from(
            r#"{"format": {}, "streams": [{"codec_type": "audio"}]}"#,
        );

        assert!(matches!(
            parse_source_info(&probe),
            Err(MediaError::NoVideoStream)
        ));
    }

    #[test]
    fn missing_duration_defaults_to_zero() {
        let probe = probe_from(
            r#"{"format": {}, "streams": [{"codec_type": "video", "width": 640, "height": 360}]}"#,
        );

        let info = parse_source_info(&probe).unwrap();
        assert_eq!(info.duration, 0.0);
    }
}
