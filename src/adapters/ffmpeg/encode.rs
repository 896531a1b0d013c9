use super::{ffmpeg_bin, Ffmpeg};
use crate::domain::profiles::Profile;
use crate::domain::progress::EncodeProgress;
use crate::error::MediaError;
use crate::ports::media::{RenditionEncoder, SourceInfo};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::debug;

/// How much trailing encoder stderr is kept in a failure report.
const STDERR_TAIL: usize = 2048;

/// Arguments for one encode-to-segmented-output run: scale to the profile
/// height, h264/aac at the profile's bitrate envelope, 10s segments, VOD
/// playlist.
pub fn rendition_args(source: &Path, output_dir: &Path, profile: &Profile) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-y".into(),
        "-v".into(),
        "error".into(),
        "-progress".into(),
        "pipe:1".into(),
        "-i".into(),
        source.to_string_lossy().into_owned(),
        "-profile:v".into(),
        "main".into(),
        "-vf".into(),
        format!("scale=-2:{}", profile.height),
        "-c:a".into(),
        "aac".into(),
        "-ar".into(),
        "48000".into(),
        "-b:a".into(),
        "192k".into(),
        "-c:v".into(),
        "h264".into(),
        "-crf".into(),
        "20".into(),
        "-g".into(),
        "48".into(),
        "-keyint_min".into(),
        "48".into(),
        "-sc_threshold".into(),
        "0".into(),
        "-b:v".into(),
        profile.avg_bitrate.into(),
        "-maxrate".into(),
        profile.max_bitrate.into(),
        "-bufsize".into(),
        profile.buf_size.into(),
        "-hls_time".into(),
        "10".into(),
        "-hls_segment_filename".into(),
        output_dir
            .join(profile.segment_template())
            .to_string_lossy()
            .into_owned(),
        "-hls_playlist_type".into(),
        "vod".into(),
        "-f".into(),
        "hls".into(),
    ];
    args.push(
        output_dir
            .join(profile.manifest_name())
            .to_string_lossy()
            .into_owned(),
    );
    args
}

#[async_trait]
impl RenditionEncoder for Ffmpeg {
    async fn encode(
        &self,
        source: &Path,
        output_dir: &Path,
        profile: &'static Profile,
        info: SourceInfo,
        progress: mpsc::UnboundedSender<EncodeProgress>,
    ) -> Result<(), MediaError> {
        let ffmpeg = ffmpeg_bin()?;
        tokio::fs::create_dir_all(output_dir).await?;

        let args = rendition_args(source, output_dir, profile);
        debug!(height = profile.height, "running ffmpeg {}", args.join(" "));

        let mut child = Command::new(&ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child.stdout.take().expect("stdout not captured");
        let stderr = child.stderr.take().expect("stderr not captured");

        let duration_ms = info.duration_ms();
        let progress_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut current = EncodeProgress::default();

            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(mut snapshot) = parse_progress_line(&line, &mut current) {
                    snapshot.percent = snapshot.percentage(duration_ms);
                    if snapshot.is_reportable() && progress.send(snapshot).is_err() {
                        break;
                    }
                }
            }
        });

        let stderr_task = tokio::spawn(async move {
            let mut buf = String::new();
            let _ = BufReader::new(stderr).read_to_string(&mut buf).await;
            buf
        });

        let status = child.wait().await?;
        let _ = progress_task.await;
        let stderr_text = stderr_task.await.unwrap_or_default();

        if status.success() {
            Ok(())
        } else {
            Err(MediaError::EncoderFailed {
                code: status.code(),
                stderr: tail(&stderr_text, STDERR_TAIL),
            })
        }
    }
}

/// Fold one `-progress` key=value line into the running snapshot. Returns a
/// snapshot to report when the `progress=` boundary line arrives.
fn parse_progress_line(line: &str, current: &mut EncodeProgress) -> Option<EncodeProgress> {
    let (key, value) = line.trim().split_once('=')?;

    match key {
        "out_time_ms" | "out_time_us" => {
            // Both keys carry microseconds in modern ffmpeg builds.
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "out_time" => {
            current.out_time = value.to_string();
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "fps" => {
            if let Ok(fps) = value.parse() {
                current.fps = fps;
            }
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|v| v.parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            return Some(current.clone());
        }
        _ => {}
    }

    None
}

fn tail(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let start = text.len() - max;
    let boundary = (start..text.len())
        .find(|&i| text.is_char_boundary(i))
        .unwrap_or(start);
    text[boundary..].to_string()
}
