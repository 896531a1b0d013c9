use crate::adapters::events::EventHub;
use crate::domain::events::Event;
use crate::domain::jobs::{JobState, RenditionJob};
use crate::domain::profiles::{self, Profile};
use crate::domain::video::Video;
use crate::error::{BoxError, ServiceError};
use crate::ports::media::{MediaProbe, RenditionEncoder, SourceInfo, ThumbnailExtractor};
use crate::ports::repository::VideoRepository;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Drives the upload-to-renditions pipeline for one video at a time:
/// probe, select profiles, extract previews, create the record, then run
/// one encode job per profile concurrently while streaming progress to the
/// owner.
///
/// `start_pipeline` returns as soon as the record exists; the rendition
/// jobs keep running in the background and append to
/// `available_qualities` as they succeed.
pub struct TranscodeService<P, T, E, R> {
    probe: P,
    thumbnails: T,
    encoder: Arc<E>,
    repo: R,
    hub: Arc<EventHub>,
}

/// Everything one rendition job needs, cloned per spawned task.
struct JobContext<E, R> {
    encoder: Arc<E>,
    repo: R,
    hub: Arc<EventHub>,
    /// Serializes the read-append-write on `available_qualities` for this
    /// video, so two jobs finishing close together cannot lose an update.
    append_lock: Arc<Mutex<()>>,
    source: PathBuf,
    output_dir: PathBuf,
    author_id: String,
    info: SourceInfo,
}

impl<E, R: Clone> Clone for JobContext<E, R> {
    fn clone(&self) -> Self {
        Self {
            encoder: self.encoder.clone(),
            repo: self.repo.clone(),
            hub: self.hub.clone(),
            append_lock: self.append_lock.clone(),
            source: self.source.clone(),
            output_dir: self.output_dir.clone(),
            author_id: self.author_id.clone(),
            info: self.info,
        }
    }
}

impl<P, T, E, R> TranscodeService<P, T, E, R>
where
    P: MediaProbe,
    T: ThumbnailExtractor,
    E: RenditionEncoder + 'static,
    R: VideoRepository + Clone + 'static,
{
    pub fn new(probe: P, thumbnails: T, encoder: E, repo: R, hub: Arc<EventHub>) -> Self {
        Self {
            probe,
            thumbnails,
            encoder: Arc::new(encoder),
            repo,
            hub,
        }
    }

    /// Accept a newly uploaded source. Probing and thumbnail extraction
    /// must both succeed before anything becomes visible: on failure no
    /// record exists and the output directory is the caller's to clean up.
    pub async fn start_pipeline(
        &self,
        author_id: &str,
        source: &Path,
        output_dir: &Path,
    ) -> Result<Video, ServiceError> {
        let info = self.probe.probe(source).await?;

        let selected = profiles::select(info.height);
        if selected.is_empty() {
            // Unreachable given the fallback rule, but never dispatch an
            // empty job set.
            return Err(ServiceError::InvalidInput(
                "no encoding profiles apply to this source".to_string(),
            ));
        }

        let previews = self.thumbnails.extract(source, output_dir, info).await?;
        if previews.is_empty() {
            // No record with jobs but no thumbnails, ever.
            return Err(ServiceError::Media(crate::error::MediaError::NoThumbnails));
        }

        let video = Video::new(
            author_id,
            source,
            output_dir,
            previews,
            selected.iter().map(|profile| profile.quality).collect(),
        );
        self.repo
            .create(&video)
            .await
            .map_err(ServiceError::Repository)?;

        info!(
            video = %video.id,
            height = info.height,
            renditions = selected.len(),
            "pipeline dispatched"
        );
        self.dispatch(&video, info, selected);

        Ok(video)
    }

    fn dispatch(&self, video: &Video, info: SourceInfo, selected: Vec<&'static Profile>) {
        let context = JobContext {
            encoder: self.encoder.clone(),
            repo: self.repo.clone(),
            hub: self.hub.clone(),
            append_lock: Arc::new(Mutex::new(())),
            source: video.source_path.clone(),
            output_dir: video.output_dir.clone(),
            author_id: video.author_id.clone(),
            info,
        };

        let mut jobs = JoinSet::new();
        for profile in selected {
            jobs.spawn(run_rendition(
                RenditionJob::new(&video.id, profile),
                context.clone(),
            ));
        }

        let video_id = video.id.clone();
        let source = video.source_path.clone();
        tokio::spawn(async move {
            let mut succeeded = 0usize;
            let mut failed = 0usize;

            while let Some(settled) = jobs.join_next().await {
                match settled {
                    Ok(job) if job.state == JobState::Succeeded => succeeded += 1,
                    Ok(_) => failed += 1,
                    Err(err) => {
                        failed += 1;
                        error!(video = %video_id, "rendition task panicked: {err}");
                    }
                }
            }
            info!(video = %video_id, succeeded, failed, "rendition jobs settled");

            // The source served its purpose once every job has settled.
            if let Err(err) = tokio::fs::remove_file(&source).await {
                warn!(
                    video = %video_id,
                    "could not remove source file {}: {err}",
                    source.display()
                );
            }
        });
    }
}

async fn run_rendition<E, R>(mut job: RenditionJob, context: JobContext<E, R>) -> RenditionJob
where
    E: RenditionEncoder,
    R: VideoRepository,
{
    job.start();

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();

    let forwarder = {
        let hub = context.hub.clone();
        let author_id = context.author_id.clone();
        let video_id = job.video_id.clone();
        let profile_height = job.profile.height;
        tokio::spawn(async move {
            while let Some(progress) = progress_rx.recv().await {
                hub.notify_user(
                    &author_id,
                    Event::VideoProgress {
                        video_id: video_id.clone(),
                        profile_height,
                        progress,
                    },
                )
                .await;
            }
        })
    };

    let result = context
        .encoder
        .encode(
            &context.source,
            &context.output_dir,
            job.profile,
            context.info,
            progress_tx,
        )
        .await;
    // The encoder dropped its sender; drain the last forwarded snapshots.
    let _ = forwarder.await;

    match result {
        Ok(()) => match record_completion(&context, &job).await {
            Ok(()) => job.succeed(),
            Err(err) => {
                error!(
                    video = %job.video_id,
                    height = job.profile.height,
                    "could not record completed rendition: {err}"
                );
                job.fail();
            }
        },
        Err(err) => {
            // One failed rendition never rolls back its siblings; the
            // quality simply stays unavailable.
            error!(
                video = %job.video_id,
                height = job.profile.height,
                "rendition failed: {err}"
            );
            job.fail();
        }
    }

    job
}

/// Append the finished quality to the record under the per-video lock,
/// persist, then tell the owner.
async fn record_completion<E, R>(
    context: &JobContext<E, R>,
    job: &RenditionJob,
) -> Result<(), BoxError>
where
    R: VideoRepository,
{
    {
        let _guard = context.append_lock.lock().await;

        let mut video = context
            .repo
            .load(&job.video_id)
            .await?
            .ok_or("video record disappeared mid-pipeline")?;
        if video.mark_available(job.profile.quality) {
            context.repo.save(&video).await?;
        }
    }

    context
        .hub
        .notify_user(
            &context.author_id,
            Event::VideoEnd {
                video_id: job.video_id.clone(),
                profile_height: job.profile.height,
            },
        )
        .await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryVideoRepository;
    use crate::domain::profiles::Quality;
    use crate::domain::progress::EncodeProgress;
    use crate::error::MediaError;
    use crate::ports::media::{
        MockMediaProbe, MockRenditionEncoder, MockThumbnailExtractor,
    };
    use std::time::Duration;
    use tempfile::tempdir;

    fn source_info(height: u32) -> SourceInfo {
        SourceInfo {
            width: height * 16 / 9,
            height,
            duration: 10.0,
        }
    }

    fn probe_returning(height: u32) -> MockMediaProbe {
        let mut probe = MockMediaProbe::new();
        probe
            .expect_probe()
            .returning(move |_| Ok(source_info(height)));
        probe
    }

    fn extractor_with_previews() -> MockThumbnailExtractor {
        let mut extractor = MockThumbnailExtractor::new();
        extractor.expect_extract().returning(|_, _, _| {
            Ok(vec![
                "thumb_1.png".to_string(),
                "thumb_2.png".to_string(),
                "thumb_3.png".to_string(),
                "thumb_4.png".to_string(),
            ])
        });
        extractor
    }

    fn encoder_succeeding() -> MockRenditionEncoder {
        let mut encoder = MockRenditionEncoder::new();
        encoder.expect_encode().returning(|_, _, _, _, tx| {
            let _ = tx.send(EncodeProgress {
                out_time_ms: 5_000,
                percent: 50.0,
                ..Default::default()
            });
            Ok(())
        });
        encoder
    }

    async fn write_source(dir: &Path) -> PathBuf {
        let source = dir.join("source.mp4");
        tokio::fs::write(&source, b"raw video bytes").await.unwrap();
        source
    }

    async fn wait_for_available(
        repo: &InMemoryVideoRepository,
        id: &str,
        count: usize,
    ) -> Video {
        for _ in 0..300 {
            if let Some(video) = repo.load(id).await.unwrap() {
                if video.available_qualities.len() >= count {
                    return video;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("renditions did not settle in time");
    }

    #[tokio::test]
    async fn record_is_returned_before_any_rendition_completes() {
        let repo = InMemoryVideoRepository::new();
        let hub = Arc::new(EventHub::new());
        let service = TranscodeService::new(
            probe_returning(720),
            extractor_with_previews(),
            encoder_succeeding(),
            repo.clone(),
            hub,
        );

        let dir = tempdir().unwrap();
        let source = write_source(dir.path()).await;
        let out_dir = dir.path().join("out");

        let video = service
            .start_pipeline("user-1", &source, &out_dir)
            .await
            .unwrap();

        assert_eq!(
            video.qualities,
            vec![Quality::P360, Quality::P480, Quality::P720]
        );
        assert!(video.available_qualities.is_empty());
        assert_eq!(video.previews.len(), 4);

        let settled = wait_for_available(&repo, &video.id, 3).await;
        assert!(settled.is_fully_processed());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_completions_lose_no_quality_labels() {
        let repo = InMemoryVideoRepository::new();
        let hub = Arc::new(EventHub::new());
        let service = TranscodeService::new(
            probe_returning(1080),
            extractor_with_previews(),
            encoder_succeeding(),
            repo.clone(),
            hub,
        );

        let dir = tempdir().unwrap();
        let source = write_source(dir.path()).await;
        let out_dir = dir.path().join("out");

        let video = service
            .start_pipeline("user-1", &source, &out_dir)
            .await
            .unwrap();

        let settled = wait_for_available(&repo, &video.id, 4).await;
        assert_eq!(settled.available_qualities.len(), 4);
        assert!(settled.is_fully_processed());
    }

    #[tokio::test]
    async fn failed_rendition_leaves_its_siblings_alone() {
        let repo = InMemoryVideoRepository::new();
        let hub = Arc::new(EventHub::new());

        let mut encoder = MockRenditionEncoder::new();
        encoder.expect_encode().returning(|_, _, profile, _, _| {
            if profile.height == 480 {
                Err(MediaError::EncoderFailed {
                    code: Some(1),
                    stderr: "segment write failed".to_string(),
                })
            } else {
                Ok(())
            }
        });

        let service = TranscodeService::new(
            probe_returning(1080),
            extractor_with_previews(),
            encoder,
            repo.clone(),
            hub,
        );

        let dir = tempdir().unwrap();
        let source = write_source(dir.path()).await;
        let out_dir = dir.path().join("out");

        let video = service
            .start_pipeline("user-1", &source, &out_dir)
            .await
            .unwrap();

        let settled = wait_for_available(&repo, &video.id, 3).await;
        assert!(!settled.available_qualities.contains(&Quality::P480));
        assert!(!settled.is_fully_processed());
    }

    #[tokio::test]
    async fn extraction_failure_aborts_before_any_record_exists() {
        let repo = InMemoryVideoRepository::new();
        let hub = Arc::new(EventHub::new());

        let mut extractor = MockThumbnailExtractor::new();
        extractor
            .expect_extract()
            .returning(|_, _, _| Err(MediaError::NoThumbnails));

        let service = TranscodeService::new(
            probe_returning(720),
            extractor,
            MockRenditionEncoder::new(),
            repo.clone(),
            hub,
        );

        let dir = tempdir().unwrap();
        let source = write_source(dir.path()).await;
        let out_dir = dir.path().join("out");

        let result = service.start_pipeline("user-1", &source, &out_dir).await;

        assert!(matches!(
            result,
            Err(ServiceError::Media(MediaError::NoThumbnails))
        ));
        assert!(repo.list_by_author("user-1").await.unwrap().is_empty());
        assert!(source.exists());
    }

    #[tokio::test]
    async fn unusable_source_aborts_before_extraction() {
        let repo = InMemoryVideoRepository::new();
        let hub = Arc::new(EventHub::new());

        let mut probe = MockMediaProbe::new();
        probe
            .expect_probe()
            .returning(|_| Err(MediaError::NoVideoStream));

        let service = TranscodeService::new(
            probe,
            MockThumbnailExtractor::new(),
            MockRenditionEncoder::new(),
            repo.clone(),
            hub,
        );

        let dir = tempdir().unwrap();
        let source = write_source(dir.path()).await;

        let result = service
            .start_pipeline("user-1", &source, &dir.path().join("out"))
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::Media(MediaError::NoVideoStream))
        ));
        assert!(repo.list_by_author("user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn owner_receives_progress_and_one_end_event_per_rendition() {
        let repo = InMemoryVideoRepository::new();
        let hub = Arc::new(EventHub::new());
        let (_, mut events) = hub.register("user-1").await;

        let service = TranscodeService::new(
            probe_returning(720),
            extractor_with_previews(),
            encoder_succeeding(),
            repo.clone(),
            hub.clone(),
        );

        let dir = tempdir().unwrap();
        let source = write_source(dir.path()).await;
        let out_dir = dir.path().join("out");

        let video = service
            .start_pipeline("user-1", &source, &out_dir)
            .await
            .unwrap();

        let mut ends = 0;
        let mut progresses = 0;
        tokio::time::timeout(Duration::from_secs(2), async {
            while ends < 3 {
                match events.recv().await {
                    Some(Event::VideoEnd { video_id, .. }) => {
                        assert_eq!(video_id, video.id);
                        ends += 1;
                    }
                    Some(Event::VideoProgress { video_id, progress, .. }) => {
                        assert_eq!(video_id, video.id);
                        assert!((progress.percent - 50.0).abs() < 0.01);
                        progresses += 1;
                    }
                    _ => {}
                }
            }
        })
        .await
        .expect("expected one videoEnd per rendition");

        assert_eq!(ends, 3);
        assert_eq!(progresses, 3);
    }

    #[tokio::test]
    async fn source_file_is_removed_once_all_jobs_settle() {
        let repo = InMemoryVideoRepository::new();
        let hub = Arc::new(EventHub::new());
        let service = TranscodeService::new(
            probe_returning(360),
            extractor_with_previews(),
            encoder_succeeding(),
            repo.clone(),
            hub,
        );

        let dir = tempdir().unwrap();
        let source = write_source(dir.path()).await;
        let out_dir = dir.path().join("out");

        let video = service
            .start_pipeline("user-1", &source, &out_dir)
            .await
            .unwrap();
        wait_for_available(&repo, &video.id, 1).await;

        for _ in 0..300 {
            if !source.exists() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("source file was not cleaned up");
    }
}
