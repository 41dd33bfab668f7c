//! Video lifecycle service.
//!
//! Every status change is a guarded update that names the status it expects;
//! the loser of a race gets [`PipelineError::StaleTransition`] and nothing
//! else happens. Work that follows a transition (job fan-out, the storage
//! cascade, transcription) never rolls the transition back.

use std::sync::Arc;
use std::time::Duration;

use screenreel_core::dispatch::{audio_filter_for, plan_upload, JobKind, PlannedJob, UploadFacts};
use screenreel_core::error::CoreError;
use screenreel_core::status::{TranscriptStatus, VideoStatus};
use screenreel_core::types::DbId;
use screenreel_core::upload::{verify_upload, DeclaredUpload, UploadRejection};
use screenreel_core::video::{validate_upload_size, VideoFormat, DEFAULT_MAX_UPLOAD_BYTES};
use screenreel_db::models::video::{DeletedVideoKeys, Video};
use screenreel_storage::retry::DEFAULT_DELETE_ATTEMPTS;
use screenreel_storage::ObjectStore;
use serde_json::json;

use crate::cleanup::purge_video_objects;
use crate::enqueue::{enqueue_all, JobEnqueuer};
use crate::error::PipelineError;
use crate::runner::TaskRunner;
use crate::store::VideoStore;
use crate::transcription::TranscriptionPipeline;

/// Tunables for [`VideoLifecycle`].
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    pub max_upload_bytes: i64,
    pub upload_url_ttl: Duration,
    pub playback_url_ttl: Duration,
    /// Attempts per object in the delete cascade.
    pub delete_max_attempts: u32,
    /// Deadline for the whole delete cascade.
    pub delete_timeout: Duration,
    /// Deadline for one transcription run, including the wait for a permit.
    pub transcription_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            upload_url_ttl: Duration::from_secs(15 * 60),
            playback_url_ttl: Duration::from_secs(60 * 60),
            delete_max_attempts: DEFAULT_DELETE_ATTEMPTS,
            delete_timeout: Duration::from_secs(5 * 60),
            transcription_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Result of a successful upload confirmation.
#[derive(Debug, Clone)]
pub struct ConfirmedUpload {
    pub video: Video,
    /// Planned jobs in dispatch order.
    pub jobs: Vec<JobKind>,
    /// How many of them the queue accepted.
    pub queued: usize,
}

pub struct VideoLifecycle {
    videos: Arc<dyn VideoStore>,
    objects: Arc<dyn ObjectStore>,
    jobs: Arc<dyn JobEnqueuer>,
    runner: TaskRunner,
    transcription: Option<Arc<TranscriptionPipeline>>,
    config: LifecycleConfig,
}

impl VideoLifecycle {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        objects: Arc<dyn ObjectStore>,
        jobs: Arc<dyn JobEnqueuer>,
        runner: TaskRunner,
        config: LifecycleConfig,
    ) -> Self {
        Self {
            videos,
            objects,
            jobs,
            runner,
            transcription: None,
            config,
        }
    }

    /// Run transcriptions in-process when they are requested or retried.
    pub fn with_transcription(mut self, pipeline: Arc<TranscriptionPipeline>) -> Self {
        self.transcription = Some(pipeline);
        self
    }

    async fn load(&self, id: DbId) -> Result<Video, PipelineError> {
        self.videos
            .find(id)
            .await?
            .ok_or(PipelineError::VideoNotFound(id))
    }

    async fn guarded_transition(
        &self,
        id: DbId,
        from: VideoStatus,
        to: VideoStatus,
    ) -> Result<(), PipelineError> {
        if !from.can_transition_to(to) {
            return Err(
                CoreError::Conflict(format!("Cannot move a video from {from} to {to}")).into(),
            );
        }
        if self.videos.transition(id, from, to).await? {
            Ok(())
        } else {
            Err(PipelineError::StaleTransition { id, expected: from })
        }
    }

    /// Presigned PUT URL for a video that is still `uploading`.
    ///
    /// The declared content type must be on the whitelist and the declared
    /// size must be positive and within the limit.
    pub async fn issue_upload_url(&self, id: DbId) -> Result<String, PipelineError> {
        let video = self.load(id).await?;
        if video.status != VideoStatus::Uploading {
            return Err(PipelineError::StaleTransition {
                id,
                expected: VideoStatus::Uploading,
            });
        }

        VideoFormat::parse(&video.content_type)?;
        let size = video
            .file_size
            .ok_or_else(|| CoreError::Validation("Upload size must be declared".into()))?;
        validate_upload_size(size, self.config.max_upload_bytes)?;

        let url = self
            .objects
            .generate_upload_url(
                &video.file_key,
                &video.content_type,
                size,
                self.config.upload_url_ttl,
            )
            .await?;
        tracing::debug!(video_id = id, size, "Issued upload URL");
        Ok(url)
    }

    /// Verify the stored object, move the video out of `uploading` and
    /// enqueue its processing jobs.
    ///
    /// Verification failures are returned as
    /// [`PipelineError::UploadRejected`] with no state change. Concurrent
    /// calls for the same video race on one guarded update; all but one
    /// get [`PipelineError::StaleTransition`].
    pub async fn confirm_upload(&self, id: DbId) -> Result<ConfirmedUpload, PipelineError> {
        let video = self.load(id).await?;
        if video.status != VideoStatus::Uploading {
            return Err(PipelineError::StaleTransition {
                id,
                expected: VideoStatus::Uploading,
            });
        }

        let head = match self.objects.head_object(&video.file_key).await {
            Ok(head) => head,
            Err(e) => {
                tracing::warn!(
                    video_id = id,
                    key = %video.file_key,
                    error = %e,
                    "Uploaded object not readable"
                );
                return Err(UploadRejection::ObjectMissing.into());
            }
        };
        let declared = DeclaredUpload {
            content_type: &video.content_type,
            file_size: video.file_size,
            max_bytes: self.config.max_upload_bytes,
        };
        verify_upload(&declared, head.size, head.content_type.as_deref())?;

        let format = VideoFormat::from_content_type(&video.content_type)
            .ok_or_else(|| UploadRejection::UnsupportedContentType(video.content_type.clone()))?;
        let settings = self.videos.account_settings(video.owner_id).await?;
        let plan = plan_upload(&UploadFacts {
            format,
            file_key: &video.file_key,
            thumbnail_key: video.thumbnail_key.as_deref(),
            webcam_key: video.webcam_key.as_deref(),
            duration_known: video.duration.is_some(),
            audio_filter: audio_filter_for(settings.noise_reduction),
        });

        let Some(updated) = self
            .videos
            .confirm_upload(id, plan.target_status, plan.noise_reduced)
            .await?
        else {
            return Err(PipelineError::StaleTransition {
                id,
                expected: VideoStatus::Uploading,
            });
        };

        let queued = enqueue_all(self.jobs.as_ref(), id, &plan.jobs).await;
        tracing::info!(
            video_id = id,
            status = %updated.status,
            jobs = plan.jobs.len(),
            queued,
            noise_reduced = plan.noise_reduced,
            "Upload confirmed"
        );

        Ok(ConfirmedUpload {
            video: updated,
            jobs: plan.kinds(),
            queued,
        })
    }

    /// Soft-delete the video and schedule removal of its stored objects.
    ///
    /// Returns the keys handed to the cleanup task. A video that is missing
    /// or already deleted yields [`PipelineError::VideoNotFound`].
    pub async fn request_delete(&self, id: DbId) -> Result<DeletedVideoKeys, PipelineError> {
        let keys = self
            .videos
            .soft_delete(id)
            .await?
            .ok_or(PipelineError::VideoNotFound(id))?;
        tracing::info!(video_id = id, file_key = %keys.file_key, "Video deleted");

        let videos = Arc::clone(&self.videos);
        let objects = Arc::clone(&self.objects);
        let max_attempts = self.config.delete_max_attempts;
        let task_keys = keys.clone();
        self.runner.spawn_with_timeout(
            "storage_cleanup",
            self.config.delete_timeout,
            move |cancel| async move {
                purge_video_objects(
                    videos.as_ref(),
                    objects.as_ref(),
                    &task_keys,
                    max_attempts,
                    &cancel,
                )
                .await;
            },
        );

        Ok(keys)
    }

    /// Presigned GET URL for a ready video.
    pub async fn playback_url(&self, id: DbId) -> Result<String, PipelineError> {
        let video = self.load(id).await?;
        if !video.status.is_playable() {
            return Err(PipelineError::StaleTransition {
                id,
                expected: VideoStatus::Ready,
            });
        }
        Ok(self
            .objects
            .generate_download_url(&video.file_key, self.config.playback_url_ttl)
            .await?)
    }

    /// Send a ready video back to `processing` and enqueue a trim of
    /// `[start_secs, end_secs)`.
    pub async fn begin_trim(
        &self,
        id: DbId,
        start_secs: f64,
        end_secs: f64,
    ) -> Result<(), PipelineError> {
        let valid = start_secs.is_finite() && end_secs.is_finite();
        if !valid || start_secs < 0.0 || end_secs <= start_secs {
            return Err(CoreError::Validation(format!(
                "Invalid trim range {start_secs}..{end_secs}"
            ))
            .into());
        }

        let video = self.load(id).await?;
        if let Some(duration) = video.duration {
            if end_secs > f64::from(duration) {
                return Err(CoreError::Validation(format!(
                    "Trim end {end_secs} is past the video duration of {duration}s"
                ))
                .into());
            }
        }

        self.guarded_transition(id, VideoStatus::Ready, VideoStatus::Processing)
            .await?;

        let job = PlannedJob {
            kind: JobKind::Trim,
            payload: json!({
                "file_key": video.file_key,
                "start": start_secs,
                "end": end_secs,
            }),
        };
        enqueue_all(self.jobs.as_ref(), id, std::slice::from_ref(&job)).await;
        tracing::info!(video_id = id, start_secs, end_secs, "Trim requested");
        Ok(())
    }

    /// `processing` -> `ready`, reported by the job that produced the
    /// playable asset (composite or trim).
    pub async fn complete_processing(&self, id: DbId) -> Result<(), PipelineError> {
        self.guarded_transition(id, VideoStatus::Processing, VideoStatus::Ready)
            .await?;
        tracing::info!(video_id = id, "Processing complete");
        Ok(())
    }

    /// Reset a failed transcript to `pending` and start it again.
    ///
    /// `ready` and `no_audio` transcripts are final and are refused.
    pub async fn retry_transcription(&self, id: DbId) -> Result<(), PipelineError> {
        let reset = self
            .videos
            .set_transcript_status(id, &TranscriptStatus::RETRIABLE, TranscriptStatus::Pending)
            .await?;
        if !reset {
            self.load(id).await?;
            return Err(PipelineError::StaleTranscript {
                id,
                expected: TranscriptStatus::Failed,
            });
        }

        tracing::info!(video_id = id, "Transcription retry requested");
        self.submit_transcription(id);
        Ok(())
    }

    /// Hand a transcription run to the task runner.
    ///
    /// Returns `false` when no pipeline is attached or the runner is
    /// shutting down; the transcript then stays `pending`.
    pub fn submit_transcription(&self, id: DbId) -> bool {
        let Some(pipeline) = self.transcription.clone() else {
            tracing::debug!(video_id = id, "No in-process transcription pipeline");
            return false;
        };
        self.runner.spawn_with_timeout(
            "transcription",
            self.config.transcription_timeout,
            move |cancel| async move {
                if let Err(e) = pipeline.run(id, &cancel).await {
                    tracing::error!(video_id = id, error = %e, "Transcription bookkeeping failed");
                }
            },
        )
    }
}
