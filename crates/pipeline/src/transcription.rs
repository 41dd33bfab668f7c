//! Speech-to-text for a single video.
//!
//! Transcript status moves `none | pending -> processing -> ready | failed |
//! no_audio`. Runs are serialized by a semaphore supplied at construction;
//! the recogniser is CPU-heavy and must not compete with itself.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use screenreel_core::status::{TranscriptStatus, VideoStatus};
use screenreel_core::transcript::{parse_segments, render_vtt};
use screenreel_core::types::DbId;
use screenreel_core::video::VideoFormat;
use screenreel_core::whisper::{WhisperRequest, AUTO_LANGUAGE};
use screenreel_db::models::video::{TranscriptResult, Video};
use screenreel_storage::retry::DEFAULT_DELETE_ATTEMPTS;
use screenreel_storage::{delete_with_retry, keys, ObjectStore};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::media::MediaToolkit;
use crate::store::VideoStore;

/// Content type of uploaded transcripts.
pub const MIME_VTT: &str = "text/vtt";

const DEFAULT_WHISPER_BINARY: &str = "whisper-cli";
const DEFAULT_MODEL_PATH: &str = "models/ggml-base.en.bin";
const DEFAULT_THREADS: u16 = 4;

/// Recogniser settings.
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    pub enabled: bool,
    /// Executable name (looked up on `PATH`) or path.
    pub binary: PathBuf,
    pub model_path: PathBuf,
    pub threads: u16,
    /// Spoken language, or `None` to let the recogniser detect it.
    pub language: Option<String>,
    /// Number of runs allowed at once across the process.
    pub concurrency: usize,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            binary: PathBuf::from(DEFAULT_WHISPER_BINARY),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            threads: DEFAULT_THREADS,
            language: None,
            concurrency: 1,
        }
    }
}

impl TranscriptionConfig {
    /// Load from environment variables.
    ///
    /// | Variable                    | Default                   |
    /// |-----------------------------|---------------------------|
    /// | `TRANSCRIPTION_ENABLED`     | `false`                   |
    /// | `WHISPER_BINARY`            | `whisper-cli`             |
    /// | `WHISPER_MODEL_PATH`        | `models/ggml-base.en.bin` |
    /// | `WHISPER_THREADS`           | `4`                       |
    /// | `WHISPER_LANGUAGE`          | `auto`                    |
    /// | `TRANSCRIPTION_CONCURRENCY` | `1`                       |
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let enabled = std::env::var("TRANSCRIPTION_ENABLED")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.enabled);

        let language = std::env::var("WHISPER_LANGUAGE")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty() && v != AUTO_LANGUAGE);

        Self {
            enabled,
            binary: std::env::var("WHISPER_BINARY")
                .map(PathBuf::from)
                .unwrap_or(defaults.binary),
            model_path: std::env::var("WHISPER_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            threads: std::env::var("WHISPER_THREADS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&t| t > 0)
                .unwrap_or(defaults.threads),
            language,
            concurrency: std::env::var("TRANSCRIPTION_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&c| c > 0)
                .unwrap_or(defaults.concurrency),
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionOutcome {
    Ready {
        transcript_key: String,
        segments: usize,
    },
    /// The source has no audio stream. Terminal, not a failure.
    NoAudio,
    Failed {
        reason: String,
    },
    /// The transcript was not startable, or the video went away mid-run.
    Skipped,
    /// Cancelled while waiting for a permit. Nothing was changed.
    Cancelled,
}

/// Output of the file-handling part of a run.
enum Recognized {
    NoAudio,
    Transcript {
        key: String,
        segments: serde_json::Value,
        count: usize,
    },
}

pub struct TranscriptionPipeline {
    videos: Arc<dyn VideoStore>,
    objects: Arc<dyn ObjectStore>,
    tools: Arc<dyn MediaToolkit>,
    config: TranscriptionConfig,
    permits: Arc<Semaphore>,
}

impl TranscriptionPipeline {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        objects: Arc<dyn ObjectStore>,
        tools: Arc<dyn MediaToolkit>,
        config: TranscriptionConfig,
        permits: Arc<Semaphore>,
    ) -> Self {
        Self {
            videos,
            objects,
            tools,
            config,
            permits,
        }
    }

    /// Transcribe one video.
    ///
    /// Step failures end in `failed` and are reported through the outcome;
    /// `Err` is returned only when the status bookkeeping itself fails.
    pub async fn run(
        &self,
        video_id: DbId,
        cancel: &CancellationToken,
    ) -> Result<TranscriptionOutcome, PipelineError> {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(video_id, "Transcription cancelled while waiting for a permit");
                return Ok(TranscriptionOutcome::Cancelled);
            }
            permit = Arc::clone(&self.permits).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return Ok(TranscriptionOutcome::Cancelled),
            },
        };

        let video = self
            .videos
            .find(video_id)
            .await?
            .ok_or(PipelineError::VideoNotFound(video_id))?;
        if video.status == VideoStatus::Deleted || video.transcript_status.is_terminal() {
            tracing::debug!(
                video_id,
                status = %video.transcript_status,
                "Transcript already settled, skipping"
            );
            return Ok(TranscriptionOutcome::Skipped);
        }

        let binary = match self.feasibility().await {
            Ok(binary) => binary,
            Err(reason) => {
                tracing::warn!(video_id, %reason, "Transcription unavailable");
                self.videos
                    .set_transcript_status(
                        video_id,
                        &TranscriptStatus::STARTABLE,
                        TranscriptStatus::Failed,
                    )
                    .await?;
                return Ok(TranscriptionOutcome::Failed { reason });
            }
        };

        let started = self
            .videos
            .set_transcript_status(
                video_id,
                &TranscriptStatus::STARTABLE,
                TranscriptStatus::Processing,
            )
            .await?;
        if !started {
            tracing::debug!(
                video_id,
                status = %video.transcript_status,
                "Transcript not startable, skipping"
            );
            return Ok(TranscriptionOutcome::Skipped);
        }
        tracing::info!(video_id, "Transcription started");

        match self.recognize(&video, &binary).await {
            Ok(Recognized::NoAudio) => {
                self.videos
                    .set_transcript_status(
                        video_id,
                        &[TranscriptStatus::Processing],
                        TranscriptStatus::NoAudio,
                    )
                    .await?;
                tracing::info!(video_id, "No audio stream, nothing to transcribe");
                Ok(TranscriptionOutcome::NoAudio)
            }
            Ok(Recognized::Transcript {
                key,
                segments,
                count,
            }) => self.persist(&video, key, &segments, count, cancel).await,
            Err(e) => self.fail(video_id, e.to_string()).await,
        }
    }

    /// Returns the resolved recogniser path, or why a run cannot happen.
    async fn feasibility(&self) -> Result<PathBuf, String> {
        if !self.config.enabled {
            return Err("transcription is disabled".to_string());
        }
        let binary = self
            .tools
            .locate_binary(&self.config.binary)
            .ok_or_else(|| format!("{} not found on PATH", self.config.binary.display()))?;
        match tokio::fs::try_exists(&self.config.model_path).await {
            Ok(true) => Ok(binary),
            _ => Err(format!(
                "model {} does not exist",
                self.config.model_path.display()
            )),
        }
    }

    /// Download, probe, extract, recognise and upload. Scratch files live
    /// in a temporary directory removed when this returns.
    async fn recognize(&self, video: &Video, binary: &Path) -> Result<Recognized, PipelineError> {
        let scratch = tempfile::Builder::new().prefix("transcribe-").tempdir()?;
        let extension = VideoFormat::from_content_type(&video.content_type)
            .map(VideoFormat::extension)
            .unwrap_or("bin");

        let source = scratch.path().join(format!("source.{extension}"));
        self.objects
            .download_to_file(&video.file_key, &source)
            .await?;

        if !self.tools.has_audio(&source).await? {
            return Ok(Recognized::NoAudio);
        }

        let audio = scratch.path().join("audio.wav");
        self.tools.extract_audio(&source, &audio).await?;

        let prefix = scratch.path().join("transcript");
        let request = WhisperRequest {
            binary,
            model_path: &self.config.model_path,
            audio_path: &audio,
            output_prefix: &prefix,
            threads: self.config.threads,
            language: self.config.language.as_deref(),
        };
        let outputs = self.tools.recognize(&request).await?;

        let json = tokio::fs::read_to_string(&outputs.json_path).await?;
        let segments = parse_segments(&json)?;

        if !tokio::fs::try_exists(&outputs.vtt_path).await? {
            tracing::debug!(video_id = video.id, "No subtitle output, rendering from segments");
            tokio::fs::write(&outputs.vtt_path, render_vtt(&segments)).await?;
        }

        let key = keys::transcript_key(video.owner_id, &video.share_token);
        self.objects
            .upload_file(&key, &outputs.vtt_path, MIME_VTT)
            .await?;

        Ok(Recognized::Transcript {
            key,
            count: segments.len(),
            segments: serde_json::to_value(&segments)?,
        })
    }

    /// Record an uploaded transcript. Anything that prevents recording it
    /// removes the upload again.
    async fn persist(
        &self,
        video: &Video,
        key: String,
        segments: &serde_json::Value,
        count: usize,
        cancel: &CancellationToken,
    ) -> Result<TranscriptionOutcome, PipelineError> {
        let settings = match self.videos.account_settings(video.owner_id).await {
            Ok(settings) => settings,
            Err(e) => {
                self.discard_upload(video.id, &key, cancel).await;
                return self.fail(video.id, e.to_string()).await;
            }
        };
        let result = TranscriptResult {
            transcript_key: &key,
            segments,
            request_summary: settings.ai_summary_enabled,
        };

        match self.videos.complete_transcript(video.id, &result).await {
            Ok(true) => {
                tracing::info!(
                    video_id = video.id,
                    segments = count,
                    summary_requested = settings.ai_summary_enabled,
                    "Transcript ready"
                );
                Ok(TranscriptionOutcome::Ready {
                    transcript_key: key,
                    segments: count,
                })
            }
            Ok(false) => {
                tracing::warn!(
                    video_id = video.id,
                    "Video deleted or transcript moved mid-run, discarding"
                );
                self.discard_upload(video.id, &key, cancel).await;
                Ok(TranscriptionOutcome::Skipped)
            }
            Err(e) => {
                self.discard_upload(video.id, &key, cancel).await;
                self.fail(video.id, e.to_string()).await
            }
        }
    }

    async fn discard_upload(&self, video_id: DbId, key: &str, cancel: &CancellationToken) {
        let deleted =
            delete_with_retry(self.objects.as_ref(), key, DEFAULT_DELETE_ATTEMPTS, cancel).await;
        if let Err(e) = deleted {
            tracing::warn!(video_id, key, error = %e, "Failed to remove unrecorded transcript");
        }
    }

    async fn fail(
        &self,
        video_id: DbId,
        reason: String,
    ) -> Result<TranscriptionOutcome, PipelineError> {
        tracing::error!(video_id, error = %reason, "Transcription failed");
        self.videos
            .set_transcript_status(
                video_id,
                &[TranscriptStatus::Processing],
                TranscriptStatus::Failed,
            )
            .await?;
        Ok(TranscriptionOutcome::Failed { reason })
    }
}
