//! Rebuilds the seek index of browser recordings.
//!
//! Recordings made by `MediaRecorder` ship without cues, so players cannot
//! seek in them. Each tick picks up to [`CUE_REPAIR_BATCH_SIZE`] of the
//! newest unrepaired ones and remuxes them in place, one at a time.

use std::sync::Arc;

use screenreel_core::video::MIME_WEBM;
use screenreel_db::models::video::Video;
use screenreel_storage::ObjectStore;

use crate::error::PipelineError;
use crate::media::MediaToolkit;
use crate::schedule::{BatchJob, BatchReport};
use crate::store::VideoStore;

/// Videos repaired per tick.
pub const CUE_REPAIR_BATCH_SIZE: i64 = 5;

pub struct CueRepairWorker {
    videos: Arc<dyn VideoStore>,
    objects: Arc<dyn ObjectStore>,
    tools: Arc<dyn MediaToolkit>,
}

impl CueRepairWorker {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        objects: Arc<dyn ObjectStore>,
        tools: Arc<dyn MediaToolkit>,
    ) -> Self {
        Self {
            videos,
            objects,
            tools,
        }
    }

    /// Download, remux, upload over the same key and flag the row.
    pub async fn repair(&self, video: &Video) -> Result<(), PipelineError> {
        let scratch = tempfile::Builder::new().prefix("cues-").tempdir()?;
        let input = scratch.path().join("source.webm");
        let output = scratch.path().join("repaired.webm");

        self.objects
            .download_to_file(&video.file_key, &input)
            .await?;
        self.tools.remux_with_cues(&input, &output).await?;
        self.objects
            .upload_file(&video.file_key, &output, MIME_WEBM)
            .await?;
        self.videos.mark_cues_fixed(video.id).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl BatchJob for CueRepairWorker {
    fn name(&self) -> &'static str {
        "cue_repair"
    }

    async fn run_batch(&self) -> BatchReport {
        let candidates = match self.videos.cue_repair_candidates(CUE_REPAIR_BATCH_SIZE).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!(error = %e, "Cue repair: candidate query failed");
                return BatchReport::default();
            }
        };

        let mut report = BatchReport::default();
        for video in candidates.iter().take(CUE_REPAIR_BATCH_SIZE as usize) {
            report.selected += 1;
            match self.repair(video).await {
                Ok(()) => {
                    report.succeeded += 1;
                    tracing::info!(video_id = video.id, key = %video.file_key, "Cues repaired");
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        video_id = video.id,
                        error = %e,
                        "Cue repair failed, will retry next tick"
                    );
                }
            }
        }
        report
    }
}
