//! Decides which background jobs a confirmed upload needs.
//!
//! Planning is pure: it looks only at what is known about the video and
//! returns the target status plus the job list. Enqueueing happens in the
//! pipeline crate after the guarded status update succeeds.

use serde_json::{json, Value};

use crate::status::VideoStatus;
use crate::video::VideoFormat;

/// ffmpeg audio filter applied when the owner enabled noise reduction.
pub const NOISE_REDUCTION_FILTER: &str = "afftdn=nf=-25";

/// Kinds of jobs handed to the external job queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Thumbnail,
    Transcribe,
    Probe,
    Transcode,
    Normalize,
    Composite,
    Trim,
}

impl JobKind {
    /// Job type string as stored in the `jobs` table.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::Transcribe => "transcribe",
            Self::Probe => "probe",
            Self::Transcode => "transcode",
            Self::Normalize => "normalize",
            Self::Composite => "composite",
            Self::Trim => "trim",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job to enqueue, with its free-form payload.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedJob {
    pub kind: JobKind,
    pub payload: Value,
}

impl PlannedJob {
    fn new(kind: JobKind, payload: Value) -> Self {
        Self { kind, payload }
    }
}

/// Everything the planner needs to know about a freshly uploaded video.
#[derive(Debug, Clone)]
pub struct UploadFacts<'a> {
    pub format: VideoFormat,
    pub file_key: &'a str,
    pub thumbnail_key: Option<&'a str>,
    pub webcam_key: Option<&'a str>,
    /// Duration was reported by the client at creation time.
    pub duration_known: bool,
    /// Audio filter from the owner's preferences, if any.
    pub audio_filter: Option<&'a str>,
}

/// Result of planning an upload confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchPlan {
    pub target_status: VideoStatus,
    pub jobs: Vec<PlannedJob>,
    /// An audio filter was threaded into a transcode or normalize job.
    pub noise_reduced: bool,
}

impl DispatchPlan {
    /// Job kinds in dispatch order.
    pub fn kinds(&self) -> Vec<JobKind> {
        self.jobs.iter().map(|j| j.kind).collect()
    }
}

/// Plan the status transition and job fan-out for a confirmed upload.
///
/// With a webcam track the video stays in `processing` and only the
/// composite job is queued; it produces the final playable asset itself.
/// Otherwise the video becomes `ready` and gets a thumbnail and a
/// transcription job, a probe when the duration is unknown, and either a
/// transcode (native recordings) or a normalize (external uploads).
pub fn plan_upload(facts: &UploadFacts<'_>) -> DispatchPlan {
    if let Some(webcam_key) = facts.webcam_key {
        return DispatchPlan {
            target_status: VideoStatus::Processing,
            jobs: vec![PlannedJob::new(
                JobKind::Composite,
                json!({
                    "screen_key": facts.file_key,
                    "webcam_key": webcam_key,
                    "thumbnail_key": facts.thumbnail_key,
                }),
            )],
            noise_reduced: false,
        };
    }

    let mut jobs = vec![
        PlannedJob::new(
            JobKind::Thumbnail,
            json!({
                "file_key": facts.file_key,
                "thumbnail_key": facts.thumbnail_key,
            }),
        ),
        PlannedJob::new(JobKind::Transcribe, json!({ "file_key": facts.file_key })),
    ];

    if !facts.duration_known {
        jobs.push(PlannedJob::new(
            JobKind::Probe,
            json!({ "file_key": facts.file_key }),
        ));
    }

    let reencode_kind = if facts.format.is_native_recording() {
        JobKind::Transcode
    } else {
        JobKind::Normalize
    };
    let mut payload = json!({
        "file_key": facts.file_key,
        "content_type": facts.format.mime(),
    });
    if let Some(filter) = facts.audio_filter {
        payload["audio_filter"] = Value::String(filter.to_string());
    }
    jobs.push(PlannedJob::new(reencode_kind, payload));

    DispatchPlan {
        target_status: VideoStatus::Ready,
        jobs,
        noise_reduced: facts.audio_filter.is_some(),
    }
}

/// Audio filter for an owner's noise-reduction preference.
pub fn audio_filter_for(noise_reduction: bool) -> Option<&'static str> {
    noise_reduction.then_some(NOISE_REDUCTION_FILTER)
}
