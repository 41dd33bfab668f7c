//! In-memory stand-ins for the store, storage, queue, tool and mail seams.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use screenreel_core::dispatch::PlannedJob;
use screenreel_core::process::ToolError;
use screenreel_core::status::{SummaryStatus, TranscriptStatus, VideoStatus};
use screenreel_core::types::DbId;
use screenreel_core::video::{normalize_content_type, MIME_WEBM};
use screenreel_core::whisper::{WhisperOutputs, WhisperRequest};
use screenreel_db::models::user::{AccountSettings, EmailCandidate};
use screenreel_db::models::video::{DeletedVideoKeys, TranscriptResult, Video};
use screenreel_events::{EmailError, LifecycleNudge, Mailer, OutgoingEmail};
use screenreel_storage::{ObjectHead, ObjectStore, StorageError};
use tokio::sync::{mpsc, Notify, Semaphore};

use crate::enqueue::JobEnqueuer;
use crate::media::MediaToolkit;
use crate::schedule::Ticker;
use crate::store::{UserStore, VideoStore};

/// A video row with sensible defaults. `created_at` grows with `id`.
pub fn video(id: DbId, status: VideoStatus, content_type: &str) -> Video {
    let created_at = Utc
        .timestamp_opt(1_760_000_000 + id, 0)
        .single()
        .unwrap();
    Video {
        id,
        owner_id: 7,
        share_token: format!("tok{id}"),
        title: format!("Recording {id}"),
        status,
        content_type: content_type.to_string(),
        file_key: format!("7/tok{id}/recording.webm"),
        thumbnail_key: Some(format!("7/tok{id}/thumbnail.jpg")),
        webcam_key: None,
        transcript_key: None,
        transcript_status: TranscriptStatus::None,
        transcript_segments: None,
        summary_status: SummaryStatus::None,
        cues_fixed: false,
        noise_reduced: false,
        duration: None,
        file_size: None,
        view_count: 0,
        file_purged_at: None,
        created_at,
        updated_at: created_at,
    }
}

// ---------------------------------------------------------------------------
// VideoStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeVideoStore {
    videos: Mutex<HashMap<DbId, Video>>,
    settings: Mutex<HashMap<DbId, AccountSettings>>,
    settings_unavailable: AtomicBool,
    pub purge_marks: AtomicUsize,
}

impl FakeVideoStore {
    pub fn with(videos: impl IntoIterator<Item = Video>) -> Self {
        let store = Self::default();
        for v in videos {
            store.insert(v);
        }
        store
    }

    pub fn insert(&self, video: Video) {
        self.videos.lock().unwrap().insert(video.id, video);
    }

    pub fn set_settings(&self, owner_id: DbId, settings: AccountSettings) {
        self.settings.lock().unwrap().insert(owner_id, settings);
    }

    /// Make every `account_settings` call fail.
    pub fn fail_settings_lookups(&self) {
        self.settings_unavailable.store(true, Ordering::SeqCst);
    }

    pub fn get(&self, id: DbId) -> Video {
        self.videos.lock().unwrap()[&id].clone()
    }
}

#[async_trait::async_trait]
impl VideoStore for FakeVideoStore {
    async fn find(&self, id: DbId) -> Result<Option<Video>, sqlx::Error> {
        Ok(self.videos.lock().unwrap().get(&id).cloned())
    }

    async fn confirm_upload(
        &self,
        id: DbId,
        target: VideoStatus,
        noise_reduced: bool,
    ) -> Result<Option<Video>, sqlx::Error> {
        let mut videos = self.videos.lock().unwrap();
        Ok(match videos.get_mut(&id) {
            Some(v) if v.status == VideoStatus::Uploading => {
                v.status = target;
                v.noise_reduced = noise_reduced;
                Some(v.clone())
            }
            _ => None,
        })
    }

    async fn transition(
        &self,
        id: DbId,
        from: VideoStatus,
        to: VideoStatus,
    ) -> Result<bool, sqlx::Error> {
        let mut videos = self.videos.lock().unwrap();
        Ok(match videos.get_mut(&id) {
            Some(v) if v.status == from => {
                v.status = to;
                true
            }
            _ => false,
        })
    }

    async fn soft_delete(&self, id: DbId) -> Result<Option<DeletedVideoKeys>, sqlx::Error> {
        let mut videos = self.videos.lock().unwrap();
        Ok(match videos.get_mut(&id) {
            Some(v) if v.status != VideoStatus::Deleted => {
                v.status = VideoStatus::Deleted;
                Some(DeletedVideoKeys {
                    file_key: v.file_key.clone(),
                    thumbnail_key: v.thumbnail_key.clone(),
                    webcam_key: v.webcam_key.clone(),
                    transcript_key: v.transcript_key.clone(),
                })
            }
            _ => None,
        })
    }

    async fn mark_file_purged(&self, file_key: &str) -> Result<bool, sqlx::Error> {
        self.purge_marks.fetch_add(1, Ordering::SeqCst);
        let mut videos = self.videos.lock().unwrap();
        Ok(match videos
            .values_mut()
            .find(|v| v.file_key == file_key && v.file_purged_at.is_none())
        {
            Some(v) => {
                v.file_purged_at = Some(Utc::now());
                true
            }
            None => false,
        })
    }

    async fn set_transcript_status(
        &self,
        id: DbId,
        from: &[TranscriptStatus],
        to: TranscriptStatus,
    ) -> Result<bool, sqlx::Error> {
        let mut videos = self.videos.lock().unwrap();
        Ok(match videos.get_mut(&id) {
            Some(v) if v.status != VideoStatus::Deleted && from.contains(&v.transcript_status) => {
                v.transcript_status = to;
                true
            }
            _ => false,
        })
    }

    async fn complete_transcript(
        &self,
        id: DbId,
        result: &TranscriptResult<'_>,
    ) -> Result<bool, sqlx::Error> {
        let mut videos = self.videos.lock().unwrap();
        Ok(match videos.get_mut(&id) {
            Some(v)
                if v.status != VideoStatus::Deleted
                    && v.transcript_status == TranscriptStatus::Processing =>
            {
                v.transcript_status = TranscriptStatus::Ready;
                v.transcript_key = Some(result.transcript_key.to_string());
                v.transcript_segments = Some(result.segments.clone());
                if result.request_summary {
                    v.summary_status = SummaryStatus::Pending;
                }
                true
            }
            _ => false,
        })
    }

    async fn cue_repair_candidates(&self, limit: i64) -> Result<Vec<Video>, sqlx::Error> {
        let videos = self.videos.lock().unwrap();
        let mut candidates: Vec<Video> = videos
            .values()
            .filter(|v| normalize_content_type(&v.content_type) == MIME_WEBM)
            .filter(|v| v.status == VideoStatus::Ready && !v.cues_fixed)
            .cloned()
            .collect();
        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        candidates.truncate(limit as usize);
        Ok(candidates)
    }

    async fn mark_cues_fixed(&self, id: DbId) -> Result<bool, sqlx::Error> {
        let mut videos = self.videos.lock().unwrap();
        Ok(match videos.get_mut(&id) {
            Some(v) if !v.cues_fixed => {
                v.cues_fixed = true;
                true
            }
            _ => false,
        })
    }

    async fn account_settings(&self, owner_id: DbId) -> Result<AccountSettings, sqlx::Error> {
        if self.settings_unavailable.load(Ordering::SeqCst) {
            return Err(sqlx::Error::Protocol("users table unavailable".to_string()));
        }
        Ok(self
            .settings
            .lock()
            .unwrap()
            .get(&owner_id)
            .copied()
            .unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// ObjectStore
// ---------------------------------------------------------------------------

struct StoredObject {
    data: Vec<u8>,
    size: i64,
    content_type: Option<String>,
}

#[derive(Default)]
pub struct FakeObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    failing_deletes: Mutex<HashSet<String>>,
    failing_uploads: Mutex<HashSet<String>>,
    pub delete_calls: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<(String, String)>>,
}

impl FakeObjectStore {
    pub fn put(&self, key: &str, data: &[u8], content_type: Option<&str>) {
        self.put_with_size(key, data, data.len() as i64, content_type);
    }

    /// Store `data` but report `size` from `head_object`.
    pub fn put_with_size(&self, key: &str, data: &[u8], size: i64, content_type: Option<&str>) {
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                data: data.to_vec(),
                size,
                content_type: content_type.map(str::to_string),
            },
        );
    }

    pub fn fail_deletes_of(&self, key: &str) {
        self.failing_deletes.lock().unwrap().insert(key.to_string());
    }

    pub fn fail_uploads_of(&self, key: &str) {
        self.failing_uploads.lock().unwrap().insert(key.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn data(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).map(|o| o.data.clone())
    }

    pub fn delete_count(&self, key: &str) -> usize {
        self.delete_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|k| k.as_str() == key)
            .count()
    }
}

#[async_trait::async_trait]
impl ObjectStore for FakeObjectStore {
    async fn download_to_file(&self, key: &str, path: &Path) -> Result<(), StorageError> {
        let data = self
            .data(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    async fn upload_file(
        &self,
        key: &str,
        path: &Path,
        content_type: &str,
    ) -> Result<(), StorageError> {
        if self.failing_uploads.lock().unwrap().contains(key) {
            return Err(StorageError::Service(format!("upload of {key} refused")));
        }
        let data = tokio::fs::read(path).await?;
        self.put(key, &data, Some(content_type));
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string()));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        self.delete_calls.lock().unwrap().push(key.to_string());
        if self.failing_deletes.lock().unwrap().contains(key) {
            return Err(StorageError::Service(format!("delete of {key} refused")));
        }
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn head_object(&self, key: &str) -> Result<ObjectHead, StorageError> {
        let objects = self.objects.lock().unwrap();
        let object = objects
            .get(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(ObjectHead {
            size: object.size,
            content_type: object.content_type.clone(),
        })
    }

    async fn generate_upload_url(
        &self,
        key: &str,
        content_type: &str,
        size: i64,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!(
            "https://upload.test/{key}?type={content_type}&size={size}&ttl={}",
            ttl.as_secs()
        ))
    }

    async fn generate_download_url(
        &self,
        key: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        Ok(format!("https://cdn.test/{key}?ttl={}", ttl.as_secs()))
    }
}

// ---------------------------------------------------------------------------
// JobEnqueuer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingEnqueuer {
    pub jobs: Mutex<Vec<(DbId, PlannedJob)>>,
    pub fail: bool,
}

impl RecordingEnqueuer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl JobEnqueuer for RecordingEnqueuer {
    async fn enqueue(&self, video_id: DbId, job: &PlannedJob) -> Result<(), sqlx::Error> {
        if self.fail {
            return Err(sqlx::Error::Protocol("queue unavailable".into()));
        }
        self.jobs.lock().unwrap().push((video_id, job.clone()));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MediaToolkit
// ---------------------------------------------------------------------------

/// Scripted tools. Input files whose contents are `corrupt` make every
/// tool fail.
///
/// With a `gate`, `recognize` signals `entered` and then blocks until the
/// gate hands out a permit.
pub struct FakeToolkit {
    pub binary_found: bool,
    pub audio: bool,
    pub whisper_json: String,
    pub write_vtt: bool,
    pub gate: Option<Arc<Semaphore>>,
    pub entered: Notify,
    pub recognize_calls: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    pub remux_calls: AtomicUsize,
    /// Parent directories of every file probed for audio.
    pub scratch_dirs: Mutex<Vec<PathBuf>>,
}

impl Default for FakeToolkit {
    fn default() -> Self {
        Self {
            binary_found: true,
            audio: true,
            whisper_json: r#"{"transcription":[
                {"timestamps":{"from":"00:00:00,000","to":"00:00:01,500"},"text":" Hello"},
                {"timestamps":{"from":"00:00:01,500","to":"00:00:03,000"},"text":"world "}
            ]}"#
            .to_string(),
            write_vtt: true,
            gate: None,
            entered: Notify::new(),
            recognize_calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            remux_calls: AtomicUsize::new(0),
            scratch_dirs: Mutex::new(Vec::new()),
        }
    }
}

impl FakeToolkit {
    async fn write_outputs(&self, outputs: &WhisperOutputs) -> Result<(), ToolError> {
        tokio::fs::write(&outputs.json_path, &self.whisper_json).await?;
        if self.write_vtt {
            tokio::fs::write(&outputs.vtt_path, "WEBVTT\n\nfrom-recognizer\n").await?;
        }
        Ok(())
    }
}

async fn reject_corrupt(program: &str, input: &Path) -> Result<(), ToolError> {
    if tokio::fs::read(input).await? == b"corrupt" {
        return Err(ToolError::ExecutionFailed {
            program: program.to_string(),
            exit_code: Some(1),
            output: "Invalid data found when processing input".to_string(),
        });
    }
    Ok(())
}

#[async_trait::async_trait]
impl MediaToolkit for FakeToolkit {
    fn locate_binary(&self, binary: &Path) -> Option<PathBuf> {
        self.binary_found.then(|| binary.to_path_buf())
    }

    async fn has_audio(&self, input: &Path) -> Result<bool, ToolError> {
        if let Some(dir) = input.parent() {
            self.scratch_dirs.lock().unwrap().push(dir.to_path_buf());
        }
        reject_corrupt("ffprobe", input).await?;
        Ok(self.audio)
    }

    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        reject_corrupt("ffmpeg", input).await?;
        tokio::fs::write(output, b"pcm").await?;
        Ok(())
    }

    async fn recognize(&self, request: &WhisperRequest<'_>) -> Result<WhisperOutputs, ToolError> {
        self.recognize_calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let outputs = request.outputs();
        let written = self.write_outputs(&outputs).await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        written.map(|()| outputs)
    }

    async fn remux_with_cues(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        self.remux_calls.fetch_add(1, Ordering::SeqCst);
        reject_corrupt("ffmpeg", input).await?;
        let mut data = tokio::fs::read(input).await?;
        data.extend_from_slice(b"+cues");
        tokio::fs::write(output, data).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Lifecycle email
// ---------------------------------------------------------------------------

pub fn candidate(id: DbId, email: &str) -> EmailCandidate {
    EmailCandidate {
        id,
        email: email.to_string(),
        name: Some(format!("User {id}")),
        created_at: Utc.timestamp_opt(1_760_000_000, 0).single().unwrap(),
    }
}

#[derive(Default)]
pub struct FakeUserStore {
    candidates: Mutex<HashMap<LifecycleNudge, Vec<EmailCandidate>>>,
    pub marked: Mutex<Vec<(LifecycleNudge, DbId)>>,
}

impl FakeUserStore {
    pub fn add(&self, nudge: LifecycleNudge, candidate: EmailCandidate) {
        self.candidates
            .lock()
            .unwrap()
            .entry(nudge)
            .or_default()
            .push(candidate);
    }
}

#[async_trait::async_trait]
impl UserStore for FakeUserStore {
    async fn nudge_candidates(
        &self,
        nudge: LifecycleNudge,
        limit: i64,
    ) -> Result<Vec<EmailCandidate>, sqlx::Error> {
        let marked = self.marked.lock().unwrap();
        Ok(self
            .candidates
            .lock()
            .unwrap()
            .get(&nudge)
            .map(|all| {
                all.iter()
                    .filter(|c| !marked.contains(&(nudge, c.id)))
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn mark_nudge_sent(
        &self,
        nudge: LifecycleNudge,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let mut marked = self.marked.lock().unwrap();
        if marked.contains(&(nudge, user_id)) {
            return Ok(false);
        }
        marked.push((nudge, user_id));
        Ok(true)
    }
}

#[derive(Default)]
pub struct FakeMailer {
    pub refuse: HashSet<String>,
    pub sent: Mutex<Vec<OutgoingEmail>>,
}

#[async_trait::async_trait]
impl Mailer for FakeMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        if self.refuse.contains(&email.to) {
            return Err(EmailError::Build(format!("mailbox {} unavailable", email.to)));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ticker
// ---------------------------------------------------------------------------

/// Ticks whenever the paired sender sends. Never ticks once the sender is
/// gone.
pub struct ManualTicker {
    rx: mpsc::UnboundedReceiver<()>,
}

impl ManualTicker {
    pub fn new() -> (mpsc::UnboundedSender<()>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }
}

#[async_trait::async_trait]
impl Ticker for ManualTicker {
    async fn tick(&mut self) {
        if self.rx.recv().await.is_none() {
            std::future::pending::<()>().await;
        }
    }
}
