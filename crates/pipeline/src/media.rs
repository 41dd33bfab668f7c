//! External media tools behind a trait, so the transcription and cue
//! repair flows can run against scripted fakes.

use std::path::{Path, PathBuf};

use screenreel_core::ffmpeg;
use screenreel_core::process::ToolError;
use screenreel_core::whisper::{self, WhisperOutputs, WhisperRequest};

#[async_trait::async_trait]
pub trait MediaToolkit: Send + Sync {
    /// Resolve an executable name or path against `PATH`.
    fn locate_binary(&self, binary: &Path) -> Option<PathBuf> {
        which::which(binary).ok()
    }

    async fn has_audio(&self, input: &Path) -> Result<bool, ToolError>;

    /// Decode to 16 kHz mono PCM WAV.
    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<(), ToolError>;

    async fn recognize(&self, request: &WhisperRequest<'_>) -> Result<WhisperOutputs, ToolError>;

    /// Stream-copy remux that writes a seek index.
    async fn remux_with_cues(&self, input: &Path, output: &Path) -> Result<(), ToolError>;
}

/// ffmpeg, ffprobe and whisper.cpp from the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolkit;

#[async_trait::async_trait]
impl MediaToolkit for SystemToolkit {
    async fn has_audio(&self, input: &Path) -> Result<bool, ToolError> {
        ffmpeg::has_audio_stream(input).await
    }

    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        ffmpeg::extract_audio_pcm(input, output).await
    }

    async fn recognize(&self, request: &WhisperRequest<'_>) -> Result<WhisperOutputs, ToolError> {
        whisper::transcribe(request).await
    }

    async fn remux_with_cues(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        ffmpeg::remux_with_cues(input, output).await
    }
}
