//! FFmpeg/FFprobe command helpers.
//!
//! Probing, audio extraction for speech recognition, and the stream-copy
//! remux that rewrites a WebM seek index.

use std::path::Path;

use serde::Deserialize;
use tokio::process::Command;

use crate::process::{run_tool, ToolError};

const FFMPEG: &str = "ffmpeg";
const FFPROBE: &str = "ffprobe";

/// Sample rate expected by the speech recogniser.
pub const TRANSCRIPTION_SAMPLE_RATE: u32 = 16_000;

/// Index space reserved up front so the cues fit without a second pass.
pub const CUE_INDEX_RESERVE: &str = "1024k";

// ---------------------------------------------------------------------------
// ffprobe JSON output structures
// ---------------------------------------------------------------------------

/// Top-level ffprobe JSON output (`-print_format json -show_format -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
    #[serde(default)]
    pub format: Option<FfprobeFormat>,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub index: i32,
    pub codec_name: Option<String>,
    pub codec_type: Option<String>,
    pub duration: Option<String>,
}

/// Format-level metadata from ffprobe.
#[derive(Debug, Deserialize)]
pub struct FfprobeFormat {
    pub duration: Option<String>,
    pub format_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Run `ffprobe` on a media file and return the parsed JSON output.
pub async fn probe(path: &Path) -> Result<FfprobeOutput, ToolError> {
    let stdout = run_tool(
        Command::new(FFPROBE)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path),
        FFPROBE,
    )
    .await?;

    parse_probe_output(&stdout)
}

/// Whether the file carries at least one audio stream.
pub async fn has_audio_stream(path: &Path) -> Result<bool, ToolError> {
    let probe = probe(path).await?;
    Ok(count_audio_streams(&probe) > 0)
}

/// Media duration in whole seconds, if ffprobe reports one.
pub async fn probe_duration(path: &Path) -> Result<Option<i32>, ToolError> {
    let probe = probe(path).await?;
    Ok(whole_seconds(&probe))
}

/// Extract a mono 16 kHz PCM WAV track for speech recognition.
pub async fn extract_audio_pcm(input: &Path, output: &Path) -> Result<(), ToolError> {
    let rate = TRANSCRIPTION_SAMPLE_RATE.to_string();
    run_tool(
        Command::new(FFMPEG)
            .args(["-y", "-i"])
            .arg(input)
            .args(["-vn", "-ac", "1", "-ar", rate.as_str(), "-c:a", "pcm_s16le"])
            .arg(output),
        FFMPEG,
    )
    .await?;
    Ok(())
}

/// Stream-copy `input` into `output` with a reserved cue index.
///
/// No re-encoding takes place; only the container is rewritten.
pub async fn remux_with_cues(input: &Path, output: &Path) -> Result<(), ToolError> {
    run_tool(Command::new(FFMPEG).args(remux_args(input, output)), FFMPEG).await?;
    Ok(())
}

fn remux_args(input: &Path, output: &Path) -> Vec<std::ffi::OsString> {
    let mut args: Vec<std::ffi::OsString> = vec!["-y".into(), "-i".into(), input.into()];
    args.extend(
        ["-map", "0", "-c", "copy", "-reserve_index_space", CUE_INDEX_RESERVE]
            .into_iter()
            .map(Into::into),
    );
    args.push(output.into());
    args
}

// ---------------------------------------------------------------------------
// Parsing helpers
// ---------------------------------------------------------------------------

/// Parse raw ffprobe JSON.
pub fn parse_probe_output(stdout: &str) -> Result<FfprobeOutput, ToolError> {
    serde_json::from_str::<FfprobeOutput>(stdout).map_err(|e| ToolError::Parse {
        program: FFPROBE.to_string(),
        message: format!("{e}: {stdout}"),
    })
}

/// Number of audio streams in the probe output.
pub fn count_audio_streams(probe: &FfprobeOutput) -> usize {
    probe
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("audio"))
        .count()
}

/// Duration rounded to whole seconds, as stored on the video row.
pub fn whole_seconds(probe: &FfprobeOutput) -> Option<i32> {
    parse_duration(probe).map(|secs| secs.round() as i32)
}

/// Duration in seconds, from the format section or the first stream with one.
pub fn parse_duration(probe: &FfprobeOutput) -> Option<f64> {
    let from_format = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok());

    from_format
        .or_else(|| {
            probe
                .streams
                .iter()
                .filter_map(|s| s.duration.as_deref())
                .find_map(|d| d.parse::<f64>().ok())
        })
        .filter(|secs| secs.is_finite() && *secs > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN_ONLY: &str = r#"{
        "streams": [
            { "index": 0, "codec_name": "vp9", "codec_type": "video" }
        ],
        "format": { "format_name": "matroska,webm" }
    }"#;

    const WITH_AUDIO: &str = r#"{
        "streams": [
            { "index": 0, "codec_name": "vp8", "codec_type": "video" },
            { "index": 1, "codec_name": "opus", "codec_type": "audio", "duration": "12.480000" }
        ],
        "format": { "duration": "12.501000", "format_name": "matroska,webm" }
    }"#;

    #[test]
    fn silent_recording_has_no_audio() {
        let probe = parse_probe_output(SCREEN_ONLY).unwrap();
        assert_eq!(count_audio_streams(&probe), 0);
        assert_eq!(parse_duration(&probe), None);
    }

    #[test]
    fn audio_stream_is_counted() {
        let probe = parse_probe_output(WITH_AUDIO).unwrap();
        assert_eq!(count_audio_streams(&probe), 1);
    }

    #[test]
    fn format_duration_wins_over_stream() {
        let probe = parse_probe_output(WITH_AUDIO).unwrap();
        assert!((parse_duration(&probe).unwrap() - 12.501).abs() < 0.001);
    }

    #[test]
    fn duration_rounds_to_whole_seconds() {
        let probe = parse_probe_output(WITH_AUDIO).unwrap();
        assert_eq!(whole_seconds(&probe), Some(13));
        let silent = parse_probe_output(SCREEN_ONLY).unwrap();
        assert_eq!(whole_seconds(&silent), None);
    }

    #[test]
    fn stream_duration_is_fallback() {
        let probe = parse_probe_output(
            r#"{"streams":[{"index":0,"codec_type":"video","duration":"N/A"},
                {"index":1,"codec_type":"audio","duration":"3.5"}]}"#,
        )
        .unwrap();
        assert_eq!(parse_duration(&probe), Some(3.5));
    }

    #[test]
    fn garbage_output_is_parse_error() {
        assert!(matches!(
            parse_probe_output("not json"),
            Err(ToolError::Parse { .. })
        ));
    }

    #[test]
    fn remux_copies_streams_and_reserves_index() {
        let args = remux_args(Path::new("in.webm"), Path::new("out.webm"));
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "-y",
                "-i",
                "in.webm",
                "-map",
                "0",
                "-c",
                "copy",
                "-reserve_index_space",
                CUE_INDEX_RESERVE,
                "out.webm"
            ]
        );
    }
}
