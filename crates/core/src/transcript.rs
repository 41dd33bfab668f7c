//! Transcript segments: parsing recogniser JSON and rendering WebVTT.

use serde::{Deserialize, Serialize};

/// A single timestamped span of recognised speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    pub text: String,
}

// ---------------------------------------------------------------------------
// whisper.cpp `-oj` output
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct WhisperJson {
    #[serde(default)]
    transcription: Vec<WhisperEntry>,
}

#[derive(Debug, Deserialize)]
struct WhisperEntry {
    #[serde(default)]
    offsets: Option<WhisperOffsets>,
    #[serde(default)]
    timestamps: Option<WhisperTimestamps>,
    #[serde(default)]
    text: String,
}

/// Millisecond offsets from the start of the audio.
#[derive(Debug, Deserialize)]
struct WhisperOffsets {
    from: u64,
    to: u64,
}

#[derive(Debug, Deserialize)]
struct WhisperTimestamps {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
}

/// Parse the recogniser's JSON output into ordered, non-empty segments.
///
/// Millisecond `offsets` are used when present, otherwise the textual
/// `timestamps`. Text is trimmed and entries with no text are dropped.
/// Unparseable timestamps become zero instead of failing the whole
/// transcript.
pub fn parse_segments(json: &str) -> Result<Vec<Segment>, serde_json::Error> {
    let parsed: WhisperJson = serde_json::from_str(json)?;

    Ok(parsed
        .transcription
        .into_iter()
        .filter_map(|entry| {
            let text = entry.text.trim();
            if text.is_empty() {
                return None;
            }
            let (start, end) = match (entry.offsets, entry.timestamps) {
                (Some(o), _) => (o.from as f64 / 1000.0, o.to as f64 / 1000.0),
                (None, Some(t)) => (parse_timestamp(&t.from), parse_timestamp(&t.to)),
                (None, None) => (0.0, 0.0),
            };
            Some(Segment {
                start,
                end,
                text: text.to_string(),
            })
        })
        .collect())
}

/// Parse `HH:MM:SS.mmm` or `HH:MM:SS,mmm` into seconds.
///
/// Anything else, including a wrong field count or a non-numeric field,
/// yields `0.0`.
pub fn parse_timestamp(raw: &str) -> f64 {
    let normalized = raw.trim().replace(',', ".");
    let parts: Vec<&str> = normalized.split(':').collect();
    if parts.len() != 3 {
        return 0.0;
    }

    let fields: Option<Vec<f64>> = parts.iter().map(|p| p.parse::<f64>().ok()).collect();
    match fields.as_deref() {
        Some([h, m, s]) if [h, m, s].iter().all(|v| v.is_finite()) => h * 3600.0 + m * 60.0 + s,
        _ => 0.0,
    }
}

// ---------------------------------------------------------------------------
// WebVTT
// ---------------------------------------------------------------------------

/// Format seconds as a WebVTT cue timestamp (`HH:MM:SS.mmm`).
pub fn format_vtt_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    format!(
        "{:02}:{:02}:{:02}.{:03}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        ms
    )
}

/// Render segments as a WebVTT document.
pub fn render_vtt(segments: &[Segment]) -> String {
    let mut out = String::from("WEBVTT\n");
    for segment in segments {
        out.push('\n');
        out.push_str(&format_vtt_timestamp(segment.start));
        out.push_str(" --> ");
        out.push_str(&format_vtt_timestamp(segment.end));
        out.push('\n');
        out.push_str(&segment.text);
        out.push('\n');
    }
    out
}
