//! Accepted upload formats and the content-type whitelist.

use crate::error::CoreError;

/// Default maximum upload size (5 GiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: i64 = 5 * 1024 * 1024 * 1024;

/// MIME type produced by the in-browser recorder.
pub const MIME_WEBM: &str = "video/webm";

/// Video container formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoFormat {
    /// Browser-native recording. Needs a fixed-cues transcode.
    Webm,
    Mp4,
    QuickTime,
    Matroska,
}

/// Every accepted content type, in whitelist order.
pub const SUPPORTED_CONTENT_TYPES: &[&str] = &[
    MIME_WEBM,
    "video/mp4",
    "video/quicktime",
    "video/x-matroska",
];

impl VideoFormat {
    /// Resolve a content type against the whitelist.
    ///
    /// Parameters such as `;codecs=vp9` and letter case are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match normalize_content_type(content_type).as_str() {
            "video/webm" => Some(Self::Webm),
            "video/mp4" => Some(Self::Mp4),
            "video/quicktime" => Some(Self::QuickTime),
            "video/x-matroska" => Some(Self::Matroska),
            _ => None,
        }
    }

    /// Like [`Self::from_content_type`] but fails with a validation error.
    pub fn parse(content_type: &str) -> Result<Self, CoreError> {
        Self::from_content_type(content_type).ok_or_else(|| {
            CoreError::Validation(format!(
                "Unsupported content type '{content_type}'. \
                 Must be one of: {SUPPORTED_CONTENT_TYPES:?}"
            ))
        })
    }

    /// Canonical MIME type.
    pub fn mime(self) -> &'static str {
        match self {
            Self::Webm => MIME_WEBM,
            Self::Mp4 => "video/mp4",
            Self::QuickTime => "video/quicktime",
            Self::Matroska => "video/x-matroska",
        }
    }

    /// Recorded by our own client, as opposed to uploaded from elsewhere.
    pub fn is_native_recording(self) -> bool {
        self == Self::Webm
    }

    /// File extension used for scratch files.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Webm => "webm",
            Self::Mp4 => "mp4",
            Self::QuickTime => "mov",
            Self::Matroska => "mkv",
        }
    }
}

/// Lowercased base MIME type with any parameters stripped.
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Validate a declared size for a new upload.
pub fn validate_upload_size(size: i64, max_bytes: i64) -> Result<(), CoreError> {
    if size <= 0 {
        return Err(CoreError::Validation("Upload size must be positive".into()));
    }
    if size > max_bytes {
        return Err(CoreError::Validation(format!(
            "Upload size {size} exceeds the maximum of {max_bytes} bytes"
        )));
    }
    Ok(())
}
