//! Server-side verification of a completed upload.
//!
//! The client's claim that an upload finished is never trusted on its own:
//! the stored object's size and content type are compared with what was
//! recorded when the upload was initiated.

use crate::video::normalize_content_type;

/// Why an upload confirmation was rejected. No state changes on rejection.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadRejection {
    #[error("uploaded object is missing or unreadable")]
    ObjectMissing,

    #[error("uploaded object is empty")]
    EmptyObject,

    #[error("uploaded object is {actual} bytes, above the {max} byte limit")]
    TooLarge { actual: i64, max: i64 },

    #[error("uploaded object is {actual} bytes but {expected} bytes were declared")]
    SizeMismatch { expected: i64, actual: i64 },

    #[error("uploaded object has content type {actual:?} but {expected} was declared")]
    ContentTypeMismatch {
        expected: String,
        actual: Option<String>,
    },

    #[error("content type {0} is not accepted")]
    UnsupportedContentType(String),
}

/// What was recorded for the video when its upload URL was issued.
#[derive(Debug, Clone)]
pub struct DeclaredUpload<'a> {
    pub content_type: &'a str,
    /// `None` when the client did not declare a size up front.
    pub file_size: Option<i64>,
    pub max_bytes: i64,
}

/// Check the stored object's size and content type against the declaration.
pub fn verify_upload(
    declared: &DeclaredUpload<'_>,
    actual_size: i64,
    actual_content_type: Option<&str>,
) -> Result<(), UploadRejection> {
    if actual_size <= 0 {
        return Err(UploadRejection::EmptyObject);
    }
    if actual_size > declared.max_bytes {
        return Err(UploadRejection::TooLarge {
            actual: actual_size,
            max: declared.max_bytes,
        });
    }
    if let Some(expected) = declared.file_size {
        if expected != actual_size {
            return Err(UploadRejection::SizeMismatch {
                expected,
                actual: actual_size,
            });
        }
    }

    let expected_type = normalize_content_type(declared.content_type);
    let matches = actual_content_type
        .map(normalize_content_type)
        .is_some_and(|actual| actual == expected_type);
    if !matches {
        return Err(UploadRejection::ContentTypeMismatch {
            expected: expected_type,
            actual: actual_content_type.map(str::to_string),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn declared(size: Option<i64>) -> DeclaredUpload<'static> {
        DeclaredUpload {
            content_type: "video/webm",
            file_size: size,
            max_bytes: 1_000,
        }
    }

    #[test]
    fn matching_upload_is_accepted() {
        assert!(verify_upload(&declared(Some(500)), 500, Some("video/webm")).is_ok());
    }

    #[test]
    fn codecs_parameter_does_not_cause_mismatch() {
        assert!(verify_upload(&declared(None), 10, Some("video/webm;codecs=vp8")).is_ok());
    }

    #[test]
    fn zero_bytes_is_rejected() {
        assert_matches!(
            verify_upload(&declared(None), 0, Some("video/webm")),
            Err(UploadRejection::EmptyObject)
        );
    }

    #[test]
    fn oversize_is_rejected() {
        assert_matches!(
            verify_upload(&declared(None), 1_001, Some("video/webm")),
            Err(UploadRejection::TooLarge { actual: 1_001, max: 1_000 })
        );
    }

    #[test]
    fn size_mismatch_is_rejected() {
        assert_matches!(
            verify_upload(&declared(Some(500)), 499, Some("video/webm")),
            Err(UploadRejection::SizeMismatch { expected: 500, actual: 499 })
        );
    }

    #[test]
    fn content_type_mismatch_is_rejected() {
        assert_matches!(
            verify_upload(&declared(Some(500)), 500, Some("video/mp4")),
            Err(UploadRejection::ContentTypeMismatch { .. })
        );
        assert_matches!(
            verify_upload(&declared(Some(500)), 500, None),
            Err(UploadRejection::ContentTypeMismatch { actual: None, .. })
        );
    }
}
