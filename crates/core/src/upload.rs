//! Size and type limits for media uploads.
//!
//! Checked on the client before anything touches the network, and again by
//! the blob store when the body arrives.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ApiError;

const MIB: u64 = 1024 * 1024;

pub const MAX_VIDEO_BYTES: u64 = 100 * MIB;
pub const MAX_IMAGE_BYTES: u64 = 5 * MIB;

pub const VIDEO_MIME_TYPES: &[&str] = &["video/mp4"];
pub const IMAGE_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// What an uploaded payload is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadKind {
    Video,
    Image,
}

impl UploadKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Image => "image",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "video" => Some(Self::Video),
            "image" => Some(Self::Image),
            _ => None,
        }
    }

    pub fn max_bytes(self) -> u64 {
        match self {
            Self::Video => MAX_VIDEO_BYTES,
            Self::Image => MAX_IMAGE_BYTES,
        }
    }

    pub fn allowed_mime_types(self) -> &'static [&'static str] {
        match self {
            Self::Video => VIDEO_MIME_TYPES,
            Self::Image => IMAGE_MIME_TYPES,
        }
    }
}

impl std::fmt::Display for UploadKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadRejection {
    #[error("{kind} file is empty")]
    Empty { kind: UploadKind },

    #[error("{kind} file must be {} MB or smaller", .limit / MIB)]
    TooLarge {
        kind: UploadKind,
        size: u64,
        limit: u64,
    },

    #[error("{kind} file must be one of: {}", .kind.allowed_mime_types().join(", "))]
    UnsupportedType { kind: UploadKind, mime: String },
}

impl UploadRejection {
    pub fn kind(&self) -> UploadKind {
        match self {
            Self::Empty { kind } | Self::TooLarge { kind, .. } | Self::UnsupportedType { kind, .. } => {
                *kind
            }
        }
    }
}

impl From<UploadRejection> for ApiError {
    fn from(r: UploadRejection) -> Self {
        match r {
            UploadRejection::Empty { .. } => ApiError::BadRequest(r.to_string()),
            UploadRejection::TooLarge { .. } => ApiError::PayloadTooLarge(r.to_string()),
            UploadRejection::UnsupportedType { .. } => {
                ApiError::UnsupportedMediaType(r.to_string())
            }
        }
    }
}

/// Lowercased MIME type without parameters (`video/MP4; codecs=x` -> `video/mp4`).
pub fn mime_essence(mime: &str) -> String {
    mime.split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Check only the MIME type against the types allowed for `kind`.
pub fn check_mime(kind: UploadKind, mime: &str) -> Result<(), UploadRejection> {
    if kind.allowed_mime_types().contains(&mime_essence(mime).as_str()) {
        Ok(())
    } else {
        Err(UploadRejection::UnsupportedType {
            kind,
            mime: mime.to_string(),
        })
    }
}

/// Check a payload's size and MIME type against the limits for `kind`.
pub fn check_upload(kind: UploadKind, size_bytes: u64, mime: &str) -> Result<(), UploadRejection> {
    check_mime(kind, mime)?;

    if size_bytes == 0 {
        return Err(UploadRejection::Empty { kind });
    }

    let limit = kind.max_bytes();
    if size_bytes > limit {
        return Err(UploadRejection::TooLarge {
            kind,
            size: size_bytes,
            limit,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversized_video_is_rejected_with_limit_message() {
        let err = check_upload(UploadKind::Video, 150 * MIB, "video/mp4").unwrap_err();
        assert!(matches!(err, UploadRejection::TooLarge { limit, .. } if limit == MAX_VIDEO_BYTES));
        assert_eq!(err.to_string(), "video file must be 100 MB or smaller");
    }

    #[test]
    fn video_at_limit_is_accepted() {
        assert!(check_upload(UploadKind::Video, MAX_VIDEO_BYTES, "video/mp4").is_ok());
        assert!(check_upload(UploadKind::Video, MAX_VIDEO_BYTES + 1, "video/mp4").is_err());
    }

    #[test]
    fn video_must_be_mp4() {
        let err = check_upload(UploadKind::Video, 10, "video/webm").unwrap_err();
        assert!(matches!(err, UploadRejection::UnsupportedType { .. }));
        assert!(check_upload(UploadKind::Video, 10, "Video/MP4; codecs=avc1").is_ok());
    }

    #[test]
    fn image_limits() {
        assert!(check_upload(UploadKind::Image, 1024, "image/png").is_ok());
        assert!(check_upload(UploadKind::Image, 1024, "image/webp").is_ok());
        assert!(check_upload(UploadKind::Image, 1024, "image/gif").is_err());
        let err = check_upload(UploadKind::Image, 6 * MIB, "image/jpeg").unwrap_err();
        assert_eq!(err.to_string(), "image file must be 5 MB or smaller");
    }

    #[test]
    fn mime_parameters_are_ignored() {
        assert_eq!(mime_essence(" Video/MP4 ; codecs=avc1"), "video/mp4");
        assert!(check_mime(UploadKind::Image, "IMAGE/JPEG").is_ok());
    }

    #[test]
    fn empty_payload_rejected() {
        let err = check_upload(UploadKind::Image, 0, "image/png").unwrap_err();
        assert_eq!(err, UploadRejection::Empty { kind: UploadKind::Image });
    }

    #[test]
    fn rejection_maps_to_api_status() {
        let too_large: ApiError = UploadRejection::TooLarge {
            kind: UploadKind::Video,
            size: 2 * MAX_VIDEO_BYTES,
            limit: MAX_VIDEO_BYTES,
        }
        .into();
        assert_eq!(too_large.status_code(), 413);

        let wrong_type: ApiError = UploadRejection::UnsupportedType {
            kind: UploadKind::Image,
            mime: "text/plain".into(),
        }
        .into();
        assert_eq!(wrong_type.status_code(), 415);
    }
}
