//! Errors surfaced by the capture subsystem and the media library

use serde::{Deserialize, Serialize};

/// Failure reported by a capture, recording, device or library call.
///
/// Action failures land in the observable `error` field; startup failures
/// are only logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CameraError {
    #[error("capture session failed to start: {0}")]
    StartupFailed(String),

    #[error("capture configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("photo capture failed: {0}")]
    PhotoCaptureFailed(String),

    #[error("recording failed: {0}")]
    RecordingFailed(String),

    #[error("saving to the media library failed: {0}")]
    SaveFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CameraError::SaveFailed("disk full".into());
        assert_eq!(err.to_string(), "saving to the media library failed: disk full");
    }

    #[test]
    fn test_error_serialization() {
        let json = serde_json::to_string(&CameraError::PhotoCaptureFailed("busy".into())).unwrap();
        assert_eq!(json, r#"{"kind":"photo_capture_failed","detail":"busy"}"#);

        let err: CameraError =
            serde_json::from_str(r#"{"kind":"recording_failed","detail":"no disk"}"#).unwrap();
        assert_eq!(err, CameraError::RecordingFailed("no disk".into()));
    }
}
