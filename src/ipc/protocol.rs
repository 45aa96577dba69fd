//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::PropertyEvent;
use crate::model::{CaptureMode, FocusPoint, PreviewSource, QualityPrioritization};
use crate::state::{CameraProperties, SessionStatus};

/// Largest frame accepted from a client
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from UI to daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Full property snapshot
    GetProperties,

    GetPreviewSource,

    /// Subscribe to property change notifications
    Subscribe,

    /// Start the capture session
    Start,

    /// Re-read stored preferences
    SyncState,

    SetCaptureMode { mode: CaptureMode },

    SwitchVideoDevices,

    CapturePhoto,

    ToggleRecording,

    SetLivePhotoEnabled { enabled: bool },

    SetQualityPrioritization { prioritization: QualityPrioritization },

    SetHdrVideoEnabled { enabled: bool },

    /// Normalized preview coordinates
    FocusAndExpose { point: FocusPoint },
}

/// Responses from daemon to UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    Properties(CameraProperties),

    PreviewSource(PreviewSource),

    /// Subscription confirmed
    Subscribed,

    /// Session status after a start request
    Status { status: SessionStatus },

    /// The action was carried out; its effects arrive as property changes
    Ack,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification from daemon to UI (for subscribed clients)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    PropertyChanged { event: PropertyEvent },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let req = Request::SetCaptureMode {
            mode: CaptureMode::Video,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("set_capture_mode"));
        assert!(json.contains("video"));
    }

    #[test]
    fn test_focus_request_parses() {
        let req: Request =
            serde_json::from_str(r#"{"type":"focus_and_expose","point":{"x":0.25,"y":0.75}}"#)
                .unwrap();
        assert_eq!(
            req,
            Request::FocusAndExpose {
                point: FocusPoint { x: 0.25, y: 0.75 }
            }
        );
    }

    #[test]
    fn test_unknown_request_rejected() {
        assert!(serde_json::from_str::<Request>(r#"{"type":"set_mode"}"#).is_err());
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Properties(CameraProperties::default());
        let json: serde_json::Value = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "properties");
        assert_eq!(json["status"], "unknown");

        let resp = Response::Status {
            status: SessionStatus::Running,
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"type":"status","status":"running"}"#);
    }

    #[test]
    fn test_notification_nests_event() {
        let note = Notification::PropertyChanged {
            event: PropertyEvent::SwitchingModes { active: true },
        };
        let json: serde_json::Value = serde_json::to_value(&note).unwrap();
        assert_eq!(json["type"], "property_changed");
        assert_eq!(json["event"]["type"], "switching_modes");
        assert_eq!(json["event"]["active"], true);
    }
}
