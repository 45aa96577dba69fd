//! Live capture activity and device capabilities

use serde::{Deserialize, Serialize};

/// What the capture subsystem is doing right now
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureActivity {
    #[default]
    Idle,
    /// A photo is being taken. `will_capture` is raised just before the
    /// shutter fires.
    PhotoCapture {
        will_capture: bool,
        is_live_photo: bool,
    },
    MovieCapture {
        duration_secs: f64,
    },
}

impl CaptureActivity {
    /// The shutter is about to fire
    pub fn will_capture(&self) -> bool {
        matches!(self, Self::PhotoCapture { will_capture: true, .. })
    }

    pub fn is_live_photo(&self) -> bool {
        matches!(self, Self::PhotoCapture { is_live_photo: true, .. })
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::MovieCapture { .. })
    }
}

impl std::fmt::Display for CaptureActivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureActivity::Idle => write!(f, "idle"),
            CaptureActivity::PhotoCapture { will_capture, .. } => {
                write!(f, "photo capture (will capture: {})", will_capture)
            }
            CaptureActivity::MovieCapture { duration_secs } => {
                write!(f, "movie capture ({:.1}s)", duration_secs)
            }
        }
    }
}

/// Read-only capabilities of the active capture device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptureCapabilities {
    pub is_hdr_supported: bool,
}
