//! Property change events
//!
//! Every mutation of the observable property surface is described by one
//! `PropertyEvent`. Events are applied to the snapshot and broadcast to
//! subscribers in the same order.

use serde::{Deserialize, Serialize};

use crate::error::CameraError;
use crate::model::{CaptureActivity, CaptureMode, QualityPrioritization, Thumbnail};
use crate::state::SessionStatus;

/// A single change to the observable camera properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyEvent {
    StatusChanged { status: SessionStatus },

    /// Steady-state capture activity (never carries `will_capture`)
    ActivityChanged { activity: CaptureActivity },

    SwitchingVideoDevices { active: bool },

    PrefersMinimizedUi { minimized: bool },

    SwitchingModes { active: bool },

    /// Shutter feedback pulse
    FlashScreen { on: bool },

    ThumbnailChanged { thumbnail: Thumbnail },

    /// Last action failure, or `None` once a later action succeeded
    ErrorChanged { error: Option<CameraError> },

    HdrVideoSupported { supported: bool },

    CaptureModeChanged { mode: CaptureMode },

    LivePhotoChanged { enabled: bool },

    QualityPrioritizationChanged { prioritization: QualityPrioritization },

    HdrVideoChanged { enabled: bool },
}

impl std::fmt::Display for PropertyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyEvent::StatusChanged { status } => write!(f, "STATUS_CHANGED ({})", status),
            PropertyEvent::ActivityChanged { activity } => {
                write!(f, "ACTIVITY_CHANGED ({})", activity)
            }
            PropertyEvent::SwitchingVideoDevices { active } => {
                write!(f, "SWITCHING_VIDEO_DEVICES ({})", active)
            }
            PropertyEvent::PrefersMinimizedUi { minimized } => {
                write!(f, "PREFERS_MINIMIZED_UI ({})", minimized)
            }
            PropertyEvent::SwitchingModes { active } => write!(f, "SWITCHING_MODES ({})", active),
            PropertyEvent::FlashScreen { on } => write!(f, "FLASH_SCREEN ({})", on),
            PropertyEvent::ThumbnailChanged { thumbnail } => {
                write!(f, "THUMBNAIL_CHANGED ({})", thumbnail.asset_id)
            }
            PropertyEvent::ErrorChanged { error: Some(error) } => {
                write!(f, "ERROR_RAISED ({})", error)
            }
            PropertyEvent::ErrorChanged { error: None } => write!(f, "ERROR_CLEARED"),
            PropertyEvent::HdrVideoSupported { supported } => {
                write!(f, "HDR_VIDEO_SUPPORTED ({})", supported)
            }
            PropertyEvent::CaptureModeChanged { mode } => write!(f, "CAPTURE_MODE_CHANGED ({})", mode),
            PropertyEvent::LivePhotoChanged { enabled } => write!(f, "LIVE_PHOTO_CHANGED ({})", enabled),
            PropertyEvent::QualityPrioritizationChanged { prioritization } => {
                write!(f, "QUALITY_PRIORITIZATION_CHANGED ({:?})", prioritization)
            }
            PropertyEvent::HdrVideoChanged { enabled } => write!(f, "HDR_VIDEO_CHANGED ({})", enabled),
        }
    }
}
