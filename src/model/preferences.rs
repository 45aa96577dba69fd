//! Persisted capture preferences

use serde::{Deserialize, Serialize};

/// Whether the session is configured for stills or movies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureMode {
    /// Still photo capture
    #[default]
    Photo,
    /// Movie recording
    Video,
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureMode::Photo => write!(f, "photo"),
            CaptureMode::Video => write!(f, "video"),
        }
    }
}

/// Trade-off between photo quality and shot-to-shot latency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPrioritization {
    Speed,
    Balanced,
    #[default]
    Quality,
}

/// User-chosen capture settings that survive restarts
///
/// The record is always written whole; a partially updated record never
/// reaches storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPreferences {
    pub capture_mode: CaptureMode,
    pub quality_prioritization: QualityPrioritization,
    pub is_live_photo_enabled: bool,
    pub is_video_hdr_enabled: bool,
    /// Last capability reported by the capture subsystem
    pub is_video_hdr_supported: bool,
}

impl Default for CameraPreferences {
    fn default() -> Self {
        Self {
            capture_mode: CaptureMode::Photo,
            quality_prioritization: QualityPrioritization::Quality,
            is_live_photo_enabled: true,
            is_video_hdr_enabled: true,
            is_video_hdr_supported: true,
        }
    }
}
