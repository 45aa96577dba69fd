//! Values exchanged with the capture subsystem and the media library

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::QualityPrioritization;

/// Options for a single photo capture, built from current preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoFeatures {
    pub is_live_photo_enabled: bool,
    pub quality_prioritization: QualityPrioritization,
}

/// A captured photo awaiting storage
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub data: Vec<u8>,
    /// Companion movie for a live photo
    pub live_photo_movie: Option<PathBuf>,
    pub is_proxy: bool,
}

/// A finished recording awaiting storage
#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    pub path: PathBuf,
    pub duration_secs: f64,
}

/// Reference to the most recent preview image in the media library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub asset_id: String,
    pub width: u32,
    pub height: u32,
}

/// Normalized point of interest for focus and exposure, in `0.0..=1.0`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FocusPoint {
    pub x: f64,
    pub y: f64,
}

impl FocusPoint {
    /// Clamp both coordinates into the unit square
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
        }
    }
}

/// Opaque handle the presentation layer uses to attach a preview.
/// Passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewSource {
    pub id: String,
}
