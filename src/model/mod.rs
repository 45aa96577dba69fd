//! Domain types shared by the controller, the capture seams and IPC
//!
//! Everything here is plain data: no I/O, no tasks.

mod activity;
mod media;
mod preferences;

pub use activity::{CaptureActivity, CaptureCapabilities};
pub use media::{FocusPoint, Movie, Photo, PhotoFeatures, PreviewSource, Thumbnail};
pub use preferences::{CameraPreferences, CaptureMode, QualityPrioritization};
