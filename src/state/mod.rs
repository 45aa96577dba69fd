//! Session status and the observable property surface
//!
//! - `SessionStatus`: unknown, unauthorized, running, failed
//! - `PropertySurface`: the snapshot presentation clients read and subscribe to

mod status;
mod surface;

pub use status::SessionStatus;
pub use surface::{CameraProperties, Flag, FlagGuard, PropertySurface};
