//! Session controller
//!
//! Owns the session status, executes user actions against the capture
//! subsystem and forwards capture events into the property surface.

mod mode_switch;
mod multiplexer;
mod session;

pub use session::{CameraController, ControllerSettings};
