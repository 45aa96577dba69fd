//! Capture mode reconfiguration worker
//!
//! Mode requests land in a single slot holding the newest value. One worker
//! per session applies whatever is newest and drops superseded requests, so
//! rapid toggling never runs reconfigurations concurrently and the final
//! hardware mode is always the last one the user asked for.

use std::sync::Arc;

use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::capture::CaptureService;
use crate::model::CaptureMode;
use crate::preferences::PreferenceMirror;
use crate::state::{Flag, FlagGuard, PropertySurface};

pub(crate) struct ModeSwitcher {
    pub capture: Arc<dyn CaptureService>,
    pub surface: PropertySurface,
    pub preferences: PreferenceMirror,
    pub requests: watch::Receiver<CaptureMode>,
}

impl ModeSwitcher {
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        debug!("mode switch worker started");

        loop {
            tokio::select! {
                changed = self.requests.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = shutdown.recv() => break,
            }

            // Held across the whole drain; dropped on completion, failure
            // or cancellation
            let _switching = FlagGuard::raise(&self.surface, Flag::SwitchingModes);

            loop {
                let mode = *self.requests.borrow_and_update();
                tokio::select! {
                    _ = self.apply(mode) => {}
                    _ = shutdown.recv() => {
                        debug!(%mode, "mode switch cancelled");
                        return;
                    }
                }

                if !self.requests.has_changed().unwrap_or(false) {
                    break;
                }
                debug!("newer mode requested, superseding");
            }
        }

        debug!("mode switch worker stopped");
    }

    async fn apply(&self, mode: CaptureMode) {
        match self.capture.set_capture_mode(mode).await {
            Ok(()) => {
                self.preferences.update(|p| p.capture_mode = mode);
                info!(%mode, "capture mode applied");
            }
            Err(e) => {
                warn!(%mode, error = %e, "failed to apply capture mode");
            }
        }
    }
}
