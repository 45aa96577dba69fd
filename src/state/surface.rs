//! Observable property surface
//!
//! One exclusive-access box for everything a presentation client can see.
//! Writers never touch fields directly: they describe the change as a
//! `PropertyEvent`, which is applied to the snapshot and broadcast while the
//! snapshot lock is held, so subscribers see events in mutation order.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::error::CameraError;
use crate::events::PropertyEvent;
use crate::model::{CaptureActivity, CaptureMode, QualityPrioritization, Thumbnail};

use super::SessionStatus;

/// Full snapshot of the observable camera state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraProperties {
    pub status: SessionStatus,
    pub capture_activity: CaptureActivity,
    pub is_switching_video_devices: bool,
    pub prefers_minimized_ui: bool,
    pub is_switching_modes: bool,
    pub should_flash_screen: bool,
    pub thumbnail: Option<Thumbnail>,
    pub error: Option<CameraError>,
    pub is_hdr_video_supported: bool,
    pub capture_mode: CaptureMode,
    pub is_live_photo_enabled: bool,
    pub quality_prioritization: QualityPrioritization,
    pub is_hdr_video_enabled: bool,
}

impl Default for CameraProperties {
    fn default() -> Self {
        Self {
            status: SessionStatus::Unknown,
            capture_activity: CaptureActivity::Idle,
            is_switching_video_devices: false,
            prefers_minimized_ui: false,
            is_switching_modes: false,
            should_flash_screen: false,
            thumbnail: None,
            error: None,
            is_hdr_video_supported: false,
            capture_mode: CaptureMode::Photo,
            is_live_photo_enabled: true,
            quality_prioritization: QualityPrioritization::Quality,
            is_hdr_video_enabled: false,
        }
    }
}

impl CameraProperties {
    fn apply(&mut self, event: &PropertyEvent) {
        match event {
            PropertyEvent::StatusChanged { status } => self.status = *status,
            PropertyEvent::ActivityChanged { activity } => self.capture_activity = activity.clone(),
            PropertyEvent::SwitchingVideoDevices { active } => {
                self.is_switching_video_devices = *active
            }
            PropertyEvent::PrefersMinimizedUi { minimized } => self.prefers_minimized_ui = *minimized,
            PropertyEvent::SwitchingModes { active } => self.is_switching_modes = *active,
            PropertyEvent::FlashScreen { on } => self.should_flash_screen = *on,
            PropertyEvent::ThumbnailChanged { thumbnail } => {
                self.thumbnail = Some(thumbnail.clone())
            }
            PropertyEvent::ErrorChanged { error } => self.error = error.clone(),
            PropertyEvent::HdrVideoSupported { supported } => {
                self.is_hdr_video_supported = *supported
            }
            PropertyEvent::CaptureModeChanged { mode } => self.capture_mode = *mode,
            PropertyEvent::LivePhotoChanged { enabled } => self.is_live_photo_enabled = *enabled,
            PropertyEvent::QualityPrioritizationChanged { prioritization } => {
                self.quality_prioritization = *prioritization
            }
            PropertyEvent::HdrVideoChanged { enabled } => self.is_hdr_video_enabled = *enabled,
        }
    }
}

/// Shared handle to the observable properties
#[derive(Clone)]
pub struct PropertySurface {
    snapshot: watch::Sender<CameraProperties>,
    events: broadcast::Sender<PropertyEvent>,
}

impl PropertySurface {
    /// Create a surface whose event channel buffers `event_capacity` events
    /// per lagging subscriber
    pub fn new(event_capacity: usize) -> Self {
        let (snapshot, _) = watch::channel(CameraProperties::default());
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Self { snapshot, events }
    }

    /// Apply one change and publish it
    pub fn apply(&self, event: PropertyEvent) {
        self.snapshot.send_modify(|props| {
            props.apply(&event);
            debug!(%event, "property changed");
            let _ = self.events.send(event);
        });
    }

    pub fn snapshot(&self) -> CameraProperties {
        self.snapshot.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.snapshot.borrow().status
    }

    pub fn capture_mode(&self) -> CaptureMode {
        self.snapshot.borrow().capture_mode
    }

    pub fn has_error(&self) -> bool {
        self.snapshot.borrow().error.is_some()
    }

    /// Latest-value view of the snapshot
    pub fn watch(&self) -> watch::Receiver<CameraProperties> {
        self.snapshot.subscribe()
    }

    /// Every change from now on, in order
    pub fn subscribe(&self) -> broadcast::Receiver<PropertyEvent> {
        self.events.subscribe()
    }

    /// Raise `should_flash_screen` and drop it again after `duration`.
    /// Returns immediately.
    pub fn flash_screen(&self, duration: Duration) {
        self.apply(PropertyEvent::FlashScreen { on: true });
        let surface = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            surface.apply(PropertyEvent::FlashScreen { on: false });
        });
    }
}

/// Transient busy flags released by `FlagGuard`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    SwitchingModes,
    SwitchingVideoDevices,
}

impl Flag {
    fn event(self, active: bool) -> PropertyEvent {
        match self {
            Flag::SwitchingModes => PropertyEvent::SwitchingModes { active },
            Flag::SwitchingVideoDevices => PropertyEvent::SwitchingVideoDevices { active },
        }
    }
}

/// Raises a flag on creation and clears it when dropped, whether the
/// guarded work finished, failed or was cancelled
pub struct FlagGuard {
    surface: PropertySurface,
    flag: Flag,
}

impl FlagGuard {
    pub fn raise(surface: &PropertySurface, flag: Flag) -> Self {
        surface.apply(flag.event(true));
        Self {
            surface: surface.clone(),
            flag,
        }
    }
}

impl Drop for FlagGuard {
    fn drop(&mut self) {
        self.surface.apply(self.flag.event(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot() {
        let surface = PropertySurface::new(8);
        let props = surface.snapshot();
        assert_eq!(props.status, SessionStatus::Unknown);
        assert_eq!(props.capture_activity, CaptureActivity::Idle);
        assert!(props.thumbnail.is_none());
        assert!(props.error.is_none());
    }

    #[test]
    fn test_apply_is_visible_immediately() {
        let surface = PropertySurface::new(8);
        surface.apply(PropertyEvent::CaptureModeChanged { mode: CaptureMode::Video });
        assert_eq!(surface.capture_mode(), CaptureMode::Video);
        assert_eq!(surface.watch().borrow().capture_mode, CaptureMode::Video);
    }

    #[test]
    fn test_events_delivered_in_order() {
        let surface = PropertySurface::new(8);
        let mut rx = surface.subscribe();

        let sequence = [
            CaptureActivity::Idle,
            CaptureActivity::MovieCapture { duration_secs: 0.0 },
            CaptureActivity::Idle,
        ];
        for activity in sequence.clone() {
            surface.apply(PropertyEvent::ActivityChanged { activity });
        }

        for expected in sequence {
            let event = rx.try_recv().unwrap();
            assert_eq!(event, PropertyEvent::ActivityChanged { activity: expected });
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_thumbnail_replaced_wholesale() {
        let surface = PropertySurface::new(8);
        for id in ["a", "b"] {
            surface.apply(PropertyEvent::ThumbnailChanged {
                thumbnail: Thumbnail {
                    asset_id: id.into(),
                    width: 64,
                    height: 48,
                },
            });
        }
        assert_eq!(surface.snapshot().thumbnail.unwrap().asset_id, "b");
    }

    #[test]
    fn test_flag_guard_releases_on_drop() {
        let surface = PropertySurface::new(8);
        {
            let _guard = FlagGuard::raise(&surface, Flag::SwitchingVideoDevices);
            assert!(surface.snapshot().is_switching_video_devices);
        }
        assert!(!surface.snapshot().is_switching_video_devices);
    }

    #[tokio::test]
    async fn test_flag_guard_releases_on_cancel() {
        let surface = PropertySurface::new(8);
        let task_surface = surface.clone();
        let handle = tokio::spawn(async move {
            let _guard = FlagGuard::raise(&task_surface, Flag::SwitchingModes);
            std::future::pending::<()>().await;
        });

        let mut rx = surface.watch();
        rx.wait_for(|p| p.is_switching_modes).await.unwrap();

        handle.abort();
        let _ = handle.await;
        assert!(!surface.snapshot().is_switching_modes);
    }

    #[tokio::test]
    async fn test_flash_screen_pulses_once() {
        let surface = PropertySurface::new(8);
        let mut rx = surface.subscribe();

        surface.flash_screen(Duration::from_millis(5));
        assert!(surface.snapshot().should_flash_screen);

        assert_eq!(rx.recv().await.unwrap(), PropertyEvent::FlashScreen { on: true });
        assert_eq!(rx.recv().await.unwrap(), PropertyEvent::FlashScreen { on: false });
        assert!(!surface.snapshot().should_flash_screen);
    }
}
