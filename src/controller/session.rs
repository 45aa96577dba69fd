//! Camera session controller
//!
//! Entry point for every user action. Actions run against the capture
//! subsystem only while the session is running; everything they change is
//! published through the property surface.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::capture::{CaptureService, MediaLibrary};
use crate::error::CameraError;
use crate::events::PropertyEvent;
use crate::model::{
    CameraPreferences, CaptureActivity, CaptureMode, FocusPoint, PhotoFeatures, PreviewSource,
    QualityPrioritization,
};
use crate::preferences::{PreferenceMirror, PreferenceStore};
use crate::state::{CameraProperties, Flag, FlagGuard, PropertySurface, SessionStatus};

use super::multiplexer::{Multiplexer, ObservationTasks};

/// Tunables for the controller
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// How long `should_flash_screen` stays raised for a shutter pulse
    pub flash_duration: Duration,
    /// Events buffered per lagging subscriber
    pub event_capacity: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            flash_duration: Duration::from_millis(10),
            event_capacity: 64,
        }
    }
}

struct ActiveSession {
    tasks: ObservationTasks,
    started_at: Instant,
}

struct Inner {
    capture: Arc<dyn CaptureService>,
    library: Arc<dyn MediaLibrary>,
    surface: PropertySurface,
    preferences: PreferenceMirror,
    /// Newest requested capture mode, consumed by the session's mode worker
    mode_requests: watch::Sender<CaptureMode>,
    /// Serializes start and stop
    session: Mutex<Option<ActiveSession>>,
    /// When the current status was entered
    status_since: parking_lot::Mutex<Instant>,
    flash_duration: Duration,
}

/// Shared handle to the session controller
#[derive(Clone)]
pub struct CameraController {
    inner: Arc<Inner>,
}

impl CameraController {
    pub fn new(
        capture: Arc<dyn CaptureService>,
        library: Arc<dyn MediaLibrary>,
        store: PreferenceStore,
        settings: ControllerSettings,
    ) -> Self {
        let (mode_requests, _) = watch::channel(CaptureMode::Photo);

        Self {
            inner: Arc::new(Inner {
                capture,
                library,
                surface: PropertySurface::new(settings.event_capacity),
                preferences: PreferenceMirror::new(store),
                mode_requests,
                session: Mutex::new(None),
                status_since: parking_lot::Mutex::new(Instant::now()),
                flash_duration: settings.flash_duration,
            }),
        }
    }

    // -- Observable surface --------------------------------------------------

    pub fn properties(&self) -> CameraProperties {
        self.inner.surface.snapshot()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.surface.status()
    }

    /// Latest-value view of the properties
    pub fn watch(&self) -> watch::Receiver<CameraProperties> {
        self.inner.surface.watch()
    }

    /// Every property change from now on, in order
    pub fn subscribe(&self) -> broadcast::Receiver<PropertyEvent> {
        self.inner.surface.subscribe()
    }

    /// In-memory copy of the persisted preferences
    pub fn preferences(&self) -> CameraPreferences {
        self.inner.preferences.snapshot()
    }

    pub fn preview_source(&self) -> PreviewSource {
        self.inner.capture.preview_source()
    }

    // -- Lifecycle -----------------------------------------------------------

    /// Start the capture session.
    ///
    /// Results in exactly one of unauthorized, failed or running. Calling it
    /// again once started returns the current status without side effects.
    pub async fn start(&self) -> SessionStatus {
        let mut session = self.inner.session.lock().await;

        let status = self.status();
        if status != SessionStatus::Unknown {
            warn!(%status, "start ignored, session already started");
            return status;
        }

        if !self.inner.capture.is_authorized().await {
            warn!("camera access is not authorized");
            self.transition_to(SessionStatus::Unauthorized);
            return SessionStatus::Unauthorized;
        }

        self.sync_state().await;
        let preferences = self.inner.preferences.snapshot();

        if let Err(e) = self.inner.capture.start(&preferences).await {
            error!(error = %e, "failed to start capture service");
            self.transition_to(SessionStatus::Failed);
            return SessionStatus::Failed;
        }

        let tasks = Multiplexer {
            capture: Arc::clone(&self.inner.capture),
            library: Arc::clone(&self.inner.library),
            surface: self.inner.surface.clone(),
            preferences: self.inner.preferences.clone(),
            mode_requests: self.inner.mode_requests.subscribe(),
            flash_duration: self.inner.flash_duration,
        }
        .launch();

        *session = Some(ActiveSession {
            tasks,
            started_at: Instant::now(),
        });
        self.transition_to(SessionStatus::Running);

        info!(mode = %preferences.capture_mode, "capture session running");
        SessionStatus::Running
    }

    /// Cancel event forwarding and drain pending preference writes.
    /// A running session returns to unknown and may be started again.
    pub async fn stop(&self) {
        let mut session = self.inner.session.lock().await;

        if let Some(active) = session.take() {
            active.tasks.cancel().await;
            info!(
                uptime_ms = active.started_at.elapsed().as_millis() as u64,
                "capture session stopped"
            );
            self.transition_to(SessionStatus::Unknown);
        }

        self.inner.preferences.flush().await;
    }

    /// Re-read stored preferences and republish them.
    ///
    /// While running, a mode or HDR value changed elsewhere is also applied
    /// to the capture subsystem.
    pub async fn sync_state(&self) {
        let previous = self.inner.surface.snapshot();
        let preferences = self.inner.preferences.reload().await;

        let surface = &self.inner.surface;
        surface.apply(PropertyEvent::CaptureModeChanged {
            mode: preferences.capture_mode,
        });
        surface.apply(PropertyEvent::QualityPrioritizationChanged {
            prioritization: preferences.quality_prioritization,
        });
        surface.apply(PropertyEvent::LivePhotoChanged {
            enabled: preferences.is_live_photo_enabled,
        });
        surface.apply(PropertyEvent::HdrVideoChanged {
            enabled: preferences.is_video_hdr_enabled,
        });
        debug!(?preferences, "preferences synchronized");

        if !self.status().accepts_actions() {
            return;
        }

        if preferences.capture_mode != previous.capture_mode {
            info!(mode = %preferences.capture_mode, "stored capture mode changed, reapplying");
            self.inner.mode_requests.send_replace(preferences.capture_mode);
        }

        if preferences.capture_mode == CaptureMode::Video
            && preferences.is_video_hdr_enabled != previous.is_hdr_video_enabled
        {
            self.apply_hdr(preferences.is_video_hdr_enabled).await;
        }
    }

    // -- Modes and devices ---------------------------------------------------

    /// Publish the new mode and, while running, request reconfiguration.
    /// Returns before the capture subsystem has switched.
    pub fn set_capture_mode(&self, mode: CaptureMode) {
        self.inner
            .surface
            .apply(PropertyEvent::CaptureModeChanged { mode });

        if !self.status().accepts_actions() {
            debug!(%mode, "capture mode recorded, session not running");
            return;
        }
        self.inner.mode_requests.send_replace(mode);
    }

    pub async fn switch_video_devices(&self) {
        if !self.ensure_running("switch video devices") {
            return;
        }

        let _switching = FlagGuard::raise(&self.inner.surface, Flag::SwitchingVideoDevices);
        self.inner.capture.select_next_video_device().await;
    }

    pub async fn focus_and_expose(&self, point: FocusPoint) {
        if !self.ensure_running("focus and expose") {
            return;
        }
        self.inner.capture.focus_and_expose(point.clamped()).await;
    }

    // -- Photo capture -------------------------------------------------------

    /// Capture a photo with the current preferences and save it
    pub async fn capture_photo(&self) {
        if !self.ensure_running("capture photo") {
            return;
        }

        let props = self.inner.surface.snapshot();
        let features = PhotoFeatures {
            is_live_photo_enabled: props.is_live_photo_enabled,
            quality_prioritization: props.quality_prioritization,
        };

        let result = match self.inner.capture.capture_photo(features).await {
            Ok(photo) => self.inner.library.save_photo(photo).await,
            Err(e) => Err(e),
        };
        self.record_outcome("capture photo", result);
    }

    pub fn set_live_photo_enabled(&self, enabled: bool) {
        self.inner
            .surface
            .apply(PropertyEvent::LivePhotoChanged { enabled });
        self.inner
            .preferences
            .update(|p| p.is_live_photo_enabled = enabled);
    }

    pub fn set_quality_prioritization(&self, prioritization: QualityPrioritization) {
        self.inner
            .surface
            .apply(PropertyEvent::QualityPrioritizationChanged { prioritization });
        self.inner
            .preferences
            .update(|p| p.quality_prioritization = prioritization);
    }

    // -- Video capture -------------------------------------------------------

    /// Publish the HDR choice; apply it only to a running video session
    pub async fn set_hdr_video_enabled(&self, enabled: bool) {
        self.inner
            .surface
            .apply(PropertyEvent::HdrVideoChanged { enabled });

        if !self.status().accepts_actions() || self.inner.surface.capture_mode() != CaptureMode::Video
        {
            debug!(enabled, "HDR video recorded, not applied outside a running video session");
            return;
        }
        self.apply_hdr(enabled).await;
    }

    /// Stop and save an in-progress recording, otherwise start one
    pub async fn toggle_recording(&self) {
        if !self.ensure_running("toggle recording") {
            return;
        }

        match self.inner.capture.capture_activity().await {
            CaptureActivity::MovieCapture { .. } => {
                let result = match self.inner.capture.stop_recording().await {
                    Ok(movie) => self.inner.library.save_movie(movie).await,
                    Err(e) => Err(e),
                };
                self.record_outcome("stop recording", result);
            }
            _ => self.inner.capture.start_recording().await,
        }
    }

    // -- Internals -----------------------------------------------------------

    async fn apply_hdr(&self, enabled: bool) {
        self.inner.capture.set_hdr_video_enabled(enabled).await;
        self.inner
            .preferences
            .update(|p| p.is_video_hdr_enabled = enabled);
        info!(enabled, "HDR video applied");
    }

    fn ensure_running(&self, action: &'static str) -> bool {
        let status = self.status();
        if status.accepts_actions() {
            true
        } else {
            debug!(action, %status, "action ignored, session not running");
            false
        }
    }

    /// The latest action outcome replaces the surfaced error
    fn record_outcome(&self, action: &'static str, result: Result<(), CameraError>) {
        match result {
            Ok(()) => {
                if self.inner.surface.has_error() {
                    self.inner
                        .surface
                        .apply(PropertyEvent::ErrorChanged { error: None });
                }
            }
            Err(e) => {
                warn!(action, error = %e, "action failed");
                self.inner
                    .surface
                    .apply(PropertyEvent::ErrorChanged { error: Some(e) });
            }
        }
    }

    fn transition_to(&self, next: SessionStatus) {
        let current = self.status();
        if current == next {
            return;
        }
        if !current.can_transition_to(next) {
            warn!(from = %current, to = %next, "invalid status transition ignored");
            return;
        }

        let elapsed = {
            let mut since = self.inner.status_since.lock();
            let elapsed = since.elapsed();
            *since = Instant::now();
            elapsed
        };
        info!(
            from = %current,
            to = %next,
            after_ms = elapsed.as_millis() as u64,
            "session status transition"
        );
        self.inner
            .surface
            .apply(PropertyEvent::StatusChanged { status: next });
    }
}
