//! In-process capture backend
//!
//! Behaves like a two-device camera without touching hardware: activity,
//! capability and control-visibility changes are emitted the way a real
//! session emits them, and recordings are written as files so the media
//! library has something to store.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::CameraError;
use crate::model::{
    CameraPreferences, CaptureActivity, CaptureCapabilities, CaptureMode, FocusPoint, Movie,
    Photo, PhotoFeatures, PreviewSource, QualityPrioritization,
};

use super::{CaptureService, EventFeed};

const VIDEO_DEVICES: [&str; 2] = ["back-wide", "front"];

/// Reconfiguration latency for mode and device switches
const RECONFIGURE_DELAY: Duration = Duration::from_millis(50);

const FEED_CAPACITY: usize = 32;

struct SessionState {
    running: bool,
    mode: CaptureMode,
    device_index: usize,
    hdr_enabled: bool,
    recording_started: Option<Instant>,
    next_clip: u64,
}

pub struct SimulatedCamera {
    authorized: bool,
    pending_dir: PathBuf,
    session: Mutex<SessionState>,
    activity: EventFeed<CaptureActivity>,
    capabilities: EventFeed<CaptureCapabilities>,
    fullscreen_controls: EventFeed<bool>,
}

impl SimulatedCamera {
    /// `pending_dir` receives finished recordings until the library moves them
    pub fn new(authorized: bool, pending_dir: PathBuf) -> Self {
        Self {
            authorized,
            pending_dir,
            session: Mutex::new(SessionState {
                running: false,
                mode: CaptureMode::Photo,
                device_index: 0,
                hdr_enabled: false,
                recording_started: None,
                next_clip: 1,
            }),
            activity: EventFeed::new(CaptureActivity::Idle, FEED_CAPACITY),
            capabilities: EventFeed::new(CaptureCapabilities::default(), FEED_CAPACITY),
            fullscreen_controls: EventFeed::new(false, FEED_CAPACITY),
        }
    }

    fn publish_capabilities(&self, mode: CaptureMode) {
        let capabilities = CaptureCapabilities {
            is_hdr_supported: mode == CaptureMode::Video,
        };
        self.capabilities.publish(capabilities);
    }

    fn next_clip(&self) -> u64 {
        let mut session = self.session.lock();
        let index = session.next_clip;
        session.next_clip += 1;
        index
    }

    fn ensure_running(&self) -> Result<(), CameraError> {
        if self.session.lock().running {
            Ok(())
        } else {
            Err(CameraError::ConfigurationFailed("session is not running".into()))
        }
    }
}

#[async_trait]
impl CaptureService for SimulatedCamera {
    async fn is_authorized(&self) -> bool {
        self.authorized
    }

    async fn start(&self, preferences: &CameraPreferences) -> Result<(), CameraError> {
        tokio::fs::create_dir_all(&self.pending_dir)
            .await
            .map_err(|e| CameraError::StartupFailed(e.to_string()))?;

        {
            let mut session = self.session.lock();
            session.running = true;
            session.mode = preferences.capture_mode;
            session.hdr_enabled =
                preferences.capture_mode == CaptureMode::Video && preferences.is_video_hdr_enabled;
        }
        self.publish_capabilities(preferences.capture_mode);

        info!(
            mode = %preferences.capture_mode,
            device = VIDEO_DEVICES[0],
            "simulated capture session started"
        );
        Ok(())
    }

    async fn set_capture_mode(&self, mode: CaptureMode) -> Result<(), CameraError> {
        self.ensure_running()?;
        if self.session.lock().recording_started.is_some() {
            return Err(CameraError::ConfigurationFailed(
                "cannot change mode while recording".into(),
            ));
        }

        tokio::time::sleep(RECONFIGURE_DELAY).await;
        self.session.lock().mode = mode;
        self.publish_capabilities(mode);
        debug!(%mode, "simulated capture mode applied");
        Ok(())
    }

    async fn select_next_video_device(&self) {
        tokio::time::sleep(RECONFIGURE_DELAY).await;
        let mut session = self.session.lock();
        session.device_index = (session.device_index + 1) % VIDEO_DEVICES.len();
        info!(device = VIDEO_DEVICES[session.device_index], "video device selected");
    }

    async fn capture_photo(&self, features: PhotoFeatures) -> Result<Photo, CameraError> {
        self.ensure_running()
            .map_err(|e| CameraError::PhotoCaptureFailed(e.to_string()))?;
        if self.session.lock().mode != CaptureMode::Photo {
            return Err(CameraError::PhotoCaptureFailed("not in photo mode".into()));
        }

        let is_live_photo = features.is_live_photo_enabled;
        self.activity.publish(CaptureActivity::PhotoCapture {
            will_capture: true,
            is_live_photo,
        });

        let exposure = match features.quality_prioritization {
            QualityPrioritization::Speed => Duration::from_millis(20),
            QualityPrioritization::Balanced => Duration::from_millis(50),
            QualityPrioritization::Quality => Duration::from_millis(80),
        };
        tokio::time::sleep(exposure).await;

        self.activity.publish(CaptureActivity::PhotoCapture {
            will_capture: false,
            is_live_photo,
        });
        self.activity.publish(CaptureActivity::Idle);

        let live_photo_movie = if is_live_photo {
            let path = self
                .pending_dir
                .join(format!("live-photo-{}.mov", self.next_clip()));
            tokio::fs::write(&path, b"simulated live photo")
                .await
                .map_err(|e| CameraError::PhotoCaptureFailed(e.to_string()))?;
            Some(path)
        } else {
            None
        };
        let photo = Photo {
            data: vec![0xFF, 0xD8, 0xFF, 0xD9],
            live_photo_movie,
            is_proxy: features.quality_prioritization == QualityPrioritization::Speed,
        };

        Ok(photo)
    }

    async fn start_recording(&self) {
        let hdr = {
            let mut session = self.session.lock();
            if !session.running || session.mode != CaptureMode::Video {
                warn!(mode = %session.mode, "recording requires a running video session");
                return;
            }
            if session.recording_started.is_some() {
                warn!("recording already in progress");
                return;
            }
            session.recording_started = Some(Instant::now());
            session.hdr_enabled
        };

        self.activity
            .publish(CaptureActivity::MovieCapture { duration_secs: 0.0 });
        self.fullscreen_controls.publish(true);
        info!(hdr, "simulated recording started");
    }

    async fn stop_recording(&self) -> Result<Movie, CameraError> {
        let started = self
            .session
            .lock()
            .recording_started
            .take()
            .ok_or_else(|| CameraError::RecordingFailed("no recording in progress".into()))?;
        let index = self.next_clip();

        self.activity.publish(CaptureActivity::Idle);
        self.fullscreen_controls.publish(false);

        let duration_secs = started.elapsed().as_secs_f64();
        let path = self.pending_dir.join(format!("movie-{index}.mov"));
        tokio::fs::write(&path, b"simulated movie")
            .await
            .map_err(|e| CameraError::RecordingFailed(e.to_string()))?;

        info!(?path, duration_secs, "simulated recording stopped");
        Ok(Movie {
            path,
            duration_secs,
        })
    }

    async fn set_hdr_video_enabled(&self, enabled: bool) {
        self.session.lock().hdr_enabled = enabled;
        debug!(enabled, "simulated HDR video toggled");
    }

    async fn focus_and_expose(&self, point: FocusPoint) {
        let point = point.clamped();
        debug!(x = point.x, y = point.y, "focus and exposure point set");
    }

    async fn capture_activity(&self) -> CaptureActivity {
        self.activity.current()
    }

    fn activity_updates(&self) -> BoxStream<'static, CaptureActivity> {
        self.activity.stream()
    }

    fn capability_updates(&self) -> BoxStream<'static, CaptureCapabilities> {
        self.capabilities.stream()
    }

    fn fullscreen_controls_updates(&self) -> BoxStream<'static, bool> {
        self.fullscreen_controls.stream()
    }

    fn preview_source(&self) -> PreviewSource {
        let device = VIDEO_DEVICES[self.session.lock().device_index];
        PreviewSource {
            id: format!("simulated:{device}"),
        }
    }
}
