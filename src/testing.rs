//! Test doubles for the capture subsystem, media library and preference
//! backend. Every fake records what it was asked to do.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::capture::{CaptureService, MediaLibrary};
use crate::controller::{CameraController, ControllerSettings};
use crate::error::CameraError;
use crate::model::{
    CameraPreferences, CaptureActivity, CaptureCapabilities, CaptureMode, FocusPoint, Movie,
    Photo, PhotoFeatures, PreviewSource, Thumbnail,
};
use crate::preferences::{PreferenceBackend, PreferenceStore, StoreError};
use crate::state::CameraProperties;

const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

fn broadcast_stream<T>(mut rx: broadcast::Receiver<T>) -> BoxStream<'static, T>
where
    T: Clone + Send + 'static,
{
    Box::pin(async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(value) => yield value,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Preference backend held in memory
#[derive(Default)]
pub struct MemoryPreferences {
    stored: Mutex<Option<CameraPreferences>>,
    writes: Mutex<Vec<CameraPreferences>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryPreferences {
    pub fn seed(&self, preferences: CameraPreferences) {
        *self.stored.lock() = Some(preferences);
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Every successful write, oldest first
    pub fn writes(&self) -> Vec<CameraPreferences> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl PreferenceBackend for MemoryPreferences {
    async fn read(&self) -> Result<Option<CameraPreferences>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("read refused").into());
        }
        Ok(self.stored.lock().clone())
    }

    async fn write(&self, preferences: &CameraPreferences) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("write refused").into());
        }
        *self.stored.lock() = Some(preferences.clone());
        self.writes.lock().push(preferences.clone());
        Ok(())
    }
}

/// A call made into the capture subsystem
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureCall {
    Start(CameraPreferences),
    SetCaptureMode(CaptureMode),
    SelectNextVideoDevice,
    CapturePhoto(PhotoFeatures),
    StartRecording,
    StopRecording,
    SetHdrVideoEnabled(bool),
    FocusAndExpose(FocusPoint),
}

pub struct FakeCapture {
    authorized: AtomicBool,
    start_error: Mutex<Option<CameraError>>,
    photo_error: Mutex<Option<CameraError>>,
    mode_error: Mutex<Option<CameraError>>,
    mode_delay: Mutex<Duration>,
    photo_delay: Mutex<Duration>,
    current_activity: Mutex<CaptureActivity>,
    calls: Mutex<Vec<CaptureCall>>,
    activity: broadcast::Sender<CaptureActivity>,
    capabilities: broadcast::Sender<CaptureCapabilities>,
    fullscreen_controls: broadcast::Sender<bool>,
}

impl Default for FakeCapture {
    fn default() -> Self {
        Self {
            authorized: AtomicBool::new(true),
            start_error: Mutex::new(None),
            photo_error: Mutex::new(None),
            mode_error: Mutex::new(None),
            mode_delay: Mutex::new(Duration::ZERO),
            photo_delay: Mutex::new(Duration::ZERO),
            current_activity: Mutex::new(CaptureActivity::Idle),
            calls: Mutex::new(Vec::new()),
            activity: broadcast::channel(64).0,
            capabilities: broadcast::channel(64).0,
            fullscreen_controls: broadcast::channel(64).0,
        }
    }
}

impl FakeCapture {
    pub fn deny_authorization(&self) {
        self.authorized.store(false, Ordering::SeqCst);
    }

    pub fn fail_start(&self, error: CameraError) {
        *self.start_error.lock() = Some(error);
    }

    pub fn fail_photo(&self, error: CameraError) {
        *self.photo_error.lock() = Some(error);
    }

    pub fn fail_mode(&self, error: CameraError) {
        *self.mode_error.lock() = Some(error);
    }

    pub fn set_mode_delay(&self, delay: Duration) {
        *self.mode_delay.lock() = delay;
    }

    pub fn set_photo_delay(&self, delay: Duration) {
        *self.photo_delay.lock() = delay;
    }

    /// Activity reported by `capture_activity`
    pub fn set_current_activity(&self, activity: CaptureActivity) {
        *self.current_activity.lock() = activity;
    }

    pub fn emit_activity(&self, activity: CaptureActivity) {
        let _ = self.activity.send(activity);
    }

    pub fn emit_capabilities(&self, capabilities: CaptureCapabilities) {
        let _ = self.capabilities.send(capabilities);
    }

    pub fn emit_fullscreen_controls(&self, showing: bool) {
        let _ = self.fullscreen_controls.send(showing);
    }

    pub fn calls(&self) -> Vec<CaptureCall> {
        self.calls.lock().clone()
    }

    pub fn mode_calls(&self) -> Vec<CaptureMode> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                CaptureCall::SetCaptureMode(mode) => Some(*mode),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: CaptureCall) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl CaptureService for FakeCapture {
    async fn is_authorized(&self) -> bool {
        self.authorized.load(Ordering::SeqCst)
    }

    async fn start(&self, preferences: &CameraPreferences) -> Result<(), CameraError> {
        self.record(CaptureCall::Start(preferences.clone()));
        match self.start_error.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn set_capture_mode(&self, mode: CaptureMode) -> Result<(), CameraError> {
        let delay = *self.mode_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.record(CaptureCall::SetCaptureMode(mode));
        match self.mode_error.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn select_next_video_device(&self) {
        self.record(CaptureCall::SelectNextVideoDevice);
    }

    async fn capture_photo(&self, features: PhotoFeatures) -> Result<Photo, CameraError> {
        self.record(CaptureCall::CapturePhoto(features));
        let delay = *self.photo_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match self.photo_error.lock().clone() {
            Some(error) => Err(error),
            None => Ok(Photo {
                data: vec![0xFF, 0xD8],
                live_photo_movie: None,
                is_proxy: false,
            }),
        }
    }

    async fn start_recording(&self) {
        self.record(CaptureCall::StartRecording);
    }

    async fn stop_recording(&self) -> Result<Movie, CameraError> {
        self.record(CaptureCall::StopRecording);
        Ok(Movie {
            path: "movie.mov".into(),
            duration_secs: 1.5,
        })
    }

    async fn set_hdr_video_enabled(&self, enabled: bool) {
        self.record(CaptureCall::SetHdrVideoEnabled(enabled));
    }

    async fn focus_and_expose(&self, point: FocusPoint) {
        self.record(CaptureCall::FocusAndExpose(point));
    }

    async fn capture_activity(&self) -> CaptureActivity {
        self.current_activity.lock().clone()
    }

    fn activity_updates(&self) -> BoxStream<'static, CaptureActivity> {
        broadcast_stream(self.activity.subscribe())
    }

    fn capability_updates(&self) -> BoxStream<'static, CaptureCapabilities> {
        broadcast_stream(self.capabilities.subscribe())
    }

    fn fullscreen_controls_updates(&self) -> BoxStream<'static, bool> {
        broadcast_stream(self.fullscreen_controls.subscribe())
    }

    fn preview_source(&self) -> PreviewSource {
        PreviewSource { id: "fake".into() }
    }
}

pub struct FakeLibrary {
    save_error: Mutex<Option<CameraError>>,
    photos: Mutex<Vec<Photo>>,
    movies: Mutex<Vec<Movie>>,
    thumbnails: broadcast::Sender<Option<Thumbnail>>,
}

impl Default for FakeLibrary {
    fn default() -> Self {
        Self {
            save_error: Mutex::new(None),
            photos: Mutex::new(Vec::new()),
            movies: Mutex::new(Vec::new()),
            thumbnails: broadcast::channel(64).0,
        }
    }
}

impl FakeLibrary {
    pub fn fail_saves(&self, error: CameraError) {
        *self.save_error.lock() = Some(error);
    }

    pub fn allow_saves(&self) {
        *self.save_error.lock() = None;
    }

    pub fn emit_thumbnail(&self, thumbnail: Option<Thumbnail>) {
        let _ = self.thumbnails.send(thumbnail);
    }

    pub fn photos(&self) -> Vec<Photo> {
        self.photos.lock().clone()
    }

    pub fn movies(&self) -> Vec<Movie> {
        self.movies.lock().clone()
    }
}

#[async_trait]
impl MediaLibrary for FakeLibrary {
    async fn save_photo(&self, photo: Photo) -> Result<(), CameraError> {
        if let Some(error) = self.save_error.lock().clone() {
            return Err(error);
        }
        self.photos.lock().push(photo);
        Ok(())
    }

    async fn save_movie(&self, movie: Movie) -> Result<(), CameraError> {
        if let Some(error) = self.save_error.lock().clone() {
            return Err(error);
        }
        self.movies.lock().push(movie);
        Ok(())
    }

    fn thumbnails(&self) -> BoxStream<'static, Option<Thumbnail>> {
        broadcast_stream(self.thumbnails.subscribe())
    }
}

/// A controller wired to fakes
pub struct Harness {
    pub capture: Arc<FakeCapture>,
    pub library: Arc<FakeLibrary>,
    pub backend: Arc<MemoryPreferences>,
    pub controller: CameraController,
}

impl Harness {
    /// Must be called inside a tokio runtime
    pub fn new() -> Self {
        let capture = Arc::new(FakeCapture::default());
        let library = Arc::new(FakeLibrary::default());
        let backend = Arc::new(MemoryPreferences::default());
        let store = PreferenceStore::spawn(backend.clone());
        let settings = ControllerSettings {
            flash_duration: Duration::from_millis(5),
            event_capacity: 256,
        };
        let controller = CameraController::new(capture.clone(), library.clone(), store, settings);

        Self {
            capture,
            library,
            backend,
            controller,
        }
    }

    /// Wait until the property snapshot satisfies `predicate`
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&CameraProperties) -> bool,
    ) -> CameraProperties {
        let mut rx = self.controller.watch();
        let props = tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(predicate))
            .await
            .expect("timed out waiting for properties")
            .expect("property surface closed");
        props.clone()
    }

    /// Poll until `condition` holds
    pub async fn eventually(&self, mut condition: impl FnMut() -> bool) {
        let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
        while !condition() {
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not met in time"
            );
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}
