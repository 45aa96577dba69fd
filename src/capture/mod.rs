//! Seams to the capture subsystem and the media library
//!
//! The controller is the only caller of these traits. Event sources are
//! exposed as streams that deliver values in emission order.

mod library;
mod simulated;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::sync::{broadcast, watch};
use tracing::warn;

use crate::error::CameraError;
use crate::model::{
    CameraPreferences, CaptureActivity, CaptureCapabilities, CaptureMode, FocusPoint, Movie,
    Photo, PhotoFeatures, PreviewSource, Thumbnail,
};

pub use library::DirectoryLibrary;
pub use simulated::SimulatedCamera;

/// Hardware capture session driver
#[async_trait]
pub trait CaptureService: Send + Sync {
    async fn is_authorized(&self) -> bool;

    /// Configure and start the session from the stored preferences
    async fn start(&self, preferences: &CameraPreferences) -> Result<(), CameraError>;

    async fn set_capture_mode(&self, mode: CaptureMode) -> Result<(), CameraError>;

    /// Cycle to the next available video device
    async fn select_next_video_device(&self);

    async fn capture_photo(&self, features: PhotoFeatures) -> Result<Photo, CameraError>;

    async fn start_recording(&self);

    async fn stop_recording(&self) -> Result<Movie, CameraError>;

    async fn set_hdr_video_enabled(&self, enabled: bool);

    async fn focus_and_expose(&self, point: FocusPoint);

    /// Current activity, read on demand
    async fn capture_activity(&self) -> CaptureActivity;

    fn activity_updates(&self) -> BoxStream<'static, CaptureActivity>;

    fn capability_updates(&self) -> BoxStream<'static, CaptureCapabilities>;

    fn fullscreen_controls_updates(&self) -> BoxStream<'static, bool>;

    fn preview_source(&self) -> PreviewSource;
}

/// Durable storage for captured media
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    async fn save_photo(&self, photo: Photo) -> Result<(), CameraError>;

    async fn save_movie(&self, movie: Movie) -> Result<(), CameraError>;

    /// Preview of the most recently saved asset; `None` when there is none
    fn thumbnails(&self) -> BoxStream<'static, Option<Thumbnail>>;
}

/// Event source that keeps its current value for on-demand reads and
/// queues every emission for subscribers, so none is overwritten before it
/// is observed
pub(crate) struct EventFeed<T> {
    current: watch::Sender<T>,
    updates: broadcast::Sender<T>,
}

impl<T> EventFeed<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(initial: T, capacity: usize) -> Self {
        let (current, _) = watch::channel(initial);
        let (updates, _) = broadcast::channel(capacity.max(1));
        Self { current, updates }
    }

    pub fn publish(&self, value: T) {
        self.current.send_replace(value.clone());
        let _ = self.updates.send(value);
    }

    pub fn current(&self) -> T {
        self.current.borrow().clone()
    }

    /// Current value first, then every later emission in order
    pub fn stream(&self) -> BoxStream<'static, T> {
        // Subscribe before reading so nothing published in between is missed
        let rx = self.updates.subscribe();
        let current = self.current();
        Box::pin(async_stream::stream! {
            yield current;
            let mut rx = rx;
            loop {
                match rx.recv().await {
                    Ok(value) => yield value,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "event feed subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
