//! Capture event multiplexer
//!
//! One forwarding task per event source. Each task maps incoming values
//! onto the property surface (and the preference mirror where relevant).
//! Within a source, values are applied in emission order; sources are
//! independent of one another. All tasks of a session stop together.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::capture::{CaptureService, MediaLibrary};
use crate::events::PropertyEvent;
use crate::model::{CaptureActivity, CaptureCapabilities, CaptureMode, Thumbnail};
use crate::preferences::PreferenceMirror;
use crate::state::PropertySurface;

use super::mode_switch::ModeSwitcher;

/// Forwarding tasks belonging to one running session
pub(crate) struct ObservationTasks {
    shutdown: broadcast::Sender<()>,
    handles: Vec<JoinHandle<()>>,
}

impl ObservationTasks {
    /// Stop every task and wait for them to finish
    pub async fn cancel(self) {
        let _ = self.shutdown.send(());
        for handle in self.handles {
            if let Err(e) = handle.await {
                if e.is_panic() {
                    error!(?e, "forwarding task panicked");
                }
            }
        }
        debug!("capture event forwarding stopped");
    }
}

pub(crate) struct Multiplexer {
    pub capture: Arc<dyn CaptureService>,
    pub library: Arc<dyn MediaLibrary>,
    pub surface: PropertySurface,
    pub preferences: PreferenceMirror,
    pub mode_requests: watch::Receiver<CaptureMode>,
    pub flash_duration: Duration,
}

impl Multiplexer {
    pub fn launch(self) -> ObservationTasks {
        let (shutdown, _) = broadcast::channel(1);
        let mut handles = Vec::with_capacity(5);

        let surface = self.surface.clone();
        handles.push(forward(
            "thumbnails",
            self.library.thumbnails(),
            shutdown.subscribe(),
            move |thumbnail: Option<Thumbnail>| {
                if let Some(thumbnail) = thumbnail {
                    surface.apply(PropertyEvent::ThumbnailChanged { thumbnail });
                }
            },
        ));

        let surface = self.surface.clone();
        let flash_duration = self.flash_duration;
        handles.push(forward(
            "activity",
            self.capture.activity_updates(),
            shutdown.subscribe(),
            move |activity: CaptureActivity| {
                if activity.will_capture() {
                    debug!(live_photo = activity.is_live_photo(), "shutter");
                    surface.flash_screen(flash_duration);
                } else {
                    surface.apply(PropertyEvent::ActivityChanged { activity });
                }
            },
        ));

        let surface = self.surface.clone();
        let preferences = self.preferences.clone();
        handles.push(forward(
            "capabilities",
            self.capture.capability_updates(),
            shutdown.subscribe(),
            move |capabilities: CaptureCapabilities| {
                let supported = capabilities.is_hdr_supported;
                surface.apply(PropertyEvent::HdrVideoSupported { supported });
                preferences.update(|p| p.is_video_hdr_supported = supported);
            },
        ));

        let surface = self.surface.clone();
        handles.push(forward(
            "fullscreen_controls",
            self.capture.fullscreen_controls_updates(),
            shutdown.subscribe(),
            move |showing: bool| {
                surface.apply(PropertyEvent::PrefersMinimizedUi { minimized: showing });
            },
        ));

        let switcher = ModeSwitcher {
            capture: self.capture,
            surface: self.surface,
            preferences: self.preferences,
            requests: self.mode_requests,
        };
        handles.push(tokio::spawn(switcher.run(shutdown.subscribe())));

        info!(tasks = handles.len(), "capture event forwarding started");
        ObservationTasks { shutdown, handles }
    }
}

/// Drain `updates` into `on_value` until the source ends or the session stops
fn forward<T, F>(
    source: &'static str,
    mut updates: BoxStream<'static, T>,
    mut shutdown: broadcast::Receiver<()>,
    mut on_value: F,
) -> JoinHandle<()>
where
    T: Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    tokio::spawn(async move {
        debug!(source, "forwarding started");
        loop {
            tokio::select! {
                next = updates.next() => match next {
                    Some(value) => on_value(value),
                    None => {
                        debug!(source, "event source ended");
                        break;
                    }
                },
                _ = shutdown.recv() => break,
            }
        }
        debug!(source, "forwarding stopped");
    })
}
