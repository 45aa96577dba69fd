//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications for
//! property changes to subscribed clients.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::controller::CameraController;
use crate::events::PropertyEvent;

use super::protocol::{Notification, Request, Response, MAX_FRAME_LEN};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    controller: CameraController,
    shutdown_tx: broadcast::Sender<()>,
}

/// A frame read from a client, parsed or not
type Incoming = std::result::Result<Request, String>;

impl Server {
    /// Bind the socket and prepare to serve `controller`
    pub fn new(socket_path: &Path, controller: CameraController) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            controller,
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let controller = self.controller.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, controller) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection.
    ///
    /// Reads, writes and notifications each run in their own task, so
    /// property changes keep flowing while a slow request is being served.
    async fn handle_client(stream: UnixStream, controller: CameraController) -> Result<()> {
        let (reader, writer) = stream.into_split();
        let (request_tx, mut requests) = mpsc::channel(16);
        let (outgoing, frames) = mpsc::unbounded_channel();
        let _reader = ClientTask(tokio::spawn(read_requests(reader, request_tx)));
        let _writer = ClientTask(tokio::spawn(write_frames(writer, frames)));
        let mut notifier: Option<ClientTask> = None;

        while let Some(incoming) = requests.recv().await {
            let request = match incoming {
                Ok(request) => request,
                Err(message) => {
                    if !queue(&outgoing, &Response::error("invalid_request", message))? {
                        break;
                    }
                    continue;
                }
            };
            debug!(?request, "received request");

            // Subscribe before confirming so no change after the
            // confirmation is missed
            let events = (request == Request::Subscribe && notifier.is_none())
                .then(|| controller.subscribe());

            let response = Self::process_request(request, &controller).await;
            if !queue(&outgoing, &response)? {
                break;
            }

            if let Some(events) = events {
                debug!("client subscribed to notifications");
                notifier = Some(ClientTask(tokio::spawn(forward_notifications(
                    events,
                    outgoing.clone(),
                ))));
            }
        }

        debug!("client disconnected");
        Ok(())
    }

    /// Process a request and return a response
    async fn process_request(request: Request, controller: &CameraController) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetProperties => Response::Properties(controller.properties()),

            Request::GetPreviewSource => Response::PreviewSource(controller.preview_source()),

            Request::Subscribe => Response::Subscribed,

            Request::Start => Response::Status {
                status: controller.start().await,
            },

            Request::SyncState => {
                controller.sync_state().await;
                Response::Ack
            }

            Request::SetCaptureMode { mode } => {
                info!(%mode, "capture mode requested via IPC");
                controller.set_capture_mode(mode);
                Response::Ack
            }

            Request::SwitchVideoDevices => {
                controller.switch_video_devices().await;
                Response::Ack
            }

            Request::CapturePhoto => {
                controller.capture_photo().await;
                Response::Ack
            }

            Request::ToggleRecording => {
                controller.toggle_recording().await;
                Response::Ack
            }

            Request::SetLivePhotoEnabled { enabled } => {
                controller.set_live_photo_enabled(enabled);
                Response::Ack
            }

            Request::SetQualityPrioritization { prioritization } => {
                controller.set_quality_prioritization(prioritization);
                Response::Ack
            }

            Request::SetHdrVideoEnabled { enabled } => {
                controller.set_hdr_video_enabled(enabled).await;
                Response::Ack
            }

            Request::FocusAndExpose { point } => {
                controller.focus_and_expose(point).await;
                Response::Ack
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Aborts a per-client task when its handler ends
struct ClientTask(JoinHandle<()>);

impl Drop for ClientTask {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Read frames until EOF, an oversized frame or a read error.
///
/// Runs in its own task so a frame is never abandoned half-read.
async fn read_requests<R>(mut reader: R, requests: mpsc::Sender<Incoming>)
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];

    loop {
        // Read message length (4-byte little-endian)
        match reader.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return,
            Err(e) => {
                warn!(?e, "failed to read from client");
                return;
            }
        }

        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_FRAME_LEN {
            warn!(len, "message too large, disconnecting");
            return;
        }

        // Read message body
        let mut msg_buf = vec![0u8; len];
        if let Err(e) = reader.read_exact(&mut msg_buf).await {
            warn!(?e, "client closed mid-message");
            return;
        }

        let incoming = serde_json::from_slice::<Request>(&msg_buf).map_err(|e| e.to_string());
        if requests.send(incoming).await.is_err() {
            return;
        }
    }
}

/// Push every property change to the client until it goes away
async fn forward_notifications(
    mut events: broadcast::Receiver<PropertyEvent>,
    outgoing: mpsc::UnboundedSender<Vec<u8>>,
) {
    loop {
        match events.recv().await {
            Ok(event) => {
                let notification = Notification::PropertyChanged { event };
                match queue(&outgoing, &notification) {
                    Ok(true) => {}
                    Ok(false) => return,
                    Err(e) => {
                        error!(?e, "failed to encode notification");
                        return;
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(skipped = n, "subscriber lagged, property events dropped");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Write queued frames in order until the queue closes or the socket fails
async fn write_frames<W>(mut writer: W, mut frames: mpsc::UnboundedReceiver<Vec<u8>>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = frames.recv().await {
        if let Err(e) = writer.write_all(&frame).await {
            warn!(?e, "failed to write to client");
            return;
        }
    }
}

/// Queue a message for the writer. `Ok(false)` once the writer is gone.
fn queue<T: serde::Serialize>(outgoing: &mpsc::UnboundedSender<Vec<u8>>, msg: &T) -> Result<bool> {
    Ok(outgoing.send(encode_frame(msg)?).is_ok())
}

/// Length-prefixed JSON frame
fn encode_frame<T: serde::Serialize>(msg: &T) -> Result<Vec<u8>> {
    let msg_bytes = serde_json::to_vec(msg)?;
    let mut frame = Vec::with_capacity(4 + msg_bytes.len());
    frame.extend_from_slice(&(msg_bytes.len() as u32).to_le_bytes());
    frame.extend_from_slice(&msg_bytes);
    Ok(frame)
}
