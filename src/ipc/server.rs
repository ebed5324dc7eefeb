//! Unix domain socket server for the control channel
//!
//! Provides request-response communication and push notifications of
//! toggle events to subscribed clients.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, error, info, warn};

use crate::app::{AppEvent, ControlCommand, EventSink};
use crate::events::ToggleEvent;

use super::codec::{read_frame, write_frame, FrameError};
use super::protocol::{Notification, Request, Response, Status};

/// Control socket server
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    shared: Arc<Shared>,
    shutdown_tx: broadcast::Sender<()>,
}

/// State shared with client handlers
struct Shared {
    state: RwLock<ServerState>,
    events_tx: broadcast::Sender<ToggleEvent>,
    sink: Arc<dyn EventSink>,
}

struct ServerState {
    status: Status,
    start_time: Instant,
}

/// A parsed request, or why the frame could not be parsed
type Incoming = std::result::Result<Request, String>;

impl Server {
    /// Bind the control socket
    pub fn new(
        socket_path: &Path,
        events_tx: broadcast::Sender<ToggleEvent>,
        sink: Arc<dyn EventSink>,
        status: Status,
    ) -> Result<Self> {
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
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "control socket listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            shared: Arc::new(Shared {
                state: RwLock::new(ServerState {
                    status,
                    start_time: Instant::now(),
                }),
                events_tx,
                sink,
            }),
            shutdown_tx,
        })
    }

    pub async fn set_hotkey_active(&self, active: bool) {
        self.shared.state.write().await.status.hotkey_active = active;
    }

    pub async fn status(&self) -> Status {
        self.shared.status().await
    }

    /// Keep the status in sync with the toggle until the channel closes
    pub async fn track_events(&self, mut events: broadcast::Receiver<ToggleEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let visible = event.visible_after();
                    let mut state = self.shared.state.write().await;
                    if state.status.visible != visible {
                        debug!(%event, visible, "control socket: visibility updated");
                    }
                    state.status.visible = visible;
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "toggle event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = Arc::clone(&self.shared);
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, shared) => {
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

    /// Handle a single client connection
    async fn handle_client(stream: UnixStream, shared: Arc<Shared>) -> Result<()> {
        let (reader, mut writer) = stream.into_split();

        // Frames are read on their own task so a half-read frame is never
        // dropped when a notification wins the select below
        let (request_tx, request_rx) = mpsc::channel::<Incoming>(8);
        let read_task = tokio::spawn(read_requests(reader, request_tx));

        let result = Self::serve_connection(&mut writer, request_rx, &shared).await;

        read_task.abort();
        result
    }

    /// Answer requests and, once subscribed, push toggle events
    async fn serve_connection(
        writer: &mut OwnedWriteHalf,
        mut request_rx: mpsc::Receiver<Incoming>,
        shared: &Shared,
    ) -> Result<()> {
        let mut events: Option<broadcast::Receiver<ToggleEvent>> = None;

        loop {
            tokio::select! {
                incoming = request_rx.recv() => {
                    let Some(incoming) = incoming else {
                        debug!("client disconnected");
                        return Ok(());
                    };

                    let response = match incoming {
                        Ok(request) => {
                            debug!(?request, "received request");
                            shared.process_request(request).await
                        }
                        Err(reason) => Response::error("bad_request", reason),
                    };

                    if response == Response::Subscribed && events.is_none() {
                        events = Some(shared.events_tx.subscribe());
                        debug!("client subscribed to notifications");
                    }

                    write_frame(writer, &response).await?;
                }

                event = next_event(&mut events) => match event {
                    Ok(event) => {
                        write_frame(writer, &Notification::Notification { event }).await?;
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "subscriber lagged, notifications dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        events = None;
                    }
                },
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

        info!("control socket shutdown complete");
    }
}

impl Shared {
    async fn status(&self) -> Status {
        let state = self.state.read().await;
        let mut status = state.status.clone();
        status.uptime_secs = state.start_time.elapsed().as_secs();
        status
    }

    /// Process a request and return a response
    async fn process_request(&self, request: Request) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => Response::Status(self.status().await),

            Request::Show => self.forward(ControlCommand::Show),

            Request::Hide => self.forward(ControlCommand::Hide),

            Request::Subscribe => Response::Subscribed,
        }
    }

    fn forward(&self, command: ControlCommand) -> Response {
        if self.sink.send(AppEvent::Control(command)) {
            info!(?command, "control request forwarded");
            Response::Accepted
        } else {
            Response::error("unavailable", "event loop is not running")
        }
    }
}

async fn next_event(
    events: &mut Option<broadcast::Receiver<ToggleEvent>>,
) -> std::result::Result<ToggleEvent, broadcast::error::RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Read frames until EOF, handing parsed requests to the connection loop
async fn read_requests(mut reader: OwnedReadHalf, request_tx: mpsc::Sender<Incoming>) {
    loop {
        let incoming = match read_frame(&mut reader).await {
            Ok(Some(body)) => serde_json::from_slice::<Request>(&body).map_err(|e| e.to_string()),
            Ok(None) => return,
            Err(FrameError::TooLarge(len)) => {
                warn!(len, "message too large, disconnecting");
                return;
            }
            Err(e) => {
                debug!(%e, "read error, disconnecting");
                return;
            }
        };

        if request_tx.send(incoming).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Trigger;
    use crate::ipc::client;
    use tempfile::TempDir;

    struct Harness {
        _dir: TempDir,
        socket_path: PathBuf,
        server: Arc<Server>,
        events_tx: broadcast::Sender<ToggleEvent>,
        app_rx: mpsc::UnboundedReceiver<AppEvent>,
    }

    fn start() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("control.sock");
        let (events_tx, _) = broadcast::channel(16);
        let (app_tx, app_rx) = mpsc::unbounded_channel();

        let server = Arc::new(
            Server::new(
                &socket_path,
                events_tx.clone(),
                Arc::new(app_tx),
                Status::default(),
            )
            .unwrap(),
        );

        let running = Arc::clone(&server);
        tokio::spawn(async move { running.run().await });
        let tracking = Arc::clone(&server);
        let events_rx = events_tx.subscribe();
        tokio::spawn(async move { tracking.track_events(events_rx).await });

        Harness {
            _dir: dir,
            socket_path,
            server,
            events_tx,
            app_rx,
        }
    }

    #[tokio::test]
    async fn test_ping_and_status() {
        let h = start();

        let pong = client::request(&h.socket_path, &Request::Ping).await.unwrap();
        assert_eq!(pong, Response::Pong);

        h.server.set_hotkey_active(true).await;
        match client::request(&h.socket_path, &Request::GetStatus).await.unwrap() {
            Response::Status(status) => {
                assert!(status.hotkey_active);
                assert!(!status.visible);
                assert_eq!(status.version, env!("CARGO_PKG_VERSION"));
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stopped_listener_is_reported() {
        let h = start();
        h.server.set_hotkey_active(true).await;
        assert!(h.server.status().await.hotkey_active);

        h.server.set_hotkey_active(false).await;
        match client::request(&h.socket_path, &Request::GetStatus).await.unwrap() {
            Response::Status(status) => assert!(!status.hotkey_active),
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_show_and_hide_are_forwarded() {
        let mut h = start();

        let resp = client::request(&h.socket_path, &Request::Show).await.unwrap();
        assert_eq!(resp, Response::Accepted);
        assert_eq!(
            h.app_rx.recv().await,
            Some(AppEvent::Control(ControlCommand::Show))
        );

        client::request(&h.socket_path, &Request::Hide).await.unwrap();
        assert_eq!(
            h.app_rx.recv().await,
            Some(AppEvent::Control(ControlCommand::Hide))
        );
    }

    #[tokio::test]
    async fn test_show_without_event_loop() {
        let h = start();
        drop(h.app_rx);

        let resp = client::request(&h.socket_path, &Request::Show).await.unwrap();
        assert!(matches!(resp, Response::Error { ref code, .. } if code == "unavailable"));
    }

    #[tokio::test]
    async fn test_bad_request_keeps_connection() {
        let h = start();
        let mut stream = UnixStream::connect(&h.socket_path).await.unwrap();

        write_frame(&mut stream, &serde_json::json!({"type": "explode"}))
            .await
            .unwrap();
        let body = read_frame(&mut stream).await.unwrap().unwrap();
        let resp: Response = serde_json::from_slice(&body).unwrap();
        assert!(matches!(resp, Response::Error { ref code, .. } if code == "bad_request"));

        write_frame(&mut stream, &Request::Ping).await.unwrap();
        let body = read_frame(&mut stream).await.unwrap().unwrap();
        assert_eq!(serde_json::from_slice::<Response>(&body).unwrap(), Response::Pong);
    }

    #[tokio::test]
    async fn test_subscriber_receives_notifications() {
        let h = start();
        let mut stream = UnixStream::connect(&h.socket_path).await.unwrap();

        write_frame(&mut stream, &Request::Subscribe).await.unwrap();
        let body = read_frame(&mut stream).await.unwrap().unwrap();
        assert_eq!(
            serde_json::from_slice::<Response>(&body).unwrap(),
            Response::Subscribed
        );

        let event = ToggleEvent::PopupShown {
            trigger: Trigger::Hotkey,
        };
        h.events_tx.send(event.clone()).unwrap();

        let body = read_frame(&mut stream).await.unwrap().unwrap();
        let note: Notification = serde_json::from_slice(&body).unwrap();
        assert_eq!(note, Notification::Notification { event });
    }

    #[tokio::test]
    async fn test_status_follows_events() {
        let h = start();
        h.events_tx
            .send(ToggleEvent::PopupShown {
                trigger: Trigger::Tray,
            })
            .unwrap();

        // Tracking runs on another task; poll until it catches up
        let mut visible = false;
        for _ in 0..50 {
            if h.server.status().await.visible {
                visible = true;
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(visible);
    }

    #[tokio::test]
    async fn test_shutdown_removes_socket() {
        let h = start();
        assert!(h.socket_path.exists());
        h.server.shutdown().await;
        assert!(!h.socket_path.exists());
    }
}
