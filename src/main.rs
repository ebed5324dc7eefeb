//! layout-hint: tray utility that pops up window-layout suggestions
//!
//! Holding Alt and pressing the backquote key shows a popup webview with
//! a few layout suggestions; releasing Alt hides it again.
//!
//! Threads:
//! - main: tao event loop owning the popup, the tray and the toggle
//! - hotkey-listener: global keyboard listener (rdev)
//! - tokio runtime: control socket, signals, auto-close timers
//!
//! Without a subcommand the app runs; `show`, `hide`, `status` and
//! `watch` talk to a running instance over the control socket (Unix only).

mod app;
mod config;
mod events;
mod hotkey;
#[cfg(unix)]
mod ipc;
mod lifecycle;
mod popup;
mod state;
mod suggest;
mod tray;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tao::event::{Event, StartCause, WindowEvent};
use tao::event_loop::{ControlFlow, EventLoopBuilder};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::{App, AppEvent, EventSink, Flow, ProxySink};
use crate::config::Config;
use crate::events::ToggleEvent;
use crate::hotkey::{Hotkey, HotkeyListener, ReleaseRegistry};
#[cfg(unix)]
use crate::{
    hotkey::HotkeyEvent,
    ipc::{client, Request, Server, Status},
};
use crate::lifecycle::ShutdownSignal;
use crate::popup::WebviewPopup;
use crate::state::{TokioDismissTimer, Toggle};
use crate::suggest::RandomSuggestions;
use crate::tray::Tray;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show the popup of a running instance
    Show,
    /// Hide the popup of a running instance
    Hide,
    /// Print the status of a running instance
    Status,
    /// Print toggle events of a running instance as JSON lines
    Watch,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = Config::load()?;

    match cli.command {
        None => run(config),
        Some(command) => run_client(&config, command),
    }
}

#[cfg(not(unix))]
fn run_client(_config: &Config, command: Command) -> Result<()> {
    anyhow::bail!("`{:?}` needs the control socket, which is only available on Unix", command)
}

#[cfg(unix)]
fn run_client(config: &Config, command: Command) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    runtime.block_on(async {
        let socket = &config.socket_path;
        let request = match command {
            Command::Show => Request::Show,
            Command::Hide => Request::Hide,
            Command::Status => Request::GetStatus,
            Command::Watch => {
                return client::watch(socket, |event| match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!(%e, "failed to encode event"),
                })
                .await;
            }
        };

        let response = client::request(socket, &request).await?;
        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok::<(), anyhow::Error>(())
    })
}

fn run(config: Config) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        "layout-hint starting"
    );
    info!(?config.socket_path, ?config.dismiss, "configuration loaded");
    config.ensure_dirs()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("layout-hint-rt")
        .enable_all()
        .build()
        .context("failed to start tokio runtime")?;

    let event_loop = EventLoopBuilder::<AppEvent>::with_user_event().build();
    let sink: Arc<dyn EventSink> = Arc::new(ProxySink::new(event_loop.create_proxy()));

    // Toggle -> control socket (status tracking and subscribers)
    let (event_tx, _) = broadcast::channel::<ToggleEvent>(64);

    // Popup surface, created once and reused
    let popup = WebviewPopup::open(&event_loop, Some(config.popup_size), Arc::clone(&sink))
        .context("failed to create popup surface")?;

    // Toggle
    let registry = ReleaseRegistry::new();
    let mut toggle = Toggle::new(popup, registry.clone(), event_tx.clone())
        .with_title(&config.popup_title)
        .with_suggestions(Box::new(RandomSuggestions::new(config.suggestions)));
    if let Some(delay) = config.auto_close() {
        let timer = TokioDismissTimer::new(runtime.handle().clone(), Arc::clone(&sink));
        toggle = toggle.with_auto_close(delay, Box::new(timer));
        info!(delay_ms = delay.as_millis() as u64, "auto-close mode enabled");
    }
    let dismiss = toggle.dismiss_policy();
    let mut app = App::new(toggle);

    // Hotkey listener (runs on dedicated thread)
    let hotkey = Hotkey::popup();
    let hotkey_listener = HotkeyListener::new(hotkey, registry, Arc::clone(&sink));
    match hotkey_listener.start() {
        Ok(()) => info!(%hotkey, "hotkey listener started"),
        Err(e) => {
            error!(%e, "failed to start hotkey listener");
            warn!("continuing without hotkey support - use the tray menu or `layout-hint show`");
        }
    }

    // Control socket
    #[cfg(unix)]
    let server = {
        let status = Status {
            hotkey_active: hotkey_listener.is_running(),
            dismiss,
            ..Status::default()
        };
        let server = runtime
            .block_on(async {
                Server::new(&config.socket_path, event_tx.clone(), Arc::clone(&sink), status)
            })
            .map(Arc::new)?;

        runtime.spawn({
            let server = Arc::clone(&server);
            async move {
                if let Err(e) = server.run().await {
                    error!(?e, "control socket error");
                }
            }
        });
        runtime.spawn({
            let server = Arc::clone(&server);
            let events = event_tx.subscribe();
            async move {
                server.track_events(events).await;
            }
        });
        server
    };
    #[cfg(not(unix))]
    let _ = (dismiss, &event_tx);

    // Shutdown signals
    let mut shutdown = runtime
        .block_on(async { ShutdownSignal::new() })
        .context("failed to register signal handlers")?;
    runtime.spawn({
        let sink = Arc::clone(&sink);
        async move {
            shutdown.wait().await;
            info!("shutdown signal received");
            sink.send(AppEvent::Exit);
        }
    });

    let mut tray: Option<Tray> = None;

    info!("initialized, entering event loop");

    event_loop.run(move |event, _target, control_flow| {
        *control_flow = ControlFlow::Wait;

        match event {
            // The tray can only be created once the loop is running
            Event::NewEvents(StartCause::Init) => match Tray::new(Arc::clone(&sink)) {
                Ok(created) => tray = Some(created),
                Err(e) => warn!(%e, "continuing without tray icon"),
            },

            Event::UserEvent(app_event) => {
                #[cfg(unix)]
                if app_event == AppEvent::Hotkey(HotkeyEvent::ListenerStopped) {
                    let server = Arc::clone(&server);
                    runtime.spawn(async move { server.set_hotkey_active(false).await });
                }

                if app.handle(app_event) == Flow::Exit {
                    *control_flow = ControlFlow::Exit;
                }
            }

            // The popup is the only window
            Event::WindowEvent {
                event: WindowEvent::CloseRequested,
                ..
            } => {
                app.handle(AppEvent::PopupCloseRequested);
            }

            Event::LoopDestroyed => {
                info!("shutting down...");

                hotkey_listener.stop();
                tray.take();

                #[cfg(unix)]
                runtime.block_on(async {
                    let status = server.status().await;
                    info!(uptime_secs = status.uptime_secs, "stopping control socket");
                    server.shutdown().await;
                });

                info!("layout-hint stopped");
            }

            _ => {}
        }
    })
}
