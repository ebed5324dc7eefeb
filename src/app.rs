//! Application loop glue
//!
//! Every input (hotkey thread, tray menu, control socket, timers, signals)
//! reaches the toggle as an [`AppEvent`] on the event loop thread.

use std::sync::{Mutex, PoisonError};

use tao::event_loop::EventLoopProxy;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::events::{HideReason, Trigger};
use crate::hotkey::{HotkeyEvent, ReleaseArming};
use crate::popup::PopupSurface;
use crate::state::{Toggle, ToggleError};
use crate::tray::TrayAction;

/// Show/hide requests from the control socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Show,
    Hide,
}

/// Inputs delivered to the event loop thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    Hotkey(HotkeyEvent),
    Tray(TrayAction),
    Control(ControlCommand),
    /// Auto-close timer for the given show generation elapsed
    DismissElapsed(u64),
    /// The popup page asked to be closed
    PopupCloseRequested,
    /// Terminate the process
    Exit,
}

/// Delivers [`AppEvent`]s to the event loop from any thread
pub trait EventSink: Send + Sync + 'static {
    /// Returns `false` once the receiving side is gone
    fn send(&self, event: AppEvent) -> bool;
}

/// Sink backed by the tao event loop proxy
pub struct ProxySink(Mutex<EventLoopProxy<AppEvent>>);

impl ProxySink {
    pub fn new(proxy: EventLoopProxy<AppEvent>) -> Self {
        Self(Mutex::new(proxy))
    }
}

impl EventSink for ProxySink {
    fn send(&self, event: AppEvent) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .send_event(event)
            .is_ok()
    }
}

impl EventSink for mpsc::UnboundedSender<AppEvent> {
    fn send(&self, event: AppEvent) -> bool {
        mpsc::UnboundedSender::send(self, event).is_ok()
    }
}

/// What the event loop should do after an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Owns the toggle on the event loop thread and routes events to it
pub struct App<P: PopupSurface, R: ReleaseArming> {
    toggle: Toggle<P, R>,
}

impl<P: PopupSurface, R: ReleaseArming> App<P, R> {
    pub fn new(toggle: Toggle<P, R>) -> Self {
        Self { toggle }
    }

    #[cfg(test)]
    pub fn toggle(&self) -> &Toggle<P, R> {
        &self.toggle
    }

    /// Handle one event to completion
    pub fn handle(&mut self, event: AppEvent) -> Flow {
        debug!(?event, "app event");

        let result = match event {
            AppEvent::Hotkey(HotkeyEvent::Pressed) => self.toggle.on_hotkey_press(Trigger::Hotkey),
            AppEvent::Hotkey(HotkeyEvent::ModifierReleased(id)) => {
                self.toggle.on_modifier_release(id)
            }
            AppEvent::Hotkey(HotkeyEvent::ListenerStopped) => {
                warn!("hotkey listener stopped - use the tray menu or `layout-hint show`");
                Ok(false)
            }
            AppEvent::Tray(TrayAction::ShowSuggestions) => {
                self.toggle.on_hotkey_press(Trigger::Tray)
            }
            AppEvent::Control(ControlCommand::Show) => {
                self.toggle.on_hotkey_press(Trigger::ControlSocket)
            }
            AppEvent::Control(ControlCommand::Hide) | AppEvent::PopupCloseRequested => {
                self.toggle.hide(HideReason::Requested)
            }
            AppEvent::DismissElapsed(generation) => self.toggle.on_dismiss_elapsed(generation),
            AppEvent::Tray(TrayAction::Exit) | AppEvent::Exit => {
                info!("exit requested");
                self.toggle.shutdown();
                return Flow::Exit;
            }
        };

        match result {
            Ok(_) => {}
            Err(ToggleError::Hotkey(e)) => {
                error!(%e, "hotkey service failed, popup not shown");
            }
            Err(ToggleError::Popup(e)) => {
                warn!(%e, "popup surface error");
            }
        }

        Flow::Continue
    }
}
