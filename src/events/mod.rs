//! Events module for popup visibility transitions
//!
//! Provides structured event types emitted by the toggle whenever the
//! popup is shown, hidden, or a show request is suppressed.

use serde::{Deserialize, Serialize};

/// What asked for the popup to be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// The global hotkey was pressed
    Hotkey,
    /// "Show Suggestions" was picked from the tray menu
    Tray,
    /// A `show` request arrived on the control socket
    ControlSocket,
}

/// Why the popup was hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HideReason {
    /// The one-shot release subscription fired
    ModifierReleased,
    /// The auto-close timer elapsed
    AutoClose,
    /// Hidden on request (control socket or the popup itself)
    Requested,
}

/// Events emitted by the toggle during transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToggleEvent {
    /// Popup became visible
    PopupShown { trigger: Trigger },

    /// Popup was hidden
    PopupHidden {
        reason: HideReason,
        /// How long the popup stayed visible, in milliseconds
        visible_ms: u64,
    },

    /// A show request arrived while the popup was already visible
    ShowIgnored { trigger: Trigger },
}

impl ToggleEvent {
    /// Visibility of the popup after this event
    pub fn visible_after(&self) -> bool {
        !matches!(self, ToggleEvent::PopupHidden { .. })
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trigger::Hotkey => write!(f, "hotkey"),
            Trigger::Tray => write!(f, "tray"),
            Trigger::ControlSocket => write!(f, "control-socket"),
        }
    }
}

impl std::fmt::Display for ToggleEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToggleEvent::PopupShown { trigger } => write!(f, "POPUP_SHOWN ({})", trigger),
            ToggleEvent::PopupHidden { reason, visible_ms } => {
                write!(f, "POPUP_HIDDEN ({:?}, {}ms)", reason, visible_ms)
            }
            ToggleEvent::ShowIgnored { trigger } => write!(f, "SHOW_IGNORED ({})", trigger),
        }
    }
}
