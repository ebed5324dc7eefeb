//! Control socket message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::ToggleEvent;
use crate::state::DismissPolicy;

/// Largest accepted frame body
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request current status
    GetStatus,

    /// Show the popup, same as pressing the hotkey
    Show,

    /// Hide the popup
    Hide,

    /// Subscribe to toggle event notifications
    Subscribe,
}

/// Responses to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current status
    Status(Status),

    /// Show/hide request handed to the event loop
    Accepted,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification to subscribed clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    Notification { event: ToggleEvent },
}

/// Full status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Application version
    pub version: String,

    /// Whether the popup is currently shown
    pub visible: bool,

    /// Whether the global hotkey listener is running
    pub hotkey_active: bool,

    /// How the popup is dismissed
    pub dismiss: DismissPolicy,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for Status {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            visible: false,
            hotkey_active: false,
            dismiss: DismissPolicy::default(),
            uptime_secs: 0,
        }
    }
}
