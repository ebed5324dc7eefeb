//! How a visible popup goes away
//!
//! The default is the release of the hotkey modifier. The optional
//! auto-close mode hides it after a fixed delay instead.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::debug;

use crate::app::{AppEvent, EventSink};

/// Dismiss policy, as reported in status and configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DismissPolicy {
    /// Hide when the hotkey modifier is released
    OnModifierRelease,
    /// Hide after a fixed delay, ignoring the modifier
    AfterDelay { delay_ms: u64 },
}

impl Default for DismissPolicy {
    fn default() -> Self {
        Self::OnModifierRelease
    }
}

/// Schedules the auto-close callback for one show generation
pub trait DismissTimer {
    fn schedule(&self, generation: u64, after: Duration);
}

/// Timer backed by a tokio runtime; reports back through the event loop
pub struct TokioDismissTimer {
    runtime: Handle,
    sink: Arc<dyn EventSink>,
}

impl TokioDismissTimer {
    pub fn new(runtime: Handle, sink: Arc<dyn EventSink>) -> Self {
        Self { runtime, sink }
    }
}

impl DismissTimer for TokioDismissTimer {
    fn schedule(&self, generation: u64, after: Duration) {
        let sink = Arc::clone(&self.sink);
        self.runtime.spawn(async move {
            tokio::time::sleep(after).await;
            debug!(generation, "auto-close timer elapsed");
            sink.send(AppEvent::DismissElapsed(generation));
        });
    }
}
