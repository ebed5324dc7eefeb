//! Global hotkey listener using rdev
//!
//! Monitors system-wide keyboard events for the popup hotkey and for the
//! release of its modifier. Runs on a dedicated thread; the release edge
//! is only forwarded when a one-shot subscription is armed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{debug, error, info, warn};

use super::keys::{Hotkey, KeyEdge, KeyTracker};
use crate::app::{AppEvent, EventSink};

/// Identifies one armed release subscription
pub type SubscriptionId = u64;

/// Events sent from the hotkey listener to the app loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// The hotkey combination went down
    Pressed,
    /// The modifier went up while subscription `id` was armed
    ModifierReleased(SubscriptionId),
    /// The listener thread exited; no further hotkey events will arrive
    ListenerStopped,
}

/// Errors that can occur in the hotkey service
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("hotkey listener is already running")]
    AlreadyRunning,

    #[error("a modifier release subscription is already armed")]
    ReleaseAlreadyArmed,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),

    #[error("failed to listen for keyboard events: {0}")]
    Listen(String),
}

/// Outcome of arming a release subscription
#[derive(Debug)]
pub enum Arming<S> {
    /// The modifier is held; `S` fires when it goes up
    Armed(S),
    /// The modifier was already up when arming ran
    AlreadyReleased,
}

/// Hands out one-shot "modifier released" subscriptions
pub trait ReleaseArming {
    type Subscription: ReleaseSubscription;

    /// Arm a subscription that fires the next time the modifier is released.
    ///
    /// Dropping the returned handle before it fires unsubscribes. If the
    /// modifier is no longer held nothing is armed and
    /// [`Arming::AlreadyReleased`] is returned.
    fn arm(&self) -> Result<Arming<Self::Subscription>, HotkeyError>;
}

/// A live release subscription
pub trait ReleaseSubscription {
    fn id(&self) -> SubscriptionId;
}

#[derive(Debug, Default)]
struct Slot {
    armed: Option<SubscriptionId>,
    /// Modifier state as last seen by the listener thread
    modifier_held: bool,
}

/// One-shot release slot shared between the listener thread and the toggle
#[derive(Debug, Clone, Default)]
pub struct ReleaseRegistry {
    slot: Arc<Mutex<Slot>>,
    next_id: Arc<AtomicU64>,
}

impl ReleaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record that the modifier went down
    pub fn modifier_pressed(&self) {
        self.slot().modifier_held = true;
    }

    /// Record that the modifier went up and consume the armed subscription,
    /// if any. Each id is returned at most once.
    pub fn modifier_released(&self) -> Option<SubscriptionId> {
        let mut slot = self.slot();
        slot.modifier_held = false;
        slot.armed.take()
    }

    /// Currently armed subscription
    #[cfg(test)]
    pub fn armed(&self) -> Option<SubscriptionId> {
        self.slot().armed
    }
}

impl ReleaseArming for ReleaseRegistry {
    type Subscription = ReleaseHandle;

    fn arm(&self) -> Result<Arming<ReleaseHandle>, HotkeyError> {
        let mut slot = self.slot();
        if slot.armed.is_some() {
            return Err(HotkeyError::ReleaseAlreadyArmed);
        }
        if !slot.modifier_held {
            debug!("modifier already released, nothing to arm");
            return Ok(Arming::AlreadyReleased);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        slot.armed = Some(id);
        debug!(id, "release subscription armed");

        Ok(Arming::Armed(ReleaseHandle {
            id,
            slot: Arc::clone(&self.slot),
        }))
    }
}

/// Handle to an armed subscription; disarms on drop if it has not fired
#[derive(Debug)]
pub struct ReleaseHandle {
    id: SubscriptionId,
    slot: Arc<Mutex<Slot>>,
}

impl ReleaseSubscription for ReleaseHandle {
    fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for ReleaseHandle {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.armed == Some(self.id) {
            slot.armed = None;
            debug!(id = self.id, "release subscription disarmed");
        }
    }
}

/// Global hotkey listener
pub struct HotkeyListener {
    hotkey: Hotkey,
    registry: ReleaseRegistry,
    sink: Arc<dyn EventSink>,
    running: Arc<AtomicBool>,
}

impl HotkeyListener {
    /// Create a new hotkey listener
    pub fn new(hotkey: Hotkey, registry: ReleaseRegistry, sink: Arc<dyn EventSink>) -> Self {
        Self {
            hotkey,
            registry,
            sink,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the hotkey listener
    ///
    /// Spawns a dedicated thread running `rdev::listen`. That call blocks for
    /// the lifetime of the process; `stop()` only mutes the callback.
    pub fn start(&self) -> Result<(), HotkeyError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(HotkeyError::AlreadyRunning);
        }

        let mut dispatcher = Dispatcher {
            tracker: KeyTracker::new(self.hotkey),
            registry: self.registry.clone(),
            sink: Arc::clone(&self.sink),
        };
        let running = Arc::clone(&self.running);
        let stopped_sink = Arc::clone(&self.sink);
        let hotkey = self.hotkey;

        thread::Builder::new()
            .name("hotkey-listener".to_string())
            .spawn(move || {
                info!(%hotkey, "hotkey listener thread started");

                let callback_running = Arc::clone(&running);
                let result = rdev::listen(move |event| {
                    if callback_running.load(Ordering::SeqCst) {
                        dispatcher.dispatch(&event.event_type);
                    }
                });

                if let Err(e) = result {
                    let e = HotkeyError::Listen(format!("{:?}", e));
                    error!(%e, "hotkey listener error");
                }

                running.store(false, Ordering::SeqCst);
                info!("hotkey listener thread stopped");
                stopped_sink.send(AppEvent::Hotkey(HotkeyEvent::ListenerStopped));
            })
            .map_err(|e| HotkeyError::ThreadSpawn(e.to_string()))?;

        Ok(())
    }

    /// Stop forwarding events
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Listener-thread side: edge detection plus one-shot release delivery
struct Dispatcher {
    tracker: KeyTracker,
    registry: ReleaseRegistry,
    sink: Arc<dyn EventSink>,
}

impl Dispatcher {
    fn dispatch(&mut self, event: &rdev::EventType) {
        let was_held = self.tracker.modifier_held();
        let edge = self.tracker.feed(event);
        if !was_held && self.tracker.modifier_held() {
            self.registry.modifier_pressed();
        }

        let hotkey_event = match edge {
            Some(KeyEdge::HotkeyPressed) => HotkeyEvent::Pressed,
            Some(KeyEdge::ModifierReleased) => match self.registry.modifier_released() {
                Some(id) => HotkeyEvent::ModifierReleased(id),
                None => return,
            },
            None => return,
        };

        debug!(?hotkey_event, "hotkey edge");
        if !self.sink.send(AppEvent::Hotkey(hotkey_event)) {
            warn!("failed to deliver hotkey event - event loop closed?");
        }
    }
}
