//! Hotkey module for global keyboard event listening
//!
//! Uses rdev to watch for the popup hotkey and the release of its
//! modifier, and hands out one-shot release subscriptions.

mod keys;
mod listener;

pub use keys::Hotkey;
pub use listener::{
    Arming, HotkeyError, HotkeyEvent, HotkeyListener, ReleaseArming, ReleaseRegistry,
    ReleaseSubscription, SubscriptionId,
};
