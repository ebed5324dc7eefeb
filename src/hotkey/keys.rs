//! Hotkey definition and key state tracking
//!
//! Turns the raw press/release stream from the global keyboard listener
//! into the two edges the toggle cares about: hotkey pressed and
//! modifier released.

use rdev::{EventType, Key};

/// Modifier half of the hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Alt,
}

impl Modifier {
    /// Whether `key` is either the left or right variant of this modifier
    pub fn matches(self, key: Key) -> bool {
        match self {
            Modifier::Alt => matches!(key, Key::Alt | Key::AltGr),
        }
    }
}

impl std::fmt::Display for Modifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Modifier::Alt => write!(f, "Alt"),
        }
    }
}

/// A modifier + key combination
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hotkey {
    pub modifier: Modifier,
    pub key: Key,
}

impl Hotkey {
    /// The hotkey the popup is bound to: Alt + backquote
    pub const fn popup() -> Self {
        Self {
            modifier: Modifier::Alt,
            key: Key::BackQuote,
        }
    }
}

impl std::fmt::Display for Hotkey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}+{:?}", self.modifier, self.key)
    }
}

/// Edge produced by [`KeyTracker`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEdge {
    /// Trigger key went down while the modifier was held
    HotkeyPressed,
    /// Modifier went up after being held
    ModifierReleased,
}

/// Tracks the modifier and trigger key to detect hotkey edges
#[derive(Debug, Clone)]
pub struct KeyTracker {
    hotkey: Hotkey,
    modifier_down: bool,
    /// Trigger key is held (suppresses auto-repeat)
    key_down: bool,
}

impl KeyTracker {
    pub fn new(hotkey: Hotkey) -> Self {
        Self {
            hotkey,
            modifier_down: false,
            key_down: false,
        }
    }

    pub fn modifier_held(&self) -> bool {
        self.modifier_down
    }

    /// Feed one raw keyboard event, returning the edge it produces, if any
    pub fn feed(&mut self, event: &EventType) -> Option<KeyEdge> {
        match *event {
            EventType::KeyPress(key) if self.hotkey.modifier.matches(key) => {
                self.modifier_down = true;
                None
            }
            EventType::KeyRelease(key) if self.hotkey.modifier.matches(key) => {
                // Releasing either side counts, even if the other is still held
                std::mem::replace(&mut self.modifier_down, false)
                    .then_some(KeyEdge::ModifierReleased)
            }
            EventType::KeyPress(key) if key == self.hotkey.key => {
                if self.key_down {
                    return None;
                }
                self.key_down = true;
                self.modifier_held().then_some(KeyEdge::HotkeyPressed)
            }
            EventType::KeyRelease(key) if key == self.hotkey.key => {
                self.key_down = false;
                None
            }
            _ => None,
        }
    }
}
