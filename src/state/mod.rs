//! Toggle module for popup visibility
//!
//! Provides an explicit two-state machine:
//! - Hidden: Default state, popup not shown
//! - Visible: Shown on hotkey press, until the modifier is released
//!   (or the auto-close delay elapses)

mod dismiss;
mod machine;

pub use dismiss::{DismissPolicy, TokioDismissTimer};
pub use machine::{Toggle, ToggleError, ToggleState};
