//! Core toggle implementation
//!
//! Shows the popup on hotkey press and hides it when the armed one-shot
//! release subscription fires (or the auto-close timer elapses).

use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::dismiss::{DismissPolicy, DismissTimer};
use crate::events::{HideReason, ToggleEvent, Trigger};
use crate::hotkey::{Arming, HotkeyError, ReleaseArming, ReleaseSubscription, SubscriptionId};
use crate::popup::{render_suggestions, PopupError, PopupSurface};
use crate::suggest::{RandomSuggestions, SuggestionSource};

/// Visibility of the popup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToggleState {
    #[default]
    Hidden,
    Visible,
}

impl std::fmt::Display for ToggleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToggleState::Hidden => write!(f, "Hidden"),
            ToggleState::Visible => write!(f, "Visible"),
        }
    }
}

/// Errors from a toggle transition
#[derive(Debug, thiserror::Error)]
pub enum ToggleError {
    #[error(transparent)]
    Popup(#[from] PopupError),

    #[error(transparent)]
    Hotkey(#[from] HotkeyError),
}

enum Dismiss {
    OnModifierRelease,
    AfterDelay {
        delay: Duration,
        timer: Box<dyn DismissTimer>,
    },
}

/// Owns the visibility state and drives the popup
pub struct Toggle<P, R: ReleaseArming> {
    state: ToggleState,
    popup: P,
    release: R,
    /// At most one live subscription; `Some` only while visible after a hotkey show
    pending_release: Option<R::Subscription>,
    suggestions: Box<dyn SuggestionSource>,
    dismiss: Dismiss,
    /// Bumped on every show; tags auto-close timers
    generation: u64,
    shown_at: Option<Instant>,
    event_tx: broadcast::Sender<ToggleEvent>,
}

impl<P: PopupSurface, R: ReleaseArming> Toggle<P, R> {
    /// Create a toggle in the `Hidden` state, dismissed by modifier release
    pub fn new(popup: P, release: R, event_tx: broadcast::Sender<ToggleEvent>) -> Self {
        Self {
            state: ToggleState::Hidden,
            popup,
            release,
            pending_release: None,
            suggestions: Box::new(RandomSuggestions::default()),
            dismiss: Dismiss::OnModifierRelease,
            generation: 0,
            shown_at: None,
            event_tx,
        }
    }

    /// Title of the popup window
    pub fn with_title(mut self, title: &str) -> Self {
        self.popup.set_title(title);
        self
    }

    pub fn with_suggestions(mut self, suggestions: Box<dyn SuggestionSource>) -> Self {
        self.suggestions = suggestions;
        self
    }

    /// Switch to auto-close mode: hide `delay` after each show
    pub fn with_auto_close(mut self, delay: Duration, timer: Box<dyn DismissTimer>) -> Self {
        self.dismiss = Dismiss::AfterDelay { delay, timer };
        self
    }

    #[cfg(test)]
    pub fn state(&self) -> ToggleState {
        self.state
    }

    #[cfg(test)]
    pub fn is_visible(&self) -> bool {
        self.state == ToggleState::Visible
    }

    #[cfg(test)]
    pub fn popup(&self) -> &P {
        &self.popup
    }

    /// Id of the armed release subscription, if any
    pub fn pending_release(&self) -> Option<SubscriptionId> {
        self.pending_release.as_ref().map(|s| s.id())
    }

    pub fn dismiss_policy(&self) -> DismissPolicy {
        match &self.dismiss {
            Dismiss::OnModifierRelease => DismissPolicy::OnModifierRelease,
            Dismiss::AfterDelay { delay, .. } => DismissPolicy::AfterDelay {
                delay_ms: delay.as_millis() as u64,
            },
        }
    }

    /// `Hidden -> Visible`. A no-op while already visible.
    ///
    /// Only hotkey shows arm a release subscription; tray and control socket
    /// shows stay up until hidden explicitly (or by the auto-close timer).
    /// Returns whether the popup was shown.
    pub fn on_hotkey_press(&mut self, trigger: Trigger) -> Result<bool, ToggleError> {
        if self.state == ToggleState::Visible {
            debug!(%trigger, "popup already visible, ignoring show");
            self.emit(ToggleEvent::ShowIgnored { trigger });
            return Ok(false);
        }

        // Armed before showing; dropped (and disarmed) if the show fails
        let subscription = match (&self.dismiss, trigger) {
            (Dismiss::OnModifierRelease, Trigger::Hotkey) => match self.release.arm()? {
                Arming::Armed(subscription) => Some(subscription),
                Arming::AlreadyReleased => {
                    debug!("modifier released before the press was handled, not showing");
                    return Ok(false);
                }
            },
            _ => None,
        };

        self.refresh_content();
        self.popup.set_visible(true)?;

        self.pending_release = subscription;
        self.generation += 1;
        if let Dismiss::AfterDelay { delay, timer } = &self.dismiss {
            timer.schedule(self.generation, *delay);
        }

        self.transition_to(ToggleState::Visible);
        self.emit(ToggleEvent::PopupShown { trigger });
        Ok(true)
    }

    /// `Visible -> Hidden` when the armed subscription `id` fires.
    ///
    /// Releases for any other subscription are stale and ignored.
    pub fn on_modifier_release(&mut self, id: SubscriptionId) -> Result<bool, ToggleError> {
        match &self.pending_release {
            Some(subscription) if subscription.id() == id => {}
            _ => {
                debug!(id, pending = ?self.pending_release(), "stale release ignored");
                return Ok(false);
            }
        }

        self.pending_release = None;
        self.hide_surface(HideReason::ModifierReleased)
    }

    /// Auto-close timer for show `generation` elapsed
    pub fn on_dismiss_elapsed(&mut self, generation: u64) -> Result<bool, ToggleError> {
        let current = matches!(self.dismiss, Dismiss::AfterDelay { .. })
            && self.state == ToggleState::Visible
            && generation == self.generation;
        if !current {
            debug!(generation, current = self.generation, "stale auto-close ignored");
            return Ok(false);
        }

        self.hide_surface(HideReason::AutoClose)
    }

    /// Hide on request, dropping any pending subscription
    pub fn hide(&mut self, reason: HideReason) -> Result<bool, ToggleError> {
        if self.state == ToggleState::Hidden {
            return Ok(false);
        }

        self.pending_release = None;
        self.hide_surface(reason)
    }

    /// Drop the subscription and tear the popup down
    pub fn shutdown(&mut self) {
        if let Err(e) = self.hide(HideReason::Requested) {
            warn!(%e, "failed to hide popup during shutdown");
        }
        self.popup.exit();
    }

    fn refresh_content(&mut self) {
        let layouts = self.suggestions.generate();
        debug!(count = layouts.len(), "refreshing suggestions");

        if let Err(e) = self.popup.set_html(&render_suggestions(&layouts)) {
            warn!(%e, "failed to refresh popup content, showing previous page");
        }
    }

    /// The hide instruction counts as issued even if the surface reports an error
    fn hide_surface(&mut self, reason: HideReason) -> Result<bool, ToggleError> {
        let result = self.popup.set_visible(false);

        let visible_ms = self
            .shown_at
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);
        self.transition_to(ToggleState::Hidden);
        self.emit(ToggleEvent::PopupHidden { reason, visible_ms });

        result?;
        Ok(true)
    }

    fn transition_to(&mut self, new_state: ToggleState) {
        info!(
            from = %self.state,
            to = %new_state,
            generation = self.generation,
            "toggle transition"
        );

        self.state = new_state;
        self.shown_at = match new_state {
            ToggleState::Visible => Some(Instant::now()),
            ToggleState::Hidden => None,
        };
    }

    fn emit(&self, event: ToggleEvent) {
        debug!(%event, "emitting toggle event");
        let _ = self.event_tx.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::ReleaseRegistry;
    use crate::suggest::Layout;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        SetVisible(bool),
        SetTitle(String),
        SetHtml,
        Exit,
    }

    #[derive(Default)]
    struct FakePopup {
        calls: Vec<Call>,
        fail_show: bool,
        fail_html: bool,
    }

    impl FakePopup {
        fn count(&self, call: &Call) -> usize {
            self.calls.iter().filter(|c| *c == call).count()
        }
    }

    impl PopupSurface for FakePopup {
        fn set_visible(&mut self, visible: bool) -> Result<(), PopupError> {
            self.calls.push(Call::SetVisible(visible));
            if visible && self.fail_show {
                return Err(PopupError::NoContainer);
            }
            Ok(())
        }

        fn set_title(&mut self, title: &str) {
            self.calls.push(Call::SetTitle(title.to_string()));
        }

        fn set_html(&mut self, _markup: &str) -> Result<(), PopupError> {
            self.calls.push(Call::SetHtml);
            if self.fail_html {
                return Err(PopupError::NoContainer);
            }
            Ok(())
        }

        fn exit(&mut self) {
            self.calls.push(Call::Exit);
        }
    }

    struct NoSuggestions;

    impl SuggestionSource for NoSuggestions {
        fn generate(&mut self) -> Vec<Layout> {
            Vec::new()
        }
    }

    #[derive(Clone, Default)]
    struct FakeTimer {
        scheduled: Arc<Mutex<Vec<u64>>>,
    }

    impl DismissTimer for FakeTimer {
        fn schedule(&self, generation: u64, _after: Duration) {
            self.scheduled.lock().unwrap().push(generation);
        }
    }

    fn create_toggle(
        popup: FakePopup,
    ) -> (
        Toggle<FakePopup, ReleaseRegistry>,
        ReleaseRegistry,
        broadcast::Receiver<ToggleEvent>,
    ) {
        let (tx, rx) = broadcast::channel(16);
        let registry = ReleaseRegistry::new();
        let toggle =
            Toggle::new(popup, registry.clone(), tx).with_suggestions(Box::new(NoSuggestions));
        (toggle, registry, rx)
    }

    /// Simulates Alt going down and the hotkey press reaching the toggle
    fn press(toggle: &mut Toggle<FakePopup, ReleaseRegistry>, registry: &ReleaseRegistry) -> bool {
        registry.modifier_pressed();
        toggle.on_hotkey_press(Trigger::Hotkey).unwrap()
    }

    /// Simulates the listener delivering a modifier release
    fn release(toggle: &mut Toggle<FakePopup, ReleaseRegistry>, registry: &ReleaseRegistry) -> bool {
        match registry.modifier_released() {
            Some(id) => toggle.on_modifier_release(id).unwrap(),
            None => false,
        }
    }

    #[test]
    fn test_initial_state() {
        let (toggle, registry, _) = create_toggle(FakePopup::default());
        assert_eq!(toggle.state(), ToggleState::Hidden);
        assert_eq!(toggle.pending_release(), None);
        assert_eq!(registry.armed(), None);
    }

    #[test]
    fn test_title_is_applied_to_popup() {
        let (toggle, _, _) = create_toggle(FakePopup::default());
        let toggle = toggle.with_title("Layout suggestions");

        assert_eq!(
            toggle.popup().calls,
            vec![Call::SetTitle("Layout suggestions".to_string())]
        );
        assert_eq!(toggle.state(), ToggleState::Hidden);
    }

    #[test]
    fn test_press_shows_and_arms_release() {
        let (mut toggle, registry, mut rx) = create_toggle(FakePopup::default());

        assert!(press(&mut toggle, &registry));
        assert_eq!(toggle.state(), ToggleState::Visible);
        assert_eq!(toggle.popup().count(&Call::SetVisible(true)), 1);
        assert_eq!(toggle.popup().count(&Call::SetHtml), 1);
        assert!(registry.armed().is_some());
        assert_eq!(toggle.pending_release(), registry.armed());

        assert_eq!(
            rx.try_recv().unwrap(),
            ToggleEvent::PopupShown {
                trigger: Trigger::Hotkey
            }
        );
    }

    #[test]
    fn test_repeated_press_is_ignored() {
        let (mut toggle, registry, _) = create_toggle(FakePopup::default());

        press(&mut toggle, &registry);
        let armed = registry.armed();

        assert!(!press(&mut toggle, &registry));
        assert!(!toggle.on_hotkey_press(Trigger::Tray).unwrap());

        assert_eq!(toggle.state(), ToggleState::Visible);
        assert_eq!(toggle.popup().count(&Call::SetVisible(true)), 1);
        assert_eq!(toggle.popup().count(&Call::SetHtml), 1);
        assert_eq!(registry.armed(), armed);
    }

    #[test]
    fn test_press_press_release_scenario() {
        let (mut toggle, registry, _) = create_toggle(FakePopup::default());

        press(&mut toggle, &registry);
        press(&mut toggle, &registry);
        assert!(release(&mut toggle, &registry));

        assert_eq!(toggle.state(), ToggleState::Hidden);
        assert_eq!(
            toggle.popup().calls,
            vec![Call::SetHtml, Call::SetVisible(true), Call::SetVisible(false)]
        );
        assert_eq!(registry.armed(), None);
    }

    #[test]
    fn test_second_cycle_uses_fresh_subscription() {
        let (mut toggle, registry, _) = create_toggle(FakePopup::default());

        press(&mut toggle, &registry);
        let first = toggle.pending_release().unwrap();
        assert!(release(&mut toggle, &registry));

        press(&mut toggle, &registry);
        let second = toggle.pending_release().unwrap();
        assert_ne!(first, second);

        // The first subscription already fired; replaying it changes nothing
        assert!(!toggle.on_modifier_release(first).unwrap());
        assert_eq!(toggle.state(), ToggleState::Visible);

        assert!(release(&mut toggle, &registry));
        assert_eq!(toggle.state(), ToggleState::Hidden);
    }

    #[test]
    fn test_many_cycles_end_hidden() {
        let (mut toggle, registry, _) = create_toggle(FakePopup::default());

        for _ in 0..25 {
            press(&mut toggle, &registry);
            press(&mut toggle, &registry);
            assert!(registry.armed().is_some());
            assert!(release(&mut toggle, &registry));
            assert_eq!(registry.armed(), None);
        }

        assert!(!toggle.is_visible());
        assert_eq!(toggle.popup().count(&Call::SetVisible(true)), 25);
        assert_eq!(toggle.popup().count(&Call::SetVisible(false)), 25);
    }

    #[test]
    fn test_press_after_modifier_released_does_not_show() {
        let (mut toggle, registry, mut rx) = create_toggle(FakePopup::default());

        // Alt went down and up again before the press was handled
        registry.modifier_pressed();
        registry.modifier_released();

        assert!(!toggle.on_hotkey_press(Trigger::Hotkey).unwrap());
        assert!(!toggle.is_visible());
        assert!(toggle.popup().calls.is_empty());
        assert_eq!(registry.armed(), None);
        assert!(rx.try_recv().is_err());

        // The next real press works normally
        assert!(press(&mut toggle, &registry));
        assert!(release(&mut toggle, &registry));
        assert!(!toggle.is_visible());
    }

    #[test]
    fn test_release_while_hidden_is_ignored() {
        let (mut toggle, _, _) = create_toggle(FakePopup::default());
        assert!(!toggle.on_modifier_release(1).unwrap());
        assert!(toggle.popup().calls.is_empty());
    }

    #[test]
    fn test_hidden_event_reports_reason() {
        let (mut toggle, registry, mut rx) = create_toggle(FakePopup::default());

        press(&mut toggle, &registry);
        release(&mut toggle, &registry);

        let _shown = rx.try_recv().unwrap();
        match rx.try_recv().unwrap() {
            ToggleEvent::PopupHidden { reason, .. } => {
                assert_eq!(reason, HideReason::ModifierReleased)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_non_hotkey_show_ignores_modifier() {
        let (mut toggle, registry, _) = create_toggle(FakePopup::default());

        assert!(toggle.on_hotkey_press(Trigger::Tray).unwrap());
        assert_eq!(registry.armed(), None);
        assert_eq!(toggle.pending_release(), None);

        // An unrelated Alt tap does not close it
        registry.modifier_pressed();
        assert!(!release(&mut toggle, &registry));
        assert!(toggle.is_visible());

        assert!(toggle.hide(HideReason::Requested).unwrap());
        assert!(!toggle.is_visible());
    }

    #[test]
    fn test_requested_hide_drops_subscription() {
        let (mut toggle, registry, _) = create_toggle(FakePopup::default());

        press(&mut toggle, &registry);
        assert!(toggle.hide(HideReason::Requested).unwrap());
        assert_eq!(registry.armed(), None);
        assert_eq!(toggle.pending_release(), None);

        assert!(!toggle.hide(HideReason::Requested).unwrap());

        press(&mut toggle, &registry);
        assert!(registry.armed().is_some());
    }

    #[test]
    fn test_failed_show_stays_hidden() {
        let popup = FakePopup {
            fail_show: true,
            ..Default::default()
        };
        let (mut toggle, registry, mut rx) = create_toggle(popup);
        registry.modifier_pressed();

        assert!(matches!(
            toggle.on_hotkey_press(Trigger::Hotkey),
            Err(ToggleError::Popup(_))
        ));
        assert_eq!(toggle.state(), ToggleState::Hidden);
        assert_eq!(registry.armed(), None);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_failed_refresh_still_shows() {
        let popup = FakePopup {
            fail_html: true,
            ..Default::default()
        };
        let (mut toggle, registry, _) = create_toggle(popup);

        assert!(press(&mut toggle, &registry));
        assert!(toggle.is_visible());
    }

    #[test]
    fn test_arm_failure_aborts_show() {
        let (mut toggle, registry, _) = create_toggle(FakePopup::default());
        registry.modifier_pressed();
        let _foreign = registry.arm().unwrap();

        assert!(matches!(
            toggle.on_hotkey_press(Trigger::Hotkey),
            Err(ToggleError::Hotkey(HotkeyError::ReleaseAlreadyArmed))
        ));
        assert_eq!(toggle.state(), ToggleState::Hidden);
        assert!(toggle.popup().calls.is_empty());
    }

    #[test]
    fn test_auto_close_mode() {
        let timer = FakeTimer::default();
        let (toggle, registry, _) = create_toggle(FakePopup::default());
        let mut toggle = toggle.with_auto_close(Duration::from_millis(800), Box::new(timer.clone()));
        assert_eq!(
            toggle.dismiss_policy(),
            DismissPolicy::AfterDelay { delay_ms: 800 }
        );

        assert!(press(&mut toggle, &registry));
        assert_eq!(registry.armed(), None);
        assert_eq!(*timer.scheduled.lock().unwrap(), vec![1]);

        assert!(toggle.on_dismiss_elapsed(1).unwrap());
        assert_eq!(toggle.state(), ToggleState::Hidden);
    }

    #[test]
    fn test_stale_auto_close_is_ignored() {
        let timer = FakeTimer::default();
        let (toggle, _, _) = create_toggle(FakePopup::default());
        let mut toggle = toggle.with_auto_close(Duration::from_secs(1), Box::new(timer.clone()));

        toggle.on_hotkey_press(Trigger::Hotkey).unwrap();
        toggle.hide(HideReason::Requested).unwrap();
        toggle.on_hotkey_press(Trigger::Hotkey).unwrap();

        // Timer from the first show fires during the second
        assert!(!toggle.on_dismiss_elapsed(1).unwrap());
        assert!(toggle.is_visible());

        assert!(toggle.on_dismiss_elapsed(2).unwrap());
        assert!(!toggle.on_dismiss_elapsed(2).unwrap());
        assert_eq!(*timer.scheduled.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_dismiss_elapsed_ignored_in_release_mode() {
        let (mut toggle, registry, _) = create_toggle(FakePopup::default());
        press(&mut toggle, &registry);
        assert!(!toggle.on_dismiss_elapsed(1).unwrap());
        assert!(toggle.is_visible());
    }

    #[test]
    fn test_shutdown_hides_and_exits() {
        let (mut toggle, registry, _) = create_toggle(FakePopup::default());
        press(&mut toggle, &registry);

        toggle.shutdown();
        assert_eq!(toggle.state(), ToggleState::Hidden);
        assert_eq!(registry.armed(), None);
        assert_eq!(toggle.popup().calls.last(), Some(&Call::Exit));
    }
}
