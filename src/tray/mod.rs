//! System tray icon with the "Show Suggestions" / "Exit" menu
//!
//! Uses tray-icon; has to be created on the event loop thread once the
//! loop has started.

mod icon;

use std::sync::Arc;

use tracing::{debug, info};
use tray_icon::menu::{Menu, MenuEvent, MenuId, MenuItem, PredefinedMenuItem};
use tray_icon::{TrayIcon, TrayIconBuilder};

use crate::app::{AppEvent, EventSink};

const SHOW_SUGGESTIONS_ID: &str = "show-suggestions";
const EXIT_ID: &str = "exit";
const TOOLTIP: &str = "layout-hint";

/// Action picked from the tray menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrayAction {
    ShowSuggestions,
    Exit,
}

impl TrayAction {
    pub fn menu_id(self) -> MenuId {
        match self {
            TrayAction::ShowSuggestions => MenuId::new(SHOW_SUGGESTIONS_ID),
            TrayAction::Exit => MenuId::new(EXIT_ID),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TrayAction::ShowSuggestions => "Show Suggestions",
            TrayAction::Exit => "Exit",
        }
    }

    pub fn from_menu_id(id: &MenuId) -> Option<Self> {
        match id.as_ref() {
            SHOW_SUGGESTIONS_ID => Some(TrayAction::ShowSuggestions),
            EXIT_ID => Some(TrayAction::Exit),
            _ => None,
        }
    }
}

/// Errors raised while building the tray
#[derive(Debug, thiserror::Error)]
pub enum TrayError {
    #[error("failed to build tray menu: {0}")]
    Menu(#[from] tray_icon::menu::Error),

    #[error("invalid tray icon: {0}")]
    Icon(#[from] tray_icon::BadIcon),

    #[error("failed to create tray icon: {0}")]
    Tray(#[from] tray_icon::Error),
}

/// Keeps the tray icon alive; dropping it removes the icon
pub struct Tray {
    _icon: TrayIcon,
}

impl Tray {
    /// Create the icon and route menu clicks to `sink`
    pub fn new(sink: Arc<dyn EventSink>) -> Result<Self, TrayError> {
        let menu = Menu::new();
        let show = menu_item(TrayAction::ShowSuggestions);
        let exit = menu_item(TrayAction::Exit);
        menu.append_items(&[&show, &PredefinedMenuItem::separator(), &exit])?;

        MenuEvent::set_event_handler(Some(move |event: MenuEvent| {
            match TrayAction::from_menu_id(event.id()) {
                Some(action) => {
                    debug!(?action, "tray menu action");
                    sink.send(AppEvent::Tray(action));
                }
                None => debug!(id = ?event.id(), "unknown tray menu item"),
            }
        }));

        let tray = TrayIconBuilder::new()
            .with_menu(Box::new(menu))
            .with_tooltip(TOOLTIP)
            .with_icon(icon::generate()?)
            .build()?;

        info!("tray icon created");

        Ok(Self { _icon: tray })
    }
}

fn menu_item(action: TrayAction) -> MenuItem {
    MenuItem::with_id(action.menu_id(), action.label(), true, None)
}
