//! Popup surface: the webview window holding the suggestions
//!
//! The toggle only talks to [`PopupSurface`]; the native window lives in
//! [`webview`].

mod render;
mod webview;

pub use render::{placeholder, render_suggestions};
pub use webview::WebviewPopup;

/// Default popup size in logical pixels
pub const DEFAULT_WIDTH: u32 = 480;
pub const DEFAULT_HEIGHT: u32 = 320;

/// Errors raised by the popup surface
#[derive(Debug, thiserror::Error)]
pub enum PopupError {
    #[error("failed to create popup window: {0}")]
    Window(#[from] tao::error::OsError),

    #[error("webview error: {0}")]
    Webview(#[from] wry::Error),

    #[error("popup window has no container for the webview")]
    NoContainer,
}

/// Something the toggle can show, hide, and fill with markup
pub trait PopupSurface {
    fn set_visible(&mut self, visible: bool) -> Result<(), PopupError>;

    fn set_title(&mut self, title: &str);

    /// Replace the displayed page
    fn set_html(&mut self, markup: &str) -> Result<(), PopupError>;

    /// Tear the surface down. Later calls on the surface do nothing.
    fn exit(&mut self);
}
