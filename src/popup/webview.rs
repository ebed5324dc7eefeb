//! Native popup: an undecorated tao window hosting a wry webview
//!
//! Must be created and driven from the event loop thread.

use std::sync::Arc;

use tao::dpi::{LogicalSize, PhysicalPosition};
use tao::event_loop::EventLoopWindowTarget;
use tao::window::{Window, WindowBuilder};
use tracing::{debug, info};
use wry::{WebView, WebViewBuilder};

use super::{placeholder, PopupError, PopupSurface, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::app::{AppEvent, EventSink};

/// Message the popup page posts to ask to be closed
const CLOSE_MESSAGE: &str = "close";

struct Surface {
    // Dropped before the window that hosts it
    webview: WebView,
    window: Window,
}

/// The popup window, created once and reused across show/hide cycles
pub struct WebviewPopup {
    surface: Option<Surface>,
}

impl WebviewPopup {
    /// Create the popup, hidden, with the placeholder page loaded
    pub fn open(
        target: &EventLoopWindowTarget<AppEvent>,
        size: Option<(u32, u32)>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, PopupError> {
        let (width, height) = size.unwrap_or((DEFAULT_WIDTH, DEFAULT_HEIGHT));

        let window = WindowBuilder::new()
            .with_inner_size(LogicalSize::new(width, height))
            .with_decorations(false)
            .with_resizable(false)
            .with_always_on_top(true)
            .with_visible(false)
            .build(target)?;
        center_on_monitor(&window);

        let builder = WebViewBuilder::new()
            .with_html(placeholder())
            .with_ipc_handler(move |request: wry::http::Request<String>| {
                if request.body() == CLOSE_MESSAGE {
                    debug!("popup asked to close");
                    sink.send(AppEvent::PopupCloseRequested);
                }
            });
        let webview = build_webview(builder, &window)?;

        info!(width, height, "popup surface created");

        Ok(Self {
            surface: Some(Surface { webview, window }),
        })
    }
}

impl PopupSurface for WebviewPopup {
    fn set_visible(&mut self, visible: bool) -> Result<(), PopupError> {
        if let Some(surface) = &self.surface {
            surface.window.set_visible(visible);
            if visible {
                surface.window.set_focus();
            }
        }
        Ok(())
    }

    fn set_title(&mut self, title: &str) {
        if let Some(surface) = &self.surface {
            surface.window.set_title(title);
        }
    }

    fn set_html(&mut self, markup: &str) -> Result<(), PopupError> {
        if let Some(surface) = &self.surface {
            surface.webview.load_html(markup)?;
        }
        Ok(())
    }

    fn exit(&mut self) {
        if self.surface.take().is_some() {
            info!("popup surface destroyed");
        }
    }
}

fn center_on_monitor(window: &Window) {
    let Some(monitor) = window.current_monitor() else {
        return;
    };
    let screen = monitor.size();
    let origin = monitor.position();
    let size = window.outer_size();

    let x = origin.x + (screen.width as i32 - size.width as i32) / 2;
    let y = origin.y + (screen.height as i32 - size.height as i32) / 2;
    window.set_outer_position(PhysicalPosition::new(x, y));
}

#[cfg(not(target_os = "linux"))]
fn build_webview(builder: WebViewBuilder<'_>, window: &Window) -> Result<WebView, PopupError> {
    Ok(builder.build(window)?)
}

#[cfg(target_os = "linux")]
fn build_webview(builder: WebViewBuilder<'_>, window: &Window) -> Result<WebView, PopupError> {
    use tao::platform::unix::WindowExtUnix;
    use wry::WebViewBuilderExtUnix;

    // WebKitGTK needs a GTK container rather than a raw window handle
    let vbox = window.default_vbox().ok_or(PopupError::NoContainer)?;
    Ok(builder.build_gtk(vbox)?)
}
