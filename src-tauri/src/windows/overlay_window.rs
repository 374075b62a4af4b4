use tauri::webview::{NewWindowResponse, PageLoadEvent};
use tauri::window::WindowBuilder;
use tauri::{
    AppHandle, Emitter, LogicalPosition, LogicalSize, PhysicalPosition, Webview, WebviewBuilder,
    WebviewUrl, Window, WindowEvent,
};

use crate::services::content::{ContentBounds, ContentPolicy, CONTENT_TOP_OFFSET};
use crate::services::events::{EventSender, OverlayCommand, OverlayEvent};
use crate::services::positioner::{DisplayBounds, Point};
use crate::services::presets::WindowSize;
use crate::services::window_controller::{ConfigSnapshot, WindowBackend, WindowError};

pub const OVERLAY_WINDOW_LABEL: &str = "overlay";
pub const CONTROL_STRIP_LABEL: &str = "control-strip";
pub const CONTENT_LABEL: &str = "content";

pub const EVT_CONFIG: &str = "config";

pub struct OverlayWindow {
    pub window: Window,
    pub strip: Webview,
    pub content: Webview,
}

/// Builds the hidden overlay window: a frameless always-on-top host with the
/// control strip on top and the remote content surface below it.
pub fn build_overlay_window(
    app: &AppHandle,
    policy: &ContentPolicy,
    size: WindowSize,
    events: EventSender,
) -> tauri::Result<OverlayWindow> {
    let window = WindowBuilder::new(app, OVERLAY_WINDOW_LABEL)
        .title("Quick Overlay")
        .inner_size(size.width as f64, size.height as f64)
        .decorations(false)
        .resizable(false)
        .maximizable(false)
        .always_on_top(true)
        .skip_taskbar(true)
        .visible(false)
        .build()?;

    let strip_events = events.clone();
    let strip = window.add_child(
        WebviewBuilder::new(CONTROL_STRIP_LABEL, WebviewUrl::App("index.html".into())).on_page_load(
            move |_webview, payload| {
                if matches!(payload.event(), PageLoadEvent::Finished) {
                    strip_events.post(OverlayEvent::SettingsLoaded);
                }
            },
        ),
        LogicalPosition::new(0.0, 0.0),
        LogicalSize::new(size.width as f64, CONTENT_TOP_OFFSET as f64),
    )?;

    let content_events = events.clone();
    let nav_events = events.clone();
    let nav_policy = policy.clone();
    let popup_events = events.clone();
    let popup_policy = policy.clone();
    let bounds = ContentBounds::below_strip(size);
    let content = window.add_child(
        WebviewBuilder::new(CONTENT_LABEL, WebviewUrl::External(policy.home().clone()))
            .on_navigation(move |url| {
                if nav_policy.allows_in_page(url) {
                    return true;
                }
                if let Some(target) = nav_policy.relay_target(url) {
                    nav_events.post(OverlayEvent::Command(OverlayCommand::Go(target)));
                }
                false
            })
            // target=_blank and window.open never get a window of their own.
            .on_new_window(move |url, _features| {
                if let Some(target) = popup_policy.relay_target(&url) {
                    popup_events.post(OverlayEvent::Command(OverlayCommand::Go(target)));
                }
                NewWindowResponse::Deny
            })
            .on_page_load(move |_webview, payload| {
                if matches!(payload.event(), PageLoadEvent::Finished) {
                    content_events.post(OverlayEvent::ContentLoaded);
                }
            }),
        LogicalPosition::new(bounds.x as f64, bounds.y as f64),
        LogicalSize::new(bounds.width as f64, bounds.height as f64),
    )?;

    window.on_window_event(move |event| match event {
        WindowEvent::Focused(focused) => events.post(OverlayEvent::FocusChanged(*focused)),
        WindowEvent::CloseRequested { api, .. } => {
            api.prevent_close();
            events.post(OverlayEvent::CloseRequested);
        }
        _ => {}
    });

    Ok(OverlayWindow {
        window,
        strip,
        content,
    })
}

pub struct TauriWindowBackend {
    window: Window,
    strip: Webview,
}

impl TauriWindowBackend {
    pub fn new(window: Window, strip: Webview) -> Self {
        Self { window, strip }
    }
}

fn op_err(op: &'static str) -> impl Fn(tauri::Error) -> WindowError {
    move |e| WindowError::new(op, e.to_string())
}

impl WindowBackend for TauriWindowBackend {
    fn cursor_position(&self) -> Result<Point, WindowError> {
        let pos = self
            .window
            .cursor_position()
            .map_err(op_err("cursor_position"))?;
        Ok(Point { x: pos.x, y: pos.y })
    }

    fn displays(&self) -> Result<Vec<DisplayBounds>, WindowError> {
        let monitors = self
            .window
            .available_monitors()
            .map_err(op_err("available_monitors"))?;
        Ok(monitors
            .iter()
            .map(|m| DisplayBounds {
                x: m.position().x,
                y: m.position().y,
                width: m.size().width,
                height: m.size().height,
            })
            .collect())
    }

    fn outer_size(&self) -> Result<WindowSize, WindowError> {
        let size = self.window.outer_size().map_err(op_err("outer_size"))?;
        Ok(WindowSize::new(size.width, size.height))
    }

    fn set_size(&self, size: WindowSize) -> Result<(), WindowError> {
        self.window
            .set_size(LogicalSize::new(size.width as f64, size.height as f64))
            .map_err(op_err("set_size"))?;
        self.strip
            .set_size(LogicalSize::new(size.width as f64, CONTENT_TOP_OFFSET as f64))
            .map_err(op_err("set_strip_size"))
    }

    fn set_position(&self, x: i32, y: i32) -> Result<(), WindowError> {
        self.window
            .set_position(PhysicalPosition::new(x, y))
            .map_err(op_err("set_position"))
    }

    fn show(&self) -> Result<(), WindowError> {
        let _ = self.window.unminimize();
        self.window.show().map_err(op_err("show"))?;
        self.window.set_focus().map_err(op_err("set_focus"))
    }

    fn minimize(&self) -> Result<(), WindowError> {
        self.window.minimize().map_err(op_err("minimize"))
    }

    fn hide(&self) -> Result<(), WindowError> {
        self.window.hide().map_err(op_err("hide"))
    }

    fn hide_application(&self) -> Result<(), WindowError> {
        #[cfg(target_os = "macos")]
        {
            use tauri::Manager;
            self.window
                .app_handle()
                .hide()
                .map_err(op_err("hide_application"))
        }

        #[cfg(not(target_os = "macos"))]
        {
            Ok(())
        }
    }

    fn publish_config(&self, snapshot: &ConfigSnapshot) -> Result<(), WindowError> {
        self.window
            .emit_to(CONTROL_STRIP_LABEL, EVT_CONFIG, snapshot)
            .map_err(op_err("publish_config"))
    }
}
