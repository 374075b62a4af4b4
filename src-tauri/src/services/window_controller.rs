//! Visibility/geometry state machine for the overlay window.
//!
//! The controller is the single writer of overlay state. OS callbacks, tray
//! clicks and settings commands arrive as [`OverlayEvent`]s and are applied
//! one at a time by [`WindowController::handle`].

use std::time::{Duration, Instant};

use serde::Serialize;

use super::content::{ContentBounds, ContentSurfaceProxy};
use super::events::{OverlayCommand, OverlayEvent};
use super::hotkeys::{HotkeyAction, HotkeyError, HotkeyManager, DEFAULT_BINDING};
use super::positioner::{compute_top_left, DisplayBounds, Point};
use super::presets::{SizePreset, WindowSize};
use crate::config_store::{self, ConfigStore, Configuration, KEY_HOTKEY, KEY_WINDOW_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("window operation '{op}' failed: {message}")]
pub struct WindowError {
    pub op: &'static str,
    pub message: String,
}

impl WindowError {
    pub fn new(op: &'static str, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }
}

/// Native window operations the controller needs. Sizes passed in are
/// logical; everything read back (cursor, displays, outer size) is physical.
pub trait WindowBackend: Send {
    fn cursor_position(&self) -> Result<Point, WindowError>;
    fn displays(&self) -> Result<Vec<DisplayBounds>, WindowError>;
    fn outer_size(&self) -> Result<WindowSize, WindowError>;
    fn set_size(&self, size: WindowSize) -> Result<(), WindowError>;
    fn set_position(&self, x: i32, y: i32) -> Result<(), WindowError>;
    /// Make visible and bring to front.
    fn show(&self) -> Result<(), WindowError>;
    fn minimize(&self) -> Result<(), WindowError>;
    fn hide(&self) -> Result<(), WindowError>;
    fn hide_application(&self) -> Result<(), WindowError>;
    fn publish_config(&self, snapshot: &ConfigSnapshot) -> Result<(), WindowError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HidePolicy {
    /// macOS convention: hide the whole application.
    HideApplication,
    /// Minimize first so taskbar state matches, then hide.
    MinimizeThenHide,
}

impl HidePolicy {
    pub fn for_current_platform() -> Self {
        if cfg!(target_os = "macos") {
            HidePolicy::HideApplication
        } else {
            HidePolicy::MinimizeThenHide
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Hidden,
    Visible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayWindowState {
    pub visibility: Visibility,
    pub size: WindowSize,
    pub position: Option<(i32, i32)>,
}

/// Sent to the settings surface each time it finishes loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub hotkey: String,
    pub size_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Running,
    ShutDown,
}

/// A tray click this soon after a blur-hide is the same click that caused the
/// blur, so it does not toggle the overlay back on.
pub const TRAY_AFTER_BLUR: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct WindowController {
    window: Box<dyn WindowBackend>,
    hotkeys: HotkeyManager,
    content: ContentSurfaceProxy,
    config: Box<dyn ConfigStore>,
    state: OverlayWindowState,
    hide_policy: HidePolicy,
    app_version: Option<String>,
    lifecycle: Lifecycle,
    blur_hidden_at: Option<Instant>,
}

impl WindowController {
    pub fn new(
        window: Box<dyn WindowBackend>,
        hotkeys: HotkeyManager,
        content: ContentSurfaceProxy,
        config: Box<dyn ConfigStore>,
    ) -> Self {
        Self {
            window,
            hotkeys,
            content,
            config,
            state: OverlayWindowState {
                visibility: Visibility::Hidden,
                size: Configuration::default().window_size,
                position: None,
            },
            hide_policy: HidePolicy::for_current_platform(),
            app_version: None,
            lifecycle: Lifecycle::Created,
            blur_hidden_at: None,
        }
    }

    pub fn with_hide_policy(mut self, policy: HidePolicy) -> Self {
        self.hide_policy = policy;
        self
    }

    pub fn with_app_version(mut self, version: impl Into<String>) -> Self {
        self.app_version = Some(version.into());
        self
    }

    pub fn state(&self) -> &OverlayWindowState {
        &self.state
    }

    pub fn is_visible(&self) -> bool {
        self.state.visibility == Visibility::Visible
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn hotkeys(&self) -> &HotkeyManager {
        &self.hotkeys
    }

    pub fn content(&self) -> &ContentSurfaceProxy {
        &self.content
    }

    /// Applies persisted configuration, then presents the window. Launch
    /// always ends visible.
    pub fn init(&mut self) {
        if self.lifecycle != Lifecycle::Created {
            return;
        }

        let config = Configuration::load(self.config.as_ref());
        log::info!(
            "Applying configuration: hotkey='{}' size={}x{}",
            config.hotkey_binding,
            config.window_size.width,
            config.window_size.height
        );

        self.apply_size(config.window_size);
        self.hotkeys
            .register(&config.hotkey_binding, HotkeyAction::ToggleOverlay);

        self.lifecycle = Lifecycle::Running;
        self.toggle();
    }

    pub fn shutdown(&mut self) {
        if self.lifecycle == Lifecycle::ShutDown {
            return;
        }
        self.hotkeys.release_all();
        self.content.detach();
        self.lifecycle = Lifecycle::ShutDown;
        log::info!("Overlay controller shut down");
    }

    pub fn handle(&mut self, event: OverlayEvent) -> Flow {
        match self.lifecycle {
            Lifecycle::Running => {}
            Lifecycle::Created => {
                log::debug!("Ignoring {event:?}: controller not initialized");
                return Flow::Continue;
            }
            Lifecycle::ShutDown => return Flow::Exit,
        }

        match event {
            OverlayEvent::Hotkey(HotkeyAction::ToggleOverlay) => self.toggle(),
            OverlayEvent::TrayClicked => {
                let after_blur = self
                    .blur_hidden_at
                    .take()
                    .is_some_and(|at| at.elapsed() < TRAY_AFTER_BLUR);
                if after_blur {
                    log::debug!("Tray click right after blur; overlay stays hidden");
                } else {
                    self.toggle();
                }
            }
            OverlayEvent::Hotkey(HotkeyAction::ReloadContent) => {
                self.content.reload();
            }
            OverlayEvent::Hotkey(HotkeyAction::SuppressClose) => {}
            OverlayEvent::FocusChanged(true) => {
                // A focus event queued behind a hide must not capture keys.
                if self.is_visible() {
                    self.hotkeys.register_focus_scoped();
                }
            }
            OverlayEvent::FocusChanged(false) => {
                self.hotkeys.release_focus_scoped();
                if self.is_visible() {
                    self.hide();
                    self.blur_hidden_at = Some(Instant::now());
                }
            }
            OverlayEvent::CloseRequested => self.hide(),
            OverlayEvent::SettingsLoaded => {
                let snapshot = self.snapshot();
                if let Err(err) = self.window.publish_config(&snapshot) {
                    log::warn!("{err}");
                }
            }
            OverlayEvent::ContentLoaded => self.content.mark_loaded(),
            OverlayEvent::SnapshotRequested(reply) => {
                let _ = reply.send(self.snapshot());
            }
            OverlayEvent::Command(command) => return self.handle_command(command),
        }
        Flow::Continue
    }

    fn handle_command(&mut self, command: OverlayCommand) -> Flow {
        match command {
            OverlayCommand::SetHotkey(binding) => {
                let _ = self.rebind_hotkey(&binding);
            }
            OverlayCommand::SetWindowSize(preset) => {
                self.resize(&preset);
            }
            OverlayCommand::Back => {
                self.content.back();
            }
            OverlayCommand::Forward => {
                self.content.forward();
            }
            OverlayCommand::Refresh => {
                self.content.reload();
            }
            OverlayCommand::Go(target) => {
                self.content.navigate(&target);
            }
            OverlayCommand::Quit => {
                self.shutdown();
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    pub fn toggle(&mut self) {
        match self.state.visibility {
            Visibility::Hidden => self.show(),
            Visibility::Visible => self.hide(),
        }
    }

    /// Re-centers on the cursor's display every time; the last position is
    /// never reused.
    pub fn show(&mut self) {
        if let Some((x, y)) = self.target_position() {
            match self.window.set_position(x, y) {
                Ok(()) => self.state.position = Some((x, y)),
                Err(err) => log::warn!("{err}"),
            }
        }

        if let Err(err) = self.window.show() {
            log::warn!("{err}");
            return;
        }
        self.state.visibility = Visibility::Visible;
        self.blur_hidden_at = None;
    }

    pub fn hide(&mut self) {
        if self.state.visibility == Visibility::Hidden {
            return;
        }

        self.hotkeys.release_focus_scoped();

        let pre_hide = match self.hide_policy {
            HidePolicy::HideApplication => self.window.hide_application(),
            HidePolicy::MinimizeThenHide => self.window.minimize(),
        };
        if let Err(err) = pre_hide {
            log::warn!("{err}");
        }
        if let Err(err) = self.window.hide() {
            log::warn!("{err}");
        }
        self.state.visibility = Visibility::Hidden;
    }

    /// Unknown preset names leave everything untouched.
    pub fn resize(&mut self, preset: &str) -> bool {
        let Some(preset) = SizePreset::from_name(preset) else {
            log::warn!("Ignoring resize to unknown preset '{preset}'");
            return false;
        };
        let size = preset.size();

        self.apply_size(size);
        if let Err(err) = config_store::set(self.config.as_ref(), KEY_WINDOW_SIZE, &size) {
            log::warn!("Failed to persist window size: {err}");
        }
        self.show();
        true
    }

    /// The persisted binding is the one released; the new binding is persisted
    /// even when the OS refuses it, so the user's choice survives a restart.
    pub fn rebind_hotkey(&mut self, binding: &str) -> Result<(), HotkeyError> {
        let binding = binding.trim();
        let old: String =
            config_store::get_or(self.config.as_ref(), KEY_HOTKEY, DEFAULT_BINDING.to_string());

        let result = self
            .hotkeys
            .rebind(&old, binding, HotkeyAction::ToggleOverlay);
        if let Err(err @ HotkeyError::InvalidBinding { .. }) = &result {
            log::warn!("Rejected hotkey change: {err}");
            return result;
        }

        if let Err(err) = config_store::set(self.config.as_ref(), KEY_HOTKEY, &binding) {
            log::warn!("Failed to persist hotkey: {err}");
        }
        result
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        let config = Configuration::load(self.config.as_ref());
        ConfigSnapshot {
            hotkey: config.hotkey_binding,
            size_key: SizePreset::key_for(config.window_size).to_string(),
            app_version: self.app_version.clone(),
        }
    }

    fn apply_size(&mut self, size: WindowSize) {
        if let Err(err) = self.window.set_size(size) {
            log::warn!("{err}");
        }
        self.state.size = size;
        self.content.set_bounds(ContentBounds::below_strip(size));
    }

    fn target_position(&self) -> Option<(i32, i32)> {
        let cursor = self
            .window
            .cursor_position()
            .map_err(|err| log::warn!("{err}"))
            .ok()?;
        let displays = self
            .window
            .displays()
            .map_err(|err| log::warn!("{err}"))
            .ok()?;
        let size = self.window.outer_size().unwrap_or(self.state.size);

        let Some(pos) = compute_top_left(cursor, size, &displays) else {
            log::warn!("No display available; showing overlay in place");
            return None;
        };
        Some((pos.x, pos.y))
    }
}
