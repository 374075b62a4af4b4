//! Command relay for the embedded content surface.
//!
//! The surface is created by the shell but owned by the remote page; commands
//! only reach it once its first load has finished.

use tauri::{AppHandle, LogicalPosition, LogicalSize, Url};
use tauri_plugin_opener::OpenerExt;

use super::presets::WindowSize;

/// Height of the control strip above the content surface, in logical pixels.
pub const CONTENT_TOP_OFFSET: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("cannot resolve '{target}': {reason}")]
    InvalidTarget { target: String, reason: String },
    #[error("content surface operation '{op}' failed: {message}")]
    Surface { op: &'static str, message: String },
    #[error("failed to open '{url}' externally: {message}")]
    External { url: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ContentBounds {
    /// Everything below the control strip.
    pub fn below_strip(window: WindowSize) -> Self {
        Self {
            x: 0,
            y: CONTENT_TOP_OFFSET,
            width: window.width,
            height: window.height.saturating_sub(CONTENT_TOP_OFFSET),
        }
    }
}

pub trait ContentSurface: Send {
    fn go_back(&mut self) -> Result<(), ContentError>;
    fn go_forward(&mut self) -> Result<(), ContentError>;
    fn reload(&mut self) -> Result<(), ContentError>;
    fn load_url(&mut self, url: &Url) -> Result<(), ContentError>;
    fn set_bounds(&mut self, bounds: ContentBounds) -> Result<(), ContentError>;
}

/// The system's default handler for URLs the overlay refuses to load.
pub trait ExternalOpener: Send {
    fn open_external(&self, url: &Url) -> Result<(), ContentError>;
}

/// Same-origin allow-list for the content surface.
#[derive(Debug, Clone)]
pub struct ContentPolicy {
    home: Url,
    extra_hosts: Vec<String>,
}

impl ContentPolicy {
    pub fn new(home: Url, extra_hosts: impl IntoIterator<Item = String>) -> Self {
        Self {
            home,
            extra_hosts: extra_hosts
                .into_iter()
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect(),
        }
    }

    pub fn home(&self) -> &Url {
        &self.home
    }

    /// Absolute URLs pass through; anything else is a path on the home origin.
    pub fn resolve(&self, target: &str) -> Result<Url, ContentError> {
        let target = target.trim();
        Url::parse(target)
            .or_else(|_| self.home.join(target))
            .map_err(|e| ContentError::InvalidTarget {
                target: target.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn is_allowed(&self, url: &Url) -> bool {
        if url.origin() == self.home.origin() {
            return true;
        }
        if url.scheme() != "https" {
            return false;
        }
        url.host_str()
            .is_some_and(|host| self.extra_hosts.iter().any(|h| h == host))
    }

    /// Where a destination may be shown. Only web and mail links ever reach
    /// the system handler; `file:`, `smb:` and app protocol handlers are dropped.
    pub fn route(&self, url: &Url) -> ContentRoute {
        if self.is_allowed(url) {
            ContentRoute::InPlace
        } else if EXTERNAL_SCHEMES.contains(&url.scheme()) {
            ContentRoute::External
        } else {
            ContentRoute::Drop
        }
    }

    /// Guard for navigations the page starts itself. Document-internal
    /// schemes stay in place without an external hand-off.
    pub fn allows_in_page(&self, url: &Url) -> bool {
        matches!(url.scheme(), "about" | "blob" | "data") || self.is_allowed(url)
    }

    /// Target to relay through [`ContentSurfaceProxy::navigate`] for a
    /// navigation or popup the page was not allowed to perform itself.
    pub fn relay_target(&self, url: &Url) -> Option<String> {
        match self.route(url) {
            ContentRoute::Drop => {
                log::warn!("Blocked page request to {url}");
                None
            }
            ContentRoute::InPlace | ContentRoute::External => Some(url.to_string()),
        }
    }
}

const EXTERNAL_SCHEMES: [&str; 3] = ["http", "https", "mailto"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentRoute {
    InPlace,
    External,
    Drop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Forwarded,
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    Loaded,
    OpenedExternally,
    Dropped,
    Rejected,
}

pub struct ContentSurfaceProxy {
    surface: Option<Box<dyn ContentSurface>>,
    loaded: bool,
    policy: ContentPolicy,
    opener: Box<dyn ExternalOpener>,
}

impl ContentSurfaceProxy {
    pub fn new(policy: ContentPolicy, opener: Box<dyn ExternalOpener>) -> Self {
        Self {
            surface: None,
            loaded: false,
            policy,
            opener,
        }
    }

    pub fn with_surface(mut self, surface: Box<dyn ContentSurface>) -> Self {
        self.attach(surface);
        self
    }

    pub fn attach(&mut self, surface: Box<dyn ContentSurface>) {
        self.surface = Some(surface);
        self.loaded = false;
    }

    pub fn detach(&mut self) {
        self.surface = None;
        self.loaded = false;
    }

    pub fn mark_loaded(&mut self) {
        if self.surface.is_some() && !self.loaded {
            log::debug!("Content surface finished its initial load");
            self.loaded = true;
        }
    }

    pub fn is_ready(&self) -> bool {
        self.loaded && self.surface.is_some()
    }

    pub fn policy(&self) -> &ContentPolicy {
        &self.policy
    }

    pub fn back(&mut self) -> CommandOutcome {
        self.forward_command("back", |s| s.go_back())
    }

    pub fn forward(&mut self) -> CommandOutcome {
        self.forward_command("forward", |s| s.go_forward())
    }

    pub fn reload(&mut self) -> CommandOutcome {
        self.forward_command("reload", |s| s.reload())
    }

    /// Off-origin web targets go to the external opener whether or not the
    /// surface is ready; on-origin targets need a loaded surface.
    pub fn navigate(&mut self, target: &str) -> NavigationOutcome {
        let url = match self.policy.resolve(target) {
            Ok(url) => url,
            Err(err) => {
                log::warn!("Navigation rejected: {err}");
                return NavigationOutcome::Rejected;
            }
        };

        match self.policy.route(&url) {
            ContentRoute::InPlace => {}
            ContentRoute::External => {
                return match self.opener.open_external(&url) {
                    Ok(()) => {
                        log::info!("Opened off-origin URL externally: {url}");
                        NavigationOutcome::OpenedExternally
                    }
                    Err(err) => {
                        log::warn!("{err}");
                        NavigationOutcome::Rejected
                    }
                };
            }
            ContentRoute::Drop => {
                log::warn!("Refusing to hand '{}' URL to the system: {url}", url.scheme());
                return NavigationOutcome::Rejected;
            }
        }

        match self.forward_command("navigate", |s| s.load_url(&url)) {
            CommandOutcome::Forwarded => NavigationOutcome::Loaded,
            CommandOutcome::Dropped => NavigationOutcome::Dropped,
        }
    }

    /// Geometry applies as soon as the surface exists, loaded or not.
    pub fn set_bounds(&mut self, bounds: ContentBounds) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };
        if let Err(err) = surface.set_bounds(bounds) {
            log::warn!("{err}");
        }
    }

    fn forward_command(
        &mut self,
        name: &str,
        command: impl FnOnce(&mut dyn ContentSurface) -> Result<(), ContentError>,
    ) -> CommandOutcome {
        if !self.loaded {
            log::debug!("Dropped content command '{name}': surface not ready");
            return CommandOutcome::Dropped;
        }
        let Some(surface) = self.surface.as_mut() else {
            log::debug!("Dropped content command '{name}': no surface attached");
            return CommandOutcome::Dropped;
        };
        if let Err(err) = command(surface.as_mut()) {
            log::warn!("{err}");
        }
        CommandOutcome::Forwarded
    }
}

pub struct TauriContentSurface {
    webview: tauri::Webview,
}

impl TauriContentSurface {
    pub fn new(webview: tauri::Webview) -> Self {
        Self { webview }
    }

    fn eval(&self, op: &'static str, script: &str) -> Result<(), ContentError> {
        self.webview.eval(script).map_err(|e| ContentError::Surface {
            op,
            message: e.to_string(),
        })
    }
}

impl ContentSurface for TauriContentSurface {
    fn go_back(&mut self) -> Result<(), ContentError> {
        self.eval("back", "window.history.back()")
    }

    fn go_forward(&mut self) -> Result<(), ContentError> {
        self.eval("forward", "window.history.forward()")
    }

    fn reload(&mut self) -> Result<(), ContentError> {
        self.eval("reload", "window.location.reload()")
    }

    fn load_url(&mut self, url: &Url) -> Result<(), ContentError> {
        self.webview
            .navigate(url.clone())
            .map_err(|e| ContentError::Surface {
                op: "navigate",
                message: e.to_string(),
            })
    }

    fn set_bounds(&mut self, bounds: ContentBounds) -> Result<(), ContentError> {
        let op_err = |e: tauri::Error| ContentError::Surface {
            op: "set_bounds",
            message: e.to_string(),
        };
        self.webview
            .set_position(LogicalPosition::new(bounds.x as f64, bounds.y as f64))
            .map_err(op_err)?;
        self.webview
            .set_size(LogicalSize::new(bounds.width as f64, bounds.height as f64))
            .map_err(op_err)
    }
}

pub struct TauriOpener {
    app: AppHandle,
}

impl TauriOpener {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }
}

impl ExternalOpener for TauriOpener {
    fn open_external(&self, url: &Url) -> Result<(), ContentError> {
        self.app
            .opener()
            .open_url(url.as_str(), None::<&str>)
            .map_err(|e| ContentError::External {
                url: url.to_string(),
                message: e.to_string(),
            })
    }
}
