//! In-memory doubles for the OS-facing seams, shared by the unit tests.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tauri::Url;

use super::content::{ContentBounds, ContentError, ContentSurface, ExternalOpener};
use super::hotkeys::{parse_binding, HotkeyAction, HotkeyError, ShortcutBackend};
use super::positioner::{DisplayBounds, Point};
use super::presets::WindowSize;
use super::window_controller::{ConfigSnapshot, WindowBackend, WindowError};
use crate::config_store::{ConfigError, ConfigStore};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Clones share one map, so a second controller built from a clone sees what
/// the first one persisted (a restart).
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<Map<String, Value>>>,
}

impl MemoryStore {
    pub fn insert(&self, key: &str, value: Value) {
        lock(&self.values).insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        lock(&self.values).get(key).cloned()
    }
}

impl ConfigStore for MemoryStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.get(key)
    }

    fn set_value(&self, key: &str, value: Value) -> Result<(), ConfigError> {
        self.insert(key, value);
        Ok(())
    }
}

#[derive(Default)]
struct ShortcutState {
    registered: Vec<(String, HotkeyAction)>,
    refused: HashSet<String>,
    calls: Vec<String>,
}

#[derive(Clone, Default)]
pub struct MockShortcuts {
    state: Arc<Mutex<ShortcutState>>,
}

impl MockShortcuts {
    /// Makes the OS refuse `binding`, as if another app already owns it.
    pub fn refuse(&self, binding: &str) {
        lock(&self.state).refused.insert(binding.to_string());
    }

    pub fn registered(&self) -> Vec<String> {
        lock(&self.state)
            .registered
            .iter()
            .map(|(b, _)| b.clone())
            .collect()
    }

    pub fn action_for(&self, binding: &str) -> Option<HotkeyAction> {
        lock(&self.state)
            .registered
            .iter()
            .find(|(b, _)| b == binding)
            .map(|(_, action)| *action)
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }
}

impl ShortcutBackend for MockShortcuts {
    fn register(&mut self, binding: &str, action: HotkeyAction) -> Result<(), HotkeyError> {
        parse_binding(binding)?;
        let mut state = lock(&self.state);
        state.calls.push(format!("register {binding}"));

        if state.refused.contains(binding) {
            return Err(HotkeyError::Refused {
                binding: binding.to_string(),
                reason: "already registered by another application".to_string(),
            });
        }
        if state.registered.iter().any(|(b, _)| b == binding) {
            return Err(HotkeyError::Refused {
                binding: binding.to_string(),
                reason: "already registered".to_string(),
            });
        }
        state.registered.push((binding.to_string(), action));
        Ok(())
    }

    fn unregister(&mut self, binding: &str) -> Result<(), HotkeyError> {
        let mut state = lock(&self.state);
        state.calls.push(format!("unregister {binding}"));
        state.registered.retain(|(b, _)| b != binding);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MockContent {
    calls: Arc<Mutex<Vec<String>>>,
}

impl MockContent {
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: String) -> Result<(), ContentError> {
        lock(&self.calls).push(call);
        Ok(())
    }
}

impl ContentSurface for MockContent {
    fn go_back(&mut self) -> Result<(), ContentError> {
        self.record("back".to_string())
    }

    fn go_forward(&mut self) -> Result<(), ContentError> {
        self.record("forward".to_string())
    }

    fn reload(&mut self) -> Result<(), ContentError> {
        self.record("reload".to_string())
    }

    fn load_url(&mut self, url: &Url) -> Result<(), ContentError> {
        self.record(format!("load {url}"))
    }

    fn set_bounds(&mut self, b: ContentBounds) -> Result<(), ContentError> {
        self.record(format!("bounds {},{} {}x{}", b.x, b.y, b.width, b.height))
    }
}

#[derive(Clone, Default)]
pub struct MockOpener {
    opened: Arc<Mutex<Vec<String>>>,
}

impl MockOpener {
    pub fn opened(&self) -> Vec<String> {
        lock(&self.opened).clone()
    }
}

impl ExternalOpener for MockOpener {
    fn open_external(&self, url: &Url) -> Result<(), ContentError> {
        lock(&self.opened).push(url.to_string());
        Ok(())
    }
}

struct WindowState {
    cursor: Point,
    displays: Vec<DisplayBounds>,
    size: Option<WindowSize>,
    position: Option<(i32, i32)>,
    failing: HashSet<&'static str>,
    calls: Vec<String>,
    published: Vec<ConfigSnapshot>,
}

/// Records mutating calls; queries are answered from configurable state. The
/// outer size is whatever was last set.
#[derive(Clone)]
pub struct MockWindow {
    state: Arc<Mutex<WindowState>>,
}

impl Default for MockWindow {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(WindowState {
                cursor: Point { x: 100.0, y: 100.0 },
                displays: vec![DisplayBounds {
                    x: 0,
                    y: 0,
                    width: 1920,
                    height: 1080,
                }],
                size: None,
                position: None,
                failing: HashSet::new(),
                calls: Vec::new(),
                published: Vec::new(),
            })),
        }
    }
}

impl MockWindow {
    pub fn set_cursor(&self, cursor: Point) {
        lock(&self.state).cursor = cursor;
    }

    pub fn set_displays(&self, displays: Vec<DisplayBounds>) {
        lock(&self.state).displays = displays;
    }

    /// Makes every later call to `op` fail.
    pub fn fail(&self, op: &'static str) {
        lock(&self.state).failing.insert(op);
    }

    pub fn size(&self) -> Option<WindowSize> {
        lock(&self.state).size
    }

    pub fn position(&self) -> Option<(i32, i32)> {
        lock(&self.state).position
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.state).calls.clone()
    }

    /// Number of recorded calls to `op`.
    pub fn count(&self, op: &str) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|call| call.split(' ').next() == Some(op))
            .count()
    }

    pub fn published(&self) -> Vec<ConfigSnapshot> {
        lock(&self.state).published.clone()
    }

    fn record(&self, op: &'static str, call: String) -> Result<MutexGuard<'_, WindowState>, WindowError> {
        let mut state = lock(&self.state);
        if state.failing.contains(op) {
            return Err(WindowError::new(op, "mock failure"));
        }
        state.calls.push(call);
        Ok(state)
    }
}

impl WindowBackend for MockWindow {
    fn cursor_position(&self) -> Result<Point, WindowError> {
        Ok(lock(&self.state).cursor)
    }

    fn displays(&self) -> Result<Vec<DisplayBounds>, WindowError> {
        Ok(lock(&self.state).displays.clone())
    }

    fn outer_size(&self) -> Result<WindowSize, WindowError> {
        lock(&self.state)
            .size
            .ok_or_else(|| WindowError::new("outer_size", "window has no size yet"))
    }

    fn set_size(&self, size: WindowSize) -> Result<(), WindowError> {
        let mut state = self.record("set_size", format!("set_size {}x{}", size.width, size.height))?;
        state.size = Some(size);
        Ok(())
    }

    fn set_position(&self, x: i32, y: i32) -> Result<(), WindowError> {
        let mut state = self.record("set_position", format!("set_position {x},{y}"))?;
        state.position = Some((x, y));
        Ok(())
    }

    fn show(&self) -> Result<(), WindowError> {
        self.record("show", "show".to_string()).map(drop)
    }

    fn minimize(&self) -> Result<(), WindowError> {
        self.record("minimize", "minimize".to_string()).map(drop)
    }

    fn hide(&self) -> Result<(), WindowError> {
        self.record("hide", "hide".to_string()).map(drop)
    }

    fn hide_application(&self) -> Result<(), WindowError> {
        self.record("hide_application", "hide_application".to_string())
            .map(drop)
    }

    fn publish_config(&self, snapshot: &ConfigSnapshot) -> Result<(), WindowError> {
        let mut state = self.record("publish_config", "publish_config".to_string())?;
        state.published.push(snapshot.clone());
        Ok(())
    }
}
