//! Global shortcut bookkeeping for the overlay.
//!
//! Two disjoint sets are tracked: the single persisted toggle binding, and the
//! focus-scoped shortcuts that only exist while the overlay owns input focus.

use smallvec::SmallVec;
use std::str::FromStr;
use tauri::AppHandle;
use tauri_plugin_global_shortcut::{GlobalShortcutExt, Shortcut, ShortcutState};

use super::events::{EventSender, OverlayEvent};

pub const DEFAULT_BINDING: &str = "Cmd+E";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    ToggleOverlay,
    ReloadContent,
    /// Swallows the keystroke so it never reaches the content surface.
    SuppressClose,
}

const FOCUS_BINDINGS: [(&str, HotkeyAction); 4] = [
    ("CmdOrCtrl+W", HotkeyAction::SuppressClose),
    ("CmdOrCtrl+R", HotkeyAction::ReloadContent),
    ("CmdOrCtrl+Shift+R", HotkeyAction::ReloadContent),
    ("F5", HotkeyAction::ReloadContent),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HotkeyError {
    #[error("invalid accelerator '{binding}': {reason}")]
    InvalidBinding { binding: String, reason: String },
    #[error("accelerator '{binding}' was refused: {reason}")]
    Refused { binding: String, reason: String },
}

pub fn parse_binding(binding: &str) -> Result<Shortcut, HotkeyError> {
    Shortcut::from_str(binding.trim()).map_err(|e| HotkeyError::InvalidBinding {
        binding: binding.to_string(),
        reason: e.to_string(),
    })
}

pub fn is_valid_binding(binding: &str) -> bool {
    parse_binding(binding).is_ok()
}

/// Two spellings of the same key combination (`cmd+e` / `Cmd+E`) are one binding.
pub fn same_binding(a: &str, b: &str) -> bool {
    match (parse_binding(a), parse_binding(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a.trim() == b.trim(),
    }
}

/// OS-level shortcut registry.
pub trait ShortcutBackend: Send {
    fn register(&mut self, binding: &str, action: HotkeyAction) -> Result<(), HotkeyError>;
    /// Must succeed silently when `binding` is not registered.
    fn unregister(&mut self, binding: &str) -> Result<(), HotkeyError>;
}

pub struct HotkeyManager {
    backend: Box<dyn ShortcutBackend>,
    active: Option<String>,
    focus_scoped: SmallVec<[String; 4]>,
}

impl HotkeyManager {
    pub fn new(backend: Box<dyn ShortcutBackend>) -> Self {
        Self {
            backend,
            active: None,
            focus_scoped: SmallVec::new(),
        }
    }

    pub fn active_binding(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn focus_bindings(&self) -> &[String] {
        &self.focus_scoped
    }

    /// Claims the toggle slot for `binding`. A refusal leaves the slot empty
    /// (tray-only operation) and is not an error for the caller.
    pub fn register(&mut self, binding: &str, action: HotkeyAction) -> bool {
        if let Some(current) = self.active.clone() {
            if same_binding(&current, binding) {
                return true;
            }
            self.unregister(&current);
        }
        self.release_focus_binding(binding);

        match self.backend.register(binding, action) {
            Ok(()) => {
                log::info!("Registered global shortcut '{binding}'");
                self.active = Some(binding.to_string());
                true
            }
            Err(err) => {
                log::warn!("Global shortcut unavailable, tray toggle only: {err}");
                false
            }
        }
    }

    /// Idempotent: unknown bindings are ignored without touching the OS.
    pub fn unregister(&mut self, binding: &str) {
        if self
            .active
            .as_deref()
            .is_some_and(|active| same_binding(active, binding))
        {
            if let Some(active) = self.active.take() {
                if let Err(err) = self.backend.unregister(&active) {
                    log::warn!("Failed to release shortcut '{active}': {err}");
                }
            }
            return;
        }
        self.release_focus_binding(binding);
    }

    /// Releases `old` (and anything else holding the toggle slot) before
    /// registering `new`. An unparsable `new` is rejected up front so the old
    /// binding stays live.
    pub fn rebind(
        &mut self,
        old: &str,
        new: &str,
        action: HotkeyAction,
    ) -> Result<(), HotkeyError> {
        parse_binding(new)?;

        if self
            .active
            .as_deref()
            .is_some_and(|active| same_binding(active, new))
        {
            return Ok(());
        }

        self.unregister(old);
        if let Some(stale) = self.active.clone() {
            self.unregister(&stale);
        }
        self.release_focus_binding(new);

        match self.backend.register(new, action) {
            Ok(()) => {
                log::info!("Rebound toggle shortcut '{old}' -> '{new}'");
                self.active = Some(new.to_string());
                Ok(())
            }
            Err(err) => {
                log::warn!("Global shortcut unavailable after rebind, tray toggle only: {err}");
                Err(err)
            }
        }
    }

    pub fn register_focus_scoped(&mut self) {
        for (binding, action) in FOCUS_BINDINGS {
            if self.focus_scoped.iter().any(|held| held == binding) {
                continue;
            }
            if self
                .active
                .as_deref()
                .is_some_and(|active| same_binding(active, binding))
            {
                continue;
            }
            match self.backend.register(binding, action) {
                Ok(()) => self.focus_scoped.push(binding.to_string()),
                Err(err) => log::debug!("Skipping focus shortcut: {err}"),
            }
        }
    }

    pub fn release_focus_scoped(&mut self) {
        for binding in self.focus_scoped.drain(..) {
            if let Err(err) = self.backend.unregister(&binding) {
                log::warn!("Failed to release focus shortcut '{binding}': {err}");
            }
        }
    }

    pub fn release_all(&mut self) {
        self.release_focus_scoped();
        if let Some(active) = self.active.take() {
            if let Err(err) = self.backend.unregister(&active) {
                log::warn!("Failed to release shortcut '{active}': {err}");
            }
        }
    }

    fn release_focus_binding(&mut self, binding: &str) {
        let Some(index) = self
            .focus_scoped
            .iter()
            .position(|held| same_binding(held, binding))
        else {
            return;
        };
        let held = self.focus_scoped.remove(index);
        if let Err(err) = self.backend.unregister(&held) {
            log::warn!("Failed to release focus shortcut '{held}': {err}");
        }
    }
}

/// Registers accelerators through `tauri-plugin-global-shortcut`; presses are
/// posted to the control loop rather than handled on the OS callback thread.
pub struct TauriShortcutBackend {
    app: AppHandle,
    events: EventSender,
}

impl TauriShortcutBackend {
    pub fn new(app: AppHandle, events: EventSender) -> Self {
        Self { app, events }
    }
}

impl ShortcutBackend for TauriShortcutBackend {
    fn register(&mut self, binding: &str, action: HotkeyAction) -> Result<(), HotkeyError> {
        let shortcut = parse_binding(binding)?;
        let events = self.events.clone();
        self.app
            .global_shortcut()
            .on_shortcut(shortcut, move |_app, _shortcut, event| {
                if event.state == ShortcutState::Pressed {
                    events.post(OverlayEvent::Hotkey(action));
                }
            })
            .map_err(|e| HotkeyError::Refused {
                binding: binding.to_string(),
                reason: e.to_string(),
            })
    }

    fn unregister(&mut self, binding: &str) -> Result<(), HotkeyError> {
        let shortcut = parse_binding(binding)?;
        let shortcuts = self.app.global_shortcut();
        if !shortcuts.is_registered(shortcut) {
            return Ok(());
        }
        shortcuts
            .unregister(shortcut)
            .map_err(|e| HotkeyError::Refused {
                binding: binding.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::MockShortcuts;

    #[test]
    fn test_parse_binding() {
        assert!(is_valid_binding("Cmd+E"));
        assert!(is_valid_binding("CmdOrCtrl+Shift+R"));
        assert!(is_valid_binding("F5"));
        assert!(!is_valid_binding(""));
        assert!(!is_valid_binding("Ctrl+"));
        assert!(!is_valid_binding("Hyper+Banana"));
    }

    #[test]
    fn test_same_binding_ignores_case() {
        assert!(same_binding("cmd+e", "Cmd+E"));
        assert!(!same_binding("Cmd+E", "Cmd+R"));
    }

    #[test]
    fn test_register_keeps_one_toggle_binding() {
        let mock = MockShortcuts::default();
        let mut manager = HotkeyManager::new(Box::new(mock.clone()));

        assert!(manager.register("Cmd+E", HotkeyAction::ToggleOverlay));
        assert!(manager.register("Alt+Space", HotkeyAction::ToggleOverlay));

        assert_eq!(manager.active_binding(), Some("Alt+Space"));
        assert_eq!(mock.registered(), vec!["Alt+Space".to_string()]);
    }

    #[test]
    fn test_refused_registration_is_non_fatal() {
        let mock = MockShortcuts::default();
        mock.refuse("Cmd+E");
        let mut manager = HotkeyManager::new(Box::new(mock.clone()));

        assert!(!manager.register("Cmd+E", HotkeyAction::ToggleOverlay));
        assert_eq!(manager.active_binding(), None);
        assert!(mock.registered().is_empty());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mock = MockShortcuts::default();
        let mut manager = HotkeyManager::new(Box::new(mock.clone()));
        manager.register("Cmd+E", HotkeyAction::ToggleOverlay);

        manager.unregister("Cmd+E");
        let calls_after_first = mock.calls().len();
        manager.unregister("Cmd+E");
        manager.unregister("Alt+Q");

        assert_eq!(manager.active_binding(), None);
        assert!(mock.registered().is_empty());
        assert_eq!(mock.calls().len(), calls_after_first);
    }

    #[test]
    fn test_rebind_swaps_bindings() {
        let mock = MockShortcuts::default();
        let mut manager = HotkeyManager::new(Box::new(mock.clone()));
        manager.register("Cmd+E", HotkeyAction::ToggleOverlay);

        manager
            .rebind("Cmd+E", "Alt+Space", HotkeyAction::ToggleOverlay)
            .unwrap();

        assert_eq!(mock.action_for("Cmd+E"), None);
        assert_eq!(
            mock.action_for("Alt+Space"),
            Some(HotkeyAction::ToggleOverlay)
        );
        assert_eq!(
            mock.calls(),
            vec![
                "register Cmd+E".to_string(),
                "unregister Cmd+E".to_string(),
                "register Alt+Space".to_string(),
            ]
        );
    }

    #[test]
    fn test_rebind_rejects_invalid_binding_without_releasing_old() {
        let mock = MockShortcuts::default();
        let mut manager = HotkeyManager::new(Box::new(mock.clone()));
        manager.register("Cmd+E", HotkeyAction::ToggleOverlay);

        let err = manager
            .rebind("Cmd+E", "Cmd+", HotkeyAction::ToggleOverlay)
            .unwrap_err();

        assert!(matches!(err, HotkeyError::InvalidBinding { .. }));
        assert_eq!(manager.active_binding(), Some("Cmd+E"));
        assert_eq!(mock.registered(), vec!["Cmd+E".to_string()]);
    }

    #[test]
    fn test_rebind_releases_stale_slot_when_old_differs() {
        let mock = MockShortcuts::default();
        let mut manager = HotkeyManager::new(Box::new(mock.clone()));
        manager.register("Alt+Q", HotkeyAction::ToggleOverlay);

        manager
            .rebind("Cmd+E", "Alt+W", HotkeyAction::ToggleOverlay)
            .unwrap();

        assert_eq!(mock.registered(), vec!["Alt+W".to_string()]);
    }

    #[test]
    fn test_focus_scoped_cycle_does_not_accumulate() {
        let mock = MockShortcuts::default();
        let mut manager = HotkeyManager::new(Box::new(mock.clone()));
        manager.register("Cmd+E", HotkeyAction::ToggleOverlay);

        for _ in 0..3 {
            manager.register_focus_scoped();
            manager.register_focus_scoped();
            assert_eq!(manager.focus_bindings().len(), 4);
            assert_eq!(mock.registered().len(), 5);

            manager.release_focus_scoped();
            assert!(manager.focus_bindings().is_empty());
            assert_eq!(mock.registered(), vec!["Cmd+E".to_string()]);
        }
    }

    #[test]
    fn test_focus_scoped_skips_toggle_binding() {
        let mock = MockShortcuts::default();
        let mut manager = HotkeyManager::new(Box::new(mock.clone()));
        manager.register("F5", HotkeyAction::ToggleOverlay);

        manager.register_focus_scoped();

        assert_eq!(manager.focus_bindings().len(), 3);
        assert_eq!(mock.action_for("F5"), Some(HotkeyAction::ToggleOverlay));

        manager.release_focus_scoped();
        assert_eq!(manager.active_binding(), Some("F5"));
        assert_eq!(mock.action_for("F5"), Some(HotkeyAction::ToggleOverlay));
    }

    #[test]
    fn test_rebind_onto_focus_binding_takes_it_over() {
        let mock = MockShortcuts::default();
        let mut manager = HotkeyManager::new(Box::new(mock.clone()));
        manager.register("Cmd+E", HotkeyAction::ToggleOverlay);
        manager.register_focus_scoped();

        manager
            .rebind("Cmd+E", "F5", HotkeyAction::ToggleOverlay)
            .unwrap();

        assert_eq!(mock.action_for("F5"), Some(HotkeyAction::ToggleOverlay));
        assert!(!manager.focus_bindings().iter().any(|b| b == "F5"));

        manager.release_focus_scoped();
        assert_eq!(mock.registered(), vec!["F5".to_string()]);
    }

    #[test]
    fn test_release_all() {
        let mock = MockShortcuts::default();
        let mut manager = HotkeyManager::new(Box::new(mock.clone()));
        manager.register("Cmd+E", HotkeyAction::ToggleOverlay);
        manager.register_focus_scoped();

        manager.release_all();

        assert!(mock.registered().is_empty());
        assert_eq!(manager.active_binding(), None);
    }
}
