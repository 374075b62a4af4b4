use tokio::sync::{mpsc, oneshot};

use super::hotkeys::HotkeyAction;
use super::window_controller::ConfigSnapshot;

/// Requests arriving from the settings surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayCommand {
    SetHotkey(String),
    SetWindowSize(String),
    Back,
    Forward,
    Refresh,
    Go(String),
    Quit,
}

/// Everything that can change overlay state. All of it funnels through one
/// channel so the controller is the only writer.
#[derive(Debug)]
pub enum OverlayEvent {
    Hotkey(HotkeyAction),
    TrayClicked,
    FocusChanged(bool),
    CloseRequested,
    SettingsLoaded,
    ContentLoaded,
    Command(OverlayCommand),
    SnapshotRequested(oneshot::Sender<ConfigSnapshot>),
}

#[derive(Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<OverlayEvent>,
}

impl EventSender {
    pub fn post(&self, event: OverlayEvent) {
        if let Err(err) = self.tx.send(event) {
            log::debug!("Control loop stopped; dropped {:?}", err.0);
        }
    }
}

pub fn channel() -> (EventSender, mpsc::UnboundedReceiver<OverlayEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}
