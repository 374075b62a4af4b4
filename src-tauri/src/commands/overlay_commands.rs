use tauri::State;
use tokio::sync::oneshot;

use crate::services::events::{EventSender, OverlayCommand, OverlayEvent};
use crate::services::hotkeys::parse_binding;
use crate::services::presets::SizePreset;
use crate::services::window_controller::ConfigSnapshot;

// Commands only validate and enqueue; the control loop applies them in order.

#[tauri::command]
pub fn set_hotkey(events: State<'_, EventSender>, hotkey: String) -> Result<(), String> {
    parse_binding(&hotkey).map_err(|e| e.to_string())?;
    events.post(OverlayEvent::Command(OverlayCommand::SetHotkey(hotkey)));
    Ok(())
}

#[tauri::command]
pub fn set_window_size(events: State<'_, EventSender>, size_key: String) -> Result<(), String> {
    let preset = size_preset_arg(&size_key)?;
    events.post(OverlayEvent::Command(OverlayCommand::SetWindowSize(
        preset.name().to_string(),
    )));
    Ok(())
}

fn size_preset_arg(size_key: &str) -> Result<SizePreset, String> {
    SizePreset::from_name(size_key).ok_or_else(|| format!("unknown window size '{size_key}'"))
}

#[tauri::command]
pub fn back(events: State<'_, EventSender>) {
    events.post(OverlayEvent::Command(OverlayCommand::Back));
}

#[tauri::command]
pub fn forward(events: State<'_, EventSender>) {
    events.post(OverlayEvent::Command(OverlayCommand::Forward));
}

#[tauri::command]
pub fn refresh(events: State<'_, EventSender>) {
    events.post(OverlayEvent::Command(OverlayCommand::Refresh));
}

/// `target` is an absolute URL or a path on the content origin.
#[tauri::command]
pub fn go(events: State<'_, EventSender>, target: String) {
    events.post(OverlayEvent::Command(OverlayCommand::Go(target)));
}

#[tauri::command]
pub fn quit(events: State<'_, EventSender>) {
    events.post(OverlayEvent::Command(OverlayCommand::Quit));
}

#[tauri::command]
pub async fn get_config(events: State<'_, EventSender>) -> Result<ConfigSnapshot, String> {
    let (tx, rx) = oneshot::channel();
    events.post(OverlayEvent::SnapshotRequested(tx));
    rx.await.map_err(|_| "overlay controller is not running".to_string())
}
