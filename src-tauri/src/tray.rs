use tauri::{
    menu::{Menu, MenuItem, PredefinedMenuItem},
    tray::{MouseButton, MouseButtonState, TrayIcon, TrayIconBuilder, TrayIconEvent},
};

use crate::services::events::{EventSender, OverlayCommand, OverlayEvent};

pub const TRAY_ID: &str = "overlay-tray";

/// Tray icon whose left click toggles the overlay. The menu (right click)
/// carries the same toggle plus quit, so the app stays reachable even when
/// the global shortcut could not be registered.
pub(crate) fn setup_tray(app: &tauri::App, events: EventSender) -> tauri::Result<TrayIcon> {
    let toggle_i = MenuItem::with_id(app, "toggle", "Show/Hide", true, None::<&str>)?;
    let quit_i = MenuItem::with_id(app, "quit", "Quit", true, None::<&str>)?;
    let sep = PredefinedMenuItem::separator(app)?;
    let menu = Menu::with_items(app, &[&toggle_i, &sep, &quit_i])?;
    let icon = app.default_window_icon().cloned();

    let menu_events = events.clone();

    let mut builder = TrayIconBuilder::with_id(TRAY_ID)
        .tooltip("Quick Overlay")
        .menu(&menu)
        .show_menu_on_left_click(false)
        .on_menu_event(move |_app, event| match event.id().as_ref() {
            "toggle" => menu_events.post(OverlayEvent::TrayClicked),
            "quit" => menu_events.post(OverlayEvent::Command(OverlayCommand::Quit)),
            _ => {}
        })
        .on_tray_icon_event(move |_tray, event| {
            // Down and Up both arrive; only Up toggles.
            if let TrayIconEvent::Click {
                button: MouseButton::Left,
                button_state: MouseButtonState::Up,
                ..
            } = event
            {
                events.post(OverlayEvent::TrayClicked);
            }
        });

    if let Some(i) = icon {
        builder = builder.icon(i);
    }

    builder.build(app)
}
