use tauri::Manager;
use tokio::sync::mpsc::UnboundedReceiver;

pub mod commands;
pub mod config_store;
pub mod services;
mod tray;
pub mod windows;

use config_store::{Configuration, JsonFileStore};
use services::config::AppSettings;
use services::content::{ContentPolicy, ContentSurfaceProxy, TauriContentSurface, TauriOpener};
use services::events::{self, OverlayEvent};
use services::hotkeys::{HotkeyManager, TauriShortcutBackend};
use services::window_controller::{Flow, WindowController};
use windows::overlay_window::{build_overlay_window, TauriWindowBackend};

pub fn run() {
    let settings = match AppSettings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("invalid settings: {err}");
            return;
        }
    };
    let (events, rx) = events::channel();

    tauri::Builder::default()
        .plugin(
            tauri_plugin_log::Builder::new()
                .level(settings.log_level)
                .build(),
        )
        .plugin(tauri_plugin_global_shortcut::Builder::new().build())
        .plugin(tauri_plugin_opener::init())
        .manage(events.clone())
        .invoke_handler(tauri::generate_handler![
            commands::overlay_commands::set_hotkey,
            commands::overlay_commands::set_window_size,
            commands::overlay_commands::back,
            commands::overlay_commands::forward,
            commands::overlay_commands::refresh,
            commands::overlay_commands::go,
            commands::overlay_commands::quit,
            commands::overlay_commands::get_config,
        ])
        .setup(move |app| {
            // No dock icon; the tray is the only persistent surface.
            #[cfg(target_os = "macos")]
            app.set_activation_policy(tauri::ActivationPolicy::Accessory);

            let handle = app.handle().clone();
            let store = JsonFileStore::in_app_data_dir(&handle)?;
            log::info!("Config store: {}", store.path().display());
            let initial = Configuration::load(&store);

            let policy = ContentPolicy::new(settings.content_url.clone(), settings.allowed_hosts.clone());
            let overlay = build_overlay_window(&handle, &policy, initial.window_size, events.clone())?;
            tray::setup_tray(app, events.clone())?;

            let content = ContentSurfaceProxy::new(policy, Box::new(TauriOpener::new(handle.clone())))
                .with_surface(Box::new(TauriContentSurface::new(overlay.content)));
            let controller = WindowController::new(
                Box::new(TauriWindowBackend::new(overlay.window, overlay.strip)),
                HotkeyManager::new(Box::new(TauriShortcutBackend::new(handle.clone(), events.clone()))),
                content,
                Box::new(store),
            )
            .with_app_version(app.package_info().version.to_string());

            spawn_control_loop(handle.clone(), controller, rx)?;
            services::updates::spawn_update_checker(&handle, &settings);
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

/// Owns the controller for the app's lifetime. Every state change goes
/// through this thread, in arrival order.
fn spawn_control_loop(
    app: tauri::AppHandle,
    mut controller: WindowController,
    mut rx: UnboundedReceiver<OverlayEvent>,
) -> std::io::Result<()> {
    std::thread::Builder::new()
        .name("overlay-control".to_string())
        .spawn(move || {
            controller.init();
            while let Some(event) = rx.blocking_recv() {
                if controller.handle(event) == Flow::Exit {
                    break;
                }
            }
            controller.shutdown();
            log::info!("Control loop finished; exiting");
            app.exit(0);
        })?;
    Ok(())
}
