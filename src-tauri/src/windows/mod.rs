pub mod overlay_window;
