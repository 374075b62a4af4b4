// src/services/mod.rs
pub mod config;
pub mod content;
pub mod events;
pub mod hotkeys;
pub mod positioner;
pub mod presets;
pub mod updates;
pub mod window_controller;

#[cfg(test)]
pub(crate) mod test_support;
