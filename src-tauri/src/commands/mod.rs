pub mod overlay_commands;
