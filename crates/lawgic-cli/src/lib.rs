// Library interface for lawgic-cli so integration tests can reach the
// command parser and renderer. main.rs declares the same files, hence the
// path attributes.

#[path = "commands.rs"]
pub mod commands;

#[path = "render.rs"]
pub mod render;

#[path = "theme.rs"]
pub mod theme;

pub use commands::{handle_command, CommandResult};
pub use theme::Theme;
