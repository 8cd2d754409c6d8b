//! Rendering of the summary aggregate.

mod console;
mod json;

use clap::ValueEnum;

pub use console::generate as generate_console;
pub use json::generate as generate_json;

/// When to emit ANSI colours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorMode {
    /// Colour when writing to a terminal
    #[default]
    Auto,
    Always,
    Never,
}
