//! Terminal styling for messages printed before logging is up.

/// ANSI escape codes used for terminal output
pub struct Colors;

impl Colors {
    /// Reset all formatting
    pub const RESET: &'static str = "\x1b[0m";
    /// Bold text
    pub const BOLD: &'static str = "\x1b[1m";
    /// Red color
    pub const RED: &'static str = "\x1b[31m";
}

/// Formats error messages in bold red
pub fn format_error(text: &str) -> String {
    format!("{}{}{}{}", Colors::BOLD, Colors::RED, text, Colors::RESET)
}
