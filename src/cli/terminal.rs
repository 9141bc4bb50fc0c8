//! Terminal capability detection and utilities

use std::io::IsTerminal;

use owo_colors::{colors::css, OwoColorize};

/// Detects whether colored output should be enabled
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Detects terminal width, returning None if not available
pub fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(w, _)| w.0)
}

/// Whether stderr is attached to a terminal, so progress bars are worth
/// drawing
pub fn is_interactive() -> bool {
    std::io::stderr().is_terminal()
}

/// Whether a table `width` columns wide fits the terminal.
///
/// Assumes it fits when the width is unknown.
pub fn fits(width: usize) -> bool {
    terminal_width().is_none_or(|w| usize::from(w) >= width)
}

/// Extension trait for colorizing output
///
/// Falls back to plain text when the terminal has no color support.
pub trait Colorize: AsRef<str> {
    /// Color as success (green)
    fn success(&self) -> String {
        paint(self.as_ref(), |s| s.fg::<css::Green>().to_string())
    }

    /// Color as warning (amber)
    fn warning(&self) -> String {
        paint(self.as_ref(), |s| s.fg::<css::Orange>().to_string())
    }

    /// Color as info (blue)
    fn info(&self) -> String {
        paint(self.as_ref(), |s| s.fg::<css::LightBlue>().to_string())
    }

    /// Dim the text
    fn dim(&self) -> String {
        paint(self.as_ref(), |s| s.dimmed().to_string())
    }

    /// Bold the text
    fn strong(&self) -> String {
        paint(self.as_ref(), |s| s.bold().to_string())
    }
}

impl<T: AsRef<str> + ?Sized> Colorize for T {}

fn paint(text: &str, style: impl FnOnce(&str) -> String) -> String {
    if supports_color() {
        style(text)
    } else {
        text.to_string()
    }
}
