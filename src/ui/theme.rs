//! Theme configuration for the TUI.
//!
//! Supports light and dark themes, chosen explicitly or detected from the
//! terminal background.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::{Rgb, UsageLevel};

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Whether this is the dark variant.
    pub dark: bool,
    /// Accent color for highlights and active elements.
    pub highlight: Color,
    /// Color for usage in the warning band.
    pub warning: Color,
    /// Color for usage in the critical band.
    pub critical: Color,
    /// Color for normal usage and the connected indicator.
    pub healthy: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Color for axis labels and secondary text.
    pub muted: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for selected/highlighted rows.
    pub selected: Style,
    /// Style for the active tab.
    pub tab_active: Style,
    /// Style for inactive tabs.
    pub tab_inactive: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            dark: true,
            highlight: Color::Cyan,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::Gray,
            muted: Color::DarkGray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            dark: false,
            highlight: Color::Blue,
            warning: Color::Rgb(0xb4, 0x53, 0x09),
            critical: Color::Red,
            healthy: Color::Green,
            border: Color::DarkGray,
            muted: Color::Gray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Theme for a saved preference; `None` detects.
    pub fn for_preference(dark_mode: Option<bool>) -> Self {
        match dark_mode {
            Some(true) => Self::dark(),
            Some(false) => Self::light(),
            None => Self::auto_detect(),
        }
    }

    /// The other variant.
    pub fn toggled(&self) -> Self {
        if self.dark {
            Self::light()
        } else {
            Self::dark()
        }
    }

    /// Style for a usage percentage.
    pub fn usage_style(&self, percent: f64) -> Style {
        match UsageLevel::of(percent) {
            UsageLevel::Normal => Style::default().fg(self.healthy),
            UsageLevel::Warning => Style::default().fg(self.warning),
            UsageLevel::Critical => Style::default().fg(self.critical).add_modifier(Modifier::BOLD),
        }
    }
}

/// Convert a chart color into a terminal color.
pub fn rgb(color: Rgb) -> Color {
    Color::Rgb(color.0, color.1, color.2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_selects_variant() {
        assert!(Theme::for_preference(Some(true)).dark);
        assert!(!Theme::for_preference(Some(false)).dark);
        assert!(!Theme::dark().toggled().dark);
    }

    #[test]
    fn test_usage_style_bands() {
        let theme = Theme::dark();
        assert_eq!(theme.usage_style(10.0).fg, Some(theme.healthy));
        assert_eq!(theme.usage_style(75.0).fg, Some(theme.warning));
        assert_eq!(theme.usage_style(95.0).fg, Some(theme.critical));
    }
}
