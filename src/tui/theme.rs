use ratatui::style::Color;

use crate::model::UiConfig;
use crate::timeline::rows::RowKind;

/// Parsed color theme for the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    pub text_bright: Color,
    pub highlight: Color,
    pub dim: Color,
    pub red: Color,
    pub warning: Color,
    /// Unfilled part of a bar
    pub bar: Color,
    /// Filled (progress) part of a bar
    pub bar_done: Color,
    /// Bar being dragged
    pub bar_active: Color,
    pub grid_line: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            background: Color::Rgb(0x0C, 0x00, 0x1B),
            text: Color::Rgb(0xB0, 0xAA, 0xFF),
            text_bright: Color::Rgb(0xFF, 0xFF, 0xFF),
            highlight: Color::Rgb(0xFB, 0x41, 0x96),
            dim: Color::Rgb(0x7D, 0x78, 0xBF),
            red: Color::Rgb(0xFF, 0x44, 0x44),
            warning: Color::Rgb(0xFF, 0xD7, 0x00),
            bar: Color::Rgb(0x44, 0x88, 0xFF),
            bar_done: Color::Rgb(0x44, 0xFF, 0x88),
            bar_active: Color::Rgb(0xCC, 0x66, 0xFF),
            grid_line: Color::Rgb(0x3D, 0x14, 0x38),
        }
    }
}

/// Parse a hex color string like "#FF4444" into an RGB Color
fn parse_hex_color(hex: &str) -> Option<Color> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Color::Rgb(r, g, b))
}

impl Theme {
    /// Create a theme from `[ui.colors]`, falling back to defaults
    pub fn from_config(ui: &UiConfig) -> Self {
        let mut theme = Theme::default();

        for (key, value) in &ui.colors {
            let Some(color) = parse_hex_color(value) else {
                log::debug!("ignoring invalid color {:?} for {}", value, key);
                continue;
            };
            match key.as_str() {
                "background" => theme.background = color,
                "text" => theme.text = color,
                "text_bright" => theme.text_bright = color,
                "highlight" => theme.highlight = color,
                "dim" => theme.dim = color,
                "red" => theme.red = color,
                "warning" => theme.warning = color,
                "bar" => theme.bar = color,
                "bar_done" => theme.bar_done = color,
                "bar_active" => theme.bar_active = color,
                "grid_line" => theme.grid_line = color,
                _ => {}
            }
        }

        theme
    }

    /// Descriptor color by row kind; summary rows stand out
    pub fn row_color(&self, kind: RowKind) -> Color {
        match kind {
            RowKind::Project => self.text_bright,
            RowKind::Milestone => self.highlight,
            RowKind::Deliverable | RowKind::Task => self.text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(
            parse_hex_color("#FF4444"),
            Some(Color::Rgb(0xFF, 0x44, 0x44))
        );
        assert_eq!(parse_hex_color("FF4444"), None);
        assert_eq!(parse_hex_color("#FF44"), None);
        assert_eq!(parse_hex_color("#ZZZZZZ"), None);
    }

    #[test]
    fn test_from_config_overrides() {
        let mut ui = UiConfig::default();
        ui.colors.insert("bar".into(), "#112233".into());
        ui.colors.insert("text".into(), "not a color".into());

        let theme = Theme::from_config(&ui);
        assert_eq!(theme.bar, Color::Rgb(0x11, 0x22, 0x33));
        assert_eq!(theme.text, Theme::default().text);
    }

    #[test]
    fn test_row_color() {
        let theme = Theme::default();
        assert_eq!(theme.row_color(RowKind::Project), theme.text_bright);
        assert_eq!(theme.row_color(RowKind::Task), theme.text);
    }
}
