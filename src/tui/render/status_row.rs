use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::app::App;

const HINTS: &str = "q quit  \u{2190}\u{2192} scroll  Tab project  yumwd snap  YUMWD hide  1-4 rows  g/t jump";

/// Render the status row (bottom of screen)
///
/// Shows, in order of precedence: the drag tooltip, the last save or
/// reload message, the first self-check warning, key hints.
pub fn render_status_row(frame: &mut Frame, app: &App, area: Rect) {
    let bg = Style::default().bg(app.theme.background);
    let width = usize::from(area.width);

    let (left, style) = if let Some(tooltip) = app.session.tooltip() {
        (tooltip.text, bg.fg(app.theme.highlight))
    } else if let Some(message) = &app.message {
        (message.clone(), bg.fg(app.theme.text))
    } else if let Some(first) = app.session.violations().first() {
        let more = app.session.violations().len() - 1;
        let text = if more > 0 {
            format!("{} (+{} more)", first, more)
        } else {
            first.clone()
        };
        (text, bg.fg(app.theme.warning))
    } else {
        (HINTS.to_string(), bg.fg(app.theme.dim))
    };

    let snap: Vec<String> = app.session.active().iter().map(|g| g.to_string()).collect();
    let right = format!("snap: {}", if snap.is_empty() { "off".to_string() } else { snap.join(",") });

    let left_width = left.chars().count();
    let right_width = right.chars().count();
    let mut spans = vec![Span::styled(format!(" {}", left), style)];
    if left_width + right_width + 3 < width {
        let padding = width - left_width - right_width - 2;
        spans.push(Span::styled(" ".repeat(padding), bg));
        spans.push(Span::styled(right, bg.fg(app.theme.dim)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)).style(bg), area);
}
