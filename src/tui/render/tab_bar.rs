use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::timeline::rows::RowKind;
use crate::tui::app::App;

/// Render the tab bar: one tab per project, with a separator line below
pub fn render_tab_bar(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1)])
        .split(area);

    let sep_cols = render_tabs(frame, app, chunks[0]);
    render_separator(frame, app, chunks[1], &sep_cols);
}

/// Render tabs and return the column of each separator character
fn render_tabs(frame: &mut Frame, app: &App, area: Rect) -> Vec<usize> {
    let bg_style = Style::default().bg(app.theme.background);
    let sep = Span::styled("\u{2502}", bg_style.fg(app.theme.dim));
    let mut spans: Vec<Span> = vec![
        Span::styled(" ", bg_style),
        Span::styled("\u{25B6}", bg_style.fg(app.theme.highlight)),
        Span::styled(" ", bg_style),
    ];
    let tabs: Vec<(String, Style)> = if app.projects.is_empty() {
        vec![("sample rows".into(), bg_style.fg(app.theme.dim))]
    } else {
        app.projects
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name.clone(), tab_style(app, app.selected == Some(i))))
            .collect()
    };

    let mut sep_cols = Vec::new();
    let mut col = 3;
    for (name, style) in tabs {
        sep_cols.push(col);
        spans.push(sep.clone());
        col += 1 + name.chars().count() + 2;
        spans.push(Span::styled(format!(" {} ", name), style));
    }
    sep_cols.push(col);
    spans.push(sep);

    frame.render_widget(Paragraph::new(Line::from(spans)).style(bg_style), area);
    sep_cols
}

/// Horizontal rule joined to the tab separators, with the row filter on the right
fn render_separator(frame: &mut Frame, app: &App, area: Rect, sep_cols: &[usize]) {
    let width = usize::from(area.width);
    let bg_style = Style::default().bg(app.theme.background);

    let filter = app.session.filter();
    let mut indicator = String::from("rows:");
    for (kind, letter) in [
        (RowKind::Project, 'P'),
        (RowKind::Milestone, 'M'),
        (RowKind::Deliverable, 'D'),
        (RowKind::Task, 'T'),
    ] {
        indicator.push(' ');
        indicator.push(if filter.shows(kind) { letter } else { '-' });
    }
    let indicator = format!(" {} ", indicator);
    let indicator_width = indicator.chars().count();

    let rule_width = if indicator_width + 4 < width {
        width - indicator_width - 1
    } else {
        width
    };
    let rule: String = (0..rule_width)
        .map(|c| if sep_cols.contains(&c) { '\u{2534}' } else { '\u{2500}' })
        .collect();

    let mut spans = vec![Span::styled(rule, bg_style.fg(app.theme.dim))];
    if rule_width < width {
        spans.push(Span::styled(indicator, bg_style.fg(app.theme.text)));
        spans.push(Span::styled("\u{2500}", bg_style.fg(app.theme.dim)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn tab_style(app: &App, is_current: bool) -> Style {
    if is_current {
        Style::default()
            .fg(app.theme.text_bright)
            .bg(app.theme.background)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(app.theme.text).bg(app.theme.background)
    }
}

#[cfg(test)]
mod tests {
    use crate::tui::render::test_helpers::*;

    #[test]
    fn tabs_list_projects() {
        let mut app = demo_app();
        let output = render_app(&mut app, 120, 10);
        let first = output.lines().next().unwrap_or_default();
        assert_eq!(
            first,
            " \u{25B6} \u{2502} Infrastructure Upgrade \u{2502} Customer Portal Development \u{2502}"
        );
    }

    #[test]
    fn separator_joins_tabs_and_shows_filter() {
        let mut app = demo_app();
        app.session.toggle_filter(crate::timeline::rows::RowKind::Task);
        let output = render_app(&mut app, 120, 10);
        let second: Vec<char> = output.lines().nth(1).unwrap_or_default().chars().collect();
        assert_eq!(second[3], '\u{2534}');
        let text: String = second.iter().collect();
        assert!(text.ends_with(" rows: P M D - \u{2500}"));
    }

    #[test]
    fn empty_store_shows_sample_tab() {
        let mut app = empty_app();
        let output = render_app(&mut app, 80, 10);
        assert!(output.lines().next().unwrap_or_default().contains("sample rows"));
    }
}
