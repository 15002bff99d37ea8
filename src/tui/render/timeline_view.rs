use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use unicode_segmentation::UnicodeSegmentation;

use crate::timeline::grid::{BodyRow, Grid, HeaderRow};
use crate::tui::app::{App, TableLayout};
use crate::tui::theme::Theme;
use crate::util::unicode;

const FILLED: char = '\u{2588}';
const UNFILLED: char = '\u{2591}';
const RULE: char = '\u{2502}';

/// Maps terminal columns onto the table's px coordinates
struct Columns {
    px_per_cell: f64,
    width: usize,
    descriptor: f64,
    fixed_total: f64,
    scroll_x: f64,
    timeline_width: f64,
}

impl Columns {
    fn viewport_x(&self, col: usize) -> f64 {
        (col as f64 + 0.5) * self.px_per_cell
    }

    /// First column belonging to the timeline area
    fn timeline_start(&self) -> usize {
        (0..self.width)
            .find(|&c| self.viewport_x(c) >= self.fixed_total)
            .unwrap_or(self.width)
    }

    /// First column belonging to the progress column
    fn progress_start(&self) -> usize {
        (0..self.width)
            .find(|&c| self.viewport_x(c) >= self.descriptor)
            .unwrap_or(self.width)
    }

    /// Timeline content offset sampled by a timeline column
    fn content_x(&self, col: usize) -> Option<f64> {
        let x = self.scroll_x + self.viewport_x(col) - self.fixed_total;
        (x >= 0.0 && x < self.timeline_width).then_some(x)
    }
}

/// One terminal row under construction. A wide grapheme fills its first
/// cell and leaves the following cell empty.
struct Canvas {
    cells: Vec<(String, Style)>,
}

impl Canvas {
    fn new(width: usize, style: Style) -> Self {
        Canvas {
            cells: vec![(" ".to_string(), style); width],
        }
    }

    fn put(&mut self, col: usize, ch: char, style: Style) {
        if let Some(cell) = self.cells.get_mut(col) {
            *cell = (ch.to_string(), style);
        }
    }

    /// Write `text` from `col`, stopping before `end`
    fn put_str(&mut self, col: usize, end: usize, text: &str, style: Style) {
        let end = end.min(self.cells.len());
        if col >= end {
            return;
        }
        let mut at = col;
        for grapheme in unicode::clip_to_width(text, end - col).graphemes(true) {
            let width = unicode::display_width(grapheme);
            if at + width.max(1) > end {
                break;
            }
            self.cells[at] = (grapheme.to_string(), style);
            for skip in 1..width {
                self.cells[at + skip] = (String::new(), style);
            }
            at += width.max(1);
        }
    }

    fn into_line(self) -> Line<'static> {
        let mut spans: Vec<Span<'static>> = Vec::new();
        let mut run = String::new();
        let mut run_style: Option<Style> = None;
        for (text, style) in self.cells {
            if run_style.is_some_and(|s| s != style) {
                spans.push(Span::styled(std::mem::take(&mut run), run_style.unwrap_or_default()));
            }
            run_style = Some(style);
            run.push_str(&text);
        }
        if !run.is_empty() {
            spans.push(Span::styled(run, run_style.unwrap_or_default()));
        }
        Line::from(spans)
    }
}

/// Draw the timeline table and record its layout for mouse mapping
pub fn render_timeline_view(frame: &mut Frame, app: &mut App, area: Rect) {
    let px_per_cell = app.session.config().ui.px_per_cell.max(1.0);
    app.session
        .set_viewport_width(f64::from(area.width) * px_per_cell);

    let Some(grid) = app.session.grid() else {
        return;
    };

    let header: Vec<&HeaderRow> = grid.header.iter().filter(|r| !r.collapsed).collect();
    let visible_rows = usize::from(area.height).saturating_sub(header.len());
    app.row_scroll = app
        .row_scroll
        .min(grid.body.len().saturating_sub(visible_rows));

    app.layout = TableLayout {
        area,
        header: header.iter().map(|r| r.granularity).collect(),
        first_row: app.row_scroll,
        visible_rows,
        px_per_cell,
    };

    let cols = Columns {
        px_per_cell,
        width: usize::from(area.width),
        descriptor: grid.fixed.descriptor,
        fixed_total: grid.fixed.total(),
        scroll_x: app.session.viewport().scroll_x,
        timeline_width: grid.timeline_width,
    };
    let dragged = app.session.gesture().bar_drag().map(|d| d.row);
    let theme = &app.theme;

    let mut lines: Vec<Line> = Vec::new();
    let last_header = header.len().saturating_sub(1);
    for (i, row) in header.iter().enumerate() {
        lines.push(header_line(grid, row, &cols, theme, i == last_header));
    }
    for (i, body) in grid.body.iter().enumerate().skip(app.row_scroll).take(visible_rows) {
        lines.push(body_line(body, &cols, theme, dragged == Some(i)));
    }

    let paragraph = Paragraph::new(lines).style(Style::default().bg(theme.background));
    frame.render_widget(paragraph, area);
}

/// Vertical rules at the right edge of both leading columns
fn fixed_rules(canvas: &mut Canvas, cols: &Columns, style: Style) {
    let progress = cols.progress_start();
    let timeline = cols.timeline_start();
    if progress > 0 {
        canvas.put(progress - 1, RULE, style);
    }
    if timeline > 0 {
        canvas.put(timeline - 1, RULE, style);
    }
}

fn header_line(
    grid: &Grid,
    row: &HeaderRow,
    cols: &Columns,
    theme: &Theme,
    column_titles: bool,
) -> Line<'static> {
    let bg = Style::default().bg(theme.background);
    let rule = bg.fg(theme.grid_line);
    let label = bg.fg(theme.dim);
    let mut canvas = Canvas::new(cols.width, bg);

    let progress = cols.progress_start();
    let timeline = cols.timeline_start();
    if column_titles {
        canvas.put_str(0, progress.saturating_sub(1), "Title", label);
        canvas.put_str(progress, timeline.saturating_sub(1), "Progress", label);
    }
    fixed_rules(&mut canvas, cols, rule);

    // Walk the visible timeline columns, one run per header cell
    let mut col = timeline;
    while col < cols.width {
        let Some(x) = cols.content_x(col) else {
            col += 1;
            continue;
        };
        let Some(day) = grid.col_at_x(x) else {
            break;
        };
        let idx = row.cells.partition_point(|c| c.days.end <= day);
        let Some(cell) = row.cells.get(idx) else {
            break;
        };
        let mut end = col + 1;
        while end < cols.width
            && cols
                .content_x(end)
                .is_some_and(|x| x < cell.right())
        {
            end += 1;
        }
        // A cell scrolled partly out of view keeps its label but loses its rule
        let starts_here = col > timeline || cell.x >= cols.scroll_x;
        let text_col = if starts_here {
            canvas.put(col, RULE, rule);
            col + 1
        } else {
            col
        };
        canvas.put_str(text_col, end, &cell.label, bg.fg(theme.text));
        col = end;
    }

    canvas.into_line()
}

fn body_line(body: &BodyRow, cols: &Columns, theme: &Theme, dragged: bool) -> Line<'static> {
    let bg = Style::default().bg(theme.background);
    let mut canvas = Canvas::new(cols.width, bg);

    let progress = cols.progress_start();
    let timeline = cols.timeline_start();

    let mut title_style = bg.fg(theme.row_color(body.row.kind));
    if body.indent <= 1 {
        title_style = title_style.add_modifier(Modifier::BOLD);
    }
    let descriptor = format!("{}{}", "  ".repeat(body.indent), body.descriptor);
    canvas.put_str(
        0,
        progress.saturating_sub(1),
        &unicode::truncate_to_width(&descriptor, progress.saturating_sub(1)),
        title_style,
    );

    let label_width = unicode::display_width(&body.progress_label);
    let label_end = timeline.saturating_sub(2);
    if label_end >= progress + label_width {
        canvas.put_str(label_end - label_width, label_end, &body.progress_label, bg.fg(theme.text));
    }
    fixed_rules(&mut canvas, cols, bg.fg(theme.grid_line));

    if let Some(bar) = body.bar {
        let color = if dragged { theme.bar_active } else { theme.bar };
        for col in timeline..cols.width {
            let Some(x) = cols.content_x(col) else {
                continue;
            };
            if x < bar.x || x >= bar.right() {
                continue;
            }
            if x < bar.x + bar.fill {
                canvas.put(col, FILLED, bg.fg(theme.bar_done));
            } else {
                canvas.put(col, UNFILLED, bg.fg(color));
            }
        }
    }

    canvas.into_line()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::axis::Granularity;
    use crate::tui::render::test_helpers::*;

    fn chars(line: &str) -> Vec<char> {
        line.chars().collect()
    }

    #[test]
    fn header_rows_show_units_after_fixed_columns() {
        let mut app = app_with_project(sample_project());
        let output = render_app(&mut app, 120, 16);
        let lines: Vec<&str> = output.lines().collect();

        // Tab bar and separator, then Year .. Day
        assert!(lines[2].ends_with("\u{2502}2025"));
        assert!(lines[3].contains("\u{2502}Q1"));
        assert!(lines[4].contains("\u{2502}Jan"));
        assert!(lines[5].contains("\u{2502}W1"));
        assert!(lines[6].starts_with("Title"));
        assert!(lines[6].contains("Progress"));
        assert!(lines[6].contains("\u{2502}01   \u{2502}02"));
        let year = chars(lines[2]);
        assert_eq!(year[38], '\u{2502}');
    }

    #[test]
    fn task_bar_is_drawn_with_progress() {
        let mut app = app_with_project(sample_project());
        let output = render_app(&mut app, 120, 16);
        let lines: Vec<&str> = output.lines().collect();

        let task = chars(lines[10]);
        let text: String = task.iter().collect();
        assert!(text.starts_with("      1.1.1 Weld"));
        assert!(text.contains("40%"));
        assert_eq!(task[21], '\u{2502}');
        assert_eq!(task[37], '\u{2502}');
        // Bar covers content 300..600 px; 40% of it is filled
        assert!(task[68..80].iter().all(|&c| c == FILLED));
        assert!(task[80..98].iter().all(|&c| c == UNFILLED));
        assert_eq!(task.len(), 98);
    }

    #[test]
    fn collapsed_rows_are_skipped_and_layout_recorded() {
        let mut app = app_with_project(sample_project());
        app.session.toggle_collapsed(Granularity::Year);
        app.session.toggle_collapsed(Granularity::Quarter);
        let output = render_app(&mut app, 120, 16);
        let lines: Vec<&str> = output.lines().collect();

        assert!(lines[2].contains("\u{2502}Jan"));
        assert_eq!(
            app.layout.header,
            vec![Granularity::Month, Granularity::Week, Granularity::Day]
        );
        assert_eq!(app.layout.visible_rows, 13 - 3);
        assert!(lines[5].starts_with("Apollo"));
    }

    #[test]
    fn scrolled_view_keeps_sticky_labels() {
        let mut app = app_with_project(sample_project());
        app.session.set_view_start(Some(chrono::NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()));
        let output = render_app(&mut app, 120, 16);
        let lines: Vec<&str> = output.lines().collect();
        let year = chars(lines[2]);
        // Year cell began off-screen: label without a rule
        assert_eq!(year[38], '2');
        assert!(lines[6].contains("\u{2502}15   \u{2502}16"));
    }
}
