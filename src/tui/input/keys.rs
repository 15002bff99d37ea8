use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::timeline::axis::Granularity;
use crate::timeline::rows::RowKind;
use crate::tui::app::App;

/// Handle a key press in the timeline view
pub fn handle_key(app: &mut App, key: KeyEvent) {
    // Ignore bare modifier key presses (Shift, Ctrl, Alt, etc.)
    if matches!(key.code, KeyCode::Modifier(_)) {
        return;
    }

    // Any key other than Esc is ignored while dragging
    if !app.session.gesture().is_idle() {
        if key.code == KeyCode::Esc && app.session.cancel() {
            app.message = Some("Drag cancelled".into());
        }
        return;
    }

    app.message = None;
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true
        }
        KeyCode::Left => scroll_page(app, -1.0),
        KeyCode::Right => scroll_page(app, 1.0),
        KeyCode::Up => app.row_scroll = app.row_scroll.saturating_sub(1),
        KeyCode::Down => app.row_scroll += 1,
        KeyCode::Tab => switch_project(app, 1),
        KeyCode::BackTab => switch_project(app, -1),
        KeyCode::Char(c) => {
            if let Some(g) = snap_key(c.to_ascii_lowercase()) {
                if c.is_ascii_uppercase() {
                    app.session.toggle_collapsed(g);
                } else {
                    app.session.toggle_active(g);
                }
            } else if let Some(kind) = filter_key(c) {
                app.session.toggle_filter(kind);
            } else {
                match c {
                    'g' => app.session.set_view_start(None),
                    't' => app.session.jump_to_today(),
                    _ => return,
                }
            }
            app.save_state();
        }
        _ => {}
    }
}

fn snap_key(c: char) -> Option<Granularity> {
    match c {
        'y' => Some(Granularity::Year),
        'u' => Some(Granularity::Quarter),
        'm' => Some(Granularity::Month),
        'w' => Some(Granularity::Week),
        'd' => Some(Granularity::Day),
        _ => None,
    }
}

fn filter_key(c: char) -> Option<RowKind> {
    match c {
        '1' => Some(RowKind::Project),
        '2' => Some(RowKind::Milestone),
        '3' => Some(RowKind::Deliverable),
        '4' => Some(RowKind::Task),
        _ => None,
    }
}

/// Scroll by a quarter of the visible timeline, at least one day column
fn scroll_page(app: &mut App, direction: f64) {
    let visible = app.session.viewport().width - app.session.fixed().total();
    let step = (visible / 4.0).max(app.session.config().timeline.default_column_width);
    app.session.scroll_by(direction * step);
}

fn switch_project(app: &mut App, step: isize) {
    app.next_project(step);
    app.save_state();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::render::test_helpers::*;

    fn press(app: &mut App, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    #[test]
    fn q_quits() {
        let mut app = demo_app();
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn arrows_scroll_a_quarter_page() {
        let mut app = app_with_project(sample_project());
        render_app(&mut app, 120, 16);
        press(&mut app, KeyCode::Right);
        // 1200 px viewport minus 380 px of leading columns
        assert_eq!(app.session.viewport().scroll_x, 205.0);
        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.session.viewport().scroll_x, 0.0);
    }

    #[test]
    fn tab_switches_project() {
        let mut app = demo_app();
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.selected, Some(1));
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.selected, Some(0));
    }

    #[test]
    fn letters_toggle_snap_and_collapse() {
        let mut app = demo_app();
        press(&mut app, KeyCode::Char('w'));
        assert!(app.session.active().contains(&Granularity::Week));
        press(&mut app, KeyCode::Char('d'));
        assert!(!app.session.active().contains(&Granularity::Day));
        press(&mut app, KeyCode::Char('Y'));
        assert!(app.session.collapsed().contains(&Granularity::Year));
        press(&mut app, KeyCode::Char('Y'));
        assert!(!app.session.collapsed().contains(&Granularity::Year));
    }

    #[test]
    fn digits_toggle_row_filters() {
        let mut app = demo_app();
        press(&mut app, KeyCode::Char('4'));
        assert!(!app.session.filter().tasks);
        press(&mut app, KeyCode::Char('2'));
        assert!(!app.session.filter().milestones);
        press(&mut app, KeyCode::Char('4'));
        assert!(app.session.filter().tasks);
    }

    #[test]
    fn g_and_t_move_the_view_start() {
        let mut app = app_with_project(sample_project());
        press(&mut app, KeyCode::Char('t'));
        assert!(app.session.view_start().is_some());
        press(&mut app, KeyCode::Char('g'));
        assert_eq!(app.session.view_start(), None);
        assert_eq!(app.session.viewport().scroll_x, 0.0);
    }
}
