use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};

use crate::tui::app::App;

/// Columns scrolled per horizontal wheel notch
const WHEEL_CELLS: f64 = 3.0;

/// Translate terminal mouse events into pointer gestures on the table
pub fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let vx = app.layout.viewport_x(mouse.column);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let Some(row) = app.layout.hit_row(mouse.row) else {
                return;
            };
            if let Some(target) = app.session.target_at(vx, row) {
                app.message = None;
                app.session.pointer_down(target, vx);
            }
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            if !app.session.gesture().is_idle() {
                app.session.pointer_move(vx);
            }
        }
        MouseEventKind::Up(MouseButton::Left) => {
            if !app.session.gesture().is_idle() {
                app.release();
            }
        }
        MouseEventKind::ScrollDown => app.row_scroll += 1,
        MouseEventKind::ScrollUp => app.row_scroll = app.row_scroll.saturating_sub(1),
        MouseEventKind::ScrollRight => {
            app.session.scroll_by(WHEEL_CELLS * app.layout.px_per_cell)
        }
        MouseEventKind::ScrollLeft => {
            app.session.scroll_by(-WHEEL_CELLS * app.layout.px_per_cell)
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::interact::Gesture;
    use crate::tui::render::test_helpers::*;
    use crossterm::event::KeyModifiers;

    // Tab bar takes two rows and five header rows follow, so the task
    // (fourth body row) sits on terminal row 10.
    const TASK_ROW: u16 = 10;

    fn event(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn drag(app: &mut App, from: u16, to: u16, row: u16) {
        handle_mouse(app, event(MouseEventKind::Down(MouseButton::Left), from, row));
        handle_mouse(app, event(MouseEventKind::Drag(MouseButton::Left), to, row));
        handle_mouse(app, event(MouseEventKind::Up(MouseButton::Left), to, row));
    }

    #[test]
    fn dragging_a_bar_moves_and_saves_the_task() {
        let mut app = app_with_project(sample_project());
        render_app(&mut app, 120, 16);

        // Bar body spans terminal columns 68..98; 18 cells is 180 px, three days
        drag(&mut app, 80, 98, TASK_ROW);

        let stored = app.store.load().unwrap();
        let task = &stored[0].milestones[0].deliverables[0].tasks[0];
        assert_eq!(task.start.as_deref(), Some("2025-01-09"));
        assert_eq!(task.end.as_deref(), Some("2025-01-13"));
        assert_eq!(app.projects, stored);
        assert_eq!(
            app.message.as_deref(),
            Some("Saved 1.1.1 2025-01-09 .. 2025-01-13")
        );
    }

    #[test]
    fn tooltip_follows_the_drag() {
        let mut app = app_with_project(sample_project());
        render_app(&mut app, 120, 16);

        handle_mouse(&mut app, event(MouseEventKind::Down(MouseButton::Left), 80, TASK_ROW));
        handle_mouse(&mut app, event(MouseEventKind::Drag(MouseButton::Left), 86, TASK_ROW));
        assert!(matches!(app.session.gesture(), Gesture::BarMoving(_)));

        let output = render_app(&mut app, 120, 16);
        let status = output.lines().last().unwrap_or_default();
        assert!(status.starts_with(" Moving: 2025-01-07 to 2025-01-11"));
    }

    #[test]
    fn click_without_movement_saves_nothing() {
        let mut app = app_with_project(sample_project());
        render_app(&mut app, 120, 16);
        drag(&mut app, 80, 80, TASK_ROW);

        let stored = app.store.load().unwrap();
        assert_eq!(stored[0], sample_project());
        assert_eq!(app.message, None);
    }

    #[test]
    fn clicks_outside_the_table_are_ignored() {
        let mut app = app_with_project(sample_project());
        render_app(&mut app, 120, 16);
        handle_mouse(&mut app, event(MouseEventKind::Down(MouseButton::Left), 80, 0));
        assert!(app.session.gesture().is_idle());
    }

    #[test]
    fn wheel_scrolls_rows() {
        let mut app = app_with_project(sample_project());
        render_app(&mut app, 120, 16);
        handle_mouse(&mut app, event(MouseEventKind::ScrollDown, 50, TASK_ROW));
        assert_eq!(app.row_scroll, 1);
        handle_mouse(&mut app, event(MouseEventKind::ScrollUp, 50, TASK_ROW));
        handle_mouse(&mut app, event(MouseEventKind::ScrollUp, 50, TASK_ROW));
        assert_eq!(app.row_scroll, 0);
    }
}
