use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;

use crate::io::store::{MemoryStore, ProjectStore};
use crate::model::{Deliverable, GantryConfig, Milestone, Project, Task};
use crate::tui::app::App;

/// Render into an in-memory buffer and return plain text (no styles).
pub fn render_to_string<F>(w: u16, h: u16, f: F) -> String
where
    F: FnOnce(&mut ratatui::Frame, Rect),
{
    let backend = TestBackend::new(w, h);
    let mut terminal = Terminal::new(backend).unwrap();
    terminal
        .draw(|frame| {
            let area = frame.area();
            f(frame, area);
        })
        .unwrap();

    let buf = terminal.backend().buffer().clone();
    let w = buf.area.width as usize;
    let lines: Vec<String> = buf
        .content
        .chunks(w)
        .map(|row| {
            let s: String = row.iter().map(|cell| cell.symbol()).collect();
            s.trim_end().to_string()
        })
        .collect();

    // Trim trailing blank lines
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map_or(0, |i| i + 1);
    lines[..end].join("\n")
}

/// Full-screen render of `app`, which also records its table layout
pub fn render_app(app: &mut App, w: u16, h: u16) -> String {
    render_to_string(w, h, |frame, _| crate::tui::render::render(frame, app))
}

/// Apollo: one task, 2025-01-06..2025-01-10 at 40%, inside Q1 2025
pub fn sample_project() -> Project {
    Project {
        name: "Apollo".into(),
        start: Some("2025-01-01".into()),
        end: Some("2025-03-31".into()),
        milestones: vec![Milestone {
            title: "Build".into(),
            deliverables: vec![Deliverable {
                title: "Engine".into(),
                tasks: vec![Task {
                    title: "Weld".into(),
                    start: Some("2025-01-06".into()),
                    end: Some("2025-01-10".into()),
                    progress: 40,
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

/// App over an in-memory store holding just `project`
pub fn app_with_project(project: Project) -> App {
    let store = MemoryStore::new(vec![project.clone()]);
    App::new(GantryConfig::default(), Box::new(store), vec![project], None)
}

pub fn demo_app() -> App {
    let store = MemoryStore::demo();
    let projects = store.load().unwrap();
    App::new(GantryConfig::default(), Box::new(store), projects, None)
}

pub fn empty_app() -> App {
    App::new(
        GantryConfig::default(),
        Box::new(MemoryStore::default()),
        Vec::new(),
        None,
    )
}
