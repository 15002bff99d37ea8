use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossterm::event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;

use crate::io::config_io;
use crate::io::state::{ViewState, read_view_state, write_view_state};
use crate::io::store::{GANTRY_DIR, JsonStore, MemoryStore, ProjectStore, discover_root};
use crate::io::watcher::StoreWatcher;
use crate::model::{GantryConfig, Project};
use crate::timeline::axis::Granularity;
use crate::timeline::{HitRow, Release, Session};

use super::input;
use super::render;
use super::theme::Theme;

/// Poll interval while a gesture may auto-scroll
const DRAG_TICK: Duration = Duration::from_millis(33);
/// Poll interval otherwise
const IDLE_TICK: Duration = Duration::from_millis(250);

/// Where the timeline table was drawn last frame; maps mouse cells back
/// to header rows, body rows and viewport px.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableLayout {
    pub area: Rect,
    /// Visible header rows, top to bottom
    pub header: Vec<Granularity>,
    /// Index of the first body row drawn
    pub first_row: usize,
    /// Number of body rows that fit
    pub visible_rows: usize,
    /// Horizontal px per terminal cell
    pub px_per_cell: f64,
}

impl TableLayout {
    /// Viewport x at the centre of terminal column `col`
    pub fn viewport_x(&self, col: u16) -> f64 {
        let rel = f64::from(col.saturating_sub(self.area.x));
        (rel + 0.5) * self.px_per_cell
    }

    /// Table band under terminal row `row`
    pub fn hit_row(&self, row: u16) -> Option<HitRow> {
        if row < self.area.y || row >= self.area.y + self.area.height {
            return None;
        }
        let rel = usize::from(row - self.area.y);
        if let Some(&g) = self.header.get(rel) {
            return Some(HitRow::Header(g));
        }
        let body = rel - self.header.len();
        (body < self.visible_rows).then_some(HitRow::Body(self.first_row + body))
    }
}

/// Main application state
pub struct App {
    pub session: Session,
    pub store: Box<dyn ProjectStore>,
    pub projects: Vec<Project>,
    /// Index into `projects` of the project shown; None when there are none
    pub selected: Option<usize>,
    /// None in demo mode; nothing is written to disk then
    pub gantry_dir: Option<PathBuf>,
    pub theme: Theme,
    pub should_quit: bool,
    /// Outcome of the last save or reload, shown in the status row
    pub message: Option<String>,
    /// Vertical scroll of the body rows
    pub row_scroll: usize,
    pub layout: TableLayout,
    /// An external change arrived mid-gesture; reload once idle
    pub reload_pending: bool,
}

impl App {
    pub fn new(
        config: GantryConfig,
        store: Box<dyn ProjectStore>,
        projects: Vec<Project>,
        gantry_dir: Option<PathBuf>,
    ) -> Self {
        let selected = if projects.is_empty() { None } else { Some(0) };
        let theme = Theme::from_config(&config.ui);
        let session = Session::new(config, selected.map(|i| &projects[i]));
        App {
            session,
            store,
            projects,
            selected,
            gantry_dir,
            theme,
            should_quit: false,
            message: None,
            row_scroll: 0,
            layout: TableLayout::default(),
            reload_pending: false,
        }
    }

    pub fn project_name(&self) -> Option<&str> {
        self.session.project().map(|p| p.name.as_str())
    }

    /// Show project `index` in a fresh session, carrying view settings over
    pub fn select_project(&mut self, index: usize) {
        let Some(project) = self.projects.get(index) else {
            return;
        };
        let mut state = self.session.view_state();
        state.view_start = None;
        state.project = Some(project.name.clone());
        self.session = Session::new(self.session.config().clone(), Some(project));
        self.session.apply_view_state(&state);
        self.selected = Some(index);
        self.row_scroll = 0;
        log::debug!("switched to project {:?}", project.name);
    }

    pub fn next_project(&mut self, step: isize) {
        let Some(current) = self.selected else {
            return;
        };
        let len = self.projects.len() as isize;
        let next = (current as isize + step).rem_euclid(len) as usize;
        if next != current {
            self.select_project(next);
        }
    }

    /// Re-read the store after an external edit. Deferred while a gesture
    /// is in progress so the drag is not pulled out from under the pointer.
    pub fn reload(&mut self) {
        if !self.session.gesture().is_idle() {
            self.reload_pending = true;
            return;
        }
        self.reload_pending = false;
        match self.store.load() {
            // Our own saves come back through the watcher too
            Ok(projects) if projects == self.projects => {}
            Ok(projects) => {
                self.adopt(projects);
                self.message = Some("Reloaded projects".into());
            }
            Err(e) => {
                log::warn!("reload failed: {}", e);
                self.message = Some(format!("reload failed: {}", e));
            }
        }
    }

    /// Replace the stored list, keeping the current project if it survives
    fn adopt(&mut self, projects: Vec<Project>) {
        let name = self.project_name().map(str::to_string);
        self.projects = projects;
        self.selected = name
            .as_deref()
            .and_then(|n| {
                self.projects
                    .iter()
                    .position(|p| p.name.to_lowercase() == n.to_lowercase())
            })
            .or(if self.projects.is_empty() { None } else { Some(0) });
        let project = self.selected.map(|i| &self.projects[i]);
        self.session.set_project(project);
    }

    /// Finish a pointer gesture and report what happened
    pub fn release(&mut self) {
        match self.session.pointer_up(self.store.as_mut()) {
            Ok(Release::Committed {
                entity,
                start,
                end,
                stored,
            }) => {
                self.projects = stored;
                self.message = Some(format!(
                    "Saved {} {} .. {}",
                    if entity.numbering().is_empty() {
                        "project".to_string()
                    } else {
                        entity.numbering()
                    },
                    start,
                    end
                ));
            }
            Ok(Release::ViewChanged) => self.save_state(),
            Ok(Release::Nothing) => {}
            Err(e) => {
                log::warn!("could not persist drag: {}", e);
                self.message = Some(format!("not saved: {}", e));
            }
        }
        if self.reload_pending {
            self.reload();
        }
    }

    /// Restore saved view state, including which project was shown
    pub fn restore_state(&mut self, state: &ViewState) {
        if let Some(index) = state.project.as_deref().and_then(|name| {
            let wanted = name.to_lowercase();
            self.projects
                .iter()
                .position(|p| p.name.to_lowercase() == wanted)
        }) {
            self.selected = Some(index);
            self.session.set_project(Some(&self.projects[index]));
        }
        self.session.apply_view_state(state);
    }

    pub fn save_state(&self) {
        let Some(dir) = &self.gantry_dir else {
            return;
        };
        if let Err(e) = write_view_state(dir, &self.session.view_state()) {
            log::warn!("could not save view state: {}", e);
        }
    }
}

/// The directory discovery starts from: `project_dir` if given, else the cwd
fn discovery_start(project_dir: Option<&str>) -> io::Result<PathBuf> {
    match project_dir {
        Some(dir) => std::fs::canonicalize(dir),
        None => std::env::current_dir(),
    }
}

/// Build the app over `gantry/` found from `start`
fn open_app(start: &Path) -> Result<App, Box<dyn std::error::Error>> {
    let dir = discover_root(start)?.join(GANTRY_DIR);
    let config = config_io::load_config_or_default(&dir);
    let store = JsonStore::new(&dir);
    let projects = store.load()?;
    let mut app = App::new(config, Box::new(store), projects, Some(dir.clone()));
    if let Some(state) = read_view_state(&dir) {
        app.restore_state(&state);
    }
    Ok(app)
}

/// Run the TUI application
pub fn run(project_dir: Option<&str>, demo: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = if demo {
        let store = MemoryStore::demo();
        let projects = store.load()?;
        App::new(GantryConfig::default(), Box::new(store), projects, None)
    } else {
        open_app(&discovery_start(project_dir)?)?
    };

    let watcher = match &app.gantry_dir {
        Some(dir) => match StoreWatcher::start(dir) {
            Ok(w) => Some(w),
            Err(e) => {
                log::warn!("not watching {}: {}", dir.display(), e);
                None
            }
        },
        None => None,
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    // Install panic hook to restore terminal on panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let result = run_event_loop(&mut terminal, &mut app, watcher.as_ref());

    app.save_state();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run_event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    watcher: Option<&StoreWatcher>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|frame| render::render(frame, app))?;

        let timeout = if app.session.gesture().scrolls() {
            DRAG_TICK
        } else {
            IDLE_TICK
        };
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key(app, key),
                Event::Mouse(mouse) => input::handle_mouse(app, mouse),
                _ => {}
            }
        }

        let now = Instant::now();
        app.session.tick(now - last_tick);
        last_tick = now;

        if watcher.is_some_and(StoreWatcher::poll) || app.reload_pending {
            app.reload();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_app() -> App {
        let store = MemoryStore::demo();
        let projects = store.load().unwrap();
        App::new(GantryConfig::default(), Box::new(store), projects, None)
    }

    #[test]
    fn starts_on_first_project() {
        let app = demo_app();
        assert_eq!(app.selected, Some(0));
        assert_eq!(app.project_name(), Some("Infrastructure Upgrade"));
    }

    #[test]
    fn project_cycling_wraps() {
        let mut app = demo_app();
        app.next_project(1);
        assert_eq!(app.project_name(), Some("Customer Portal Development"));
        app.next_project(1);
        assert_eq!(app.project_name(), Some("Infrastructure Upgrade"));
        app.next_project(-1);
        assert_eq!(app.project_name(), Some("Customer Portal Development"));
    }

    #[test]
    fn switching_keeps_view_settings() {
        let mut app = demo_app();
        app.session.toggle_filter(crate::timeline::rows::RowKind::Task);
        app.next_project(1);
        assert!(!app.session.filter().tasks);
    }

    #[test]
    fn empty_store_shows_sample_rows() {
        let app = App::new(
            GantryConfig::default(),
            Box::new(MemoryStore::default()),
            Vec::new(),
            None,
        );
        assert_eq!(app.selected, None);
        assert_eq!(
            app.session.rows().source,
            crate::timeline::rows::RowSource::Demo
        );
    }

    #[test]
    fn reload_keeps_selected_project_by_name() {
        let mut app = demo_app();
        app.next_project(1);
        let mut projects = app.store.load().unwrap();
        projects.reverse();
        app.adopt(projects);
        assert_eq!(app.selected, Some(0));
        assert_eq!(app.project_name(), Some("Customer Portal Development"));
    }

    #[test]
    fn restore_state_selects_saved_project() {
        let mut app = demo_app();
        let state = ViewState {
            project: Some("customer portal development".into()),
            collapsed: vec![Granularity::Year],
            ..Default::default()
        };
        app.restore_state(&state);
        assert_eq!(app.selected, Some(1));
        assert!(app.session.collapsed().contains(&Granularity::Year));
    }

    #[test]
    fn layout_maps_rows_and_columns() {
        let layout = TableLayout {
            area: Rect::new(0, 2, 100, 20),
            header: vec![Granularity::Month, Granularity::Day],
            first_row: 3,
            visible_rows: 10,
            px_per_cell: 10.0,
        };
        assert_eq!(layout.hit_row(1), None);
        assert_eq!(layout.hit_row(2), Some(HitRow::Header(Granularity::Month)));
        assert_eq!(layout.hit_row(3), Some(HitRow::Header(Granularity::Day)));
        assert_eq!(layout.hit_row(4), Some(HitRow::Body(3)));
        assert_eq!(layout.hit_row(14), None);
        assert_eq!(layout.viewport_x(0), 5.0);
        assert_eq!(layout.viewport_x(38), 385.0);
    }
}
