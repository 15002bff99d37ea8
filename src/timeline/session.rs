use std::collections::BTreeSet;
use std::time::Duration;

use chrono::NaiveDate;

use crate::io::state::ViewState;
use crate::io::store::{ProjectStore, StoreError};
use crate::model::{EntityPath, GantryConfig, Project};
use crate::util::dates;

use super::axis::{Axis, Granularity};
use super::baseline::{Baseline, resolve_baseline};
use super::grid::{BarPart, Grid, GridLayout, PointerTarget, build_grid};
use super::interact::{self, BarDrag, Gesture, Tooltip};
use super::qa::{QaContext, self_check};
use super::rows::{RowFilter, RowKind, RowSet, build_rows, commit_dates, resolve_dates};
use super::widths::{ColumnWidths, FixedWidths};

/// Horizontal extent of the view the grid is materialized into, in px
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Full width including the leading columns
    pub width: f64,
    /// Horizontal scroll of the timeline area
    pub scroll_x: f64,
}

/// Which band of the table a pointer is over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitRow {
    Header(Granularity),
    Body(usize),
}

/// Outcome of releasing the pointer
#[derive(Debug, Clone, PartialEq)]
pub enum Release {
    /// No gesture, or a drag that ended where it began
    Nothing,
    /// Column widths changed; nothing to persist
    ViewChanged,
    /// New dates were written to the entity and upserted
    Committed {
        entity: EntityPath,
        start: NaiveDate,
        end: NaiveDate,
        stored: Vec<Project>,
    },
}

/// Raw dates of the dragged entity before the gesture, for cancel
type RawDates = (EntityPath, Option<String>, Option<String>);

/// One mounted timeline view: the working project copy plus all view and
/// gesture state. Every render rebuilds the derived state wholesale.
pub struct Session {
    config: GantryConfig,
    project: Option<Project>,
    today: NaiveDate,
    filter: RowFilter,
    view_start: Option<NaiveDate>,
    active: BTreeSet<Granularity>,
    collapsed: BTreeSet<Granularity>,
    widths: ColumnWidths,
    fixed: FixedWidths,
    gesture: Gesture,
    restore: Option<RawDates>,
    /// Grid as laid out when a bar was grabbed. Handle dates resolve
    /// against it so a drag that moves the span does not move its own axis.
    drag_grid: Option<Grid>,
    pointer_x: Option<f64>,
    viewport: Viewport,
    baseline: Baseline,
    axis: Axis,
    rows: RowSet,
    grid: Option<Grid>,
    violations: Vec<String>,
}

impl Session {
    /// Mount a session over a deep copy of `project` (None shows the demo)
    pub fn new(config: GantryConfig, project: Option<&Project>) -> Self {
        Self::with_today(config, project, dates::today())
    }

    pub fn with_today(config: GantryConfig, project: Option<&Project>, today: NaiveDate) -> Self {
        let project = project.cloned();
        let baseline = resolve_baseline(project.as_ref(), None, today, config.timeline.baseline_years);
        let widths = ColumnWidths::from_config(&config.timeline);
        let fixed = FixedWidths::from_config(&config.timeline);
        let mut session = Session {
            active: config.timeline.snap.iter().copied().collect(),
            viewport: Viewport {
                width: fixed.total() + 20.0 * config.timeline.default_column_width,
                scroll_x: 0.0,
            },
            config,
            project,
            today,
            filter: RowFilter::default(),
            view_start: None,
            collapsed: BTreeSet::new(),
            widths,
            fixed,
            gesture: Gesture::Idle,
            restore: None,
            drag_grid: None,
            pointer_x: None,
            baseline,
            axis: Axis::generate(baseline.project_start, baseline.project_end),
            rows: RowSet {
                source: super::rows::RowSource::Demo,
                rows: Vec::new(),
            },
            grid: None,
            violations: Vec::new(),
        };
        session.render();
        session
    }

    // -------------------------------------------------------------------------
    // Render
    // -------------------------------------------------------------------------

    /// Rebuild baseline, axis, rows and grid, anchor the view at the view
    /// start and run the structural self-check.
    pub fn render(&mut self) {
        self.rebuild();
        if let Some(grid) = &self.grid {
            self.viewport.scroll_x = grid.view_anchor_x.min(grid.max_scroll());
        }
        self.violations = self_check(
            self.grid.as_ref(),
            QaContext {
                active: &self.active,
                scroll_x: Some(self.viewport.scroll_x),
            },
        );
    }

    /// Rebuild without moving the view, used while a gesture is live
    fn rebuild(&mut self) {
        self.baseline = resolve_baseline(
            self.project.as_ref(),
            self.view_start,
            self.today,
            self.config.timeline.baseline_years,
        );
        self.axis = Axis::generate(self.baseline.project_start, self.baseline.project_end);
        self.rows = build_rows(self.project.as_ref(), &self.baseline, self.filter);
        let grid = build_grid(
            &self.baseline,
            &self.axis,
            &self.rows,
            &self.widths,
            GridLayout {
                fixed: self.fixed,
                handle_width: self.config.timeline.handle_width,
                collapsed: &self.collapsed,
            },
        );
        self.viewport.scroll_x = self.viewport.scroll_x.clamp(0.0, grid.max_scroll());
        self.grid = Some(grid);
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn rows(&self) -> &RowSet {
        &self.rows
    }

    pub fn axis(&self) -> &Axis {
        &self.axis
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    /// QA violations from the last render
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn config(&self) -> &GantryConfig {
        &self.config
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn filter(&self) -> RowFilter {
        self.filter
    }

    pub fn active(&self) -> &BTreeSet<Granularity> {
        &self.active
    }

    pub fn collapsed(&self) -> &BTreeSet<Granularity> {
        &self.collapsed
    }

    pub fn widths(&self) -> &ColumnWidths {
        &self.widths
    }

    pub fn fixed(&self) -> FixedWidths {
        self.fixed
    }

    pub fn view_start(&self) -> Option<NaiveDate> {
        self.view_start
    }

    pub fn tooltip(&self) -> Option<Tooltip> {
        interact::tooltip_for(&self.gesture)
    }

    // -------------------------------------------------------------------------
    // View changes
    // -------------------------------------------------------------------------

    /// Replace the working copy, e.g. after switching projects or an
    /// external edit. Any gesture in progress is dropped.
    pub fn set_project(&mut self, project: Option<&Project>) {
        self.project = project.cloned();
        self.gesture = Gesture::Idle;
        self.restore = None;
        self.drag_grid = None;
        self.render();
    }

    pub fn set_view_start(&mut self, view_start: Option<NaiveDate>) {
        self.view_start = view_start;
        self.render();
    }

    /// View start = today
    pub fn jump_to_today(&mut self) {
        self.set_view_start(Some(self.today));
    }

    pub fn set_filter(&mut self, filter: RowFilter) {
        self.filter = filter;
        self.render();
    }

    pub fn toggle_filter(&mut self, kind: RowKind) {
        self.filter.toggle(kind);
        self.render();
    }

    /// Toggle a granularity in the active (snap) set
    pub fn toggle_active(&mut self, g: Granularity) {
        if !self.active.remove(&g) {
            self.active.insert(g);
        }
        self.render();
    }

    /// Collapse or expand a header row
    pub fn toggle_collapsed(&mut self, g: Granularity) {
        if !self.collapsed.remove(&g) {
            self.collapsed.insert(g);
        }
        self.render();
    }

    pub fn set_viewport_width(&mut self, width: f64) {
        self.viewport.width = width.max(self.fixed.total());
    }

    pub fn scroll_to(&mut self, x: f64) {
        let max = self.grid.as_ref().map_or(0.0, Grid::max_scroll);
        self.viewport.scroll_x = x.clamp(0.0, max);
    }

    pub fn scroll_by(&mut self, dx: f64) {
        self.scroll_to(self.viewport.scroll_x + dx);
    }

    // -------------------------------------------------------------------------
    // Coordinates and hit testing
    // -------------------------------------------------------------------------

    /// Viewport x where the timeline area begins
    pub fn timeline_left(&self) -> f64 {
        self.fixed.total()
    }

    /// Timeline content offset under viewport x
    pub fn content_x(&self, vx: f64) -> f64 {
        self.viewport.scroll_x + vx - self.timeline_left()
    }

    /// What a press at viewport x in `row` would grab
    pub fn target_at(&self, vx: f64, row: HitRow) -> Option<PointerTarget> {
        let grid = self.grid.as_ref()?;
        if let Some(fixed) = grid.hit_fixed(vx) {
            return Some(fixed);
        }
        if vx < self.timeline_left() {
            return None;
        }
        let x = self.content_x(vx);
        match row {
            HitRow::Header(g) => grid.hit_header(g, x),
            HitRow::Body(i) => grid.hit_bar(i, x),
        }
    }

    // -------------------------------------------------------------------------
    // Pointer gestures
    // -------------------------------------------------------------------------

    /// Start a gesture. Returns false when nothing was grabbed.
    pub fn pointer_down(&mut self, target: PointerTarget, vx: f64) -> bool {
        if !self.gesture.is_idle() {
            return false;
        }
        let Some(grid) = self.grid.as_ref() else {
            return false;
        };

        let gesture = match target {
            PointerTarget::HeaderResize { granularity, cell } => {
                let Some(unit) = self.axis.units(granularity).get(cell) else {
                    return false;
                };
                Gesture::ColumnResizing {
                    granularity,
                    key: unit.key.clone(),
                    origin_x: self.content_x(vx),
                    starting: self.widths.snapshot(&self.axis, unit),
                }
            }
            PointerTarget::FixedResize { column } => Gesture::FixedColumnResizing {
                column,
                origin_x: vx,
                starting: self.fixed.get(column),
            },
            PointerTarget::Bar { row, part } => {
                let Some(body) = grid.body.get(row) else {
                    return false;
                };
                let (Some(entity), Some(bar)) = (body.row.entity, body.bar) else {
                    log::debug!("row {} has no draggable source entity", row);
                    return false;
                };
                let drag = BarDrag {
                    row,
                    entity,
                    origin_x: self.content_x(vx),
                    edge_x: match part {
                        BarPart::RightHandle => bar.right(),
                        _ => bar.x,
                    },
                    day_width: grid
                        .day_width_at(body.row.start)
                        .unwrap_or(self.widths.default_width()),
                    orig_start: body.row.start,
                    orig_end: body.row.end,
                    start: body.row.start,
                    end: body.row.end,
                };
                self.restore = self.project.as_ref().and_then(|p| {
                    let (start, end) = p.dates_at(entity)?;
                    Some((entity, start.map(String::from), end.map(String::from)))
                });
                self.drag_grid = Some(grid.clone());
                match part {
                    BarPart::Body => Gesture::BarMoving(drag),
                    BarPart::LeftHandle => Gesture::BarResizingLeft(drag),
                    BarPart::RightHandle => Gesture::BarResizingRight(drag),
                }
            }
        };

        log::debug!("gesture start: {}", gesture.name());
        self.pointer_x = Some(vx);
        self.gesture = gesture;
        true
    }

    /// Track the pointer during a gesture
    pub fn pointer_move(&mut self, vx: f64) {
        self.pointer_x = Some(vx);
        let mut gesture = std::mem::take(&mut self.gesture);
        match &mut gesture {
            Gesture::Idle => {}
            Gesture::ColumnResizing {
                origin_x, starting, ..
            } => {
                let dx = self.content_x(vx) - *origin_x;
                self.widths.resize_proportional(starting, dx);
                self.rebuild();
            }
            Gesture::FixedColumnResizing {
                column,
                origin_x,
                starting,
            } => {
                self.fixed.set(*column, *starting + vx - *origin_x);
                self.rebuild();
            }
            Gesture::BarMoving(drag) => {
                let days = interact::drag_days(self.content_x(vx) - drag.origin_x, drag.day_width);
                (drag.start, drag.end) = interact::moved(drag.orig_start, drag.orig_end, days);
                self.apply_drag(drag);
            }
            Gesture::BarResizingLeft(drag) => {
                let edge = drag.edge_x + self.content_x(vx) - drag.origin_x;
                if let Some(date) = self.handle_grid().and_then(|g| g.date_at_x(edge)) {
                    let snap = interact::snap_granularity(&self.active);
                    drag.start = interact::resize_start(date, drag.orig_end, snap);
                    drag.end = drag.orig_end;
                    self.apply_drag(drag);
                }
            }
            Gesture::BarResizingRight(drag) => {
                let edge = drag.edge_x + self.content_x(vx) - drag.origin_x;
                // The right edge belongs to the column on its left
                if let Some(date) = self.handle_grid().and_then(|g| g.date_at_x(edge - 0.5)) {
                    let snap = interact::snap_granularity(&self.active);
                    drag.end = interact::resize_end(date, drag.orig_start, snap);
                    drag.start = drag.orig_start;
                    self.apply_drag(drag);
                }
            }
        }
        self.gesture = gesture;
    }

    fn handle_grid(&self) -> Option<&Grid> {
        self.drag_grid.as_ref().or(self.grid.as_ref())
    }

    /// Write the live drag dates into the working copy and relayout
    fn apply_drag(&mut self, drag: &BarDrag) {
        if let Some(project) = self.project.as_mut() {
            commit_dates(project, drag.entity, drag.start, drag.end);
        }
        self.rebuild();
    }

    /// End the gesture. A changed bar is committed to the working copy and
    /// re-rendered before the store is asked to persist it, so a store
    /// failure never loses the local edit.
    pub fn pointer_up(&mut self, store: &mut dyn ProjectStore) -> Result<Release, StoreError> {
        self.pointer_x = None;
        self.drag_grid = None;
        let gesture = std::mem::take(&mut self.gesture);
        log::debug!("gesture end: {}", gesture.name());

        match gesture {
            Gesture::Idle => Ok(Release::Nothing),
            Gesture::ColumnResizing { .. } | Gesture::FixedColumnResizing { .. } => {
                self.render();
                Ok(Release::ViewChanged)
            }
            Gesture::BarMoving(drag)
            | Gesture::BarResizingLeft(drag)
            | Gesture::BarResizingRight(drag) => {
                if !drag.changed() {
                    self.restore_dates();
                    self.render();
                    return Ok(Release::Nothing);
                }
                self.restore = None;
                self.commit(drag.entity, drag.start, drag.end, store)
            }
        }
    }

    /// Write new dates for `entity` into the working copy, re-render, then
    /// upsert the project. A completed drag ends here, as do direct edits.
    pub fn commit(
        &mut self,
        entity: EntityPath,
        start: NaiveDate,
        end: NaiveDate,
        store: &mut dyn ProjectStore,
    ) -> Result<Release, StoreError> {
        let Some(project) = self.project.as_mut() else {
            return Ok(Release::Nothing);
        };
        if !commit_dates(project, entity, start, end) {
            return Ok(Release::Nothing);
        }
        let (start, end) = (start.min(end), end.max(start));
        log::info!(
            "committed {:?} {} to {}",
            entity.numbering(),
            dates::format(start),
            dates::format(end)
        );
        let snapshot = project.clone();
        self.render();
        let stored = store.upsert(&snapshot)?;
        Ok(Release::Committed {
            entity,
            start,
            end,
            stored,
        })
    }

    /// Effective dates of an entity, with missing or malformed ends
    /// inherited from the span
    pub fn entity_dates(&self, entity: EntityPath) -> Option<(NaiveDate, NaiveDate)> {
        let (start, end) = self.project.as_ref()?.dates_at(entity)?;
        Some(resolve_dates(
            start,
            end,
            (self.baseline.project_start, self.baseline.project_end),
        ))
    }

    /// Abandon the gesture, restoring the dates or widths it changed.
    /// Returns false when no gesture was active.
    pub fn cancel(&mut self) -> bool {
        self.pointer_x = None;
        self.drag_grid = None;
        match std::mem::take(&mut self.gesture) {
            Gesture::Idle => return false,
            Gesture::ColumnResizing { starting, .. } => {
                self.widths.resize_proportional(&starting, 0.0);
            }
            Gesture::FixedColumnResizing {
                column, starting, ..
            } => {
                self.fixed.set(column, starting);
            }
            Gesture::BarMoving(_) | Gesture::BarResizingLeft(_) | Gesture::BarResizingRight(_) => {
                self.restore_dates();
            }
        }
        log::debug!("gesture cancelled");
        self.rebuild();
        true
    }

    fn restore_dates(&mut self) {
        let Some((entity, start, end)) = self.restore.take() else {
            return;
        };
        if let Some(fields) = self.project.as_mut().and_then(|p| p.dates_at_mut(entity)) {
            *fields.start = start;
            *fields.end = end;
        }
    }

    /// Advance auto-scroll by `dt`. Returns true if the view scrolled.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let Some(vx) = self.pointer_x else {
            return false;
        };
        if !self.gesture.scrolls() {
            return false;
        }
        let velocity = interact::autoscroll_velocity(
            vx,
            self.timeline_left(),
            self.viewport.width,
            self.config.autoscroll.threshold,
            self.config.autoscroll.max_speed,
        );
        if velocity == 0.0 {
            return false;
        }
        let before = self.viewport.scroll_x;
        self.scroll_by(velocity * dt.as_secs_f64());
        if self.viewport.scroll_x == before {
            return false;
        }
        // Content moved under a stationary pointer
        self.pointer_move(vx);
        true
    }

    // -------------------------------------------------------------------------
    // Persistence of view state
    // -------------------------------------------------------------------------

    pub fn view_state(&self) -> ViewState {
        ViewState {
            project: self.project.as_ref().map(|p| p.name.clone()),
            filter: Some(self.filter),
            view_start: self.view_start.map(dates::format),
            active: Some(self.active.iter().copied().collect()),
            collapsed: self.collapsed.iter().copied().collect(),
            widths: self.widths.overrides().clone(),
            fixed: Some(self.fixed),
        }
    }

    /// Restore saved view state and re-render
    pub fn apply_view_state(&mut self, state: &ViewState) {
        if let Some(filter) = state.filter {
            self.filter = filter;
        }
        self.view_start = dates::parse_opt(state.view_start.as_deref());
        if let Some(active) = &state.active {
            self.active = active.iter().copied().collect();
        }
        self.collapsed = state.collapsed.iter().copied().collect();
        self.widths.load_overrides(state.widths.clone());
        if let Some(fixed) = state.fixed {
            self.fixed = fixed;
            self.fixed.clamp();
        }
        self.render();
    }
}
