use serde::Serialize;

use crate::model::Project;
use crate::timeline::axis::{Axis, Granularity, TimeUnit};
use crate::timeline::grid::{BodyRow, Grid};
use crate::timeline::rows::{DisplayRow, RowKind, RowSet, RowSource};
use crate::util::dates;
use crate::util::unicode::fit_to_width;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ProjectSummaryJson {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    pub milestones: usize,
    pub deliverables: usize,
    pub tasks: usize,
}

#[derive(Serialize)]
pub struct RowJson {
    pub numbering: String,
    pub kind: RowKind,
    pub title: String,
    pub level: u8,
    pub start: String,
    pub end: String,
    pub progress: u8,
}

#[derive(Serialize)]
pub struct RowsJson {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    pub source: RowSource,
    pub start: String,
    pub end: String,
    pub rows: Vec<RowJson>,
}

#[derive(Serialize)]
pub struct UnitJson {
    pub granularity: Granularity,
    pub key: String,
    pub label: String,
    pub anchor: String,
    pub first_day: usize,
    pub days: usize,
}

#[derive(Serialize)]
pub struct AxisJson {
    pub start: String,
    pub end: String,
    pub day_count: usize,
    pub units: Vec<UnitJson>,
}

#[derive(Serialize)]
pub struct CheckJson {
    pub ok: bool,
    pub violations: Vec<String>,
}

#[derive(Serialize)]
pub struct CommitJson {
    pub project: String,
    pub path: String,
    pub start: String,
    pub end: String,
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

pub fn project_summary_json(project: &Project) -> ProjectSummaryJson {
    let deliverables = project.milestones.iter().map(|m| m.deliverables.len()).sum();
    let tasks = project
        .milestones
        .iter()
        .flat_map(|m| &m.deliverables)
        .map(|d| d.tasks.len())
        .sum();
    ProjectSummaryJson {
        name: project.name.clone(),
        start: project.start.clone(),
        end: project.end.clone(),
        progress: project.progress,
        milestones: project.milestones.len(),
        deliverables,
        tasks,
    }
}

pub fn row_json(row: &DisplayRow) -> RowJson {
    RowJson {
        numbering: row.numbering.clone(),
        kind: row.kind,
        title: row.title.clone(),
        level: row.level,
        start: dates::format(row.start),
        end: dates::format(row.end),
        progress: row.progress,
    }
}

pub fn rows_json(project: Option<&Project>, axis: &Axis, rows: &RowSet) -> RowsJson {
    RowsJson {
        project: project.map(|p| p.name.clone()),
        source: rows.source,
        start: dates::format(axis.start),
        end: dates::format(axis.end),
        rows: rows.rows.iter().map(row_json).collect(),
    }
}

pub fn unit_json(unit: &TimeUnit) -> UnitJson {
    UnitJson {
        granularity: unit.granularity,
        key: unit.key.clone(),
        label: unit.label.clone(),
        anchor: dates::format(unit.anchor),
        first_day: unit.days.start,
        days: unit.day_count(),
    }
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

pub fn format_row_line(row: &DisplayRow) -> String {
    let indent = "  ".repeat(row.level as usize);
    let label = if row.numbering.is_empty() {
        row.title.clone()
    } else {
        format!("{} {}", row.numbering, row.title)
    };
    format!(
        "{}{}  {} .. {}  {}%",
        indent,
        label,
        dates::format(row.start),
        dates::format(row.end),
        row.progress
    )
}

pub fn format_unit_line(unit: &TimeUnit) -> String {
    format!(
        "{:<8} {:<22} {:<5} {}  {} day(s)",
        unit.granularity.to_string(),
        unit.key,
        unit.label,
        dates::format(unit.anchor),
        unit.day_count()
    )
}

/// Cells per day column in the text table
const DAY_CELLS: usize = 3;
const DESCRIPTOR_CELLS: usize = 30;
const PROGRESS_CELLS: usize = 6;

/// Lay a window of the grid out as plain text: one line per expanded header
/// row, then one line per body row. `first..first + count` selects the day
/// columns shown.
pub fn render_text(grid: &Grid, first: usize, count: usize) -> String {
    let first = first.min(grid.days.len());
    let last = (first + count).min(grid.days.len());
    let mut out = String::new();

    for row in grid.header.iter().filter(|r| !r.collapsed) {
        let mut line = " ".repeat(DESCRIPTOR_CELLS + PROGRESS_CELLS);
        for cell in &row.cells {
            let from = cell.days.start.max(first);
            let to = cell.days.end.min(last);
            if from >= to {
                continue;
            }
            let cells = (to - from) * DAY_CELLS;
            line.push_str(&fit_to_width(&format!("|{}", cell.label), cells));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }

    for body in &grid.body {
        let descriptor = format!("{}{}", "  ".repeat(body.indent), body.descriptor);
        out.push_str(&fit_to_width(&descriptor, DESCRIPTOR_CELLS));
        out.push_str(&format!("{:>w$} ", body.progress_label, w = PROGRESS_CELLS - 1));
        out.push_str(&bar_cells(body, first, last));
        let trimmed = out.trim_end().len();
        out.truncate(trimmed);
        out.push('\n');
    }
    out
}

/// Filled days are drawn solid, the rest of the bar shaded
fn bar_cells(body: &BodyRow, first: usize, last: usize) -> String {
    let mut line = String::new();
    let Some(bar) = body.bar else {
        return line;
    };
    let days = bar.end_col - bar.start_col + 1;
    let filled = if bar.width > 0.0 {
        (bar.fill / bar.width * days as f64).round() as usize
    } else {
        0
    };
    for col in first..last {
        let glyph = if col < bar.start_col || col > bar.end_col {
            ' '
        } else if col - bar.start_col < filled {
            '\u{2588}'
        } else {
            '\u{2591}'
        };
        for _ in 0..DAY_CELLS {
            line.push(glyph);
        }
    }
    line
}
