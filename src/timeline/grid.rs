use std::collections::BTreeSet;
use std::ops::Range;

use chrono::NaiveDate;
use serde::Serialize;

use super::axis::{Axis, Granularity};
use super::baseline::Baseline;
use super::rows::{DisplayRow, RowSet, RowSource};
use super::widths::{ColumnWidths, FixedColumn, FixedWidths};

/// Number of date rows in the header
pub const HEADER_ROWS: usize = 5;
/// Number of leading (descriptor + progress) columns
pub const FIXED_COLUMNS: usize = 2;

/// The merged top-left header cell above the leading columns
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Corner {
    pub row_span: usize,
    pub col_span: usize,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderCell {
    pub key: String,
    pub label: String,
    /// Day columns this cell is merged across
    pub days: Range<usize>,
    /// Offset from the timeline origin
    pub x: f64,
    pub width: f64,
}

impl HeaderCell {
    pub fn col_span(&self) -> usize {
        self.days.len()
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderRow {
    pub granularity: Granularity,
    /// Collapsed rows keep their cells but are not materialized
    pub collapsed: bool,
    pub cells: Vec<HeaderCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayColumn {
    pub key: String,
    pub date: NaiveDate,
    pub x: f64,
    pub width: f64,
}

/// The bar drawn across a body row's day cells
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bar {
    pub start_col: usize,
    pub end_col: usize,
    pub x: f64,
    pub width: f64,
    /// Width of the progress overlay
    pub fill: f64,
    /// The row starts before the span and was clamped
    pub clipped_start: bool,
    /// The row ends after the span and was clamped
    pub clipped_end: bool,
}

impl Bar {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BodyRow {
    pub row: DisplayRow,
    /// Numbering prefix and title, e.g. `"2.1 Network plan"`
    pub descriptor: String,
    pub indent: usize,
    pub progress_label: String,
    pub bar: Option<Bar>,
}

/// Which part of a bar a press landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BarPart {
    Body,
    LeftHandle,
    RightHandle,
}

/// Something a pointer press can start a gesture on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "target", rename_all = "snake_case")]
pub enum PointerTarget {
    /// Resize affordance at the right edge of a header cell
    HeaderResize { granularity: Granularity, cell: usize },
    /// Resize affordance at the right edge of a leading column
    FixedResize { column: FixedColumn },
    Bar { row: usize, part: BarPart },
}

/// Render-ready description of the whole timeline table.
///
/// Day-column and bar offsets are relative to the timeline origin, i.e. the
/// left edge of the first day column. Leading-column offsets are relative to
/// the left edge of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Grid {
    pub source: RowSource,
    pub span: (NaiveDate, NaiveDate),
    pub corner: Corner,
    pub fixed: FixedWidths,
    pub header: Vec<HeaderRow>,
    pub days: Vec<DayColumn>,
    pub body: Vec<BodyRow>,
    pub timeline_width: f64,
    /// Offset of the (clamped) view start day column
    pub view_anchor_x: f64,
    pub handle_width: f64,
}

/// View-side inputs to a grid build
#[derive(Debug, Clone, Copy)]
pub struct GridLayout<'a> {
    pub fixed: FixedWidths,
    pub handle_width: f64,
    pub collapsed: &'a BTreeSet<Granularity>,
}

// -----------------------------------------------------------------------------
// Build
// -----------------------------------------------------------------------------

/// Lay out the header and body for one render pass. Never fails: rows that
/// cannot be placed simply have no bar.
pub fn build_grid(
    baseline: &Baseline,
    axis: &Axis,
    rows: &RowSet,
    widths: &ColumnWidths,
    layout: GridLayout<'_>,
) -> Grid {
    let mut days = Vec::with_capacity(axis.day_count());
    let mut x = 0.0;
    for unit in &axis.days {
        let width = widths.width_of(&unit.key);
        days.push(DayColumn {
            key: unit.key.clone(),
            date: unit.anchor,
            x,
            width,
        });
        x += width;
    }
    let timeline_width = x;

    let header = Granularity::ALL
        .iter()
        .map(|&g| HeaderRow {
            granularity: g,
            collapsed: layout.collapsed.contains(&g),
            cells: axis
                .units(g)
                .iter()
                .filter_map(|u| {
                    let (x, width) = span_of(&days, &u.days)?;
                    Some(HeaderCell {
                        key: u.key.clone(),
                        label: u.label.clone(),
                        days: u.days.clone(),
                        x,
                        width,
                    })
                })
                .collect(),
        })
        .collect();

    let body = rows
        .rows
        .iter()
        .map(|row| BodyRow {
            descriptor: if row.numbering.is_empty() {
                row.title.clone()
            } else {
                format!("{} {}", row.numbering, row.title)
            },
            indent: row.level as usize,
            progress_label: format!("{}%", row.progress),
            bar: place_bar(axis, &days, row),
            row: row.clone(),
        })
        .collect();

    let view_anchor_x = axis
        .clamped_day_index(baseline.anchored_view_start())
        .and_then(|i| days.get(i))
        .map_or(0.0, |d| d.x);

    Grid {
        source: rows.source,
        span: (baseline.project_start, baseline.project_end),
        corner: Corner {
            row_span: HEADER_ROWS,
            col_span: FIXED_COLUMNS,
            width: layout.fixed.total(),
        },
        fixed: layout.fixed,
        header,
        days,
        body,
        timeline_width,
        view_anchor_x,
        handle_width: layout.handle_width,
    }
}

fn span_of(days: &[DayColumn], range: &Range<usize>) -> Option<(f64, f64)> {
    let first = days.get(range.start)?;
    let last = days.get(range.end.checked_sub(1)?)?;
    Some((first.x, last.x + last.width - first.x))
}

fn place_bar(axis: &Axis, days: &[DayColumn], row: &DisplayRow) -> Option<Bar> {
    if row.end < axis.start || row.start > axis.end {
        return None;
    }
    let start_col = axis.clamped_day_index(row.start)?;
    let end_col = axis.clamped_day_index(row.end)?.max(start_col);
    let (x, width) = span_of(days, &(start_col..end_col + 1))?;
    let progress = f64::from(row.progress.min(100));
    Some(Bar {
        start_col,
        end_col,
        x,
        width,
        fill: width * progress / 100.0,
        clipped_start: row.start < axis.start,
        clipped_end: row.end > axis.end,
    })
}

// -----------------------------------------------------------------------------
// Lookups and hit testing
// -----------------------------------------------------------------------------

impl Grid {
    pub fn header_row(&self, g: Granularity) -> Option<&HeaderRow> {
        self.header.iter().find(|r| r.granularity == g)
    }

    /// Date of the day column under timeline offset `x`, clamped to the
    /// first/last column. None for an empty grid.
    pub fn date_at_x(&self, x: f64) -> Option<NaiveDate> {
        self.col_at_x(x).map(|i| self.days[i].date)
    }

    /// Index of the day column under timeline offset `x`, clamped
    pub fn col_at_x(&self, x: f64) -> Option<usize> {
        if self.days.is_empty() {
            return None;
        }
        let idx = self.days.partition_point(|d| d.x + d.width <= x);
        Some(idx.min(self.days.len() - 1))
    }

    /// Width of the day column showing `date`, if it is in the span
    pub fn day_width_at(&self, date: NaiveDate) -> Option<f64> {
        let idx = usize::try_from((date - self.span.0).num_days()).ok()?;
        self.days.get(idx).map(|d| d.width)
    }

    /// Table x where the header's date rows begin: past the merged corner,
    /// plus the offset of the first day cell
    pub fn header_origin(&self) -> f64 {
        let first_day = self
            .header_row(Granularity::Day)
            .and_then(|r| r.cells.first())
            .map_or(0.0, |c| c.x);
        self.corner.width + first_day
    }

    /// Table x of the right border of the progress column, summed from the
    /// leading body cells
    pub fn body_origin(&self) -> f64 {
        [FixedColumn::Descriptor, FixedColumn::Progress]
            .into_iter()
            .map(|c| self.fixed.get(c))
            .sum()
    }

    /// Offset of the right edge of the last day column still visible from a
    /// scroll position; scrolling stops once the last column is leftmost.
    pub fn max_scroll(&self) -> f64 {
        self.days.last().map_or(0.0, |d| d.x)
    }

    /// Resize affordance of a header cell at timeline offset `x`
    pub fn hit_header(&self, g: Granularity, x: f64) -> Option<PointerTarget> {
        let row = self.header_row(g)?;
        if row.collapsed {
            return None;
        }
        let idx = row.cells.partition_point(|c| c.right() < x);
        let cell = row.cells.get(idx)?;
        let grab = self.handle_width.min(cell.width / 2.0);
        (x >= cell.right() - grab && x <= cell.right()).then_some(PointerTarget::HeaderResize {
            granularity: g,
            cell: idx,
        })
    }

    /// Bar part at timeline offset `x` in body row `row`
    pub fn hit_bar(&self, row: usize, x: f64) -> Option<PointerTarget> {
        let bar = self.body.get(row)?.bar?;
        if x < bar.x || x > bar.right() {
            return None;
        }
        let grab = self.handle_width.min(bar.width / 3.0);
        let part = if x < bar.x + grab {
            BarPart::LeftHandle
        } else if x > bar.right() - grab {
            BarPart::RightHandle
        } else {
            BarPart::Body
        };
        Some(PointerTarget::Bar { row, part })
    }

    /// Resize affordance of a leading column at table offset `x`
    pub fn hit_fixed(&self, x: f64) -> Option<PointerTarget> {
        let near = |edge: f64| x >= edge - self.handle_width && x <= edge;
        if near(self.fixed.descriptor) {
            Some(PointerTarget::FixedResize {
                column: FixedColumn::Descriptor,
            })
        } else if near(self.fixed.total()) {
            Some(PointerTarget::FixedResize {
                column: FixedColumn::Progress,
            })
        } else {
            None
        }
    }
}
