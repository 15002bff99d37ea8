use std::collections::BTreeSet;

use super::axis::Granularity;
use super::grid::{FIXED_COLUMNS, Grid, HEADER_ROWS};

/// Allowed drift between two edges that should coincide, in px
const ALIGN_TOLERANCE: f64 = 0.5;

/// View-side facts the structural checks need beyond the grid itself
#[derive(Debug, Clone, Copy)]
pub struct QaContext<'a> {
    pub active: &'a BTreeSet<Granularity>,
    /// Current horizontal scroll of the timeline, if a viewport is attached
    pub scroll_x: Option<f64>,
}

/// Structural assertions over a rendered grid.
///
/// Returns human-readable violations; an empty list means the render is
/// well-formed. `None` means nothing has been rendered yet.
pub fn self_check(grid: Option<&Grid>, ctx: QaContext<'_>) -> Vec<String> {
    let Some(grid) = grid else {
        return vec!["CRITICAL: Timeline table not rendered".to_string()];
    };
    let mut issues = Vec::new();

    if grid.corner.row_span == 0 || grid.corner.col_span == 0 {
        issues.push("CRITICAL: Merged header cell missing".to_string());
    } else if grid.corner.row_span != HEADER_ROWS || grid.corner.col_span != FIXED_COLUMNS {
        issues.push(format!(
            "CRITICAL: Merged header cell has incorrect span (should be {} rows x {} cols)",
            HEADER_ROWS, FIXED_COLUMNS
        ));
    }

    if grid.header.len() != HEADER_ROWS {
        issues.push(format!(
            "WARNING: Expected {} header rows, found {}",
            HEADER_ROWS,
            grid.header.len()
        ));
    }

    if let Some(days) = grid.header_row(Granularity::Day) {
        for (i, cell) in days.cells.iter().enumerate() {
            if cell.col_span() != 1 {
                issues.push(format!(
                    "ERROR: Day column {} should not be merged (has colspan={})",
                    i,
                    cell.col_span()
                ));
            }
        }
    }

    for row in &grid.header {
        if row.collapsed && ctx.active.contains(&row.granularity) {
            issues.push(format!(
                "WARNING: {} axis hidden although active",
                row.granularity.plural()
            ));
        }
    }

    if (grid.header_origin() - grid.body_origin()).abs() > ALIGN_TOLERANCE {
        issues.push(
            "ERROR: Left border of date rows not aligned with right border of progress column"
                .to_string(),
        );
    }

    let mut expected_x = 0.0;
    for (i, day) in grid.days.iter().enumerate() {
        if (day.x - expected_x).abs() > ALIGN_TOLERANCE {
            issues.push(format!("ERROR: Day column {} is not contiguous with its neighbor", i));
            break;
        }
        expected_x = day.x + day.width;
    }

    let anchored = ctx
        .scroll_x
        .is_none_or(|scroll_x| (scroll_x - grid.view_anchor_x).abs() <= ALIGN_TOLERANCE);
    if !anchored {
        issues.push("WARNING: View not anchored to view start".to_string());
    }

    for issue in &issues {
        log::warn!("timeline qa: {}", issue);
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Project, TimelineConfig};
    use crate::timeline::axis::Axis;
    use crate::timeline::baseline::resolve_baseline;
    use crate::timeline::grid::{GridLayout, build_grid};
    use crate::timeline::rows::{RowFilter, build_rows};
    use crate::timeline::widths::{ColumnWidths, FixedWidths};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn grid() -> Grid {
        let p = Project {
            name: "Apollo".into(),
            start: Some("2025-01-01".into()),
            end: Some("2025-03-31".into()),
            ..Default::default()
        };
        let today = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let baseline = resolve_baseline(Some(&p), None, today, 10);
        let axis = Axis::generate(baseline.project_start, baseline.project_end);
        let rows = build_rows(Some(&p), &baseline, RowFilter::default());
        let collapsed = BTreeSet::new();
        let layout = GridLayout {
            fixed: FixedWidths::from_config(&TimelineConfig::default()),
            handle_width: 8.0,
            collapsed: &collapsed,
        };
        build_grid(&baseline, &axis, &rows, &ColumnWidths::new(60.0, 20.0), layout)
    }

    fn check(grid: &Grid) -> Vec<String> {
        let active = BTreeSet::from([Granularity::Day]);
        self_check(Some(grid), QaContext { active: &active, scroll_x: Some(0.0) })
    }

    #[test]
    fn fresh_render_is_clean() {
        assert_eq!(check(&grid()), Vec::<String>::new());
    }

    #[test]
    fn nothing_rendered() {
        let active = BTreeSet::new();
        let issues = self_check(None, QaContext { active: &active, scroll_x: None });
        assert_eq!(issues, vec!["CRITICAL: Timeline table not rendered"]);
    }

    #[test]
    fn corner_shape_is_checked() {
        let mut g = grid();
        g.corner.row_span = 4;
        assert_eq!(
            check(&g),
            vec!["CRITICAL: Merged header cell has incorrect span (should be 5 rows x 2 cols)"]
        );
        g.corner.col_span = 0;
        assert_eq!(check(&g), vec!["CRITICAL: Merged header cell missing"]);
    }

    #[test]
    fn header_row_count_and_merged_days() {
        let mut g = grid();
        g.header.remove(0);
        let day_row = g.header.iter_mut().find(|r| r.granularity == Granularity::Day).unwrap();
        day_row.cells[2].days = 2..4;
        let issues = check(&g);
        assert_eq!(
            issues,
            vec![
                "WARNING: Expected 5 header rows, found 4",
                "ERROR: Day column 2 should not be merged (has colspan=2)",
            ]
        );
    }

    #[test]
    fn hidden_active_axis_is_reported() {
        let mut g = grid();
        g.header[4].collapsed = true;
        g.header[3].collapsed = true;
        assert_eq!(check(&g), vec!["WARNING: Days axis hidden although active"]);
    }

    #[test]
    fn corner_wider_than_leading_columns_is_misaligned() {
        let mut g = grid();
        g.corner.width += 12.0;
        assert_eq!(
            check(&g),
            vec!["ERROR: Left border of date rows not aligned with right border of progress column"]
        );
    }

    #[test]
    fn shifted_day_header_is_misaligned() {
        let mut g = grid();
        let days = g.header.iter_mut().find(|r| r.granularity == Granularity::Day).unwrap();
        days.cells[0].x = 4.0;
        assert_eq!(
            check(&g),
            vec!["ERROR: Left border of date rows not aligned with right border of progress column"]
        );
    }

    #[test]
    fn misalignment_is_reported() {
        let mut g = grid();
        g.fixed.progress += 12.0;
        g.days[3].x += 5.0;
        assert_eq!(
            check(&g),
            vec![
                "ERROR: Left border of date rows not aligned with right border of progress column",
                "ERROR: Day column 3 is not contiguous with its neighbor",
            ]
        );
    }

    #[test]
    fn unanchored_view_is_reported() {
        let g = grid();
        let active = BTreeSet::new();
        let issues = self_check(Some(&g), QaContext { active: &active, scroll_x: Some(240.0) });
        assert_eq!(issues, vec!["WARNING: View not anchored to view start"]);
    }
}
