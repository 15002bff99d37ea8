use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::EntityPath;
use crate::util::dates;

use super::axis::Granularity;
use super::widths::FixedColumn;

/// The bar being dragged and where it started
#[derive(Debug, Clone, PartialEq)]
pub struct BarDrag {
    pub row: usize,
    pub entity: EntityPath,
    /// Pointer position at press, in timeline content px
    pub origin_x: f64,
    /// Bar edge the pointer grabbed (left edge for moves and left handles)
    pub edge_x: f64,
    /// Width used to turn a move distance into whole days
    pub day_width: f64,
    pub orig_start: NaiveDate,
    pub orig_end: NaiveDate,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BarDrag {
    pub fn changed(&self) -> bool {
        self.start != self.orig_start || self.end != self.orig_end
    }
}

/// One pointer gesture
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Gesture {
    #[default]
    Idle,
    ColumnResizing {
        granularity: Granularity,
        key: String,
        origin_x: f64,
        /// Covered day keys and their widths at press
        starting: Vec<(String, f64)>,
    },
    FixedColumnResizing {
        column: FixedColumn,
        origin_x: f64,
        starting: f64,
    },
    BarMoving(BarDrag),
    BarResizingLeft(BarDrag),
    BarResizingRight(BarDrag),
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }

    pub fn bar_drag(&self) -> Option<&BarDrag> {
        match self {
            Gesture::BarMoving(d) | Gesture::BarResizingLeft(d) | Gesture::BarResizingRight(d) => {
                Some(d)
            }
            _ => None,
        }
    }

    /// Whether the pointer near a viewport edge should scroll the timeline
    pub fn scrolls(&self) -> bool {
        matches!(
            self,
            Gesture::ColumnResizing { .. }
                | Gesture::BarMoving(_)
                | Gesture::BarResizingLeft(_)
                | Gesture::BarResizingRight(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            Gesture::Idle => "idle",
            Gesture::ColumnResizing { .. } => "column-resizing",
            Gesture::FixedColumnResizing { .. } => "fixed-column-resizing",
            Gesture::BarMoving(_) => "bar-moving",
            Gesture::BarResizingLeft(_) => "bar-resizing-left",
            Gesture::BarResizingRight(_) => "bar-resizing-right",
        }
    }
}

// -----------------------------------------------------------------------------
// Drag math
// -----------------------------------------------------------------------------

/// Whole days represented by a horizontal distance
pub fn drag_days(dx: f64, day_width: f64) -> i64 {
    if day_width <= 0.0 || !dx.is_finite() {
        return 0;
    }
    (dx / day_width).round() as i64
}

/// Shift both ends by `days`, keeping the duration
pub fn moved(start: NaiveDate, end: NaiveDate, days: i64) -> (NaiveDate, NaiveDate) {
    (dates::add_days(start, days), dates::add_days(end, days))
}

/// The granularity drags snap to: the coarsest active one
pub fn snap_granularity(active: &BTreeSet<Granularity>) -> Option<Granularity> {
    active.iter().next().copied()
}

fn snapped(d: NaiveDate, snap: Option<Granularity>) -> NaiveDate {
    snap.map_or(d, |g| g.snap(d))
}

/// New start for a left-handle drag; never passes `end`
pub fn resize_start(pointer_date: NaiveDate, end: NaiveDate, snap: Option<Granularity>) -> NaiveDate {
    snapped(pointer_date, snap).min(end)
}

/// New end for a right-handle drag; never precedes `start`
pub fn resize_end(pointer_date: NaiveDate, start: NaiveDate, snap: Option<Granularity>) -> NaiveDate {
    snapped(pointer_date, snap).max(start)
}

/// Auto-scroll velocity in px/s for a pointer at `x` within `[left, right]`.
///
/// Zero outside the threshold band, ramping linearly to `max_speed` at the
/// edge (negative scrolls left).
pub fn autoscroll_velocity(x: f64, left: f64, right: f64, threshold: f64, max_speed: f64) -> f64 {
    if threshold <= 0.0 || right <= left {
        return 0.0;
    }
    let ramp = |distance: f64| max_speed * (1.0 - (distance / threshold).clamp(0.0, 1.0));
    if x < left + threshold {
        -ramp(x - left)
    } else if x > right - threshold {
        ramp(right - x)
    } else {
        0.0
    }
}

// -----------------------------------------------------------------------------
// Tooltip
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tooltip {
    pub text: String,
}

pub fn tooltip_for(gesture: &Gesture) -> Option<Tooltip> {
    let text = match gesture {
        Gesture::BarMoving(d) => format!(
            "Moving: {} to {}",
            dates::format(d.start),
            dates::format(d.end)
        ),
        Gesture::BarResizingLeft(d) => format!("Setting start: {}", dates::format(d.start)),
        Gesture::BarResizingRight(d) => format!("Setting end: {}", dates::format(d.end)),
        _ => return None,
    };
    Some(Tooltip { text })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn three_columns_right_is_three_days() {
        assert_eq!(drag_days(180.0, 60.0), 3);
        assert_eq!(drag_days(-95.0, 60.0), -2);
        assert_eq!(drag_days(29.0, 60.0), 0);
        assert_eq!(drag_days(50.0, 0.0), 0);

        let (s, e) = moved(ymd(2025, 1, 6), ymd(2025, 1, 10), 3);
        assert_eq!((s, e), (ymd(2025, 1, 9), ymd(2025, 1, 13)));
    }

    #[test]
    fn handles_clamp_against_the_other_end() {
        let start = ymd(2025, 3, 10);
        let end = ymd(2025, 3, 14);
        assert_eq!(resize_start(ymd(2025, 3, 20), end, None), end);
        assert_eq!(resize_start(ymd(2025, 3, 12), end, None), ymd(2025, 3, 12));
        assert_eq!(resize_end(ymd(2025, 3, 1), start, None), start);
        assert_eq!(resize_end(ymd(2025, 3, 16), start, Some(Granularity::Day)), ymd(2025, 3, 16));
    }

    #[test]
    fn handles_snap_to_coarsest_active_unit() {
        let active = BTreeSet::from([Granularity::Day, Granularity::Week]);
        let snap = snap_granularity(&active);
        assert_eq!(snap, Some(Granularity::Week));
        // Thu 2025-03-20 snaps back to Mon 2025-03-17
        assert_eq!(resize_start(ymd(2025, 3, 20), ymd(2025, 4, 30), snap), ymd(2025, 3, 17));
        assert_eq!(resize_end(ymd(2025, 3, 22), ymd(2025, 3, 1), snap), ymd(2025, 3, 24));
        assert_eq!(snap_granularity(&BTreeSet::new()), None);
    }

    #[test]
    fn autoscroll_ramps_linearly_near_edges() {
        let v = |x| autoscroll_velocity(x, 0.0, 1000.0, 50.0, 900.0);
        assert_eq!(v(500.0), 0.0);
        assert_eq!(v(0.0), -900.0);
        assert_eq!(v(25.0), -450.0);
        assert_eq!(v(1000.0), 900.0);
        assert_eq!(v(975.0), 450.0);
        assert_eq!(v(1200.0), 900.0);
        assert_eq!(autoscroll_velocity(10.0, 0.0, 1000.0, 0.0, 900.0), 0.0);
    }

    #[test]
    fn tooltip_is_labeled_by_drag_type() {
        let drag = BarDrag {
            row: 0,
            entity: EntityPath::Task(0, 0, 0),
            origin_x: 0.0,
            edge_x: 0.0,
            day_width: 60.0,
            orig_start: ymd(2025, 1, 1),
            orig_end: ymd(2025, 1, 3),
            start: ymd(2025, 1, 2),
            end: ymd(2025, 1, 4),
        };
        assert!(drag.changed());
        let text = |g: Gesture| tooltip_for(&g).unwrap().text;
        assert_eq!(text(Gesture::BarMoving(drag.clone())), "Moving: 2025-01-02 to 2025-01-04");
        assert_eq!(text(Gesture::BarResizingLeft(drag.clone())), "Setting start: 2025-01-02");
        assert_eq!(text(Gesture::BarResizingRight(drag)), "Setting end: 2025-01-04");
        assert_eq!(tooltip_for(&Gesture::Idle), None);
    }
}
