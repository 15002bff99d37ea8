use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::TimelineConfig;

use super::axis::{Axis, TimeUnit};

/// Bounds of the descriptor (title) column
pub const DESCRIPTOR_WIDTH_RANGE: (f64, f64) = (140.0, 560.0);
/// Bounds of the progress column
pub const PROGRESS_WIDTH_RANGE: (f64, f64) = (80.0, 360.0);

/// Pixel widths of the day columns, keyed by day-unit key.
///
/// Only overrides are stored; every other key resolves to the default.
/// Coarser header widths are never stored, they are the sum of the day
/// columns they cover.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnWidths {
    default: f64,
    min: f64,
    overrides: HashMap<String, f64>,
}

impl ColumnWidths {
    pub fn new(default: f64, min: f64) -> Self {
        let min = min.max(1.0);
        ColumnWidths {
            default: default.max(min),
            min,
            overrides: HashMap::new(),
        }
    }

    pub fn from_config(config: &TimelineConfig) -> Self {
        Self::new(config.default_column_width, config.min_column_width)
    }

    pub fn default_width(&self) -> f64 {
        self.default
    }

    pub fn min_width(&self) -> f64 {
        self.min
    }

    pub fn width_of(&self, day_key: &str) -> f64 {
        self.overrides.get(day_key).copied().unwrap_or(self.default)
    }

    /// Set one column's width, clamped to the minimum. Returns the stored width.
    pub fn set_width(&mut self, day_key: &str, px: f64) -> f64 {
        let px = if px.is_finite() { px.max(self.min) } else { self.default };
        self.overrides.insert(day_key.to_string(), px);
        px
    }

    /// Rendered width of any unit: the sum of its covered day columns
    pub fn span_width(&self, axis: &Axis, unit: &TimeUnit) -> f64 {
        axis.days
            .get(unit.days.clone())
            .map(|days| days.iter().map(|d| self.width_of(&d.key)).sum())
            .unwrap_or(0.0)
    }

    /// Current widths of the day columns a unit covers, for a resize gesture
    pub fn snapshot(&self, axis: &Axis, unit: &TimeUnit) -> Vec<(String, f64)> {
        axis.days
            .get(unit.days.clone())
            .unwrap_or_default()
            .iter()
            .map(|d| (d.key.clone(), self.width_of(&d.key)))
            .collect()
    }

    /// Spread `dx` evenly over the snapshotted columns, each measured from
    /// its starting width. Columns are clamped individually at the minimum.
    pub fn resize_proportional(&mut self, starting: &[(String, f64)], dx: f64) {
        if starting.is_empty() {
            return;
        }
        let per_column = dx / starting.len() as f64;
        for (key, width) in starting {
            self.set_width(key, width + per_column);
        }
    }

    pub fn overrides(&self) -> &HashMap<String, f64> {
        &self.overrides
    }

    /// Replace all overrides, e.g. from saved view state. Values are re-clamped.
    pub fn load_overrides(&mut self, overrides: HashMap<String, f64>) {
        self.overrides.clear();
        for (key, px) in overrides {
            self.set_width(&key, px);
        }
    }

    pub fn reset(&mut self) {
        self.overrides.clear();
    }
}

/// Widths of the two leading columns
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedWidths {
    pub descriptor: f64,
    pub progress: f64,
}

/// Which leading column a resize affordance belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FixedColumn {
    Descriptor,
    Progress,
}

impl FixedWidths {
    pub fn from_config(config: &TimelineConfig) -> Self {
        let mut w = FixedWidths {
            descriptor: config.descriptor_width,
            progress: config.progress_width,
        };
        w.clamp();
        w
    }

    pub fn get(&self, column: FixedColumn) -> f64 {
        match column {
            FixedColumn::Descriptor => self.descriptor,
            FixedColumn::Progress => self.progress,
        }
    }

    /// Set a leading column's width within its allowed range
    pub fn set(&mut self, column: FixedColumn, px: f64) -> f64 {
        let (lo, hi) = column.range();
        let px = if px.is_finite() { px.clamp(lo, hi) } else { lo };
        match column {
            FixedColumn::Descriptor => self.descriptor = px,
            FixedColumn::Progress => self.progress = px,
        }
        px
    }

    pub fn clamp(&mut self) {
        self.set(FixedColumn::Descriptor, self.descriptor);
        self.set(FixedColumn::Progress, self.progress);
    }

    /// Left edge of the timeline area
    pub fn total(&self) -> f64 {
        self.descriptor + self.progress
    }
}

impl FixedColumn {
    pub fn range(self) -> (f64, f64) {
        match self {
            FixedColumn::Descriptor => DESCRIPTOR_WIDTH_RANGE,
            FixedColumn::Progress => PROGRESS_WIDTH_RANGE,
        }
    }
}
