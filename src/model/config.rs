use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::timeline::axis::Granularity;

/// Configuration from gantry.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GantryConfig {
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub autoscroll: AutoScrollConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineConfig {
    /// Default: see src/templates/gantry.toml
    #[serde(default = "default_column_width")]
    pub default_column_width: f64,
    /// Default: see src/templates/gantry.toml
    #[serde(default = "default_min_column_width")]
    pub min_column_width: f64,
    /// Span of the default baseline when a project has no dates
    #[serde(default = "default_baseline_years")]
    pub baseline_years: u32,
    #[serde(default = "default_descriptor_width")]
    pub descriptor_width: f64,
    #[serde(default = "default_progress_width")]
    pub progress_width: f64,
    /// Width of the grab zone for bar handles and header resize affordances
    #[serde(default = "default_handle_width")]
    pub handle_width: f64,
    /// Granularities active for snapping when no saved view state exists
    #[serde(default = "default_snap")]
    pub snap: Vec<Granularity>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        TimelineConfig {
            default_column_width: default_column_width(),
            min_column_width: default_min_column_width(),
            baseline_years: default_baseline_years(),
            descriptor_width: default_descriptor_width(),
            progress_width: default_progress_width(),
            handle_width: default_handle_width(),
            snap: default_snap(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoScrollConfig {
    /// Distance from a viewport edge (px) at which auto-scroll starts
    #[serde(default = "default_autoscroll_threshold")]
    pub threshold: f64,
    /// Scroll speed (px/s) with the pointer at the very edge
    #[serde(default = "default_autoscroll_speed")]
    pub max_speed: f64,
}

impl Default for AutoScrollConfig {
    fn default() -> Self {
        AutoScrollConfig {
            threshold: default_autoscroll_threshold(),
            max_speed: default_autoscroll_speed(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Horizontal pixels represented by one terminal cell
    #[serde(default = "default_px_per_cell")]
    pub px_per_cell: f64,
    #[serde(default)]
    pub colors: HashMap<String, String>,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            px_per_cell: default_px_per_cell(),
            colors: HashMap::new(),
        }
    }
}

fn default_column_width() -> f64 {
    60.0
}

fn default_min_column_width() -> f64 {
    20.0
}

fn default_baseline_years() -> u32 {
    10
}

fn default_descriptor_width() -> f64 {
    220.0
}

fn default_progress_width() -> f64 {
    160.0
}

fn default_handle_width() -> f64 {
    8.0
}

fn default_snap() -> Vec<Granularity> {
    vec![Granularity::Day]
}

fn default_autoscroll_threshold() -> f64 {
    48.0
}

fn default_autoscroll_speed() -> f64 {
    900.0
}

fn default_px_per_cell() -> f64 {
    10.0
}
