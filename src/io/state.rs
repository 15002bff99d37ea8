use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::timeline::axis::Granularity;
use crate::timeline::rows::RowFilter;
use crate::timeline::widths::FixedWidths;

/// Persisted view state (written to .state.json)
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ViewState {
    /// Name of the project shown last
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub filter: Option<RowFilter>,
    /// `YYYY-MM-DD`; None follows the project start
    #[serde(default)]
    pub view_start: Option<String>,
    /// Granularities drags snap to; None uses the configured default
    #[serde(default)]
    pub active: Option<Vec<Granularity>>,
    #[serde(default)]
    pub collapsed: Vec<Granularity>,
    /// Day-column width overrides keyed by day key
    #[serde(default)]
    pub widths: HashMap<String, f64>,
    #[serde(default)]
    pub fixed: Option<FixedWidths>,
}

pub fn state_path(gantry_dir: &Path) -> std::path::PathBuf {
    gantry_dir.join(".state.json")
}

/// Read .state.json; missing or malformed state is None
pub fn read_view_state(gantry_dir: &Path) -> Option<ViewState> {
    let content = fs::read_to_string(state_path(gantry_dir)).ok()?;
    match serde_json::from_str(&content) {
        Ok(state) => Some(state),
        Err(e) => {
            log::debug!("ignoring malformed view state: {}", e);
            None
        }
    }
}

pub fn write_view_state(gantry_dir: &Path, state: &ViewState) -> Result<(), std::io::Error> {
    let content = serde_json::to_string_pretty(state)?;
    crate::io::recovery::atomic_write(&state_path(gantry_dir), content.as_bytes())
}
