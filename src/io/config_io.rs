use std::fs;
use std::path::{Path, PathBuf};

use crate::model::GantryConfig;

pub const CONFIG_FILE: &str = "gantry.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid gantry.toml: {0}")]
    Invalid(#[from] toml::de::Error),
    #[error("invalid gantry.toml: {0}")]
    Syntax(#[from] toml_edit::TomlError),
    #[error("unknown config key: {0}")]
    UnknownKey(String),
}

pub fn config_path(gantry_dir: &Path) -> PathBuf {
    gantry_dir.join(CONFIG_FILE)
}

/// Read gantry.toml as both typed config and an editable document.
/// A missing file yields defaults and an empty document.
pub fn read_config(gantry_dir: &Path) -> Result<(GantryConfig, toml_edit::DocumentMut), ConfigError> {
    let path = config_path(gantry_dir);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(source) => return Err(ConfigError::Read { path, source }),
    };
    let config: GantryConfig = toml::from_str(&text)?;
    let doc: toml_edit::DocumentMut = text.parse()?;
    Ok((config, doc))
}

/// Load just the typed config, falling back to defaults on any problem
pub fn load_config_or_default(gantry_dir: &Path) -> GantryConfig {
    match read_config(gantry_dir) {
        Ok((config, _)) => config,
        Err(e) => {
            log::warn!("{}; using default configuration", e);
            GantryConfig::default()
        }
    }
}

/// Write the document back, preserving comments and layout
pub fn write_config(gantry_dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let path = config_path(gantry_dir);
    fs::write(&path, doc.to_string()).map_err(|source| ConfigError::Write { path, source })
}

/// Look up a dotted key (`timeline.default_column_width`)
pub fn get_key(doc: &toml_edit::DocumentMut, key: &str) -> Option<String> {
    let mut item = doc.as_item();
    for part in key.split('.') {
        item = item.get(part)?;
    }
    Some(match item.as_value() {
        Some(toml_edit::Value::String(s)) => s.value().clone(),
        Some(v) => {
            let mut bare = v.clone();
            bare.decor_mut().clear();
            bare.to_string()
        }
        None => item.to_string().trim().to_string(),
    })
}

/// Set a dotted key. The raw value is parsed as a TOML value when it can
/// be (numbers, booleans, arrays) and stored as a string otherwise. The
/// result must still deserialize as a valid configuration.
pub fn set_key(doc: &mut toml_edit::DocumentMut, key: &str, raw: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = key.split('.').collect();
    let Some((leaf, tables)) = parts.split_last() else {
        return Err(ConfigError::UnknownKey(key.to_string()));
    };
    if tables.is_empty() || !known_key(key) {
        return Err(ConfigError::UnknownKey(key.to_string()));
    }

    let mut value: toml_edit::Value = raw
        .parse()
        .unwrap_or_else(|_| toml_edit::Value::from(raw));
    value.decor_mut().clear();

    let mut table = doc.as_table_mut();
    for part in tables {
        if !table.contains_key(part) {
            table.insert(part, toml_edit::Item::Table(toml_edit::Table::new()));
        }
        table = table[*part]
            .as_table_mut()
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
    }
    table[*leaf] = toml_edit::Item::Value(value);

    toml::from_str::<GantryConfig>(&doc.to_string())?;
    Ok(())
}

fn known_key(key: &str) -> bool {
    const KEYS: &[&str] = &[
        "timeline.default_column_width",
        "timeline.min_column_width",
        "timeline.baseline_years",
        "timeline.descriptor_width",
        "timeline.progress_width",
        "timeline.handle_width",
        "timeline.snap",
        "autoscroll.threshold",
        "autoscroll.max_speed",
        "ui.px_per_cell",
    ];
    KEYS.contains(&key) || key.starts_with("ui.colors.")
}
