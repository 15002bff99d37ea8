use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tempfile::NamedTempFile;

/// Written once at the top of a new recovery log
const FILE_HEADER: &str = "\
<!-- gantry recovery log: data that could not be saved normally.
     View with: gt recovery
     Clear with: gt recovery --clear -->

---
";

/// Separator between timestamp and category in an entry heading
const HEADING_SEP: &str = " | ";

// -----------------------------------------------------------------------------
// Entries
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryCategory {
    /// An upsert that could not be written to projects.json
    Write,
    /// View state that could not be saved
    State,
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryCategory::Write => write!(f, "write"),
            RecoveryCategory::State => write!(f, "state"),
        }
    }
}

impl RecoveryCategory {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "write" => Some(RecoveryCategory::Write),
            "state" => Some(RecoveryCategory::State),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    pub fields: Vec<(String, String)>,
    /// The unsaved payload
    pub body: String,
}

impl RecoveryEntry {
    pub fn new(category: RecoveryCategory, description: impl Into<String>) -> Self {
        RecoveryEntry {
            timestamp: Utc::now(),
            category,
            description: description.into(),
            fields: Vec::new(),
            body: String::new(),
        }
    }

    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields.push((key.to_string(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    fn to_markdown(&self) -> String {
        let mut out = format!(
            "## {}{}{}: {}\n\n",
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            HEADING_SEP,
            self.category,
            self.description,
        );
        for (key, value) in &self.fields {
            out.push_str(&format!("{}: {}\n", key, value));
        }
        if !self.body.is_empty() {
            out.push_str("\n```json\n");
            out.push_str(self.body.trim_end_matches('\n'));
            out.push_str("\n```\n");
        }
        out.push_str("\n---\n");
        out
    }

    /// JSON form for `gt recovery --json`
    pub fn to_json(&self) -> serde_json::Value {
        let fields: serde_json::Map<String, serde_json::Value> = self
            .fields
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        serde_json::json!({
            "timestamp": self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "category": self.category.to_string(),
            "description": self.description,
            "fields": fields,
            "body": self.body,
        })
    }

    pub fn to_display(&self) -> String {
        self.to_markdown()
    }
}

// -----------------------------------------------------------------------------
// Writing
// -----------------------------------------------------------------------------

pub fn recovery_log_path(gantry_dir: &Path) -> PathBuf {
    gantry_dir.join(".recovery.log")
}

/// Write `content` to `path` through a temp file in the same directory
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Append an entry. Failure to log is reported but never propagated.
pub fn log_recovery(gantry_dir: &Path, entry: RecoveryEntry) {
    log::warn!("recovery: {}: {}", entry.category, entry.description);
    if let Err(e) = append_entry(gantry_dir, &entry) {
        log::error!("could not write recovery log: {}", e);
        eprintln!("warning: could not write to recovery log: {}", e);
    }
}

fn append_entry(gantry_dir: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    let path = recovery_log_path(gantry_dir);
    let needs_header = std::fs::metadata(&path).map_or(true, |m| m.len() == 0);
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    if needs_header {
        file.write_all(FILE_HEADER.as_bytes())?;
    }
    file.write_all(entry.to_markdown().as_bytes())
}

/// Remove every entry, keeping the header. Returns how many were removed.
pub fn clear_recovery(gantry_dir: &Path) -> io::Result<usize> {
    let path = recovery_log_path(gantry_dir);
    let Ok(content) = std::fs::read_to_string(&path) else {
        return Ok(0);
    };
    let count = parse_entries(&content).len();
    atomic_write(&path, FILE_HEADER.as_bytes())?;
    Ok(count)
}

// -----------------------------------------------------------------------------
// Reading
// -----------------------------------------------------------------------------

/// Entries, most recent first, optionally only the last `limit`
pub fn read_recovery_entries(gantry_dir: &Path, limit: Option<usize>) -> Vec<RecoveryEntry> {
    let Ok(content) = std::fs::read_to_string(recovery_log_path(gantry_dir)) else {
        return Vec::new();
    };
    let mut entries = parse_entries(&content);
    if let Some(n) = limit {
        let skip = entries.len().saturating_sub(n);
        entries.drain(..skip);
    }
    entries.reverse();
    entries
}

fn parse_entries(content: &str) -> Vec<RecoveryEntry> {
    let mut entries = Vec::new();
    let mut lines = content.lines();

    while let Some(line) = lines.next() {
        let Some(heading) = line.strip_prefix("## ") else {
            continue;
        };
        let Some((timestamp, category, description)) = parse_heading(heading) else {
            continue;
        };

        let mut entry = RecoveryEntry {
            timestamp,
            category,
            description,
            fields: Vec::new(),
            body: String::new(),
        };
        let mut in_body = false;
        for line in lines.by_ref() {
            if in_body {
                if line == "```" {
                    in_body = false;
                } else {
                    if !entry.body.is_empty() {
                        entry.body.push('\n');
                    }
                    entry.body.push_str(line);
                }
                continue;
            }
            if line == "---" {
                break;
            }
            if line.starts_with("```") {
                in_body = true;
            } else if let Some((key, value)) = line.trim().split_once(": ") {
                entry.fields.push((key.to_string(), value.to_string()));
            }
        }
        entries.push(entry);
    }
    entries
}

fn parse_heading(heading: &str) -> Option<(DateTime<Utc>, RecoveryCategory, String)> {
    let (ts, rest) = heading.split_once(HEADING_SEP)?;
    let timestamp = DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc);
    let (category, description) = rest.split_once(": ")?;
    Some((timestamp, RecoveryCategory::parse(category)?, description.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("projects.json");
        atomic_write(&path, b"[]").unwrap();
        atomic_write(&path, b"[{}]").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[{}]");
    }

    #[test]
    fn logged_entries_read_back_newest_first() {
        let tmp = TempDir::new().unwrap();
        log_recovery(
            tmp.path(),
            RecoveryEntry::new(RecoveryCategory::Write, "upsert failed")
                .field("Project", "Apollo")
                .field("Error", "disk full")
                .body("{\n  \"name\": \"Apollo\"\n}"),
        );
        log_recovery(tmp.path(), RecoveryEntry::new(RecoveryCategory::State, "state save failed"));

        let entries = read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].category, RecoveryCategory::State);
        let write = &entries[1];
        assert_eq!(write.description, "upsert failed");
        assert_eq!(
            write.fields,
            vec![
                ("Project".to_string(), "Apollo".to_string()),
                ("Error".to_string(), "disk full".to_string()),
            ]
        );
        assert_eq!(write.body, "{\n  \"name\": \"Apollo\"\n}");

        let last = read_recovery_entries(tmp.path(), Some(1));
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].category, RecoveryCategory::State);
    }

    #[test]
    fn clear_keeps_header_only() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(clear_recovery(tmp.path()).unwrap(), 0);
        log_recovery(tmp.path(), RecoveryEntry::new(RecoveryCategory::Write, "x"));
        assert_eq!(clear_recovery(tmp.path()).unwrap(), 1);
        assert!(read_recovery_entries(tmp.path(), None).is_empty());
        let text = std::fs::read_to_string(recovery_log_path(tmp.path())).unwrap();
        assert!(text.starts_with("<!-- gantry recovery log"));
    }
}
