use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;

use crate::io::lock::{DEFAULT_LOCK_TIMEOUT, LockError, StoreLock};
use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::model::{Deliverable, Milestone, Project, Task};

/// Name of the data directory holding projects.json, gantry.toml and state
pub const GANTRY_DIR: &str = "gantry";
pub const PROJECTS_FILE: &str = "projects.json";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("not a gantry directory: no gantry/projects.json found")]
    NotFound,
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not write {path}: {source} (saved to recovery log)")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not serialize projects: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Where projects are loaded from and written back to after a drag
pub trait ProjectStore {
    fn load(&self) -> Result<Vec<Project>, StoreError>;

    /// Replace the project with the same name (case-insensitive) or append
    /// it. Returns the stored list after the write.
    fn upsert(&mut self, project: &Project) -> Result<Vec<Project>, StoreError>;
}

/// Apply upsert semantics to an in-memory list.
/// Unnamed projects never match an existing entry.
pub fn upsert_by_name(projects: &mut Vec<Project>, project: &Project) {
    let slot = if project.name.trim().is_empty() {
        None
    } else {
        projects
            .iter_mut()
            .find(|p| p.name.to_lowercase() == project.name.to_lowercase())
    };
    match slot {
        Some(existing) => *existing = project.clone(),
        None => projects.push(project.clone()),
    }
}

/// Case-insensitive lookup by name
pub fn find_project<'a>(projects: &'a [Project], name: &str) -> Option<&'a Project> {
    let wanted = name.to_lowercase();
    projects.iter().find(|p| p.name.to_lowercase() == wanted)
}

// -----------------------------------------------------------------------------
// JSON file store
// -----------------------------------------------------------------------------

/// `gantry/projects.json`, a JSON array of projects
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// A store over an existing (or to-be-created) gantry directory
    pub fn new(gantry_dir: impl Into<PathBuf>) -> Self {
        JsonStore {
            dir: gantry_dir.into(),
        }
    }

    /// Discover the gantry directory from `start` upward
    pub fn discover(start: &Path) -> Result<Self, StoreError> {
        Ok(Self::new(discover_root(start)?.join(GANTRY_DIR)))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(PROJECTS_FILE)
    }

    fn read_all(&self) -> Result<Vec<Project>, StoreError> {
        let path = self.path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|source| StoreError::Parse { path, source })
    }

    /// Overwrite the whole list. Failed writes land in the recovery log.
    pub fn save_all(&self, projects: &[Project]) -> Result<(), StoreError> {
        let path = self.path();
        let content = serde_json::to_string_pretty(projects)?;
        if let Err(source) = recovery::atomic_write(&path, content.as_bytes()) {
            recovery::log_recovery(
                &self.dir,
                RecoveryEntry::new(RecoveryCategory::Write, "projects write failed")
                    .field("Target", PROJECTS_FILE)
                    .field("Error", source.to_string())
                    .body(content),
            );
            return Err(StoreError::Write { path, source });
        }
        Ok(())
    }
}

impl ProjectStore for JsonStore {
    fn load(&self) -> Result<Vec<Project>, StoreError> {
        self.read_all()
    }

    fn upsert(&mut self, project: &Project) -> Result<Vec<Project>, StoreError> {
        let _lock = StoreLock::acquire(&self.dir, DEFAULT_LOCK_TIMEOUT)?;
        let mut projects = self.read_all()?;
        upsert_by_name(&mut projects, project);
        self.save_all(&projects)?;
        log::info!("upserted project {:?} ({} stored)", project.name, projects.len());
        Ok(projects)
    }
}

/// Walk up from `start` looking for `gantry/projects.json`.
/// Returns the directory containing `gantry/`.
pub fn discover_root(start: &Path) -> Result<PathBuf, StoreError> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(GANTRY_DIR).join(PROJECTS_FILE).is_file() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(StoreError::NotFound);
        }
    }
}

// -----------------------------------------------------------------------------
// In-memory store
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    projects: Vec<Project>,
}

impl MemoryStore {
    pub fn new(projects: Vec<Project>) -> Self {
        MemoryStore { projects }
    }

    /// Seeded with the sample projects
    pub fn demo() -> Self {
        Self::new(demo_projects())
    }
}

impl ProjectStore for MemoryStore {
    fn load(&self) -> Result<Vec<Project>, StoreError> {
        Ok(self.projects.clone())
    }

    fn upsert(&mut self, project: &Project) -> Result<Vec<Project>, StoreError> {
        upsert_by_name(&mut self.projects, project);
        Ok(self.projects.clone())
    }
}

// -----------------------------------------------------------------------------
// Sample data
// -----------------------------------------------------------------------------

fn task(title: &str, start: &str, end: &str, progress: i64) -> Task {
    Task {
        title: title.into(),
        start: Some(start.into()),
        end: Some(end.into()),
        progress,
        ..Default::default()
    }
}

fn deliverable(title: &str, start: &str, end: &str, tasks: Vec<Task>) -> Deliverable {
    Deliverable {
        title: title.into(),
        start: Some(start.into()),
        end: Some(end.into()),
        tasks,
        ..Default::default()
    }
}

fn milestone(title: &str, start: &str, end: &str, deliverables: Vec<Deliverable>) -> Milestone {
    Milestone {
        title: title.into(),
        start: Some(start.into()),
        end: Some(end.into()),
        deliverables,
        ..Default::default()
    }
}

fn with_extra(mut project: Project, fields: serde_json::Value) -> Project {
    if let serde_json::Value::Object(map) = fields {
        project.extra.extend(map);
    }
    project
}

/// The two sample projects, each with a small milestone hierarchy
pub fn demo_projects() -> Vec<Project> {
    let infrastructure = Project {
        name: "Infrastructure Upgrade".into(),
        start: Some("2025-01-01".into()),
        end: Some("2025-06-30".into()),
        progress: Some(45),
        milestones: vec![
            milestone(
                "Assessment",
                "2025-01-01",
                "2025-02-14",
                vec![deliverable(
                    "Capacity report",
                    "2025-01-06",
                    "2025-02-14",
                    vec![
                        task("Inventory servers", "2025-01-06", "2025-01-17", 100),
                        task("Load test baseline", "2025-01-20", "2025-02-07", 80),
                    ],
                )],
            ),
            milestone(
                "Rollout",
                "2025-02-17",
                "2025-06-30",
                vec![deliverable(
                    "Network refresh",
                    "2025-03-03",
                    "2025-05-30",
                    vec![task("Replace core switches", "2025-03-03", "2025-04-11", 30)],
                )],
            ),
        ],
        ..Default::default()
    };

    let portal = Project {
        name: "Customer Portal Development".into(),
        start: Some("2025-02-15".into()),
        end: Some("2025-08-15".into()),
        progress: Some(15),
        milestones: vec![milestone(
            "Discovery",
            "2025-02-15",
            "2025-04-15",
            vec![deliverable(
                "Requirements",
                "2025-02-17",
                "2025-03-28",
                vec![task("Stakeholder interviews", "2025-02-17", "2025-03-07", 60)],
            )],
        )],
        ..Default::default()
    };

    vec![
        with_extra(
            infrastructure,
            json!({
                "description": "Upgrade company infrastructure to support increased load",
                "status": "in-progress",
                "priority": "high",
            }),
        ),
        with_extra(
            portal,
            json!({
                "description": "Build new customer-facing portal with advanced features",
                "status": "planning",
                "priority": "medium",
            }),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn init_dir(tmp: &TempDir) -> JsonStore {
        let dir = tmp.path().join(GANTRY_DIR);
        fs::create_dir_all(&dir).unwrap();
        JsonStore::new(dir)
    }

    #[test]
    fn upsert_matches_case_insensitively() {
        let mut projects = vec![Project::new("Apollo"), Project::new("Gemini")];
        let mut renamed = Project::new("APOLLO");
        renamed.start = Some("2025-01-01".into());
        upsert_by_name(&mut projects, &renamed);
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].name, "APOLLO");
        assert_eq!(projects[0].start.as_deref(), Some("2025-01-01"));

        upsert_by_name(&mut projects, &Project::new("Mercury"));
        assert_eq!(projects.len(), 3);
    }

    #[test]
    fn unnamed_projects_are_always_appended() {
        let mut projects = vec![Project::new("")];
        upsert_by_name(&mut projects, &Project::new(""));
        assert_eq!(projects.len(), 2);
    }

    #[test]
    fn missing_file_loads_empty_and_malformed_file_errors() {
        let tmp = TempDir::new().unwrap();
        let store = init_dir(&tmp);
        assert!(store.load().unwrap().is_empty());

        fs::write(store.path(), "{ not an array").unwrap();
        assert!(matches!(store.load(), Err(StoreError::Parse { .. })));
    }

    #[test]
    fn json_store_upsert_round_trips_extra_fields() {
        let tmp = TempDir::new().unwrap();
        let mut store = init_dir(&tmp);
        store.save_all(&demo_projects()).unwrap();

        let mut portal = find_project(&store.load().unwrap(), "customer portal development")
            .unwrap()
            .clone();
        portal.end = Some("2025-09-01".into());
        let stored = store.upsert(&portal).unwrap();
        assert_eq!(stored.len(), 2);

        let reloaded = store.load().unwrap();
        assert_eq!(reloaded[1].end.as_deref(), Some("2025-09-01"));
        assert_eq!(reloaded[1].extra.get("status"), Some(&json!("planning")));
        assert!(!store.dir().join(".lock").exists());
    }

    #[test]
    fn discover_walks_up_to_gantry_dir() {
        let tmp = TempDir::new().unwrap();
        let store = init_dir(&tmp);
        fs::write(store.path(), "[]").unwrap();
        let nested = tmp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let found = discover_root(&nested).unwrap();
        assert_eq!(found, tmp.path());

        let elsewhere = TempDir::new().unwrap();
        assert!(matches!(discover_root(elsewhere.path()), Err(StoreError::NotFound)));
    }

    #[test]
    fn memory_store_upserts_in_place() {
        let mut store = MemoryStore::demo();
        let mut infra = store.load().unwrap()[0].clone();
        infra.progress = Some(50);
        let stored = store.upsert(&infra).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].progress, Some(50));
    }

    #[test]
    fn demo_projects_carry_hierarchies() {
        let projects = demo_projects();
        assert_eq!(projects[0].name, "Infrastructure Upgrade");
        assert_eq!(projects[0].start.as_deref(), Some("2025-01-01"));
        assert_eq!(projects[0].end.as_deref(), Some("2025-06-30"));
        assert_eq!(projects[1].progress, Some(15));
        assert!(projects.iter().all(|p| !p.milestones.is_empty()));
    }
}
