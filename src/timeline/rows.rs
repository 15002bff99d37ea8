use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{EntityPath, Project};
use crate::util::dates;

use super::baseline::Baseline;

/// Kind of entity a display row represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Project,
    Milestone,
    Deliverable,
    Task,
}

impl RowKind {
    /// Nesting level (0 = project)
    pub fn level(self) -> u8 {
        match self {
            RowKind::Project => 0,
            RowKind::Milestone => 1,
            RowKind::Deliverable => 2,
            RowKind::Task => 3,
        }
    }

    /// Accepts singular or plural names (`task`, `tasks`)
    pub fn parse(s: &str) -> Option<RowKind> {
        match s.trim().to_ascii_lowercase().as_str() {
            "project" | "projects" => Some(RowKind::Project),
            "milestone" | "milestones" => Some(RowKind::Milestone),
            "deliverable" | "deliverables" => Some(RowKind::Deliverable),
            "task" | "tasks" => Some(RowKind::Task),
            _ => None,
        }
    }
}

/// Which kinds of rows to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    pub project: bool,
    pub milestones: bool,
    pub deliverables: bool,
    pub tasks: bool,
}

impl Default for RowFilter {
    fn default() -> Self {
        RowFilter {
            project: true,
            milestones: true,
            deliverables: true,
            tasks: true,
        }
    }
}

impl RowFilter {
    pub fn shows(&self, kind: RowKind) -> bool {
        match kind {
            RowKind::Project => self.project,
            RowKind::Milestone => self.milestones,
            RowKind::Deliverable => self.deliverables,
            RowKind::Task => self.tasks,
        }
    }

    pub fn toggle(&mut self, kind: RowKind) {
        let flag = match kind {
            RowKind::Project => &mut self.project,
            RowKind::Milestone => &mut self.milestones,
            RowKind::Deliverable => &mut self.deliverables,
            RowKind::Task => &mut self.tasks,
        };
        *flag = !*flag;
    }
}

/// Where a row set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowSource {
    /// Rows mirror a loaded project
    Project,
    /// No project was loaded; rows are the illustrative example
    Demo,
}

/// A flattened, render-ready entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayRow {
    pub kind: RowKind,
    pub title: String,
    /// Positional numbering path: `""`, `"2"`, `"2.1"`, `"2.1.3"`
    pub numbering: String,
    pub level: u8,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Percent complete, clamped to 0-100
    pub progress: u8,
    /// The source entity; None for demo rows
    pub entity: Option<EntityPath>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowSet {
    pub source: RowSource,
    pub rows: Vec<DisplayRow>,
}

/// Flatten a project into display rows, depth-first in sibling order.
///
/// Entities without usable dates inherit the baseline span. With no project
/// at all, the fixed demo hierarchy is returned, tagged `RowSource::Demo`.
pub fn build_rows(project: Option<&Project>, baseline: &Baseline, filter: RowFilter) -> RowSet {
    let project = match project {
        Some(p) => p,
        None => {
            return RowSet {
                source: RowSource::Demo,
                rows: demo_rows(baseline, filter),
            };
        }
    };

    let span = (baseline.project_start, baseline.project_end);
    let mut rows = Vec::new();

    if filter.project {
        rows.push(make_row(
            RowKind::Project,
            titled(&project.name, "Project"),
            EntityPath::Project,
            resolve_dates(project.start.as_deref(), project.end.as_deref(), span),
            project.progress.unwrap_or(0),
        ));
    }

    for (mi, ms) in project.milestones.iter().enumerate() {
        if filter.milestones {
            rows.push(make_row(
                RowKind::Milestone,
                titled(&ms.title, &format!("Milestone {}", mi + 1)),
                EntityPath::Milestone(mi),
                resolve_dates(ms.start.as_deref(), ms.end.as_deref(), span),
                ms.progress.unwrap_or(0),
            ));
        }

        for (di, dl) in ms.deliverables.iter().enumerate() {
            if filter.deliverables {
                rows.push(make_row(
                    RowKind::Deliverable,
                    titled(&dl.title, &format!("Deliverable {}", di + 1)),
                    EntityPath::Deliverable(mi, di),
                    resolve_dates(dl.start.as_deref(), dl.end.as_deref(), span),
                    dl.progress.unwrap_or(0),
                ));
            }

            if !filter.tasks {
                continue;
            }
            for (ti, task) in dl.tasks.iter().enumerate() {
                rows.push(make_row(
                    RowKind::Task,
                    titled(&task.title, &format!("Task {}", ti + 1)),
                    EntityPath::Task(mi, di, ti),
                    resolve_dates(task.start.as_deref(), task.end.as_deref(), span),
                    task.progress,
                ));
            }
        }
    }

    RowSet {
        source: RowSource::Project,
        rows,
    }
}

/// Parse an entity's raw dates, substituting the span for missing or
/// malformed ends. An inverted pair collapses onto its start.
pub fn resolve_dates(
    start: Option<&str>,
    end: Option<&str>,
    span: (NaiveDate, NaiveDate),
) -> (NaiveDate, NaiveDate) {
    let parsed_start = dates::parse_opt(start);
    let parsed_end = dates::parse_opt(end);
    if parsed_start.is_none() && start.is_some_and(|s| !s.trim().is_empty()) {
        log::debug!("unparseable start date {:?}, using project start", start);
    }
    if parsed_end.is_none() && end.is_some_and(|s| !s.trim().is_empty()) {
        log::debug!("unparseable end date {:?}, using project end", end);
    }
    let s = parsed_start.unwrap_or(span.0);
    let e = parsed_end.unwrap_or(span.1);
    (s, e.max(s))
}

/// Write a row's new dates back to its source entity.
/// Returns false when the entity no longer exists.
pub fn commit_dates(
    project: &mut Project,
    path: EntityPath,
    start: NaiveDate,
    end: NaiveDate,
) -> bool {
    let Some(fields) = project.dates_at_mut(path) else {
        log::debug!("commit target {:?} not found, skipping", path);
        return false;
    };
    let (start, end) = (start.min(end), end.max(start));
    *fields.start = Some(dates::format(start));
    *fields.end = Some(dates::format(end));
    true
}

fn titled(title: &str, fallback: &str) -> String {
    if title.trim().is_empty() {
        fallback.to_string()
    } else {
        title.to_string()
    }
}

fn make_row(
    kind: RowKind,
    title: String,
    entity: EntityPath,
    (start, end): (NaiveDate, NaiveDate),
    progress: i64,
) -> DisplayRow {
    DisplayRow {
        kind,
        title,
        numbering: entity.numbering(),
        level: kind.level(),
        start,
        end,
        progress: progress.clamp(0, 100) as u8,
        entity: Some(entity),
    }
}

/// The illustrative hierarchy shown when nothing is loaded
fn demo_rows(baseline: &Baseline, filter: RowFilter) -> Vec<DisplayRow> {
    let demo = [
        (RowKind::Project, "Project", "", 35),
        (RowKind::Milestone, "M1", "1", 50),
        (RowKind::Deliverable, "D1.1", "1.1", 20),
        (RowKind::Task, "T1.1.1", "1.1.1", 10),
    ];
    demo.into_iter()
        .filter(|(kind, ..)| filter.shows(*kind))
        .map(|(kind, title, numbering, progress)| DisplayRow {
            kind,
            title: title.to_string(),
            numbering: numbering.to_string(),
            level: kind.level(),
            start: baseline.project_start,
            end: baseline.project_end,
            progress,
            entity: None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Deliverable, Milestone, Task};
    use crate::timeline::baseline::resolve_baseline;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn year_project() -> Project {
        Project {
            name: "Apollo".into(),
            start: Some("2025-01-01".into()),
            end: Some("2025-12-31".into()),
            ..Default::default()
        }
    }

    fn nested_project() -> Project {
        let mut p = year_project();
        p.milestones.push(Milestone {
            title: "Design".into(),
            start: Some("2025-02-01".into()),
            end: Some("2025-03-01".into()),
            deliverables: vec![Deliverable {
                title: "Spec".into(),
                tasks: vec![Task {
                    title: "Draft".into(),
                    progress: 40,
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        });
        p
    }

    fn baseline_for(p: &Project) -> Baseline {
        resolve_baseline(Some(p), None, ymd(2026, 1, 1), 10)
    }

    #[test]
    fn project_without_milestones_yields_single_row() {
        let p = year_project();
        let set = build_rows(Some(&p), &baseline_for(&p), RowFilter::default());
        assert_eq!(set.source, RowSource::Project);
        assert_eq!(set.rows.len(), 1);
        let row = &set.rows[0];
        assert_eq!(row.kind, RowKind::Project);
        assert_eq!(row.level, 0);
        assert_eq!(row.numbering, "");
        assert_eq!((row.start, row.end), (ymd(2025, 1, 1), ymd(2025, 12, 31)));
    }

    #[test]
    fn nested_hierarchy_is_numbered_depth_first() {
        let p = nested_project();
        let set = build_rows(Some(&p), &baseline_for(&p), RowFilter::default());
        let numbering: Vec<_> = set.rows.iter().map(|r| r.numbering.as_str()).collect();
        assert_eq!(numbering, vec!["", "1", "1.1", "1.1.1"]);
        let kinds: Vec<_> = set.rows.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![RowKind::Project, RowKind::Milestone, RowKind::Deliverable, RowKind::Task]
        );
        assert_eq!(set.rows[3].progress, 40);
        assert_eq!(set.rows[1].progress, 0);
        assert_eq!(set.rows[3].entity, Some(EntityPath::Task(0, 0, 0)));
    }

    #[test]
    fn undated_entities_inherit_project_span() {
        let p = nested_project();
        let set = build_rows(Some(&p), &baseline_for(&p), RowFilter::default());
        // Deliverable and task carry no dates
        assert_eq!((set.rows[2].start, set.rows[2].end), (ymd(2025, 1, 1), ymd(2025, 12, 31)));
        assert_eq!((set.rows[1].start, set.rows[1].end), (ymd(2025, 2, 1), ymd(2025, 3, 1)));
    }

    #[test]
    fn malformed_dates_are_treated_as_missing() {
        let mut p = nested_project();
        p.milestones[0].start = Some("02/01/2025".into());
        let set = build_rows(Some(&p), &baseline_for(&p), RowFilter::default());
        assert_eq!(set.rows[1].start, ymd(2025, 1, 1));
        assert_eq!(set.rows[1].end, ymd(2025, 3, 1));
    }

    #[test]
    fn numbering_is_stable_across_builds_and_ignores_filters() {
        let mut p = nested_project();
        p.milestones.push(p.milestones[0].clone());
        let b = baseline_for(&p);
        let first = build_rows(Some(&p), &b, RowFilter::default());
        let second = build_rows(Some(&p), &b, RowFilter::default());
        assert_eq!(first, second);

        let tasks_only = RowFilter {
            project: false,
            milestones: false,
            deliverables: false,
            tasks: true,
        };
        let set = build_rows(Some(&p), &b, tasks_only);
        let numbering: Vec<_> = set.rows.iter().map(|r| r.numbering.as_str()).collect();
        assert_eq!(numbering, vec!["1.1.1", "2.1.1"]);
    }

    #[test]
    fn hidden_deliverables_still_yield_their_tasks() {
        let p = nested_project();
        let filter = RowFilter {
            deliverables: false,
            ..Default::default()
        };
        let set = build_rows(Some(&p), &baseline_for(&p), filter);
        let kinds: Vec<_> = set.rows.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![RowKind::Project, RowKind::Milestone, RowKind::Task]);
    }

    #[test]
    fn untitled_entities_get_positional_titles() {
        let mut p = nested_project();
        p.name.clear();
        p.milestones[0].title = "  ".into();
        let set = build_rows(Some(&p), &baseline_for(&p), RowFilter::default());
        assert_eq!(set.rows[0].title, "Project");
        assert_eq!(set.rows[1].title, "Milestone 1");
    }

    #[test]
    fn progress_is_clamped() {
        let mut p = nested_project();
        p.milestones[0].deliverables[0].tasks[0].progress = 140;
        p.progress = Some(-5);
        let set = build_rows(Some(&p), &baseline_for(&p), RowFilter::default());
        assert_eq!(set.rows[3].progress, 100);
        assert_eq!(set.rows[0].progress, 0);
    }

    #[test]
    fn committed_dates_come_back_from_the_next_build() {
        let mut p = nested_project();
        let path = EntityPath::Task(0, 0, 0);
        assert!(commit_dates(&mut p, path, ymd(2025, 4, 3), ymd(2025, 4, 9)));
        let set = build_rows(Some(&p), &baseline_for(&p), RowFilter::default());
        let row = set.rows.iter().find(|r| r.entity == Some(path)).unwrap();
        assert_eq!((row.start, row.end), (ymd(2025, 4, 3), ymd(2025, 4, 9)));
        assert_eq!(p.dates_at(path), Some((Some("2025-04-03"), Some("2025-04-09"))));

        assert!(!commit_dates(&mut p, EntityPath::Milestone(7), ymd(2025, 1, 1), ymd(2025, 1, 2)));
    }

    #[test]
    fn no_project_falls_back_to_demo_rows() {
        let today = ymd(2026, 10, 18);
        let b = resolve_baseline(None, None, today, 10);
        let set = build_rows(None, &b, RowFilter::default());
        assert_eq!(set.source, RowSource::Demo);
        let titles: Vec<_> = set.rows.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Project", "M1", "D1.1", "T1.1.1"]);
        assert!(set.rows.iter().all(|r| r.entity.is_none()));
        assert!(set.rows.iter().all(|r| r.start == today && r.end == b.project_end));

        let no_tasks = RowFilter {
            tasks: false,
            ..Default::default()
        };
        assert_eq!(build_rows(None, &b, no_tasks).rows.len(), 3);
    }
}
