use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Host fields the timeline does not interpret (description, status, ids, ...).
/// Kept in source order so an upsert writes back what was loaded.
pub type Extra = IndexMap<String, serde_json::Value>;

/// A project as stored by the host application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub name: String,
    /// Start date, `YYYY-MM-DD`. Kept raw: malformed values are treated as missing.
    /// The host's REST records call it `startDate`.
    #[serde(default, alias = "startDate", skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, alias = "endDate", skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Milestone {
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default, alias = "startDate", skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, alias = "endDate", skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    #[serde(default)]
    pub deliverables: Vec<Deliverable>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Deliverable {
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default, alias = "startDate", skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, alias = "endDate", skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(flatten)]
    pub extra: Extra,
}

/// A leaf work item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Task {
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default, alias = "startDate", skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(default, alias = "endDate", skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// Percent complete, 0-100. Values outside the range are clamped on display.
    #[serde(default)]
    pub progress: i64,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Address of one entity inside a project's hierarchy.
///
/// Indices are zero-based; the display form is the row numbering path
/// (`""`, `"2"`, `"2.1"`, `"2.1.3"`), which is one-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "lowercase")]
pub enum EntityPath {
    Project,
    Milestone(usize),
    Deliverable(usize, usize),
    Task(usize, usize, usize),
}

impl EntityPath {
    /// The one-based numbering path for this entity (`""` for the project)
    pub fn numbering(self) -> String {
        match self {
            EntityPath::Project => String::new(),
            EntityPath::Milestone(m) => format!("{}", m + 1),
            EntityPath::Deliverable(m, d) => format!("{}.{}", m + 1, d + 1),
            EntityPath::Task(m, d, t) => format!("{}.{}.{}", m + 1, d + 1, t + 1),
        }
    }

    /// Parse a numbering path back into an entity address.
    /// Returns None for zero components or more than three levels.
    pub fn parse(s: &str) -> Option<EntityPath> {
        let s = s.trim();
        if s.is_empty() {
            return Some(EntityPath::Project);
        }
        let parts: Vec<usize> = s
            .split('.')
            .map(|p| p.parse::<usize>().ok().filter(|n| *n > 0).map(|n| n - 1))
            .collect::<Option<Vec<_>>>()?;
        match parts.as_slice() {
            [m] => Some(EntityPath::Milestone(*m)),
            [m, d] => Some(EntityPath::Deliverable(*m, *d)),
            [m, d, t] => Some(EntityPath::Task(*m, *d, *t)),
            _ => None,
        }
    }
}

/// Borrowed view of the date fields shared by every entity
pub struct DateFields<'a> {
    pub start: &'a mut Option<String>,
    pub end: &'a mut Option<String>,
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Project {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Raw start/end of the entity at `path`, if it exists
    pub fn dates_at(&self, path: EntityPath) -> Option<(Option<&str>, Option<&str>)> {
        fn pair<'a>(
            s: &'a Option<String>,
            e: &'a Option<String>,
        ) -> (Option<&'a str>, Option<&'a str>) {
            (s.as_deref(), e.as_deref())
        }
        match path {
            EntityPath::Project => Some(pair(&self.start, &self.end)),
            EntityPath::Milestone(m) => {
                let ms = self.milestones.get(m)?;
                Some(pair(&ms.start, &ms.end))
            }
            EntityPath::Deliverable(m, d) => {
                let dl = self.milestones.get(m)?.deliverables.get(d)?;
                Some(pair(&dl.start, &dl.end))
            }
            EntityPath::Task(m, d, t) => {
                let task = self.milestones.get(m)?.deliverables.get(d)?.tasks.get(t)?;
                Some(pair(&task.start, &task.end))
            }
        }
    }

    /// Mutable access to the date fields of the entity at `path`
    pub fn dates_at_mut(&mut self, path: EntityPath) -> Option<DateFields<'_>> {
        match path {
            EntityPath::Project => Some(DateFields {
                start: &mut self.start,
                end: &mut self.end,
            }),
            EntityPath::Milestone(m) => {
                let ms = self.milestones.get_mut(m)?;
                Some(DateFields {
                    start: &mut ms.start,
                    end: &mut ms.end,
                })
            }
            EntityPath::Deliverable(m, d) => {
                let dl = self.milestones.get_mut(m)?.deliverables.get_mut(d)?;
                Some(DateFields {
                    start: &mut dl.start,
                    end: &mut dl.end,
                })
            }
            EntityPath::Task(m, d, t) => {
                let task = self
                    .milestones
                    .get_mut(m)?
                    .deliverables
                    .get_mut(d)?
                    .tasks
                    .get_mut(t)?;
                Some(DateFields {
                    start: &mut task.start,
                    end: &mut task.end,
                })
            }
        }
    }

    /// Title of the entity at `path`, if it exists
    pub fn title_at(&self, path: EntityPath) -> Option<&str> {
        match path {
            EntityPath::Project => Some(&self.name),
            EntityPath::Milestone(m) => self.milestones.get(m).map(|ms| ms.title.as_str()),
            EntityPath::Deliverable(m, d) => self
                .milestones
                .get(m)?
                .deliverables
                .get(d)
                .map(|dl| dl.title.as_str()),
            EntityPath::Task(m, d, t) => self
                .milestones
                .get(m)?
                .deliverables
                .get(d)?
                .tasks
                .get(t)
                .map(|task| task.title.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const HOST_JSON: &str = r#"{
        "id": "p-1",
        "name": "Infrastructure Upgrade",
        "description": "Upgrade company infrastructure",
        "start": "2025-01-01",
        "end": "2025-06-30",
        "milestones": [
            {
                "name": "Design",
                "start": "2025-01-01",
                "end": "2025-02-15",
                "deliverables": [
                    {
                        "title": "Network plan",
                        "tasks": [
                            { "title": "Survey racks", "start": "2025-01-02", "end": "2025-01-09", "progress": 40, "owner": "lead" }
                        ]
                    }
                ]
            }
        ]
    }"#;

    #[test]
    fn parses_host_json_with_aliases_and_extra_fields() {
        let project: Project = serde_json::from_str(HOST_JSON).unwrap();
        assert_eq!(project.name, "Infrastructure Upgrade");
        assert_eq!(project.milestones[0].title, "Design");
        let task = &project.milestones[0].deliverables[0].tasks[0];
        assert_eq!(task.progress, 40);
        assert_eq!(task.extra.get("owner"), Some(&serde_json::json!("lead")));
        assert_eq!(
            project.extra.keys().collect::<Vec<_>>(),
            vec!["id", "description"]
        );
    }

    #[test]
    fn unknown_fields_survive_serialization() {
        let project: Project = serde_json::from_str(HOST_JSON).unwrap();
        let text = serde_json::to_string(&project).unwrap();
        let again: Project = serde_json::from_str(&text).unwrap();
        assert_eq!(again, project);
        assert!(text.contains("\"description\""));
        assert!(text.contains("\"owner\""));
    }

    #[test]
    fn entity_path_numbering_and_parse() {
        assert_eq!(EntityPath::Project.numbering(), "");
        assert_eq!(EntityPath::Milestone(1).numbering(), "2");
        assert_eq!(EntityPath::Deliverable(1, 0).numbering(), "2.1");
        assert_eq!(EntityPath::Task(1, 0, 2).numbering(), "2.1.3");

        assert_eq!(EntityPath::parse(""), Some(EntityPath::Project));
        assert_eq!(EntityPath::parse("2.1.3"), Some(EntityPath::Task(1, 0, 2)));
        assert_eq!(EntityPath::parse("0"), None);
        assert_eq!(EntityPath::parse("1.x"), None);
        assert_eq!(EntityPath::parse("1.1.1.1"), None);
    }

    #[test]
    fn dates_at_mut_reaches_nested_entities() {
        let mut project: Project = serde_json::from_str(HOST_JSON).unwrap();
        let path = EntityPath::Task(0, 0, 0);
        {
            let fields = project.dates_at_mut(path).unwrap();
            *fields.start = Some("2025-01-05".into());
        }
        assert_eq!(
            project.dates_at(path),
            Some((Some("2025-01-05"), Some("2025-01-09")))
        );
        assert!(project.dates_at_mut(EntityPath::Task(0, 0, 5)).is_none());
        assert_eq!(project.title_at(EntityPath::Deliverable(0, 0)), Some("Network plan"));
    }

    #[test]
    fn dates_at_reads_every_level() {
        let project: Project = serde_json::from_str(HOST_JSON).unwrap();
        assert_eq!(
            project.dates_at(EntityPath::Project),
            Some((Some("2025-01-01"), Some("2025-06-30")))
        );
        assert_eq!(
            project.dates_at(EntityPath::Milestone(0)),
            Some((Some("2025-01-01"), Some("2025-02-15")))
        );
        assert_eq!(project.dates_at(EntityPath::Deliverable(0, 0)), Some((None, None)));
        assert_eq!(
            project.dates_at(EntityPath::Task(0, 0, 0)),
            Some((Some("2025-01-02"), Some("2025-01-09")))
        );
        assert_eq!(project.dates_at(EntityPath::Milestone(3)), None);
    }
}
