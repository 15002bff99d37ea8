use chrono::NaiveDate;

use crate::model::Project;
use crate::util::dates;

/// The visible date span of a timeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Baseline {
    pub project_start: NaiveDate,
    pub project_end: NaiveDate,
    /// Date the view is scrolled to after a render
    pub view_start: NaiveDate,
}

impl Baseline {
    /// The view start clamped into the project span
    pub fn anchored_view_start(&self) -> NaiveDate {
        self.view_start.clamp(self.project_start, self.project_end)
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        d >= self.project_start && d <= self.project_end
    }
}

/// Resolve the span a project is drawn against.
///
/// Both project dates present and parseable → used verbatim. Otherwise the
/// span is `[today, today + default_years]`. An inverted project span is
/// collapsed onto its start day. `view_start` falls back to the span start.
pub fn resolve_baseline(
    project: Option<&Project>,
    view_start: Option<NaiveDate>,
    today: NaiveDate,
    default_years: u32,
) -> Baseline {
    let explicit = project.and_then(|p| {
        let start = dates::parse_opt(p.start.as_deref())?;
        let end = dates::parse_opt(p.end.as_deref())?;
        Some((start, end))
    });

    let (project_start, project_end) = match explicit {
        Some((start, end)) if end < start => {
            log::debug!(
                "project span {} > {} is inverted, collapsing to start day",
                dates::format(start),
                dates::format(end)
            );
            (start, start)
        }
        Some(span) => span,
        None => (today, dates::add_months(today, default_years.saturating_mul(12))),
    };

    Baseline {
        project_start,
        project_end,
        view_start: view_start.unwrap_or(project_start),
    }
}
