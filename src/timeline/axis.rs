use std::fmt;
use std::ops::Range;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::util::dates;

/// One of the five time resolutions of the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Year,
    Quarter,
    Month,
    Week,
    Day,
}

impl Granularity {
    /// Coarsest first, which is also header row order
    pub const ALL: [Granularity; 5] = [
        Granularity::Year,
        Granularity::Quarter,
        Granularity::Month,
        Granularity::Week,
        Granularity::Day,
    ];

    /// Start of the unit containing `d`
    pub fn unit_start(self, d: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Year => dates::year_start(d),
            Granularity::Quarter => dates::quarter_start(d),
            Granularity::Month => dates::month_start(d),
            Granularity::Week => dates::week_start(d),
            Granularity::Day => d,
        }
    }

    /// Start of the unit after the one anchored at `anchor`
    pub fn next_start(self, anchor: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Year => dates::add_months(dates::year_start(anchor), 12),
            Granularity::Quarter => dates::add_months(dates::quarter_start(anchor), 3),
            Granularity::Month => dates::add_months(dates::month_start(anchor), 1),
            Granularity::Week => dates::add_days(dates::week_start(anchor), 7),
            Granularity::Day => dates::add_days(anchor, 1),
        }
    }

    /// Stable key derived from a unit's anchor date
    pub fn key(self, anchor: NaiveDate) -> String {
        match self {
            Granularity::Year => format!("year-{}", anchor.year()),
            Granularity::Quarter => {
                format!("quarter-{}-{}", anchor.year(), dates::quarter_of(anchor))
            }
            Granularity::Month => format!("month-{}-{:02}", anchor.year(), anchor.month()),
            Granularity::Week => format!("week-{}", dates::format(anchor)),
            Granularity::Day => format!("day-{}", dates::format(anchor)),
        }
    }

    /// Snap `d` to the nearest unit boundary. Ties go to the earlier boundary.
    pub fn snap(self, d: NaiveDate) -> NaiveDate {
        let start = self.unit_start(d);
        let next = self.next_start(start);
        if dates::days_between(start, d) <= dates::days_between(d, next) {
            start
        } else {
            next
        }
    }

    /// Plural name used in header descriptions and QA messages
    pub fn plural(self) -> &'static str {
        match self {
            Granularity::Year => "Years",
            Granularity::Quarter => "Quarters",
            Granularity::Month => "Months",
            Granularity::Week => "Weeks",
            Granularity::Day => "Days",
        }
    }

    pub fn parse(s: &str) -> Option<Granularity> {
        match s.to_ascii_lowercase().as_str() {
            "year" | "years" | "y" => Some(Granularity::Year),
            "quarter" | "quarters" | "q" => Some(Granularity::Quarter),
            "month" | "months" | "m" => Some(Granularity::Month),
            "week" | "weeks" | "w" => Some(Granularity::Week),
            "day" | "days" | "d" => Some(Granularity::Day),
            _ => None,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Granularity::Year => "year",
            Granularity::Quarter => "quarter",
            Granularity::Month => "month",
            Granularity::Week => "week",
            Granularity::Day => "day",
        };
        write!(f, "{}", s)
    }
}

/// One cell of a time axis
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeUnit {
    pub granularity: Granularity,
    pub label: String,
    /// Anchor date (Jan 1, quarter/month start, Monday, or the day itself).
    /// May precede the span start for the first unit.
    pub anchor: NaiveDate,
    pub key: String,
    /// Indices of the day columns this unit covers
    pub days: Range<usize>,
}

impl TimeUnit {
    pub fn day_count(&self) -> usize {
        self.days.len()
    }
}

/// The five aligned unit sequences for a span
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Axis {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub years: Vec<TimeUnit>,
    pub quarters: Vec<TimeUnit>,
    pub months: Vec<TimeUnit>,
    pub weeks: Vec<TimeUnit>,
    pub days: Vec<TimeUnit>,
}

impl Axis {
    /// Generate all five sequences for `[start, end]` inclusive.
    /// An inverted span yields empty sequences.
    pub fn generate(start: NaiveDate, end: NaiveDate) -> Axis {
        Axis {
            start,
            end,
            years: generate_units(Granularity::Year, start, end),
            quarters: generate_units(Granularity::Quarter, start, end),
            months: generate_units(Granularity::Month, start, end),
            weeks: generate_units(Granularity::Week, start, end),
            days: generate_units(Granularity::Day, start, end),
        }
    }

    pub fn units(&self, g: Granularity) -> &[TimeUnit] {
        match g {
            Granularity::Year => &self.years,
            Granularity::Quarter => &self.quarters,
            Granularity::Month => &self.months,
            Granularity::Week => &self.weeks,
            Granularity::Day => &self.days,
        }
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }

    /// Index of the day column for `d`, if inside the span
    pub fn day_index(&self, d: NaiveDate) -> Option<usize> {
        if d < self.start || d > self.end {
            return None;
        }
        usize::try_from(dates::days_between(self.start, d)).ok()
    }

    /// Index of the day column for `d`, clamped into the span.
    /// Returns None only for an empty axis.
    pub fn clamped_day_index(&self, d: NaiveDate) -> Option<usize> {
        if self.days.is_empty() {
            return None;
        }
        self.day_index(d.clamp(self.start, self.end))
    }

    /// Date of day column `idx`
    pub fn day_date(&self, idx: usize) -> Option<NaiveDate> {
        self.days.get(idx).map(|u| u.anchor)
    }

    /// Index of the unit of granularity `g` covering day column `day`
    pub fn unit_index_for_day(&self, g: Granularity, day: usize) -> Option<usize> {
        let units = self.units(g);
        let idx = units.partition_point(|u| u.days.end <= day);
        units.get(idx).filter(|u| u.days.contains(&day)).map(|_| idx)
    }
}

/// One pass over the span: each unit records the contiguous range of day
/// indices it covers, so coverage never needs a per-unit scan of all days.
fn generate_units(g: Granularity, start: NaiveDate, end: NaiveDate) -> Vec<TimeUnit> {
    let mut units = Vec::new();
    if end < start {
        return units;
    }

    let mut anchor = g.unit_start(start);
    let mut ordinal = 1usize;
    while anchor <= end {
        let next = g.next_start(anchor);
        let first = anchor.max(start);
        let last = dates::add_days(next, -1).min(end);
        let from = dates::days_between(start, first) as usize;
        let to = dates::days_between(start, last) as usize + 1;

        units.push(TimeUnit {
            granularity: g,
            label: unit_label(g, anchor, ordinal),
            anchor,
            key: g.key(anchor),
            days: from..to,
        });

        if next <= anchor {
            // Calendar overflow at NaiveDate::MAX
            break;
        }
        anchor = next;
        ordinal += 1;
    }
    units
}

fn unit_label(g: Granularity, anchor: NaiveDate, ordinal: usize) -> String {
    match g {
        Granularity::Year => anchor.year().to_string(),
        Granularity::Quarter => format!("Q{}", dates::quarter_of(anchor)),
        Granularity::Month => dates::MONTH_NAMES[anchor.month0() as usize].to_string(),
        Granularity::Week => format!("W{}", ordinal),
        Granularity::Day => format!("{:02}", anchor.day()),
    }
}
