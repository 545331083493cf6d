use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl WorkDay {
    pub const ALL: [WorkDay; 5] =
        [Self::Monday, Self::Tuesday, Self::Wednesday, Self::Thursday, Self::Friday];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
        }
    }

    pub fn from_weekday(weekday: Weekday) -> Option<Self> {
        match weekday {
            Weekday::Mon => Some(Self::Monday),
            Weekday::Tue => Some(Self::Tuesday),
            Weekday::Wed => Some(Self::Wednesday),
            Weekday::Thu => Some(Self::Thursday),
            Weekday::Fri => Some(Self::Friday),
            Weekday::Sat | Weekday::Sun => None,
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Monday => 0,
            Self::Tuesday => 1,
            Self::Wednesday => 2,
            Self::Thursday => 3,
            Self::Friday => 4,
        }
    }

    /// Inclusive range in week order; reversed ranges are normalised.
    pub fn range(start: WorkDay, end: WorkDay) -> Vec<WorkDay> {
        let (low, high) = if start.index() <= end.index() {
            (start.index(), end.index())
        } else {
            (end.index(), start.index())
        };
        Self::ALL[low..=high].to_vec()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfficeStatus {
    Office,
    Home,
    Hybrid,
    Leave,
    Unknown,
}

impl OfficeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Office => "office",
            Self::Home => "home",
            Self::Hybrid => "hybrid",
            Self::Leave => "leave",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "office" | "wfo" | "onsite" | "in_office" => Self::Office,
            "home" | "wfh" | "remote" => Self::Home,
            "hybrid" => Self::Hybrid,
            "leave" | "off" | "pto" | "vacation" | "holiday" => Self::Leave,
            _ => Self::Unknown,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleScope {
    Weekly,
    Daily,
}

impl ScheduleScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Daily => "daily",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TargetPeriod {
    Week { start: NaiveDate },
    Day { date: NaiveDate },
}

impl TargetPeriod {
    pub fn scope(&self) -> ScheduleScope {
        match self {
            Self::Week { .. } => ScheduleScope::Weekly,
            Self::Day { .. } => ScheduleScope::Daily,
        }
    }

    pub fn week_start(&self) -> NaiveDate {
        match self {
            Self::Week { start } => *start,
            Self::Day { date } => {
                *date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
        }
    }

    pub fn topic(&self) -> String {
        match self {
            Self::Week { start } => format!("schedule:weekly:{start}"),
            Self::Day { date } => format!("schedule:daily:{date}"),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Week { start } => format!("the week of {}", start.format("%-d %B")),
            Self::Day { date } => date.format("%A %-d %B").to_string(),
        }
    }

    /// The single weekday a daily question is about.
    pub fn day(&self) -> Option<WorkDay> {
        match self {
            Self::Week { .. } => None,
            Self::Day { date } => WorkDay::from_weekday(date.weekday()),
        }
    }
}

/// Context stored while waiting for the user to describe their schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleQuestion {
    pub target_period: TargetPeriod,
    pub prompt: String,
}

impl ScheduleQuestion {
    pub fn scope(&self) -> ScheduleScope {
        self.target_period.scope()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OfficeScheduleCandidate {
    pub target_period: TargetPeriod,
    pub per_weekday_status: BTreeMap<WorkDay, OfficeStatus>,
    pub confidence: f64,
    pub source_text: String,
}

impl OfficeScheduleCandidate {
    pub fn unknown(target_period: TargetPeriod, source_text: impl Into<String>) -> Self {
        let per_weekday_status =
            WorkDay::ALL.iter().map(|day| (*day, OfficeStatus::Unknown)).collect();
        Self { target_period, per_weekday_status, confidence: 0.0, source_text: source_text.into() }
    }

    pub fn set(&mut self, day: WorkDay, status: OfficeStatus) {
        self.per_weekday_status.insert(day, status);
    }

    pub fn status(&self, day: WorkDay) -> OfficeStatus {
        self.per_weekday_status.get(&day).copied().unwrap_or(OfficeStatus::Unknown)
    }

    pub fn office_days_count(&self) -> usize {
        self.per_weekday_status.values().filter(|status| **status == OfficeStatus::Office).count()
    }

    pub fn known_days_count(&self) -> usize {
        self.per_weekday_status.values().filter(|status| **status != OfficeStatus::Unknown).count()
    }

    pub fn is_empty(&self) -> bool {
        self.known_days_count() == 0
    }

    pub fn is_compliant(&self, min_office_days: usize) -> bool {
        self.office_days_count() >= min_office_days
    }

    pub fn summary(&self) -> String {
        let known = WorkDay::ALL
            .iter()
            .filter(|day| self.status(**day) != OfficeStatus::Unknown)
            .map(|day| format!("{} {}", day.title(), self.status(*day).as_str()))
            .collect::<Vec<_>>();
        if known.is_empty() {
            return format!("nothing yet for {}", self.target_period.describe());
        }
        format!("{} ({})", known.join(", "), self.target_period.describe())
    }
}

/// Payload handed to the availability store once a schedule is confirmed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleSubmission {
    pub user_id: UserId,
    pub week_start_date: NaiveDate,
    pub statuses: BTreeMap<WorkDay, OfficeStatus>,
    pub office_days_count: usize,
    pub is_compliant: bool,
    pub collection_method: ScheduleScope,
    pub submitted_at: DateTime<Utc>,
}

impl ScheduleSubmission {
    pub fn from_candidate(
        user_id: UserId,
        candidate: &OfficeScheduleCandidate,
        min_office_days: usize,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            week_start_date: candidate.target_period.week_start(),
            statuses: candidate.per_weekday_status.clone(),
            office_days_count: candidate.office_days_count(),
            is_compliant: candidate.is_compliant(min_office_days),
            collection_method: candidate.target_period.scope(),
            submitted_at,
        }
    }
}
