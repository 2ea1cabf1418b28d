//! Per-teacher weekly availability with one-off date overrides.
//!
//! A teacher publishes recurring weekly windows ("Mondays 09:00-17:00") and may add
//! one-off rules scoped to a single calendar date. For a given date the one-off rules,
//! if any exist, replace the recurring rules for that weekday outright; this is how a
//! teacher blocks or adds hours for one day. Several rules on the same day are unioned.
//!
//! Rules are written in the teacher's local wall-clock time. Queries take absolute
//! instants and convert them into the teacher's zone before matching.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::interval::{merge_windows, TimeInterval, WallTime};
use crate::timezone::{day_of_week, to_local};

/// How much of a candidate lesson must fall inside the teacher's published hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainmentPolicy {
    /// Only the start instant is matched; a lesson may run past the window end.
    StartOnly,
    /// The whole lesson must fit inside one contiguous window on a single local date.
    #[default]
    FullInterval,
}

/// One availability window for a teacher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyAvailabilityRule {
    pub id: String,
    pub teacher_id: String,
    /// 0 = Sunday .. 6 = Saturday.
    pub day_of_week: u8,
    pub start_time: WallTime,
    pub end_time: WallTime,
    #[serde(default = "default_recurring")]
    pub recurring: bool,
    /// Required when `recurring` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_date: Option<NaiveDate>,
}

fn default_recurring() -> bool {
    true
}

impl WeeklyAvailabilityRule {
    pub fn recurring(
        id: impl Into<String>,
        teacher_id: impl Into<String>,
        day_of_week: u8,
        start_time: WallTime,
        end_time: WallTime,
    ) -> Result<Self, ValidationError> {
        let rule = Self {
            id: id.into(),
            teacher_id: teacher_id.into(),
            day_of_week,
            start_time,
            end_time,
            recurring: true,
            specific_date: None,
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn one_off(
        id: impl Into<String>,
        teacher_id: impl Into<String>,
        date: NaiveDate,
        start_time: WallTime,
        end_time: WallTime,
    ) -> Result<Self, ValidationError> {
        let rule = Self {
            id: id.into(),
            teacher_id: teacher_id.into(),
            day_of_week: day_of_week(date),
            start_time,
            end_time,
            recurring: false,
            specific_date: Some(date),
        };
        rule.validate()?;
        Ok(rule)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.day_of_week > 6 {
            return Err(ValidationError::InvalidDayOfWeek(self.day_of_week));
        }
        if self.start_time >= self.end_time {
            return Err(ValidationError::EmptyWindow {
                start: self.start_time.to_string(),
                end: self.end_time.to_string(),
            });
        }
        if !self.recurring {
            let date = self
                .specific_date
                .ok_or(ValidationError::MissingSpecificDate)?;
            let actual = day_of_week(date);
            if actual != self.day_of_week {
                return Err(ValidationError::DateWeekdayMismatch {
                    date: date.to_string(),
                    expected: self.day_of_week,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Whether `time` lies in `[start_time, end_time)`.
    pub fn contains(&self, time: WallTime) -> bool {
        self.start_time <= time && time < self.end_time
    }

    fn applies_to_override(&self, date: NaiveDate) -> bool {
        !self.recurring && self.specific_date == Some(date)
    }

    fn applies_to_weekday(&self, weekday: u8) -> bool {
        self.recurring && self.day_of_week == weekday
    }
}

#[derive(Debug, Clone)]
struct TeacherSchedule {
    timezone: Tz,
    rules: Vec<WeeklyAvailabilityRule>,
}

impl TeacherSchedule {
    fn new(timezone: Tz) -> Self {
        Self {
            timezone,
            rules: Vec::new(),
        }
    }
}

/// Availability rules for many teachers, keyed by teacher id.
#[derive(Debug, Clone, Default)]
pub struct AvailabilityIndex {
    schedules: HashMap<String, TeacherSchedule>,
}

impl AvailabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index holding a single teacher's schedule.
    pub fn with_schedule(
        teacher_id: &str,
        timezone: Tz,
        rules: impl IntoIterator<Item = WeeklyAvailabilityRule>,
    ) -> Result<Self, ValidationError> {
        let mut index = Self::new();
        index.set_timezone(teacher_id, timezone);
        for rule in rules {
            index.insert_rule(rule)?;
        }
        Ok(index)
    }

    /// Set the zone the teacher's rules are written in. Existing rules are kept.
    pub fn set_timezone(&mut self, teacher_id: &str, timezone: Tz) {
        self.schedules
            .entry(teacher_id.to_string())
            .and_modify(|s| s.timezone = timezone)
            .or_insert_with(|| TeacherSchedule::new(timezone));
    }

    pub fn timezone(&self, teacher_id: &str) -> Option<Tz> {
        self.schedules.get(teacher_id).map(|s| s.timezone)
    }

    /// Insert or replace (by id) a rule. Teachers without a zone default to UTC.
    pub fn insert_rule(&mut self, rule: WeeklyAvailabilityRule) -> Result<(), ValidationError> {
        rule.validate()?;
        let schedule = self
            .schedules
            .entry(rule.teacher_id.clone())
            .or_insert_with(|| TeacherSchedule::new(Tz::UTC));
        match schedule.rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => schedule.rules.push(rule),
        }
        Ok(())
    }

    pub fn remove_rule(
        &mut self,
        teacher_id: &str,
        rule_id: &str,
    ) -> Option<WeeklyAvailabilityRule> {
        let schedule = self.schedules.get_mut(teacher_id)?;
        let pos = schedule.rules.iter().position(|r| r.id == rule_id)?;
        Some(schedule.rules.remove(pos))
    }

    pub fn rule(&self, teacher_id: &str, rule_id: &str) -> Option<&WeeklyAvailabilityRule> {
        self.schedules
            .get(teacher_id)?
            .rules
            .iter()
            .find(|r| r.id == rule_id)
    }

    pub fn all_rules(&self, teacher_id: &str) -> &[WeeklyAvailabilityRule] {
        self.schedules
            .get(teacher_id)
            .map(|s| s.rules.as_slice())
            .unwrap_or(&[])
    }

    /// Every rule (recurring or one-off) on the given weekday.
    pub fn rules_for(&self, teacher_id: &str, day_of_week: u8) -> Vec<&WeeklyAvailabilityRule> {
        self.all_rules(teacher_id)
            .iter()
            .filter(|r| r.day_of_week == day_of_week)
            .collect()
    }

    /// The effective windows on a teacher-local date, merged and sorted.
    ///
    /// One-off rules for `date` win outright; otherwise the recurring rules for its
    /// weekday apply.
    pub fn windows_on(&self, teacher_id: &str, date: NaiveDate) -> Vec<(WallTime, WallTime)> {
        let rules = self.all_rules(teacher_id);
        let overrides: Vec<(WallTime, WallTime)> = rules
            .iter()
            .filter(|r| r.applies_to_override(date))
            .map(|r| (r.start_time, r.end_time))
            .collect();
        if !overrides.is_empty() {
            return merge_windows(&overrides);
        }
        let weekday = day_of_week(date);
        let recurring: Vec<(WallTime, WallTime)> = rules
            .iter()
            .filter(|r| r.applies_to_weekday(weekday))
            .map(|r| (r.start_time, r.end_time))
            .collect();
        merge_windows(&recurring)
    }

    /// Whether the teacher is nominally open at `instant`.
    ///
    /// Unknown teachers are never available.
    pub fn is_available(&self, teacher_id: &str, instant: DateTime<Utc>) -> bool {
        let Some(tz) = self.timezone(teacher_id) else {
            return false;
        };
        let local = to_local(instant, tz);
        let time = WallTime::from_naive(local.time());
        self.windows_on(teacher_id, local.date())
            .iter()
            .any(|&(start, end)| start <= time && time < end)
    }

    /// Whether `interval` satisfies the teacher's published hours under `policy`.
    pub fn covers(
        &self,
        teacher_id: &str,
        interval: &TimeInterval,
        policy: ContainmentPolicy,
    ) -> bool {
        match policy {
            ContainmentPolicy::StartOnly => self.is_available(teacher_id, interval.start()),
            ContainmentPolicy::FullInterval => self.contains_interval(teacher_id, interval),
        }
    }

    fn contains_interval(&self, teacher_id: &str, interval: &TimeInterval) -> bool {
        let Some(tz) = self.timezone(teacher_id) else {
            return false;
        };
        let local_start = to_local(interval.start(), tz);
        // The last minute the lesson occupies must share the start's local date. After a
        // fall-back transition it can read earlier than the start, so both ends are checked.
        let local_last = to_local(interval.end() - Duration::minutes(1), tz);
        if local_last.date() != local_start.date() {
            return false;
        }
        let start = WallTime::from_naive(local_start.time());
        let last = WallTime::from_naive(local_last.time());
        self.windows_on(teacher_id, local_start.date())
            .iter()
            .any(|&(w_start, w_end)| w_start <= start && start < w_end && last < w_end)
    }
}
