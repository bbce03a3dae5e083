//! Promotion and badge validity.
//!
//! All callers (menu listing, order pricing) evaluate promotions through
//! [`is_valid_at`] against the restaurant's local wall-clock time.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::entities::promotion::{self, ValidityType};

/// The subset of a promotion that decides whether it applies at a moment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidityRule {
    pub is_active: bool,
    pub validity_type: ValidityType,
    pub valid_from: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub time_from: Option<NaiveTime>,
    pub time_until: Option<NaiveTime>,
    /// ISO weekdays, 1 = Monday. `None` or empty means every day.
    pub weekdays: Option<Vec<u8>>,
}

impl From<&promotion::Model> for ValidityRule {
    fn from(model: &promotion::Model) -> Self {
        Self {
            is_active: model.is_active,
            validity_type: model.validity_type,
            valid_from: model.valid_from,
            valid_until: model.valid_until,
            time_from: model.time_from,
            time_until: model.time_until,
            weekdays: model.weekday_set(),
        }
    }
}

/// Converts a UTC instant into a restaurant's local wall-clock time.
pub fn local_now(utc_offset_minutes: i32, now: DateTime<Utc>) -> NaiveDateTime {
    (now + Duration::minutes(i64::from(utc_offset_minutes))).naive_utc()
}

/// Whether `time` falls in `[from, until]`. A window with `from > until`
/// spans midnight.
pub fn time_in_window(time: NaiveTime, from: NaiveTime, until: NaiveTime) -> bool {
    if from <= until {
        from <= time && time <= until
    } else {
        time >= from || time <= until
    }
}

pub fn is_valid_at(rule: &ValidityRule, local: NaiveDateTime) -> bool {
    if !rule.is_active {
        return false;
    }
    if rule.validity_type == ValidityType::Permanent {
        return true;
    }

    let date = local.date();
    if rule.valid_from.is_some_and(|from| date < from) {
        return false;
    }
    if rule.valid_until.is_some_and(|until| date > until) {
        return false;
    }

    if let (Some(from), Some(until)) = (rule.time_from, rule.time_until) {
        if !time_in_window(local.time(), from, until) {
            return false;
        }
    }

    match rule.weekdays.as_deref() {
        Some(days) if !days.is_empty() => {
            let today = local.weekday().number_from_monday() as u8;
            days.contains(&today)
        }
        _ => true,
    }
}

pub fn is_valid_now(model: &promotion::Model, utc_offset_minutes: i32, now: DateTime<Utc>) -> bool {
    is_valid_at(&ValidityRule::from(model), local_now(utc_offset_minutes, now))
}

/// A scheduled badge shows from `starts_at` up to and including `ends_at`.
pub fn badge_active_at(
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    starts_at <= now && ends_at.map_or(true, |end| now <= end)
}
