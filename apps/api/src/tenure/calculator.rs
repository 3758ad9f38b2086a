use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::cv::ExperienceEntry;
use crate::tenure::dates::{is_to_date_marker, parse_date};

const DAYS_PER_YEAR: u64 = 365;
const DAYS_PER_MONTH: u64 = 30;

/// Aggregated tenure as shown to the candidate.
///
/// The years/months/days triple is a calendar-naive split of `total_days`
/// (365-day years, 30-day months), not calendar arithmetic. Display text
/// downstream depends on exactly this approximation.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tenure {
    pub years: u64,
    pub months: u64,
    pub days: u64,
    pub total_days: u64,
}

impl Tenure {
    /// Naive split of `total_days`. `days` is the remainder inside the last
    /// partial year, `(total % 365) % 30`, not `total % 30`, so that
    /// `years * 365 + months * 30 + days <= total_days` always holds.
    pub fn from_days(total_days: u64) -> Self {
        let within_year = total_days % DAYS_PER_YEAR;
        Self {
            years: total_days / DAYS_PER_YEAR,
            months: within_year / DAYS_PER_MONTH,
            days: within_year % DAYS_PER_MONTH,
            total_days,
        }
    }

    /// Spanish label, e.g. "1 año, 2 meses, 5 días".
    pub fn label(&self) -> String {
        fn unit(n: u64, one: &str, many: &str) -> String {
            format!("{n} {}", if n == 1 { one } else { many })
        }
        format!(
            "{}, {}, {}",
            unit(self.years, "año", "años"),
            unit(self.months, "mes", "meses"),
            unit(self.days, "día", "días")
        )
    }
}

/// Why an entry did not count towards tenure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Exclusion {
    MissingStart,
    /// Finished position whose end date is absent or unparseable.
    MissingEnd,
    EndBeforeStart,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntryTenure {
    pub entry_id: Uuid,
    pub is_specific: bool,
    pub days: u64,
    pub exclusion: Option<Exclusion>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TenureReport {
    pub general: Tenure,
    pub specific: Tenure,
    pub combined: Tenure,
    pub entries: Vec<EntryTenure>,
    pub as_of: NaiveDate,
}

/// Whether the entry runs up to "now": either the cessation reason says so or
/// the end field carries a "to date" marker instead of a date.
pub fn is_ongoing(entry: &ExperienceEntry) -> bool {
    entry.cessation_reason.is_ongoing()
        || entry.end_date.as_deref().is_some_and(is_to_date_marker)
}

/// Inclusive day count for one entry, or the reason it is excluded.
///
/// Ongoing entries always run to `today`, ignoring any stored end date.
pub fn entry_days(entry: &ExperienceEntry, today: NaiveDate) -> Result<u64, Exclusion> {
    let start = entry
        .start_date
        .as_deref()
        .and_then(parse_date)
        .ok_or(Exclusion::MissingStart)?;

    let end = if is_ongoing(entry) {
        today
    } else {
        entry
            .end_date
            .as_deref()
            .and_then(parse_date)
            .ok_or(Exclusion::MissingEnd)?
    };

    if end < start {
        return Err(Exclusion::EndBeforeStart);
    }
    Ok((end - start).num_days() as u64 + 1)
}

/// Splits entries into general/specific buckets and sums their tenure as of `today`.
///
/// Invalid ranges contribute zero and are reported per entry; they never abort
/// the computation. Pure: identical inputs give identical reports.
pub fn compute_tenure(entries: &[ExperienceEntry], today: NaiveDate) -> TenureReport {
    let mut general_days = 0u64;
    let mut specific_days = 0u64;

    let breakdown = entries
        .iter()
        .map(|entry| {
            let (days, exclusion) = match entry_days(entry, today) {
                Ok(days) => (days, None),
                Err(reason) => (0, Some(reason)),
            };
            if entry.is_specific {
                specific_days += days;
            } else {
                general_days += days;
            }
            EntryTenure {
                entry_id: entry.id,
                is_specific: entry.is_specific,
                days,
                exclusion,
            }
        })
        .collect();

    TenureReport {
        general: Tenure::from_days(general_days),
        specific: Tenure::from_days(specific_days),
        combined: Tenure::from_days(general_days + specific_days),
        entries: breakdown,
        as_of: today,
    }
}

/// `compute_tenure` evaluated against today's UTC date.
pub fn compute_tenure_now(entries: &[ExperienceEntry]) -> TenureReport {
    compute_tenure(entries, Utc::now().date_naive())
}
