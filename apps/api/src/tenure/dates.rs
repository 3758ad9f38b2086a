use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Strict formats tried first, in order.
const PRIMARY_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// Formats tried by the generic fallback after the localized long form.
const FALLBACK_DATE_FORMATS: &[&str] = &["%d-%m-%Y", "%Y/%m/%d", "%d.%m.%Y", "%Y%m%d"];
const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
];

/// End-date values that mean "still working here" rather than a date.
const TO_DATE_MARKERS: &[&str] = &["a la fecha", "actualidad", "hasta la actualidad", "to date"];

const MONTHS_ES: &[(&str, u32)] = &[
    ("enero", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("septiembre", 9),
    ("setiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
];

const WEEKDAYS_ES: &[&str] = &[
    "lunes", "martes", "miercoles", "miércoles", "jueves", "viernes", "sabado", "sábado",
    "domingo",
];

/// Parses the date shapes the backend and the UI produce.
///
/// Accepted: `YYYY-MM-DD`, `DD/MM/YYYY`, the Spanish long form
/// (`12 de enero de 2024`, optionally prefixed by a weekday), then a generic
/// fallback over a few more numeric and datetime layouts. Returns `None` when
/// nothing matches; callers treat that as a missing date.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    PRIMARY_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .or_else(|| parse_spanish_long(raw))
        .or_else(|| parse_generic(raw))
}

/// Exact (case-insensitive) match against the "to date" markers.
pub fn is_to_date_marker(raw: &str) -> bool {
    let lowered = raw.trim().to_lowercase();
    TO_DATE_MARKERS.iter().any(|m| *m == lowered)
}

fn parse_spanish_long(raw: &str) -> Option<NaiveDate> {
    let lowered = raw.to_lowercase().replace(',', " ");
    let mut tokens: Vec<&str> = lowered
        .split_whitespace()
        .filter(|t| *t != "de" && *t != "del")
        .collect();

    if tokens.first().is_some_and(|t| WEEKDAYS_ES.contains(t)) {
        tokens.remove(0);
    }

    let [day, month, year] = tokens.as_slice() else {
        return None;
    };

    let day: u32 = day.parse().ok()?;
    let month = MONTHS_ES
        .iter()
        .find(|(name, _)| name == month)
        .map(|(_, number)| *number)?;
    let year: i32 = year.parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_generic(raw: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    FALLBACK_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| {
            FALLBACK_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        })
}
