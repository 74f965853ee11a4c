//! Date and path helpers for rendering project pages.
//!
//! Front-matter dates are written without a zone and mean UTC, so every
//! formatted date is rendered in UTC regardless of the host's local zone.

use std::fmt::Write;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::error::FormatError;

static PROJECT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.\./projects/(.*)\.md$").expect("project path pattern is valid")
});

/// A date given either as a timestamp or as text.
#[derive(Debug, Clone, Copy)]
pub enum DateInput<'a> {
    Date(DateTime<Utc>),
    Text(&'a str),
}

impl From<DateTime<Utc>> for DateInput<'_> {
    fn from(date: DateTime<Utc>) -> Self {
        DateInput::Date(date)
    }
}

impl<'a> From<&'a str> for DateInput<'a> {
    fn from(text: &'a str) -> Self {
        DateInput::Text(text)
    }
}

impl DateInput<'_> {
    fn resolve(self) -> Result<DateTime<Utc>, FormatError> {
        match self {
            DateInput::Date(date) => Ok(date),
            DateInput::Text(text) => parse_date(text),
        }
    }
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD` (midnight UTC).
fn parse_date(text: &str) -> Result<DateTime<Utc>, FormatError> {
    let text = text.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Ok(date.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
        return Ok(date.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date| date.and_utc())
        .ok_or_else(|| FormatError::InvalidDate(text.to_string()))
}

/// Render `date` with the strftime `format`, in UTC.
pub fn format_time<'a>(format: &str, date: impl Into<DateInput<'a>>) -> Result<String, FormatError> {
    let date = date.into().resolve()?;
    let mut out = String::new();
    write!(out, "{}", date.format(format))
        .map_err(|_| FormatError::InvalidFormat(format.to_string()))?;
    Ok(out)
}

/// Extract the project name from a `../projects/<name>.md` module path.
pub fn trim_name(id: &str) -> Option<&str> {
    PROJECT_PATH
        .captures(id)
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formats_plain_dates_as_utc_midnight() {
        assert_eq!(format_time("%B %-d, %Y", "2023-06-04").unwrap(), "June 4, 2023");
        assert_eq!(format_time("%H:%M", "2023-06-04").unwrap(), "00:00");
    }

    #[test]
    fn converts_offsets_to_utc() {
        let formatted = format_time("%Y-%m-%d %H:%M", "2023-06-04T23:30:00-02:00").unwrap();
        assert_eq!(formatted, "2023-06-05 01:30");
    }

    #[test]
    fn accepts_timestamps() {
        let date = Utc.with_ymd_and_hms(2021, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(format_time("%Y/%m/%d %T", date).unwrap(), "2021/01/02 03:04:05");
        assert_eq!(
            format_time("%b %Y", "2021-01-02 03:04:05").unwrap(),
            "Jan 2021"
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(matches!(
            format_time("%Y", "last tuesday"),
            Err(FormatError::InvalidDate(_))
        ));
        assert!(matches!(
            format_time("%Q", "2023-06-04"),
            Err(FormatError::InvalidFormat(_))
        ));
    }

    #[test]
    fn trims_project_paths() {
        assert_eq!(trim_name("../projects/folio.md"), Some("folio"));
        assert_eq!(trim_name("../projects/2024/notes.md"), Some("2024/notes"));
        assert_eq!(trim_name("../posts/folio.md"), None);
        assert_eq!(trim_name("../projects/folio.mdx"), None);
    }
}
