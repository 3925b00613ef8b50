use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IngestError;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parse the date shapes legislative APIs hand out. Times without an offset
/// are taken as UTC; date-only values land at midnight UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, IngestError> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Ok(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
        }
    }

    Err(IngestError::invalid(format!("unparseable date '{raw}'")))
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, IngestError> {
    parse_timestamp(raw).map(|ts| ts.date_naive())
}

/// Inclusive range of publication days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, IngestError> {
        if start > end {
            return Err(IngestError::configuration(format!(
                "date range start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// `end` defaults to today.
    pub fn parse(start: &str, end: Option<&str>) -> Result<Self, IngestError> {
        let start = parse_date(start).map_err(|e| IngestError::configuration(e.to_string()))?;
        let end = match end {
            Some(end) => parse_date(end).map_err(|e| IngestError::configuration(e.to_string()))?,
            None => Utc::now().date_naive(),
        };
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn accepts_api_date_shapes() {
        let expected = day(2024, 1, 15);
        for raw in [
            "2024-01-15",
            "15/01/2024",
            "15-01-2024",
            "2024-01-15T10:30:00",
            "2024-01-15T10:30:00Z",
            "2024-01-15 10:30:00",
            "2024-01-15T10:30",
            "2024-01-15T10:30:00-03:00",
        ] {
            assert_eq!(parse_date(raw).unwrap(), expected, "{raw}");
        }
    }

    #[test]
    fn garbage_is_an_invalid_document() {
        assert!(matches!(
            parse_date("yesterday"),
            Err(IngestError::InvalidDocument(_))
        ));
    }

    #[test]
    fn range_is_inclusive_and_ordered() {
        let range = DateRange::parse("2024-01-01", Some("2024-01-31")).unwrap();
        assert!(range.contains(day(2024, 1, 1)));
        assert!(range.contains(day(2024, 1, 31)));
        assert!(!range.contains(day(2024, 2, 1)));

        assert!(DateRange::parse("2024-02-01", Some("2024-01-01")).is_err());
    }
}
