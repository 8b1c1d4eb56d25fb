use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// Tried in order; the first format that parses wins.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d", "%m/%d/%Y"];

/// Calendar month used to bucket records. Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::new(date.year(), date.month())
    }

    /// The month `n` months after this one.
    pub fn plus_months(&self, n: u32) -> Self {
        let zero_based = self.month - 1 + n;
        Self::new(self.year + (zero_based / 12) as i32, zero_based % 12 + 1)
    }

    /// "Jan 2024" style label.
    pub fn label(&self) -> String {
        match NaiveDate::from_ymd_opt(self.year, self.month, 1) {
            Some(d) => d.format("%b %Y").to_string(),
            None => format!("{}/{}", self.month, self.year),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for MonthKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

/// Parse the leading date portion of a free-form cell. Years must have four digits.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let head: String = raw.trim().chars().take(10).collect();
    if head.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(&head, fmt).ok())
        .find(|d| (1000..=9999).contains(&d.year()))
}

pub fn parse_month(raw: &str) -> Option<MonthKey> {
    parse_date(raw).map(MonthKey::of)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_and_datetime() {
        assert_eq!(parse_month("2024-01-15"), Some(MonthKey::new(2024, 1)));
        assert_eq!(parse_month("2024-03-05 00:00:00"), Some(MonthKey::new(2024, 3)));
    }

    #[test]
    fn test_day_first_formats_win_over_month_first() {
        // 02/03/2024 is 2 March under the day-first rule
        assert_eq!(parse_month("02/03/2024"), Some(MonthKey::new(2024, 3)));
        assert_eq!(parse_month("15-06-2023"), Some(MonthKey::new(2023, 6)));
        assert_eq!(parse_month("2023/11/30"), Some(MonthKey::new(2023, 11)));
    }

    #[test]
    fn test_two_digit_years_are_rejected() {
        assert_eq!(parse_month("05/01/24"), None);
        assert_eq!(parse_month("31-12-23"), None);
        assert_eq!(parse_date("23-12-31"), None);
    }

    #[test]
    fn test_month_first_fallback() {
        // Day 25 cannot be a month, so only %m/%d/%Y fits
        assert_eq!(parse_month("12/25/2023"), Some(MonthKey::new(2023, 12)));
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(parse_month(""), None);
        assert_eq!(parse_month("yesterday"), None);
        assert_eq!(parse_month("7"), None);
        assert_eq!(parse_month("2024-13-01"), None);
    }

    #[test]
    fn test_month_ordering_is_chronological() {
        let mut months = vec![
            MonthKey::new(2024, 2),
            MonthKey::new(2023, 12),
            MonthKey::new(2024, 1),
        ];
        months.sort();
        let labels: Vec<String> = months.iter().map(|m| m.label()).collect();
        assert_eq!(labels, vec!["Dec 2023", "Jan 2024", "Feb 2024"]);
    }

    #[test]
    fn test_plus_months_wraps_year() {
        assert_eq!(MonthKey::new(2024, 11).plus_months(1), MonthKey::new(2024, 12));
        assert_eq!(MonthKey::new(2024, 11).plus_months(2), MonthKey::new(2025, 1));
        assert_eq!(MonthKey::new(2024, 12).plus_months(13), MonthKey::new(2026, 1));
    }
}
