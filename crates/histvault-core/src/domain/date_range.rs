use std::fmt::{Display, Formatter};

use time::{Date, Duration};

use histvault_store::format_iso_date;

use crate::ValidationError;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvertedRange {
                start: format_iso_date(start),
                end: format_iso_date(end),
            });
        }
        Ok(Self { start, end })
    }

    /// `[end - days, end]`, clamped at the earliest representable date.
    pub fn trailing(end: Date, days: u32) -> Self {
        let start = end
            .checked_sub(Duration::days(i64::from(days)))
            .unwrap_or(Date::MIN);
        Self { start, end }
    }

    pub const fn single_day(day: Date) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub const fn start(&self) -> Date {
        self.start
    }

    pub const fn end(&self) -> Date {
        self.end
    }

    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}..={}",
            format_iso_date(self.start),
            format_iso_date(self.end)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn trailing_range_spans_lookback() {
        let range = DateRange::trailing(date!(2024 - 03 - 01), 365);
        assert_eq!(range.start(), date!(2023 - 03 - 02));
        assert_eq!(range.end(), date!(2024 - 03 - 01));
        assert!(range.contains(date!(2023 - 03 - 02)));
        assert!(!range.contains(date!(2023 - 03 - 01)));
    }

    #[test]
    fn single_day_contains_only_that_day() {
        let range = DateRange::single_day(date!(2024 - 03 - 01));
        assert!(range.contains(date!(2024 - 03 - 01)));
        assert!(!range.contains(date!(2024 - 03 - 02)));
        assert_eq!(range.to_string(), "2024-03-01..=2024-03-01");
    }

    #[test]
    fn rejects_inverted_ranges() {
        let error = DateRange::new(date!(2024 - 03 - 02), date!(2024 - 03 - 01))
            .expect_err("inverted");
        assert_eq!(
            error,
            ValidationError::InvertedRange {
                start: String::from("2024-03-02"),
                end: String::from("2024-03-01"),
            }
        );
    }
}
