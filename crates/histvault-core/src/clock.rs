//! Source of "today" for the maintainer.

use time::{Date, OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// Supplies the current market-local calendar date.
pub trait Clock: Send + Sync {
    fn today(&self) -> Date;
}

/// Wall clock shifted to a fixed market offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemClock {
    offset: UtcOffset,
}

impl SystemClock {
    pub const fn new(offset: UtcOffset) -> Self {
        Self { offset }
    }

    /// Clock for a whole-hour offset such as `8` for China Standard Time.
    pub fn from_hours(hours: i8) -> Result<Self, ValidationError> {
        if !(-23..=23).contains(&hours) {
            return Err(ValidationError::UtcOffsetOutOfRange { hours });
        }
        UtcOffset::from_hms(hours, 0, 0)
            .map(Self::new)
            .map_err(|_| ValidationError::UtcOffsetOutOfRange { hours })
    }

    pub const fn offset(&self) -> UtcOffset {
        self.offset
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(UtcOffset::UTC)
    }
}

impl Clock for SystemClock {
    fn today(&self) -> Date {
        OffsetDateTime::now_utc().to_offset(self.offset).date()
    }
}

/// Clock pinned to one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Date);

impl Clock for FixedClock {
    fn today(&self) -> Date {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn fixed_clock_returns_its_date() {
        assert_eq!(FixedClock(date!(2024 - 06 - 03)).today(), date!(2024 - 06 - 03));
    }

    #[test]
    fn system_clock_validates_offset() {
        assert_eq!(
            SystemClock::from_hours(8).expect("cst").offset(),
            UtcOffset::from_hms(8, 0, 0).expect("offset")
        );
        assert!(SystemClock::from_hours(24).is_err());
    }
}
