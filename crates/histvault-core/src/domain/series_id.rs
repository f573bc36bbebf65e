use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SERIES_ID_LEN: usize = 16;

/// Identifier of one tracked instrument, e.g. `000651` or `hs300`.
///
/// Case is preserved: index aliases are lowercase while stock codes are
/// digits, and the same string doubles as the stored series name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeriesId(String);

impl SeriesId {
    /// Parse a series identifier, trimming surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySeriesId);
        }

        let len = trimmed.chars().count();
        if len > MAX_SERIES_ID_LEN {
            return Err(ValidationError::SeriesIdTooLong {
                len,
                max: MAX_SERIES_ID_LEN,
            });
        }

        for (index, ch) in trimmed.chars().enumerate() {
            if !ch.is_ascii_alphanumeric() {
                return Err(ValidationError::SeriesIdInvalidChar { ch, index });
            }
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse a list of identifiers, failing on the first invalid one.
    pub fn parse_all<I, S>(inputs: I) -> Result<Vec<Self>, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        inputs
            .into_iter()
            .map(|input| Self::parse(input.as_ref()))
            .collect()
    }
}

impl Display for SeriesId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SeriesId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for SeriesId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SeriesId> for String {
    fn from(value: SeriesId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_trims_series_id() {
        let parsed = SeriesId::parse(" 000651 ").expect("series id should parse");
        assert_eq!(parsed.as_str(), "000651");
        assert_eq!(SeriesId::parse("hs300").expect("alias").as_str(), "hs300");
    }

    #[test]
    fn rejects_invalid_chars() {
        let err = SeriesId::parse("000651.SZ").expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::SeriesIdInvalidChar { ch: '.', index: 6 }
        ));
    }

    #[test]
    fn rejects_empty_and_long_ids() {
        assert_eq!(SeriesId::parse("  "), Err(ValidationError::EmptySeriesId));
        assert!(matches!(
            SeriesId::parse("12345678901234567"),
            Err(ValidationError::SeriesIdTooLong { len: 17, .. })
        ));
    }

    #[test]
    fn deserializes_through_validation() {
        let ids: Vec<SeriesId> = serde_json::from_str(r#"["000651", "600036"]"#).expect("valid");
        assert_eq!(ids[1].as_str(), "600036");
        assert!(serde_json::from_str::<Vec<SeriesId>>(r#"["bad id"]"#).is_err());
    }
}
