//! In-memory Series Table: date-keyed rows of numeric fields.

use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::Date;

use crate::StoreError;

time::serde::format_description!(pub iso_date,Date, "[year]-[month]-[day]");

/// Format a date as `YYYY-MM-DD`.
pub fn format_iso_date(date: Date) -> String {
    date.to_string()
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_iso_date(input: &str) -> Result<Date, time::error::Parse> {
    Date::parse(input.trim(), format_description!("[year]-[month]-[day]"))
}

/// One date's worth of fields, in the owning table's column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRow {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub values: Vec<Option<f64>>,
}

impl DailyRow {
    pub fn new(date: Date, values: Vec<Option<f64>>) -> Self {
        Self { date, values }
    }
}

/// Ordered table of [`DailyRow`]s for one series.
///
/// The date key is implicit and never listed in `columns`. Every row holds
/// exactly one value per column, including tables built by deserializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct SeriesTable {
    columns: Vec<String>,
    rows: Vec<DailyRow>,
}

/// Unchecked wire shape of [`SeriesTable`].
#[derive(Deserialize)]
struct RawTable {
    columns: Vec<String>,
    rows: Vec<DailyRow>,
}

impl TryFrom<RawTable> for SeriesTable {
    type Error = StoreError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        Self::from_rows(raw.columns, raw.rows)
    }
}

impl SeriesTable {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table from pre-assembled rows, checking every row's width.
    pub fn from_rows<I, S>(columns: I, rows: Vec<DailyRow>) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns);
        for (index, row) in rows.iter().enumerate() {
            table.check_width(index, row.values.len())?;
        }
        table.rows = rows;
        Ok(table)
    }

    pub fn push_row(&mut self, date: Date, values: Vec<Option<f64>>) -> Result<(), StoreError> {
        self.check_width(self.rows.len(), values.len())?;
        self.rows.push(DailyRow::new(date, values));
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[DailyRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Value at (`date`, `column`), if both exist.
    pub fn value(&self, date: Date, column: &str) -> Option<f64> {
        let index = self.column_index(column)?;
        self.rows
            .iter()
            .find(|row| row.date == date)
            .and_then(|row| row.values[index])
    }

    /// Remove a column and its values. Returns `false` if it was not present.
    pub fn remove_column(&mut self, name: &str) -> bool {
        let Some(index) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(index);
        for row in &mut self.rows {
            row.values.remove(index);
        }
        true
    }

    /// Stable ascending sort on the date key.
    pub fn sort_by_date(&mut self) {
        self.rows.sort_by_key(|row| row.date);
    }

    /// Drop rows repeating the previous row's date. Returns how many went.
    pub fn dedup_dates(&mut self) -> usize {
        let before = self.rows.len();
        self.rows.dedup_by_key(|row| row.date);
        before - self.rows.len()
    }

    pub fn is_sorted_by_date(&self) -> bool {
        self.rows.windows(2).all(|pair| pair[0].date < pair[1].date)
    }

    pub fn first_date(&self) -> Option<Date> {
        self.rows.iter().map(|row| row.date).min()
    }

    pub fn last_date(&self) -> Option<Date> {
        self.rows.iter().map(|row| row.date).max()
    }

    pub fn dates(&self) -> impl Iterator<Item = Date> + '_ {
        self.rows.iter().map(|row| row.date)
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&DailyRow) -> bool,
    {
        self.rows.retain(|row| keep(row));
    }

    /// Copy of the last `count` rows.
    pub fn tail(&self, count: usize) -> Self {
        let start = self.rows.len().saturating_sub(count);
        Self {
            columns: self.columns.clone(),
            rows: self.rows[start..].to_vec(),
        }
    }

    /// Reorder values so they follow `target` column order.
    ///
    /// Returns `None` unless `target` is a permutation of this table's columns.
    pub(crate) fn reordered(&self, target: &[String]) -> Option<Vec<DailyRow>> {
        if target.len() != self.columns.len() {
            return None;
        }
        let mapping = target
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Option<Vec<_>>>()?;

        Some(
            self.rows
                .iter()
                .map(|row| DailyRow {
                    date: row.date,
                    values: mapping.iter().map(|&index| row.values[index]).collect(),
                })
                .collect(),
        )
    }

    fn check_width(&self, index: usize, found: usize) -> Result<(), StoreError> {
        if found != self.columns.len() {
            return Err(StoreError::RowWidth {
                index,
                expected: self.columns.len(),
                found,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn sample() -> SeriesTable {
        let mut table = SeriesTable::new(["open", "close", "turnover"]);
        table
            .push_row(date!(2024 - 01 - 03), vec![Some(2.0), Some(2.5), Some(0.3)])
            .expect("row");
        table
            .push_row(date!(2024 - 01 - 02), vec![Some(1.0), Some(1.5), None])
            .expect("row");
        table
    }

    #[test]
    fn rejects_rows_with_wrong_width() {
        let mut table = SeriesTable::new(["open", "close"]);
        let err = table
            .push_row(date!(2024 - 01 - 02), vec![Some(1.0)])
            .expect_err("must fail");
        assert!(matches!(
            err,
            StoreError::RowWidth {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn remove_column_drops_values_in_every_row() {
        let mut table = sample();
        assert!(table.remove_column("close"));
        assert!(!table.remove_column("close"));
        assert_eq!(table.columns(), ["open", "turnover"]);
        assert!(table.rows().iter().all(|row| row.values.len() == 2));
        assert_eq!(table.value(date!(2024 - 01 - 03), "turnover"), Some(0.3));
    }

    #[test]
    fn sort_by_date_orders_ascending() {
        let mut table = sample();
        assert!(!table.is_sorted_by_date());
        table.sort_by_date();
        assert!(table.is_sorted_by_date());
        assert_eq!(table.first_date(), Some(date!(2024 - 01 - 02)));
        assert_eq!(table.last_date(), Some(date!(2024 - 01 - 03)));
    }

    #[test]
    fn dedup_keeps_first_row_per_date() {
        let mut table = sample();
        table
            .push_row(date!(2024 - 01 - 03), vec![Some(9.0), Some(9.0), None])
            .expect("row");
        table.sort_by_date();
        assert_eq!(table.dedup_dates(), 1);
        assert!(table.is_sorted_by_date());
        assert_eq!(table.value(date!(2024 - 01 - 03), "open"), Some(2.0));
    }

    #[test]
    fn reordered_maps_values_by_name() {
        let table = sample();
        let target = vec![
            String::from("turnover"),
            String::from("open"),
            String::from("close"),
        ];
        let rows = table.reordered(&target).expect("permutation");
        assert_eq!(rows[0].values, vec![Some(0.3), Some(2.0), Some(2.5)]);

        let missing = vec![String::from("open"), String::from("volume")];
        assert!(table.reordered(&missing).is_none());
    }

    #[test]
    fn serializes_dates_as_iso_strings() {
        let json = serde_json::to_value(sample().tail(1)).expect("serialize");
        assert_eq!(json["rows"][0]["date"], "2024-01-02");
        assert_eq!(json["columns"][2], "turnover");
    }

    #[test]
    fn deserializing_checks_row_width() {
        let short = r#"{"columns":["open","turnover"],"rows":[{"date":"2024-01-02","values":[1.0]}]}"#;
        let error = serde_json::from_str::<SeriesTable>(short).expect_err("short row");
        assert!(error.to_string().contains("has 1 values but 2 columns"));

        let full = r#"{"columns":["open","turnover"],"rows":[{"date":"2024-01-02","values":[1.0,0.4]}]}"#;
        let mut table = serde_json::from_str::<SeriesTable>(full).expect("well formed");
        assert!(table.remove_column("turnover"));
        assert_eq!(table.value(date!(2024 - 01 - 02), "open"), Some(1.0));
    }

    #[test]
    fn parses_iso_dates() {
        assert_eq!(
            parse_iso_date(" 2024-02-29 ").expect("leap day"),
            date!(2024 - 02 - 29)
        );
        assert!(parse_iso_date("2024/02/29").is_err());
        assert_eq!(format_iso_date(date!(2024 - 02 - 09)), "2024-02-09");
    }
}
