//! Series-level operations inside one library namespace.

use ::duckdb::types::Value as DuckValue;
use ::duckdb::{params, params_from_iter, Connection};
use serde::Serialize;
use time::Date;
use tracing::{debug, warn};

use crate::duckdb::DuckDbConnectionManager;
use crate::names::{
    qualified_table, quote_ident, validate_columns, validate_series_name, DATE_COLUMN,
};
use crate::table::{format_iso_date, iso_date, parse_iso_date, DailyRow, SeriesTable};
use crate::StoreError;

/// Outcome of [`Library::append`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendReport {
    pub series: String,
    /// Rows actually stored.
    pub appended: usize,
    /// Dates refused because they were not later than what is already stored.
    pub skipped: Vec<Date>,
    /// True when the series did not exist and was created by this append.
    pub created: bool,
}

/// Catalog view of one stored series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesInfo {
    pub library: String,
    pub series: String,
    pub columns: Vec<String>,
    pub row_count: u64,
    #[serde(with = "iso_date::option")]
    pub first_date: Option<Date>,
    #[serde(with = "iso_date::option")]
    pub last_date: Option<Date>,
}

/// Handle to a named library. Cheap to clone; shares the store's connections.
#[derive(Clone)]
pub struct Library {
    name: String,
    manager: DuckDbConnectionManager,
}

impl Library {
    pub(crate) fn new(name: impl Into<String>, manager: DuckDbConnectionManager) -> Self {
        Self {
            name: name.into(),
            manager,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store `table` under `series`, replacing any existing table for that key.
    pub fn write(&self, series: &str, table: &SeriesTable) -> Result<(), StoreError> {
        validate_series_name(series)?;
        validate_columns(table.columns())?;

        let connection = self.manager.acquire()?;
        self.check_case_conflict(&connection, series)?;
        self.replace_table(&connection, series, table.columns(), table.rows(), "write", 0)?;
        debug!(library = %self.name, series, rows = table.len(), "series written");
        Ok(())
    }

    /// Append rows to `series`, creating it when absent.
    ///
    /// Only rows dated strictly after the stored maximum (and after the
    /// previously accepted row of the same batch) are stored; the rest are
    /// reported in [`AppendReport::skipped`].
    pub fn append(&self, series: &str, table: &SeriesTable) -> Result<AppendReport, StoreError> {
        validate_series_name(series)?;
        validate_columns(table.columns())?;

        let connection = self.manager.acquire()?;
        let Some(stored_columns) = self.stored_columns(&connection, series)? else {
            self.check_case_conflict(&connection, series)?;
            let (accepted, skipped) = split_monotonic(table.rows(), None);
            self.replace_table(
                &connection,
                series,
                table.columns(),
                &accepted,
                "append",
                skipped.len(),
            )?;
            return Ok(self.report(series, accepted.len(), skipped, true));
        };

        let rows = table
            .reordered(&stored_columns)
            .ok_or_else(|| StoreError::SchemaMismatch {
                series: series.to_owned(),
                expected: stored_columns.clone(),
                found: table.columns().to_vec(),
            })?;

        let target = qualified_table(&self.name, series);
        let stored_max = max_date(&connection, &target, series)?;
        let (accepted, skipped) = split_monotonic(&rows, stored_max);

        if !accepted.is_empty() {
            connection.execute_batch("BEGIN TRANSACTION")?;
            let result = (|| -> Result<(), StoreError> {
                insert_rows(&connection, &target, &stored_columns, &accepted)?;
                self.refresh_catalog(&connection, series, &stored_columns)?;
                log_write(
                    &connection,
                    &self.name,
                    series,
                    "append",
                    accepted.len(),
                    skipped.len(),
                )
            })();
            finalize_transaction(&connection, result)?;
        }

        Ok(self.report(series, accepted.len(), skipped, false))
    }

    /// Read the full table stored under `series`, ascending by date.
    pub fn read(&self, series: &str) -> Result<SeriesTable, StoreError> {
        validate_series_name(series)?;

        let connection = self.manager.acquire()?;
        let columns = self
            .stored_columns(&connection, series)?
            .ok_or_else(|| self.not_found(series))?;

        let select_list = std::iter::once(format!("CAST({DATE_COLUMN} AS VARCHAR)"))
            .chain(columns.iter().map(|column| quote_ident(column)))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {select_list} FROM {target} ORDER BY {DATE_COLUMN}",
            target = qualified_table(&self.name, series)
        );

        let mut statement = connection.prepare(&sql)?;
        let mut rows = statement.query(params![])?;
        let mut table = SeriesTable::new(columns.iter().cloned());
        while let Some(row) = rows.next()? {
            let raw: String = row.get(0)?;
            let date = parse_stored_date(series, &raw)?;
            let mut values = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                values.push(row.get::<_, Option<f64>>(index + 1)?);
            }
            table.push_row(date, values)?;
        }

        Ok(table)
    }

    pub fn has_series(&self, series: &str) -> Result<bool, StoreError> {
        validate_series_name(series)?;
        let connection = self.manager.acquire()?;
        Ok(self.stored_columns(&connection, series)?.is_some())
    }

    /// Names of every series in this library, sorted.
    pub fn list_series(&self) -> Result<Vec<String>, StoreError> {
        let connection = self.manager.acquire()?;
        let mut statement = connection
            .prepare("SELECT series FROM histvault_series WHERE library = ? ORDER BY series")?;
        let names = statement
            .query_map(params![self.name.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    pub fn series_info(&self, series: &str) -> Result<SeriesInfo, StoreError> {
        validate_series_name(series)?;
        let connection = self.manager.acquire()?;
        let mut statement = connection.prepare(
            "SELECT columns, row_count, CAST(min_date AS VARCHAR), CAST(max_date AS VARCHAR) \
             FROM histvault_series WHERE library = ? AND series = ?",
        )?;
        let mut rows = statement.query(params![self.name.as_str(), series])?;
        let Some(row) = rows.next()? else {
            return Err(self.not_found(series));
        };

        let columns: String = row.get(0)?;
        let row_count: i64 = row.get(1)?;
        let min_date: Option<String> = row.get(2)?;
        let max_date: Option<String> = row.get(3)?;

        Ok(SeriesInfo {
            library: self.name.clone(),
            series: series.to_owned(),
            columns: parse_columns(series, &columns)?,
            row_count: u64::try_from(row_count).unwrap_or_default(),
            first_date: min_date
                .map(|raw| parse_stored_date(series, &raw))
                .transpose()?,
            last_date: max_date
                .map(|raw| parse_stored_date(series, &raw))
                .transpose()?,
        })
    }

    fn replace_table(
        &self,
        connection: &Connection,
        series: &str,
        columns: &[String],
        rows: &[DailyRow],
        operation: &str,
        skipped: usize,
    ) -> Result<(), StoreError> {
        let target = qualified_table(&self.name, series);
        let column_defs = std::iter::once(format!("{DATE_COLUMN} DATE PRIMARY KEY"))
            .chain(
                columns
                    .iter()
                    .map(|column| format!("{} DOUBLE", quote_ident(column))),
            )
            .collect::<Vec<_>>()
            .join(", ");

        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<(), StoreError> {
            connection.execute_batch(&format!("CREATE OR REPLACE TABLE {target} ({column_defs})"))?;
            insert_rows(connection, &target, columns, rows)?;
            self.refresh_catalog(connection, series, columns)?;
            log_write(connection, &self.name, series, operation, rows.len(), skipped)
        })();
        finalize_transaction(connection, result)
    }

    /// Refuse `series` when another series in this library matches it
    /// ignoring case.
    fn check_case_conflict(&self, connection: &Connection, series: &str) -> Result<(), StoreError> {
        let mut statement = connection.prepare(
            "SELECT series FROM histvault_series \
             WHERE library = ? AND lower(series) = lower(?) AND series <> ? LIMIT 1",
        )?;
        let mut rows = statement.query(params![self.name.as_str(), series, series])?;
        let Some(row) = rows.next()? else {
            return Ok(());
        };
        Err(StoreError::NameConflict {
            kind: "series",
            name: series.to_owned(),
            existing: row.get(0)?,
        })
    }

    fn stored_columns(
        &self,
        connection: &Connection,
        series: &str,
    ) -> Result<Option<Vec<String>>, StoreError> {
        let mut statement = connection
            .prepare("SELECT columns FROM histvault_series WHERE library = ? AND series = ?")?;
        let mut rows = statement.query(params![self.name.as_str(), series])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let raw: String = row.get(0)?;
        parse_columns(series, &raw).map(Some)
    }

    fn refresh_catalog(
        &self,
        connection: &Connection,
        series: &str,
        columns: &[String],
    ) -> Result<(), StoreError> {
        let columns_json =
            serde_json::to_string(columns).map_err(|error| StoreError::CorruptCatalog {
                series: series.to_owned(),
                reason: error.to_string(),
            })?;
        let sql = format!(
            "INSERT OR REPLACE INTO histvault_series \
             (library, series, columns, row_count, min_date, max_date, updated_at) \
             SELECT ?, ?, ?, COUNT(*), MIN({DATE_COLUMN}), MAX({DATE_COLUMN}), CURRENT_TIMESTAMP \
             FROM {target}",
            target = qualified_table(&self.name, series)
        );
        connection.execute(&sql, params![self.name.as_str(), series, columns_json])?;
        Ok(())
    }

    fn report(
        &self,
        series: &str,
        appended: usize,
        skipped: Vec<Date>,
        created: bool,
    ) -> AppendReport {
        if !skipped.is_empty() {
            warn!(
                library = %self.name,
                series,
                skipped = skipped.len(),
                "append ignored rows not later than the stored data"
            );
        }
        debug!(library = %self.name, series, appended, created, "series appended");
        AppendReport {
            series: series.to_owned(),
            appended,
            skipped,
            created,
        }
    }

    fn not_found(&self, series: &str) -> StoreError {
        StoreError::SeriesNotFound {
            library: self.name.clone(),
            series: series.to_owned(),
        }
    }
}

/// Keep rows whose dates strictly increase past `after`; return the refused dates.
fn split_monotonic(rows: &[DailyRow], after: Option<Date>) -> (Vec<DailyRow>, Vec<Date>) {
    let mut accepted = Vec::with_capacity(rows.len());
    let mut skipped = Vec::new();
    let mut last = after;

    for row in rows {
        if last.is_some_and(|last| row.date <= last) {
            skipped.push(row.date);
            continue;
        }
        last = Some(row.date);
        accepted.push(row.clone());
    }

    (accepted, skipped)
}

fn insert_rows(
    connection: &Connection,
    target: &str,
    columns: &[String],
    rows: &[DailyRow],
) -> Result<(), StoreError> {
    if rows.is_empty() {
        return Ok(());
    }

    let column_list = std::iter::once(DATE_COLUMN.to_owned())
        .chain(columns.iter().map(|column| quote_ident(column)))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = std::iter::once("CAST(? AS DATE)")
        .chain(columns.iter().map(|_| "?"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("INSERT INTO {target} ({column_list}) VALUES ({placeholders})");

    let mut statement = connection.prepare(&sql)?;
    for row in rows {
        let mut values = Vec::with_capacity(row.values.len() + 1);
        values.push(DuckValue::Text(format_iso_date(row.date)));
        values.extend(row.values.iter().map(|value| match value {
            Some(value) if value.is_finite() => DuckValue::Double(*value),
            _ => DuckValue::Null,
        }));
        statement.execute(params_from_iter(values))?;
    }

    Ok(())
}

fn max_date(connection: &Connection, target: &str, series: &str) -> Result<Option<Date>, StoreError> {
    let raw: Option<String> = connection.query_row(
        &format!("SELECT CAST(MAX({DATE_COLUMN}) AS VARCHAR) FROM {target}"),
        params![],
        |row| row.get(0),
    )?;
    raw.map(|raw| parse_stored_date(series, &raw)).transpose()
}

fn log_write(
    connection: &Connection,
    library: &str,
    series: &str,
    operation: &str,
    written: usize,
    skipped: usize,
) -> Result<(), StoreError> {
    let written = i64::try_from(written).unwrap_or(i64::MAX);
    let skipped = i64::try_from(skipped).unwrap_or(i64::MAX);
    connection.execute(
        "INSERT INTO histvault_write_log \
         (library, series, operation, rows_written, rows_skipped, timestamp) \
         VALUES (?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
        params![library, series, operation, written, skipped],
    )?;
    Ok(())
}

/// Commit on success, roll back on failure.
///
/// A failed `COMMIT` is rolled back too, so the pooled connection never goes
/// back idle with a transaction open.
fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, StoreError>,
) -> Result<T, StoreError> {
    let error = match result {
        Ok(value) => match connection.execute_batch("COMMIT") {
            Ok(()) => return Ok(value),
            Err(error) => StoreError::from(error),
        },
        Err(error) => error,
    };
    let _ = connection.execute_batch("ROLLBACK");
    Err(error)
}

fn parse_columns(series: &str, raw: &str) -> Result<Vec<String>, StoreError> {
    serde_json::from_str(raw).map_err(|error| StoreError::CorruptCatalog {
        series: series.to_owned(),
        reason: format!("columns: {error}"),
    })
}

fn parse_stored_date(series: &str, raw: &str) -> Result<Date, StoreError> {
    parse_iso_date(raw).map_err(|error| StoreError::CorruptCatalog {
        series: series.to_owned(),
        reason: format!("date '{raw}': {error}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn row(date: Date) -> DailyRow {
        DailyRow::new(date, vec![Some(1.0)])
    }

    #[test]
    fn split_monotonic_drops_stale_and_repeated_dates() {
        let rows = vec![
            row(date!(2024 - 01 - 02)),
            row(date!(2024 - 01 - 04)),
            row(date!(2024 - 01 - 04)),
            row(date!(2024 - 01 - 03)),
            row(date!(2024 - 01 - 05)),
        ];
        let (accepted, skipped) = split_monotonic(&rows, Some(date!(2024 - 01 - 02)));
        let kept: Vec<Date> = accepted.iter().map(|row| row.date).collect();
        assert_eq!(kept, vec![date!(2024 - 01 - 04), date!(2024 - 01 - 05)]);
        assert_eq!(
            skipped,
            vec![
                date!(2024 - 01 - 02),
                date!(2024 - 01 - 04),
                date!(2024 - 01 - 03)
            ]
        );
    }

    #[test]
    fn split_monotonic_without_floor_keeps_first_row() {
        let rows = vec![row(date!(2024 - 01 - 02))];
        let (accepted, skipped) = split_monotonic(&rows, None);
        assert_eq!(accepted.len(), 1);
        assert!(skipped.is_empty());
    }

    #[test]
    fn failed_commit_leaves_connection_reusable() {
        let first = Connection::open_in_memory().expect("open");
        first
            .execute_batch("CREATE TABLE keys (id INTEGER PRIMARY KEY)")
            .expect("table");
        let second = first.try_clone().expect("clone");

        first.execute_batch("BEGIN TRANSACTION").expect("begin first");
        second.execute_batch("BEGIN TRANSACTION").expect("begin second");
        first
            .execute_batch("INSERT INTO keys VALUES (1)")
            .expect("insert first");
        let pending = second
            .execute_batch("INSERT INTO keys VALUES (1)")
            .map_err(StoreError::from);
        finalize_transaction(&first, Ok(())).expect("first commits");

        let outcome = finalize_transaction(&second, pending);

        assert!(outcome.is_err());
        second
            .execute_batch("BEGIN TRANSACTION")
            .expect("no transaction left open");
        second.execute_batch("ROLLBACK").expect("rollback");
    }
}
