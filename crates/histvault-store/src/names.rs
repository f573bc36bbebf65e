//! Identifier validation and quoting for library, series and column names.

use std::collections::HashSet;

use crate::StoreError;

const MAX_NAME_LEN: usize = 64;

/// Schemas `DuckDB` already owns; a library may not shadow them.
const RESERVED_SCHEMAS: &[&str] = &["main", "information_schema", "pg_catalog", "temp", "system"];

/// Column name used for the implicit date key.
pub(crate) const DATE_COLUMN: &str = "date";

pub(crate) fn validate_library_name(name: &str) -> Result<(), StoreError> {
    validate_namespace_name("library", name)?;
    if RESERVED_SCHEMAS
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return Err(invalid("library", name, "reserved by the database"));
    }
    Ok(())
}

pub(crate) fn validate_series_name(name: &str) -> Result<(), StoreError> {
    validate_namespace_name("series", name)
}

pub(crate) fn validate_columns(columns: &[String]) -> Result<(), StoreError> {
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        if column.is_empty() || column.len() > MAX_NAME_LEN {
            return Err(invalid("column", column, "must be 1-64 characters"));
        }
        if !column
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
        {
            return Err(invalid("column", column, "only [A-Za-z0-9_] allowed"));
        }
        if column.eq_ignore_ascii_case(DATE_COLUMN) {
            return Err(invalid("column", column, "'date' is the row key"));
        }
        // DuckDB matches identifiers case-insensitively.
        if !seen.insert(column.to_ascii_lowercase()) {
            return Err(invalid("column", column, "duplicate column"));
        }
    }
    Ok(())
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub(crate) fn qualified_table(library: &str, series: &str) -> String {
    format!("{}.{}", quote_ident(library), quote_ident(series))
}

fn validate_namespace_name(kind: &'static str, name: &str) -> Result<(), StoreError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(invalid(kind, name, "must be 1-64 characters"));
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '-'))
    {
        return Err(invalid(kind, name, "only [A-Za-z0-9_.-] allowed"));
    }
    Ok(())
}

fn invalid(kind: &'static str, value: &str, reason: &'static str) -> StoreError {
    StoreError::InvalidName {
        kind,
        value: value.to_owned(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn accepts_typical_names() {
        validate_library_name("cn_stocks").expect("library");
        validate_library_name("user.daily-v2").expect("dotted library");
        validate_series_name("000651").expect("series");
        validate_columns(&names(&["open", "high", "v_ma5"])).expect("columns");
    }

    #[test]
    fn rejects_reserved_and_malformed_names() {
        assert!(validate_library_name("MAIN").is_err());
        assert!(validate_library_name("").is_err());
        assert!(validate_series_name("000651; DROP").is_err());
        assert!(validate_series_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn rejects_bad_columns() {
        assert!(validate_columns(&names(&["open", "Open"])).is_err());
        assert!(validate_columns(&names(&["date"])).is_err());
        assert!(validate_columns(&names(&["p-change"])).is_err());
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_ident("000651"), "\"000651\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(qualified_table("cn", "000651"), "\"cn\".\"000651\"");
    }
}
