use histvault_store::SeriesTable;

/// Columns derived from raw prices that are never persisted.
pub const DERIVED_COLUMNS: [&str; 9] = [
    "price_change",
    "p_change",
    "ma5",
    "ma10",
    "ma20",
    "v_ma5",
    "v_ma10",
    "v_ma20",
    "turnover",
];

/// Remove each named column that is present; absent names are ignored.
pub fn strip_columns(table: &mut SeriesTable, columns: &[&str]) {
    for column in columns {
        table.remove_column(column);
    }
}

/// Remove [`DERIVED_COLUMNS`].
pub fn strip_derived_columns(table: &mut SeriesTable) {
    strip_columns(table, &DERIVED_COLUMNS);
}
