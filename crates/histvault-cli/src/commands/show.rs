use serde::Serialize;

use histvault_core::{HistoryReader, MaintainerConfig, SeriesId, SeriesTable};

use crate::cli::ShowArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ShowResponseData {
    series: SeriesId,
    row_count: usize,
    table: SeriesTable,
}

pub fn run(config: &MaintainerConfig, args: &ShowArgs) -> Result<CommandResult, CliError> {
    let series = SeriesId::parse(&args.series)?;
    let table = HistoryReader::open(config)?.get(&series)?;
    let row_count = table.len();
    let table = match args.tail {
        Some(count) => table.tail(count),
        None => table,
    };

    let data = serde_json::to_value(ShowResponseData {
        series,
        row_count,
        table,
    })?;
    Ok(CommandResult::ok(data))
}
