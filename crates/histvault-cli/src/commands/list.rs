use serde::Serialize;

use histvault_core::{HistoryReader, MaintainerConfig, SeriesInfo};

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct ListResponseData {
    series: Vec<SeriesInfo>,
}

pub fn run(config: &MaintainerConfig) -> Result<CommandResult, CliError> {
    let series = HistoryReader::open(config)?.list()?;
    let data = serde_json::to_value(ListResponseData { series })?;
    Ok(CommandResult::ok(data))
}
