use std::sync::Arc;

use histvault_core::{
    HistoryMaintainer, HistorySource, IfengAdapter, MaintainerConfig, SeriesOutcome, SyncReport,
    ValidationError,
};

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Initialize,
    Delta,
}

pub async fn run(config: &MaintainerConfig, mode: SyncMode) -> Result<CommandResult, CliError> {
    if config.series.is_empty() {
        return Err(ValidationError::NoSeries.into());
    }

    let source: Arc<dyn HistorySource> = Arc::new(IfengAdapter::default());
    let provider = source.id();
    let maintainer = HistoryMaintainer::open(config.clone(), source)?;
    let report = match mode {
        SyncMode::Initialize => maintainer.initialize().await?,
        SyncMode::Delta => maintainer.download_delta().await?,
    };

    let warnings = report_warnings(&report);
    let data = serde_json::to_value(&report)?;
    Ok(CommandResult::ok(data)
        .with_provider(provider)
        .with_warnings(warnings))
}

fn report_warnings(report: &SyncReport) -> Vec<String> {
    report
        .series
        .iter()
        .filter_map(|entry| match entry.outcome {
            SeriesOutcome::Empty => Some(format!("{}: upstream returned no rows", entry.series)),
            SeriesOutcome::Appended { skipped, .. } if skipped > 0 => Some(format!(
                "{}: {skipped} row(s) already stored were skipped",
                entry.series
            )),
            _ => None,
        })
        .collect()
}
