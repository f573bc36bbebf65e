mod list;
mod show;
mod sync;

use std::time::Instant;

use histvault_core::{MaintainerConfig, ProviderId, SeriesId};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::Metadata;
use crate::output::Envelope;

use self::sync::SyncMode;

pub struct CommandResult {
    pub data: Value,
    pub provider: Option<ProviderId>,
    pub warnings: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            provider: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

pub async fn run(cli: &Cli) -> Result<Envelope, CliError> {
    let started = Instant::now();

    let (config, result) = match &cli.command {
        Command::Init(args) => {
            let config = resolve_config(cli, &args.series)?;
            let result = sync::run(&config, SyncMode::Initialize).await?;
            (config, result)
        }
        Command::Delta(args) => {
            let config = resolve_config(cli, &args.series)?;
            let result = sync::run(&config, SyncMode::Delta).await?;
            (config, result)
        }
        Command::Show(args) => {
            let config = resolve_config(cli, &[])?;
            let result = show::run(&config, args)?;
            (config, result)
        }
        Command::List => {
            let config = resolve_config(cli, &[])?;
            let result = list::run(&config)?;
            (config, result)
        }
    };

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let mut meta = Metadata::new(cli.command.name(), config.library).with_latency(latency_ms);
    if let Some(provider) = result.provider {
        meta = meta.with_provider(provider);
    }
    for warning in result.warnings {
        meta.push_warning(warning);
    }

    Ok(Envelope {
        meta,
        data: result.data,
    })
}

/// Config file values, overridden by command-line flags.
fn resolve_config(cli: &Cli, series: &[String]) -> Result<MaintainerConfig, CliError> {
    let mut config = match &cli.config {
        Some(path) => MaintainerConfig::load(path)?,
        None => MaintainerConfig::default(),
    };

    if let Some(store) = &cli.store {
        config.store = Some(store.clone());
    }
    if let Some(library) = &cli.library {
        config.library = library.clone();
    }
    if !series.is_empty() {
        config.series = SeriesId::parse_all(series)?;
    }

    config.validate()?;
    debug!(
        store = config.store.as_deref().unwrap_or("<default>"),
        library = %config.library,
        series = config.series.len(),
        "resolved configuration"
    );
    Ok(config)
}
