use anyhow::{bail, Context, Result};
use fieldsync::application::services::OfflineServiceTrait;
use fieldsync::{init_logging, AppConfig, AppState, SyncReport};
use serde::Serialize;
use std::env;
use tokio::runtime::Runtime;

#[derive(Debug, Clone, Default)]
struct CliOptions {
    database_url: Option<String>,
    api_base_url: Option<String>,
    pretty: bool,
    status_only: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DrainReport {
    online: bool,
    reports: Vec<SyncReport>,
    pending_count: u64,
    synced_total: u64,
    failed_total: u64,
}

fn usage() -> &'static str {
    "Usage: fieldsync-drain [--database-url <url>] [--api-base-url <url>] [--status-only] [--pretty]"
}

fn main() -> Result<()> {
    init_logging();

    let options = parse_args(env::args().skip(1))?;
    let mut config = AppConfig::from_env();
    if let Some(url) = &options.database_url {
        config.database.url = url.clone();
    }
    if let Some(url) = &options.api_base_url {
        config.api.base_url = url.trim_end_matches('/').to_string();
    }

    let rt = Runtime::new().context("Failed to create Tokio runtime")?;
    let report = rt.block_on(drain(config, options.status_only))?;

    let payload = if options.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{payload}");
    Ok(())
}

async fn drain(config: AppConfig, status_only: bool) -> Result<DrainReport> {
    let state = AppState::new(config).await?;
    let service = &state.offline_service;

    service.monitor().poll().await;
    let online = service.monitor().is_online().await;

    let reports = if online && !status_only {
        service.sync_now().await?
    } else {
        Vec::new()
    };

    let metrics = state.orchestrator.metrics();
    Ok(DrainReport {
        online,
        reports,
        pending_count: service.pending_count().await?,
        synced_total: metrics.synced,
        failed_total: metrics.failed,
    })
}

fn parse_args<I>(args: I) -> Result<CliOptions>
where
    I: IntoIterator<Item = String>,
{
    let mut options = CliOptions::default();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--database-url" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--database-url requires a value\n{}", usage()))?;
                options.database_url = Some(value);
            }
            "--api-base-url" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--api-base-url requires a value\n{}", usage()))?;
                options.api_base_url = Some(value);
            }
            "--pretty" => options.pretty = true,
            "--status-only" => options.status_only = true,
            "-h" | "--help" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other => bail!("Unknown argument: {other}\n{}", usage()),
        }
    }

    Ok(options)
}
