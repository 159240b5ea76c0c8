mod cli;
mod plan;

use std::{process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use gantry_client::{ClientConfig, RestClient};
use gantry_core::{Deployer, PipelineOutcome};
use gantry_observe::{init_local_offset, init_logger};
use gantry_prometheus::PrometheusMetrics;

use crate::cli::Args;

fn main() -> anyhow::Result<ExitCode> {
    // local offset must be read before any runtime thread exists
    init_local_offset();
    let args = Args::parse();
    init_logger(&args.logger())?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?
        .block_on(run(args))
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let mut cfg = plan::load(&args.config)?;
    if args.skip_verify {
        cfg.verify.skip = true;
    }
    let extra = plan::injected_env(std::env::vars());
    let plans = plan::expand(cfg, &args.environments, args.image.as_deref(), &extra)?;

    let metrics = Arc::new(PrometheusMetrics::new()?);
    let client = RestClient::new(&client_config(&args))?.with_metrics(metrics.clone());
    let deployer = Arc::new(
        Deployer::new(Arc::new(client))
            .with_metrics(metrics.clone())
            .with_admission(args.admission),
    );

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping at the next stage boundary");
            interrupt.cancel();
        }
    });

    info!(runs = plans.len(), admission = ?args.admission, "starting deployment");
    let mut runs = JoinSet::new();
    for cfg in plans {
        let deployer = deployer.clone();
        let cancel = cancel.clone();
        runs.spawn(async move { deployer.run(&cfg, &cancel).await });
    }

    let mut outcomes: Vec<PipelineOutcome> = Vec::new();
    let mut crashed = false;
    while let Some(joined) = runs.join_next().await {
        match joined {
            Ok(outcome) => {
                println!("{outcome}");
                outcomes.push(outcome);
            }
            Err(e) => {
                error!(error = %e, "pipeline task aborted");
                crashed = true;
            }
        }
    }

    if let Some(path) = &args.metrics_file {
        let text = metrics.encode_text()?;
        std::fs::write(path, text)
            .with_context(|| format!("writing metrics to {}", path.display()))?;
    }

    if crashed {
        return Ok(ExitCode::FAILURE);
    }
    Ok(plan::exit_code(&outcomes))
}

fn client_config(args: &Args) -> ClientConfig {
    let mut cfg = ClientConfig::default().with_api_key(args.api_key.as_str());
    if let Some(url) = &args.rest_url {
        cfg.rest_url = url.clone();
    }
    if let Some(url) = &args.jobs_url {
        cfg.jobs_url = url.clone();
    }
    if let Some(ms) = args.timeout_ms {
        cfg.timeout_ms = ms;
    }
    cfg
}
