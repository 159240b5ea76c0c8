use std::path::PathBuf;

use clap::Parser;

use gantry_model::{AdmissionStrategy, Environment};
use gantry_observe::{LoggerConfig, LoggerFormat, LoggerLevel, LoggerTarget, LoggerTimeZone};

/// Converge and verify a serverless GPU deployment.
#[derive(Debug, Parser)]
#[command(name = "gantry-deployd", version)]
pub struct Args {
    /// Deployment file (JSON).
    #[arg(short, long, env = "GANTRY_CONFIG")]
    pub config: PathBuf,

    /// Environment to deploy; repeat to run several in parallel. Defaults to the file's.
    #[arg(short, long = "environment", value_name = "NAME")]
    pub environments: Vec<Environment>,

    /// Image reference; overrides the file.
    #[arg(long)]
    pub image: Option<String>,

    /// Reconcile only, skip the test job.
    #[arg(long)]
    pub skip_verify: bool,

    /// Behaviour when a run of the same environment is in flight.
    #[arg(long, default_value = "queue")]
    pub admission: AdmissionStrategy,

    #[arg(long, env = "RUNPOD_API_KEY", hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "GANTRY_REST_URL")]
    pub rest_url: Option<String>,

    #[arg(long, env = "GANTRY_JOBS_URL")]
    pub jobs_url: Option<String>,

    /// Per-request timeout of control-plane calls.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Write the Prometheus text exposition here once all runs finished.
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,

    #[arg(long, default_value = "text")]
    pub log_format: LoggerFormat,

    /// Filter expression, e.g. `info` or `gantry_core=debug,info`.
    #[arg(long, env = "GANTRY_LOG", default_value = "info")]
    pub log_level: LoggerLevel,

    #[arg(long, default_value = "stderr")]
    pub log_target: LoggerTarget,

    #[arg(long, default_value = "utc")]
    pub log_tz: LoggerTimeZone,
}

impl Args {
    pub fn logger(&self) -> LoggerConfig {
        LoggerConfig {
            format: self.log_format,
            level: self.log_level.clone(),
            tz: self.log_tz,
            target: self.log_target,
            ..LoggerConfig::default()
        }
    }
}
