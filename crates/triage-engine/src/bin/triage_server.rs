//! Triage server - live vitals stream, doctor roster and prediction API

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use triage_engine::collaborators::VitalsRuleModel;
use triage_engine::logging::{log_welcome, setup_logging, LoggingConfig};
use triage_engine::{TriageConfig, TriageServerBuilder};

#[derive(Parser, Debug)]
#[command(name = "triage-server")]
#[command(about = "Emergency department triage simulation server")]
pub struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:8000
    #[arg(short, long)]
    pub bind: Option<String>,

    /// JSON patient dataset to seed the simulation from
    #[arg(short, long)]
    pub dataset: Option<PathBuf>,

    /// Seed for reproducible simulation and assignment
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Log level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Serve without a triage classifier (/predict answers 500)
    #[arg(long)]
    pub no_model: bool,
}

impl Args {
    fn apply(&self, config: &mut TriageConfig) {
        if let Some(bind) = &self.bind {
            config.server.bind_address = bind.clone();
        }
        if let Some(dataset) = &self.dataset {
            config.simulation.dataset_path = Some(dataset.clone());
        }
        if let Some(seed) = self.seed {
            config.simulation.seed = Some(seed);
            config.assignment.seed = Some(seed);
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = TriageConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    setup_logging(LoggingConfig::try_from(&config.logging)?)?;
    log_welcome("triage-server", env!("CARGO_PKG_VERSION"));

    let mut builder = TriageServerBuilder::new().with_config(config);
    if !args.no_model {
        builder = builder.with_model(Arc::new(VitalsRuleModel));
    }
    let mut server = builder.build().context("Failed to build triage server")?;

    let addr = server.start().await?;
    info!("🩺 Streaming vitals on ws://{}/ws/vitals", addr);
    info!("🛑 Press Ctrl+C to stop the server");

    tokio::signal::ctrl_c().await.context("Failed to listen for Ctrl+C")?;
    server.stop().await?;

    Ok(())
}
