mod render;
mod resolve;
mod run;

pub use render::RenderCommand;
pub use resolve::ResolveCommand;
pub use run::RunCommand;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use fleetsync_core::FleetConfig;
use tracing_subscriber::EnvFilter;

/// fleetsync - keep a clustered server's config in step with fleet membership
#[derive(Parser)]
#[command(name = "fleetsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Write the initial config, then restart the managed process on membership changes.
    Run(RunCommand),

    /// Resolve the fleet and write the config once, without restarting anything.
    Render(RenderCommand),

    /// Resolve the fleet and print the snapshot as JSON.
    Resolve(ResolveCommand),
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Configuration options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Configuration file path. Defaults apply when it does not exist.
    #[arg(short, long, default_value = "fleetsync.toml")]
    pub config: PathBuf,

    /// Config artifact path (overrides config).
    #[arg(long)]
    pub artifact: Option<PathBuf>,

    /// Template file (overrides config).
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Managed process name (overrides config).
    #[arg(long)]
    pub process: Option<String>,
}

impl ConfigArgs {
    /// Load configuration and apply command-line overrides.
    pub fn load(&self) -> Result<FleetConfig> {
        let mut config = FleetConfig::from_file_or_default(&self.config)
            .with_context(|| format!("Failed to load {}", self.config.display()))?;

        if let Some(artifact) = &self.artifact {
            config.artifact.path = artifact.clone();
        }
        if let Some(template) = &self.template {
            config.artifact.template = Some(template.clone());
        }
        if let Some(process) = &self.process {
            config.process.name = process.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        // A missing .env is fine
        dotenvy::dotenv().ok();
        init_logging(self.verbose, self.log_format);

        match self.command {
            Commands::Run(cmd) => cmd.execute().await,
            Commands::Render(cmd) => cmd.execute().await,
            Commands::Resolve(cmd) => cmd.execute().await,
        }
    }
}

fn init_logging(verbose: bool, format: LogFormat) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = result {
        eprintln!("Logging already initialized: {}", e);
    }
}
