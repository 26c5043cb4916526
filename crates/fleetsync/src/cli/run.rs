use anyhow::Result;
use clap::Parser;
use console::style;
use fleetsync::Fleetsync;
use fleetsync_runtime::CycleOutcome;
use tracing::info;

use super::ConfigArgs;

/// Seed the config artifact and watch fleet membership.
#[derive(Parser)]
pub struct RunCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Run a single reconciliation cycle after seeding, then exit.
    #[arg(long)]
    pub once: bool,
}

impl RunCommand {
    /// Execute the run command.
    pub async fn execute(self) -> Result<()> {
        let config = self.config.load()?;

        println!();
        println!(
            "  {}  {} v{}",
            style("⟳").bold(),
            style("fleetsync").bold().cyan(),
            env!("CARGO_PKG_VERSION")
        );
        println!(
            "  {} Managing {} via {}",
            style("⚙").bold(),
            style(&config.process.name).cyan(),
            style(config.artifact.path.display()).cyan()
        );
        println!();

        info!(
            interval_secs = config.watch.interval_secs,
            cooldown_secs = config.watch.cooldown_secs,
            "Configuration loaded"
        );

        let runtime = Fleetsync::new(config)?;

        if self.once {
            let outcome = runtime.run_once().await?;
            println!("  {} {}", style("✓").green(), describe(&outcome));
            return Ok(());
        }

        runtime.run().await?;
        Ok(())
    }
}

fn describe(outcome: &CycleOutcome) -> String {
    match outcome {
        CycleOutcome::Unchanged => "Membership unchanged".to_string(),
        CycleOutcome::Gated { reopens_at, .. } => {
            format!("Membership changed, cooldown open again at {}", reopens_at)
        }
        CycleOutcome::Applied { delta, restart } => match restart {
            Ok(restarted) => format!(
                "Applied (+{} / -{} peers), {} process(es) signalled",
                delta.added.len(),
                delta.removed.len(),
                restarted.signalled_count()
            ),
            Err(e) => format!(
                "Applied (+{} / -{} peers), restart failed: {}",
                delta.added.len(),
                delta.removed.len(),
                e
            ),
        },
        CycleOutcome::DiscoveryFailed(e) => format!("Discovery failed: {}", e),
        CycleOutcome::RenderFailed(e) => format!("Render failed: {}", e),
    }
}
