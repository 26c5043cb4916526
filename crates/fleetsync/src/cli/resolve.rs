use anyhow::Result;
use clap::Parser;
use fleetsync::Fleetsync;

use super::ConfigArgs;

/// Print the resolved environment snapshot.
#[derive(Parser)]
pub struct ResolveCommand {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Pretty-print the JSON output.
    #[arg(long)]
    pub pretty: bool,
}

impl ResolveCommand {
    /// Execute the resolve command.
    pub async fn execute(self) -> Result<()> {
        let runtime = Fleetsync::new(self.config.load()?)?;
        let snapshot = runtime.resolve().await?;

        let json = if self.pretty {
            serde_json::to_string_pretty(&snapshot)?
        } else {
            serde_json::to_string(&snapshot)?
        };
        println!("{}", json);
        Ok(())
    }
}
