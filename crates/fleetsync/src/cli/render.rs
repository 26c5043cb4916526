use anyhow::Result;
use clap::Parser;
use console::style;
use fleetsync::Fleetsync;

use super::ConfigArgs;

/// Write the config artifact once.
#[derive(Parser)]
pub struct RenderCommand {
    #[command(flatten)]
    pub config: ConfigArgs,
}

impl RenderCommand {
    /// Execute the render command.
    pub async fn execute(self) -> Result<()> {
        let runtime = Fleetsync::new(self.config.load()?)?;
        let snapshot = runtime.render().await?;

        println!(
            "  {} Wrote {} ({} peers)",
            style("✓").green(),
            style(runtime.config().artifact.path.display()).cyan(),
            snapshot.peers.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_command_parse() {
        let cmd = RenderCommand::try_parse_from(["render", "--template", "custom.tmpl"]).unwrap();
        assert_eq!(
            cmd.config.template,
            Some(std::path::PathBuf::from("custom.tmpl"))
        );
    }
}
