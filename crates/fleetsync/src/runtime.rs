//! Wires configuration into a running reconciliation loop.

use std::sync::Arc;

use fleetsync_core::error::{FleetError, Result};
use fleetsync_core::{ConfigTemplate, EnvironmentSnapshot, FleetConfig};
use fleetsync_runtime::{
    Components, ConfigMaterializer, CycleOutcome, FleetDirectory, PeerDirectory, PidofController,
    ReconcileConfig, ReconcileLoop,
};

/// The fleetsync runtime.
pub struct Fleetsync {
    config: FleetConfig,
}

impl Fleetsync {
    /// Create a runtime from validated configuration.
    pub fn new(config: FleetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Get the configuration.
    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    /// Directory client for the configured fleet.
    pub fn directory(&self) -> FleetDirectory {
        FleetDirectory::new(self.config.directory.clone())
    }

    /// Load the configured template.
    pub fn template(&self) -> Result<ConfigTemplate> {
        let template = match &self.config.artifact.template {
            Some(path) => ConfigTemplate::from_file(path)?,
            None => ConfigTemplate::builtin(),
        };
        template.validate()?;
        Ok(template.with_peer_port(self.config.artifact.peer_port))
    }

    /// Materializer for the configured artifact path.
    pub fn materializer(&self) -> Result<ConfigMaterializer> {
        Ok(ConfigMaterializer::new(
            self.config.artifact.path.clone(),
            self.template()?,
        ))
    }

    /// Production collaborators: DNS directory, `pidof`/`kill`, system clock.
    pub fn components(&self) -> Result<Components> {
        Ok(Components::new(
            Arc::new(self.directory()),
            self.materializer()?,
            Arc::new(PidofController::new()),
        ))
    }

    /// Resolve the current environment once.
    pub async fn resolve(&self) -> Result<EnvironmentSnapshot> {
        Ok(self.directory().resolve().await?)
    }

    /// Resolve and write the artifact once, without restarting anything.
    pub async fn render(&self) -> Result<EnvironmentSnapshot> {
        let snapshot = self.resolve().await?;
        self.materializer()?.materialize(&snapshot)?;
        Ok(snapshot)
    }

    /// Seed the artifact and return a loop ready to run.
    pub async fn seed(&self) -> Result<ReconcileLoop> {
        ReconcileLoop::seed(self.components()?, ReconcileConfig::from(&self.config)).await
    }

    /// Seed, then run a single reconciliation cycle.
    pub async fn run_once(&self) -> Result<CycleOutcome> {
        let mut reconciler = self.seed().await?;
        Ok(reconciler.run_cycle().await)
    }

    /// Seed, then reconcile until a shutdown signal arrives.
    pub async fn run(self) -> Result<()> {
        tracing::info!(
            artifact = %self.config.artifact.path.display(),
            process = %self.config.process.name,
            "fleetsync starting"
        );

        let handle = self.seed().await?.spawn();

        wait_for_shutdown().await?;
        tracing::info!("Received shutdown signal");

        handle.abort();
        Ok(())
    }
}

#[cfg(unix)]
async fn wait_for_shutdown() -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).map_err(FleetError::Io)?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map_err(FleetError::Io),
        _ = terminate.recv() => Ok(()),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await.map_err(FleetError::Io)
}
