//! Membership reconciliation loop.
//!
//! One task owns the loop and its [`ReconciliationState`]. Each tick runs a
//! full cycle before the next tick is awaited, so cycles never overlap.

mod state;

pub use state::{CycleOutcome, Phase, ReconciliationState};

use std::sync::Arc;
use std::time::Duration;

use fleetsync_core::{
    has_changed, Clock, CooldownGate, FleetConfig, FleetError, MembershipDelta, SystemClock,
};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::directory::PeerDirectory;
use crate::materialize::ConfigMaterializer;
use crate::process::ProcessController;

/// Reconciliation loop configuration.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Time between cycles.
    pub interval: Duration,
    /// Minimum time between two restarts.
    pub cooldown: Duration,
    /// Name of the managed process.
    pub process_name: String,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            cooldown: Duration::from_secs(180),
            process_name: "restate-server".to_string(),
        }
    }
}

impl From<&FleetConfig> for ReconcileConfig {
    fn from(config: &FleetConfig) -> Self {
        Self {
            interval: config.watch.interval(),
            cooldown: config.watch.cooldown(),
            process_name: config.process.name.clone(),
        }
    }
}

/// Collaborators the loop drives.
#[derive(Clone)]
pub struct Components {
    pub directory: Arc<dyn PeerDirectory>,
    pub materializer: ConfigMaterializer,
    pub controller: Arc<dyn ProcessController>,
    pub clock: Arc<dyn Clock>,
}

impl Components {
    /// Create components using the system clock.
    pub fn new(
        directory: Arc<dyn PeerDirectory>,
        materializer: ConfigMaterializer,
        controller: Arc<dyn ProcessController>,
    ) -> Self {
        Self {
            directory,
            materializer,
            controller,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// The membership reconciliation loop.
pub struct ReconcileLoop {
    components: Components,
    gate: CooldownGate,
    config: ReconcileConfig,
    state: ReconciliationState,
}

impl ReconcileLoop {
    /// Resolve and write the first artifact, without restarting anything.
    ///
    /// Any failure here is fatal for startup.
    pub async fn seed(components: Components, config: ReconcileConfig) -> Result<Self, FleetError> {
        let snapshot = components.directory.resolve().await?;
        components.materializer.materialize(&snapshot)?;

        tracing::info!(
            app = %snapshot.app_name,
            region = %snapshot.region,
            peers = %snapshot.peers,
            "Seeded config artifact"
        );

        Ok(Self::from_state(
            components,
            config,
            ReconciliationState::seeded(snapshot),
        ))
    }

    /// Build a loop around existing state.
    pub fn from_state(
        components: Components,
        config: ReconcileConfig,
        state: ReconciliationState,
    ) -> Self {
        Self {
            gate: CooldownGate::new(config.cooldown),
            components,
            config,
            state,
        }
    }

    pub fn state(&self) -> &ReconciliationState {
        &self.state
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Run one resolve, compare, gate, apply pass.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        tracing::debug!(phase = %Phase::Resolving, "Reconciliation cycle starting");

        let candidate = match self.components.directory.resolve().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to resolve fleet membership");
                return CycleOutcome::DiscoveryFailed(e);
            }
        };

        tracing::debug!(phase = %Phase::Comparing, peers = %candidate.peers, "Resolved candidate");
        if !has_changed(&self.state.last_applied.peers, &candidate.peers) {
            return CycleOutcome::Unchanged;
        }

        let delta = MembershipDelta::between(&self.state.last_applied.peers, &candidate.peers);
        let now = self.components.clock.now();

        if !self.gate.permits(self.state.last_action_time, now) {
            let reopens_at = self
                .state
                .last_action_time
                .map(|last| self.gate.reopens_at(last))
                .unwrap_or(now);
            tracing::info!(
                phase = %Phase::Gated,
                added = ?delta.added,
                removed = ?delta.removed,
                reopens_at = %reopens_at,
                "Membership changed, but cooldown period not expired"
            );
            return CycleOutcome::Gated { delta, reopens_at };
        }

        tracing::debug!(phase = %Phase::Applying, "Applying membership change");
        if let Err(e) = self.components.materializer.materialize(&candidate) {
            tracing::error!(error = %e, "Failed to write config artifact");
            return CycleOutcome::RenderFailed(e);
        }

        tracing::info!(
            process = %self.config.process_name,
            peers = %candidate.peers,
            added = ?delta.added,
            removed = ?delta.removed,
            "Restarting managed process"
        );

        let restart = self
            .components
            .controller
            .restart(&self.config.process_name)
            .await;

        match &restart {
            Ok(outcome) => tracing::info!(
                signalled = outcome.signalled_count(),
                "Restart requested"
            ),
            Err(e) => tracing::warn!(error = %e, "Failed to restart managed process"),
        }

        // The artifact is authoritative once written, whatever the restart did.
        self.state.last_applied = candidate;
        self.state.last_action_time = Some(self.components.clock.now());

        CycleOutcome::Applied { delta, restart }
    }

    /// Run cycles on a fixed interval for the rest of the process lifetime.
    pub async fn run(mut self) {
        let period = self.config.interval;
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = period.as_secs(),
            cooldown_secs = self.config.cooldown.as_secs(),
            "Watching fleet membership"
        );

        loop {
            ticker.tick().await;
            let outcome = self.run_cycle().await;
            tracing::debug!(phase = %outcome.final_phase(), "Reconciliation cycle finished");
        }
    }

    /// Spawn the loop onto the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::RestartOutcome;
    use crate::directory::{DirectoryEnv, FleetDirectory};
    use crate::testing::{ManualClock, RecordingController, ScriptedDirectory, StaticTxtSource};
    use fleetsync_core::config::DirectoryConfig;
    use fleetsync_core::{ConfigTemplate, DiscoveryError, RenderError};
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    const A: &str = "a.vm.x.internal";
    const B: &str = "b.vm.x.internal";

    struct Harness {
        _dir: TempDir,
        path: PathBuf,
        directory: Arc<ScriptedDirectory>,
        controller: Arc<RecordingController>,
        clock: Arc<ManualClock>,
    }

    impl Harness {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("restate.toml");
            Self {
                _dir: dir,
                path,
                directory: Arc::new(ScriptedDirectory::new("x", &[A])),
                controller: Arc::new(RecordingController::new()),
                clock: Arc::new(ManualClock::default()),
            }
        }

        fn components(&self) -> Components {
            Components::new(
                self.directory.clone(),
                ConfigMaterializer::new(&self.path, ConfigTemplate::new("peers = {{peers}}\n")),
                self.controller.clone(),
            )
            .with_clock(self.clock.clone())
        }

        async fn seeded(&self) -> ReconcileLoop {
            ReconcileLoop::seed(self.components(), ReconcileConfig::default())
                .await
                .unwrap()
        }
    }

    fn artifact_peers(path: &Path) -> Vec<String> {
        let parsed: toml::Value = toml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        parsed["peers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_seed_writes_artifact_without_restart() {
        let h = Harness::new();
        let reconciler = h.seeded().await;

        assert_eq!(artifact_peers(&h.path), vec![A]);
        assert_eq!(reconciler.state().last_applied.peers.as_slice(), &[A]);
        assert!(reconciler.state().last_action_time.is_none());
        assert!(h.controller.calls().is_empty());
    }

    #[tokio::test]
    async fn test_seed_failure_is_fatal() {
        let h = Harness::new();
        h.directory.fail_next();

        let result = ReconcileLoop::seed(h.components(), ReconcileConfig::default()).await;
        assert!(matches!(result, Err(FleetError::Discovery(_))));
        assert!(!h.path.exists());
    }

    #[tokio::test]
    async fn test_unchanged_membership_is_noop() {
        let h = Harness::new();
        let mut reconciler = h.seeded().await;

        let outcome = reconciler.run_cycle().await;
        assert!(matches!(outcome, CycleOutcome::Unchanged));
        assert!(h.controller.calls().is_empty());
    }

    #[tokio::test]
    async fn test_membership_growth_applies_and_restarts_once() {
        let h = Harness::new();
        let mut reconciler = h.seeded().await;
        h.clock.advance(Duration::from_secs(600));
        h.directory.set_peers(&[A, B]);

        let outcome = reconciler.run_cycle().await;

        match outcome {
            CycleOutcome::Applied { delta, restart } => {
                assert_eq!(delta.added, vec![B.to_string()]);
                assert!(delta.removed.is_empty());
                assert_eq!(restart.unwrap(), RestartOutcome::Signalled { pids: vec![1] });
            }
            other => panic!("expected Applied, got {:?}", other),
        }
        assert_eq!(artifact_peers(&h.path), vec![A, B]);
        assert_eq!(h.controller.calls(), vec!["restate-server".to_string()]);
        assert_eq!(reconciler.state().last_applied.peers.as_slice(), &[A, B]);
        assert_eq!(reconciler.state().last_action_time, Some(h.clock.now()));

        // A second identical resolution changes nothing.
        let outcome = reconciler.run_cycle().await;
        assert!(matches!(outcome, CycleOutcome::Unchanged));
        assert_eq!(h.controller.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_cooldown_denies_and_discards_candidate() {
        let h = Harness::new();
        let mut reconciler = h.seeded().await;

        // First change is accepted and arms the cooldown.
        h.directory.set_peers(&[A, B]);
        assert!(reconciler.run_cycle().await.is_applied());
        let applied_at = reconciler.state().last_action_time.unwrap();
        let artifact_before = std::fs::read_to_string(&h.path).unwrap();

        h.clock.advance(Duration::from_secs(60));
        h.directory.set_peers(&[A]);
        let outcome = reconciler.run_cycle().await;

        match outcome {
            CycleOutcome::Gated { delta, reopens_at } => {
                assert_eq!(delta.removed, vec![B.to_string()]);
                assert_eq!(reopens_at, applied_at + chrono::Duration::seconds(180));
            }
            other => panic!("expected Gated, got {:?}", other),
        }
        assert_eq!(h.controller.calls().len(), 1);
        assert_eq!(std::fs::read_to_string(&h.path).unwrap(), artifact_before);
        assert_eq!(reconciler.state().last_applied.peers.as_slice(), &[A, B]);
        assert_eq!(reconciler.state().last_action_time, Some(applied_at));
    }

    #[tokio::test]
    async fn test_gated_change_applies_once_cooldown_elapses() {
        let h = Harness::new();
        let mut reconciler = h.seeded().await;

        h.directory.set_peers(&[A, B]);
        assert!(reconciler.run_cycle().await.is_applied());

        h.directory.set_peers(&[A]);
        h.clock.advance(Duration::from_secs(179));
        assert!(matches!(
            reconciler.run_cycle().await,
            CycleOutcome::Gated { .. }
        ));

        h.clock.advance(Duration::from_secs(1));
        assert!(reconciler.run_cycle().await.is_applied());
        assert_eq!(artifact_peers(&h.path), vec![A]);
        assert_eq!(h.controller.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_cooldown_not_elapsed_from_fresh_state() {
        let h = Harness::new();
        let seeded = h.seeded().await;
        let artifact_before = std::fs::read_to_string(&h.path).unwrap();

        // Recent action recorded: the gate is closed.
        let mut state = seeded.state().clone();
        state.last_action_time = Some(h.clock.now());
        let mut reconciler =
            ReconcileLoop::from_state(h.components(), ReconcileConfig::default(), state);

        h.clock.advance(Duration::from_secs(30));
        h.directory.set_peers(&[A, B]);

        assert!(matches!(
            reconciler.run_cycle().await,
            CycleOutcome::Gated { .. }
        ));
        assert!(h.controller.calls().is_empty());
        assert_eq!(std::fs::read_to_string(&h.path).unwrap(), artifact_before);
        assert_eq!(reconciler.state().last_applied.peers.as_slice(), &[A]);
    }

    #[tokio::test]
    async fn test_discovery_timeout_keeps_state_and_artifact() {
        let h = Harness::new();
        let mut reconciler = h.seeded().await;
        let artifact_before = std::fs::read_to_string(&h.path).unwrap();

        h.directory.set_peers(&[A, B]);
        h.directory.fail_next();

        let outcome = reconciler.run_cycle().await;
        assert!(matches!(outcome, CycleOutcome::DiscoveryFailed(_)));
        assert_eq!(reconciler.state().last_applied.peers.as_slice(), &[A]);
        assert_eq!(std::fs::read_to_string(&h.path).unwrap(), artifact_before);
        assert!(h.controller.calls().is_empty());

        // Next cycle proceeds normally.
        assert!(reconciler.run_cycle().await.is_applied());
        assert_eq!(artifact_peers(&h.path), vec![A, B]);
    }

    #[tokio::test]
    async fn test_garbled_directory_answer_keeps_state_and_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restate.toml");
        let txt = StaticTxtSource::new(vec!["a ams".to_string()]);
        let config = DirectoryConfig {
            interface: "fleetsync-test-missing0".to_string(),
            ..Default::default()
        };
        let env = DirectoryEnv {
            app_name: Some("x".to_string()),
            region: Some("ams".to_string()),
            node_id: Some("test-node".to_string()),
            nameserver: Some("fdaa::3".to_string()),
        };
        let directory =
            FleetDirectory::with_txt_source(config, Arc::new(txt.clone())).with_env(env);
        let controller = Arc::new(RecordingController::new());
        let components = Components::new(
            Arc::new(directory),
            ConfigMaterializer::new(&path, ConfigTemplate::new("peers = {{peers}}\n")),
            controller.clone(),
        )
        .with_clock(Arc::new(ManualClock::default()));

        let mut reconciler = ReconcileLoop::seed(components, ReconcileConfig::default())
            .await
            .unwrap();
        let artifact_before = std::fs::read_to_string(&path).unwrap();

        txt.set_records(vec!["garbage".to_string(), "junk".to_string()]);
        let outcome = reconciler.run_cycle().await;

        assert!(matches!(
            outcome,
            CycleOutcome::DiscoveryFailed(DiscoveryError::NoValidRecords { .. })
        ));
        assert_eq!(reconciler.state().last_applied.peers.as_slice(), &[A]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), artifact_before);
        assert!(controller.calls().is_empty());
    }

    #[tokio::test]
    async fn test_render_failure_does_not_advance_state() {
        let h = Harness::new();
        let seeded = h.seeded().await;
        let state = seeded.state().clone();

        let components = Components {
            materializer: ConfigMaterializer::new(&h.path, ConfigTemplate::new("{{nope}}")),
            ..h.components()
        };
        let mut reconciler =
            ReconcileLoop::from_state(components, ReconcileConfig::default(), state);
        h.directory.set_peers(&[A, B]);

        let outcome = reconciler.run_cycle().await;
        assert!(matches!(
            outcome,
            CycleOutcome::RenderFailed(RenderError::UnknownPlaceholder(_))
        ));
        assert_eq!(artifact_peers(&h.path), vec![A]);
        assert_eq!(reconciler.state().last_applied.peers.as_slice(), &[A]);
        assert!(reconciler.state().last_action_time.is_none());
        assert!(h.controller.calls().is_empty());
    }

    #[tokio::test]
    async fn test_restart_failure_still_commits_state() {
        let h = Harness::new();
        let mut reconciler = h.seeded().await;
        h.controller.fail_with("permission denied");
        h.directory.set_peers(&[A, B]);

        let outcome = reconciler.run_cycle().await;
        match outcome {
            CycleOutcome::Applied { restart, .. } => assert!(restart.is_err()),
            other => panic!("expected Applied, got {:?}", other),
        }
        assert_eq!(artifact_peers(&h.path), vec![A, B]);
        assert_eq!(reconciler.state().last_applied.peers.as_slice(), &[A, B]);
        assert!(reconciler.state().last_action_time.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_on_interval() {
        let h = Harness::new();
        let reconciler = h.seeded().await;
        assert_eq!(h.directory.resolve_count(), 1);

        let config = ReconcileConfig {
            interval: Duration::from_secs(60),
            ..reconciler.config().clone()
        };
        let reconciler =
            ReconcileLoop::from_state(h.components(), config, reconciler.state().clone());
        let handle = reconciler.spawn();

        tokio::time::sleep(Duration::from_secs(125)).await;
        assert_eq!(h.directory.resolve_count(), 3);

        handle.abort();
    }

    #[test]
    fn test_config_from_fleet_config() {
        let mut fleet = FleetConfig::default();
        fleet.watch.interval_secs = 10;
        fleet.watch.cooldown_secs = 20;
        fleet.process.name = "nats-server".to_string();

        let config = ReconcileConfig::from(&fleet);
        assert_eq!(config.interval, Duration::from_secs(10));
        assert_eq!(config.cooldown, Duration::from_secs(20));
        assert_eq!(config.process_name, "nats-server");
    }

    #[test]
    fn test_default_config() {
        let config = ReconcileConfig::default();
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.cooldown, Duration::from_secs(180));
    }
}
