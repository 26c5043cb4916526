use fleetsync_core::{
    DiscoveryError, EnvironmentSnapshot, MembershipDelta, RenderError, RestartError, Timestamp,
};

use crate::process::RestartOutcome;

/// Reconciliation loop phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the next tick.
    Idle,
    /// Querying the peer directory.
    Resolving,
    /// Comparing against the last applied membership.
    Comparing,
    /// Change detected but held back by the cooldown.
    Gated,
    /// Writing the artifact and restarting.
    Applying,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving",
            Self::Comparing => "comparing",
            Self::Gated => "gated",
            Self::Applying => "applying",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State owned by the reconciliation loop.
#[derive(Debug, Clone)]
pub struct ReconciliationState {
    /// Snapshot the current artifact was rendered from.
    pub last_applied: EnvironmentSnapshot,
    /// When the last accepted reconfiguration happened. `None` until the first one.
    pub last_action_time: Option<Timestamp>,
}

impl ReconciliationState {
    /// State right after seeding.
    pub fn seeded(snapshot: EnvironmentSnapshot) -> Self {
        Self {
            last_applied: snapshot,
            last_action_time: None,
        }
    }
}

/// What one reconciliation cycle did.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Membership matched the last applied snapshot.
    Unchanged,
    /// Membership changed but the cooldown has not elapsed; the candidate was dropped.
    Gated {
        delta: MembershipDelta,
        reopens_at: Timestamp,
    },
    /// Artifact rewritten and state committed.
    Applied {
        delta: MembershipDelta,
        restart: Result<RestartOutcome, RestartError>,
    },
    /// Directory lookup failed; nothing changed.
    DiscoveryFailed(DiscoveryError),
    /// Artifact could not be written; nothing changed.
    RenderFailed(RenderError),
}

impl CycleOutcome {
    /// Phase the cycle ended in before returning to idle.
    pub fn final_phase(&self) -> Phase {
        match self {
            Self::Unchanged => Phase::Comparing,
            Self::Gated { .. } => Phase::Gated,
            Self::Applied { .. } | Self::RenderFailed(_) => Phase::Applying,
            Self::DiscoveryFailed(_) => Phase::Resolving,
        }
    }

    /// Check whether the state was advanced.
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_phase_as_str() {
        assert_eq!(Phase::Idle.as_str(), "idle");
        assert_eq!(Phase::Gated.to_string(), "gated");
    }

    #[test]
    fn test_seeded_state_has_open_gate() {
        let state =
            ReconciliationState::seeded(EnvironmentSnapshot::standalone("local", "a", Utc::now()));
        assert!(state.last_action_time.is_none());
    }

    #[test]
    fn test_final_phase() {
        assert_eq!(CycleOutcome::Unchanged.final_phase(), Phase::Comparing);
        assert_eq!(
            CycleOutcome::DiscoveryFailed(DiscoveryError::InvalidNameserver("x".into()))
                .final_phase(),
            Phase::Resolving
        );
        let applied = CycleOutcome::Applied {
            delta: MembershipDelta::default(),
            restart: Ok(RestartOutcome::NotRunning),
        };
        assert_eq!(applied.final_phase(), Phase::Applying);
        assert!(applied.is_applied());
    }
}
