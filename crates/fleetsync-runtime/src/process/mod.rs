//! Managed process control.
//!
//! Restarting means terminating every running instance; the external
//! supervisor brings the process back up with the fresh config.

mod pidof;

pub use pidof::PidofController;

use std::future::Future;
use std::pin::Pin;

use fleetsync_core::RestartError;

/// Result of a restart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    /// No instance was running.
    NotRunning,
    /// Termination was requested for these pids.
    Signalled { pids: Vec<u32> },
}

impl RestartOutcome {
    /// Number of instances asked to terminate.
    pub fn signalled_count(&self) -> usize {
        match self {
            Self::NotRunning => 0,
            Self::Signalled { pids } => pids.len(),
        }
    }
}

/// Capability to restart the managed process by name.
pub trait ProcessController: Send + Sync {
    fn restart<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<RestartOutcome, RestartError>> + Send + 'a>>;
}
