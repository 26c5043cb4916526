use std::future::Future;
use std::pin::Pin;

use fleetsync_core::RestartError;
use tokio::process::Command;

use super::{ProcessController, RestartOutcome};

/// Restarts processes with the `pidof` and `kill` utilities.
#[derive(Debug, Clone)]
pub struct PidofController {
    pidof_program: String,
    kill_program: String,
}

impl PidofController {
    /// Create a controller using `pidof` and `kill` from `PATH`.
    pub fn new() -> Self {
        Self::with_programs("pidof", "kill")
    }

    /// Create a controller using alternative lookup and kill programs.
    pub fn with_programs(pidof: impl Into<String>, kill: impl Into<String>) -> Self {
        Self {
            pidof_program: pidof.into(),
            kill_program: kill.into(),
        }
    }

    /// Find pids of processes named `name`.
    pub async fn find_pids(&self, name: &str) -> Result<Vec<u32>, RestartError> {
        if name.trim().is_empty() {
            return Err(RestartError::EmptyName);
        }

        let output = Command::new(&self.pidof_program)
            .arg(name)
            .output()
            .await
            .map_err(|source| RestartError::Spawn {
                program: self.pidof_program.clone(),
                name: name.to_string(),
                source,
            })?;

        if !output.status.success() {
            // pidof exits 1 when nothing matches
            if output.status.code() == Some(1) {
                return Ok(Vec::new());
            }
            return Err(RestartError::Lookup {
                name: name.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        parse_pids(&String::from_utf8_lossy(&output.stdout))
    }

    async fn terminate(&self, name: &str) -> Result<RestartOutcome, RestartError> {
        let pids = self.find_pids(name).await?;
        if pids.is_empty() {
            tracing::info!(process = name, "No running process found, nothing to restart");
            return Ok(RestartOutcome::NotRunning);
        }

        tracing::info!(process = name, pids = ?pids, "Sending termination signal");

        let output = Command::new(&self.kill_program)
            .args(pids.iter().map(|pid| pid.to_string()))
            .output()
            .await
            .map_err(|source| RestartError::Spawn {
                program: self.kill_program.clone(),
                name: name.to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("{} exited with {}", self.kill_program, output.status)
            } else {
                stderr
            };
            return Err(RestartError::Terminate { pids, message });
        }

        Ok(RestartOutcome::Signalled { pids })
    }
}

impl Default for PidofController {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessController for PidofController {
    fn restart<'a>(
        &'a self,
        name: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<RestartOutcome, RestartError>> + Send + 'a>> {
        Box::pin(self.terminate(name))
    }
}

/// Parse whitespace-separated pids.
fn parse_pids(output: &str) -> Result<Vec<u32>, RestartError> {
    output
        .split_whitespace()
        .map(|raw| {
            raw.parse::<u32>()
                .map_err(|_| RestartError::InvalidPid(raw.to_string()))
        })
        .collect()
}
