mod directory;
mod watch;

pub use directory::DirectoryConfig;
pub use watch::WatchConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FleetError, Result};
use crate::render::DEFAULT_PEER_PORT;

/// Root configuration for fleetsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Reconciliation timing.
    #[serde(default)]
    pub watch: WatchConfig,

    /// Peer directory.
    #[serde(default)]
    pub directory: DirectoryConfig,

    /// Rendered config artifact.
    #[serde(default)]
    pub artifact: ArtifactConfig,

    /// Managed process.
    #[serde(default)]
    pub process: ProcessConfig,
}

impl FleetConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| FleetError::Config(format!("Failed to read config file: {}", e)))?;

        Self::parse_toml(&content)
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn from_file_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse configuration from a TOML string.
    pub fn parse_toml(content: &str) -> Result<Self> {
        // Substitute environment variables
        let content = substitute_env_vars(content);

        let config: Self = toml::from_str(&content)
            .map_err(|e| FleetError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.watch.interval_secs == 0 {
            return Err(FleetError::Config(
                "watch.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.process.name.trim().is_empty() {
            return Err(FleetError::Config("process.name cannot be empty".to_string()));
        }
        if self.directory.attempts == 0 {
            return Err(FleetError::Config(
                "directory.attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Config artifact configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Where the rendered config is written.
    #[serde(default = "default_artifact_path")]
    pub path: PathBuf,

    /// Template file; the built-in Restate template when unset.
    pub template: Option<PathBuf>,

    /// Port peers are reached on.
    #[serde(default = "default_peer_port")]
    pub peer_port: u16,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: default_artifact_path(),
            template: None,
            peer_port: default_peer_port(),
        }
    }
}

fn default_artifact_path() -> PathBuf {
    PathBuf::from("/etc/restate.toml")
}

fn default_peer_port() -> u16 {
    DEFAULT_PEER_PORT
}

/// Managed process configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessConfig {
    /// Name the managed process runs under.
    #[serde(default = "default_process_name")]
    pub name: String,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            name: default_process_name(),
        }
    }
}

fn default_process_name() -> String {
    "restate-server".to_string()
}

/// Substitute environment variables in the format ${VAR_NAME}.
fn substitute_env_vars(content: &str) -> String {
    static ENV_RE: once_cell::sync::Lazy<regex_lite::Regex> = once_cell::sync::Lazy::new(|| {
        regex_lite::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var regex is valid")
    });

    let mut result = content.to_string();
    for cap in ENV_RE.captures_iter(content) {
        let var_name = &cap[1];
        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(&cap[0], &value);
        }
    }

    result
}
