use std::path::PathBuf;

use thiserror::Error;

/// Failure to resolve the fleet membership for one cycle.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to enumerate network interfaces: {0}")]
    Interfaces(#[source] std::io::Error),

    #[error("Invalid nameserver address '{0}'")]
    InvalidNameserver(String),

    #[error("Directory lookup for {name} failed: {message}")]
    Lookup { name: String, message: String },

    #[error("Directory lookup for {name} timed out after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },

    #[error("Directory answer for {name} had {records} record(s) but no valid entries")]
    NoValidRecords { name: String, records: usize },
}

/// Failure to render or persist the config artifact.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Template references unknown placeholder '{0}'")]
    UnknownPlaceholder(String),

    #[error("Failed to read template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config artifact {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure to stop the managed process.
#[derive(Error, Debug)]
pub enum RestartError {
    #[error("Process name cannot be empty")]
    EmptyName,

    #[error("Failed to run {program} for '{name}': {source}")]
    Spawn {
        program: String,
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Process lookup for '{name}' exited with code {code:?}: {stderr}")]
    Lookup {
        name: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Unparseable pid '{0}' in process lookup output")]
    InvalidPid(String),

    #[error("Failed to terminate pids {pids:?}: {message}")]
    Terminate { pids: Vec<u32>, message: String },
}

/// Top-level error type for fleetsync operations.
#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Restart error: {0}")]
    Restart(#[from] RestartError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for FleetError {
    fn from(e: serde_json::Error) -> Self {
        FleetError::Serialization(e.to_string())
    }
}

/// Result type alias using FleetError.
pub type Result<T> = std::result::Result<T, FleetError>;
