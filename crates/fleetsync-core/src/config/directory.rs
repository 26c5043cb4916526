use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Peer directory configuration.
///
/// The `*_var` fields name environment variables; their values are read
/// on every resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Variable holding the fleet / application name. Unset means standalone mode.
    #[serde(default = "default_app_name_var")]
    pub app_name_var: String,

    /// Variable holding the region label.
    #[serde(default = "default_region_var")]
    pub region_var: String,

    /// Variable holding this machine's id.
    #[serde(default = "default_node_id_var")]
    pub node_id_var: String,

    /// Variable overriding the directory nameserver.
    #[serde(default = "default_nameserver_var")]
    pub nameserver_var: String,

    /// Nameserver used when the override variable is unset.
    #[serde(default = "default_fallback_nameserver")]
    pub fallback_nameserver: String,

    /// Nameserver port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-attempt lookup timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Lookup attempts per resolution.
    #[serde(default = "default_attempts")]
    pub attempts: usize,

    /// Interface carrying the private fabric addresses.
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Host name the managed process advertises when in a fleet.
    #[serde(default = "default_private_host")]
    pub private_host: String,

    /// Sort peers before comparison and rendering.
    #[serde(default = "default_true")]
    pub sort_peers: bool,
}

impl DirectoryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            app_name_var: default_app_name_var(),
            region_var: default_region_var(),
            node_id_var: default_node_id_var(),
            nameserver_var: default_nameserver_var(),
            fallback_nameserver: default_fallback_nameserver(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            attempts: default_attempts(),
            interface: default_interface(),
            private_host: default_private_host(),
            sort_peers: true,
        }
    }
}

fn default_app_name_var() -> String {
    "FLY_APP_NAME".to_string()
}

fn default_region_var() -> String {
    "FLY_REGION".to_string()
}

fn default_node_id_var() -> String {
    "FLY_ALLOC_ID".to_string()
}

fn default_nameserver_var() -> String {
    "FLY_NAMESERVER".to_string()
}

fn default_fallback_nameserver() -> String {
    "fdaa::3".to_string()
}

fn default_port() -> u16 {
    53
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_attempts() -> usize {
    1
}

fn default_interface() -> String {
    "eth0".to_string()
}

fn default_private_host() -> String {
    "fly-local-6pn".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directory_config() {
        let config = DirectoryConfig::default();
        assert_eq!(config.app_name_var, "FLY_APP_NAME");
        assert_eq!(config.fallback_nameserver, "fdaa::3");
        assert_eq!(config.port, 53);
        assert_eq!(config.timeout(), Duration::from_secs(1));
        assert_eq!(config.interface, "eth0");
        assert!(config.sort_peers);
    }

    #[test]
    fn test_parse_directory_config() {
        let toml = r#"
            fallback_nameserver = "127.0.0.1"
            port = 5353
            sort_peers = false
        "#;

        let config: DirectoryConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.fallback_nameserver, "127.0.0.1");
        assert_eq!(config.port, 5353);
        assert!(!config.sort_peers);
        assert_eq!(config.timeout_ms, 1000);
    }
}
