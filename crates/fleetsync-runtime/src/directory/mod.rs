//! Peer directory client.
//!
//! Resolves the current [`EnvironmentSnapshot`] from process environment,
//! local interfaces and the fleet's TXT directory.

mod dns;
mod interfaces;

pub use dns::{parse_nameserver, DnsTxtSource, TxtSource};
pub use interfaces::{fabric_addrs, select_fabric_addrs, FabricAddrs};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use fleetsync_core::config::DirectoryConfig;
use fleetsync_core::discovery::{directory_query_name, parse_peer_records};
use fleetsync_core::snapshot::{LOCAL_APP_NAME, LOCAL_REGION};
use fleetsync_core::{DiscoveryError, EnvironmentSnapshot, MembershipSet, Timestamp};

/// Something that can resolve the current environment and membership.
pub trait PeerDirectory: Send + Sync {
    fn resolve(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<EnvironmentSnapshot, DiscoveryError>> + Send + '_>>;
}

/// Environment inputs for one resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEnv {
    /// Fleet name. `None` selects standalone mode.
    pub app_name: Option<String>,
    pub region: Option<String>,
    pub node_id: Option<String>,
    pub nameserver: Option<String>,
}

impl DirectoryEnv {
    /// Read the variables named in `config` from the process environment.
    pub fn from_process(config: &DirectoryConfig) -> Self {
        Self {
            app_name: non_empty_var(&config.app_name_var),
            region: non_empty_var(&config.region_var),
            node_id: non_empty_var(&config.node_id_var),
            nameserver: non_empty_var(&config.nameserver_var),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Directory client for fleets published as `vms.<app>.internal` TXT records.
#[derive(Clone)]
pub struct FleetDirectory {
    config: DirectoryConfig,
    txt: Arc<dyn TxtSource>,
    env: Option<DirectoryEnv>,
}

impl FleetDirectory {
    /// Create a directory client doing real DNS lookups.
    pub fn new(config: DirectoryConfig) -> Self {
        let txt = DnsTxtSource::new(config.port, config.timeout(), config.attempts);
        Self::with_txt_source(config, Arc::new(txt))
    }

    /// Create a directory client with a custom TXT source.
    pub fn with_txt_source(config: DirectoryConfig, txt: Arc<dyn TxtSource>) -> Self {
        Self {
            config,
            txt,
            env: None,
        }
    }

    /// Resolve with fixed environment inputs instead of reading the process environment.
    pub fn with_env(mut self, env: DirectoryEnv) -> Self {
        self.env = Some(env);
        self
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Resolve using explicit environment inputs.
    pub async fn resolve_with(
        &self,
        env: DirectoryEnv,
        now: Timestamp,
    ) -> Result<EnvironmentSnapshot, DiscoveryError> {
        let region = env.region.unwrap_or_else(|| LOCAL_REGION.to_string());
        let node_id = env.node_id.unwrap_or_else(local_node_id);

        let app_name = match env.app_name {
            Some(app_name) => app_name,
            None => {
                tracing::debug!("No fleet identity configured, using standalone snapshot");
                return Ok(EnvironmentSnapshot::standalone(region, node_id, now));
            }
        };

        let addrs = fabric_addrs(&self.config.interface)?;

        let raw_nameserver = env
            .nameserver
            .unwrap_or_else(|| self.config.fallback_nameserver.clone());
        let nameserver = parse_nameserver(&raw_nameserver)?;

        let query = directory_query_name(&app_name);
        let records = self.txt.lookup(nameserver, &query).await?;
        let peers = parse_peer_records(&records, &app_name);

        // An answer where nothing parses is garbage, not an empty fleet
        if peers.is_empty() && !records.is_empty() {
            return Err(DiscoveryError::NoValidRecords {
                name: query,
                records: records.len(),
            });
        }

        let peers = if self.config.sort_peers {
            MembershipSet::sorted(peers)
        } else {
            MembershipSet::new(peers)
        };

        tracing::debug!(app = %app_name, peers = %peers, "Resolved fleet membership");

        Ok(EnvironmentSnapshot {
            app_name,
            region,
            host: self.config.private_host.clone(),
            node_id,
            ipv4: addrs.ipv4,
            ipv6: addrs.ipv6,
            peers,
            timestamp: now,
        })
    }
}

impl PeerDirectory for FleetDirectory {
    fn resolve(
        &self,
    ) -> Pin<Box<dyn Future<Output = Result<EnvironmentSnapshot, DiscoveryError>> + Send + '_>> {
        let env = match &self.env {
            Some(env) => env.clone(),
            None => DirectoryEnv::from_process(&self.config),
        };
        Box::pin(self.resolve_with(env, Utc::now()))
    }
}

fn local_node_id() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| LOCAL_APP_NAME.to_string())
}
