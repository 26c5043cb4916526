use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;
use crate::membership::MembershipSet;

/// App name used when no fleet identity is configured.
pub const LOCAL_APP_NAME: &str = "local";

/// Region used when the environment does not name one.
pub const LOCAL_REGION: &str = "local";

/// Host and sole peer used when no fleet identity is configured.
pub const LOCAL_HOST: &str = "localhost";

/// Everything needed to render the managed process's config at one point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    /// Fleet / application name.
    pub app_name: String,
    /// Region label of this machine.
    pub region: String,
    /// Host name the managed process advertises.
    pub host: String,
    /// Identifier of this machine.
    pub node_id: String,
    /// Fabric-facing IPv4 address.
    pub ipv4: Ipv4Addr,
    /// Fabric-facing IPv6 address.
    pub ipv6: Ipv6Addr,
    /// Current peer hosts.
    pub peers: MembershipSet,
    /// When the snapshot was taken.
    pub timestamp: Timestamp,
}

impl EnvironmentSnapshot {
    /// Snapshot for standalone mode: one synthetic peer for self, unspecified addresses.
    pub fn standalone(region: impl Into<String>, node_id: impl Into<String>, now: Timestamp) -> Self {
        Self {
            app_name: LOCAL_APP_NAME.to_string(),
            region: region.into(),
            host: LOCAL_HOST.to_string(),
            node_id: node_id.into(),
            ipv4: Ipv4Addr::UNSPECIFIED,
            ipv6: Ipv6Addr::UNSPECIFIED,
            peers: MembershipSet::single(LOCAL_HOST),
            timestamp: now,
        }
    }

    /// Check if this snapshot was built without a fleet identity.
    pub fn is_standalone(&self) -> bool {
        self.app_name == LOCAL_APP_NAME && self.host == LOCAL_HOST
    }

    /// Whether membership differs from `other`. Other fields are ignored.
    pub fn membership_changed(&self, other: &EnvironmentSnapshot) -> bool {
        crate::membership::has_changed(&self.peers, &other.peers)
    }
}
