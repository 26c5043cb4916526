use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use fleetsync_core::DiscoveryError;

/// Addresses of the private fabric interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FabricAddrs {
    pub ipv4: Ipv4Addr,
    pub ipv6: Ipv6Addr,
}

impl Default for FabricAddrs {
    fn default() -> Self {
        Self {
            ipv4: Ipv4Addr::UNSPECIFIED,
            ipv6: Ipv6Addr::UNSPECIFIED,
        }
    }
}

/// Read the addresses of `interface` from the host.
pub fn fabric_addrs(interface: &str) -> Result<FabricAddrs, DiscoveryError> {
    let ifaces = if_addrs::get_if_addrs().map_err(DiscoveryError::Interfaces)?;
    Ok(select_fabric_addrs(
        interface,
        ifaces.iter().map(|iface| (iface.name.as_str(), iface.ip())),
    ))
}

/// Pick the IPv4 and IPv6 address of `interface` from `(name, ip)` pairs.
///
/// Link-local IPv6 addresses are only used when nothing routable exists.
/// Missing families fall back to the unspecified address.
pub fn select_fabric_addrs<'a>(
    interface: &str,
    addrs: impl IntoIterator<Item = (&'a str, IpAddr)>,
) -> FabricAddrs {
    let mut selected = FabricAddrs::default();
    let mut link_local = None;

    for (name, ip) in addrs {
        if name != interface {
            continue;
        }
        match ip {
            IpAddr::V4(v4) => selected.ipv4 = v4,
            IpAddr::V6(v6) if is_link_local(&v6) => link_local = Some(v6),
            IpAddr::V6(v6) => selected.ipv6 = v6,
        }
    }

    if selected.ipv6.is_unspecified() {
        if let Some(v6) = link_local {
            selected.ipv6 = v6;
        }
    }

    selected
}

fn is_link_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}
