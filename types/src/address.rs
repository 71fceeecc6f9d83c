//! Network service address announced by a safenode.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::error::SafenodeError;
use crate::network::NetworkId;

/// IP and port a safenode accepts connections on.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceAddr(SocketAddr);

impl ServiceAddr {
    pub fn new(addr: SocketAddr) -> Self {
        Self(addr)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.0
    }

    pub fn port(&self) -> u16 {
        self.0.port()
    }

    /// Parse `ip:port`.
    pub fn parse(s: &str) -> Result<Self, SafenodeError> {
        s.trim()
            .parse::<SocketAddr>()
            .map(Self)
            .map_err(|_| SafenodeError::InvalidAddress(s.to_string()))
    }

    /// Whether this address may be announced on `network`.
    ///
    /// Safenodes are reachable over IPv4 only. On the live network the address
    /// must be publicly routable and use the live default port; other networks
    /// must not squat the live port. The dev network also accepts local
    /// addresses.
    pub fn is_valid_for(&self, network: NetworkId) -> bool {
        let IpAddr::V4(ip) = self.0.ip() else {
            return false;
        };
        let live_port = NetworkId::Live.default_port();
        match network {
            NetworkId::Live => is_routable(&ip) && self.port() == live_port,
            NetworkId::Test => is_routable(&ip) && self.port() != live_port,
            NetworkId::Dev => !ip.is_unspecified() && self.port() != live_port,
        }
    }
}

fn is_routable(ip: &Ipv4Addr) -> bool {
    !(ip.is_unspecified()
        || ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_documentation()
        || ip.is_multicast())
}

impl fmt::Debug for ServiceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceAddr({})", self.0)
    }
}

impl fmt::Display for ServiceAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ServiceAddr {
    type Err = SafenodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> ServiceAddr {
        ServiceAddr::parse(s).unwrap()
    }

    #[test]
    fn live_requires_default_port_and_public_ip() {
        assert!(addr("8.8.8.8:5565").is_valid_for(NetworkId::Live));
        assert!(!addr("8.8.8.8:5566").is_valid_for(NetworkId::Live));
        assert!(!addr("192.168.1.10:5565").is_valid_for(NetworkId::Live));
        assert!(!addr("127.0.0.1:5565").is_valid_for(NetworkId::Live));
    }

    #[test]
    fn test_network_rejects_live_port() {
        assert!(addr("8.8.8.8:15565").is_valid_for(NetworkId::Test));
        assert!(!addr("8.8.8.8:5565").is_valid_for(NetworkId::Test));
    }

    #[test]
    fn dev_accepts_loopback() {
        assert!(addr("127.0.0.1:25565").is_valid_for(NetworkId::Dev));
        assert!(!addr("0.0.0.0:25565").is_valid_for(NetworkId::Dev));
    }

    #[test]
    fn ipv6_is_never_valid() {
        assert!(!addr("[2001:4860::8888]:5565").is_valid_for(NetworkId::Live));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(ServiceAddr::parse("not-an-address").is_err());
        assert!(ServiceAddr::parse("1.2.3.4").is_err());
    }
}
