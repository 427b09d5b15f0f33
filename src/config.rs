//! Router configuration.
//!
//! Interfaces are written the way `ip addr` prints them, e.g. `10.0.1.1/24`.
//! Interface `i` of the router is the `i`-th entry of
//! [`RouterConfig::interfaces`].

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error as ThisError;

use crate::network::ipv4::from_ipv4;
use crate::route::mask;

/// RFC 2453 sends unsolicited responses every 30 seconds.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, ThisError, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Expected ADDRESS/PREFIX_LEN, got {0:?}")]
    BadCidr(String),
    #[error("Invalid IPv4 address {0:?}")]
    BadAddress(String),
    #[error("Invalid prefix length {0:?}")]
    BadPrefixLen(String),
    #[error("The router needs at least one interface")]
    NoInterfaces,
    #[error("Interfaces {0} and {1} are on overlapping networks")]
    OverlappingNetworks(String, String),
}

/// One router interface: its own address and the attached network's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceConfig {
    pub address: Ipv4Addr,
    pub prefix_len: u8,
}

impl InterfaceConfig {
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Self {
        InterfaceConfig {
            address,
            prefix_len,
        }
    }

    /// The interface address as a network-order `u32`.
    pub fn addr(&self) -> u32 {
        from_ipv4(self.address)
    }

    /// The attached network as a network-order `u32`.
    pub fn network(&self) -> u32 {
        self.addr() & mask(self.prefix_len)
    }

    /// Whether the two attached networks share any address.
    pub fn overlaps(&self, other: &InterfaceConfig) -> bool {
        let shorter = mask(self.prefix_len.min(other.prefix_len));
        self.addr() & shorter == other.addr() & shorter
    }
}

impl fmt::Display for InterfaceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for InterfaceConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, prefix_len) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| ConfigError::BadCidr(s.to_string()))?;

        let address = address
            .parse::<Ipv4Addr>()
            .map_err(|_| ConfigError::BadAddress(address.to_string()))?;
        let prefix_len = prefix_len
            .parse::<u8>()
            .ok()
            .filter(|len| *len <= 32)
            .ok_or_else(|| ConfigError::BadPrefixLen(prefix_len.to_string()))?;

        Ok(InterfaceConfig::new(address, prefix_len))
    }
}

/// Whether to answer undeliverable datagrams with ICMP.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum UnreachablePolicy {
    /// Send ICMP Destination Unreachable to the source
    #[default]
    Reply,
    /// Drop silently
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    pub interfaces: Vec<InterfaceConfig>,
    /// Time between unsolicited responses
    pub update_interval: Duration,
    pub unreachable: UnreachablePolicy,
    /// Upper bound on learned routes, if any
    pub max_routes: Option<usize>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        RouterConfig {
            interfaces: Vec::new(),
            update_interval: DEFAULT_UPDATE_INTERVAL,
            unreachable: UnreachablePolicy::default(),
            max_routes: None,
        }
    }
}

impl RouterConfig {
    /// A default configuration for the given `ADDRESS/LEN` interfaces.
    pub fn from_cidrs<S: AsRef<str>>(cidrs: &[S]) -> Result<Self, ConfigError> {
        let interfaces = cidrs
            .iter()
            .map(|cidr| cidr.as_ref().parse())
            .collect::<Result<Vec<InterfaceConfig>, _>>()?;

        let config = RouterConfig {
            interfaces,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Check there is at least one interface and that no two interfaces
    /// share any part of their networks.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interfaces.is_empty() {
            return Err(ConfigError::NoInterfaces);
        }

        for (i, a) in self.interfaces.iter().enumerate() {
            for b in &self.interfaces[i + 1..] {
                if a.overlaps(b) {
                    return Err(ConfigError::OverlappingNetworks(a.to_string(), b.to_string()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interface() {
        let iface: InterfaceConfig = "10.0.1.1/24".parse().unwrap();
        assert_eq!(iface.address, Ipv4Addr::new(10, 0, 1, 1));
        assert_eq!(iface.prefix_len, 24);
        assert_eq!(iface.network().to_ne_bytes(), [10, 0, 1, 0]);
        assert_eq!(iface.addr().to_ne_bytes(), [10, 0, 1, 1]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            "10.0.1.1".parse::<InterfaceConfig>(),
            Err(ConfigError::BadCidr("10.0.1.1".to_string()))
        );
        assert_eq!(
            "10.0.1/24".parse::<InterfaceConfig>(),
            Err(ConfigError::BadAddress("10.0.1".to_string()))
        );
        assert_eq!(
            "10.0.1.1/33".parse::<InterfaceConfig>(),
            Err(ConfigError::BadPrefixLen("33".to_string()))
        );
    }

    #[test]
    fn test_from_cidrs() {
        let config = RouterConfig::from_cidrs(&["10.0.0.1/24", "10.0.1.1/24"]).unwrap();
        assert_eq!(config.interfaces.len(), 2);
        assert_eq!(config.update_interval, DEFAULT_UPDATE_INTERVAL);
        assert_eq!(config.unreachable, UnreachablePolicy::Reply);

        let none: [&str; 0] = [];
        assert_eq!(
            RouterConfig::from_cidrs(&none),
            Err(ConfigError::NoInterfaces)
        );
    }

    #[test]
    fn test_overlapping_networks_are_rejected() {
        assert_eq!(
            RouterConfig::from_cidrs(&["10.0.1.1/24", "10.0.1.2/24"]),
            Err(ConfigError::OverlappingNetworks(
                "10.0.1.1/24".to_string(),
                "10.0.1.2/24".to_string()
            ))
        );
        // a network nested inside another one
        assert!(matches!(
            RouterConfig::from_cidrs(&["10.0.0.1/16", "10.0.1.1/24"]),
            Err(ConfigError::OverlappingNetworks(..))
        ));

        let a: InterfaceConfig = "10.0.1.1/24".parse().unwrap();
        let b: InterfaceConfig = "10.0.2.1/24".parse().unwrap();
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&a));
        assert_eq!(a.to_string(), "10.0.1.1/24");
    }
}
