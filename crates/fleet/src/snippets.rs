//! Small, validated configuration changes and show-command parsing.
//!
//! Snippets render IOS-style command lines meant for incremental delivery
//! with [`DeviceSession::send_config_set`](crate::session::DeviceSession::send_config_set).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Route-map clause action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    Permit,
    Deny,
}

impl PolicyAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permit => "permit",
            Self::Deny => "deny",
        }
    }
}

impl FromStr for PolicyAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "permit" => Ok(Self::Permit),
            "deny" => Ok(Self::Deny),
            other => Err(Error::Configuration(format!(
                "action must be permit or deny, got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A configuration change built from checked parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Snippet {
    InterfaceAddress {
        interface: String,
        address: Ipv4Addr,
        mask: Ipv4Addr,
    },
    BgpNeighbor {
        local_as: u32,
        neighbor: Ipv4Addr,
        remote_as: u32,
    },
    RouteMap {
        name: String,
        action: PolicyAction,
        sequence: u32,
        prefix_list: String,
    },
}

impl Snippet {
    /// Assign an address to an interface and bring it up.
    pub fn interface_address(interface: &str, address: &str, mask: &str) -> Result<Self> {
        let mask = parse_ipv4("mask", mask)?;
        let bits = u32::from(mask);
        if bits.leading_ones() + bits.trailing_zeros() != 32 {
            return Err(Error::Configuration(format!("mask {mask} is not contiguous")));
        }
        Ok(Self::InterfaceAddress {
            interface: parse_word("interface", interface)?,
            address: parse_ipv4("address", address)?,
            mask,
        })
    }

    /// Add a BGP neighbor under the local AS.
    pub fn bgp_neighbor(local_as: &str, neighbor: &str, remote_as: &str) -> Result<Self> {
        Ok(Self::BgpNeighbor {
            local_as: parse_asn("local AS", local_as)?,
            neighbor: parse_ipv4("neighbor", neighbor)?,
            remote_as: parse_asn("remote AS", remote_as)?,
        })
    }

    /// Add a route-map clause matching a prefix list.
    pub fn route_map(name: &str, action: &str, sequence: &str, prefix_list: &str) -> Result<Self> {
        let sequence = sequence.trim().parse::<u32>().map_err(|_| {
            Error::Configuration(format!("sequence must be a number, got '{}'", sequence.trim()))
        })?;
        Ok(Self::RouteMap {
            name: parse_word("route-map name", name)?,
            action: action.parse()?,
            sequence,
            prefix_list: parse_word("prefix list", prefix_list)?,
        })
    }

    /// Command lines for this change.
    pub fn lines(&self) -> Vec<String> {
        match self {
            Self::InterfaceAddress {
                interface,
                address,
                mask,
            } => vec![
                format!("interface {interface}"),
                format!("ip address {address} {mask}"),
                "no shutdown".to_string(),
            ],
            Self::BgpNeighbor {
                local_as,
                neighbor,
                remote_as,
            } => vec![
                format!("router bgp {local_as}"),
                format!("neighbor {neighbor} remote-as {remote_as}"),
            ],
            Self::RouteMap {
                name,
                action,
                sequence,
                prefix_list,
            } => vec![
                format!("route-map {name} {action} {sequence}"),
                format!("match ip address prefix-list {prefix_list}"),
            ],
        }
    }

    /// Audit action name.
    pub fn action(&self) -> &'static str {
        match self {
            Self::InterfaceAddress { .. } => "configure_ip",
            Self::BgpNeighbor { .. } => "configure_bgp",
            Self::RouteMap { .. } => "configure_policy",
        }
    }
}

fn parse_ipv4(field: &str, value: &str) -> Result<Ipv4Addr> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Configuration(format!("{field} '{}' is not an IPv4 address", value.trim())))
}

fn parse_asn(field: &str, value: &str) -> Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(Error::Configuration(format!(
            "{field} '{}' is not a valid AS number",
            value.trim()
        ))),
        Ok(asn) => Ok(asn),
    }
}

/// A single CLI token: non-empty, no whitespace.
fn parse_word(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return Err(Error::Configuration(format!("{field} must be a single word, got '{value}'")));
    }
    Ok(value.to_string())
}

/// One row of `show ip interface brief`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRow {
    pub intf: String,
    pub ipaddr: String,
    pub status: String,
    pub proto: String,
}

/// Parse interface summary output.
///
/// Understands the IOS layout (`Interface IP-Address OK? Method Status
/// Protocol`) and the four column layout used by other vendors. Returns an
/// empty list when no header is found.
pub fn parse_interface_brief(output: &str) -> Vec<InterfaceRow> {
    let mut lines = output.lines();
    let Some(header) = lines.by_ref().find(|l| {
        let lower = l.to_lowercase();
        lower.trim_start().starts_with("interface") && lower.contains("protocol")
    }) else {
        return Vec::new();
    };
    let ios_layout = header.contains("OK?");
    let min_columns = if ios_layout { 6 } else { 4 };

    lines
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            if cols.len() < min_columns {
                return None;
            }
            let status_start = if ios_layout { 4 } else { 2 };
            let last = cols.len() - 1;
            Some(InterfaceRow {
                intf: cols[0].to_string(),
                ipaddr: cols[1].to_string(),
                status: cols[status_start..last].join(" "),
                proto: cols[last].to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_address_lines() {
        let snippet = Snippet::interface_address("GigabitEthernet0/1", "10.1.1.1", "255.255.255.0").unwrap();
        assert_eq!(
            snippet.lines(),
            vec![
                "interface GigabitEthernet0/1",
                "ip address 10.1.1.1 255.255.255.0",
                "no shutdown"
            ]
        );
        assert_eq!(snippet.action(), "configure_ip");
    }

    #[test]
    fn test_interface_address_validation() {
        assert!(Snippet::interface_address("Gi0/1", "10.1.1.300", "255.255.255.0").is_err());
        assert!(Snippet::interface_address("Gi0/1", "10.1.1.1", "255.0.255.0").is_err());
        assert!(Snippet::interface_address("Gi0/1 shutdown", "10.1.1.1", "255.255.255.0").is_err());
        assert!(Snippet::interface_address("", "10.1.1.1", "255.255.255.0").is_err());
    }

    #[test]
    fn test_bgp_neighbor() {
        let snippet = Snippet::bgp_neighbor("65000", "192.0.2.2", "65001").unwrap();
        assert_eq!(
            snippet.lines(),
            vec!["router bgp 65000", "neighbor 192.0.2.2 remote-as 65001"]
        );
        assert!(Snippet::bgp_neighbor("65000", "192.0.2.2", "sixty").is_err());
        assert!(Snippet::bgp_neighbor("0", "192.0.2.2", "65001").is_err());
        assert!(Snippet::bgp_neighbor("4294967296", "192.0.2.2", "65001").is_err());
    }

    #[test]
    fn test_route_map() {
        let snippet = Snippet::route_map("TO-ISP", "Deny", "10", "BOGONS").unwrap();
        assert_eq!(
            snippet.lines(),
            vec!["route-map TO-ISP deny 10", "match ip address prefix-list BOGONS"]
        );
        let err = Snippet::route_map("TO-ISP", "drop", "10", "BOGONS").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_parse_ios_brief() {
        let output = "\
Interface              IP-Address      OK? Method Status                Protocol
GigabitEthernet0/0     10.0.0.1        YES NVRAM  up                    up
GigabitEthernet0/1     unassigned      YES NVRAM  administratively down down
Loopback0              1.1.1.1         YES manual up                    up
";
        let rows = parse_interface_brief(output);
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows[1],
            InterfaceRow {
                intf: "GigabitEthernet0/1".into(),
                ipaddr: "unassigned".into(),
                status: "administratively down".into(),
                proto: "down".into(),
            }
        );
    }

    #[test]
    fn test_parse_four_column_brief() {
        let output = "\
Interface                         IP Address/Mask      Physical   Protocol
GigabitEthernet0/0/0              10.1.1.1/24          up         up
";
        let rows = parse_interface_brief(output);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ipaddr, "10.1.1.1/24");
        assert_eq!(rows[0].status, "up");
    }

    #[test]
    fn test_parse_unrecognized_output() {
        assert!(parse_interface_brief("% Invalid input detected").is_empty());
    }
}
