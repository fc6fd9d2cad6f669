//! Filter rule data structures and pf rule text generation
//!
//! A [`Rule`] describes one pf filter statement. It is mutable until
//! [`Rule::commit`] is called; after that every setter is inert. A [`RuleSet`]
//! only accepts committed rules and serializes them, in insertion order, to the
//! newline-separated program pfctl loads into an anchor.
//!
//! # Rule text
//!
//! ```text
//! <action> [<direction>] [log] [on <iface>] [proto <proto>] from <src|any> [port <p>] to <dst|any> [port <p>]
//! ```
//!
//! # Example
//!
//! ```
//! use pfkit::core::firewall::{Action, Direction, Protocol, Rule, RuleSet};
//!
//! let mut rule = Rule::new();
//! rule.set_action(Action::Block)
//!     .set_direction(Direction::In)
//!     .set_protocol(Protocol::Tcp)
//!     .set_destination_port(22);
//! rule.commit();
//!
//! let mut rules = RuleSet::new();
//! rules.add_rule(rule);
//! assert_eq!(rules.rules_text(), "block in proto tcp from any to any port 22");
//! ```

use crate::core::error::{Error, Result};
use ipnetwork::{IpNetwork, Ipv4Network};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

/// Rule action
///
/// `Unknown` renders as `block`: an action that cannot be mapped fails closed.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    /// Let the packet through
    Pass,
    /// Drop the packet
    #[default]
    Block,
    /// Unmapped action, treated as `block`
    Unknown,
}

impl Action {
    /// Returns the pf keyword for this action
    pub const fn as_str(self) -> &'static str {
        match self {
            Action::Pass => "pass",
            Action::Block | Action::Unknown => "block",
        }
    }
}

/// Address family the rule applies to
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AddressFamily {
    /// IPv4
    Inet,
    /// IPv6
    Inet6,
    /// Not restricted
    #[default]
    #[serde(alias = "any")]
    #[strum(serialize = "unknown", serialize = "any")]
    Unknown,
}

impl AddressFamily {
    /// Returns the pf keyword, empty when unspecified
    pub const fn as_str(self) -> &'static str {
        match self {
            AddressFamily::Inet => "inet",
            AddressFamily::Inet6 => "inet6",
            AddressFamily::Unknown => "",
        }
    }
}

/// Packet direction
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    /// Incoming traffic
    In,
    /// Outgoing traffic
    Out,
    /// Both directions
    #[default]
    #[serde(alias = "any")]
    #[strum(serialize = "unknown", serialize = "any")]
    Unknown,
}

impl Direction {
    /// Returns the pf keyword, empty when unspecified
    pub const fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::Unknown => "",
        }
    }
}

/// Network protocol matched by a rule
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Default,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Protocol {
    /// Transmission Control Protocol
    Tcp,
    /// User Datagram Protocol
    Udp,
    /// Internet Control Message Protocol (IPv4)
    Icmp,
    /// Internet Control Message Protocol version 6
    #[serde(alias = "icmp6")]
    #[strum(serialize = "icmpv6", serialize = "icmp6")]
    Icmpv6,
    /// Any protocol
    #[default]
    #[serde(alias = "any")]
    #[strum(serialize = "unknown", serialize = "any")]
    Unknown,
}

impl Protocol {
    /// Returns the pf keyword, empty when unspecified
    pub const fn as_str(self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Udp => "udp",
            Protocol::Icmp => "icmp",
            Protocol::Icmpv6 => "icmp6",
            Protocol::Unknown => "",
        }
    }
}

/// One pf filter rule.
///
/// Setters return `&mut Self` for chaining and are no-ops once the rule has been
/// committed. They never report the commit state; check [`Rule::is_committed`]
/// when that matters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rule {
    action: Action,
    address_family: AddressFamily,
    direction: Direction,
    protocol: Protocol,
    interface: Option<String>,
    log: bool,
    source: Option<IpNetwork>,
    source_port: u16,
    destination: Option<IpNetwork>,
    destination_port: u16,
    committed: bool,
}

impl Rule {
    /// Creates an uncommitted rule with action `block`
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the source to a single address, optionally with a dotted netmask
    pub fn set_source_ip(&mut self, addr: IpAddr, netmask: Option<&str>) -> &mut Self {
        if !self.committed {
            self.source = Some(host_network(addr, netmask));
        }
        self
    }

    /// Sets the source from CIDR text such as `10.0.0.0/24`.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidAddress` if the text is not valid CIDR. Never
    /// errors on a committed rule.
    pub fn set_source_cidr(&mut self, cidr: &str) -> Result<&mut Self> {
        if !self.committed {
            self.source = Some(parse_cidr(cidr)?);
        }
        Ok(self)
    }

    /// Sets the destination to a single address, optionally with a dotted netmask
    pub fn set_destination_ip(&mut self, addr: IpAddr, netmask: Option<&str>) -> &mut Self {
        if !self.committed {
            self.destination = Some(host_network(addr, netmask));
        }
        self
    }

    /// Sets the destination from CIDR text.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidAddress` if the text is not valid CIDR. Never
    /// errors on a committed rule.
    pub fn set_destination_cidr(&mut self, cidr: &str) -> Result<&mut Self> {
        if !self.committed {
            self.destination = Some(parse_cidr(cidr)?);
        }
        Ok(self)
    }

    /// Sets the source port (0 clears it)
    pub fn set_source_port(&mut self, port: u16) -> &mut Self {
        if !self.committed {
            self.source_port = port;
        }
        self
    }

    /// Sets the destination port (0 clears it)
    pub fn set_destination_port(&mut self, port: u16) -> &mut Self {
        if !self.committed {
            self.destination_port = port;
        }
        self
    }

    /// Sets the interface (empty string clears it)
    pub fn set_interface(&mut self, interface: impl Into<String>) -> &mut Self {
        if !self.committed {
            let interface = interface.into();
            self.interface = (!interface.is_empty()).then_some(interface);
        }
        self
    }

    pub fn set_protocol(&mut self, protocol: Protocol) -> &mut Self {
        if !self.committed {
            self.protocol = protocol;
        }
        self
    }

    pub fn set_action(&mut self, action: Action) -> &mut Self {
        if !self.committed {
            self.action = action;
        }
        self
    }

    pub fn set_address_family(&mut self, family: AddressFamily) -> &mut Self {
        if !self.committed {
            self.address_family = family;
        }
        self
    }

    pub fn set_direction(&mut self, direction: Direction) -> &mut Self {
        if !self.committed {
            self.direction = direction;
        }
        self
    }

    /// Adds the `log` keyword to the rule
    pub fn enable_logging(&mut self) -> &mut Self {
        if !self.committed {
            self.log = true;
        }
        self
    }

    /// Freezes the rule. There is no way back.
    pub fn commit(&mut self) {
        self.committed = true;
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn address_family(&self) -> AddressFamily {
        self.address_family
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    pub fn logging(&self) -> bool {
        self.log
    }

    pub fn source(&self) -> Option<IpNetwork> {
        self.source
    }

    pub fn source_port(&self) -> u16 {
        self.source_port
    }

    pub fn destination(&self) -> Option<IpNetwork> {
        self.destination
    }

    pub fn destination_port(&self) -> u16 {
        self.destination_port
    }

    /// Generates the single-line pf statement for this rule.
    pub fn to_rule_text(&self) -> String {
        use std::fmt::Write;

        let mut out = String::from(self.action.as_str());

        let direction = self.direction.as_str();
        if !direction.is_empty() {
            let _ = write!(out, " {direction}");
        }
        if self.log {
            out.push_str(" log");
        }
        if let Some(ref iface) = self.interface {
            let _ = write!(out, " on {iface}");
        }
        // Long-standing output: a set address family repeats the interface
        // clause instead of emitting the family keyword. Kept byte-for-byte.
        if !self.address_family.as_str().is_empty() {
            let _ = write!(out, " on {}", self.interface.as_deref().unwrap_or(""));
        }
        let protocol = self.protocol.as_str();
        if !protocol.is_empty() {
            let _ = write!(out, " proto {protocol}");
        }

        match self.source {
            Some(src) => {
                let _ = write!(out, " from {src}");
            }
            None => out.push_str(" from any"),
        }
        if self.source_port > 0 {
            let _ = write!(out, " port {}", self.source_port);
        }

        match self.destination {
            Some(dst) => {
                let _ = write!(out, " to {dst}");
            }
            None => out.push_str(" to any"),
        }
        if self.destination_port > 0 {
            let _ = write!(out, " port {}", self.destination_port);
        }

        out
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rule_text())
    }
}

/// Builds a network for a single address. The mask defaults to the host mask;
/// an unparseable netmask, or any netmask on an IPv6 address, falls back to it.
fn host_network(addr: IpAddr, netmask: Option<&str>) -> IpNetwork {
    let IpAddr::V4(v4) = addr else {
        return IpNetwork::from(addr);
    };
    netmask
        .and_then(|m| m.parse::<Ipv4Addr>().ok())
        .and_then(|m| Ipv4Network::with_netmask(v4, m).ok())
        .map_or_else(|| IpNetwork::from(addr), IpNetwork::V4)
}

/// Parses CIDR text as written, keeping any host bits of the address.
pub(crate) fn parse_cidr_text(cidr: &str) -> Result<IpNetwork> {
    // ipnetwork accepts a bare address as a host network; CIDR text must carry a prefix
    if !cidr.contains('/') {
        return Err(Error::InvalidAddress {
            input: cidr.to_string(),
            reason: "missing prefix length".to_string(),
        });
    }
    cidr.trim()
        .parse()
        .map_err(|e: ipnetwork::IpNetworkError| Error::InvalidAddress {
            input: cidr.to_string(),
            reason: e.to_string(),
        })
}

/// Parses CIDR text and returns the network address with its prefix.
pub(crate) fn parse_cidr(cidr: &str) -> Result<IpNetwork> {
    let net = parse_cidr_text(cidr)?;
    IpNetwork::new(net.network(), net.prefix()).map_err(|e| Error::InvalidAddress {
        input: cidr.to_string(),
        reason: e.to_string(),
    })
}

/// Ordered collection of committed rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a committed rule. Uncommitted rules are ignored.
    pub fn add_rule(&mut self, rule: Rule) {
        if rule.is_committed() {
            self.rules.push(rule);
        } else {
            debug!("Ignoring uncommitted rule: {rule}");
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the text of every rule, in insertion order
    pub fn rule_strings(&self) -> Vec<String> {
        self.rules.iter().map(Rule::to_rule_text).collect()
    }

    /// Returns all rules joined by newlines, without a trailing newline
    pub fn rules_text(&self) -> String {
        self.rule_strings().join("\n")
    }
}
