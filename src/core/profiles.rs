//! Anchor profiles
//!
//! A profile is a JSON file naming an anchor and the rules it should hold:
//!
//! ```json
//! {
//!   "anchor": "pfkit/ssh",
//!   "rules": [
//!     { "action": "block", "direction": "in", "protocol": "tcp", "destination_port": 22 },
//!     { "action": "pass", "direction": "in", "protocol": "tcp",
//!       "source": "10.0.0.0/8", "destination_port": 22, "log": true }
//!   ]
//! }
//! ```
//!
//! Profiles live in the application's data directory under `profiles/`, or
//! anywhere on disk when loaded by path. Building a profile goes through the
//! ordinary [`Rule`](crate::core::firewall::Rule) setters, so the result is
//! identical to constructing the rules by hand.

use crate::core::anchor::Anchor;
use crate::core::error::{Error, Result};
use crate::core::firewall::{Action, AddressFamily, Direction, Protocol, Rule, RuleSet};
use crate::core::pf::Firewall;
use crate::utils::get_data_dir;
use crate::validators::{validate_anchor_name, validate_interface};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One rule as written in a profile. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleSpec {
    pub action: Action,
    pub direction: Direction,
    pub address_family: AddressFamily,
    pub protocol: Protocol,
    pub interface: Option<String>,
    pub log: bool,
    /// CIDR text, or a bare address for a single host
    pub source: Option<String>,
    pub source_port: u16,
    /// CIDR text, or a bare address for a single host
    pub destination: Option<String>,
    pub destination_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorProfile {
    pub anchor: String,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

impl AnchorProfile {
    /// Builds the profile's rules, committed and in file order, without
    /// touching pf.
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` for a bad anchor or interface name and
    /// `Error::InvalidAddress` for a malformed address.
    pub fn rule_set(&self) -> Result<RuleSet> {
        validate_anchor_name(&self.anchor).map_err(|message| Error::Validation {
            field: "anchor".to_string(),
            message,
        })?;

        let mut rule_set = RuleSet::new();
        for (index, spec) in self.rules.iter().enumerate() {
            let mut rule = spec.to_rule(index)?;
            rule.commit();
            rule_set.add_rule(rule);
        }
        Ok(rule_set)
    }

    /// Builds an anchor on `firewall` holding every rule of the profile.
    ///
    /// # Errors
    ///
    /// Same as [`AnchorProfile::rule_set`].
    pub fn build(&self, firewall: &Firewall) -> Result<Anchor> {
        let rule_set = self.rule_set()?;
        let mut anchor = firewall.new_anchor(&self.anchor);
        for rule in rule_set.rules() {
            anchor.add_rule(rule.clone());
        }
        Ok(anchor)
    }
}

impl RuleSpec {
    fn to_rule(&self, index: usize) -> Result<Rule> {
        let mut rule = Rule::new();
        rule.set_action(self.action)
            .set_direction(self.direction)
            .set_address_family(self.address_family)
            .set_protocol(self.protocol)
            .set_source_port(self.source_port)
            .set_destination_port(self.destination_port);

        if let Some(ref iface) = self.interface {
            let iface = validate_interface(iface).map_err(|message| Error::Validation {
                field: format!("rules[{index}].interface"),
                message,
            })?;
            rule.set_interface(iface);
        }
        if self.log {
            rule.enable_logging();
        }
        if let Some(ref source) = self.source {
            if source.contains('/') {
                rule.set_source_cidr(source)?;
            } else {
                rule.set_source_ip(parse_host(source)?, None);
            }
        }
        if let Some(ref destination) = self.destination {
            if destination.contains('/') {
                rule.set_destination_cidr(destination)?;
            } else {
                rule.set_destination_ip(parse_host(destination)?, None);
            }
        }
        Ok(rule)
    }
}

fn parse_host(text: &str) -> Result<std::net::IpAddr> {
    text.trim().parse().map_err(|e: std::net::AddrParseError| Error::InvalidAddress {
        input: text.to_string(),
        reason: e.to_string(),
    })
}

/// Reads a profile from a JSON file.
///
/// # Errors
///
/// Returns `Err` if the file cannot be read or is not a valid profile.
pub fn load_profile(path: &Path) -> Result<AnchorProfile> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Gets the directory where named profiles are stored.
pub fn get_profiles_dir() -> Option<PathBuf> {
    get_data_dir().map(|dir| dir.join("profiles"))
}

/// Resolves a profile argument: an existing file path is used as-is,
/// anything else is looked up as `<profiles dir>/<name>.json`.
pub fn resolve_profile(name_or_path: &str) -> Option<PathBuf> {
    let direct = PathBuf::from(name_or_path);
    if direct.is_file() {
        return Some(direct);
    }
    get_profiles_dir().map(|dir| dir.join(format!("{name_or_path}.json")))
}

/// Lists the names of profiles in the profiles directory.
///
/// # Errors
///
/// Returns `Err` if the directory exists but cannot be read.
pub fn list_profiles() -> Result<Vec<String>> {
    let Some(dir) = get_profiles_dir() else {
        return Ok(Vec::new());
    };
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut profiles = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file()
            && path.extension().and_then(|s| s.to_str()) == Some("json")
            && let Some(name) = path.file_stem().and_then(|s| s.to_str())
        {
            profiles.push(name.to_string());
        }
    }

    profiles.sort();
    Ok(profiles)
}
