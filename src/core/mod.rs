//! Core packet filter management functionality
//!
//! This module contains the types and logic for driving pf through pfctl.
//! It provides:
//!
//! - [`firewall`]: Rule and ruleset data structures and rule text generation
//! - [`anchor`]: Named anchors that load a ruleset into pf
//! - [`pf`]: The top-level [`pf::Firewall`] handle (status, enable/disable)
//! - [`table`]: Table membership operations on the firewall handle
//! - [`exec`]: The pfctl process executor
//! - [`error`]: Error types for firewall operations
//! - [`profiles`]: JSON anchor profiles

pub mod anchor;
pub mod error;
pub mod exec;
pub mod firewall;
pub mod pf;
pub mod profiles;
pub mod table;

#[cfg(test)]
pub mod test_helpers;
