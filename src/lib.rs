//! pfkit - a library for driving the pf packet filter through pfctl
//!
//! Rules are built in memory, grouped into named anchors and loaded into pf
//! as a whole. Status, enable/disable and table membership are exposed on the
//! top-level [`Firewall`] handle.
//!
//! # Architecture
//!
//! - [`core`] - Rules, anchors, the firewall handle and the pfctl executor
//! - [`audit`] - Audit logging for privileged operations
//! - [`validators`] - Input validation for anchor, table and interface names
//! - [`config`] - Configuration persistence
//! - [`utils`] - Utility functions (XDG directories, etc.)
//!
//! # Example
//!
//! ```no_run
//! use pfkit::{Action, Direction, Firewall, Protocol};
//!
//! # fn main() -> pfkit::Result<()> {
//! let fw = Firewall::new("/sbin/pfctl")?;
//! let mut anchor = fw.new_anchor("pfkit");
//!
//! let mut rule = anchor.new_rule();
//! rule.set_action(Action::Block)
//!     .set_direction(Direction::In)
//!     .set_protocol(Protocol::Tcp)
//!     .set_destination_port(22);
//! rule.commit();
//! anchor.add_rule(rule);
//!
//! anchor.commit()?;
//! fw.enable()?;
//! # Ok(())
//! # }
//! ```

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]

pub mod audit;
pub mod config;
pub mod core;
pub mod utils;
pub mod validators;

// Re-export commonly used types
pub use core::anchor::Anchor;
pub use core::error::{Error, Result};
pub use core::exec::{Executor, PfctlExecutor};
pub use core::firewall::{Action, AddressFamily, Direction, Protocol, Rule, RuleSet};
pub use core::pf::Firewall;
