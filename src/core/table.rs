//! pf radix table membership
//!
//! Entries are parsed locally before pfctl is invoked. A malformed entry is
//! logged and skipped; it never aborts the batch. Execution failures are
//! collected and reported together once every entry has been tried.
//!
//! CIDR entries must carry a valid prefix, but pfctl is handed only the
//! address part as written (`192.0.2.17/24` adds `192.0.2.17`).

use crate::core::error::{Error, Result, TableOp};
use crate::core::firewall::parse_cidr_text;
use crate::core::pf::Firewall;
use std::net::IpAddr;
use tracing::{debug, warn};

impl Firewall {
    /// Adds one or more IP addresses to `table`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Table` carrying every pfctl failure. Unparseable
    /// entries are skipped with a warning and do not produce an error.
    pub fn add_to_table_ip<I, S>(&self, table: &str, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.update_table(table, TableOp::Add, entries, parse_ip)
    }

    /// Adds one or more CIDR networks to `table`.
    ///
    /// # Errors
    ///
    /// See [`Firewall::add_to_table_ip`].
    pub fn add_to_table_cidr<I, S>(&self, table: &str, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.update_table(table, TableOp::Add, entries, parse_network)
    }

    /// Removes one or more IP addresses from `table`.
    ///
    /// # Errors
    ///
    /// See [`Firewall::add_to_table_ip`].
    pub fn remove_from_table_ip<I, S>(&self, table: &str, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.update_table(table, TableOp::Delete, entries, parse_ip)
    }

    /// Removes one or more CIDR networks from `table`.
    ///
    /// # Errors
    ///
    /// See [`Firewall::add_to_table_ip`].
    pub fn remove_from_table_cidr<I, S>(&self, table: &str, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.update_table(table, TableOp::Delete, entries, parse_network)
    }

    fn update_table<I, S>(
        &self,
        table: &str,
        op: TableOp,
        entries: I,
        parse: fn(&str) -> Result<String>,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut errors = Vec::new();

        for entry in entries {
            let entry = entry.as_ref();
            let address = match parse(entry) {
                Ok(address) => address,
                Err(e) => {
                    warn!("Skipping table entry {entry:?}: {e}");
                    continue;
                }
            };

            debug!("Table {table}: {} {address}", op.as_str());
            if let Err(e) = self
                .executor()
                .execute(&["-t", table, "-T", op.as_str(), &address], None)
            {
                errors.push(e.to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Table { op, errors })
        }
    }
}

fn parse_ip(entry: &str) -> Result<String> {
    entry
        .trim()
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|e| Error::InvalidAddress {
            input: entry.to_string(),
            reason: e.to_string(),
        })
}

/// pfctl receives only the address part of a CIDR entry, exactly as written
fn parse_network(entry: &str) -> Result<String> {
    parse_cidr_text(entry).map(|net| net.ip().to_string())
}
