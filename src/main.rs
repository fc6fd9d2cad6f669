//! pfkit - command line front end for the pf packet filter
//!
//! # Usage
//!
//! ```bash
//! pfkit status                              # Is pf running?
//! pfkit enable | disable                    # Toggle pf
//! pfkit rules                               # Show loaded filter rules
//! pfkit tables                              # Show defined tables
//! pfkit profiles                            # List saved anchor profiles
//! pfkit load ssh --dry-run                  # Preview a profile's rules
//! pfkit load ./ssh.json                     # Load a profile into its anchor
//! pfkit flush pfkit/ssh                     # Flush an anchor's rules
//! pfkit table add bruteforce 192.0.2.7      # Add an address to a table
//! pfkit table delete office 10.0.0.0/8 --cidr
//! pfkit log --count 20                      # Show recent audit events
//! pfkit config --save                       # Persist the effective paths
//! ```
//!
//! Privileged commands must run as root (or with access to `/dev/pf`).

use clap::{Parser, Subcommand};
use pfkit::audit::{self, AuditLog, EventType};
use pfkit::config::{self, PfConfig};
use pfkit::core::error::PfctlErrorPattern;
use pfkit::core::profiles;
use pfkit::validators::{validate_anchor_name, validate_table_name};
use pfkit::{Error, Firewall};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "pfkit")]
#[command(about = "Manage pf anchors, tables and state through pfctl", long_about = None)]
struct Cli {
    /// Path to pfctl (overrides config and PFKIT_PFCTL)
    #[arg(long, global = true, value_name = "PATH")]
    pfctl: Option<PathBuf>,

    /// Path to the pf device (overrides config and PFKIT_DEVICE)
    #[arg(long, global = true, value_name = "PATH")]
    device: Option<PathBuf>,

    /// Log every pfctl invocation to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether pf is enabled
    Status,
    /// Enable pf
    Enable,
    /// Disable pf
    Disable,
    /// Show the loaded filter rules
    Rules,
    /// Show the defined tables
    Tables,
    /// List saved anchor profiles
    Profiles,
    /// Load an anchor profile into pf
    Load {
        /// Profile name or path to a profile JSON file
        profile: String,
        /// Print the generated rules without loading them
        #[arg(long)]
        dry_run: bool,
    },
    /// Flush the rules of an anchor
    Flush {
        /// Anchor name, e.g. pfkit/ssh
        anchor: String,
    },
    /// Add or remove table entries
    Table {
        #[command(subcommand)]
        action: TableAction,
    },
    /// Show recent audit log events
    Log {
        /// Number of events to show
        #[arg(short, long, default_value_t = 10)]
        count: usize,
    },
    /// Show the effective configuration
    Config {
        /// Persist the effective configuration to config.json
        #[arg(long)]
        save: bool,
    },
}

#[derive(Subcommand)]
enum TableAction {
    /// Add entries to a table
    Add(TableArgs),
    /// Remove entries from a table
    Delete(TableArgs),
}

#[derive(clap::Args)]
struct TableArgs {
    /// Table name
    table: String,
    /// Addresses (or networks with --cidr)
    #[arg(required = true)]
    entries: Vec<String>,
    /// Treat entries as CIDR networks
    #[arg(long)]
    cidr: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = config::load_config();
    if let Some(path) = cli.pfctl {
        config.control_path = path;
    }
    if let Some(path) = cli.device {
        config.device_path = path;
    }

    match handle_cli(cli.command, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

fn report(err: &Error) {
    eprintln!("Error: {err}");
    let translation = PfctlErrorPattern::match_error(err.stderr().unwrap_or(&err.to_string()));
    eprintln!("{}", translation.user_message);
    for suggestion in &translation.suggestions {
        eprintln!("  - {suggestion}");
    }
}

fn validation(field: &str, result: Result<(), String>) -> pfkit::Result<()> {
    result.map_err(|message| Error::Validation {
        field: field.to_string(),
        message,
    })
}

fn handle_cli(command: Commands, config: &PfConfig) -> pfkit::Result<()> {
    match command {
        Commands::Status => {
            let fw = Firewall::from_config(config)?;
            println!(
                "Status: {}",
                if fw.enabled() { "Enabled" } else { "Disabled" }
            );
        }
        Commands::Enable => {
            let fw = Firewall::from_config(config)?;
            let result = fw.enable();
            audit::record(EventType::Enable, serde_json::json!({}), &result);
            result?;
            println!("✓ pf enabled");
        }
        Commands::Disable => {
            let fw = Firewall::from_config(config)?;
            let result = fw.disable();
            audit::record(EventType::Disable, serde_json::json!({}), &result);
            result?;
            println!("✓ pf disabled");
        }
        Commands::Rules => {
            for line in Firewall::from_config(config)?.rules()? {
                println!("{line}");
            }
        }
        Commands::Tables => {
            for line in Firewall::from_config(config)?.tables()? {
                println!("{line}");
            }
        }
        Commands::Profiles => {
            let names = profiles::list_profiles()?;
            if names.is_empty() {
                if let Some(dir) = profiles::get_profiles_dir() {
                    println!("No profiles in {}", dir.display());
                }
            } else {
                println!("Available profiles:");
                for name in names {
                    println!("  {name}");
                }
            }
        }
        Commands::Load { profile, dry_run } => {
            let path = profiles::resolve_profile(&profile).ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, "Data directory not found")
            })?;
            let profile = profiles::load_profile(&path)?;

            if dry_run {
                let rule_set = profile.rule_set()?;
                println!("# anchor {}", profile.anchor);
                println!("{}", rule_set.rules_text());
                return Ok(());
            }

            let fw = Firewall::from_config(config)?;
            let anchor = profile.build(&fw)?;
            let result = anchor.commit();
            audit::record(
                EventType::CommitAnchor,
                serde_json::json!({
                    "anchor": anchor.name(),
                    "rule_count": anchor.rule_set().len(),
                }),
                &result,
            );
            result?;
            println!(
                "✓ Loaded {} rule(s) into anchor {}",
                anchor.rule_set().len(),
                anchor.name()
            );
        }
        Commands::Flush { anchor } => {
            validation("anchor", validate_anchor_name(&anchor))?;
            let fw = Firewall::from_config(config)?;
            let result = fw.new_anchor(&anchor).flush();
            audit::record(
                EventType::FlushAnchor,
                serde_json::json!({ "anchor": anchor }),
                &result,
            );
            result?;
            println!("✓ Flushed anchor {anchor}");
        }
        Commands::Table { action } => {
            let (event_type, args) = match action {
                TableAction::Add(args) => (EventType::TableAdd, args),
                TableAction::Delete(args) => (EventType::TableDelete, args),
            };
            validation("table", validate_table_name(&args.table))?;
            let fw = Firewall::from_config(config)?;

            let result = match (event_type, args.cidr) {
                (EventType::TableAdd, false) => fw.add_to_table_ip(&args.table, &args.entries),
                (EventType::TableAdd, true) => fw.add_to_table_cidr(&args.table, &args.entries),
                (_, false) => fw.remove_from_table_ip(&args.table, &args.entries),
                (_, true) => fw.remove_from_table_cidr(&args.table, &args.entries),
            };
            audit::record(
                event_type,
                serde_json::json!({
                    "table": args.table,
                    "entries": args.entries,
                    "cidr": args.cidr,
                }),
                &result,
            );
            result?;
            println!("✓ Table {} updated", args.table);
        }
        Commands::Log { count } => {
            let audit = AuditLog::new()?;
            let events = match audit.read_recent(count) {
                Ok(events) => events,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
                Err(e) => return Err(e.into()),
            };
            for event in events {
                println!(
                    "{} {:<13} {} {}{}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    serde_json::to_string(&event.event_type)?.trim_matches('"'),
                    if event.success { "ok  " } else { "FAIL" },
                    event.details,
                    event.error.map(|e| format!(" ({e})")).unwrap_or_default(),
                );
            }
        }
        Commands::Config { save } => {
            println!("pfctl:  {}", config.control_path.display());
            println!("device: {}", config.device_path.display());
            if save {
                config::save_config(config)?;
                println!("✓ Configuration saved");
            }
        }
    }
    Ok(())
}
