//! Command-line surface for dbadmin.
//!
//! Parsing lives here rather than in `main.rs` so the translation from
//! flags to an [`AdminConfig`] can be tested without a server.

use clap::{ArgGroup, Parser};
use dbadmin_core::config::MailSettings;
use dbadmin_core::{AdminConfig, Command, ExclusionSet, SinkConfig, StoreTarget, WriteMode};
use std::path::PathBuf;

/// Default document store destination.
pub const DEFAULT_STORE_TARGET: &str = "sysmon:mysql_db_status";

fn parse_store_target(value: &str) -> Result<StoreTarget, String> {
    value.parse::<StoreTarget>().map_err(|e| e.to_string())
}

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "dbadmin")]
#[command(about = "MySQL table maintenance and server health reporting")]
#[command(version)]
#[command(long_about = "
dbadmin - MySQL maintenance runner

Runs CHECK, ANALYZE, OPTIMIZE or CHECKSUM TABLE across databases and tables,
or takes a server health snapshot, and delivers one JSON document per command
to the console, a file, email and/or a MongoDB collection.

System databases (performance_schema, information_schema, mysql, sys) are
skipped unless the server config overrides `sys_dbs`.

EXAMPLES:
  dbadmin -c db01.toml -C                      # check every table
  dbadmin -c db01.toml -A shop crm             # analyze two databases
  dbadmin -c db01.toml -S shop -t orders       # checksum one table
  dbadmin -c db01.toml -M -x -o status.json    # health snapshot to a file
  dbadmin -c db01.toml -D -m mongo.toml -z     # optimize, archive, no console
")]
#[command(group(
    ArgGroup::new("commands")
        .required(true)
        .multiple(true)
        .args(["check", "analyze", "optimize", "checksum", "status", "list_databases"])
))]
pub struct Cli {
    /// Server configuration file (TOML)
    #[arg(short = 'c', long, env = "DBADMIN_CONFIG", value_name = "FILE")]
    pub config: PathBuf,

    /// Check tables for errors
    #[arg(short = 'C', long, num_args = 0.., value_name = "DB")]
    pub check: Option<Vec<String>>,

    /// Analyze and store key distributions
    #[arg(short = 'A', long, num_args = 0.., value_name = "DB")]
    pub analyze: Option<Vec<String>>,

    /// Optimize (defragment) tables
    #[arg(short = 'D', long, num_args = 0.., value_name = "DB")]
    pub optimize: Option<Vec<String>>,

    /// Report table checksums
    #[arg(short = 'S', long, num_args = 0.., value_name = "DB")]
    pub checksum: Option<Vec<String>>,

    /// Server health snapshot
    #[arg(short = 'M', long)]
    pub status: bool,

    /// List databases
    #[arg(short = 'L', long)]
    pub list_databases: bool,

    /// Include system databases when listing databases
    #[arg(short = 'k', long, requires = "list_databases")]
    pub include_system: bool,

    /// Restrict maintenance to these tables (single database only)
    #[arg(short = 't', long, num_args = 1.., value_name = "TABLE")]
    pub tables: Vec<String>,

    /// Write each document to this file
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Append to the output file instead of truncating it
    #[arg(short = 'a', long, requires = "output")]
    pub append: bool,

    /// Mail each document to these addresses
    #[arg(short = 'e', long, num_args = 1.., value_name = "ADDR")]
    pub email: Vec<String>,

    /// Mail subject (default: "<server>: <command>")
    #[arg(short = 's', long, requires = "email")]
    pub subject: Option<String>,

    /// Send mail with mailx instead of sendmail
    #[arg(short = 'u', long, requires = "email")]
    pub mailx: bool,

    /// Document store configuration file (TOML)
    #[arg(short = 'm', long, value_name = "FILE")]
    pub store_config: Option<PathBuf>,

    /// Document store destination as database:collection
    #[arg(
        short = 'i',
        long,
        value_name = "DB:COLL",
        default_value = DEFAULT_STORE_TARGET,
        value_parser = parse_store_target
    )]
    pub store_target: StoreTarget,

    /// Pretty-print JSON output
    #[arg(short = 'x', long)]
    pub expand: bool,

    /// Spaces per indentation level with --expand
    #[arg(long, default_value_t = 4, value_name = "N")]
    pub indent: usize,

    /// Do not print documents to the console
    #[arg(short = 'z', long)]
    pub suppress: bool,

    /// Prompt for the MySQL password instead of reading it from the config
    #[arg(long)]
    pub ask_password: bool,

    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all log output except errors")]
    pub quiet: bool,
}

impl Cli {
    /// Delivery options shared by every command of this invocation.
    pub fn sink_config(&self) -> SinkConfig {
        let mut sink = SinkConfig::default();
        if let Some(path) = &self.output {
            let mode = if self.append {
                WriteMode::Append
            } else {
                WriteMode::Truncate
            };
            sink = sink.with_file(path, mode);
        }
        if !self.email.is_empty() {
            sink = sink.with_mail(MailSettings {
                recipients: self.email.clone(),
                subject: self.subject.clone(),
                use_mailx: self.mailx,
            });
        }
        if self.store_config.is_some() {
            sink = sink.with_store_target(self.store_target.clone());
        }
        sink.expand = self.expand;
        sink.indent = self.indent;
        sink.suppress = self.suppress;
        sink
    }

    /// Requested commands with their database arguments.
    pub fn requests(&self) -> Vec<(Command, Vec<String>)> {
        let mut requests = Vec::new();
        for (command, databases) in [
            (Command::Check, &self.check),
            (Command::Analyze, &self.analyze),
            (Command::Optimize, &self.optimize),
            (Command::Checksum, &self.checksum),
        ] {
            if let Some(databases) = databases {
                requests.push((command, databases.clone()));
            }
        }
        if self.status {
            requests.push((Command::Status, Vec::new()));
        }
        if self.list_databases {
            requests.push((Command::ListDatabases, Vec::new()));
        }
        requests
    }
}

/// Builds the per-invocation configuration from parsed flags.
pub fn build_admin_config(cli: &Cli, exclusions: ExclusionSet) -> AdminConfig {
    let mut config = AdminConfig::new(exclusions, cli.sink_config()).with_tables(cli.tables.clone());
    config.include_system = cli.include_system;
    for (command, databases) in cli.requests() {
        config = config.with_request(command, databases);
    }
    config
}
