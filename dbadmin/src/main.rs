//! MySQL maintenance runner.
//!
//! Connects to one MySQL server, runs the requested maintenance commands
//! and health snapshot, and delivers each result document to the configured
//! sinks. Logs go to stderr; stdout carries only result documents.

use anyhow::{Context, Result, bail};
use clap::Parser;
use dbadmin::{Cli, build_admin_config};
use dbadmin_core::adapters::{MongoStore, MySqlServer};
use dbadmin_core::logging::init_logging;
use dbadmin_core::security::Credentials;
use dbadmin_core::sink::CommandMailer;
use dbadmin_core::{ResultSink, ServerConfig, StoreConfig, run_invocation};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet)?;

    let server_config = ServerConfig::from_file(&cli.config)
        .with_context(|| format!("Cannot load server config {}", cli.config.display()))?;
    let credentials = credentials_for(&server_config, cli.ask_password)?;
    let admin_config = build_admin_config(&cli, server_config.exclusions());

    let mut sink = ResultSink::new(Box::new(CommandMailer::default()));
    if let Some(path) = &cli.store_config {
        let store_config = StoreConfig::from_file(path)
            .with_context(|| format!("Cannot load store config {}", path.display()))?;
        sink = sink.with_store(Box::new(MongoStore::connect(&store_config).await?));
    }

    let server = match MySqlServer::connect(&server_config, &credentials).await {
        Ok(server) => server,
        Err(e) => {
            error!("Couldn't connect to {}: {}", server_config.name, e);
            sink.close().await;
            return Err(e.into());
        }
    };
    drop(credentials);

    let reports = run_invocation(&server, &mut sink, &admin_config).await;

    let failed: Vec<String> = reports
        .iter()
        .filter(|report| !report.succeeded())
        .map(|report| report.command.to_string())
        .collect();
    if !failed.is_empty() {
        bail!("{} of {} command(s) failed: {}", failed.len(), reports.len(), failed.join(", "));
    }

    info!("{} command(s) completed on {}", reports.len(), server_config.name);
    Ok(())
}

/// Login from the config file, with the password optionally read from the
/// terminal.
fn credentials_for(config: &ServerConfig, ask_password: bool) -> Result<Credentials> {
    let credentials = config.credentials();
    if !ask_password {
        return Ok(credentials);
    }
    let password = rpassword::prompt_password(format!("Password for {}: ", config.user))
        .context("Failed to read password")?;
    Ok(credentials.with_password(password))
}
