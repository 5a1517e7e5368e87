use std::path::PathBuf;
use std::time::Instant;

use clap::{CommandFactory, Parser};
use gcpctl_core::Config;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;
mod progress;

use cli::{Cli, Commands, OutputFormat};
use connection::ConnectionManager;
use error::{GcpCtlError, Result as CliResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (config, config_path) = match load_config(cli.config_file.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            e.print_diagnostic();
            std::process::exit(1);
        }
    };

    let conn_mgr = ConnectionManager::with_config_path(config, config_path)
        .with_state_file(cli.state_file.as_deref().map(PathBuf::from))
        .with_wait_overrides(cli.wait_timeout, cli.wait_interval);

    let started = Instant::now();
    let outcome = run(&cli, &conn_mgr).await;
    match &outcome {
        Ok(()) => info!(elapsed = ?started.elapsed(), "done"),
        Err(e) => debug!(elapsed = ?started.elapsed(), "failed: {}", e),
    }

    if let Err(e) = outcome {
        e.print_diagnostic();
        std::process::exit(1);
    }
    Ok(())
}

/// RUST_LOG wins over -v; logs go to stderr so stdout stays parseable
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gcpctl={level},gcpctl_core={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .init();
}

fn load_config(explicit: Option<&str>) -> CliResult<(Config, Option<PathBuf>)> {
    match explicit {
        Some(path) => {
            let path = PathBuf::from(path);
            debug!("config file: {}", path.display());
            Ok((Config::load_from_path(&path)?, Some(path)))
        }
        None => Ok((Config::load()?, None)),
    }
}

async fn run(cli: &Cli, conn_mgr: &ConnectionManager) -> Result<(), GcpCtlError> {
    info!("gcpctl {}", describe(&cli.command));

    let profile = cli.profile.as_deref();
    let out = cli.output;
    match &cli.command {
        Commands::Version => print_version(out),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(*shell, &mut cmd, "gcpctl", &mut std::io::stdout());
            Ok(())
        }
        Commands::Instance(cmd) => {
            commands::resource::handle_instance_command(conn_mgr, profile, cmd, out).await
        }
        Commands::Network(cmd) => {
            commands::resource::handle_network_command(conn_mgr, profile, cmd, out).await
        }
        Commands::Image(cmd) => {
            commands::resource::handle_image_command(conn_mgr, profile, cmd, out).await
        }
        Commands::Firewall(cmd) => {
            commands::resource::handle_firewall_command(conn_mgr, profile, cmd, out).await
        }
        Commands::Disk(cmd) => {
            commands::resource::handle_disk_command(conn_mgr, profile, cmd, out).await
        }
        Commands::Delete {
            name,
            tolerate_missing,
        } => {
            commands::resource::handle_delete_by_name(
                conn_mgr,
                profile,
                name,
                *tolerate_missing,
                out,
            )
            .await
        }
        Commands::Operation(cmd) => {
            commands::operation::handle_operation_command(conn_mgr, profile, cmd, out).await
        }
        Commands::State(cmd) => commands::state::handle_state_command(conn_mgr, cmd, out).await,
        Commands::Profile(cmd) => {
            commands::profile::handle_profile_command(cmd, conn_mgr, out).await
        }
    }
}

fn print_version(out: OutputFormat) -> CliResult<()> {
    match out {
        OutputFormat::Json | OutputFormat::Yaml => output::print_output(
            serde_json::json!({
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            }),
            out.into(),
        )?,
        OutputFormat::Auto | OutputFormat::Table => {
            println!("gcpctl {}", env!("CARGO_PKG_VERSION"))
        }
    }
    Ok(())
}

/// One-line description for the log; never includes token values
fn describe(command: &Commands) -> String {
    match command {
        Commands::Profile(cli::ProfileCommands::Set { name, .. }) => {
            format!("profile set {name} <redacted>")
        }
        Commands::Profile(cmd) => format!("profile {cmd:?}"),
        Commands::Delete { name, .. } => format!("delete {name}"),
        Commands::Instance(cmd) => format!("instance {cmd:?}"),
        Commands::Network(cmd) => format!("network {cmd:?}"),
        Commands::Image(cmd) => format!("image {cmd:?}"),
        Commands::Firewall(cmd) => format!("firewall {cmd:?}"),
        Commands::Disk(cmd) => format!("disk {cmd:?}"),
        Commands::Operation(cmd) => format!("operation {cmd:?}"),
        Commands::State(cmd) => format!("state {cmd:?}"),
        Commands::Completions { shell } => format!("completions {shell}"),
        Commands::Version => "version".to_string(),
    }
}
