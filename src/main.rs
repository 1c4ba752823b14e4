// ABOUTME: Entry point for the hoist CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, DeployArgs};
use hoist::config::Config;
use hoist::deploy::Orchestrator;
use hoist::error::Result;
use hoist::output::{Output, OutputMode};
use hoist::provider::{ProviderApi, ProvisioningClient};
use hoist::ssh::Session;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("hoist=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut output = Output::new(mode);
    output.start_timer();

    match run(cli.command, &output).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            output.error(&e.to_string());
            std::process::exit(1);
        }
    }
}

/// Returns whether the command succeeded.
async fn run(command: Commands, output: &Output) -> Result<bool> {
    let cwd = env::current_dir()?;
    let (config, base_dir) = Config::discover(&cwd)?;
    let client = ProvisioningClient::new(config.client_config()?)?;

    match command {
        Commands::Deploy(args) => deploy(&config, &base_dir, &client, args, output).await,
        Commands::Rollback {
            server,
            snapshot,
            address,
        } => {
            let mut session = Session::new(config.ssh.session_config());
            let mut orchestrator =
                Orchestrator::for_rollback(&client, &mut session, config.deploy_config())
                    .with_progress(output);
            orchestrator.attach(&server, address.as_deref().unwrap_or_default());
            orchestrator.rollback(&snapshot).await?;
            output.success(&format!("Server {server} restored to snapshot {snapshot}"));
            Ok(true)
        }
        Commands::Balance => {
            let balance = client.get_balance().await?;
            output.value(&serde_json::json!({ "balance": balance }), |_| {
                format!("Balance: {balance:.2}")
            });
            Ok(true)
        }
        Commands::Products => {
            let products = client.get_products().await?;
            output.value(&products, |products| {
                products
                    .iter()
                    .map(|p| match p.price {
                        Some(price) => format!("{}\t{}\t{price:.2}", p.id, p.name),
                        None => format!("{}\t{}", p.id, p.name),
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
            });
            Ok(true)
        }
        Commands::Images => {
            let images = client.get_images().await?;
            output.value(&images, |images| {
                images
                    .iter()
                    .map(|i| format!("{}\t{}", i.id, i.name.as_deref().unwrap_or("")))
                    .collect::<Vec<_>>()
                    .join("\n")
            });
            Ok(true)
        }
        Commands::Status { id } => {
            let state = client.get_status(&id).await?;
            output.value(&serde_json::json!({ "id": id, "state": state }), |_| {
                format!("{id}: {state}")
            });
            Ok(true)
        }
    }
}

async fn deploy(
    config: &Config,
    base_dir: &std::path::Path,
    client: &ProvisioningClient,
    args: DeployArgs,
    output: &Output,
) -> Result<bool> {
    let artifacts = config.artifacts.load(base_dir)?;
    let mut session = Session::new(config.ssh.session_config());

    let mut orchestrator =
        Orchestrator::new(client, &mut session, config.deploy_config(), artifacts)
            .with_progress(output);

    let result = match (args.existing, args.address) {
        (Some(id), Some(address)) => {
            output.progress(&format!("Deploying {} to server {id}", config.app.name));
            let credential = args.credential.unwrap_or_default();
            orchestrator
                .deploy_to_existing(&id, &address, &credential)
                .await
        }
        _ => {
            output.progress(&format!(
                "Ordering {} and deploying {}",
                config.order.product_id, config.app.name
            ));
            orchestrator.deploy().await
        }
    };

    output.deploy_result(&result);
    Ok(result.success)
}
