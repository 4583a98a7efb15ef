mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use ib_gateway::{cleanup, Error as GatewayError, GatewayManager, GatewaySettings};
use miette::Diagnostic;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(gw_error) = e.downcast_ref::<GatewayError>() {
            eprintln!("Error: {}", gw_error);
            if let Some(help) = gw_error.help() {
                eprintln!("\nHint: {}", help);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        cleanup::cleanup_overlays();
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    // Logs go to stderr: stdout is reserved for command payload output (and
    // for protocol framing when this library is embedded in a tool server).
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    cleanup::install_panic_cleanup();
    cleanup::install_signal_cleanup();

    let args = Cli::parse();

    let mut settings = match &args.config {
        Some(path) => {
            let mut s = GatewaySettings::load(path)?;
            s.apply_env()?;
            s
        }
        None => GatewaySettings::from_env()?,
    };
    if let Some(dir) = &args.gateway_dir {
        settings.gateway_dir = Some(dir.clone());
    }

    let manager = GatewayManager::new(&settings);

    match args.command {
        Commands::Start { quick } => commands::start::run(&manager, quick).await?,
        Commands::Status { json, logs } => commands::status::run(&manager, json, logs).await?,
        Commands::Stop => commands::stop::run(&manager).await?,
        Commands::Url => println!("{}", manager.gateway_url()),
        Commands::Doctor => commands::doctor::run(&manager)?,
        Commands::Tickle => commands::tickle::run(&manager).await?,
    }

    // Normal exit: remove any overlay files this run created.
    cleanup::cleanup_overlays();
    Ok(())
}
