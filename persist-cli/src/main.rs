mod cli;
mod commands;
mod config;
mod output;
mod record;

use crate::{
    cli::{Args, Commands},
    commands::CommandExecutor,
    config::AppConfig,
};
use anyhow::Result;
use clap::Parser;
use persist::{PersistError, describe_error};
use std::process;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Application error: {:#}", e);
        match e.chain().find_map(|cause| cause.downcast_ref::<PersistError>()) {
            Some(err) => eprintln!("Error: {} ({:#})", describe_error(err.code()), e),
            None => eprintln!("Error: {:#}", e),
        }
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    let config = AppConfig::load(args.config.as_deref())?;
    init_logging(args.verbose, args.quiet, &config.log_level);
    info!("Starting persist with config: {:?}", config);

    let executor = CommandExecutor::new(config);

    match args.command {
        Commands::Write {
            input,
            output,
            append,
        } => {
            let frames = executor.write(&input, &output, append).await?;
            if !args.quiet {
                println!("✓ Wrote {} frame(s) to {}", frames, output.display());
            }
        }

        Commands::Read { input, format } => {
            print!("{}", executor.read(&input, format).await?);
        }

        Commands::Inspect { input } => {
            let inspection = executor.inspect(&input).await?;
            print!("{}", output::format_inspection(&inspection));
        }

        Commands::Demo { output } => {
            let loaded = executor.demo(&output)?;
            println!("Loaded user:");
            print!("{loaded}");
        }

        Commands::Config { show } => {
            if show {
                let config = AppConfig::load(args.config.as_deref())?;
                println!("{}", config.show()?);
            } else {
                match AppConfig::default_config_path() {
                    Some(path) => println!("Default configuration file: {}", path.display()),
                    None => println!("No default configuration location on this platform"),
                }
                println!("Use --show to display current configuration");
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, quiet: bool, level: &str) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(verbose)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}
