//! cpo CLI - Cloud Pak operations tooling
//!
//! Entry point for the `cpo` command-line interface.

mod cli;
mod commands;
mod output;
mod version;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Version(ref args) => commands::version::run(args),
        Commands::Dependency(ref command) => commands::dependency::run(command, &cli).await,
    };

    match result {
        Ok(code) => code,
        Err(err) => {
            output::error(&report(&err));
            ExitCode::FAILURE
        }
    }
}

/// Render an error, including captured process output for dependency errors
fn report(err: &anyhow::Error) -> String {
    match err.downcast_ref::<cpo_deps::Error>() {
        Some(deps_error) => deps_error.report(),
        None => format!("{:#}", err),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
