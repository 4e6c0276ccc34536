//! Clausewise CLI - Question answering over policy documents
//!
//! Usage:
//!   clausewise serve --port 8080                    Start web server
//!   clausewise analyze --query Q --file policy.pdf  Analyze one document
//!   clausewise render --file answer.json            Render a saved answer
//!   clausewise check                                Check the AI backend

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Serve {
            port,
            host,
            static_dir,
            stream,
            structured,
        } => {
            let settings = commands::load_settings(cli.config.as_deref(), stream, structured)?;
            commands::cmd_serve(&settings, &host, port, static_dir.as_deref()).await
        }
        Commands::Analyze {
            query,
            file,
            structured,
            stream,
        } => {
            let settings = commands::load_settings(cli.config.as_deref(), stream, structured)?;
            commands::cmd_analyze(&settings, &query, &file).await
        }
        Commands::Render { file, plain } => commands::cmd_render(&file, plain),
        Commands::Check => {
            let settings = commands::load_settings(cli.config.as_deref(), false, false)?;
            commands::cmd_check(&settings).await
        }
    }
}
