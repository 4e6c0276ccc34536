//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Clausewise - Ask questions about policy documents
#[derive(Parser)]
#[command(name = "clausewise")]
#[command(about = "Answer questions about PDF documents with Gemini", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to <config dir>/clausewise/config.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory containing static files to serve
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Stream answers to the browser as they arrive (plain mode only)
        #[arg(long)]
        stream: bool,

        /// Ask for JSON answers and render them as structured HTML
        #[arg(long)]
        structured: bool,
    },

    /// Analyze a document from the command line
    Analyze {
        /// Question to ask about the document
        #[arg(short, long)]
        query: String,

        /// PDF document
        #[arg(short, long)]
        file: PathBuf,

        /// Ask for a JSON answer and render it as structured HTML
        #[arg(long)]
        structured: bool,

        /// Print the raw answer as it arrives instead of rendered HTML
        #[arg(long)]
        stream: bool,
    },

    /// Render a saved answer file to HTML
    Render {
        /// File containing the model's answer
        #[arg(short, long)]
        file: PathBuf,

        /// Treat the answer as plain text instead of structured JSON
        #[arg(long)]
        plain: bool,
    },

    /// Show configuration and check the AI backend
    Check,
}
