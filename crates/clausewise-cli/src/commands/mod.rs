//! CLI command implementations
//!
//! Commands are organized by purpose:
//! - `analyze` - Run one query against a local PDF
//! - `check` - Show resolved settings and probe the backend
//! - `render` - Render a saved answer without calling the backend
//! - `serve` - Web server command

pub mod analyze;
pub mod check;
pub mod render;
pub mod serve;

// Re-export command functions for main.rs
pub use analyze::*;
pub use check::*;
pub use render::*;
pub use serve::*;

use std::path::Path;

use anyhow::{Context, Result};
use clausewise_core::{RenderMode, Settings};

/// Load settings and apply command-line switches on top
pub fn load_settings(config: Option<&Path>, stream: bool, structured: bool) -> Result<Settings> {
    let mut settings = Settings::load(config).context("Failed to load settings")?;
    apply_flags(&mut settings, stream, structured);
    Ok(settings)
}

/// Flags only ever switch features on; config and environment decide otherwise
pub fn apply_flags(settings: &mut Settings, stream: bool, structured: bool) {
    if stream {
        settings.stream = true;
    }
    if structured {
        settings.render_mode = RenderMode::Structured;
    }
}
