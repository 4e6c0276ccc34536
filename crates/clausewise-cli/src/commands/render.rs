//! Render command implementation

use std::path::Path;

use anyhow::{Context, Result};
use clausewise_core::render::{self, RenderMode};

/// Render a saved answer file (structured JSON unless `plain`) to stdout
pub fn cmd_render(file: &Path, plain: bool) -> Result<()> {
    let mode = if plain {
        RenderMode::Plain
    } else {
        RenderMode::Structured
    };
    println!("{}", render_file(file, mode)?);
    Ok(())
}

pub fn render_file(file: &Path, mode: RenderMode) -> Result<String> {
    let answer = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read answer file: {}", file.display()))?;
    render::render(mode, &answer)
        .with_context(|| format!("Failed to render {} as {}", file.display(), mode))
}
