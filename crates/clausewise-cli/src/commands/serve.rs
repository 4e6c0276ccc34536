//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};
use clausewise_core::{BackendKind, RenderMode, Settings};

pub async fn cmd_serve(
    settings: &Settings,
    host: &str,
    port: u16,
    static_dir: Option<&Path>,
) -> Result<()> {
    println!("🚀 Starting Clausewise web server...");
    println!("   Listening: http://{}:{}", host, port);
    match settings.backend {
        BackendKind::Gemini => println!("   Backend: gemini (model: {})", settings.gemini.model),
        BackendKind::Mock => println!("   Backend: mock"),
    }
    println!("   Render mode: {}", settings.render_mode);
    println!("   System prompt: {}", settings.prompt_source().describe());
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }
    if settings.stream && settings.render_mode == RenderMode::Structured {
        println!();
        println!("   ⚠️  --stream ignored: structured answers are rendered once complete");
    }
    if settings.backend == BackendKind::Mock {
        println!();
        println!("   ⚠️  Mock backend active - answers are canned");
    }
    println!();

    let static_dir = static_dir
        .map(|d| {
            d.to_str()
                .with_context(|| format!("Static directory is not valid UTF-8: {}", d.display()))
        })
        .transpose()?;

    clausewise_server::serve(settings, host, port, static_dir).await
}
