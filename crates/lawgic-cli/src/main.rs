use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod app;
mod commands;
mod render;
mod theme;

#[derive(Parser)]
#[command(name = "lawgic")]
#[command(about = "Lawgic - AI guide to Bangladeshi law and the constitution")]
#[command(version)]
struct Cli {
    /// Ask a single question and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Gemini model to use
    #[arg(short, long)]
    model: Option<String>,

    /// File to send with --prompt (PNG, JPEG, WEBP or PDF)
    #[arg(short, long, requires = "prompt")]
    attach: Option<PathBuf>,

    /// Directory for the persisted conversation
    #[arg(long)]
    session_dir: Option<PathBuf>,

    /// Color theme (dark, light, plain)
    #[arg(long, default_value = "dark")]
    theme: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = lawgic_core::Settings::load();

    if let Some(ref model) = cli.model {
        settings.llm.model = model.clone();
    }
    if let Some(ref dir) = cli.session_dir {
        settings.storage.session_dir = Some(dir.clone());
    }

    if let Some(prompt) = cli.prompt {
        app::run_single_prompt(&settings, &prompt, cli.attach.as_deref(), &cli.theme).await?;
    } else {
        app::run_repl(settings, &cli.theme).await?;
    }

    Ok(())
}
