mod commands;

use clap::{Parser, Subcommand};
use llmdesk::config::Config;
use llmdesk::illustrate::MAX_FRAMES;
use llmdesk::images::{ImageModel, ImageQuality, ImageRequest, ImageStyle};
use llmdesk::prompts::Persona;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "llmdesk")]
#[command(version)]
#[command(about = "Chat, PDF question answering and image generation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant, optionally as a persona
    Chat {
        #[arg(short, long)]
        persona: Option<Persona>,
    },
    /// List available personas
    Personas,
    /// Ask questions answered only from the given PDFs
    Docs { files: Vec<PathBuf> },
    /// Generate images from a text prompt
    Image {
        prompt: String,
        #[arg(short, long, default_value = "dall-e-3")]
        model: ImageModel,
        #[arg(short, long, default_value = "1024x1024")]
        size: String,
        #[arg(long, default_value = "standard")]
        quality: ImageQuality,
        #[arg(long, default_value = "vivid")]
        style: ImageStyle,
        #[arg(short = 'n', long, default_value_t = 1)]
        count: u8,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Illustrate a topic stage by stage with an explanation
    Illustrate {
        topic: String,
        #[arg(short, long, default_value_t = MAX_FRAMES)]
        frames: usize,
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Personas => {
            commands::list_personas();
            Ok(())
        }
        Commands::Chat { persona } => {
            let config = load_config()?;
            commands::run_chat(&config, persona).await
        }
        Commands::Docs { files } => {
            let config = load_config()?;
            commands::run_docs(&config, &files).await
        }
        Commands::Image {
            prompt,
            model,
            size,
            quality,
            style,
            count,
            out,
        } => {
            let config = load_config()?;
            let request = ImageRequest::new(prompt, model)
                .with_size(size)
                .with_quality(quality)
                .with_style(style)
                .with_count(count);
            commands::run_image(&config, request, out).await
        }
        Commands::Illustrate { topic, frames, out } => {
            let config = load_config()?;
            commands::run_illustrate(&config, &topic, frames, out).await
        }
    }
}

fn load_config() -> anyhow::Result<Config> {
    let mut config = Config::load()?;
    commands::ensure_api_key(&mut config)?;
    Ok(config)
}
