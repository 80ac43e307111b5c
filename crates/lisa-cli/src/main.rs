//! lisa - chat with the Lisa parts assistant
//!
//! `lisa serve` runs the HTTP API for the chat page, `lisa chat` talks to
//! the assistant from the terminal, and `lisa render` shows how a reply
//! would be displayed.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use lisa_core::assistant::InMemoryAssistant;
use lisa_core::{AssistantService, ImageAttachment, LisaConfig, RenderDispatcher, ReplyPayload};

mod chat;
mod server;
mod tui;

#[derive(Parser)]
#[command(name = "lisa")]
#[command(version, about = "Chat with the Lisa parts assistant", long_about = None)]
struct Cli {
    /// Config file (default: ~/.lisa/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Address to bind (overrides config and HOST)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Chat in the terminal
    Chat {
        /// Use a local echo assistant instead of the remote service
        #[arg(long)]
        offline: bool,
        /// Continue an existing thread
        #[arg(long)]
        thread: Option<String>,
    },
    /// Show how a reply would be rendered
    Render {
        /// Reply text, or a `{ "message", "trainPart" }` JSON object (default: stdin)
        file: Option<PathBuf>,
        /// Print the render instruction as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Same shape as the body of `POST /api/render`
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RenderInput {
    #[serde(default)]
    message: String,
    #[serde(default)]
    train_part: Option<ImageAttachment>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.command {
        Commands::Serve { .. } => "info",
        Commands::Chat { .. } | Commands::Render { .. } => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = LisaConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            let service: Arc<dyn AssistantService> = Arc::new(config.remote_assistant()?);
            server::serve(service, &config).await
        }
        Commands::Chat { offline, thread } => {
            let service: Arc<dyn AssistantService> = if offline {
                Arc::new(InMemoryAssistant::echo())
            } else {
                Arc::new(config.remote_assistant()?)
            };
            chat::run(service, &config, thread).await
        }
        Commands::Render { file, json } => render(&config, file, json),
    }
}

fn render(config: &LisaConfig, file: Option<PathBuf>, json: bool) -> Result<()> {
    let input = match &file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let payload = payload_from_input(&input);
    let instruction = RenderDispatcher::new(config.render.clone()).classify(&payload);

    if json {
        println!("{}", serde_json::to_string_pretty(&instruction)?);
        return Ok(());
    }

    let width = crossterm::terminal::size()
        .map(|(cols, _)| cols as usize)
        .unwrap_or(80);
    let rendered = tui::markdown::render_instruction(&instruction, width, &tui::theme::Theme::default());
    tui::print_lines(&mut std::io::stdout(), &rendered.lines)?;
    Ok(())
}

/// JSON input in the `/api/render` shape, anything else is reply text
fn payload_from_input(input: &str) -> ReplyPayload {
    if input.trim_start().starts_with('{') {
        if let Ok(parsed) = serde_json::from_str::<RenderInput>(input) {
            return ReplyPayload {
                text: parsed.message,
                attachment: parsed.train_part,
            };
        }
    }
    ReplyPayload::text(input.trim_end_matches('\n'))
}
