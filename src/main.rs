use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use rankup::config::{CoachConfig, ModelChoice};
use rankup::constants;
use rankup::session::SessionFactory;
use rankup::{chat, web_server};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the local Ollama server.
    #[arg(long, global = true, env = "OLLAMA_URL", default_value_t = constants::OLLAMA_URL.clone())]
    ollama_url: String,

    /// Sampling temperature, fixed for every reply.
    #[arg(long, global = true, env = "RANKUP_TEMPERATURE", default_value_t = constants::DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Replace the built-in coach persona.
    #[arg(long, global = true, env = "RANKUP_PERSONA")]
    persona: Option<String>,
}

// Define the available subcommands
#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the coach web UI.
    Serve {
        #[arg(long, env = "RANKUP_PORT", default_value_t = constants::DEFAULT_PORT, help = "Port for the web server.")]
        port: u16,
        #[arg(long, value_enum, default_value_t = ModelChoice::default(), help = "Model preselected in the UI.")]
        model: ModelChoice,
        #[arg(long, default_value_t = constants::TEMPLATES_DIR.clone())]
        templates_dir: String,
        #[arg(long, default_value_t = constants::STATIC_DIR.clone())]
        static_dir: String,
    },
    /// Chat with the coach in the terminal.
    Chat {
        #[arg(long, value_enum, default_value_t = ModelChoice::default())]
        model: ModelChoice,
    },
    /// List the selectable models.
    Models,
}

impl Cli {
    fn config(&self, model: ModelChoice) -> CoachConfig {
        CoachConfig {
            ollama_url: self.ollama_url.clone(),
            model,
            temperature: self.temperature,
            persona: self
                .persona
                .clone()
                .unwrap_or_else(|| constants::DEFAULT_PERSONA.to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (OLLAMA_URL, RANKUP_*)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g. RUST_LOG=info,rankup=debug). Logs go to
    // stderr so the terminal chat keeps stdout to itself.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("rankup starting with command: {:?}", cli.command);

    match &cli.command {
        Commands::Serve {
            port,
            model,
            templates_dir,
            static_dir,
        } => {
            let config = cli.config(*model);
            info!(ollama_url = %config.ollama_url, model = %config.model, "Starting web UI on port {}...", port);
            let state = web_server::AppState::new(SessionFactory::ollama(&config), templates_dir, static_dir);

            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received, shutting down...");
                }
                res = web_server::start_web_server(*port, state) => {
                    if let Err(e) = res {
                        error!("Web server failed: {:?}", e);
                        return Err(e);
                    }
                }
            }
            info!("Shutdown complete.");
        }
        Commands::Chat { model } => {
            let config = cli.config(*model);
            let session = SessionFactory::ollama(&config).open(None);
            chat::run_chat(session)
                .await
                .context("Chat session failed")?;
        }
        Commands::Models => {
            for model in ModelChoice::ALL {
                if model == ModelChoice::default() {
                    println!("{} (default)", model);
                } else {
                    println!("{}", model);
                }
            }
        }
    }

    Ok(())
}
