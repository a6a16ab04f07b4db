//! Kampus CLI entry point

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use kampus::agent::ProviderRegistry;
use kampus::api::{self, AppState};
use kampus::retrieval::HttpKnowledgeBase;
use kampus::session::SessionRegistry;

#[derive(Parser)]
#[command(name = "kampus")]
#[command(about = "School-scoped student assistant")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (login / preset / chat routes)
    Serve {
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the assistant from the terminal
    Chat {
        /// Email for the session
        #[arg(short, long)]
        email: String,

        /// School name (free text, resolved against the alias table)
        #[arg(short, long)]
        school: String,

        /// Single message to send; omit for interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Show configuration status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port } => {
            let config = kampus::config::load()?;
            kampus::config::validate(&config)?;
            let port = port.unwrap_or(config.port);

            let registry = build_registry(config)?;
            let app = api::router(AppState {
                registry: Arc::new(registry),
            });

            let addr = format!("0.0.0.0:{port}");
            tracing::info!("listening on {addr}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            axum::serve(listener, app).await?;
        }

        Commands::Chat {
            email,
            school,
            message,
        } => {
            let config = kampus::config::load()?;
            kampus::config::validate(&config)?;

            let registry = build_registry(config)?;
            let session = registry.create_session(&email, &school).await?;
            println!(
                "Oturum açıldı: {} ({})\n",
                session.school_name, session.school.code
            );

            if let Some(msg) = message {
                let answer = session.chat(&msg).await?;
                println!("{answer}");
            } else {
                run_interactive(&session).await?;
            }
        }

        Commands::Status => {
            let config = kampus::config::load()?;
            println!("Kampus Status\n");
            println!("Model: {}", config.model);
            println!("Provider: {}", config.provider);
            println!("Retrieval service: {}", config.retrieval_url);
            println!(
                "Gemini API key: {}",
                if config.gemini_api_key.is_empty() { "not set" } else { "set" }
            );
            println!(
                "Serper API key: {}",
                if config.serper_api_key.is_empty() {
                    "not set (web search degraded)"
                } else {
                    "set"
                }
            );
        }
    }

    Ok(())
}

fn build_registry(config: kampus::config::Config) -> Result<SessionRegistry> {
    let kb = Arc::new(HttpKnowledgeBase::new(
        &config.retrieval_url,
        &config.db_name,
    ));
    let llm = ProviderRegistry::create(&config)?;
    Ok(SessionRegistry::new(config, kb, llm))
}

async fn run_interactive(session: &kampus::session::Session) -> Result<()> {
    use std::io::{self, Write};

    loop {
        print!("\x1b[1;34mSen\x1b[0m: ");
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            break;
        }

        if input.is_empty() {
            continue;
        }

        match session.chat(input).await {
            Ok(answer) => println!("\n\x1b[1;32mAsistan\x1b[0m: {answer}\n"),
            Err(e) => println!("\n\x1b[1;31mHata\x1b[0m: {e}\n"),
        }
    }

    Ok(())
}
