// src/main.rs

use std::sync::Arc;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use maestro::api::{self, AppState};
use maestro::config::{KnowledgeConfig, CONFIG};
use maestro::llm::HttpCompletionProvider;
use maestro::orchestrator::{Orchestrator, OrchestratorConfig};
use maestro::tools::{StaticToolRegistry, ToolRegistry};

#[derive(Parser, Debug)]
#[command(name = "maestro", about = "Bounded tool-orchestration engine")]
struct Args {
    /// Bind address override (host:port)
    #[arg(long)]
    bind: Option<String>,

    /// Path to the knowledge-store configuration file
    #[arg(long, env = "MAESTRO_KNOWLEDGE_CONFIG")]
    knowledge_config: Option<String>,

    /// Default completion model for requests that don't pick one
    #[arg(long)]
    model: Option<String>,

    /// Keep the full step log in responses
    #[arg(long)]
    development: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenvy::dotenv().is_err() {
        eprintln!("No .env file found, using process environment");
    }
    let args = Args::parse();

    let level = CONFIG.log_level.parse().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let default_model = args.model.unwrap_or_else(|| CONFIG.default_model.clone());
    info!("Starting Maestro (default model: {})", default_model);

    let provider = HttpCompletionProvider::new()?;
    let knowledge = KnowledgeConfig::load(
        args.knowledge_config
            .as_deref()
            .unwrap_or(&CONFIG.knowledge_config_path),
    );
    info!(
        "Knowledge stores configured: {}",
        knowledge.vector_store_ids.len()
    );

    let orchestrator = Arc::new(Orchestrator::new(provider, knowledge));

    // Tool implementations belong to the embedding application; the
    // standalone server starts with an empty registry.
    let registry: Arc<dyn ToolRegistry> = Arc::new(StaticToolRegistry::new());

    let state = AppState {
        orchestrator,
        registry,
        default_model,
        config: OrchestratorConfig {
            development_mode: args.development,
            ..Default::default()
        },
    };

    let app = api::router(state);
    let bind_address = args.bind.unwrap_or_else(|| CONFIG.bind_address());
    info!("Listening on {}", bind_address);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
