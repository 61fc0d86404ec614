use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use flatmatch_api::{AppState, RestApi};
use flatmatch_core::{MatchPipeline, PipelineConfig};
use flatmatch_provider::{OpenAiClient, OpenAiConfig};
use flatmatch_store::QdrantStore;

/// Conversation-driven rental listing matcher
#[derive(Parser, Debug)]
#[command(name = "flatmatch")]
#[command(about = "Streaming rental listing matcher", long_about = None)]
struct Args {
    /// Address to bind the HTTP API to
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: String,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: String,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    openai_base_url: String,

    /// Embedding model
    #[arg(long, default_value = "text-embedding-3-small")]
    embedding_model: String,

    /// Chat model
    #[arg(long, default_value = "gpt-4o-mini")]
    chat_model: String,

    /// Vision model used when listings have photos
    #[arg(long, default_value = "gpt-4o")]
    vision_model: String,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection holding the listings
    #[arg(long, default_value = "listings")]
    collection: String,

    /// Candidates retrieved from the vector store
    #[arg(long, default_value_t = 50)]
    top_k: usize,

    /// Cap on candidates sent for scoring (0 = unbounded)
    #[arg(long, default_value_t = 15)]
    max_scored: usize,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting flatmatch v{}", env!("CARGO_PKG_VERSION"));
    info!("Vector store: {} (collection {})", args.qdrant_url, args.collection);

    let provider = Arc::new(OpenAiClient::new(OpenAiConfig {
        api_key: args.openai_api_key,
        base_url: args.openai_base_url,
        embedding_model: args.embedding_model,
        chat_model: args.chat_model,
        vision_model: args.vision_model,
        timeout: Duration::from_secs(60),
        max_retries: 4,
    })?);
    let store = Arc::new(QdrantStore::new(args.qdrant_url, args.collection));

    let config = PipelineConfig {
        top_k: args.top_k,
        max_scored: (args.max_scored > 0).then_some(args.max_scored),
        ..Default::default()
    };
    let pipeline = Arc::new(MatchPipeline::new(provider.clone(), store, config));
    let state = AppState { pipeline, provider };

    let bind = args.bind.clone();
    let http_handle = std::thread::spawn(move || {
        info!("Starting HTTP server on {}", bind);
        let sys = actix_web::rt::System::new();
        sys.block_on(async {
            if let Err(e) = RestApi::start(state, bind).await {
                eprintln!("HTTP server error: {}", e);
            }
        })
    });

    info!("flatmatch started successfully");
    info!("HTTP API: http://{}/", args.bind);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
        _ = tokio::task::spawn_blocking(move || {
            http_handle.join().ok();
        }) => {
            info!("HTTP server stopped");
        }
    }

    info!("Shutting down...");
    Ok(())
}
