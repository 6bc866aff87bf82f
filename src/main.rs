use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use atende_gateway::db::{self, CustomerRepo, HistoryRepo};
use atende_gateway::delivery;
use atende_gateway::gateway::EvolutionClient;
use atende_gateway::llm::OpenAiChat;
use atende_gateway::media::providers::{OpenAiVision, WhisperTranscriber};
use atende_gateway::retry::RetryPolicy;
use atende_gateway::serialize::CustomerLocks;
use atende_gateway::tools::{ContactTechnician, ToolRegistry};
use atende_gateway::{api, Config, PipelineDeps};

/// Atende - conversational-commerce WhatsApp bot
#[derive(Parser)]
#[command(name = "atende", version, about)]
struct Cli {
    /// Port to listen on (overrides ATENDE_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,atende_gateway=info",
        1 => "info,atende_gateway=debug",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env()?;
    let port = cli.port.unwrap_or(config.port);

    let pool = db::init(&config.db_path)?;
    let policy = RetryPolicy::default();

    let gateway = Arc::new(EvolutionClient::new(
        &config.gateway_url,
        &config.gateway_api_key,
        &config.gateway_instance,
        policy,
    ));

    let mut tools = ToolRegistry::new();
    if config.technician_phone.trim().is_empty() {
        tracing::warn!("no technician phone configured, handoff tool disabled");
    } else {
        tools.register(Arc::new(ContactTechnician::new(
            gateway.clone(),
            &config.technician_phone,
        )));
    }

    let deps = Arc::new(PipelineDeps {
        gateway: gateway.clone(),
        model: Arc::new(OpenAiChat::new(&config.openai_api_key, policy)),
        transcriber: Arc::new(WhisperTranscriber::new(
            &config.openai_api_key,
            &config.stt_model,
            &config.stt_language,
        )),
        vision: Arc::new(OpenAiVision::new(&config.openai_api_key, &config.chat_model)),
        customers: CustomerRepo::new(pool.clone()),
        history: HistoryRepo::new(pool),
        tools,
        locks: CustomerLocks::new(),
        config,
    });

    tracing::info!(
        port,
        instance = %deps.config.gateway_instance,
        model = %deps.config.chat_model,
        max_fragment = deps.config.max_fragment_size,
        max_send_attempts = delivery::MAX_SEND_ATTEMPTS,
        "starting atende gateway"
    );

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, api::router(deps)).await?;

    Ok(())
}
