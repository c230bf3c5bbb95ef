use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use parley_gateway::Config;
use parley_gateway::api::ApiServer;
use parley_gateway::chat::{ChatClient, DEFAULT_SYSTEM_PROMPT};
use parley_gateway::context::{Augmenter, SearchClient, SearchLookup, WeatherClient};
use parley_gateway::pipeline::Pipeline;
use parley_gateway::voice::{SpeechSynthesizer, Transcriber};

/// Parley - voice assistant pipeline gateway
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Port to listen on (overrides PARLEY_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,parley_gateway=info",
        1 => "info,parley_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
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
    let config = Config::load()?;
    let port = cli.port.unwrap_or(config.port);

    tracing::info!(
        port,
        stt_model = %config.stt_model,
        chat_model = %config.chat_model,
        tts_voice = %config.tts_voice,
        search_configured = config.search.is_some(),
        "starting parley gateway"
    );

    let transcriber = Transcriber::new(config.openai_api_key.clone(), config.stt_model.clone())?;
    let generator = ChatClient::new(config.openai_api_key.clone(), config.chat_model.clone())?;
    let synthesizer = SpeechSynthesizer::new(
        config.openai_api_key.clone(),
        config.tts_model.clone(),
        config.tts_voice.clone(),
    )?;

    let search: Option<Arc<dyn SearchLookup>> = config
        .search
        .clone()
        .map(|provider| Arc::new(SearchClient::new(provider)) as Arc<dyn SearchLookup>);
    let augmenter = Augmenter::new(search, Arc::new(WeatherClient::new()));

    let system_prompt = config
        .system_prompt
        .clone()
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

    let pipeline = Pipeline::new(
        Arc::new(transcriber),
        augmenter,
        Arc::new(generator),
        Arc::new(synthesizer),
        system_prompt,
        config.language.clone(),
    );

    ApiServer::new(pipeline, port).run().await?;

    Ok(())
}
