//! toolchat - interactive entry point.
//!
//! Reads chat messages and commands from stdin. Logs go to stderr so stdout
//! stays the conversation surface.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use toolchat::agent::Chat;
use toolchat::cli::Repl;
use toolchat::config::{Config, Provider};
use toolchat::llm::OpenAiClient;
use toolchat::output::ConsoleSink;
use toolchat::tools::{builtin_catalog, CatalogSource, ManifestSource, PluginSource};

#[derive(Parser, Debug)]
#[command(name = "toolchat", version)]
#[command(about = "Chat with a language model that can call local tools")]
struct Cli {
    /// Model identifier (overrides OPENAI_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Directory of tool manifests (overrides TOOLS_DIR)
    #[arg(long)]
    tools_dir: Option<PathBuf>,

    /// Where saved conversations are written (overrides SAVE_DIR)
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Abandon a turn after this many seconds (overrides TURN_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "toolchat=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(model) = cli.model {
        config.model = model;
    }
    if let Some(dir) = cli.tools_dir {
        config.tools_dir = Some(dir);
    }
    if let Some(dir) = cli.save_dir {
        config.save_dir = dir;
    }
    if let Some(secs) = cli.timeout_secs.filter(|s| *s > 0) {
        config.turn_timeout = Some(Duration::from_secs(secs));
    }
    info!(
        "Loaded configuration: provider={} model={}",
        config.provider, config.model
    );

    let mut llm = OpenAiClient::new(config.api_key.clone(), config.base_url.clone());
    if config.provider == Provider::OpenRouter {
        llm = llm
            .with_header("HTTP-Referer", config.http_referer.clone())
            .with_header("X-Title", config.x_title.clone());
    }

    let source: Arc<dyn PluginSource> = match &config.tools_dir {
        Some(dir) => Arc::new(ManifestSource::new(dir.clone(), builtin_catalog())),
        None => Arc::new(CatalogSource::builtin()),
    };

    let mut chat = Chat::new(
        config.completion_options(),
        Arc::new(llm),
        config.system_prompt.clone(),
    )
    .with_sink(Arc::new(ConsoleSink::new()))
    .with_source(source)
    .with_provider(config.provider.to_string());

    println!("Discovering tools...");
    if let Some(report) = chat.discover_configured() {
        println!(
            "Loaded {} tool(s) from {}",
            report.tools_found, report.location
        );
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    Repl::new(chat, config).run(stdin, &mut stdout).await
}
