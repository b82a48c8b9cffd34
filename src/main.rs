//! searchsynth command line entry point

use anyhow::{Context, Result};
use clap::Parser;
use searchsynth::{
    backends::{BackendLoader, SearchBackend},
    config::{self, Settings},
    llm::{parse_thinking, LanguageModelClient, OpenAiCompatibleClient},
    network::HttpClient,
    PipelineResult, SearchPipeline,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset
const DEFAULT_LOG_FILTER: &str = "info";

/// Answer a question from web search results with cited sources
#[derive(Parser, Debug)]
#[command(name = "searchsynth")]
#[command(version = searchsynth::VERSION)]
#[command(
    about = "Answer a question from web search results with cited sources",
    long_about = None
)]
struct Cli {
    /// Configuration file path
    #[arg(long, short, env = config::SETTINGS_PATH_ENV)]
    config: Option<PathBuf>,

    /// Print the model's thinking segment to stderr
    #[arg(long)]
    show_thinking: bool,

    /// Model override for both query generation and synthesis
    #[arg(long, short)]
    model: Option<String>,

    /// List models offered by the configured endpoint and exit
    #[arg(long, conflicts_with = "query")]
    list_models: bool,

    /// Question to answer
    #[arg(required_unless_present = "list_models")]
    query: Vec<String>,
}

/// Configured collaborators, ready to build a pipeline
struct App {
    settings: Settings,
    llm: Arc<OpenAiCompatibleClient>,
    backend: Arc<dyn SearchBackend>,
}

impl App {
    fn build(cli: &Cli) -> Result<Self> {
        let mut settings = config::load(cli.config.as_deref())?;
        if let Some(model) = &cli.model {
            settings.llm.model = model.clone();
        }

        let client = HttpClient::with_settings(&settings.outgoing)
            .context("failed to initialize HTTP client")?;
        let backend = BackendLoader::load(&settings, &client)?;
        let llm = OpenAiCompatibleClient::from_settings(&settings.llm)
            .context("failed to initialize language model client")?;

        Ok(Self {
            settings,
            llm: Arc::new(llm),
            backend,
        })
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let app = match App::build(&cli) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ExitCode::from(2);
        }
    };

    if cli.list_models {
        return list_models(app.llm.as_ref()).await;
    }

    let query = cli.query.join(" ");
    info!("searchsynth v{} answering '{}'", searchsynth::VERSION, query);

    let token = CancellationToken::new();
    let ctrl_c = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling");
                token.cancel();
            }
        })
    };

    let pipeline = SearchPipeline::from_settings(&app.settings, app.llm.clone(), app.backend);
    let result = pipeline.run_with_cancellation(&query, token).await;
    ctrl_c.abort();

    match result {
        PipelineResult::Synthesized(text) => {
            let parsed = parse_thinking(&text);
            if cli.show_thinking {
                if let Some(thinking) = &parsed.thinking_content {
                    eprintln!("--- thinking ---\n{}\n----------------", thinking);
                }
            }
            println!("{}", parsed.main_content);
            ExitCode::SUCCESS
        }
        PipelineResult::Failed(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn list_models(llm: &dyn LanguageModelClient) -> ExitCode {
    match llm.list_models().await {
        Ok(models) => {
            for model in models {
                match model.owned_by {
                    Some(owner) => println!("{}\t{}", model.id, owner),
                    None => println!("{}", model.id),
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_filter_is_info() {
        assert_eq!(EnvFilter::new(DEFAULT_LOG_FILTER).to_string(), "info");
    }

    #[test]
    fn test_query_words_are_collected() {
        let args = ["searchsynth", "--show-thinking", "best", "web", "frameworks"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.query.join(" "), "best web frameworks");
        assert!(cli.show_thinking);
        assert!(!cli.list_models);
    }

    #[test]
    fn test_list_models_needs_no_query() {
        let cli = Cli::try_parse_from(["searchsynth", "--list-models", "-m", "qwen3:8b"]).unwrap();
        assert!(cli.list_models);
        assert_eq!(cli.model.as_deref(), Some("qwen3:8b"));
    }

    #[test]
    fn test_query_required() {
        assert!(Cli::try_parse_from(["searchsynth"]).is_err());
    }
}
