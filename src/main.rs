use std::path::PathBuf;

use anyhow::Context;
use archivist_core::config::{Config, ProviderKind};
use archivist_core::context::{ConversationContext, build_system_prompt};
use archivist_core::pipeline::ChatPipeline;
use archivist_index::ingest;
use archivist_index::qdrant::QdrantArchive;
use archivist_llm::any::AnyProvider;
use archivist_llm::azure::AzureOpenAiProvider;
use archivist_llm::openai::OpenAiProvider;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Parser)]
#[command(name = "archivist", version, about = "Chat assistant over a historical archive")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Interactive chat session over the archive (default).
    Chat,
    /// Embed and upload a text corpus CSV (chapter,section,paragraph,content).
    IngestText {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Embed and upload an image corpus CSV (name,path,..,..,caption).
    IngestImages {
        #[arg(long)]
        csv: PathBuf,
        /// Batch number used as the id prefix for this upload.
        #[arg(long, default_value_t = 1)]
        batch: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config);
    let mut config = Config::load(&config_path)?;
    config.resolve_secrets();

    let provider = create_provider(&config)?;
    tracing::info!(provider = provider_name(&provider), "provider configured");

    let index = QdrantArchive::new(
        &config.index.url,
        config.index.chunks_collection.clone(),
        config.index.images_collection.clone(),
    )?;

    match cli.command.unwrap_or(Command::Chat) {
        Command::Chat => run_chat(&config, provider, index).await,
        Command::IngestText { csv } => {
            let records = ingest::read_chunk_rows(&csv)?;
            let count = ingest::ingest_chunks(&provider, &index, records).await?;
            println!("ingested {count} text chunks");
            Ok(())
        }
        Command::IngestImages { csv, batch } => {
            let records = ingest::read_image_rows(&csv, batch)?;
            let count = ingest::ingest_images(&provider, &index, records).await?;
            println!("ingested {count} image records");
            Ok(())
        }
    }
}

fn provider_name(provider: &AnyProvider) -> &'static str {
    match provider {
        AnyProvider::OpenAi(_) => "openai",
        AnyProvider::Azure(_) => "azure-openai",
    }
}

fn resolve_config_path(cli_path: Option<PathBuf>) -> PathBuf {
    if let Some(path) = cli_path {
        return path;
    }
    if let Ok(path) = std::env::var("ARCHIVIST_CONFIG") {
        return PathBuf::from(path);
    }
    PathBuf::from("config/default.toml")
}

fn create_provider(config: &Config) -> anyhow::Result<AnyProvider> {
    let api_key = config
        .secrets
        .api_key
        .as_ref()
        .context("ARCHIVIST_API_KEY not set")?
        .expose()
        .to_owned();

    match config.llm.provider {
        ProviderKind::OpenAi => Ok(AnyProvider::OpenAi(OpenAiProvider::new(
            api_key,
            config.llm.base_url.clone(),
            config.llm.model.clone(),
            Some(config.llm.embedding_model.clone()),
            config.llm.temperature,
            config.llm.max_tokens,
        ))),
        ProviderKind::Azure => Ok(AnyProvider::Azure(AzureOpenAiProvider::new(
            api_key,
            config.llm.base_url.clone(),
            config.llm.api_version.clone(),
            config.llm.model.clone(),
            Some(config.llm.embedding_model.clone()),
            config.llm.temperature,
            config.llm.max_tokens,
        ))),
    }
}

async fn run_chat(
    config: &Config,
    provider: AnyProvider,
    index: QdrantArchive,
) -> anyhow::Result<()> {
    let pipeline = ChatPipeline::new(provider, index, config.pipeline.clone());
    let mut ctx = ConversationContext::new(build_system_prompt(&config.pipeline.keyword_stoplist));

    println!("archivist v{}", env!("CARGO_PKG_VERSION"));
    println!("ask a question about the archive, or type `exit` to quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"you> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query == "exit" || query == "quit" {
            break;
        }

        match pipeline.process_turn(query, &mut ctx).await {
            Ok(output) => {
                println!("\n{}\n", output.answer);
                if !output.sources.is_empty() {
                    let ids = output
                        .sources
                        .iter()
                        .map(|s| s.key.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    println!("sources: {ids}");
                }
                for image in &output.images {
                    println!("image: {} ({})", image.name, image.display_title());
                }
                println!();
            }
            Err(e) => {
                tracing::error!("query failed: {e:#}");
                println!("query failed, nothing was added to the conversation: {e}");
            }
        }
    }

    Ok(())
}
