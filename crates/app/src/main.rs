use bva_rag_core::{
    find_by_condition, parse_decision_text, BvaApiSource, ChromaStore, ChunkIndex, ContentSource,
    ContentType, IngestPipeline, IngestSelection, QueryFilters, SearchQuery, SourceKind,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bva-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// BVA scraper API base URL
    #[arg(long, env = "BVA_API_URL", default_value = "http://localhost:8001")]
    api_url: String,

    /// ChromaDB base URL
    #[arg(long, env = "CHROMA_URL", default_value = "http://localhost:8000")]
    chroma_url: String,

    /// Chroma collection name
    #[arg(long, default_value = "bva_rag")]
    collection: String,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch CFR sections and KnowVA articles, chunk them, and index.
    Ingest {
        /// Content to ingest: cfr, knowva, or all.
        #[arg(long, default_value = "all")]
        source: String,
        /// Drop the collection before ingesting.
        #[arg(long, default_value_t = false)]
        clear: bool,
    },
    /// Vector search over the indexed chunks.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Number of candidates to return.
        #[arg(long, default_value = "5")]
        top_k: usize,
        /// Restrict to a source: cfr or knowva.
        #[arg(long)]
        source: Option<String>,
        /// Restrict to a content type: rating_criteria, adjudication, or guidance.
        #[arg(long)]
        content_type: Option<String>,
        /// Restrict to a CFR part.
        #[arg(long)]
        part: Option<String>,
        /// Restrict to a rating schedule.
        #[arg(long)]
        schedule: Option<String>,
    },
    /// Extract structured fields from a decision document.
    Parse {
        /// Path to a local decision text file.
        #[arg(long, conflicts_with = "url")]
        file: Option<String>,
        /// Decision URL to fetch through the API.
        #[arg(long)]
        url: Option<String>,
    },
    /// Look up diagnostic codes by condition name.
    Codes {
        /// Case-insensitive substring of the condition name.
        #[arg(long)]
        condition: String,
    },
    /// Print chunk counts by source and content type.
    Stats,
    /// Drop every chunk from the collection.
    Clear,
}

fn parse_source_kind(source: &str) -> anyhow::Result<SourceKind> {
    match source {
        "cfr" => Ok(SourceKind::Cfr),
        "knowva" => Ok(SourceKind::Knowva),
        other => anyhow::bail!("unknown source '{other}', expected cfr or knowva"),
    }
}

fn parse_content_type(content_type: &str) -> anyhow::Result<ContentType> {
    match content_type {
        "rating_criteria" => Ok(ContentType::RatingCriteria),
        "adjudication" => Ok(ContentType::Adjudication),
        "guidance" => Ok(ContentType::Guidance),
        other => anyhow::bail!(
            "unknown content type '{other}', expected rating_criteria, adjudication, or guidance"
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();

    let store = ChromaStore::new(&cli.chroma_url, &cli.collection)
        .map_err(|error| anyhow::anyhow!(error.to_string()))?;

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "bva-rag boot"
    );

    match cli.command {
        Command::Ingest { source, clear } => {
            let selection: IngestSelection = source.parse()?;

            let api = BvaApiSource::new(&cli.api_url)
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            let status = api
                .health()
                .await
                .map_err(|error| anyhow::anyhow!("API at {} unreachable: {error}", cli.api_url))?;
            info!(status = %status, "API health");

            if clear {
                let removed = store
                    .clear()
                    .await
                    .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                info!(removed, "cleared collection before ingest");
            }

            let pipeline = IngestPipeline::new(api, store);
            let report = pipeline
                .run(selection)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            for skipped in &report.skipped {
                warn!(label = %skipped.label, reason = %skipped.reason, "skipped source");
            }

            println!(
                "{} chunks indexed ({} skipped sources) at {}",
                report.indexed,
                report.skipped.len(),
                Utc::now().to_rfc3339()
            );
        }
        Command::Search {
            query,
            top_k,
            source,
            content_type,
            part,
            schedule,
        } => {
            let filters = QueryFilters {
                source: source.as_deref().map(parse_source_kind).transpose()?,
                content_type: content_type.as_deref().map(parse_content_type).transpose()?,
                part,
                schedule,
            };
            let search_query = SearchQuery {
                text: query,
                top_k,
                filters,
            };

            let candidates = store
                .search(&search_query)
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            if candidates.is_empty() {
                println!("no results");
            }
            for candidate in candidates {
                println!("[{}] score={:.4}", candidate.id, candidate.score);
                for (key, value) in &candidate.metadata {
                    println!("  {key}={value}");
                }
                println!("  text:\n{}", candidate.text);
            }
        }
        Command::Parse { file, url } => {
            let record = match (file, url) {
                (Some(path), None) => {
                    let text = tokio::fs::read_to_string(&path).await?;
                    parse_decision_text(&text)
                }
                (None, Some(url)) => {
                    let api = BvaApiSource::new(&cli.api_url)
                        .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                    let text = api
                        .decision_text(&url)
                        .await
                        .map_err(|error| anyhow::anyhow!(error.to_string()))?;
                    parse_decision_text(&text)
                }
                _ => anyhow::bail!("pass exactly one of --file or --url"),
            };

            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Codes { condition } => {
            let entries = find_by_condition(&condition);
            if entries.is_empty() {
                println!("no diagnostic codes match '{condition}'");
            }
            for entry in entries {
                println!(
                    "{} {} (38 CFR {}.{}, {})",
                    entry.code, entry.condition, entry.part, entry.section, entry.schedule
                );
            }
        }
        Command::Stats => {
            let stats = store
                .stats()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;

            println!("total_chunks: {}", stats.total_chunks);
            for (source, count) in &stats.by_source {
                println!("  source {source}: {count}");
            }
            for (content_type, count) in &stats.by_content_type {
                println!("  content_type {content_type}: {count}");
            }
        }
        Command::Clear => {
            let removed = store
                .clear()
                .await
                .map_err(|error| anyhow::anyhow!(error.to_string()))?;
            println!("{removed} chunks removed");
        }
    }

    Ok(())
}
