//! Batch command-line interface for the market intelligence pipeline
//!
//! Credentials come from the environment: `OPENAI_API_KEY` (plus optional
//! `OPENAI_API_BASE`) and `SERPER_API_KEY`.

use anyhow::Context;
use clap::Parser;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use pulse_llm::{OpenAIConfig, OpenAIProvider};
use pulse_pipeline::{
    default_markets, BatchSummary, MarketStatus, PipelineConfig, PipelineOrchestrator, StageStatus,
};
use pulse_sources::{CacheStore, CachedSearch, SerperClient, YahooMarketData};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "market-pulse")]
#[command(about = "Generate market intelligence artifacts for configured markets", long_about = None)]
struct Args {
    /// Directory for persisted artifacts
    #[arg(long, default_value = "data")]
    output_dir: String,

    /// Directory for the search cache
    #[arg(long, default_value = "cache")]
    cache_dir: String,

    /// Market keys to process (default: all configured markets)
    #[arg(short, long, value_delimiter = ',')]
    markets: Vec<String>,

    /// Markets processed concurrently
    #[arg(long, default_value_t = 2)]
    concurrency: usize,

    /// Model identifier
    #[arg(long, default_value = "gpt-4.1-mini")]
    model: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let markets = if args.markets.is_empty() {
        default_markets()
    } else {
        let all = default_markets();
        let selected: Vec<_> = all
            .into_iter()
            .filter(|m| args.markets.contains(&m.key))
            .collect();
        anyhow::ensure!(
            selected.len() == args.markets.len(),
            "unknown market key in {:?}; known keys: crude_oil, sugar, usd_thb",
            args.markets
        );
        selected
    };

    let config = PipelineConfig::builder()
        .markets(markets)
        .model(args.model)
        .concurrency_limit(args.concurrency)
        .cache_dir(&args.cache_dir)
        .output_dir(&args.output_dir)
        .build()
        .context("invalid pipeline configuration")?;

    let llm_config = OpenAIConfig::from_env()
        .context("LLM credentials missing")?
        .with_timeout(config.request_timeout.as_secs());
    let model = Arc::new(OpenAIProvider::with_config(llm_config)?);
    let search_cache =
        CacheStore::new(&config.cache_dir).context("failed to open search cache")?;
    let search = Arc::new(CachedSearch::new(
        SerperClient::from_env(config.request_timeout).context("search credentials missing")?,
        search_cache,
        7,
    ));

    info!(markets = config.markets.len(), "starting market-pulse batch");
    let orchestrator = PipelineOrchestrator::new(config, model, YahooMarketData::new(), search)?;
    let summary = orchestrator.run_batch().await?;

    println!("{}", summary_table(&summary));

    if summary.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn summary_table(summary: &BatchSummary) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(["Market", "Status", "Degraded stages", "Error"]);

    for report in &summary.reports {
        let status = match report.status {
            MarketStatus::Ok => "ok",
            MarketStatus::Degraded => "degraded",
            MarketStatus::Failed => "failed",
        };
        let degraded: Vec<String> = report
            .events
            .iter()
            .filter(|e| e.status == StageStatus::Degraded)
            .map(|e| format!("{:?}", e.stage).to_lowercase())
            .collect();

        table.add_row(vec![
            Cell::new(&report.market),
            Cell::new(status),
            Cell::new(degraded.join(", ")),
            Cell::new(report.error_kind.as_deref().unwrap_or("")),
        ]);
    }
    table
}
