//! ALTMAN: SEC filing ingestion and Z''-Score distress pipeline
//!
//! Entry point. Loads configuration, initialises structured logging and
//! dispatches one CLI subcommand.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

use altman::analysis::{diagnose, verifier};
use altman::api;
use altman::config::AppConfig;
use altman::engine::health::HealthChecker;
use altman::engine::{pipeline, AppContext};
use altman::labels::BankruptcyLabeler;
use altman::sec::master_index::crawl_8k_index;
use altman::sec::ticker_map::load_ticker_map;
use altman::storage;
use altman::types::{Cik, Quarter};
use altman::universe::{read_mapping, CikMatcher, IndexKind};

const BANNER: &str = r#"
    _    _   _____ __  __    _    _   _
   / \  | | |_   _|  \/  |  / \  | \ | |
  / _ \ | |   | | | |\/| | / _ \ |  \| |
 / ___ \| |___| | | |  | |/ ___ \| |\  |
/_/   \_\_____|_| |_|  |_/_/   \_\_| \_|

  Z''-Score distress screening from SEC filings
"#;

#[derive(Parser, Debug)]
#[command(name = "altman", version, about = "SEC filing ingestion and Z''-Score pipeline")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape index constituents and map their tickers to CIKs
    MapCiks {
        /// Index universe (NDX or SP500); defaults to settings.target_index
        #[arg(long)]
        index: Option<IndexKind>,
    },

    /// List universe members without an annual report for a fiscal year
    Verify {
        /// Fiscal year; defaults to settings.target_fy
        #[arg(long)]
        fy: Option<i32>,
    },

    /// Load FSDS quarters, score every annual filing and store the results
    Run {
        /// Fiscal year to analyse; defaults to settings.target_year
        #[arg(long)]
        year: Option<i32>,

        /// Analyse every fiscal year found
        #[arg(long, conflicts_with = "year")]
        all_years: bool,
    },

    /// Show which core tags are missing from a filer's latest annual report
    Diagnose {
        cik: Cik,
    },

    /// Print stored results for a CIK
    Search {
        cik: Cik,
    },

    /// Score the universe from SEC company facts
    Health {
        /// Rebuild the CIK mapping for this index first
        #[arg(long)]
        index: Option<IndexKind>,
    },

    /// Download a quarter's EDGAR master index and keep the 8-K rows
    #[command(name = "crawl-8k")]
    Crawl8k {
        #[arg(long)]
        year: i32,

        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
        quarter: u8,

        /// Output directory; defaults to paths.processed_data_dir
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Label 8-K filings that report Item 1.03 (bankruptcy)
    LabelBankruptcy {
        /// 8-K index CSV written by crawl-8k
        #[arg(long)]
        input: PathBuf,

        /// Label CSV; also the resume checkpoint
        #[arg(long)]
        output: PathBuf,
    },

    /// Load every quarter's tag.txt into the database and deduplicate
    IngestTags,

    /// Serve stored results over HTTP
    Serve {
        /// Port; defaults to server.port
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load(&cli.config)?;

    init_logging();
    println!("{BANNER}");

    match cli.command {
        Command::MapCiks { index } => cmd_map_ciks(cfg, index).await,
        Command::Verify { fy } => cmd_verify(&cfg, fy),
        Command::Run { year, all_years } => cmd_run(cfg, year, all_years).await,
        Command::Diagnose { cik } => cmd_diagnose(&cfg, cik),
        Command::Search { cik } => cmd_search(cfg, cik).await,
        Command::Health { index } => cmd_health(cfg, index).await,
        Command::Crawl8k {
            year,
            quarter,
            out_dir,
        } => cmd_crawl_8k(cfg, year, quarter, out_dir).await,
        Command::LabelBankruptcy { input, output } => cmd_label(cfg, input, output).await,
        Command::IngestTags => cmd_ingest_tags(cfg).await,
        Command::Serve { port } => cmd_serve(cfg, port).await,
    }
}

fn target_index(cfg: &AppConfig, index: Option<IndexKind>) -> Result<IndexKind> {
    match index {
        Some(index) => Ok(index),
        None => Ok(cfg.settings.target_index.parse()?),
    }
}

async fn cmd_map_ciks(cfg: AppConfig, index: Option<IndexKind>) -> Result<()> {
    let index = target_index(&cfg, index)?;
    let ctx = AppContext::init(cfg).await?;
    let tickers = load_ticker_map(&ctx.sec, &ctx.config.sec.ticker_map_url).await;
    if tickers.is_empty() {
        anyhow::bail!("SEC ticker list is empty; cannot map CIKs");
    }

    let matcher = CikMatcher::new(&ctx.config)?;
    let summary = matcher.map_and_save(index, &tickers).await?;

    println!("===== {index} CIK Mapping Summary =====");
    println!("Total Tickers: {}", summary.total);
    println!("Mapped CIKs:   {}", summary.mapped.len());
    println!("Mismatches:    {}", summary.mismatches.len());
    if !summary.mismatches.is_empty() {
        println!("Unmapped:      {}", summary.mismatches.join(", "));
    }
    println!("Saved to:      {}", matcher.output_path().display());
    Ok(())
}

fn cmd_verify(cfg: &AppConfig, fy: Option<i32>) -> Result<()> {
    let fy = fy.unwrap_or(cfg.settings.target_fy);
    let report = verifier::verify_filings(&cfg.cik_mapping_path(), &cfg.paths.raw_data_dir, fy)?;
    print!("{report}");
    Ok(())
}

async fn cmd_run(cfg: AppConfig, year: Option<i32>, all_years: bool) -> Result<()> {
    let year = if all_years { None } else { year.or(cfg.settings.target_year) };
    let ctx = AppContext::init(cfg).await?;
    let report = pipeline::run(&ctx, year).await?;

    println!("Run {}", report.run_id);
    println!("  Quarters:  {}", report.quarters.join(", "));
    println!("  Loaded:    {}", report.loaded);
    println!("  In scope:  {}", report.in_scope);
    println!("  Analysed:  {}", report.analysed);
    println!("  Saved:     {}", report.saved);
    Ok(())
}

fn cmd_diagnose(cfg: &AppConfig, cik: Cik) -> Result<()> {
    match diagnose::diagnose_missing_tags(&cfg.paths.data_dir, cik)? {
        Some(diagnosis) => print!("{diagnosis}"),
        None => println!("No annual report (fp = FY) found for CIK {cik}"),
    }
    Ok(())
}

async fn cmd_search(cfg: AppConfig, cik: Cik) -> Result<()> {
    let pool = storage::open(&cfg.database.resolved_url(), cfg.database.max_connections).await?;
    let rows = storage::find_company(&pool, cik).await?;
    if rows.is_empty() {
        println!("No stored results for CIK {cik}");
        return Ok(());
    }
    for row in rows {
        println!("{row}");
    }
    Ok(())
}

async fn cmd_health(cfg: AppConfig, index: Option<IndexKind>) -> Result<()> {
    let ctx = AppContext::init(cfg).await?;
    let mapping_path = ctx.config.cik_mapping_path();

    if index.is_some() || !mapping_path.exists() {
        let index = target_index(&ctx.config, index)?;
        info!(%index, "Building CIK mapping before health check");
        let tickers = load_ticker_map(&ctx.sec, &ctx.config.sec.ticker_map_url).await;
        CikMatcher::new(&ctx.config)?.map_and_save(index, &tickers).await?;
    }

    let companies = read_mapping(&mapping_path)?;
    if companies.is_empty() {
        warn!(path = %mapping_path.display(), "Mapping file has no companies");
        return Ok(());
    }

    let checker = HealthChecker::new(ctx.sec.clone(), ctx.config.health_check.concurrency);
    let (reports, path) = checker
        .run(&companies, &ctx.pool, &ctx.config.paths.processed_data_dir)
        .await?;

    for r in &reports {
        let z = r.z_score.map(|z| z.to_string()).unwrap_or_else(|| "-".into());
        println!("{:<8} {:>8}  {}", r.ticker, z, r.company_name);
    }
    println!("Report saved to {}", path.display());
    Ok(())
}

async fn cmd_crawl_8k(cfg: AppConfig, year: i32, quarter: u8, out_dir: Option<PathBuf>) -> Result<()> {
    let quarter = Quarter::new(year, quarter)?;
    let out_dir = out_dir.unwrap_or_else(|| cfg.paths.processed_data_dir.clone());
    let client = altman::sec::SecClient::new(&cfg.sec)?;
    let (path, count) = crawl_8k_index(&client, quarter, &out_dir).await?;
    println!("{count} 8-K filings for {quarter} saved to {}", path.display());
    Ok(())
}

async fn cmd_label(cfg: AppConfig, input: PathBuf, output: PathBuf) -> Result<()> {
    let client = altman::sec::SecClient::new(&cfg.sec)?;
    let report = BankruptcyLabeler::new(&client).run(&input, &output).await?;

    println!("Total filings processed (including skipped): {}", report.processed);
    println!("Bankruptcy filings found in this session:   {}", report.found);
    println!("Results saved to {}", output.display());
    Ok(())
}

async fn cmd_ingest_tags(cfg: AppConfig) -> Result<()> {
    let pool = storage::open(&cfg.database.resolved_url(), cfg.database.max_connections).await?;
    let report = storage::ingest_raw_tags(&pool, &cfg.paths.raw_data_dir).await?;
    let unique = storage::dedupe_raw_tags(&pool).await?;

    println!("Folders loaded: {}", report.folders);
    println!("Rows loaded:    {}", report.rows);
    if !report.failed.is_empty() {
        println!("Failed:         {}", report.failed.join(", "));
    }
    println!("Unique tags:    {unique}");
    Ok(())
}

async fn cmd_serve(cfg: AppConfig, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(cfg.server.port);
    let pool = storage::open(&cfg.database.resolved_url(), cfg.database.max_connections)
        .await
        .context("API needs the results database")?;
    api::serve(pool, port).await
}

/// Initialise the tracing subscriber.
///
/// Uses `RUST_LOG` env var for filtering (default: `altman=info`).
/// Set `ALTMAN_LOG_JSON=1` for JSON-formatted output.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("altman=info"));

    let json_logging = std::env::var("ALTMAN_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
