//! # Simulate a portfolio from a close-price CSV
//! folio-backtest simulate --prices data/etf_prices.csv \
//!     --allocation "SPY=0.6,AGG=0.4" \
//!     --contribution 500 --contribution-frequency monthly \
//!     --rebalance-frequency quarterly --benchmark SPY
//!
//! The CSV has a `date` column (YYYY-MM-DD) plus one close-price column per
//! symbol. The report is printed as JSON, followed by the event log.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::warn;

use folio_backtest::config;
use folio_backtest::data::PriceCsvLoader;
use folio_backtest::events;
use folio_backtest::metrics::{MetricsCalculator, MetricsConfig};
use folio_backtest::simulation::{
    AllocationPolicy, ContributionPolicy, Frequency, SimulationEngine,
};

#[derive(Parser)]
#[command(name = "folio-backtest")]
#[command(about = "Multi-asset portfolio simulation and performance metrics")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a portfolio over a price history and report metrics
    Simulate(SimulateArgs),
}

#[derive(Args)]
struct SimulateArgs {
    /// Path to the close-price CSV
    #[arg(short, long)]
    prices: PathBuf,

    /// Target allocation, e.g. "SPY=0.6,AGG=0.4"
    #[arg(short, long)]
    allocation: String,

    /// Initial investment
    #[arg(long, default_value_t = Decimal::from(config::DEFAULT_INITIAL_INVESTMENT))]
    initial: Decimal,

    /// Periodic contribution amount
    #[arg(long, default_value_t = Decimal::from(config::DEFAULT_CONTRIBUTION))]
    contribution: Decimal,

    /// Contribution frequency: monthly, quarterly, yearly or none
    #[arg(long, default_value = "monthly")]
    contribution_frequency: Frequency,

    /// Rebalance frequency: monthly, quarterly, yearly or none
    #[arg(long, default_value = "none")]
    rebalance_frequency: Frequency,

    /// First simulation date (defaults to the first date in the CSV)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last simulation date (defaults to the last date in the CSV)
    #[arg(long)]
    end: Option<NaiveDate>,

    /// Benchmark symbol column to compare against
    #[arg(short, long)]
    benchmark: Option<String>,

    /// Annual risk-free rate for Sharpe and alpha
    #[arg(long, default_value_t = config::RISK_FREE_RATE)]
    risk_free_rate: f64,

    /// Print notable market events inside the range
    #[arg(long)]
    show_events: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Simulate(args) => simulate(args),
    }
}

fn simulate(args: SimulateArgs) -> Result<()> {
    let weights = parse_allocation(&args.allocation)?;
    for symbol in weights.keys() {
        if config::etf_name(symbol).is_none() {
            warn!(%symbol, "symbol not in the known ETF universe");
        }
    }

    let mut symbols: Vec<String> = weights.keys().cloned().collect();
    if let Some(benchmark) = &args.benchmark {
        if !symbols.contains(benchmark) {
            symbols.push(benchmark.clone());
        }
    }

    let loader = PriceCsvLoader::new(&args.prices);
    let table = loader.load(&symbols).context("loading price table")?;

    let start = args.start.unwrap_or_else(|| table.first_date());
    let end = args.end.unwrap_or_else(|| table.last_date());
    if !config::validate_date_range(start, end) {
        bail!("invalid date range {start}..{end}");
    }

    let allocation = AllocationPolicy::new(weights, args.rebalance_frequency)?;
    let contribution =
        ContributionPolicy::new(args.initial, args.contribution, args.contribution_frequency)?;

    let engine = SimulationEngine::new(allocation, contribution);
    let run = engine
        .run(&table, start, end)
        .context("running simulation")?;

    let benchmark_series = args
        .benchmark
        .as_deref()
        .map(|symbol| table.value_series(symbol, start, end))
        .transpose()
        .context("building benchmark series")?;

    let calculator = MetricsCalculator::new(MetricsConfig {
        risk_free_rate: args.risk_free_rate,
        ..MetricsConfig::default()
    });
    let report = calculator.analyze(&run.values, benchmark_series.as_ref())?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    println!("\nEvents:");
    for event in &run.events {
        println!("  {} {:<12} {}", event.date, event.kind.as_str(), event.details);
    }

    if args.show_events {
        println!("\nMarket events in range:");
        for event in events::events_in_range(start, end) {
            println!("  {} [{}] {}", event.date, event.category.as_str(), event.label);
        }
    }

    Ok(())
}

/// Parse "SPY=0.6,AGG=0.4" into a weight map.
fn parse_allocation(raw: &str) -> Result<BTreeMap<String, f64>> {
    let mut weights = BTreeMap::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let (symbol, weight) = part
            .split_once('=')
            .with_context(|| format!("expected SYMBOL=WEIGHT, got {part:?}"))?;
        let weight: f64 = weight
            .trim()
            .parse()
            .with_context(|| format!("bad weight for {symbol}"))?;
        weights.insert(symbol.trim().to_uppercase(), weight);
    }
    Ok(weights)
}
