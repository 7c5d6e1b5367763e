//! fairmm - fair-value market maker, paper marketplace entry point.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use fairmm_bot::{
    spawn_paper_market, AppConfig, Engine, PaperPortfolio, PaperVenue, RandomWalkFeed,
};
use fairmm_executor::PaperGateway;
use tokio::sync::mpsc;
use tracing::info;

/// Event channel capacity between the paper market and the engine.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// fairmm quoting engine
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via FAIRMM_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Override the tie-break seed from the configuration
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    fairmm_telemetry::init_logging()?;

    info!("Starting fairmm v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > FAIRMM_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("FAIRMM_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let mut config = AppConfig::from_file(&config_path)?;
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate()?;
    info!(
        assets = config.assets.len(),
        markets = config.markets.len(),
        strategy = ?config.strategy.kind,
        "Configuration loaded"
    );

    let gateway = Arc::new(PaperGateway::new());
    let portfolio = Arc::new(PaperPortfolio::from_config(&config));
    let mut engine = Engine::new(&config, gateway.clone(), portfolio.clone())?;

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let venue = PaperVenue::new(gateway, portfolio, config.market_assets());
    let market = spawn_paper_market(
        RandomWalkFeed::from_config(&config),
        venue,
        tx,
        Duration::from_millis(config.paper.trade_interval_ms.max(1)),
    );

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let stats = engine.run(rx, shutdown).await?;

    market.abort();
    info!(
        intervals = stats.intervals,
        trades = stats.trades,
        fills = stats.fills,
        "fairmm stopped"
    );
    Ok(())
}
