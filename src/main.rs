use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use gridbot::api::{Credentials, DeltaClient, ExchangeGateway, PaperGateway};
use gridbot::{BotConfig, TradingEngine};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "gridbot",
    about = "Consensus-gated grid trading bot for Delta Exchange"
)]
struct Args {
    /// Configuration file (JSON, TOML or YAML)
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Trade against an in-memory exchange using live public prices
    #[arg(long, default_value_t = false)]
    paper: bool,

    /// Starting balance for paper trading
    #[arg(long, default_value_t = 10_000.0)]
    paper_balance: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    setup_logging();

    let args = Args::parse();

    let config = BotConfig::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;

    tracing::info!(
        symbol = %config.symbol,
        levels = config.grid_levels,
        width_pct = config.grid_width * 100.0,
        risk_pct = config.risk_percentage,
        paper = args.paper,
        "gridbot starting"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Ctrl+C received, stopping after the current cycle"),
            Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
        }
        let _ = shutdown_tx.send(true);
    });

    if args.paper {
        let ticker = DeltaClient::public(config.base_url.clone(), config.request_timeout())
            .context("Failed to build HTTP client")?;
        let gateway = PaperGateway::live(args.paper_balance, ticker);
        run_engine(config, gateway, shutdown_rx).await
    } else {
        let credentials = Credentials::from_env().context("API credentials not found")?;
        let gateway = DeltaClient::new(
            config.base_url.clone(),
            Some(credentials),
            config.request_timeout(),
            config.requests_per_second,
        )
        .context("Failed to build HTTP client")?;
        run_engine(config, gateway, shutdown_rx).await
    }
}

async fn run_engine<G: ExchangeGateway>(
    config: BotConfig,
    gateway: G,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut engine = TradingEngine::new(config, gateway);
    engine.run(shutdown).await
}

fn setup_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridbot=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
