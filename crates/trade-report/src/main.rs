//! trade-report: daily-bar technical report with position sizing for one symbol.
//!
//! Usage:
//!   trade-report -s AAPL
//!   trade-report -s btc --asset-type crypto --balance 25000 --risk-percent 0.5
//!   trade-report -s MSFT --with-fundamentals --format json

mod render;

use analysis_core::AssetType;
use analysis_orchestrator::{ReportOrchestrator, ReportRequest, TradeAnalyzer};
use anyhow::Context;
use clap::{Parser, ValueEnum};
use market_data::{HttpConfig, MarketDataClient, PolygonClient};
use risk_manager::SizingConfig;
use std::io::IsTerminal;
use std::time::Duration;
use technical_analysis::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(version, about = "Terminal trade report: regime, levels, sizing and strategy")]
struct Cli {
    /// Ticker (AAPL) or crypto base/pair (BTC, ETH/EUR)
    #[arg(short, long)]
    symbol: String,

    /// stock or crypto
    #[arg(long, default_value = "stock")]
    asset_type: AssetType,

    /// Account balance
    #[arg(long, env = "TRADE_REPORT_BALANCE", default_value_t = 10_000.0)]
    balance: f64,

    /// Percent of the balance risked on the trade
    #[arg(long, env = "TRADE_REPORT_RISK_PERCENT", default_value_t = 1.0)]
    risk_percent: f64,

    /// Quote currency appended to bare crypto symbols
    #[arg(long, env = "TRADE_REPORT_QUOTE", default_value = "USD")]
    quote_currency: String,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Fail instead of clamping when the ATR stop collapses to zero
    #[arg(long)]
    strict_stop: bool,

    /// Bars of EMA history required before a row is reported; 0 keeps every bar
    #[arg(long, env = "TRADE_REPORT_EMA_WARMUP", default_value_t = 200)]
    ema_warmup: usize,

    /// Add a margins check from Polygon filings (needs POLYGON_API_KEY)
    #[arg(long)]
    with_fundamentals: bool,

    #[arg(long)]
    no_color: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long)]
    log_json: bool,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    http_timeout_secs: u64,

    /// Polygon requests per minute
    #[arg(long, env = "POLYGON_RATE_LIMIT", default_value_t = 5)]
    polygon_rate_limit: usize,

    #[arg(long, env = "POLYGON_API_KEY", hide_env_values = true)]
    polygon_api_key: Option<String>,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "trade_report=info,analysis_orchestrator=info,market_data=warn".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let http = HttpConfig {
        timeout: Duration::from_secs(cli.http_timeout_secs),
        ..HttpConfig::default()
    };

    let analyzer = TradeAnalyzer::with_config(
        EngineConfig {
            ema_warmup: cli.ema_warmup,
            ..EngineConfig::default()
        },
        SizingConfig {
            strict: cli.strict_stop,
            ..SizingConfig::default()
        },
    );

    let mut orchestrator =
        ReportOrchestrator::new(MarketDataClient::new(http.clone(), cli.quote_currency.clone())).with_analyzer(analyzer);

    if cli.with_fundamentals {
        let api_key = cli
            .polygon_api_key
            .clone()
            .context("POLYGON_API_KEY must be set for --with-fundamentals")?;
        let polygon = PolygonClient::new(api_key, cli.polygon_rate_limit, http);
        orchestrator = orchestrator.with_fundamentals(Box::new(polygon));
    }

    let request = ReportRequest {
        symbol: cli.symbol.clone(),
        asset_type: cli.asset_type,
        account_balance: cli.balance,
        risk_percent: cli.risk_percent,
    };

    let report = match orchestrator.generate(&request).await {
        Ok(report) => report,
        Err(e) => {
            tracing::debug!("Report failed: {:?}", e);
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    };

    match cli.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            let color = !cli.no_color && std::io::stdout().is_terminal();
            print!("{}", render::render(&report, cli.risk_percent, render::Palette::new(color)));
        }
    }

    Ok(())
}
