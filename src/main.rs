//! Leveraged-trading decision support CLI.
//!
//! Derives signals from market snapshots, sizes positions against a trade
//! history, and can walk a full paper trade through the session ledger.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use levtrader::{
    AutoTradeSettings, BotAction, ClosedTrade, Direction, KellyMode, MarketConditions,
    SignalEngineConfig, SignalGenerator, SignalSetup, SystemStamper, Timeframe, TradingSession,
};

/// Leveraged trading signal and sizing CLI.
#[derive(Parser)]
#[command(name = "levtrader")]
#[command(about = "Regime-aware signals and ruin-bounded position sizing", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive a trade setup from a market snapshot
    Signal {
        /// Trading pair symbol
        #[arg(short, long, default_value = "BTCUSDT")]
        symbol: String,

        /// Current price
        #[arg(short, long)]
        price: f64,

        /// Daily volatility as a fraction (0.05 = 5%)
        #[arg(short, long)]
        daily_vol: f64,

        /// Average True Range in price units (derived from volatility if omitted)
        #[arg(short, long)]
        atr: Option<f64>,

        /// RSI reading in [0, 100]
        #[arg(long)]
        rsi: Option<f64>,

        /// Sentiment score in [-1, 1]
        #[arg(long)]
        sentiment: Option<f64>,

        /// 200-period EMA
        #[arg(long)]
        ema200: Option<f64>,

        /// Candle timeframe (1m, 5m, 15m, 1h, 4h, 1d)
        #[arg(short, long, default_value = "1d")]
        timeframe: Timeframe,

        /// Close prices, oldest first, comma separated; feeds regime analysis
        #[arg(long, value_delimiter = ',')]
        history: Vec<f64>,

        /// Print the setup as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Size a position against a trade history
    Size {
        /// Account balance in quote currency
        #[arg(short, long, env = "LEVTRADER_BALANCE", default_value = "10000")]
        balance: Decimal,

        /// Entry price
        #[arg(short, long)]
        entry: f64,

        /// Stop-loss price
        #[arg(short, long)]
        stop: f64,

        /// Leverage multiplier
        #[arg(short, long, default_value = "10")]
        leverage: f64,

        /// Kelly sizing mode (full, half, quarter)
        #[arg(short, long, default_value = "quarter")]
        kelly_mode: KellyMode,

        /// Historical trade pnls, comma separated (e.g. "100,-50,80")
        #[arg(short, long, value_delimiter = ',')]
        pnls: Vec<Decimal>,
    },

    /// Generate, size, execute, and close one paper trade end to end
    Simulate {
        /// Starting paper balance
        #[arg(short, long, env = "LEVTRADER_BALANCE", default_value = "10000")]
        balance: Decimal,

        /// Trading pair symbol
        #[arg(short, long, default_value = "BTCUSDT")]
        symbol: String,

        /// Current price
        #[arg(short, long)]
        price: f64,

        /// Daily volatility as a fraction
        #[arg(short, long)]
        daily_vol: f64,

        /// Sentiment score in [-1, 1]
        #[arg(long)]
        sentiment: Option<f64>,

        /// Price to close the paper position at (defaults to the take-profit)
        #[arg(short, long)]
        exit: Option<f64>,

        /// Historical trade pnls for sizing, comma separated
        #[arg(long, value_delimiter = ',')]
        pnls: Vec<Decimal>,
    },

    /// Show effective engine configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Signal {
            symbol,
            price,
            daily_vol,
            atr,
            rsi,
            sentiment,
            ema200,
            timeframe,
            history,
            json,
        } => {
            let mut market = MarketConditions::new(&symbol, price, daily_vol, atr.unwrap_or(0.0));
            market.rsi = rsi;
            market.sentiment_score = sentiment;
            market.ema200 = ema200;
            market.historical_prices = history;

            let mut config = SignalEngineConfig::default();
            config.timeframe = timeframe;

            let generator = SignalGenerator::new(config);
            let setup = generator.generate(&market, &SystemStamper);

            if json {
                println!("{}", serde_json::to_string_pretty(&setup)?);
            } else {
                print_signal(&setup);
            }
        }

        Commands::Size {
            balance,
            entry,
            stop,
            leverage,
            kelly_mode,
            pnls,
        } => {
            let trades = trades_from_pnls(&pnls);
            let result = levtrader::optimal_position_size(
                &trades,
                balance,
                entry,
                stop,
                leverage,
                kelly_mode,
            );

            println!("\n=== Position Sizing ===");
            println!("Balance:          ${}", balance);
            println!("Trade history:    {} trades", trades.len());
            println!("Kelly mode:       {}", kelly_mode.as_str());
            println!();
            println!("Optimal f:        {:.4}", result.optimal_f);
            println!("Kelly fraction:   {:.4}", result.kelly_fraction);
            println!("Risk of ruin:     {:.6}", result.risk_of_ruin);
            println!("Recommended:      ${:.2}", result.safe_position_size);
            println!(
                "Zero-ruin safe:   {}",
                if result.is_zero_ruin_safe { "Yes" } else { "No" }
            );

            if !result.warnings.is_empty() {
                println!("\nWarnings:");
                for w in &result.warnings {
                    println!("  - {}", w);
                }
            }
        }

        Commands::Simulate {
            balance,
            symbol,
            price,
            daily_vol,
            sentiment,
            exit,
            pnls,
        } => {
            let mut market = MarketConditions::new(&symbol, price, daily_vol, 0.0);
            market.sentiment_score = sentiment;

            let generator = SignalGenerator::new(SignalEngineConfig::default());
            let setup = generator.generate(&market, &SystemStamper);
            print_signal(&setup);

            let trades = trades_from_pnls(&pnls);
            let sizing = levtrader::optimal_position_size(
                &trades,
                balance,
                setup.entry_price,
                setup.stop_loss_price,
                setup.leverage,
                KellyMode::default(),
            );
            let margin = sizing.safe_position_size;
            if margin <= Decimal::ZERO {
                println!("\nSizing recommends no position; nothing to simulate.");
                for w in &sizing.warnings {
                    println!("  - {}", w);
                }
                return Ok(());
            }

            let mut session =
                TradingSession::new(balance, AutoTradeSettings::default(), Arc::new(SystemStamper));

            session.apply(BotAction::LockSignal)?;
            session.apply(BotAction::StartCountdown)?;
            session.apply(BotAction::Execute)?;
            let id = session.execute(&setup, margin)?;
            session.apply(BotAction::FinishExecution)?;

            println!("\n=== Execution ===");
            println!("Margin committed: ${:.2}", margin);
            print_wallet(session.wallet());

            let exit_price = Decimal::try_from(exit.unwrap_or(setup.take_profit_price))?;
            let mut marks = std::collections::HashMap::new();
            marks.insert(symbol.clone(), exit_price);
            session.apply_mark_prices(&marks);

            println!("\n=== Marked @ {} ===", exit_price);
            print_wallet(session.wallet());

            let record = session.close(id, exit_price)?;
            session.apply(BotAction::CooldownExpired)?;

            println!("\n=== Closed ===");
            println!(
                "Realized pnl:     ${:.2} ({})",
                record.realized_pnl,
                if record.is_win() { "win" } else { "loss" }
            );
            print_wallet(session.wallet());
            println!(
                "Session return:   {:.2}%",
                session.wallet().return_pct() * dec!(100)
            );
            println!(
                "Conservation:     {}",
                if session.wallet().conservation_holds() { "holds" } else { "VIOLATED" }
            );
        }

        Commands::Config => {
            let config = SignalEngineConfig::default();
            let auto = AutoTradeSettings::default();

            println!("\n=== Signal Engine ===\n");
            println!("Safety Factor:        {}", config.safety_factor);
            println!("ATR Multiplier:       {}", config.atr_multiplier);
            println!("Min Risk/Reward:      {}", config.min_risk_reward_ratio);
            println!("Leverage Range:       {}x - {}x", config.min_leverage, config.max_leverage);
            println!("Timeframe:            {}", config.timeframe.as_str());

            println!("\n=== Auto-Trade ===\n");
            println!("Enabled:              {}", auto.enabled);
            println!("Confidence Threshold: {}", auto.confidence_threshold);
            println!("Max Leverage:         {}x", auto.max_leverage);
            println!("Risk/Reward:          {}", auto.risk_reward_ratio);
            println!("Safety Factor:        {}", auto.safety_factor);

            println!("\n=== Sizing Bounds ===\n");
            println!("Kelly Mode:           {}", KellyMode::default().as_str());
            println!("Max Risk of Ruin:     {}", levtrader::risk::MAX_RISK_OF_RUIN);
        }
    }

    Ok(())
}

fn print_signal(setup: &SignalSetup) {
    info!(asset = %setup.asset, direction = setup.direction.as_str(), "signal derived");

    println!("\n=== Signal: {} ===", setup.asset);
    println!("Direction:        {}", setup.direction.as_str());
    println!("Entry:            {:.2}", setup.entry_price);
    println!("Stop Loss:        {:.2}", setup.stop_loss_price);
    println!("Take Profit:      {:.2}", setup.take_profit_price);
    println!("Leverage:         {}x", setup.leverage);
    println!("Risk/Reward:      {:.1}", setup.risk_reward_ratio);
    println!("Confidence:       {:.0}/100", setup.confidence_score);
    println!("Risk Level:       {:?}", setup.risk_level);
    if let Some(regime) = setup.regime {
        println!("Regime:           {:?}", regime);
    }
    if let Some(h) = setup.hurst_exponent {
        println!("Hurst:            {:.3}", h);
    }
    println!("Rationale:        {}", setup.rationale);
}

fn print_wallet(wallet: &levtrader::WalletState) {
    println!("Balance:          ${:.2}", wallet.balance);
    println!("Available:        ${:.2}", wallet.available);
    println!("Locked:           ${:.2}", wallet.locked);
    println!("Equity:           ${:.2}", wallet.equity);
    println!("Unrealized P&L:   ${:.2}", wallet.unrealized_pnl);
}

/// Build synthetic closed trades from a flat pnl list so sizing can run
/// from the command line without a stored history.
fn trades_from_pnls(pnls: &[Decimal]) -> Vec<ClosedTrade> {
    let now = Utc::now();
    pnls.iter()
        .enumerate()
        .map(|(i, &pnl)| ClosedTrade {
            position_id: Uuid::new_v4(),
            asset: "BTCUSDT".to_string(),
            direction: Direction::Long,
            entry_price: dec!(100000),
            exit_price: dec!(100000) + pnl * dec!(20), // size 0.05
            size: dec!(0.05),
            margin: dec!(1000),
            leverage: dec!(5),
            realized_pnl: pnl,
            opened_at: now - chrono::Duration::hours((pnls.len() - i) as i64),
            closed_at: now - chrono::Duration::hours((pnls.len() - i) as i64 - 1),
        })
        .collect()
}
