//! Barlab CLI: run and sweep commands.
//!
//! Commands:
//! - `run`: execute one backtest and print the strategy log
//! - `sweep`: run the same backtest over several holding periods in parallel
//!
//! Settings come from an optional TOML file; flags override it. Diagnostics go
//! to stderr through `tracing`, filtered by `RUST_LOG` (default `warn`).

use anyhow::{Context, Result};
use barlab_core::data::load_csv;
use barlab_core::strategy::StdoutJournal;
use barlab_runner::{best_point, run_single_backtest, run_sweep, BacktestConfig, BacktestResult};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "barlab", about = "Barlab CLI: event-driven single-instrument backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one backtest and print the strategy log.
    Run {
        #[command(flatten)]
        opts: RunOpts,

        /// Bars to hold a position before exiting.
        #[arg(long)]
        hold_bars: Option<usize>,

        /// Print a performance summary after the run.
        #[arg(long, default_value_t = false)]
        summary: bool,

        /// Write the full result as JSON to this file.
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Run one backtest per holding period, in parallel.
    Sweep {
        #[command(flatten)]
        opts: RunOpts,

        /// Holding periods to try, comma separated (e.g. 3,5,10).
        #[arg(long, value_delimiter = ',', required = true)]
        hold_bars: Vec<usize>,
    },
}

/// Settings shared by every command. Each flag overrides the config file.
#[derive(Args)]
struct RunOpts {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV file with daily bars.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Starting cash.
    #[arg(long)]
    cash: Option<f64>,

    /// Commission rate as a fraction of notional (0.001 = 0.1%).
    #[arg(long)]
    commission: Option<f64>,

    /// First date to load (YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last date to load (YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Units per order.
    #[arg(long)]
    stake: Option<f64>,

    /// The CSV file is ordered newest first.
    #[arg(long, default_value_t = false)]
    reverse: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            opts,
            hold_bars,
            summary,
            json,
        } => run_backtest_cmd(&opts, hold_bars, summary, json),
        Commands::Sweep { opts, hold_bars } => run_sweep_cmd(&opts, &hold_bars),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load the config file (if any) and apply flag overrides.
fn build_config(opts: &RunOpts) -> Result<BacktestConfig> {
    let mut config = match &opts.config {
        Some(path) => BacktestConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => BacktestConfig::default(),
    };

    if let Some(data) = &opts.data {
        config.data.path = Some(data.clone());
    }
    if let Some(cash) = opts.cash {
        config.broker.cash = Some(cash);
    }
    if let Some(rate) = opts.commission {
        config.broker.commission = Some(rate);
    }
    if opts.from.is_some() {
        config.data.csv.from_date = opts.from;
    }
    if opts.to.is_some() {
        config.data.csv.to_date = opts.to;
    }
    if let Some(stake) = opts.stake {
        config.strategy.stake = stake;
    }
    if opts.reverse {
        config.data.csv.reverse = true;
    }

    config.validate()?;
    Ok(config)
}

fn run_backtest_cmd(
    opts: &RunOpts,
    hold_bars: Option<usize>,
    summary: bool,
    json: Option<PathBuf>,
) -> Result<()> {
    let mut config = build_config(opts)?;
    if let Some(hold) = hold_bars {
        config.strategy.hold_bars = hold;
    }

    println!(
        "Starting Portfolio Value: {:.2}",
        config.broker.cash.unwrap_or_default()
    );
    let result = run_single_backtest(&config, StdoutJournal)?;
    println!("Final Portfolio Value: {:.2}", result.final_value());

    if summary {
        print_summary(&result);
    }
    if let Some(path) = json {
        let text = serde_json::to_string_pretty(&result)?;
        std::fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), "result written");
    }
    Ok(())
}

fn run_sweep_cmd(opts: &RunOpts, hold_bars: &[usize]) -> Result<()> {
    let config = build_config(opts)?;
    let path = config.data_path()?;
    let bars = load_csv(path, &config.data.csv)
        .with_context(|| format!("loading bars from {}", path.display()))?;

    let points = run_sweep(&config, &bars, hold_bars)?;

    println!(
        "{:>9}  {:>14}  {:>12}  {:>6}  {:>8}",
        "hold_bars", "final_value", "net_profit", "trades", "win_rate"
    );
    for p in &points {
        println!(
            "{:>9}  {:>14.2}  {:>12.2}  {:>6}  {:>7.1}%",
            p.hold_bars,
            p.final_value,
            p.net_profit,
            p.trade_count,
            p.win_rate * 100.0
        );
    }
    if let Some(best) = best_point(&points) {
        println!();
        println!(
            "Best: hold_bars={} final value {:.2}",
            best.hold_bars, best.final_value
        );
    }
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let run = &result.run;
    println!();
    println!("=== Backtest Result ===");
    if let (Some(start), Some(end)) = (result.start_date, result.end_date) {
        println!("Period:         {start} to {end}");
    }
    println!("Bars:           {}", run.bar_count);
    println!("Orders:         {}", run.orders.len());
    println!("Trades:         {}", result.metrics.trade_count);
    println!("Commission:     {:.2}", run.total_commission());
    println!();
    println!("--- Performance ---");
    println!("Net Profit:     {:.2}", run.net_profit());
    println!("Total Return:   {:.2}%", result.metrics.total_return * 100.0);
    println!("Sharpe:         {:.3}", result.metrics.sharpe);
    println!("Max Drawdown:   {:.2}%", result.metrics.max_drawdown * 100.0);
    println!("Win Rate:       {:.1}%", result.metrics.win_rate * 100.0);
    println!("Profit Factor:  {:.2}", result.metrics.profit_factor);
    println!("Avg Bars Held:  {:.1}", result.metrics.avg_bars_held);
    if !run.position.is_flat() {
        println!();
        println!(
            "Open position:  {} @ {:.2}",
            run.position.size, run.position.price
        );
    }
    println!();
}
