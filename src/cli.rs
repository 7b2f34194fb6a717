//! CLI definition and dispatch.

use chrono::{NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::tdx_repository::TdxFileRepository;
use crate::domain::action::Action;
use crate::domain::backtest::{BacktestSimulator, BacktestSummary, TradeConfig};
use crate::domain::config_validation::validate_config;
use crate::domain::error::TraderError;
use crate::domain::execution::{CommissionFee, StockCommissionFee};
use crate::domain::observation::Observation;
use crate::pipeline::Stream;
use crate::ports::asset_port::AssetRepository;
use crate::ports::config_port::ConfigPort;

#[derive(Parser, Debug)]
#[command(name = "tdxtrader", about = "TDX bar data replay and backtest simulator")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List assets in the configured directory
    Assets,
    /// Print the timestamp of an asset's most recent bar
    LastDate { name: String },
    /// Write an asset's observations as CSV to stdout
    Show {
        name: String,
        #[arg(long)]
        since: Option<NaiveDate>,
    },
    /// Replay a column of buy/sell/hold actions against an asset
    Backtest {
        name: String,
        #[arg(short, long)]
        actions: PathBuf,
        #[arg(long)]
        since: Option<NaiveDate>,
    },
}

/// Everything the commands need from configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_dir: PathBuf,
    pub extension: String,
    pub trade: TradeConfig,
    pub commission: StockCommissionFee,
}

impl Settings {
    pub fn repository(&self) -> TdxFileRepository {
        TdxFileRepository::new(self.base_dir.clone(), &self.extension)
    }
}

pub fn run(cli: Cli) -> ExitCode {
    let result = load_settings(cli.config.as_deref()).and_then(|settings| {
        let repository = settings.repository();
        match cli.command {
            Command::Assets => run_assets(&repository),
            Command::LastDate { name } => run_last_date(&repository, &name),
            Command::Show { name, since } => run_show(&repository, &name, since),
            Command::Backtest {
                name,
                actions,
                since,
            } => run_backtest(&repository, &settings, &name, &actions, since),
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is_mid_stream() => {
            eprintln!("error: {err} (output above is partial)");
            (&err).into()
        }
        Err(err) => {
            eprintln!("error: {err}");
            (&err).into()
        }
    }
}

/// Reads and validates `path`, or uses defaults when no file is given.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, TraderError> {
    let adapter = match path {
        Some(path) => FileConfigAdapter::from_file(path)?,
        None => FileConfigAdapter::from_string("")?,
    };
    build_settings(&adapter)
}

pub fn build_settings(config: &dyn ConfigPort) -> Result<Settings, TraderError> {
    validate_config(config)?;
    Ok(Settings {
        base_dir: PathBuf::from(config.get_string_or("repository", "base_dir", ".")),
        extension: config.get_string_or("repository", "extension", ".day"),
        trade: build_trade_config(config),
        commission: build_commission(config),
    })
}

pub fn build_trade_config(config: &dyn ConfigPort) -> TradeConfig {
    let defaults = TradeConfig::default();
    TradeConfig {
        starting_balance: config.get_double("trade", "starting_balance", defaults.starting_balance),
        min_tradable_size: config.get_double(
            "trade",
            "min_tradable_size",
            defaults.min_tradable_size,
        ),
    }
}

pub fn build_commission(config: &dyn ConfigPort) -> StockCommissionFee {
    let defaults = StockCommissionFee::default();
    StockCommissionFee {
        commission_rate: config.get_double(
            "commission",
            "commission_rate",
            defaults.commission_rate,
        ),
        min_commission: config.get_double("commission", "min_commission", defaults.min_commission),
        slippage_rate: config.get_double("commission", "slippage_rate", defaults.slippage_rate),
        stamp_duty_rate: config.get_double(
            "commission",
            "stamp_duty_rate",
            defaults.stamp_duty_rate,
        ),
    }
}

fn fetch(
    repository: &dyn AssetRepository,
    name: &str,
    since: Option<NaiveDate>,
) -> Result<Stream<Observation>, TraderError> {
    match since {
        Some(date) => repository.get_since(name, date.and_time(NaiveTime::MIN)),
        None => repository.get(name),
    }
}

fn run_assets(repository: &dyn AssetRepository) -> Result<(), TraderError> {
    let mut out = io::stdout().lock();
    for asset in repository.list_assets()? {
        writeln!(out, "{asset}")?;
    }
    Ok(())
}

fn run_last_date(repository: &dyn AssetRepository, name: &str) -> Result<(), TraderError> {
    let last = repository.last_date(name)?;
    println!("{}", last.format("%Y-%m-%d %H:%M"));
    Ok(())
}

fn run_show(
    repository: &dyn AssetRepository,
    name: &str,
    since: Option<NaiveDate>,
) -> Result<(), TraderError> {
    let observations = fetch(repository, name, since)?;
    let rows = write_observations(observations, io::stdout().lock())?;
    eprintln!("{rows} observations");
    Ok(())
}

fn run_backtest(
    repository: &dyn AssetRepository,
    settings: &Settings,
    name: &str,
    actions_path: &Path,
    since: Option<NaiveDate>,
) -> Result<(), TraderError> {
    let actions = read_actions(File::open(actions_path)?)?;
    eprintln!(
        "Replaying {} actions against {} (balance {:.2}, lot {})",
        actions.len(),
        name,
        settings.trade.starting_balance,
        settings.trade.min_tradable_size,
    );

    let summary = run_backtest_pipeline(
        repository,
        name,
        since,
        actions,
        &settings.trade,
        settings.commission.clone(),
    )?;

    println!("Steps:          {}", summary.steps);
    if let Some(date) = summary.last_date {
        println!("Last bar:       {}", date.format("%Y-%m-%d %H:%M"));
    }
    println!("Final return:   {:.4}%", summary.final_return * 100.0);
    println!("Buys:           {}", summary.state.buy_count);
    println!("Sells:          {}", summary.state.sell_count);
    println!("Fees paid:      {:.2}", summary.state.total_fees_paid);
    println!("Cash balance:   {:.2}", summary.state.cash_balance);
    println!("Shares held:    {}", summary.state.shares_held);
    Ok(())
}

/// Fetches `name`, replays `actions` against it and drains the result.
pub fn run_backtest_pipeline<F>(
    repository: &dyn AssetRepository,
    name: &str,
    since: Option<NaiveDate>,
    actions: Vec<Action>,
    trade: &TradeConfig,
    fee: F,
) -> Result<BacktestSummary, TraderError>
where
    F: CommissionFee + Send + 'static,
{
    let observations = fetch(repository, name, since)?;
    let steps = BacktestSimulator::new(trade.clone(), fee)
        .run(observations, Stream::from_vec(actions));
    BacktestSummary::collect(steps, trade)
}

#[derive(Debug, Serialize)]
struct ObservationRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    amount: f64,
}

/// Writes observations as CSV with a header row; returns the row count.
pub fn write_observations<W: Write>(
    mut observations: Stream<Observation>,
    out: W,
) -> Result<usize, TraderError> {
    let mut writer = csv::Writer::from_writer(out);
    let mut rows = 0;
    for obs in observations.by_ref() {
        writer
            .serialize(ObservationRow {
                date: obs.date.format("%Y-%m-%d %H:%M").to_string(),
                open: obs.open,
                high: obs.high,
                low: obs.low,
                close: obs.close,
                volume: obs.volume,
                amount: obs.amount,
            })
            .map_err(io::Error::from)?;
        rows += 1;
    }
    writer.flush()?;
    observations.finish()?;
    Ok(rows)
}

#[derive(Debug, Deserialize)]
struct ActionRow {
    action: Action,
}

/// Reads a one-column CSV (header `action`) of `buy`/`sell`/`hold`.
pub fn read_actions<R: Read>(reader: R) -> Result<Vec<Action>, TraderError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    rdr.deserialize::<ActionRow>()
        .map(|row| row.map(|r| r.action).map_err(|e| TraderError::from(io::Error::from(e))))
        .collect()
}
