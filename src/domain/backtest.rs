//! Backtest simulation over paired (observation, action) sequences.
//!
//! A [`BacktestSimulator`] is a single-use state machine: Flat until a buy
//! fills, Long until the whole position is sold. Every step reports the
//! account's return against the starting balance, marked to that step's
//! close, so the output is a continuous equity curve.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use super::action::Action;
use super::error::TraderError;
use super::execution::{CommissionFee, NoCommission, size_buy};
use super::observation::Observation;
use super::portfolio::{PositionState, SimulationState};
use crate::pipeline::{Stream, zip_fold};

#[derive(Debug, Clone, PartialEq)]
pub struct TradeConfig {
    pub starting_balance: f64,
    /// Shares per lot; every trade is a whole number of lots.
    pub min_tradable_size: f64,
}

impl Default for TradeConfig {
    fn default() -> Self {
        TradeConfig {
            starting_balance: 10_000.0,
            min_tradable_size: 100.0,
        }
    }
}

/// One point of the equity curve, with the account state after the step.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationStep {
    pub date: NaiveDateTime,
    pub value: f64,
    pub state: SimulationState,
}

pub struct BacktestSimulator<F> {
    config: TradeConfig,
    fee: F,
    state: SimulationState,
}

impl<F: CommissionFee> BacktestSimulator<F> {
    pub fn new(config: TradeConfig, fee: F) -> Self {
        let state = SimulationState::new(config.starting_balance);
        BacktestSimulator { config, fee, state }
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Applies `action` at the observation's close and returns the
    /// normalized return after it.
    pub fn step(&mut self, observation: &Observation, action: Action) -> f64 {
        self.apply(observation.close, Some(observation.date.date()), action)
    }

    /// Like [`step`](Self::step) for a bare price with no date attached; the
    /// same-day sell rule cannot apply.
    pub fn step_price(&mut self, price: f64, action: Action) -> f64 {
        self.apply(price, None, action)
    }

    fn apply(&mut self, price: f64, date: Option<NaiveDate>, action: Action) -> f64 {
        match action {
            Action::Buy => self.buy(price, date),
            Action::Sell => self.sell(price, date),
            Action::Hold => {}
        }
        self.state.equity_return(price, self.config.starting_balance)
    }

    fn buy(&mut self, price: f64, date: Option<NaiveDate>) {
        if self.state.position() == PositionState::Long {
            return;
        }
        let Some(fill) = size_buy(
            self.state.cash_balance,
            price,
            self.config.min_tradable_size,
            &self.fee,
        ) else {
            debug!(price, balance = self.state.cash_balance, "no affordable lot");
            return;
        };

        self.state.record_buy(fill.quantity, fill.total(), fill.fee, date);
        info!(
            ?date,
            price,
            quantity = fill.quantity,
            fee = fill.fee,
            balance = self.state.cash_balance,
            "buy"
        );
    }

    fn sell(&mut self, price: f64, date: Option<NaiveDate>) {
        if self.state.position() == PositionState::Flat {
            return;
        }
        if date.is_some() && date == self.state.last_buy_date {
            debug!(?date, "same-day sell ignored");
            return;
        }

        let quantity = self.state.shares_held;
        let fee = self.fee.calculate(price, quantity, Action::Sell);
        let proceeds = price * quantity - fee;
        if self.state.cash_balance + proceeds < 0.0 {
            debug!(?date, price, fee, "sell refused: fee exceeds proceeds and cash");
            return;
        }
        self.state.record_sell(proceeds, fee);
        info!(
            ?date,
            price,
            quantity,
            fee,
            balance = self.state.cash_balance,
            "sell"
        );
    }
}

impl<F: CommissionFee + Send + 'static> BacktestSimulator<F> {
    /// Replays `actions` against `observations`, position by position.
    ///
    /// Both sequences must have the same length; see [`zip_fold`].
    pub fn run(
        self,
        observations: Stream<Observation>,
        actions: Stream<Action>,
    ) -> Stream<SimulationStep> {
        let mut simulator = self;
        zip_fold("backtest", observations, actions, move |observation, action| {
            let value = simulator.step(&observation, action);
            SimulationStep {
                date: observation.date,
                value,
                state: simulator.state.clone(),
            }
        })
    }
}

/// Return series of a full simulation with lot sizing and fees.
pub fn outcome<F>(
    observations: Stream<Observation>,
    actions: Stream<Action>,
    config: TradeConfig,
    fee: F,
) -> Stream<f64>
where
    F: CommissionFee + Send + 'static,
{
    BacktestSimulator::new(config, fee)
        .run(observations, actions)
        .map(|step| step.value)
}

/// Return fraction of putting everything into a single purchase at each buy
/// and liquidating at each sell. No lots, no fees.
pub fn all_in_outcome(values: Stream<f64>, actions: Stream<Action>) -> Stream<f64> {
    let mut balance = 1.0;
    let mut shares = 0.0;
    zip_fold("all-in-outcome", values, actions, move |value, action| {
        match action {
            Action::Buy if balance > 0.0 => {
                shares = balance / value;
                balance = 0.0;
            }
            Action::Sell if shares > 0.0 => {
                balance = shares * value;
                shares = 0.0;
            }
            _ => {}
        }
        balance + shares * value - 1.0
    })
}

/// Lot-sized, commission-free simulation over bare prices.
pub fn balance_outcome(
    values: Stream<f64>,
    actions: Stream<Action>,
    config: TradeConfig,
) -> Stream<f64> {
    let mut simulator = BacktestSimulator::new(config, NoCommission);
    zip_fold("balance-outcome", values, actions, move |price, action| {
        simulator.step_price(price, action)
    })
}

/// Final figures of a drained simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSummary {
    pub steps: usize,
    pub final_return: f64,
    pub last_date: Option<NaiveDateTime>,
    pub state: SimulationState,
}

impl BacktestSummary {
    /// Drains `steps`, failing if the run ended on an error.
    pub fn collect(
        mut steps: Stream<SimulationStep>,
        config: &TradeConfig,
    ) -> Result<BacktestSummary, TraderError> {
        let mut count = 0;
        let mut last = None;
        for step in steps.by_ref() {
            count += 1;
            last = Some(step);
        }
        steps.finish()?;

        Ok(match last {
            Some(step) => BacktestSummary {
                steps: count,
                final_return: step.value,
                last_date: Some(step.date),
                state: step.state,
            },
            None => BacktestSummary {
                steps: 0,
                final_return: 0.0,
                last_date: None,
                state: SimulationState::new(config.starting_balance),
            },
        })
    }
}
