//! Single-position account state for one simulation run.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    Long,
}

/// Running state of a simulation: fully in cash or fully invested.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationState {
    pub cash_balance: f64,
    pub shares_held: f64,
    pub buy_count: u32,
    pub sell_count: u32,
    pub total_fees_paid: f64,
    pub last_buy_date: Option<NaiveDate>,
}

impl SimulationState {
    pub fn new(starting_balance: f64) -> Self {
        SimulationState {
            cash_balance: starting_balance,
            shares_held: 0.0,
            buy_count: 0,
            sell_count: 0,
            total_fees_paid: 0.0,
            last_buy_date: None,
        }
    }

    pub fn position(&self) -> PositionState {
        if self.shares_held > 0.0 {
            PositionState::Long
        } else {
            PositionState::Flat
        }
    }

    /// Holdings valued at `price`.
    pub fn market_value(&self, price: f64) -> f64 {
        self.shares_held * price
    }

    pub fn total_equity(&self, price: f64) -> f64 {
        self.cash_balance + self.market_value(price)
    }

    /// (equity - start) / start
    pub fn equity_return(&self, price: f64, starting_balance: f64) -> f64 {
        (self.total_equity(price) - starting_balance) / starting_balance
    }

    pub(crate) fn record_buy(
        &mut self,
        quantity: f64,
        total_cost: f64,
        fee: f64,
        date: Option<NaiveDate>,
    ) {
        self.cash_balance -= total_cost;
        self.shares_held += quantity;
        self.buy_count += 1;
        self.total_fees_paid += fee;
        self.last_buy_date = date;
    }

    pub(crate) fn record_sell(&mut self, proceeds: f64, fee: f64) {
        self.cash_balance += proceeds;
        self.shares_held = 0.0;
        self.sell_count += 1;
        self.total_fees_paid += fee;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_is_flat_cash() {
        let state = SimulationState::new(10_000.0);
        assert_eq!(state.position(), PositionState::Flat);
        assert!((state.cash_balance - 10_000.0).abs() < f64::EPSILON);
        assert_eq!(state.buy_count, 0);
        assert_eq!(state.sell_count, 0);
        assert!(state.last_buy_date.is_none());
        assert!(state.equity_return(12.0, 10_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn buy_then_sell_bookkeeping() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2);
        let mut state = SimulationState::new(10_000.0);

        state.record_buy(900.0, 9014.0, 14.0, date);
        assert_eq!(state.position(), PositionState::Long);
        assert!((state.cash_balance - 986.0).abs() < 1e-9);
        assert!((state.market_value(11.0) - 9900.0).abs() < 1e-9);
        assert_eq!(state.last_buy_date, date);

        state.record_sell(9000.0 - 18.5, 18.5);
        assert_eq!(state.position(), PositionState::Flat);
        assert!((state.cash_balance - 9967.5).abs() < 1e-9);
        assert!((state.total_fees_paid - 32.5).abs() < 1e-9);
        assert_eq!(state.sell_count, 1);
    }

    #[test]
    fn equity_return_marks_to_market() {
        let mut state = SimulationState::new(1000.0);
        state.record_buy(100.0, 1000.0, 0.0, None);
        assert!((state.equity_return(12.0, 1000.0) - 0.2).abs() < 1e-12);
        assert!((state.equity_return(8.0, 1000.0) + 0.2).abs() < 1e-12);
    }
}
