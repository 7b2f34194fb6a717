//! tdxtrader: TDX market data streaming and backtest simulation.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`]. Lazy sequences shared by all
//! three live in [`pipeline`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod logging;
pub mod pipeline;
pub mod ports;
