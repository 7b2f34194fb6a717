//! Core domain types and logic.

pub mod action;
pub mod backtest;
pub mod bar;
pub mod config_validation;
pub mod error;
pub mod execution;
pub mod observation;
pub mod portfolio;
