//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod signal;
pub mod position;
pub mod account;
pub mod execution;
pub mod metrics;
pub mod report;
pub mod backtest;
pub mod error;
