//! Account state and equity tracking.

use chrono::NaiveDate;

use super::position::{Position, Trade};
use super::signal::SignalValue;

/// Account snapshot taken after a date's signal has been processed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub close: f64,
    pub cash: f64,
    pub position_qty: f64,
    pub equity: f64,
}

/// A Buy signal that could not be filled.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SkippedSignal {
    pub date: NaiveDate,
    pub value: SignalValue,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AccountState {
    pub cash: f64,
    pub initial_cash: f64,
    pub position: Position,
    pub trades: Vec<Trade>,
    pub skipped: Vec<SkippedSignal>,
    pub equity_curve: Vec<EquityPoint>,
}

impl AccountState {
    pub fn new(initial_cash: f64) -> Self {
        AccountState {
            cash: initial_cash,
            initial_cash,
            position: Position::flat(),
            trades: Vec::new(),
            skipped: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn total_equity(&self, price: f64) -> f64 {
        self.cash + self.position.market_value(price)
    }

    pub fn record_trade(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    pub fn record_skipped(&mut self, date: NaiveDate, value: SignalValue, reason: impl Into<String>) {
        self.skipped.push(SkippedSignal {
            date,
            value,
            reason: reason.into(),
        });
    }

    pub fn record_equity(&mut self, date: NaiveDate, close: f64) {
        let equity = self.total_equity(close);
        self.equity_curve.push(EquityPoint {
            date,
            close,
            cash: self.cash,
            position_qty: self.position.quantity,
            equity,
        });
    }

    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_cash)
    }
}
