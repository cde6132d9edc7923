//! Position, trade log entries and completed round trips.

use chrono::NaiveDate;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Position {
    pub quantity: f64,
    pub average_cost: f64,
}

impl Position {
    pub fn flat() -> Self {
        Position::default()
    }

    pub fn is_open(&self) -> bool {
        self.quantity > 0.0
    }

    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity * (price - self.average_cost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Trade {
    pub date: NaiveDate,
    pub side: Side,
    pub price: f64,
    pub quantity: f64,
    pub commission: f64,
    pub cash_after: f64,
}

impl Trade {
    pub fn notional(&self) -> f64 {
        self.price * self.quantity
    }

    /// Signed cash movement: negative for buys, positive for sells.
    pub fn cash_flow(&self) -> f64 {
        match self.side {
            Side::Buy => -(self.notional() + self.commission),
            Side::Sell => self.notional() - self.commission,
        }
    }
}

/// A Buy matched with the Sell that closed it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RoundTrip {
    pub entry_date: NaiveDate,
    pub exit_date: NaiveDate,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    /// Net of both commissions.
    pub pnl: f64,
}

impl RoundTrip {
    pub fn from_trades(entry: &Trade, exit: &Trade) -> Self {
        RoundTrip {
            entry_date: entry.date,
            exit_date: exit.date,
            quantity: entry.quantity,
            entry_price: entry.price,
            exit_price: exit.price,
            pnl: entry.cash_flow() + exit.cash_flow(),
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}
