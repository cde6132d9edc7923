//! Trade execution and fill simulation.
//!
//! The simulator is a fold over the signal sequence:
//! `AccountState_t = step(AccountState_{t-1}, Signal_t, PricePoint_t)`.
//! Fills happen at the signal date's close with a proportional commission.
//! Long only, one position at a time.

use chrono::NaiveDate;
use log::{debug, info};

use super::account::AccountState;
use super::error::BacktestError;
use super::ohlcv::{PricePoint, PriceSeries};
use super::position::{Position, RoundTrip, Side, Trade};
use super::signal::{Signal, SignalValue};

/// How buy quantities are rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum QuantityGranularity {
    /// Spend all available cash.
    #[default]
    Fractional,
    /// Round down to whole shares.
    WholeShares,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionConfig {
    pub initial_cash: f64,
    pub commission_rate: f64,
    pub granularity: QuantityGranularity,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            initial_cash: 1_000_000.0,
            commission_rate: 0.001,
            granularity: QuantityGranularity::Fractional,
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<(), BacktestError> {
        if !(self.initial_cash.is_finite() && self.initial_cash > 0.0) {
            return Err(BacktestError::invalid_config(
                "initial_cash",
                "initial_cash must be positive",
            ));
        }
        if !(self.commission_rate >= 0.0 && self.commission_rate < 1.0) {
            return Err(BacktestError::invalid_config(
                "commission_rate",
                "commission_rate must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

/// Commission charged on a trade of the given notional value.
pub fn calculate_commission(trade_value: f64, commission_rate: f64) -> f64 {
    trade_value * commission_rate
}

/// Largest quantity with `q * price * (1 + rate) <= cash`.
pub fn affordable_quantity(cash: f64, price: f64, config: &ExecutionConfig) -> f64 {
    if cash <= 0.0 {
        return 0.0;
    }
    let per_share = price * (1.0 + config.commission_rate);
    match config.granularity {
        QuantityGranularity::Fractional => cash / per_share,
        QuantityGranularity::WholeShares => {
            // At most one unit of rounding overshoot; above 2^53 a unit step
            // is no longer representable, so step to the next float down.
            let quantity = (cash / per_share).floor();
            if quantity * per_share <= cash {
                quantity
            } else if quantity - 1.0 < quantity {
                (quantity - 1.0).max(0.0)
            } else {
                f64::from_bits(quantity.to_bits() - 1)
            }
        }
    }
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        quantity: f64,
        price: f64,
        commission: f64,
    },
    AlreadyOpen,
    InsufficientCapital,
}

/// Open a long position at `price` using all available cash.
pub fn enter_long(
    account: &mut AccountState,
    date: NaiveDate,
    price: f64,
    config: &ExecutionConfig,
) -> EntryResult {
    if account.position.is_open() {
        return EntryResult::AlreadyOpen;
    }

    let quantity = affordable_quantity(account.cash, price, config);
    if !(quantity.is_finite() && quantity > 0.0) {
        return EntryResult::InsufficientCapital;
    }

    let (commission, cash_after) = match config.granularity {
        // Split the whole balance into notional and commission so no
        // rounding residue can push cash below zero.
        QuantityGranularity::Fractional => {
            let notional = account.cash / (1.0 + config.commission_rate);
            (account.cash - notional, 0.0)
        }
        QuantityGranularity::WholeShares => {
            let cost = quantity * price;
            let commission = calculate_commission(cost, config.commission_rate);
            (commission, (account.cash - cost - commission).max(0.0))
        }
    };

    account.cash = cash_after;
    account.position = Position {
        quantity,
        average_cost: price,
    };
    account.record_trade(Trade {
        date,
        side: Side::Buy,
        price,
        quantity,
        commission,
        cash_after,
    });

    EntryResult::Entered {
        quantity,
        price,
        commission,
    }
}

/// Result of an exit.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub quantity: f64,
    pub exit_value: f64,
    pub commission: f64,
    pub realized_pnl: f64,
}

/// Sell the entire open position at `price`. Returns `None` when flat.
pub fn exit_long(
    account: &mut AccountState,
    date: NaiveDate,
    price: f64,
    config: &ExecutionConfig,
) -> Option<ExitResult> {
    if !account.position.is_open() {
        return None;
    }
    let position = std::mem::take(&mut account.position);

    let exit_value = position.market_value(price);
    let commission = calculate_commission(exit_value, config.commission_rate);
    account.cash += exit_value - commission;

    let sell = Trade {
        date,
        side: Side::Sell,
        price,
        quantity: position.quantity,
        commission,
        cash_after: account.cash,
    };
    // Same figure the round-trip table reports: net of both commissions.
    let realized_pnl = match account.trades.last() {
        Some(entry) if entry.side == Side::Buy => RoundTrip::from_trades(entry, &sell).pnl,
        _ => position.unrealized_pnl(price) - commission,
    };
    account.record_trade(sell);

    Some(ExitResult {
        quantity: position.quantity,
        exit_value,
        commission,
        realized_pnl,
    })
}

/// Apply one date's signal and record the closing equity snapshot.
pub fn step(
    mut account: AccountState,
    signal: &Signal,
    point: &PricePoint,
    config: &ExecutionConfig,
) -> AccountState {
    let price = point.close;

    match signal.value {
        SignalValue::Buy => match enter_long(&mut account, point.date, price, config) {
            EntryResult::Entered {
                quantity,
                commission,
                ..
            } => {
                debug!(
                    "{}: bought {:.4} @ {:.4} (commission {:.4})",
                    point.date, quantity, price, commission
                );
            }
            EntryResult::AlreadyOpen => {}
            EntryResult::InsufficientCapital => {
                info!(
                    "{}: buy signal skipped, cash {:.2} cannot cover one unit @ {:.4}",
                    point.date, account.cash, price
                );
                account.record_skipped(point.date, signal.value, "insufficient cash");
            }
        },
        SignalValue::Sell => {
            if let Some(exit) = exit_long(&mut account, point.date, price, config) {
                debug!(
                    "{}: sold {:.4} @ {:.4} (pnl {:.2})",
                    point.date, exit.quantity, price, exit.realized_pnl
                );
            }
        }
        SignalValue::Hold => {}
    }

    account.record_equity(point.date, price);
    account
}

/// Run the simulator over every signal, in date order.
pub fn run(
    series: &PriceSeries,
    signals: &[Signal],
    config: &ExecutionConfig,
) -> Result<AccountState, BacktestError> {
    config.validate()?;
    check_signal_order(signals)?;

    signals
        .iter()
        .try_fold(AccountState::new(config.initial_cash), |account, signal| {
            let point = series.get(signal.date).ok_or_else(|| {
                BacktestError::malformed(signal.date, "signal", "no price point for signal date")
            })?;
            Ok(step(account, signal, point, config))
        })
}

fn check_signal_order(signals: &[Signal]) -> Result<(), BacktestError> {
    for pair in signals.windows(2) {
        if pair[1].date <= pair[0].date {
            return Err(BacktestError::malformed(
                pair[1].date,
                "signal",
                format!("signals must be strictly ascending (follows {})", pair[0].date),
            ));
        }
    }
    Ok(())
}
