//! Simple Moving Average of closing prices.
//!
//! SMA(n)[i] = sum(C[i-j] for j in 0..n) / n
//! Warmup: first (n-1) points are invalid.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries};
use crate::domain::ohlcv::PricePoint;

pub fn calculate_sma(points: &[PricePoint], period: usize) -> IndicatorSeries {
    let mut values = Vec::with_capacity(points.len());
    let warmup = period.saturating_sub(1);

    for i in 0..points.len() {
        let date = points[i].date;
        let valid = period > 0 && i >= warmup;

        // Summing each window directly keeps constant inputs exact.
        let value = if valid {
            let window = &points[i + 1 - period..=i];
            window.iter().map(|p| p.close).sum::<f64>() / period as f64
        } else {
            0.0
        };

        values.push(IndicatorPoint { date, valid, value });
    }

    IndicatorSeries { period, values }
}
