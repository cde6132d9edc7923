//! Daily OHLCV price points and the validated price series.

use chrono::NaiveDate;

use super::error::BacktestError;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PricePoint {
    /// Point with all four prices equal to `close`.
    pub fn from_close(date: NaiveDate, close: f64) -> Self {
        PricePoint {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }
}

/// Date-ordered price points with no duplicate dates and positive prices.
///
/// The only way to obtain one is [`PriceSeries::new`], so every consumer can
/// rely on the ordering without re-checking it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self, BacktestError> {
        let mut prev: Option<NaiveDate> = None;
        for point in &points {
            if let Some(prev) = prev {
                if point.date == prev {
                    return Err(BacktestError::malformed(
                        point.date,
                        "date",
                        "duplicate date",
                    ));
                }
                if point.date < prev {
                    return Err(BacktestError::malformed(
                        point.date,
                        "date",
                        format!("not sorted ascending (follows {prev})"),
                    ));
                }
            }
            check_price(point.date, "open", point.open)?;
            check_price(point.date, "high", point.high)?;
            check_price(point.date, "low", point.low)?;
            check_price(point.date, "close", point.close)?;
            if point.volume < 0 {
                return Err(BacktestError::malformed(
                    point.date,
                    "volume",
                    "volume must be non-negative",
                ));
            }
            prev = Some(point.date);
        }
        Ok(PriceSeries { points })
    }

    /// Build a series from `(date, close)` pairs.
    pub fn from_closes<I>(closes: I) -> Result<Self, BacktestError>
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self::new(
            closes
                .into_iter()
                .map(|(date, close)| PricePoint::from_close(date, close))
                .collect(),
        )
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Binary search on the date axis.
    pub fn get(&self, date: NaiveDate) -> Option<&PricePoint> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| &self.points[i])
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }
}

fn check_price(date: NaiveDate, field: &str, value: f64) -> Result<(), BacktestError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(BacktestError::malformed(
            date,
            field,
            format!("price must be positive, got {value}"),
        ))
    }
}
