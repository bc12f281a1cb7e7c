//! Daily time series primitives shared by providers, cache and pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One calendar day of an asset's series. A `None` value records that the
/// provider had no numeric value for that day; it is never coerced to zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

impl DailyPoint {
    pub fn new(date: NaiveDate, value: Option<f64>) -> Self {
        Self { date, value }
    }
}

/// Arithmetic mean over the numeric values of a series. Missing values are
/// excluded; a series with no numeric values has no mean.
pub fn mean(points: &[DailyPoint]) -> Option<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for point in points {
        if let Some(value) = point.value {
            sum += value;
            count += 1;
        }
    }
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}
