//! Historical Value-at-Risk and Expected Shortfall over a sample of fractional returns.

use crate::domain::investment::Holding;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confidence level strictly inside `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ConfidenceLevel(f64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidConfidenceLevel(pub f64);

impl fmt::Display for InvalidConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "confidence level must be strictly between 0 and 1 (got {})",
            self.0
        )
    }
}

impl std::error::Error for InvalidConfidenceLevel {}

impl ConfidenceLevel {
    pub const P95: ConfidenceLevel = ConfidenceLevel(0.95);
    pub const P99: ConfidenceLevel = ConfidenceLevel(0.99);

    pub fn try_new(value: f64) -> Result<Self, InvalidConfidenceLevel> {
        if value.is_finite() && value > 0.0 && value < 1.0 {
            Ok(Self(value))
        } else {
            Err(InvalidConfidenceLevel(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for ConfidenceLevel {
    type Error = InvalidConfidenceLevel;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl<'de> Deserialize<'de> for ConfidenceLevel {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Self::try_new(value).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskResult {
    pub var: f64,
    pub expected_shortfall: f64,
}

impl RiskResult {
    pub const ZERO: RiskResult = RiskResult {
        var: 0.0,
        expected_shortfall: 0.0,
    };
}

/// VaR is the `(1 - confidence) * 100` percentile of `returns` (linear interpolation between
/// order statistics); Expected Shortfall is the mean of the observations at or below it.
///
/// An empty sample yields [`RiskResult::ZERO`].
pub fn calculate_var(returns: &[f64], confidence: ConfidenceLevel) -> RiskResult {
    if returns.is_empty() {
        return RiskResult::ZERO;
    }

    let mut sorted = returns.to_vec();
    sorted.sort_by(f64::total_cmp);

    let var = percentile_sorted(&sorted, (1.0 - confidence.value()) * 100.0);

    let tail: Vec<f64> = sorted.iter().copied().filter(|r| *r <= var).collect();
    let expected_shortfall = if tail.is_empty() {
        var
    } else {
        // The tail mean can only exceed `var` by rounding when every tail value equals it.
        (tail.iter().sum::<f64>() / tail.len() as f64).min(var)
    };

    RiskResult {
        var,
        expected_shortfall,
    }
}

/// Percentile `pct` (0..=100) of an ascending, non-empty slice using the "linear" method.
fn percentile_sorted(sorted: &[f64], pct: f64) -> f64 {
    let rank = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = (lower_idx + 1).min(sorted.len() - 1);
    let fraction = rank - lower_idx as f64;
    lerp(sorted[lower_idx], sorted[upper_idx], fraction)
}

// Interpolate from whichever end is closer so results match the reference percentile
// implementation bit for bit.
fn lerp(lower: f64, upper: f64, fraction: f64) -> f64 {
    let diff = upper - lower;
    if fraction >= 0.5 {
        upper - diff * (1.0 - fraction)
    } else {
        lower + diff * fraction
    }
}

/// One return observation per holding with a current price and a positive purchase price.
pub fn returns_from_holdings<'a, I>(holdings: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a Holding>,
{
    holdings
        .into_iter()
        .filter_map(Holding::return_observation)
        .collect()
}
