//! Least-squares and dispersion indexes.
//!
//! The regression fit runs over x = 0..n-1 (oldest to newest):
//! slope = (n*Sxy - Sx*Sy) / (n*Sxx - Sx^2), intercept = (Sy - slope*Sx) / n.

use crate::domain::index::{finite, mean, ratio, std_dev, Index};
use crate::domain::series::Sources;

/// `(slope, intercept)` of the least-squares line, `None` when degenerate.
fn fit(values: &[f64]) -> Option<(f64, f64)> {
    let n = values.len() as f64;
    let (mut sx, mut sy, mut sxy, mut sxx) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let x = i as f64;
        sx += x;
        sy += y;
        sxy += x * y;
        sxx += x * x;
    }
    let slope = ratio(n * sxy - sx * sy, n * sxx - sx * sx)?;
    let intercept = finite((sy - slope * sx) / n)?;
    Some((slope, intercept))
}

/// Slope of the regression line, multiplied by `scale`.
///
/// Null while the window is short or the latest sample is null. A window that
/// contains nulls, or one that cannot be fitted, reports a flat 0.0.
#[derive(Debug, Clone)]
pub struct LinearRegressionSlope {
    periods: usize,
    scale: f64,
}

impl LinearRegressionSlope {
    pub fn new(periods: usize, scale: f64) -> Self {
        Self { periods, scale }
    }
}

impl Index for LinearRegressionSlope {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let source = sources.source();
        source.last()?;
        let tail = source.tail(self.periods)?;
        let window: Option<Vec<f64>> = tail.iter().copied().collect();
        let slope = window
            .and_then(|w| fit(&w))
            .map_or(0.0, |(slope, _)| slope * self.scale);
        Some(finite(slope).unwrap_or(0.0))
    }
}

/// Value of the fitted line at the newest sample.
#[derive(Debug, Clone)]
pub struct LinearRegressionForecast {
    periods: usize,
}

impl LinearRegressionForecast {
    pub fn new(periods: usize) -> Self {
        Self { periods }
    }
}

impl Index for LinearRegressionForecast {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.periods)?;
        let (slope, intercept) = fit(&window)?;
        finite(intercept + slope * (window.len() as f64 - 1.0))
    }
}

#[derive(Debug, Clone)]
pub struct StandardDeviation {
    periods: usize,
}

impl StandardDeviation {
    pub fn new(periods: usize) -> Self {
        Self { periods }
    }
}

impl Index for StandardDeviation {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.periods)?;
        finite(std_dev(&window))
    }
}

/// `SMA + deviations * sigma`; a negative `deviations` gives the lower band.
#[derive(Debug, Clone)]
pub struct BollingerBand {
    periods: usize,
    deviations: f64,
}

impl BollingerBand {
    pub fn new(periods: usize, deviations: f64) -> Self {
        Self {
            periods,
            deviations,
        }
    }
}

impl Index for BollingerBand {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.periods)?;
        finite(mean(&window) + self.deviations * std_dev(&window))
    }
}

/// Standard deviation of the one-step percentage changes over N+1 samples.
#[derive(Debug, Clone)]
pub struct Volatility {
    periods: usize,
}

impl Volatility {
    pub fn new(periods: usize) -> Self {
        Self { periods }
    }
}

impl Index for Volatility {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.periods.saturating_add(1))?;
        let changes = window
            .windows(2)
            .map(|w| ratio(w[1] - w[0], w[0]).map(|r| r * 100.0))
            .collect::<Option<Vec<f64>>>()?;
        finite(std_dev(&changes))
    }
}
