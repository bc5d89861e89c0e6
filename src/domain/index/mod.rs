//! Incremental index family.
//!
//! Each index turns the tick just appended to its source (plus whatever
//! trailing history it needs) into exactly one output value. `None` is the
//! null output: insufficient history, a null source value or degenerate
//! arithmetic all end up there instead of aborting the cascade.
//!
//! Variants are grouped by family:
//! - [`moving_average`]: SMA, WMA, EMA, SMMA, DEMA, TEMA, KAMA
//! - [`mama`]: MESA adaptive moving average
//! - [`oscillator`]: RSI, smoothed RSI, stochastic, Williams %R, CCI,
//!   center of gravity, Fisher transform, detrended price oscillator
//! - [`regression`]: regression slope/forecast, standard deviation,
//!   Bollinger bands, volatility
//! - [`convergence`]: MACD, MACD histogram, PPO, difference lines
//! - [`momentum`]: momentum, rate of change, TRIX
//! - [`range`]: true range, average true range, distance coefficient,
//!   highest/lowest

pub mod convergence;
pub mod mama;
pub mod momentum;
pub mod moving_average;
pub mod oscillator;
pub mod range;
pub mod regression;

use std::any::Any;

use crate::domain::series::Sources;

pub use convergence::{Difference, Macd, MacdHistogram, PercentDifference, Ppo};
pub use mama::Mama;
pub use momentum::{Momentum, RateOfChange, Trix};
pub use moving_average::{Dema, Ema, Kama, Sma, Smma, Tema, Wma};
pub use oscillator::{
    Cci, CenterOfGravity, DetrendedPriceOscillator, FisherTransform, Rsi, SmoothedRsi, Stochastic,
    WilliamsR,
};
pub use range::{AverageTrueRange, DistanceCoefficient, Highest, Lowest, TrueRange};
pub use regression::{
    BollingerBand, LinearRegressionForecast, LinearRegressionSlope, StandardDeviation, Volatility,
};

/// Upcast helper so a `dyn Index` can be downcast to its concrete type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// An incrementally recomputed value stream.
///
/// Construction must not read any history; all consumption happens in
/// `reindex`, which the owning [`Series`](crate::domain::series::Series)
/// calls exactly once per tick.
pub trait Index: AsAny {
    /// Computes the output for the tick just appended upstream.
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64>;
}

/// Exponential or Wilder smoothing seeded with the mean of the first full
/// window of consecutive numeric values.
///
/// A null input emits null and keeps the smoothed value. Before the seed is
/// complete a null input restarts the seed window.
#[derive(Debug, Clone)]
pub struct Smoother {
    periods: usize,
    alpha: f64,
    seed: Vec<f64>,
    value: Option<f64>,
}

impl Smoother {
    /// `prev + k/(N+1) * (current - prev)`; `k = 2` is the classic EMA.
    pub fn exponential(periods: usize, k: f64) -> Self {
        let periods = periods.max(1);
        Self::with_alpha(periods, k / (periods as f64 + 1.0))
    }

    /// Wilder's `(prev * (N-1) + current) / N`.
    pub fn wilder(periods: usize) -> Self {
        let periods = periods.max(1);
        Self::with_alpha(periods, 1.0 / periods as f64)
    }

    fn with_alpha(periods: usize, alpha: f64) -> Self {
        Self {
            periods,
            alpha,
            seed: Vec::new(),
            value: None,
        }
    }

    pub fn update(&mut self, input: Option<f64>) -> Option<f64> {
        let Some(current) = input.filter(|v| v.is_finite()) else {
            if self.value.is_none() {
                self.seed.clear();
            }
            return None;
        };

        let next = match self.value {
            Some(prev) => prev + self.alpha * (current - prev),
            None => {
                self.seed.push(current);
                if self.seed.len() < self.periods {
                    return None;
                }
                let seed = mean(&self.seed);
                self.seed.clear();
                seed
            }
        };
        self.value = finite(next);
        self.value
    }

    /// Current smoothed value, `None` until seeded.
    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

pub(crate) fn extremes(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), &v| {
            (hi.max(v), lo.min(v))
        })
}

pub(crate) fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// `num / den`, null on a zero denominator.
pub(crate) fn ratio(num: f64, den: f64) -> Option<f64> {
    if den == 0.0 {
        return None;
    }
    finite(num / den)
}

/// Feeds `values` through a series with `index` attached and returns the
/// index output.
#[cfg(test)]
pub(crate) fn run<I: Index + 'static>(index: I, values: &[Option<f64>]) -> Vec<Option<f64>> {
    use crate::domain::series::Series;

    let mut series = Series::new("TEST");
    let id = series.add_index("under_test", || index);
    for v in values {
        series.append(*v);
    }
    series
        .stream(id)
        .map(|s| s.values().to_vec())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) fn numeric(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().map(|v| Some(*v)).collect()
}
