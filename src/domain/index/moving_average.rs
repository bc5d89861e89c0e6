//! Moving averages.
//!
//! SMA(n) = mean of the trailing n samples.
//! WMA(n) = (1*P[i-n+1] + 2*P[i-n+2] + ... + n*P[i]) / (n*(n+1)/2)
//! EMA(n) seeds with the mean of the first full window, then
//! EMA[i] = EMA[i-1] + k/(n+1) * (P[i] - EMA[i-1]).
//! SMMA(n) is Wilder's smoothing: (SMMA[i-1]*(n-1) + P[i]) / n.
//! DEMA = 2*E1 - E2, TEMA = 3*E1 - 3*E2 + E3 where En is the nth EMA pass.
//! KAMA blends towards the price with a smoothing constant driven by the
//! efficiency ratio |P[i] - P[i-n]| / sum(|P[j] - P[j-1]|).

use crate::domain::index::{mean, Index, Smoother};
use crate::domain::series::Sources;

#[derive(Debug, Clone)]
pub struct Sma {
    periods: usize,
}

impl Sma {
    pub fn new(periods: usize) -> Self {
        Self { periods }
    }
}

impl Index for Sma {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.periods)?;
        Some(mean(&window))
    }
}

#[derive(Debug, Clone)]
pub struct Wma {
    weights: Vec<f64>,
    divisor: f64,
}

impl Wma {
    pub fn new(periods: usize) -> Self {
        let weights: Vec<f64> = (1..=periods).map(|w| w as f64).collect();
        let divisor = weights.iter().sum();
        Self { weights, divisor }
    }
}

impl Index for Wma {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.weights.len())?;
        let weighted: f64 = window.iter().zip(&self.weights).map(|(p, w)| p * w).sum();
        Some(weighted / self.divisor)
    }
}

#[derive(Debug, Clone)]
pub struct Ema {
    smoother: Smoother,
}

impl Ema {
    pub fn new(periods: usize, k: f64) -> Self {
        Self {
            smoother: Smoother::exponential(periods, k),
        }
    }
}

impl Index for Ema {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        self.smoother.update(sources.source().last())
    }
}

#[derive(Debug, Clone)]
pub struct Smma {
    smoother: Smoother,
}

impl Smma {
    pub fn new(periods: usize) -> Self {
        Self {
            smoother: Smoother::wilder(periods),
        }
    }
}

impl Index for Smma {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        self.smoother.update(sources.source().last())
    }
}

#[derive(Debug, Clone)]
pub struct Dema {
    first: Smoother,
    second: Smoother,
}

impl Dema {
    pub fn new(periods: usize) -> Self {
        Self {
            first: Smoother::exponential(periods, 2.0),
            second: Smoother::exponential(periods, 2.0),
        }
    }
}

impl Index for Dema {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let e1 = self.first.update(sources.source().last());
        let e2 = self.second.update(e1)?;
        Some(2.0 * e1? - e2)
    }
}

#[derive(Debug, Clone)]
pub struct Tema {
    first: Smoother,
    second: Smoother,
    third: Smoother,
}

impl Tema {
    pub fn new(periods: usize) -> Self {
        Self {
            first: Smoother::exponential(periods, 2.0),
            second: Smoother::exponential(periods, 2.0),
            third: Smoother::exponential(periods, 2.0),
        }
    }
}

impl Index for Tema {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let e1 = self.first.update(sources.source().last());
        let e2 = self.second.update(e1);
        let e3 = self.third.update(e2)?;
        Some(3.0 * e1? - 3.0 * e2? + e3)
    }
}

/// Kaufman adaptive moving average.
///
/// The first two numeric samples (and the first two after a gap of nulls)
/// seed the average with the raw price. A window without any movement has
/// no noise and counts as fully efficient.
#[derive(Debug, Clone)]
pub struct Kama {
    periods: usize,
    fast_sc: f64,
    slow_sc: f64,
    value: Option<f64>,
}

impl Kama {
    pub fn new(periods: usize, fast: usize, slow: usize) -> Self {
        Self {
            periods: periods.max(1),
            fast_sc: 2.0 / (fast as f64 + 1.0),
            slow_sc: 2.0 / (slow as f64 + 1.0),
            value: None,
        }
    }

    fn efficiency(run: &[f64]) -> f64 {
        let change = (run[run.len() - 1] - run[0]).abs();
        let noise: f64 = run.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
        if noise == 0.0 { 1.0 } else { change / noise }
    }
}

impl Index for Kama {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let price = sources.source().last()?;
        let run = sources.source().numeric_run(self.periods.saturating_add(1));

        let next = match self.value {
            Some(prev) if run.len() > 2 => {
                let er = Self::efficiency(&run);
                let sc = (er * (self.fast_sc - self.slow_sc) + self.slow_sc).powi(2);
                prev + sc * (price - prev)
            }
            _ => price,
        };
        self.value = Some(next);
        self.value
    }
}
