//! Oscillators.
//!
//! RSI(n): Wilder-smoothed gains and losses, RSI = 100 * G / (G + L).
//! Smoothed RSI(n): the same ratio over the summed ups/downs of a 4-bar
//! weighted smoothing (P + 2P[1] + 2P[2] + P[3]) / 6.
//! Stochastic %K(n) = (P - LL) / (HH - LL) * 100.
//! Williams %R(n) = (HH - P) / (HH - LL) * -100.
//! CCI(n) = (P - SMA) / (0.015 * mean deviation).
//! Center of gravity(n) = -sum((1+i) * P[i]) / sum(P[i]) + (n+1)/2.
//! Fisher(n): price normalised into the trailing range, then
//! 0.5 * ln((1+v) / (1-v)) + 0.5 * Fisher[1].
//! DPO(n) = P[n/2+1] - SMA(n).
//!
//! No movement (zero range, zero total gain and loss, zero deviation) yields
//! 0 rather than a division error.

use crate::domain::index::{extremes, mean, ratio, Index, Smoother};
use crate::domain::series::Sources;

#[derive(Debug, Clone)]
pub struct Rsi {
    gains: Smoother,
    losses: Smoother,
}

impl Rsi {
    pub fn new(periods: usize) -> Self {
        Self {
            gains: Smoother::wilder(periods),
            losses: Smoother::wilder(periods),
        }
    }
}

impl Index for Rsi {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let change = match sources.source().tail(2) {
            Some(&[Some(prev), Some(current)]) => Some(current - prev),
            _ => None,
        };
        let gain = self.gains.update(change.map(|c| c.max(0.0)));
        let loss = self.losses.update(change.map(|c| (-c).max(0.0)));
        let (gain, loss) = (gain?, loss?);
        Some(ratio(100.0 * gain, gain + loss).unwrap_or(0.0))
    }
}

#[derive(Debug, Clone)]
pub struct SmoothedRsi {
    periods: usize,
}

impl SmoothedRsi {
    pub fn new(periods: usize) -> Self {
        Self {
            periods: periods.max(1),
        }
    }
}

impl Index for SmoothedRsi {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let prices = sources.source().window(self.periods.saturating_add(4))?;
        let smooth: Vec<f64> = prices
            .windows(4)
            .map(|w| (w[3] + 2.0 * w[2] + 2.0 * w[1] + w[0]) / 6.0)
            .collect();

        let (mut up, mut down) = (0.0, 0.0);
        for pair in smooth.windows(2) {
            let change = pair[1] - pair[0];
            if change > 0.0 {
                up += change;
            } else {
                down -= change;
            }
        }
        Some(ratio(100.0 * up, up + down).unwrap_or(0.0))
    }
}

#[derive(Debug, Clone)]
pub struct Stochastic {
    periods: usize,
}

impl Stochastic {
    pub fn new(periods: usize) -> Self {
        Self { periods }
    }
}

impl Index for Stochastic {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.periods)?;
        let (high, low) = extremes(&window);
        let price = window[window.len() - 1];
        Some(ratio((price - low) * 100.0, high - low).unwrap_or(0.0))
    }
}

#[derive(Debug, Clone)]
pub struct WilliamsR {
    periods: usize,
}

impl WilliamsR {
    pub fn new(periods: usize) -> Self {
        Self { periods }
    }
}

impl Index for WilliamsR {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.periods)?;
        let (high, low) = extremes(&window);
        let price = window[window.len() - 1];
        Some(ratio((high - price) * -100.0, high - low).unwrap_or(0.0))
    }
}

#[derive(Debug, Clone)]
pub struct Cci {
    periods: usize,
}

impl Cci {
    pub fn new(periods: usize) -> Self {
        Self { periods }
    }
}

impl Index for Cci {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.periods)?;
        let sma = mean(&window);
        let deviation = window.iter().map(|p| (p - sma).abs()).sum::<f64>() / window.len() as f64;
        let price = window[window.len() - 1];
        Some(ratio(price - sma, 0.015 * deviation).unwrap_or(0.0))
    }
}

#[derive(Debug, Clone)]
pub struct CenterOfGravity {
    periods: usize,
}

impl CenterOfGravity {
    pub fn new(periods: usize) -> Self {
        Self { periods }
    }
}

impl Index for CenterOfGravity {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.periods)?;
        let num: f64 = window
            .iter()
            .rev()
            .enumerate()
            .map(|(i, p)| (i as f64 + 1.0) * p)
            .sum();
        let den: f64 = window.iter().sum();
        Some(ratio(-num, den)? + (self.periods as f64 + 1.0) / 2.0)
    }
}

#[derive(Debug, Clone)]
pub struct FisherTransform {
    periods: usize,
    value: f64,
    fisher: f64,
}

impl FisherTransform {
    pub fn new(periods: usize) -> Self {
        Self {
            periods,
            value: 0.0,
            fisher: 0.0,
        }
    }
}

impl Index for FisherTransform {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.periods)?;
        let (high, low) = extremes(&window);
        let price = window[window.len() - 1];
        let position = ratio(price - low, high - low).map_or(0.0, |p| p - 0.5);

        self.value = (0.66 * position + 0.67 * self.value).clamp(-0.999, 0.999);
        self.fisher = 0.5 * ((1.0 + self.value) / (1.0 - self.value)).ln() + 0.5 * self.fisher;
        Some(self.fisher)
    }
}

#[derive(Debug, Clone)]
pub struct DetrendedPriceOscillator {
    periods: usize,
}

impl DetrendedPriceOscillator {
    pub fn new(periods: usize) -> Self {
        Self { periods }
    }
}

impl Index for DetrendedPriceOscillator {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.periods)?;
        let shifted = sources.source().from_end(self.periods / 2 + 1)?;
        Some(shifted - mean(&window))
    }
}
