//! MESA adaptive moving average (Ehlers).
//!
//! A Hilbert transform discriminator measures the dominant cycle phase; the
//! phase rate of change sets alpha between `slow_limit` and `fast_limit`:
//! MAMA = alpha*P + (1 - alpha)*MAMA[1], FAMA = alpha/2*MAMA + (1 - alpha/2)*FAMA[1].
//!
//! Real and imaginary parts are smoothed identically. Until enough prices
//! have been seen to fill the filter taps, MAMA follows the raw price.

use std::collections::VecDeque;

use crate::domain::index::Index;
use crate::domain::series::Sources;

const TAPS: usize = 7;
const WARMUP: usize = 6;

/// Fixed-depth history where missing lags read as zero.
#[derive(Debug, Clone, Default)]
struct Lagged {
    values: VecDeque<f64>,
}

impl Lagged {
    fn push(&mut self, value: f64) {
        self.values.push_front(value);
        self.values.truncate(TAPS);
    }

    fn lag(&self, k: usize) -> f64 {
        self.values.get(k).copied().unwrap_or(0.0)
    }

    /// Hilbert transform FIR over lags 0, 2, 4, 6.
    fn hilbert(&self, gain: f64) -> f64 {
        (0.0962 * self.lag(0) + 0.5769 * self.lag(2) - 0.5769 * self.lag(4) - 0.0962 * self.lag(6))
            * gain
    }
}

#[derive(Debug, Clone)]
pub struct Mama {
    fast_limit: f64,
    slow_limit: f64,
    seen: usize,
    price: Lagged,
    smooth: Lagged,
    detrender: Lagged,
    i1: Lagged,
    q1: Lagged,
    i2: f64,
    q2: f64,
    re: f64,
    im: f64,
    period: f64,
    smooth_period: f64,
    phase: f64,
    mama: f64,
    fama: f64,
}

impl Mama {
    pub fn new(fast_limit: f64, slow_limit: f64) -> Self {
        Self {
            fast_limit,
            slow_limit,
            seen: 0,
            price: Lagged::default(),
            smooth: Lagged::default(),
            detrender: Lagged::default(),
            i1: Lagged::default(),
            q1: Lagged::default(),
            i2: 0.0,
            q2: 0.0,
            re: 0.0,
            im: 0.0,
            period: 0.0,
            smooth_period: 0.0,
            phase: 0.0,
            mama: 0.0,
            fama: 0.0,
        }
    }

    /// Following adaptive average of the latest numeric tick.
    pub fn fama(&self) -> Option<f64> {
        (self.seen > 0).then_some(self.fama)
    }

    /// Smoothed dominant cycle period.
    pub fn dominant_period(&self) -> f64 {
        self.smooth_period
    }

    fn step(&mut self, price: f64) -> f64 {
        self.seen += 1;
        self.price.push(price);

        let smooth = (4.0 * self.price.lag(0)
            + 3.0 * self.price.lag(1)
            + 2.0 * self.price.lag(2)
            + self.price.lag(3))
            / 10.0;
        self.smooth.push(smooth);

        let gain = 0.075 * self.period + 0.54;
        self.detrender.push(self.smooth.hilbert(gain));

        let q1 = self.detrender.hilbert(gain);
        let i1 = self.detrender.lag(3);
        self.q1.push(q1);
        self.i1.push(i1);

        let ji = self.i1.hilbert(gain);
        let jq = self.q1.hilbert(gain);

        let prev_i2 = self.i2;
        let prev_q2 = self.q2;
        self.i2 = 0.2 * (i1 - jq) + 0.8 * prev_i2;
        self.q2 = 0.2 * (q1 + ji) + 0.8 * prev_q2;

        let re = self.i2 * prev_i2 + self.q2 * prev_q2;
        let im = self.i2 * prev_q2 - self.q2 * prev_i2;
        self.re = 0.2 * re + 0.8 * self.re;
        self.im = 0.2 * im + 0.8 * self.im;

        let prev_period = self.period;
        let mut period = prev_period;
        if self.im != 0.0 && self.re != 0.0 {
            period = 360.0 / (self.im / self.re).atan().to_degrees();
        }
        if prev_period > 0.0 {
            period = period.min(1.5 * prev_period).max(0.67 * prev_period);
        }
        period = period.clamp(6.0, 50.0);
        self.period = 0.2 * period + 0.8 * prev_period;
        self.smooth_period = 0.33 * self.period + 0.67 * self.smooth_period;

        let prev_phase = self.phase;
        if i1 != 0.0 {
            self.phase = (q1 / i1).atan().to_degrees();
        }
        let delta_phase = (prev_phase - self.phase).max(1.0);
        let alpha = (self.fast_limit / delta_phase).max(self.slow_limit);

        if self.seen <= WARMUP {
            self.mama = price;
            self.fama = price;
        } else {
            self.mama = alpha * price + (1.0 - alpha) * self.mama;
            self.fama = 0.5 * alpha * self.mama + (1.0 - 0.5 * alpha) * self.fama;
        }
        self.mama
    }
}

impl Index for Mama {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let price = sources.source().last()?;
        let mama = self.step(price);
        mama.is_finite().then_some(mama)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::index::{numeric, run};
    use approx::assert_relative_eq;

    #[test]
    fn follows_price_during_warmup() {
        let prices = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0];
        let out = run(Mama::new(0.5, 0.05), &numeric(&prices));
        assert_eq!(out, numeric(&prices));
    }

    #[test]
    fn constant_price_stays_constant() {
        let out = run(Mama::new(0.5, 0.05), &numeric(&[42.0; 40]));
        for v in out {
            assert_relative_eq!(v.unwrap(), 42.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn stays_within_price_range() {
        let prices: Vec<f64> = (0..120)
            .map(|i| 100.0 + 10.0 * (i as f64 * std::f64::consts::PI / 10.0).sin())
            .collect();
        let out = run(Mama::new(0.5, 0.05), &numeric(&prices));
        for v in out {
            let v = v.unwrap();
            assert!((89.9..=110.1).contains(&v), "MAMA {} out of range", v);
        }
    }

    #[test]
    fn null_tick_emits_null_and_keeps_state() {
        let mut values = numeric(&[20.0; 10]);
        values.push(None);
        values.push(Some(20.0));
        let out = run(Mama::new(0.5, 0.05), &values);
        assert_eq!(out[10], None);
        assert_relative_eq!(out[11].unwrap(), 20.0, epsilon = 1e-9);
    }

    #[test]
    fn fama_lags_mama() {
        let mut mama = Mama::new(0.5, 0.05);
        assert_eq!(mama.fama(), None);
        for i in 0..30 {
            mama.step(100.0 + i as f64);
        }
        let fama = mama.fama().unwrap();
        assert!(fama < mama.mama);
        assert!(mama.dominant_period() >= 0.0);
    }
}
