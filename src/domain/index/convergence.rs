//! Convergence/divergence lines.
//!
//! MACD = EMA(fast) - EMA(slow), histogram = MACD - EMA(signal) of MACD,
//! PPO = (EMA(fast) - EMA(slow)) / EMA(slow) * 100. `Difference` and
//! `PercentDifference` compare the source with a second stream registered as
//! input 0.

use crate::domain::index::{finite, ratio, Index, Smoother};
use crate::domain::series::Sources;

#[derive(Debug, Clone)]
struct FastSlow {
    fast: Smoother,
    slow: Smoother,
}

impl FastSlow {
    fn new(fast: usize, slow: usize) -> Self {
        Self {
            fast: Smoother::exponential(fast, 2.0),
            slow: Smoother::exponential(slow, 2.0),
        }
    }

    fn update(&mut self, price: Option<f64>) -> Option<(f64, f64)> {
        let fast = self.fast.update(price);
        let slow = self.slow.update(price);
        Some((fast?, slow?))
    }
}

#[derive(Debug, Clone)]
pub struct Macd {
    lines: FastSlow,
}

impl Macd {
    pub fn new(fast: usize, slow: usize) -> Self {
        Self {
            lines: FastSlow::new(fast, slow),
        }
    }
}

impl Index for Macd {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let (fast, slow) = self.lines.update(sources.source().last())?;
        finite(fast - slow)
    }
}

#[derive(Debug, Clone)]
pub struct MacdHistogram {
    lines: FastSlow,
    signal: Smoother,
}

impl MacdHistogram {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        Self {
            lines: FastSlow::new(fast, slow),
            signal: Smoother::exponential(signal, 2.0),
        }
    }
}

impl Index for MacdHistogram {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let macd = self
            .lines
            .update(sources.source().last())
            .and_then(|(fast, slow)| finite(fast - slow));
        let signal = self.signal.update(macd)?;
        finite(macd? - signal)
    }
}

#[derive(Debug, Clone)]
pub struct Ppo {
    lines: FastSlow,
}

impl Ppo {
    pub fn new(fast: usize, slow: usize) -> Self {
        Self {
            lines: FastSlow::new(fast, slow),
        }
    }
}

impl Index for Ppo {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let (fast, slow) = self.lines.update(sources.source().last())?;
        ratio((fast - slow) * 100.0, slow)
    }
}

/// `source - input`.
#[derive(Debug, Clone, Default)]
pub struct Difference;

impl Difference {
    pub fn new() -> Self {
        Self
    }
}

impl Index for Difference {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let source = sources.source().last()?;
        let input = sources.input(0)?.last()?;
        finite(source - input)
    }
}

/// `(source - input) / input * 100`.
#[derive(Debug, Clone, Default)]
pub struct PercentDifference;

impl PercentDifference {
    pub fn new() -> Self {
        Self
    }
}

impl Index for PercentDifference {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let source = sources.source().last()?;
        let input = sources.input(0)?.last()?;
        ratio((source - input) * 100.0, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::index::{numeric, run, Ema, Sma};
    use crate::domain::series::{Series, StreamId};
    use approx::assert_relative_eq;

    #[test]
    fn macd_is_fast_minus_slow() {
        let prices: Vec<f64> = (1..=6).map(f64::from).collect();
        let out = run(Macd::new(2, 4), &numeric(&prices));
        // slow line seeds on the 4th tick
        assert_eq!(out[2], None);
        let ema_fast = run(Ema::new(2, 2.0), &numeric(&prices));
        let ema_slow = run(Ema::new(4, 2.0), &numeric(&prices));
        for i in 3..6 {
            assert_relative_eq!(out[i].unwrap(), ema_fast[i].unwrap() - ema_slow[i].unwrap());
        }
    }

    #[test]
    fn macd_of_constant_is_zero() {
        let out = run(Macd::new(3, 5), &numeric(&[8.0; 8]));
        assert_relative_eq!(out[7].unwrap(), 0.0);
    }

    #[test]
    fn histogram_needs_signal_warmup() {
        let prices: Vec<f64> = (0..12).map(|i| (i * i) as f64).collect();
        let out = run(MacdHistogram::new(2, 4, 3), &numeric(&prices));
        // MACD from tick 3, signal seeded after 3 MACD values
        assert_eq!(out[4], None);
        assert!(out[5].is_some());
    }

    #[test]
    fn ppo_zero_slow_is_null() {
        let out = run(Ppo::new(1, 2), &numeric(&[1.0, -1.0, 4.0]));
        // slow EMA seeds at mean(1, -1) = 0
        assert_eq!(out[1], None);
        assert!(out[2].is_some());
    }

    #[test]
    fn difference_against_input_stream() {
        let mut series = Series::new("TEST");
        let sma = series.add_index("sma2", || Sma::new(2));
        let diff = series
            .add_index_with_inputs(StreamId::ROOT, "diff", &[sma], Difference::new)
            .unwrap();
        let pct = series
            .add_index_with_inputs(StreamId::ROOT, "pct", &[sma], PercentDifference::new)
            .unwrap();

        for v in [10.0, 20.0, 30.0] {
            series.append(Some(v));
        }

        let diff = series.stream(diff).unwrap().values();
        assert_eq!(diff, &[None, Some(5.0), Some(5.0)]);
        let pct = series.stream(pct).unwrap();
        assert_relative_eq!(pct.last().unwrap(), 5.0 / 25.0 * 100.0);
    }

    #[test]
    fn difference_without_input_is_null() {
        let out = run(Difference::new(), &numeric(&[1.0, 2.0]));
        assert_eq!(out, vec![None, None]);
    }
}
