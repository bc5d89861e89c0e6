//! Momentum family.
//!
//! Momentum(n) = P - P[n], ROC(n) = (P / P[n] - 1) * 100,
//! TRIX(n) = one-step ROC of EMA(EMA(EMA(P))).

use crate::domain::index::{finite, ratio, Index, Smoother};
use crate::domain::series::Sources;

#[derive(Debug, Clone)]
pub struct Momentum {
    periods: usize,
}

impl Momentum {
    pub fn new(periods: usize) -> Self {
        Self { periods }
    }
}

impl Index for Momentum {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let source = sources.source();
        finite(source.last()? - source.from_end(self.periods)?)
    }
}

#[derive(Debug, Clone)]
pub struct RateOfChange {
    periods: usize,
}

impl RateOfChange {
    pub fn new(periods: usize) -> Self {
        Self { periods }
    }
}

impl Index for RateOfChange {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let source = sources.source();
        let current = source.last()?;
        let previous = source.from_end(self.periods)?;
        ratio((current - previous) * 100.0, previous)
    }
}

#[derive(Debug, Clone)]
pub struct Trix {
    passes: [Smoother; 3],
    previous: Option<f64>,
}

impl Trix {
    pub fn new(periods: usize) -> Self {
        Self {
            passes: std::array::from_fn(|_| Smoother::exponential(periods, 2.0)),
            previous: None,
        }
    }
}

impl Index for Trix {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let mut value = sources.source().last();
        for pass in &mut self.passes {
            value = pass.update(value);
        }
        let current = value?;
        let previous = self.previous.replace(current)?;
        ratio((current - previous) * 100.0, previous)
    }
}
