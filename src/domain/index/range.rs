//! Range-based indexes over a single price stream.
//!
//! With one stream the high/low of a bar are the extremes of the trailing
//! window, so the true range over N bars spans N+1 samples (the extra one is
//! the previous close).

use crate::domain::index::{extremes, ratio, Index, Smoother};
use crate::domain::series::Sources;

#[derive(Debug, Clone)]
pub struct TrueRange {
    periods: usize,
}

impl TrueRange {
    pub fn new(periods: usize) -> Self {
        Self {
            periods: periods.max(1),
        }
    }
}

impl Index for TrueRange {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.periods.saturating_add(1))?;
        let (high, low) = extremes(&window);
        Some(high - low)
    }
}

/// Wilder average of the one-step true range.
#[derive(Debug, Clone)]
pub struct AverageTrueRange {
    smoother: Smoother,
}

impl AverageTrueRange {
    pub fn new(periods: usize) -> Self {
        Self {
            smoother: Smoother::wilder(periods),
        }
    }
}

impl Index for AverageTrueRange {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let range = match sources.source().tail(2) {
            Some(&[Some(prev), Some(current)]) => Some((current - prev).abs()),
            _ => None,
        };
        self.smoother.update(range)
    }
}

/// Ehlers distance coefficient filter.
///
/// Each of the last N prices is weighted by the sum of its squared distances
/// to the N-1 prices preceding it, which needs 2N-1 samples.
#[derive(Debug, Clone)]
pub struct DistanceCoefficient {
    periods: usize,
}

impl DistanceCoefficient {
    pub fn new(periods: usize) -> Self {
        Self {
            periods: periods.max(1),
        }
    }
}

impl Index for DistanceCoefficient {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let n = self.periods;
        let mut window = sources.source().window(n.saturating_mul(2) - 1)?;
        // newest first
        window.reverse();

        let (mut num, mut den) = (0.0, 0.0);
        for count in 0..n {
            let price = window[count];
            let distance: f64 = (1..n)
                .map(|lookback| (price - window[count + lookback]).powi(2))
                .sum();
            num += distance * price;
            den += distance;
        }
        ratio(num, den)
    }
}

#[derive(Debug, Clone)]
pub struct Highest {
    periods: usize,
}

impl Highest {
    pub fn new(periods: usize) -> Self {
        Self { periods }
    }
}

impl Index for Highest {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.periods)?;
        Some(extremes(&window).0)
    }
}

#[derive(Debug, Clone)]
pub struct Lowest {
    periods: usize,
}

impl Lowest {
    pub fn new(periods: usize) -> Self {
        Self { periods }
    }
}

impl Index for Lowest {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let window = sources.source().window(self.periods)?;
        Some(extremes(&window).1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::index::{numeric, run};
    use approx::assert_relative_eq;

    #[test]
    fn true_range_includes_previous_close() {
        let out = run(TrueRange::new(1), &numeric(&[10.0, 12.0, 11.0]));
        assert_eq!(out, vec![None, Some(2.0), Some(1.0)]);

        let wide = run(TrueRange::new(2), &numeric(&[10.0, 12.0, 11.0]));
        assert_eq!(wide[2], Some(2.0));
    }

    #[test]
    fn average_true_range_is_wilder() {
        let out = run(
            AverageTrueRange::new(2),
            &numeric(&[10.0, 12.0, 11.0, 15.0]),
        );
        assert_eq!(out[1], None);
        assert_relative_eq!(out[2].unwrap(), 1.5);
        assert_relative_eq!(out[3].unwrap(), (1.5 + 4.0) / 2.0);
    }

    #[test]
    fn average_true_range_resumes_after_null() {
        let out = run(
            AverageTrueRange::new(1),
            &[Some(1.0), Some(2.0), None, Some(5.0), Some(7.0)],
        );
        assert_eq!(out[1], Some(1.0));
        assert_eq!(out[2], None);
        // no step across the gap
        assert_eq!(out[3], None);
        assert_eq!(out[4], Some(2.0));
    }

    #[test]
    fn distance_coefficient_window_and_weights() {
        let out = run(
            DistanceCoefficient::new(2),
            &numeric(&[1.0, 1.0, 4.0]),
        );
        assert_eq!(out[1], None);
        // weights: newest 4 -> (4-1)^2 = 9, previous 1 -> 0
        assert_relative_eq!(out[2].unwrap(), 4.0);
    }

    #[test]
    fn distance_coefficient_flat_is_null() {
        let out = run(DistanceCoefficient::new(3), &numeric(&[2.0; 5]));
        assert_eq!(out[4], None);
    }

    #[test]
    fn highest_and_lowest() {
        let prices = numeric(&[3.0, 7.0, 5.0, 1.0]);
        assert_eq!(run(Highest::new(3), &prices)[3], Some(7.0));
        assert_eq!(run(Lowest::new(3), &prices)[3], Some(1.0));
        assert_eq!(run(Lowest::new(3), &prices)[1], None);
    }
}
