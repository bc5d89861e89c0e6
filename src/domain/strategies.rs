//! Built-in strategies and their registry.
//!
//! All three signal on crossings only: a signal fires on the tick a zone is
//! entered from a different, previously observed zone, and `NoDirection`
//! follows while the zone holds. Null data keeps the last zone.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::domain::error::TickdeskError;
use crate::domain::registry::{input_names, resolve, ParamSpec, Params};
use crate::domain::series::Sources;
use crate::domain::strategy::{Signal, Strategy};

#[derive(Debug, Clone, Default)]
struct Crossing {
    zone: Option<Signal>,
}

impl Crossing {
    fn update(&mut self, zone: Option<Signal>) -> Signal {
        let Some(zone) = zone else {
            return Signal::NoDirection;
        };
        let crossed = self.zone.is_some_and(|previous| previous != zone);
        self.zone = Some(zone);
        if crossed { zone } else { Signal::NoDirection }
    }
}

fn zone_of(value: f64) -> Signal {
    if value > 0.0 {
        Signal::Long
    } else if value < 0.0 {
        Signal::Short
    } else {
        Signal::NoDirection
    }
}

/// Long when the source crosses above input 0, short when it crosses below.
#[derive(Debug, Clone, Default)]
pub struct Crossover {
    crossing: Crossing,
}

impl Crossover {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for Crossover {
    fn query(&mut self, sources: &Sources<'_>) -> Signal {
        let zone = sources
            .source()
            .last()
            .zip(sources.input(0).and_then(|s| s.last()))
            .map(|(source, input)| zone_of(source - input));
        self.crossing.update(zone)
    }
}

/// Long on dropping below `lower`, short on rising above `upper`.
#[derive(Debug, Clone)]
pub struct Threshold {
    lower: f64,
    upper: f64,
    crossing: Crossing,
}

impl Threshold {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper,
            crossing: Crossing::default(),
        }
    }
}

impl Strategy for Threshold {
    fn query(&mut self, sources: &Sources<'_>) -> Signal {
        let zone = sources.source().last().map(|v| {
            if v < self.lower {
                Signal::Long
            } else if v > self.upper {
                Signal::Short
            } else {
                Signal::NoDirection
            }
        });
        self.crossing.update(zone)
    }
}

/// Follows the sign of the source as it crosses zero.
#[derive(Debug, Clone, Default)]
pub struct ZeroCross {
    crossing: Crossing,
}

impl ZeroCross {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Strategy for ZeroCross {
    fn query(&mut self, sources: &Sources<'_>) -> Signal {
        let zone = sources.source().last().map(zone_of);
        self.crossing.update(zone)
    }
}

type Constructor = fn(&Params) -> Result<Box<dyn Strategy>, TickdeskError>;

pub struct StrategyEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    build: Constructor,
}

impl StrategyEntry {
    pub fn inputs(&self) -> impl Iterator<Item = &'static str> + '_ {
        input_names(self.params)
    }

    pub fn build<K: AsRef<str>>(
        &self,
        overrides: &[(K, f64)],
    ) -> Result<Box<dyn Strategy>, TickdeskError> {
        let params = resolve(self.name, self.params, overrides)?;
        (self.build)(&params)
    }
}

impl fmt::Debug for StrategyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyEntry")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

static ENTRIES: &[StrategyEntry] = &[
    StrategyEntry {
        name: "Crossover",
        description: "long above input, short below",
        params: &[ParamSpec::input("input")],
        build: |_| Ok(Box::new(Crossover::new())),
    },
    StrategyEntry {
        name: "Threshold",
        description: "long below lower, short above upper",
        params: &[
            ParamSpec::required_float("lower"),
            ParamSpec::required_float("upper"),
        ],
        build: |p| {
            let (lower, upper) = (p.float("lower")?, p.float("upper")?);
            if lower > upper {
                return Err(TickdeskError::InvalidParam {
                    index: "Threshold".into(),
                    param: "lower".into(),
                    reason: format!("{} is above upper {}", lower, upper),
                });
            }
            Ok(Box::new(Threshold::new(lower, upper)))
        },
    },
    StrategyEntry {
        name: "ZeroCross",
        description: "long above zero, short below",
        params: &[],
        build: |_| Ok(Box::new(ZeroCross::new())),
    },
];

#[derive(Debug)]
pub struct StrategyRegistry {
    by_name: HashMap<String, &'static StrategyEntry>,
}

impl StrategyRegistry {
    pub fn builtin() -> &'static StrategyRegistry {
        static REGISTRY: OnceLock<StrategyRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| StrategyRegistry {
            by_name: ENTRIES
                .iter()
                .map(|e| (e.name.to_ascii_lowercase(), e))
                .collect(),
        })
    }

    pub fn lookup(&self, name: &str) -> Result<&'static StrategyEntry, TickdeskError> {
        self.by_name
            .get(&name.to_ascii_lowercase())
            .copied()
            .ok_or_else(|| TickdeskError::UnknownStrategy {
                name: name.to_string(),
            })
    }

    pub fn entries(&self) -> &'static [StrategyEntry] {
        ENTRIES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::index::Sma;
    use crate::domain::series::{Series, StreamId};
    use crate::domain::strategy::StrategyIndex;

    fn signals<S: Strategy + 'static>(strategy: S, prices: &[Option<f64>]) -> Vec<Option<f64>> {
        let mut series = Series::new("TEST");
        let id = series.add_index("s", || StrategyIndex::new(strategy, 1));
        for p in prices {
            series.append(*p);
        }
        series.stream(id).unwrap().values().to_vec()
    }

    #[test]
    fn zero_cross_fires_on_sign_change_only() {
        let out = signals(
            ZeroCross::new(),
            &[Some(-1.0), Some(-2.0), Some(1.0), Some(3.0), Some(-1.0)],
        );
        assert_eq!(
            out,
            vec![Some(0.0), Some(0.0), Some(1.0), Some(0.0), Some(-1.0)]
        );
    }

    #[test]
    fn null_keeps_the_zone() {
        let out = signals(ZeroCross::new(), &[Some(-1.0), None, Some(-1.0), Some(2.0)]);
        assert_eq!(out, vec![Some(0.0), Some(0.0), Some(0.0), Some(1.0)]);
    }

    #[test]
    fn threshold_zones() {
        let out = signals(
            Threshold::new(30.0, 70.0),
            &[Some(50.0), Some(25.0), Some(20.0), Some(75.0)],
        );
        assert_eq!(out, vec![Some(0.0), Some(1.0), Some(0.0), Some(-1.0)]);
    }

    #[test]
    fn crossover_against_average() {
        let mut series = Series::new("TEST");
        let sma = series.add_index("sma2", || Sma::new(2));
        let id = series
            .add_index_with_inputs(StreamId::ROOT, "x", &[sma], || {
                StrategyIndex::new(Crossover::new(), 10)
            })
            .unwrap();
        for p in [5.0, 4.0, 3.0, 6.0, 7.0, 2.0] {
            series.append(Some(p));
        }
        // sma: -, 4.5, 3.5, 4.5, 6.5, 4.5
        let out = series.stream(id).unwrap().values();
        assert_eq!(
            out,
            &[Some(0.0), Some(0.0), Some(0.0), Some(1.0), Some(0.0), Some(-1.0)]
        );
        let strategy = series.index::<StrategyIndex<Crossover>>(id).unwrap();
        assert_eq!(strategy.position(), 0);
        assert_eq!(strategy.summary().last().unwrap().total, -60.0 + 20.0);
    }

    #[test]
    fn registry_lookup_and_errors() {
        let registry = StrategyRegistry::builtin();
        assert_eq!(registry.entries().len(), 3);
        assert_eq!(
            registry.lookup("crossover").unwrap().inputs().collect::<Vec<_>>(),
            vec!["input"]
        );
        assert!(matches!(
            registry.lookup("Martingale"),
            Err(TickdeskError::UnknownStrategy { .. })
        ));

        let threshold = registry.lookup("Threshold").unwrap();
        assert!(threshold.build(&[("lower", 30.0), ("upper", 70.0)]).is_ok());
        assert!(matches!(
            threshold.build(&[("lower", 30.0)]),
            Err(TickdeskError::InvalidParam { .. })
        ));
        assert!(matches!(
            threshold.build(&[("lower", 80.0), ("upper", 70.0)]),
            Err(TickdeskError::InvalidParam { .. })
        ));
    }

    #[test]
    fn boxed_strategy_drives_an_index() {
        let strategy = StrategyRegistry::builtin()
            .lookup("ZeroCross")
            .unwrap()
            .build(&[] as &[(&str, f64)])
            .unwrap();
        let out = signals(strategy, &[Some(-1.0), Some(1.0)]);
        assert_eq!(out, vec![Some(0.0), Some(1.0)]);
    }
}
