//! Name-keyed catalogue of the built-in indexes.
//!
//! Each entry carries an ordered parameter schema and a constructor. Building
//! an index merges caller overrides onto the schema defaults, validates the
//! result and hands the constructor an immutable [`Params`]; nothing mutates
//! shared defaults.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use crate::domain::error::TickdeskError;
use crate::domain::index::{
    AverageTrueRange, BollingerBand, Cci, CenterOfGravity, Dema, DetrendedPriceOscillator,
    Difference, DistanceCoefficient, Ema, FisherTransform, Highest, Index, Kama,
    LinearRegressionForecast, LinearRegressionSlope, Lowest, Macd, MacdHistogram, Mama, Momentum,
    PercentDifference, Ppo, RateOfChange, Rsi, Sma, SmoothedRsi, Smma, StandardDeviation,
    Stochastic, Tema, TrueRange, Trix, Volatility, WilliamsR, Wma,
};

/// Largest window any period parameter may ask for.
pub const MAX_PERIOD: usize = 100_000;

/// What a parameter holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Whole number of samples between `min` and `max`.
    Period,
    /// Real number between `min` and `max`.
    Float,
    /// Reference to another stream, resolved when the index is attached.
    Input,
}

impl fmt::Display for ParamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamKind::Period => write!(f, "period"),
            ParamKind::Float => write!(f, "float"),
            ParamKind::Input => write!(f, "input"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub min: f64,
    pub max: f64,
    /// `None` marks a required parameter.
    pub default: Option<f64>,
}

impl ParamSpec {
    pub(crate) const fn period(name: &'static str, default: Option<f64>) -> Self {
        Self {
            name,
            kind: ParamKind::Period,
            min: 1.0,
            max: MAX_PERIOD as f64,
            default,
        }
    }

    pub(crate) const fn float(name: &'static str, min: f64, default: f64) -> Self {
        Self {
            name,
            kind: ParamKind::Float,
            min,
            max: f64::INFINITY,
            default: Some(default),
        }
    }

    pub(crate) const fn required_float(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Float,
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
            default: None,
        }
    }

    pub(crate) const fn input(name: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Input,
            min: 0.0,
            max: 0.0,
            default: None,
        }
    }
}

/// Resolved numeric parameters for one index or strategy instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Params {
    owner: &'static str,
    values: Vec<(&'static str, f64)>,
}

impl Params {
    fn value(&self, name: &str) -> Result<f64, TickdeskError> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
            .ok_or_else(|| TickdeskError::InvalidParam {
                index: self.owner.to_string(),
                param: name.to_string(),
                reason: "not set".into(),
            })
    }

    pub fn period(&self, name: &str) -> Result<usize, TickdeskError> {
        Ok(self.value(name)? as usize)
    }

    pub fn float(&self, name: &str) -> Result<f64, TickdeskError> {
        self.value(name)
    }

    /// Values in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        self.values.iter().copied()
    }
}

/// Merges `overrides` onto the defaults of `specs` and validates every value.
///
/// Later overrides of the same name win. Input parameters are stream
/// references and cannot be overridden numerically.
pub(crate) fn resolve<K: AsRef<str>>(
    owner: &'static str,
    specs: &'static [ParamSpec],
    overrides: &[(K, f64)],
) -> Result<Params, TickdeskError> {
    let invalid = |param: &str, reason: String| TickdeskError::InvalidParam {
        index: owner.to_string(),
        param: param.to_string(),
        reason,
    };

    for (name, _) in overrides {
        let name = name.as_ref();
        match specs.iter().find(|p| p.name == name) {
            None => return Err(invalid(name, "unknown parameter".into())),
            Some(p) if p.kind == ParamKind::Input => {
                return Err(invalid(name, "is a stream reference".into()));
            }
            Some(_) => {}
        }
    }

    let mut values = Vec::with_capacity(specs.len());
    for spec in specs.iter().filter(|p| p.kind != ParamKind::Input) {
        let value = overrides
            .iter()
            .rev()
            .find(|(n, _)| n.as_ref() == spec.name)
            .map(|(_, v)| *v)
            .or(spec.default)
            .ok_or_else(|| invalid(spec.name, "required".into()))?;

        if !value.is_finite() {
            return Err(invalid(spec.name, "must be finite".into()));
        }
        if spec.kind == ParamKind::Period && value.fract() != 0.0 {
            return Err(invalid(spec.name, format!("{} is not a whole number", value)));
        }
        if value < spec.min {
            return Err(invalid(spec.name, format!("must be at least {}", spec.min)));
        }
        if value > spec.max {
            return Err(invalid(spec.name, format!("must be at most {}", spec.max)));
        }
        values.push((spec.name, value));
    }

    Ok(Params { owner, values })
}

pub(crate) fn input_names(specs: &'static [ParamSpec]) -> impl Iterator<Item = &'static str> {
    specs
        .iter()
        .filter(|p| p.kind == ParamKind::Input)
        .map(|p| p.name)
}

type Constructor = fn(&Params) -> Result<Box<dyn Index>, TickdeskError>;

pub struct IndexEntry {
    pub name: &'static str,
    pub description: &'static str,
    pub params: &'static [ParamSpec],
    build: Constructor,
}

impl IndexEntry {
    /// Names of the stream references this index reads besides its source.
    pub fn inputs(&self) -> impl Iterator<Item = &'static str> + '_ {
        input_names(self.params)
    }

    /// Merges `overrides` onto the defaults and validates every value.
    pub fn resolve<K: AsRef<str>>(&self, overrides: &[(K, f64)]) -> Result<Params, TickdeskError> {
        resolve(self.name, self.params, overrides)
    }

    pub fn build<K: AsRef<str>>(&self, overrides: &[(K, f64)]) -> Result<Box<dyn Index>, TickdeskError> {
        let params = self.resolve(overrides)?;
        (self.build)(&params)
    }
}

impl fmt::Debug for IndexEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexEntry")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

const PERIODS: ParamSpec = ParamSpec::period("periods", None);
const INPUT: ParamSpec = ParamSpec::input("input");

const fn periods(default: f64) -> ParamSpec {
    ParamSpec::period("periods", Some(default))
}

static ENTRIES: &[IndexEntry] = &[
    IndexEntry {
        name: "SMA",
        description: "simple moving average",
        params: &[PERIODS],
        build: |p| Ok(Box::new(Sma::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "WMA",
        description: "linearly weighted moving average",
        params: &[PERIODS],
        build: |p| Ok(Box::new(Wma::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "EMA",
        description: "exponential moving average, alpha = k/(periods+1)",
        params: &[PERIODS, ParamSpec::float("k", 0.0, 2.0)],
        build: |p| Ok(Box::new(Ema::new(p.period("periods")?, p.float("k")?))),
    },
    IndexEntry {
        name: "SMMA",
        description: "Wilder smoothed moving average",
        params: &[PERIODS],
        build: |p| Ok(Box::new(Smma::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "DEMA",
        description: "double exponential moving average",
        params: &[PERIODS],
        build: |p| Ok(Box::new(Dema::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "TEMA",
        description: "triple exponential moving average",
        params: &[PERIODS],
        build: |p| Ok(Box::new(Tema::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "KAMA",
        description: "Kaufman adaptive moving average",
        params: &[
            periods(10.0),
            ParamSpec::period("fast", Some(2.0)),
            ParamSpec::period("slow", Some(30.0)),
        ],
        build: |p| {
            Ok(Box::new(Kama::new(
                p.period("periods")?,
                p.period("fast")?,
                p.period("slow")?,
            )))
        },
    },
    IndexEntry {
        name: "MAMA",
        description: "MESA adaptive moving average",
        params: &[
            ParamSpec::float("fast_limit", 0.0, 0.5),
            ParamSpec::float("slow_limit", 0.0, 0.05),
        ],
        build: |p| Ok(Box::new(Mama::new(p.float("fast_limit")?, p.float("slow_limit")?))),
    },
    IndexEntry {
        name: "RSI",
        description: "Wilder relative strength index",
        params: &[periods(14.0)],
        build: |p| Ok(Box::new(Rsi::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "SmoothedRSI",
        description: "RSI of 4-bar smoothed price",
        params: &[periods(10.0)],
        build: |p| Ok(Box::new(SmoothedRsi::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "Stochastic",
        description: "stochastic %K",
        params: &[periods(14.0)],
        build: |p| Ok(Box::new(Stochastic::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "WilliamsR",
        description: "Williams %R",
        params: &[periods(14.0)],
        build: |p| Ok(Box::new(WilliamsR::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "CCI",
        description: "commodity channel index",
        params: &[periods(20.0)],
        build: |p| Ok(Box::new(Cci::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "CenterOfGravity",
        description: "Ehlers center of gravity oscillator",
        params: &[periods(10.0)],
        build: |p| Ok(Box::new(CenterOfGravity::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "FisherTransform",
        description: "Ehlers Fisher transform",
        params: &[periods(10.0)],
        build: |p| Ok(Box::new(FisherTransform::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "DPO",
        description: "detrended price oscillator",
        params: &[periods(20.0)],
        build: |p| Ok(Box::new(DetrendedPriceOscillator::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "LinearRegressionSlope",
        description: "least-squares slope, times scale",
        params: &[PERIODS, ParamSpec::float("scale", f64::NEG_INFINITY, 1.0)],
        build: |p| {
            Ok(Box::new(LinearRegressionSlope::new(
                p.period("periods")?,
                p.float("scale")?,
            )))
        },
    },
    IndexEntry {
        name: "LinearRegressionForecast",
        description: "least-squares line at the newest sample",
        params: &[PERIODS],
        build: |p| Ok(Box::new(LinearRegressionForecast::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "StandardDeviation",
        description: "population standard deviation",
        params: &[PERIODS],
        build: |p| Ok(Box::new(StandardDeviation::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "BollingerBand",
        description: "SMA plus deviations * sigma (negative for the lower band)",
        params: &[
            periods(20.0),
            ParamSpec::float("deviations", f64::NEG_INFINITY, 2.0),
        ],
        build: |p| {
            Ok(Box::new(BollingerBand::new(
                p.period("periods")?,
                p.float("deviations")?,
            )))
        },
    },
    IndexEntry {
        name: "Volatility",
        description: "standard deviation of percentage changes",
        params: &[PERIODS],
        build: |p| Ok(Box::new(Volatility::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "MACD",
        description: "EMA(fast) - EMA(slow)",
        params: &[
            ParamSpec::period("fast", Some(12.0)),
            ParamSpec::period("slow", Some(26.0)),
        ],
        build: |p| Ok(Box::new(Macd::new(p.period("fast")?, p.period("slow")?))),
    },
    IndexEntry {
        name: "MACDHistogram",
        description: "MACD - EMA(signal) of MACD",
        params: &[
            ParamSpec::period("fast", Some(12.0)),
            ParamSpec::period("slow", Some(26.0)),
            ParamSpec::period("signal", Some(9.0)),
        ],
        build: |p| {
            Ok(Box::new(MacdHistogram::new(
                p.period("fast")?,
                p.period("slow")?,
                p.period("signal")?,
            )))
        },
    },
    IndexEntry {
        name: "PPO",
        description: "percentage price oscillator",
        params: &[
            ParamSpec::period("fast", Some(12.0)),
            ParamSpec::period("slow", Some(26.0)),
        ],
        build: |p| Ok(Box::new(Ppo::new(p.period("fast")?, p.period("slow")?))),
    },
    IndexEntry {
        name: "Difference",
        description: "source - input",
        params: &[INPUT],
        build: |_| Ok(Box::new(Difference::new())),
    },
    IndexEntry {
        name: "PercentDifference",
        description: "(source - input) / input * 100",
        params: &[INPUT],
        build: |_| Ok(Box::new(PercentDifference::new())),
    },
    IndexEntry {
        name: "Momentum",
        description: "current minus value periods back",
        params: &[PERIODS],
        build: |p| Ok(Box::new(Momentum::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "RateOfChange",
        description: "percentage change over periods",
        params: &[PERIODS],
        build: |p| Ok(Box::new(RateOfChange::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "TRIX",
        description: "rate of change of a triple EMA",
        params: &[PERIODS],
        build: |p| Ok(Box::new(Trix::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "TrueRange",
        description: "range over periods plus the previous close",
        params: &[periods(1.0)],
        build: |p| Ok(Box::new(TrueRange::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "AverageTrueRange",
        description: "Wilder average of the one-step true range",
        params: &[periods(14.0)],
        build: |p| Ok(Box::new(AverageTrueRange::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "DistanceCoefficient",
        description: "Ehlers distance coefficient filter",
        params: &[periods(10.0)],
        build: |p| Ok(Box::new(DistanceCoefficient::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "Highest",
        description: "highest value over periods",
        params: &[PERIODS],
        build: |p| Ok(Box::new(Highest::new(p.period("periods")?))),
    },
    IndexEntry {
        name: "Lowest",
        description: "lowest value over periods",
        params: &[PERIODS],
        build: |p| Ok(Box::new(Lowest::new(p.period("periods")?))),
    },
];

/// Case-insensitive lookup over a fixed set of entries.
#[derive(Debug)]
pub struct IndexRegistry {
    entries: &'static [IndexEntry],
    by_name: HashMap<String, usize>,
}

impl IndexRegistry {
    fn new(entries: &'static [IndexEntry]) -> Self {
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.to_ascii_lowercase(), i))
            .collect();
        Self { entries, by_name }
    }

    /// Every index this crate ships, built on first use.
    pub fn builtin() -> &'static IndexRegistry {
        static REGISTRY: OnceLock<IndexRegistry> = OnceLock::new();
        REGISTRY.get_or_init(|| IndexRegistry::new(ENTRIES))
    }

    pub fn lookup(&self, name: &str) -> Result<&'static IndexEntry, TickdeskError> {
        self.by_name
            .get(&name.to_ascii_lowercase())
            .map(|&i| &self.entries[i])
            .ok_or_else(|| TickdeskError::UnknownIndex {
                name: name.to_string(),
            })
    }

    /// Entries in declaration order.
    pub fn entries(&self) -> &'static [IndexEntry] {
        self.entries
    }

    pub fn build<K: AsRef<str>>(
        &self,
        name: &str,
        overrides: &[(K, f64)],
    ) -> Result<Box<dyn Index>, TickdeskError> {
        self.lookup(name)?.build(overrides)
    }
}
