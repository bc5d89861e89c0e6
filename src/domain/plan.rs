//! Declarative description of the indexes and strategy to attach to a series.
//!
//! A plan is read once from configuration, checked against the registries and
//! then applied to every series a session creates. Index references are keys
//! of other plan entries (or `raw` for the tick stream); entries are ordered
//! so that everything an index reads is attached before it.

use crate::domain::error::TickdeskError;
use crate::domain::index::Index;
use crate::domain::registry::IndexRegistry;
use crate::domain::series::{Series, StreamId};
use crate::domain::strategies::StrategyRegistry;
use crate::domain::strategy::{Strategy, StrategyIndex};
use crate::ports::config_port::ConfigPort;

/// Prefix of the configuration sections describing indexes.
pub const INDEX_SECTION_PREFIX: &str = "index.";
pub const STRATEGY_SECTION: &str = "strategy";
/// Key the strategy index is registered under on its source stream.
pub const STRATEGY_KEY: &str = "strategy";

/// Strategy index type attached by a plan.
pub type PlannedStrategy = StrategyIndex<Box<dyn Strategy>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamRef {
    /// The raw tick stream.
    Raw,
    /// Output of the plan entry with this key.
    Key(String),
}

impl StreamRef {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("raw") {
            StreamRef::Raw
        } else {
            StreamRef::Key(s.to_ascii_lowercase())
        }
    }
}

impl std::fmt::Display for StreamRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamRef::Raw => write!(f, "raw"),
            StreamRef::Key(key) => write!(f, "{}", key),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    pub key: String,
    pub kind: String,
    pub source: StreamRef,
    pub inputs: Vec<StreamRef>,
    pub params: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategySpec {
    pub name: String,
    pub source: StreamRef,
    pub inputs: Vec<StreamRef>,
    pub trade_shares: i64,
    pub params: Vec<(String, f64)>,
}

/// Streams created by [`SeriesPlan::apply`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanHandles {
    /// Plan keys with their streams, in attachment order.
    pub indexes: Vec<(String, StreamId)>,
    pub strategy: Option<StreamId>,
}

impl PlanHandles {
    pub fn get(&self, key: &str) -> Option<StreamId> {
        self.indexes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, id)| *id)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesPlan {
    indexes: Vec<IndexSpec>,
    strategy: Option<StrategySpec>,
}

impl SeriesPlan {
    /// Validates every entry and orders them so sources precede readers.
    ///
    /// Keys are matched case-insensitively, like the references to them, and
    /// are stored lowercased.
    pub fn new(
        mut indexes: Vec<IndexSpec>,
        strategy: Option<StrategySpec>,
    ) -> Result<Self, TickdeskError> {
        let registry = IndexRegistry::builtin();
        for spec in &mut indexes {
            spec.key = spec.key.trim().to_ascii_lowercase();
            if spec.key.is_empty() || spec.key == "raw" || spec.key == STRATEGY_KEY {
                return Err(TickdeskError::ConfigInvalid {
                    section: format!("{}{}", INDEX_SECTION_PREFIX, spec.key),
                    key: "key".into(),
                    reason: format!("'{}' cannot be used as an index key", spec.key),
                });
            }
        }
        for spec in &indexes {
            let entry = registry.lookup(&spec.kind)?;
            entry.resolve(&spec.params)?;
            check_inputs(&spec.key, entry.inputs().count(), spec.inputs.len())?;
        }

        let indexes = order(indexes)?;

        if let Some(spec) = &strategy {
            let entry = StrategyRegistry::builtin().lookup(&spec.name)?;
            entry.build(&spec.params)?;
            check_inputs(STRATEGY_SECTION, entry.inputs().count(), spec.inputs.len())?;
            for reference in std::iter::once(&spec.source).chain(&spec.inputs) {
                check_reference(&indexes, reference)?;
            }
            if spec.trade_shares <= 0 {
                return Err(TickdeskError::ConfigInvalid {
                    section: STRATEGY_SECTION.into(),
                    key: "trade_shares".into(),
                    reason: "trade_shares must be positive".into(),
                });
            }
        }

        Ok(Self { indexes, strategy })
    }

    /// Reads `[index.<key>]` sections and the optional `[strategy]` section.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, TickdeskError> {
        let registry = IndexRegistry::builtin();
        let mut sections: Vec<String> = config
            .sections()
            .into_iter()
            .filter(|s| s.starts_with(INDEX_SECTION_PREFIX))
            .collect();
        sections.sort();

        let mut indexes = Vec::with_capacity(sections.len());
        for section in &sections {
            let key = section[INDEX_SECTION_PREFIX.len()..].to_string();
            let kind = required(config, section, "type")?;
            let entry = registry.lookup(&kind)?;
            let inputs: Vec<&str> = entry.inputs().collect();
            let (source, inputs, params) = read_wiring(config, section, &["type"], &inputs)?;
            indexes.push(IndexSpec {
                key,
                kind,
                source,
                inputs,
                params,
            });
        }

        let strategy = if config.sections().iter().any(|s| s == STRATEGY_SECTION) {
            let name = required(config, STRATEGY_SECTION, "name")?;
            let entry = StrategyRegistry::builtin().lookup(&name)?;
            let inputs: Vec<&str> = entry.inputs().collect();
            let (source, inputs, params) = read_wiring(
                config,
                STRATEGY_SECTION,
                &["name", "trade_shares"],
                &inputs,
            )?;
            let trade_shares = match config.get_string(STRATEGY_SECTION, "trade_shares") {
                None => 100,
                Some(raw) => raw.trim().parse::<i64>().map_err(|_| TickdeskError::ConfigInvalid {
                    section: STRATEGY_SECTION.into(),
                    key: "trade_shares".into(),
                    reason: format!("'{}' is not a whole number", raw),
                })?,
            };
            Some(StrategySpec {
                name,
                source,
                inputs,
                trade_shares,
                params,
            })
        } else {
            None
        };

        Self::new(indexes, strategy)
    }

    /// Index specs in attachment order.
    pub fn indexes(&self) -> &[IndexSpec] {
        &self.indexes
    }

    pub fn strategy(&self) -> Option<&StrategySpec> {
        self.strategy.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty() && self.strategy.is_none()
    }

    /// Attaches every planned index and the strategy to `series`.
    ///
    /// Applying the same plan twice attaches nothing new.
    pub fn apply(&self, series: &mut Series) -> Result<PlanHandles, TickdeskError> {
        let registry = IndexRegistry::builtin();
        let mut handles = PlanHandles::default();

        for spec in &self.indexes {
            let source = resolve(&handles, &spec.source)?;
            let inputs = spec
                .inputs
                .iter()
                .map(|r| resolve(&handles, r))
                .collect::<Result<Vec<_>, _>>()?;
            let id = series.add_boxed_index(source, &spec.key, &inputs, || {
                registry.build(&spec.kind, &spec.params)
            })?;
            handles.indexes.push((spec.key.clone(), id));
        }

        if let Some(spec) = &self.strategy {
            let source = resolve(&handles, &spec.source)?;
            let inputs = spec
                .inputs
                .iter()
                .map(|r| resolve(&handles, r))
                .collect::<Result<Vec<_>, _>>()?;
            let id = series.add_boxed_index(source, STRATEGY_KEY, &inputs, || {
                let strategy = StrategyRegistry::builtin()
                    .lookup(&spec.name)?
                    .build(&spec.params)?;
                Ok(Box::new(PlannedStrategy::new(strategy, spec.trade_shares)) as Box<dyn Index>)
            })?;
            handles.strategy = Some(id);
        }

        Ok(handles)
    }
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, TickdeskError> {
    match config.get_string(section, key) {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(TickdeskError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

type Wiring = (StreamRef, Vec<StreamRef>, Vec<(String, f64)>);

/// Splits a section into its source, its input references and numeric
/// parameters. Every key not named in `reserved` or `inputs` is a parameter.
fn read_wiring(
    config: &dyn ConfigPort,
    section: &str,
    reserved: &[&str],
    inputs: &[&str],
) -> Result<Wiring, TickdeskError> {
    let source = StreamRef::parse(&config.get_string(section, "source").unwrap_or_default());
    let input_refs = inputs
        .iter()
        .map(|name| required(config, section, name).map(|v| StreamRef::parse(&v)))
        .collect::<Result<Vec<_>, _>>()?;

    let mut params = Vec::new();
    for key in config.keys(section) {
        if key == "source" || reserved.contains(&key.as_str()) || inputs.contains(&key.as_str()) {
            continue;
        }
        let raw = config.get_string(section, &key).unwrap_or_default();
        let value = raw
            .trim()
            .parse::<f64>()
            .map_err(|_| TickdeskError::ConfigInvalid {
                section: section.to_string(),
                key: key.clone(),
                reason: format!("'{}' is not a number", raw),
            })?;
        params.push((key, value));
    }
    Ok((source, input_refs, params))
}

fn check_inputs(owner: &str, expected: usize, got: usize) -> Result<(), TickdeskError> {
    if expected == got {
        return Ok(());
    }
    Err(TickdeskError::ConfigInvalid {
        section: owner.to_string(),
        key: "input".into(),
        reason: format!("expected {} input stream(s), got {}", expected, got),
    })
}

fn check_reference(ordered: &[IndexSpec], reference: &StreamRef) -> Result<(), TickdeskError> {
    match reference {
        StreamRef::Raw => Ok(()),
        StreamRef::Key(key) if ordered.iter().any(|s| &s.key == key) => Ok(()),
        StreamRef::Key(key) => Err(TickdeskError::UnknownStream {
            reference: key.clone(),
        }),
    }
}

/// Stable topological order: among ready specs the earliest listed goes first.
fn order(mut pending: Vec<IndexSpec>) -> Result<Vec<IndexSpec>, TickdeskError> {
    for (i, spec) in pending.iter().enumerate() {
        if pending[..i].iter().any(|s| s.key == spec.key) {
            return Err(TickdeskError::ConfigInvalid {
                section: format!("{}{}", INDEX_SECTION_PREFIX, spec.key),
                key: "key".into(),
                reason: "duplicate index key".into(),
            });
        }
        for reference in std::iter::once(&spec.source).chain(&spec.inputs) {
            check_reference(&pending, reference)?;
        }
    }

    let mut ordered: Vec<IndexSpec> = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready = pending.iter().position(|spec| {
            std::iter::once(&spec.source)
                .chain(&spec.inputs)
                .all(|r| check_reference(&ordered, r).is_ok())
        });
        match ready {
            Some(i) => ordered.push(pending.remove(i)),
            None => {
                let keys: Vec<&str> = pending.iter().map(|s| s.key.as_str()).collect();
                return Err(TickdeskError::ConfigInvalid {
                    section: format!("{}{}", INDEX_SECTION_PREFIX, keys[0]),
                    key: "source".into(),
                    reason: format!("circular reference between {}", keys.join(", ")),
                });
            }
        }
    }
    Ok(ordered)
}

fn resolve(handles: &PlanHandles, reference: &StreamRef) -> Result<StreamId, TickdeskError> {
    match reference {
        StreamRef::Raw => Ok(StreamId::ROOT),
        StreamRef::Key(key) => handles.get(key).ok_or_else(|| TickdeskError::UnknownStream {
            reference: key.clone(),
        }),
    }
}
