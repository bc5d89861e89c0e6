//! Append-only sample streams and the index cascade.
//!
//! A [`Series`] owns one raw stream of samples plus every index attached to
//! it, directly or through other indexes. Streams are addressed by
//! [`StreamId`]; an index only ever holds ids of the streams it reads, never
//! a reference, so the graph is a DAG owned in one place.
//!
//! Appending to a series reindexes every attached index exactly once, in
//! attachment order. An index can only read streams that existed when it was
//! attached, so attachment order is also a valid topological order: whatever
//! an index reads has already been updated for the current tick.

use std::collections::HashMap;
use std::fmt;

use crate::domain::error::TickdeskError;
use crate::domain::index::Index;

/// Handle to one stream inside a [`Series`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(usize);

impl StreamId {
    /// The raw sample stream of a series.
    pub const ROOT: StreamId = StreamId(0);

    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Ordered samples with the `x`/`y` projections used by regression-style math.
///
/// `x` holds the 1-based position of every non-null sample and `y` the
/// non-null values themselves, so `x.len() == y.len()` and both only grow.
/// Non-finite values (NaN, infinities) are stored as null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Samples {
    values: Vec<Option<f64>>,
    x: Vec<usize>,
    y: Vec<f64>,
}

impl Samples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Option<f64>) {
        let value = value.filter(|v| v.is_finite());
        self.values.push(value);
        if let Some(v) = value {
            self.x.push(self.values.len());
            self.y.push(v);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Latest sample, `None` when empty or null.
    pub fn last(&self) -> Option<f64> {
        self.values.last().copied().flatten()
    }

    pub fn get(&self, i: usize) -> Option<f64> {
        self.values.get(i).copied().flatten()
    }

    /// Sample `k` steps back from the latest one (`from_end(0) == last()`).
    pub fn from_end(&self, k: usize) -> Option<f64> {
        let i = self.values.len().checked_sub(k.checked_add(1)?)?;
        self.values[i]
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn x(&self) -> &[usize] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    /// Trailing `n` samples, or `None` while fewer than `n` exist.
    pub fn tail(&self, n: usize) -> Option<&[Option<f64>]> {
        let start = self.values.len().checked_sub(n)?;
        Some(&self.values[start..])
    }

    /// Trailing `n` samples when all of them are numeric.
    pub fn window(&self, n: usize) -> Option<Vec<f64>> {
        if n == 0 {
            return None;
        }
        self.tail(n)?.iter().copied().collect()
    }

    /// Longest trailing run of numeric samples, capped at `max` values.
    pub fn numeric_run(&self, max: usize) -> Vec<f64> {
        let mut run: Vec<f64> = self
            .values
            .iter()
            .rev()
            .take(max)
            .map_while(|v| *v)
            .collect();
        run.reverse();
        run
    }
}

/// Read-only view handed to [`Index::reindex`].
pub struct Sources<'a> {
    streams: &'a [Samples],
    source: StreamId,
    inputs: &'a [StreamId],
}

impl<'a> Sources<'a> {
    /// The stream the index is attached to.
    pub fn source(&self) -> &'a Samples {
        &self.streams[self.source.0]
    }

    /// The `n`th secondary input registered with the index.
    pub fn input(&self, n: usize) -> Option<&'a Samples> {
        self.inputs.get(n).map(|id| &self.streams[id.0])
    }

    /// Zero-based number of the tick being processed.
    pub fn position(&self) -> usize {
        self.streams[StreamId::ROOT.0].len().saturating_sub(1)
    }
}

struct Attached {
    key: String,
    source: StreamId,
    inputs: Vec<StreamId>,
    index: Box<dyn Index>,
}

/// One raw sample stream and the graph of indexes computed from it.
pub struct Series {
    name: String,
    streams: Vec<Samples>,
    attached: Vec<Attached>,
    keys: HashMap<(StreamId, String), StreamId>,
}

impl Series {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            streams: vec![Samples::new()],
            attached: Vec::new(),
            keys: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Appends a raw sample and runs the cascade before returning.
    pub fn append(&mut self, value: Option<f64>) {
        self.streams[StreamId::ROOT.0].push(value);
        tracing::trace!(
            series = %self.name,
            len = self.streams[StreamId::ROOT.0].len(),
            indexes = self.attached.len(),
            "cascade"
        );

        for (offset, node) in self.attached.iter_mut().enumerate() {
            let value = node.index.reindex(&Sources {
                streams: &self.streams,
                source: node.source,
                inputs: &node.inputs,
            });
            self.streams[offset + 1].push(value);
        }
    }

    /// Attaches an index to the raw stream under `key`.
    ///
    /// Returns the existing stream when `key` is already registered on the
    /// raw stream; `factory` is not called in that case.
    pub fn add_index<I, F>(&mut self, key: &str, factory: F) -> StreamId
    where
        I: Index + 'static,
        F: FnOnce() -> I,
    {
        if let Some(id) = self.find(StreamId::ROOT, key) {
            return id;
        }
        self.push_node(StreamId::ROOT, key, Vec::new(), Box::new(factory()))
    }

    /// Attaches an index to any stream of this series under `key`.
    pub fn add_index_to<I, F>(
        &mut self,
        source: StreamId,
        key: &str,
        factory: F,
    ) -> Result<StreamId, TickdeskError>
    where
        I: Index + 'static,
        F: FnOnce() -> I,
    {
        self.add_index_with_inputs(source, key, &[], factory)
    }

    /// Attaches an index that also reads secondary `inputs`.
    pub fn add_index_with_inputs<I, F>(
        &mut self,
        source: StreamId,
        key: &str,
        inputs: &[StreamId],
        factory: F,
    ) -> Result<StreamId, TickdeskError>
    where
        I: Index + 'static,
        F: FnOnce() -> I,
    {
        self.add_boxed_index(source, key, inputs, || {
            Ok(Box::new(factory()) as Box<dyn Index>)
        })
    }

    /// Attaches an index produced by a fallible, type-erased factory.
    pub fn add_boxed_index<F>(
        &mut self,
        source: StreamId,
        key: &str,
        inputs: &[StreamId],
        factory: F,
    ) -> Result<StreamId, TickdeskError>
    where
        F: FnOnce() -> Result<Box<dyn Index>, TickdeskError>,
    {
        if let Some(id) = self.find(source, key) {
            return Ok(id);
        }
        self.check(source)?;
        for input in inputs {
            self.check(*input)?;
        }
        let index = factory()?;
        Ok(self.push_node(source, key, inputs.to_vec(), index))
    }

    fn push_node(
        &mut self,
        source: StreamId,
        key: &str,
        inputs: Vec<StreamId>,
        index: Box<dyn Index>,
    ) -> StreamId {
        let id = StreamId(self.streams.len());
        self.streams.push(Samples::new());
        self.attached.push(Attached {
            key: key.to_string(),
            source,
            inputs,
            index,
        });
        self.keys.insert((source, key.to_string()), id);
        tracing::debug!(series = %self.name, key, %source, stream = %id, "index attached");
        id
    }

    fn check(&self, id: StreamId) -> Result<(), TickdeskError> {
        if id.0 < self.streams.len() {
            Ok(())
        } else {
            Err(TickdeskError::UnknownStream {
                reference: format!("{} in series {}", id, self.name),
            })
        }
    }

    /// Stream registered under `key` on `source`.
    pub fn find(&self, source: StreamId, key: &str) -> Option<StreamId> {
        self.keys.get(&(source, key.to_string())).copied()
    }

    /// Raw samples.
    pub fn samples(&self) -> &Samples {
        &self.streams[StreamId::ROOT.0]
    }

    pub fn stream(&self, id: StreamId) -> Option<&Samples> {
        self.streams.get(id.0)
    }

    /// Concrete index behind `id`, when it is a `T`.
    pub fn index<T: Index + 'static>(&self, id: StreamId) -> Option<&T> {
        let node = self.attached.get(id.0.checked_sub(1)?)?;
        let index: &dyn Index = node.index.as_ref();
        index.as_any().downcast_ref::<T>()
    }

    /// Key an index was registered under.
    pub fn key(&self, id: StreamId) -> Option<&str> {
        let node = self.attached.get(id.0.checked_sub(1)?)?;
        Some(node.key.as_str())
    }

    /// Stream an index is attached to.
    pub fn source_of(&self, id: StreamId) -> Option<StreamId> {
        let node = self.attached.get(id.0.checked_sub(1)?)?;
        Some(node.source)
    }

    /// Attached streams in attachment order.
    pub fn indexes(&self) -> impl Iterator<Item = (StreamId, &str)> {
        self.attached
            .iter()
            .enumerate()
            .map(|(offset, node)| (StreamId(offset + 1), node.key.as_str()))
    }

    pub fn index_count(&self) -> usize {
        self.attached.len()
    }

    pub fn len(&self) -> usize {
        self.samples().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples().is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.samples().last()
    }
}

impl fmt::Debug for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Series")
            .field("name", &self.name)
            .field("len", &self.len())
            .field("indexes", &self.indexes().collect::<Vec<_>>())
            .finish()
    }
}
