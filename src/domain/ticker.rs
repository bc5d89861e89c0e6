//! Per-instrument ownership of series.
//!
//! A [`TickerCollection`] routes each incoming tick to the series for its
//! (ticker, field) pair, creating tickers and series on first sight through an
//! injected builder. Appending runs the series cascade before `on_tick`
//! returns.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;

use crate::domain::error::TickdeskError;
use crate::domain::series::Series;

/// Market data field a tick updates, numbered like broker tick types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TickField {
    BidSize,
    Bid,
    Ask,
    AskSize,
    Last,
    LastSize,
    High,
    Low,
    Volume,
    Close,
    Open,
    Other(i32),
}

const NAMED: [(TickField, &str, i32); 11] = [
    (TickField::BidSize, "bid_size", 0),
    (TickField::Bid, "bid", 1),
    (TickField::Ask, "ask", 2),
    (TickField::AskSize, "ask_size", 3),
    (TickField::Last, "last", 4),
    (TickField::LastSize, "last_size", 5),
    (TickField::High, "high", 6),
    (TickField::Low, "low", 7),
    (TickField::Volume, "volume", 8),
    (TickField::Close, "close", 9),
    (TickField::Open, "open", 14),
];

impl TickField {
    pub fn from_code(code: i32) -> Self {
        NAMED
            .iter()
            .find(|(_, _, c)| *c == code)
            .map_or(TickField::Other(code), |(field, _, _)| *field)
    }

    pub fn code(self) -> i32 {
        match self {
            TickField::Other(code) => code,
            named => NAMED
                .iter()
                .find(|(field, _, _)| *field == named)
                .map_or(-1, |(_, _, code)| *code),
        }
    }

    pub fn is_price(self) -> bool {
        matches!(
            self,
            TickField::Bid
                | TickField::Ask
                | TickField::Last
                | TickField::High
                | TickField::Low
                | TickField::Close
                | TickField::Open
        )
    }
}

impl fmt::Display for TickField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match NAMED.iter().find(|(field, _, _)| field == self) {
            Some((_, name, _)) => write!(f, "{}", name),
            None => write!(f, "{}", self.code()),
        }
    }
}

impl FromStr for TickField {
    type Err = String;

    /// Accepts a field name (`last`, `bid_size`, ...) or a numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i32>() {
            return Ok(TickField::from_code(code));
        }
        let lower = s.to_ascii_lowercase();
        NAMED
            .iter()
            .find(|(_, name, _)| *name == lower)
            .map(|(field, _, _)| *field)
            .ok_or_else(|| format!("unknown tick field '{}'", s))
    }
}

/// One recorded market data update.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub time: NaiveDateTime,
    pub ticker_id: i64,
    pub field: TickField,
    pub value: Option<f64>,
}

#[derive(Debug)]
pub struct Ticker {
    pub id: i64,
    pub symbol: String,
    pub series: BTreeMap<TickField, Series>,
    pub last_update: Option<NaiveDateTime>,
}

impl Ticker {
    fn new(id: i64, symbol: String) -> Self {
        Self {
            id,
            symbol,
            series: BTreeMap::new(),
            last_update: None,
        }
    }
}

type Builder = Box<dyn FnMut(i64, TickField) -> Result<Series, TickdeskError>>;

pub struct TickerCollection {
    tickers: BTreeMap<i64, Ticker>,
    builder: Builder,
}

impl TickerCollection {
    /// Collection whose series are produced by `builder` on first tick.
    pub fn new<F>(builder: F) -> Self
    where
        F: FnMut(i64, TickField) -> Result<Series, TickdeskError> + 'static,
    {
        Self {
            tickers: BTreeMap::new(),
            builder: Box::new(builder),
        }
    }

    /// Collection of bare series with no indexes attached.
    pub fn plain() -> Self {
        Self::new(|id, field| Ok(Series::new(format!("{}:{}", id, field))))
    }

    /// Names a ticker. Re-registering only updates the symbol.
    pub fn register(&mut self, id: i64, symbol: impl Into<String>) {
        let symbol = symbol.into();
        self.tickers
            .entry(id)
            .and_modify(|t| t.symbol.clone_from(&symbol))
            .or_insert_with(|| Ticker::new(id, symbol));
    }

    /// Appends `value` to the (id, field) series, creating it if needed.
    pub fn on_tick(
        &mut self,
        id: i64,
        field: TickField,
        value: Option<f64>,
    ) -> Result<&Series, TickdeskError> {
        let ticker = self
            .tickers
            .entry(id)
            .or_insert_with(|| Ticker::new(id, id.to_string()));

        let series = match ticker.series.entry(field) {
            std::collections::btree_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::btree_map::Entry::Vacant(e) => {
                let series = (self.builder)(id, field)?;
                tracing::debug!(ticker = id, %field, series = series.name(), "series created");
                e.insert(series)
            }
        };
        series.append(value);
        Ok(series)
    }

    /// Routes a recorded tick and stamps the ticker with its time.
    pub fn record(&mut self, tick: &Tick) -> Result<&Series, TickdeskError> {
        self.on_tick(tick.ticker_id, tick.field, tick.value)?;
        let ticker = self
            .tickers
            .get_mut(&tick.ticker_id)
            .ok_or_else(|| TickdeskError::UnknownStream {
                reference: format!("ticker {}", tick.ticker_id),
            })?;
        ticker.last_update = Some(tick.time);
        ticker
            .series
            .get(&tick.field)
            .ok_or_else(|| TickdeskError::UnknownStream {
                reference: format!("{}:{}", tick.ticker_id, tick.field),
            })
    }

    pub fn ticker(&self, id: i64) -> Option<&Ticker> {
        self.tickers.get(&id)
    }

    pub fn series(&self, id: i64, field: TickField) -> Option<&Series> {
        self.tickers.get(&id)?.series.get(&field)
    }

    /// Tickers ordered by id.
    pub fn tickers(&self) -> impl Iterator<Item = &Ticker> {
        self.tickers.values()
    }
}

impl fmt::Debug for TickerCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickerCollection")
            .field("tickers", &self.tickers)
            .finish()
    }
}
