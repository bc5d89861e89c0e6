//! Tick replay session.
//!
//! Feeds recorded ticks through a [`TickerCollection`] whose series for the
//! configured field carry the series plan, then collects what every ticker
//! ended with: the last value of each stream and, when a strategy is planned,
//! its position and realised ledger.

use chrono::NaiveDateTime;

use crate::domain::config_validation::ReplaySettings;
use crate::domain::error::TickdeskError;
use crate::domain::plan::{PlannedStrategy, STRATEGY_KEY, SeriesPlan};
use crate::domain::series::Series;
use crate::domain::strategy::LedgerEntry;
use crate::domain::ticker::{Tick, TickField, Ticker, TickerCollection};
use crate::ports::tick_port::TickPort;

/// Last value of one stream of a series.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamValue {
    pub key: String,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyOutcome {
    pub name: String,
    pub position: i64,
    /// Orders with a non-zero quantity.
    pub fills: usize,
    pub ledger: Vec<LedgerEntry>,
    pub realized_pnl: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickerReport {
    pub id: i64,
    pub symbol: String,
    pub samples: usize,
    pub last_update: Option<NaiveDateTime>,
    /// Raw stream first, then every index in attachment order.
    pub streams: Vec<StreamValue>,
    pub strategy: Option<StrategyOutcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayReport {
    pub field: TickField,
    pub ticks: usize,
    pub skipped: usize,
    pub tickers: Vec<TickerReport>,
}

#[derive(Debug)]
pub struct ReplaySession {
    field: TickField,
    strategy_name: Option<String>,
    only: Option<i64>,
    collection: TickerCollection,
    ticks: usize,
    skipped: usize,
}

impl ReplaySession {
    pub fn new(settings: &ReplaySettings, plan: SeriesPlan) -> Self {
        let field = settings.field;
        let strategy_name = plan.strategy().map(|s| s.name.clone());
        if strategy_name.is_some() && !field.is_price() {
            tracing::warn!(%field, "strategy fills will be priced from a non-price field");
        }
        let mut collection = TickerCollection::new(move |id, tick_field| {
            let mut series = Series::new(format!("{}:{}", id, tick_field));
            if tick_field == field {
                plan.apply(&mut series)?;
            }
            Ok(series)
        });
        for (id, symbol) in &settings.tickers {
            collection.register(*id, symbol.as_str());
        }

        Self {
            field,
            strategy_name,
            only: None,
            collection,
            ticks: 0,
            skipped: 0,
        }
    }

    /// Restricts the replay to one ticker; ticks for others are skipped.
    pub fn only(mut self, ticker_id: Option<i64>) -> Self {
        self.only = ticker_id;
        self
    }

    pub fn feed(&mut self, tick: &Tick) -> Result<(), TickdeskError> {
        if self.only.is_some_and(|id| id != tick.ticker_id) {
            self.skipped += 1;
            return Ok(());
        }
        let series = self.collection.record(tick)?;
        tracing::trace!(
            ticker = tick.ticker_id,
            field = %tick.field,
            value = ?tick.value,
            len = series.len(),
            "tick recorded"
        );
        self.ticks += 1;
        Ok(())
    }

    /// Feeds every tick the port yields, in order.
    pub fn replay(&mut self, port: &dyn TickPort) -> Result<(), TickdeskError> {
        for tick in port.ticks()? {
            self.feed(&tick)?;
        }
        tracing::info!(ticks = self.ticks, skipped = self.skipped, "replay finished");
        Ok(())
    }

    pub fn collection(&self) -> &TickerCollection {
        &self.collection
    }

    pub fn report(&self) -> ReplayReport {
        let tickers = self
            .collection
            .tickers()
            .filter(|t| self.only.is_none_or(|id| id == t.id))
            .map(|t| self.ticker_report(t))
            .collect();
        ReplayReport {
            field: self.field,
            ticks: self.ticks,
            skipped: self.skipped,
            tickers,
        }
    }

    fn ticker_report(&self, ticker: &Ticker) -> TickerReport {
        let series = ticker.series.get(&self.field);
        TickerReport {
            id: ticker.id,
            symbol: ticker.symbol.clone(),
            samples: series.map_or(0, Series::len),
            last_update: ticker.last_update,
            streams: series.map(stream_values).unwrap_or_default(),
            strategy: series.and_then(|s| self.strategy_outcome(s)),
        }
    }

    fn strategy_outcome(&self, series: &Series) -> Option<StrategyOutcome> {
        let name = self.strategy_name.as_ref()?;
        let (id, _) = series.indexes().find(|(_, key)| *key == STRATEGY_KEY)?;
        let strategy = series.index::<PlannedStrategy>(id)?;
        let ledger = strategy.summary();
        Some(StrategyOutcome {
            name: name.clone(),
            position: strategy.position(),
            fills: strategy.orders().filter(|o| o.quantity != 0).count(),
            realized_pnl: strategy.realized_pnl(),
            ledger,
        })
    }
}

fn stream_values(series: &Series) -> Vec<StreamValue> {
    let raw = StreamValue {
        key: "raw".into(),
        value: series.last(),
    };
    let indexes = series.indexes().map(|(id, key)| StreamValue {
        key: key.to_string(),
        value: series.stream(id).and_then(|s| s.last()),
    });
    std::iter::once(raw).chain(indexes).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::config_validation::validate_config;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    const CONFIG: &str = "\
[replay]
field = last
tickers = 1:BHP

[index.fast]
type = SMA
periods = 2

[index.slow]
type = SMA
periods = 3

[strategy]
name = Crossover
source = fast
input = slow
trade_shares = 10
";

    fn tick(second: u32, ticker_id: i64, field: TickField, value: Option<f64>) -> Tick {
        Tick {
            time: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(9, 30, second)
                .unwrap(),
            ticker_id,
            field,
            value,
        }
    }

    fn session() -> ReplaySession {
        let config = FileConfigAdapter::from_string(CONFIG).unwrap();
        let (settings, plan) = validate_config(&config).unwrap();
        ReplaySession::new(&settings, plan)
    }

    #[test]
    fn plan_applies_only_to_configured_field() {
        let mut session = session();
        session.feed(&tick(0, 1, TickField::Last, Some(10.0))).unwrap();
        session.feed(&tick(1, 1, TickField::Bid, Some(9.9))).unwrap();

        let collection = session.collection();
        assert_eq!(collection.series(1, TickField::Last).unwrap().index_count(), 3);
        assert_eq!(collection.series(1, TickField::Bid).unwrap().index_count(), 0);
    }

    #[test]
    fn report_collects_last_values_and_ledger() {
        let mut session = session();
        for (i, price) in [10.0, 10.0, 10.0, 13.0, 16.0, 10.0, 4.0].into_iter().enumerate() {
            session
                .feed(&tick(i as u32, 1, TickField::Last, Some(price)))
                .unwrap();
        }

        let report = session.report();
        assert_eq!(report.ticks, 7);
        assert_eq!(report.tickers.len(), 1);

        let ticker = &report.tickers[0];
        assert_eq!(ticker.symbol, "BHP");
        assert_eq!(ticker.samples, 7);
        let keys: Vec<&str> = ticker.streams.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["raw", "fast", "slow", "strategy"]);
        assert_eq!(ticker.streams[0].value, Some(4.0));
        assert_eq!(ticker.streams[1].value, Some(7.0));

        let outcome = ticker.strategy.as_ref().unwrap();
        assert_eq!(outcome.name, "Crossover");
        // fast crosses above slow at 11.5 (buy 10) and below it at 7 (close)
        assert_eq!(outcome.position, 0);
        assert_eq!(outcome.fills, 2);
        assert_relative_eq!(outcome.realized_pnl, -115.0 + 70.0);
    }

    #[test]
    fn only_filters_other_tickers() {
        let mut session = session().only(Some(2));
        session.feed(&tick(0, 1, TickField::Last, Some(1.0))).unwrap();
        session.feed(&tick(1, 2, TickField::Last, Some(2.0))).unwrap();

        let report = session.report();
        assert_eq!(report.ticks, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.tickers.len(), 1);
        assert_eq!(report.tickers[0].id, 2);
        assert_eq!(report.tickers[0].symbol, "2");
    }

    #[test]
    fn registered_ticker_without_ticks_is_reported_empty() {
        let report = session().report();
        assert_eq!(report.tickers.len(), 1);
        assert_eq!(report.tickers[0].samples, 0);
        assert!(report.tickers[0].streams.is_empty());
        assert!(report.tickers[0].strategy.is_none());
    }
}
