//! Signal-driven position bookkeeping.
//!
//! A [`StrategyIndex`] asks its [`Strategy`] for a signal once per tick,
//! turns it into a simulated order against a running position and records
//! the outcome. Its own output stream is the raw signal (-1, 0, 1), so other
//! indexes and plots can read it like any other stream.

use crate::domain::index::Index;
use crate::domain::series::Sources;

/// Direction requested by a strategy for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Signal {
    Short,
    #[default]
    NoDirection,
    Long,
}

impl Signal {
    /// -1, 0 or 1.
    pub fn sign(self) -> i64 {
        match self {
            Signal::Short => -1,
            Signal::NoDirection => 0,
            Signal::Long => 1,
        }
    }

    pub fn is_directional(self) -> bool {
        self != Signal::NoDirection
    }

    /// Signal that would flatten a position of the given sign.
    pub fn closing(position: i64) -> Self {
        match position.signum() {
            1 => Signal::Short,
            -1 => Signal::Long,
            _ => Signal::NoDirection,
        }
    }
}

/// Decides the signal for the tick just appended to the strategy's source.
pub trait Strategy {
    fn query(&mut self, sources: &Sources<'_>) -> Signal;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn query(&mut self, sources: &Sources<'_>) -> Signal {
        (**self).query(sources)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenClose {
    Open,
    Close,
}

/// Order the strategy would have placed. Never transmitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticOrder {
    pub quantity: i64,
    pub limit_price: Option<f64>,
    pub open_close: OpenClose,
    pub transmit: bool,
}

impl SyntheticOrder {
    fn new(quantity: i64, limit_price: Option<f64>, reverse: bool) -> Self {
        Self {
            quantity,
            limit_price,
            open_close: if reverse {
                OpenClose::Close
            } else {
                OpenClose::Open
            },
            transmit: false,
        }
    }

    /// Cash effect of the fill: buying spends, selling receives.
    pub fn cost(&self) -> f64 {
        match self.limit_price {
            Some(price) if self.quantity != 0 => -(self.quantity as f64 * price),
            _ => 0.0,
        }
    }
}

/// Latest (signal, reverse) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Indication {
    pub signal: Signal,
    pub reverse: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeRecord {
    /// Zero-based tick number.
    pub index: usize,
    pub price: Option<f64>,
    pub signal: Signal,
    pub reverse: bool,
    pub shares: i64,
    /// Position after the order.
    pub position: i64,
    pub order: SyntheticOrder,
}

/// One row of the realised profit and loss ledger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LedgerEntry {
    /// Signed shares traded; zero when the row records no fill.
    pub quantity: i64,
    pub price: Option<f64>,
    pub cost: f64,
    pub total: f64,
}

pub struct StrategyIndex<S> {
    strategy: S,
    trade_shares: i64,
    position: i64,
    indication: Indication,
    last_price: Option<f64>,
    history: Vec<TradeRecord>,
}

impl<S: Strategy> StrategyIndex<S> {
    pub fn new(strategy: S, trade_shares: i64) -> Self {
        Self {
            strategy,
            trade_shares,
            position: 0,
            indication: Indication::default(),
            last_price: None,
            history: Vec::new(),
        }
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn trade_shares(&self) -> i64 {
        self.trade_shares
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn indication(&self) -> Indication {
        self.indication
    }

    pub fn history(&self) -> &[TradeRecord] {
        &self.history
    }

    pub fn orders(&self) -> impl Iterator<Item = &SyntheticOrder> {
        self.history.iter().map(|r| &r.order)
    }

    /// Record that would flatten the open position at the last known price.
    pub fn closing_record(&self) -> Option<TradeRecord> {
        if self.position == 0 {
            return None;
        }
        let quantity = -self.position;
        Some(TradeRecord {
            index: self.history.last().map_or(0, |r| r.index),
            price: self.last_price,
            signal: Signal::closing(self.position),
            reverse: true,
            shares: self.trade_shares,
            position: 0,
            order: SyntheticOrder::new(quantity, self.last_price, true),
        })
    }

    /// Running cost ledger over every order, closing any open position first.
    ///
    /// Reading the summary does not change the recorded history.
    pub fn summary(&self) -> Vec<LedgerEntry> {
        let closing = self.closing_record();
        let mut total = 0.0;
        self.history
            .iter()
            .chain(closing.as_ref())
            .map(|record| {
                let cost = record.order.cost();
                total += cost;
                LedgerEntry {
                    quantity: record.order.quantity,
                    price: record.price,
                    cost,
                    total,
                }
            })
            .collect()
    }

    /// Final running total of [`summary`](Self::summary).
    pub fn realized_pnl(&self) -> f64 {
        self.summary().last().map_or(0.0, |e| e.total)
    }

    fn trade(&mut self, index: usize, price: Option<f64>, signal: Signal) {
        let reverse = self.position != 0
            && signal.is_directional()
            && signal.sign() != self.position.signum();

        let quantity = match price {
            None => 0,
            Some(_) if reverse => -self.position,
            Some(_) => self.trade_shares * signal.sign(),
        };
        self.position += quantity;

        self.indication = if signal.is_directional() {
            Indication { signal, reverse }
        } else {
            Indication::default()
        };

        let order = SyntheticOrder::new(quantity, price, reverse);
        if quantity != 0 {
            tracing::debug!(
                tick = index,
                quantity,
                price = ?price,
                open_close = ?order.open_close,
                position = self.position,
                "synthetic order"
            );
        }

        self.history.push(TradeRecord {
            index,
            price,
            signal,
            reverse,
            shares: self.trade_shares,
            position: self.position,
            order,
        });
    }
}

impl<S: Strategy + 'static> Index for StrategyIndex<S> {
    fn reindex(&mut self, sources: &Sources<'_>) -> Option<f64> {
        let signal = self.strategy.query(sources);
        let price = sources.source().last();
        if price.is_some() {
            self.last_price = price;
        }
        self.trade(sources.position(), price, signal);
        Some(signal.sign() as f64)
    }
}

impl<S> std::fmt::Debug for StrategyIndex<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyIndex")
            .field("trade_shares", &self.trade_shares)
            .field("position", &self.position)
            .field("indication", &self.indication)
            .field("records", &self.history.len())
            .finish()
    }
}
