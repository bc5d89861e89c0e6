//! Engine-level behaviour of the series graph, the index family and the
//! strategy ledger, exercised through the public API.

mod common;

use approx::assert_relative_eq;
use common::*;
use proptest::prelude::*;
use std::cell::Cell;
use std::rc::Rc;
use tickdesk::domain::index::{Ema, Kama, Sma, Stochastic, WilliamsR};
use tickdesk::domain::registry::{IndexRegistry, ParamKind};
use tickdesk::domain::series::{Series, Sources, StreamId};
use tickdesk::domain::strategy::{Signal, Strategy, StrategyIndex};

mod series_graph {
    use super::*;

    #[test]
    fn sma_boundary_is_exact() {
        let mut series = Series::new("BHP:last");
        let sma = series.add_index("sma3", || Sma::new(3));
        for v in [1.0, 2.0, 3.0] {
            series.append(Some(v));
        }
        assert_eq!(stream_values(&series, sma), vec![None, None, Some(2.0)]);
    }

    #[test]
    fn registration_is_idempotent() {
        let calls = Rc::new(Cell::new(0));
        let mut series = Series::new("BHP:last");

        let make = |calls: Rc<Cell<usize>>| {
            move || {
                calls.set(calls.get() + 1);
                Sma::new(5)
            }
        };
        let first = series.add_index("K", make(calls.clone()));
        let second = series.add_index("K", make(calls.clone()));

        assert_eq!(first, second);
        assert_eq!(calls.get(), 1);
        assert_eq!(series.index_count(), 1);
    }

    #[test]
    fn same_key_on_different_sources_is_distinct() {
        let mut series = Series::new("BHP:last");
        let fast = series.add_index("avg", || Sma::new(2));
        let nested = series.add_index_to(fast, "avg", || Sma::new(2)).unwrap();
        assert_ne!(fast, nested);
        assert_eq!(series.find(fast, "avg"), Some(nested));
    }

    #[test]
    fn chained_indexes_see_fresh_values() {
        let mut series = Series::new("BHP:last");
        let fast = series.add_index("fast", || Sma::new(2));
        let smoothed = series.add_index_to(fast, "smoothed", || Sma::new(2)).unwrap();
        for v in [2.0, 4.0, 6.0] {
            series.append(Some(v));
        }
        // fast: [-, 3, 5] so smoothed: [-, -, 4]
        assert_eq!(stream_values(&series, smoothed), vec![None, None, Some(4.0)]);
    }

    #[test]
    fn unknown_source_is_rejected() {
        let mut other = Series::new("other");
        let foreign = other.add_index("a", || Sma::new(2));
        let mut series = Series::new("BHP:last");
        assert!(series.add_index_to(foreign, "b", || Sma::new(2)).is_err());
    }
}

mod null_safety {
    use super::*;

    #[test]
    fn ema_resumes_after_null() {
        let mut series = Series::new("s");
        let ema = series.add_index("ema", || Ema::new(3, 2.0));
        for v in [Some(1.0), Some(2.0), Some(3.0), None, Some(4.0), Some(5.0)] {
            series.append(v);
        }
        let out = stream_values(&series, ema);
        assert_eq!(&out[..3], &[None, None, Some(2.0)]);
        assert_eq!(out[3], None);
        // state kept across the gap: 2 + 0.5 * (4 - 2)
        assert_relative_eq!(out[4].unwrap(), 3.0);
        assert_relative_eq!(out[5].unwrap(), 4.0);
    }

    #[test]
    fn kama_resumes_after_null() {
        let mut series = Series::new("s");
        let kama = series.add_index("kama", || Kama::new(3, 2, 30));
        for v in [Some(1.0), Some(2.0), Some(3.0), Some(4.0), None, Some(5.0), Some(6.0)] {
            series.append(v);
        }
        let out = stream_values(&series, kama);
        assert_eq!(out.len(), 7);
        assert_eq!(out[4], None);
        assert!(out[5].is_some());
        assert!(out[6].is_some());
    }

    #[test]
    fn zero_range_oscillators_emit_zero() {
        let mut series = Series::new("flat");
        let k = series.add_index("k", || Stochastic::new(5));
        let r = series.add_index("r", || WilliamsR::new(5));
        for _ in 0..6 {
            series.append(Some(42.0));
        }
        assert_eq!(series.stream(k).unwrap().last(), Some(0.0));
        assert_eq!(series.stream(r).unwrap().last(), Some(0.0));
    }
}

mod strategy_ledger {
    use super::*;

    struct Script {
        signals: Vec<Signal>,
    }

    impl Strategy for Script {
        fn query(&mut self, sources: &Sources<'_>) -> Signal {
            self.signals
                .get(sources.position())
                .copied()
                .unwrap_or_default()
        }
    }

    fn scripted(prices: &[f64], signals: Vec<Signal>, shares: i64) -> (Series, StreamId) {
        let mut series = Series::new("BHP:last");
        let id = series.add_index("strategy", || {
            StrategyIndex::new(Script { signals }, shares)
        });
        for p in prices {
            series.append(Some(*p));
        }
        (series, id)
    }

    #[test]
    fn long_short_flat_round_trip() {
        let (series, id) = scripted(
            &[10.0, 11.0, 12.0],
            vec![Signal::Long, Signal::Short, Signal::NoDirection],
            100,
        );
        let strategy = series.index::<StrategyIndex<Script>>(id).unwrap();
        let positions: Vec<i64> = strategy.history().iter().map(|r| r.position).collect();
        let quantities: Vec<i64> = strategy.orders().map(|o| o.quantity).collect();

        assert_eq!(positions, vec![100, 0, 0]);
        assert_eq!(quantities, vec![100, -100, 0]);
        assert!(strategy.history()[1].reverse);
        assert_relative_eq!(strategy.realized_pnl(), 100.0);
    }

    #[test]
    fn summary_closes_open_position_once() {
        let (series, id) = scripted(
            &[10.0, 12.0, 15.0],
            vec![Signal::Long, Signal::Long, Signal::NoDirection],
            100,
        );
        let strategy = series.index::<StrategyIndex<Script>>(id).unwrap();
        assert_eq!(strategy.position(), 200);

        let ledger = strategy.summary();
        assert_eq!(ledger.len(), strategy.history().len() + 1);
        assert_eq!(strategy.history().len(), 3);

        let close = ledger.last().unwrap();
        assert_eq!(close.price, Some(15.0));
        assert_relative_eq!(close.cost, 3000.0);
        // bought 100 at 10 and 100 at 12, sold 200 at 15
        assert_relative_eq!(close.total, -1000.0 - 1200.0 + 3000.0);
        assert_eq!(strategy.summary(), ledger);
    }

    #[test]
    fn short_then_long_nets_correctly() {
        let (series, id) = scripted(
            &[20.0, 15.0],
            vec![Signal::Short, Signal::Long],
            10,
        );
        let strategy = series.index::<StrategyIndex<Script>>(id).unwrap();
        assert_eq!(strategy.position(), 0);
        assert_relative_eq!(strategy.realized_pnl(), 200.0 - 150.0);
    }
}

proptest! {
    #[test]
    fn append_grows_projections(values in prop::collection::vec(prop::option::of(-1e6f64..1e6), 0..64)) {
        let mut series = Series::new("prop");
        for value in values {
            let before = series.len();
            let before_y = series.samples().y().len();
            series.append(value);

            prop_assert_eq!(series.len(), before + 1);
            if value.is_some() {
                prop_assert_eq!(series.samples().y().len(), before_y + 1);
                prop_assert_eq!(series.samples().x().last().copied(), Some(series.len()));
            } else {
                prop_assert_eq!(series.samples().y().len(), before_y);
            }
        }
    }

    #[test]
    fn every_index_emits_one_value_per_tick(values in prop::collection::vec(prop::option::of(1.0f64..500.0), 0..48)) {
        let registry = IndexRegistry::builtin();
        let mut series = Series::new("prop");
        let mut ids = Vec::new();
        for entry in registry.entries() {
            let required: Vec<(&str, f64)> = entry
                .params
                .iter()
                .filter(|p| p.kind != ParamKind::Input && p.default.is_none())
                .map(|p| (p.name, 4.0))
                .collect();
            let inputs: Vec<StreamId> = entry.inputs().map(|_| StreamId::ROOT).collect();
            let id = series
                .add_boxed_index(StreamId::ROOT, entry.name, &inputs, || entry.build(&required))
                .unwrap();
            ids.push(id);
        }
        for value in &values {
            series.append(*value);
        }
        for id in ids {
            prop_assert_eq!(series.stream(id).unwrap().len(), values.len());
        }
    }
}
