//! Plain-text report rendering.
//!
//! Writes the replay report as fixed-width tables: per ticker the last value
//! of every stream, then the strategy's position and its ledger of fills.
//! Also renders the index and strategy registries for the `indexes` command.

use std::fmt::Write as _;
use std::io::Write;

use crate::domain::error::TickdeskError;
use crate::domain::registry::{IndexRegistry, ParamKind, ParamSpec};
use crate::domain::replay::{ReplayReport, StrategyOutcome, TickerReport};
use crate::domain::strategies::StrategyRegistry;
use crate::ports::report_port::ReportPort;

#[derive(Debug, Clone, Copy)]
pub struct TextReport {
    ledger: bool,
}

impl TextReport {
    pub fn new(ledger: bool) -> Self {
        Self { ledger }
    }

    pub fn render(&self, report: &ReplayReport) -> String {
        let mut out = format!(
            "Replayed {} tick(s) on field '{}'",
            report.ticks, report.field
        );
        if report.skipped > 0 {
            let _ = write!(out, ", {} skipped", report.skipped);
        }
        out.push('\n');

        if report.tickers.is_empty() {
            out.push_str("\nNo tickers.\n");
            return out;
        }
        for ticker in &report.tickers {
            out.push('\n');
            out.push_str(&format_ticker(ticker));
            if let Some(outcome) = &ticker.strategy {
                out.push_str(&format_strategy(outcome));
                if self.ledger {
                    out.push_str(&format_ledger(outcome));
                }
            }
        }
        out
    }
}

impl ReportPort for TextReport {
    fn write(&self, report: &ReplayReport, out: &mut dyn Write) -> Result<(), TickdeskError> {
        out.write_all(self.render(report).as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

fn format_value(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.4}", v))
}

fn format_price(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.2}", v))
}

pub fn format_ticker(ticker: &TickerReport) -> String {
    let mut out = format!("Ticker {} ({})", ticker.id, ticker.symbol);
    let _ = write!(out, "  samples: {}", ticker.samples);
    if let Some(time) = ticker.last_update {
        let _ = write!(out, "  last update: {}", time.format("%Y-%m-%d %H:%M:%S"));
    }
    out.push('\n');

    if ticker.streams.is_empty() {
        out.push_str("  no samples for the replayed field\n");
        return out;
    }

    let width = ticker
        .streams
        .iter()
        .map(|s| s.key.len())
        .max()
        .unwrap_or(0)
        .max("Stream".len());
    let _ = writeln!(out, "  {:<width$}  {:>14}", "Stream", "Last");
    for stream in &ticker.streams {
        let _ = writeln!(out, "  {:<width$}  {:>14}", stream.key, format_value(stream.value));
    }
    out
}

pub fn format_strategy(outcome: &StrategyOutcome) -> String {
    format!(
        "  Strategy {}: position {}, {} fill(s), realized P&L {:.2}\n",
        outcome.name, outcome.position, outcome.fills, outcome.realized_pnl
    )
}

/// Ledger rows that traded shares, numbered from 1.
pub fn format_ledger(outcome: &StrategyOutcome) -> String {
    let fills: Vec<_> = outcome.ledger.iter().filter(|e| e.quantity != 0).collect();
    if fills.is_empty() {
        return "  No fills.\n".to_string();
    }

    let mut out = format!(
        "  {:>4}  {:>12}  {:>14}  {:>14}\n",
        "#", "Price", "Cost", "Total"
    );
    for (i, entry) in fills.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>4}  {:>12}  {:>14.2}  {:>14.2}",
            i + 1,
            format_price(entry.price),
            entry.cost,
            entry.total
        );
    }
    out
}

fn format_param(spec: &ParamSpec) -> String {
    match (spec.kind, spec.default) {
        (ParamKind::Input, _) => format!("{} (stream)", spec.name),
        (_, Some(default)) => format!("{}={}", spec.name, default),
        (kind, None) => format!("{} ({}, required)", spec.name, kind),
    }
}

/// Index and strategy schemas, one line per entry.
pub fn format_registry(indexes: &IndexRegistry, strategies: &StrategyRegistry) -> String {
    let width = indexes
        .entries()
        .iter()
        .map(|e| e.name.len())
        .chain(strategies.entries().iter().map(|e| e.name.len()))
        .max()
        .unwrap_or(0);

    let mut out = String::from("Indexes:\n");
    for entry in indexes.entries() {
        let params: Vec<String> = entry.params.iter().map(format_param).collect();
        let _ = writeln!(
            out,
            "  {:<width$}  {}  [{}]",
            entry.name,
            entry.description,
            params.join(", ")
        );
    }

    out.push_str("\nStrategies:\n");
    for entry in strategies.entries() {
        let params: Vec<String> = entry.params.iter().map(format_param).collect();
        let _ = writeln!(
            out,
            "  {:<width$}  {}  [{}]",
            entry.name,
            entry.description,
            params.join(", ")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::replay::StreamValue;
    use crate::domain::strategy::LedgerEntry;
    use crate::domain::ticker::TickField;

    fn outcome() -> StrategyOutcome {
        StrategyOutcome {
            name: "Crossover".into(),
            position: 0,
            fills: 2,
            ledger: vec![
                LedgerEntry {
                    quantity: 0,
                    price: Some(10.0),
                    cost: 0.0,
                    total: 0.0,
                },
                LedgerEntry {
                    quantity: 10,
                    price: Some(11.5),
                    cost: -115.0,
                    total: -115.0,
                },
                LedgerEntry {
                    quantity: -10,
                    price: Some(7.0),
                    cost: 70.0,
                    total: -45.0,
                },
            ],
            realized_pnl: -45.0,
        }
    }

    fn report() -> ReplayReport {
        ReplayReport {
            field: TickField::Last,
            ticks: 7,
            skipped: 0,
            tickers: vec![TickerReport {
                id: 1,
                symbol: "BHP".into(),
                samples: 7,
                last_update: None,
                streams: vec![
                    StreamValue {
                        key: "raw".into(),
                        value: Some(4.0),
                    },
                    StreamValue {
                        key: "slow".into(),
                        value: None,
                    },
                ],
                strategy: Some(outcome()),
            }],
        }
    }

    #[test]
    fn ticker_table_lists_streams() {
        let text = format_ticker(&report().tickers[0]);
        assert!(text.starts_with("Ticker 1 (BHP)"));
        assert!(text.contains("raw"));
        assert!(text.contains("4.0000"));
        assert!(text.lines().any(|l| l.contains("slow") && l.trim_end().ends_with('-')));
    }

    #[test]
    fn ledger_shows_fills_only() {
        let text = format_ledger(&outcome());
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[1].contains("11.50"));
        assert!(rows[2].contains("-45.00"));
    }

    #[test]
    fn zero_priced_fill_is_still_listed() {
        let mut outcome = outcome();
        outcome.ledger.push(LedgerEntry {
            quantity: 10,
            price: Some(0.0),
            cost: 0.0,
            total: -45.0,
        });
        outcome.fills = 3;

        let text = format_ledger(&outcome);
        // header plus one row per fill
        assert_eq!(text.lines().count(), outcome.fills + 1);
        assert!(text.lines().last().unwrap().contains("0.00"));
    }

    #[test]
    fn ledger_can_be_left_out() {
        let with = TextReport::new(true).render(&report());
        let without = TextReport::new(false).render(&report());
        assert!(with.contains("Cost"));
        assert!(!without.contains("Cost"));
        assert!(without.contains("realized P&L -45.00"));
    }

    #[test]
    fn write_goes_through_the_port() {
        let mut buffer = Vec::new();
        TextReport::new(true).write(&report(), &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert!(text.starts_with("Replayed 7 tick(s) on field 'last'"));
    }

    #[test]
    fn registry_lists_every_entry() {
        let text = format_registry(IndexRegistry::builtin(), StrategyRegistry::builtin());
        let indexes = IndexRegistry::builtin().entries().len();
        let strategies = StrategyRegistry::builtin().entries().len();
        // two headers and a blank separator
        assert_eq!(text.lines().count(), indexes + strategies + 3);
        assert!(text.contains("periods=14"));
        assert!(text.contains("input (stream)"));
    }
}
