//! CSV recorded tick log adapter.
//!
//! Columns: `time,ticker_id,field,value`. `time` is an ISO date-time
//! (`2024-03-01 09:30:00`, `T` separator and fractional seconds accepted),
//! `field` a tick field name or code, and an empty `value` is a null tick.

use crate::domain::error::TickdeskError;
use crate::domain::ticker::{Tick, TickField};
use crate::ports::tick_port::TickPort;
use chrono::NaiveDateTime;
use std::fs;
use std::path::PathBuf;

const TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

pub struct CsvTickAdapter {
    path: PathBuf,
}

impl CsvTickAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Parses a tick log already in memory.
    pub fn parse(content: &str) -> Result<Vec<Tick>, TickdeskError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut ticks = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| TickdeskError::TickParse {
                line: e.position().map_or(0, |p| p.line() as usize),
                reason: e.to_string(),
            })?;
            let line = record.position().map_or(0, |p| p.line() as usize);
            let parse_err = |reason: String| TickdeskError::TickParse { line, reason };
            let column = |i: usize, name: &str| {
                record
                    .get(i)
                    .ok_or_else(|| parse_err(format!("missing {} column", name)))
            };

            let time = parse_time(column(0, "time")?).ok_or_else(|| {
                parse_err(format!("invalid time '{}'", record.get(0).unwrap_or_default()))
            })?;
            let ticker_id: i64 = column(1, "ticker_id")?
                .parse()
                .map_err(|e| parse_err(format!("invalid ticker_id: {}", e)))?;
            let field: TickField = column(2, "field")?.parse().map_err(&parse_err)?;
            let value = match column(3, "value")? {
                "" => None,
                raw => Some(
                    raw.parse::<f64>()
                        .map_err(|e| parse_err(format!("invalid value: {}", e)))?,
                ),
            };

            ticks.push(Tick {
                time,
                ticker_id,
                field,
                value,
            });
        }
        Ok(ticks)
    }
}

fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

impl TickPort for CsvTickAdapter {
    fn ticks(&self) -> Result<Vec<Tick>, TickdeskError> {
        let content = fs::read_to_string(&self.path)?;
        let ticks = Self::parse(&content)?;
        tracing::debug!(path = %self.path.display(), ticks = ticks.len(), "tick log loaded");
        Ok(ticks)
    }
}
