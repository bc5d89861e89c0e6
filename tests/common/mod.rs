#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::io::Write;
use tickdesk::domain::error::TickdeskError;
use tickdesk::domain::series::{Series, StreamId};
use tickdesk::domain::ticker::{Tick, TickField};
use tickdesk::ports::tick_port::TickPort;

pub struct MockTickPort {
    pub ticks: Vec<Tick>,
    pub error: Option<String>,
}

impl MockTickPort {
    pub fn new(ticks: Vec<Tick>) -> Self {
        Self { ticks, error: None }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            ticks: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl TickPort for MockTickPort {
    fn ticks(&self) -> Result<Vec<Tick>, TickdeskError> {
        if let Some(reason) = &self.error {
            return Err(TickdeskError::TickParse {
                line: 1,
                reason: reason.clone(),
            });
        }
        Ok(self.ticks.clone())
    }
}

pub fn at(second: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
        + chrono::Duration::seconds(second as i64)
}

pub fn make_tick(second: u32, ticker_id: i64, field: TickField, value: Option<f64>) -> Tick {
    Tick {
        time: at(second),
        ticker_id,
        field,
        value,
    }
}

/// One `last` tick per price, one second apart.
pub fn last_ticks(ticker_id: i64, prices: &[Option<f64>]) -> Vec<Tick> {
    prices
        .iter()
        .enumerate()
        .map(|(i, price)| make_tick(i as u32, ticker_id, TickField::Last, *price))
        .collect()
}

pub fn series_of(values: &[Option<f64>]) -> Series {
    let mut series = Series::new("test");
    for value in values {
        series.append(*value);
    }
    series
}

pub fn stream_values(series: &Series, id: StreamId) -> Vec<Option<f64>> {
    series.stream(id).unwrap().values().to_vec()
}

/// Tick log in the CSV format read by `CsvTickAdapter`.
pub fn tick_csv(ticks: &[Tick]) -> String {
    let mut out = String::from("time,ticker_id,field,value\n");
    for tick in ticks {
        let value = tick.value.map(|v| v.to_string()).unwrap_or_default();
        out.push_str(&format!(
            "{},{},{},{}\n",
            tick.time.format("%Y-%m-%d %H:%M:%S"),
            tick.ticker_id,
            tick.field,
            value
        ));
    }
    out
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

pub const CROSSOVER_INI: &str = r#"
[replay]
field = last
tickers = 1:BHP, 2:CBA

[index.fast]
type = SMA
periods = 2

[index.slow]
type = SMA
periods = 3

[index.spread]
type = Difference
source = fast
input = slow

[strategy]
name = Crossover
source = fast
input = slow
trade_shares = 10
"#;
