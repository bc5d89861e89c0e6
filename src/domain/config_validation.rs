//! Configuration validation.
//!
//! Checks the `[replay]` section and the series plan before any tick is read.

use crate::domain::error::TickdeskError;
use crate::domain::plan::SeriesPlan;
use crate::domain::ticker::TickField;
use crate::ports::config_port::ConfigPort;

const REPLAY: &str = "replay";

/// Validated `[replay]` settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaySettings {
    /// Field whose series the plan is applied to.
    pub field: TickField,
    /// Ticker ids with their symbols, in configured order.
    pub tickers: Vec<(i64, String)>,
    /// Whether the strategy ledger is reported.
    pub ledger: bool,
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(ReplaySettings, SeriesPlan), TickdeskError> {
    let settings = validate_replay_config(config)?;
    let plan = SeriesPlan::from_config(config)?;
    Ok((settings, plan))
}

pub fn validate_replay_config(config: &dyn ConfigPort) -> Result<ReplaySettings, TickdeskError> {
    Ok(ReplaySettings {
        field: validate_field(config)?,
        tickers: validate_tickers(config)?,
        ledger: config.get_bool(REPLAY, "ledger", true),
    })
}

fn validate_field(config: &dyn ConfigPort) -> Result<TickField, TickdeskError> {
    match config.get_string(REPLAY, "field") {
        None => Ok(TickField::Last),
        Some(raw) => raw.parse().map_err(|reason| TickdeskError::ConfigInvalid {
            section: REPLAY.to_string(),
            key: "field".to_string(),
            reason,
        }),
    }
}

fn validate_tickers(config: &dyn ConfigPort) -> Result<Vec<(i64, String)>, TickdeskError> {
    let Some(raw) = config.get_string(REPLAY, "tickers") else {
        return Ok(Vec::new());
    };

    let invalid = |reason: String| TickdeskError::ConfigInvalid {
        section: REPLAY.to_string(),
        key: "tickers".to_string(),
        reason,
    };

    let mut tickers: Vec<(i64, String)> = Vec::new();
    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (id, symbol) = item
            .split_once(':')
            .ok_or_else(|| invalid(format!("'{}' is not id:symbol", item)))?;
        let id: i64 = id
            .trim()
            .parse()
            .map_err(|_| invalid(format!("'{}' is not a ticker id", id.trim())))?;
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return Err(invalid(format!("ticker {} has an empty symbol", id)));
        }
        if tickers.iter().any(|(known, _)| *known == id) {
            return Err(invalid(format!("ticker {} listed twice", id)));
        }
        tickers.push((id, symbol.to_string()));
    }
    Ok(tickers)
}
