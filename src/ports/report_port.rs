//! Replay report output port trait.

use std::io::Write;

use crate::domain::error::TickdeskError;
use crate::domain::replay::ReplayReport;

/// Port for writing a finished replay's report.
pub trait ReportPort {
    fn write(&self, report: &ReplayReport, out: &mut dyn Write) -> Result<(), TickdeskError>;
}
