//! Recorded tick source port trait.

use crate::domain::error::TickdeskError;
use crate::domain::ticker::Tick;

pub trait TickPort {
    /// All ticks, in recorded order.
    fn ticks(&self) -> Result<Vec<Tick>, TickdeskError>;
}
