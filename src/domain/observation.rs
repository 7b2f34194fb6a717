//! Normalized per-bucket snapshot of an asset.

use chrono::NaiveDateTime;

use super::bar::Bar;

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub amount: f64,
}

impl From<Bar> for Observation {
    fn from(bar: Bar) -> Self {
        Observation {
            date: bar.timestamp(),
            open: bar.open(),
            high: bar.high(),
            low: bar.low(),
            close: bar.close(),
            volume: bar.volume(),
            amount: bar.amount(),
        }
    }
}
