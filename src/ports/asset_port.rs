//! Asset repository port: the boundary between market data and strategies.

use chrono::NaiveDateTime;

use crate::domain::error::TraderError;
use crate::domain::observation::Observation;
use crate::pipeline::Stream;

pub trait AssetRepository {
    /// Identifiers of every asset the repository can serve.
    fn list_assets(&self) -> Result<Vec<String>, TraderError>;

    /// Every observation of `name`, oldest first.
    fn get(&self, name: &str) -> Result<Stream<Observation>, TraderError>;

    /// Observations of `name` dated at or after `date`.
    fn get_since(&self, name: &str, date: NaiveDateTime)
    -> Result<Stream<Observation>, TraderError>;

    /// Timestamp of the most recent observation of `name`.
    fn last_date(&self, name: &str) -> Result<NaiveDateTime, TraderError>;

    fn append(&self, name: &str, observations: Stream<Observation>) -> Result<(), TraderError>;
}
