#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use std::path::Path;
use tdxtrader::domain::bar::RECORD_SIZE;
use tdxtrader::domain::error::TraderError;
pub use tdxtrader::domain::observation::Observation;
use tdxtrader::pipeline::Stream;
use tdxtrader::ports::asset_port::AssetRepository;

/// In-memory repository keyed by asset name.
pub struct MemoryRepository {
    pub assets: BTreeMap<String, Vec<Observation>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self {
            assets: BTreeMap::new(),
        }
    }

    pub fn with_asset(mut self, name: &str, observations: Vec<Observation>) -> Self {
        self.assets.insert(name.to_string(), observations);
        self
    }

    fn lookup(&self, name: &str) -> Result<&Vec<Observation>, TraderError> {
        self.assets.get(name).ok_or_else(|| TraderError::NotFound {
            name: name.to_string(),
        })
    }
}

impl AssetRepository for MemoryRepository {
    fn list_assets(&self) -> Result<Vec<String>, TraderError> {
        Ok(self.assets.keys().cloned().collect())
    }

    fn get(&self, name: &str) -> Result<Stream<Observation>, TraderError> {
        Ok(Stream::from_vec(self.lookup(name)?.clone()))
    }

    fn get_since(
        &self,
        name: &str,
        date: NaiveDateTime,
    ) -> Result<Stream<Observation>, TraderError> {
        Ok(self.get(name)?.filter(move |obs| obs.date >= date))
    }

    fn last_date(&self, name: &str) -> Result<NaiveDateTime, TraderError> {
        self.lookup(name)?
            .last()
            .map(|obs| obs.date)
            .ok_or_else(|| TraderError::EmptyAsset {
                name: name.to_string(),
            })
    }

    fn append(&self, name: &str, _observations: Stream<Observation>) -> Result<(), TraderError> {
        Err(TraderError::UnsupportedOperation {
            operation: format!("append to {name}"),
        })
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at_close(y: i32, m: u32, d: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(15, 0, 0).unwrap()
}

pub fn make_observation(date: NaiveDateTime, close: f64) -> Observation {
    Observation {
        date,
        open: close,
        high: close,
        low: close,
        close,
        volume: 1000.0,
        amount: close * 1000.0,
    }
}

/// One observation per calendar day starting at `start`, closing at `closes`.
pub fn daily_observations(start: NaiveDate, closes: &[f64]) -> Vec<Observation> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let day = start + chrono::Duration::days(i as i64);
            make_observation(day.and_hms_opt(15, 0, 0).unwrap(), close)
        })
        .collect()
}

/// `.day` record; `close_cents` fills all four price fields.
pub fn day_record(date: NaiveDate, close_cents: u32) -> [u8; RECORD_SIZE] {
    use chrono::Datelike;
    let raw = date.year() as u32 * 10_000 + date.month() * 100 + date.day();
    let mut record = [0u8; RECORD_SIZE];
    record[0..4].copy_from_slice(&raw.to_le_bytes());
    for offset in [4, 8, 12, 16] {
        record[offset..offset + 4].copy_from_slice(&close_cents.to_le_bytes());
    }
    record[20..24].copy_from_slice(&(close_cents as f32 * 10.0).to_le_bytes());
    record[24..28].copy_from_slice(&1000u32.to_le_bytes());
    record
}

/// `.lc5`/`.lc1` record with the date packed as `(year - 2004) * 2048 + month * 100 + day`.
pub fn minute_record(date: NaiveDate, minutes: u16, close: f32) -> [u8; RECORD_SIZE] {
    use chrono::Datelike;
    let packed = (date.year() as u16 - 2004) * 2048 + date.month() as u16 * 100 + date.day() as u16;
    let mut record = [0u8; RECORD_SIZE];
    record[0..2].copy_from_slice(&packed.to_le_bytes());
    record[2..4].copy_from_slice(&minutes.to_le_bytes());
    for offset in [4, 8, 12, 16] {
        record[offset..offset + 4].copy_from_slice(&close.to_le_bytes());
    }
    record[24..28].copy_from_slice(&500u32.to_le_bytes());
    record
}

/// Writes consecutive daily records starting at `start` to `<dir>/<name>.day`.
pub fn write_day_file(dir: &Path, name: &str, start: NaiveDate, closes_cents: &[u32]) {
    let mut bytes = Vec::with_capacity(closes_cents.len() * RECORD_SIZE);
    for (i, &cents) in closes_cents.iter().enumerate() {
        let day = start + chrono::Duration::days(i as i64);
        bytes.extend_from_slice(&day_record(day, cents));
    }
    std::fs::write(dir.join(format!("{name}.day")), bytes).unwrap();
}
