//! Fixed-width TDX price bar records.
//!
//! Every record is 32 little-endian bytes. The field layout depends on the
//! file the record came from, identified by its extension:
//!
//! | tag    | date        | time        | prices          | amount | volume |
//! |--------|-------------|-------------|-----------------|--------|--------|
//! | `.day` | u32 yyyymmdd| (15:00)     | u32 x 0.01      | f32    | u32    |
//! | `.5`   | u16 packed  | u16 minutes | u32 x 0.01      | f32    | u32    |
//! | `.lc5` | u16 packed  | u16 minutes | f32             | f32    | u32    |
//! | `.lc1` | u16 packed  | u16 minutes | f32             | f32    | u32    |
//!
//! The last four bytes of each record are reserved.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use super::error::TraderError;

pub const RECORD_SIZE: usize = 32;

/// Hour at which a daily bar closes.
const DAY_CLOSE_HOUR: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BarFormat {
    Day,
    FiveMinute,
    Lc5,
    Lc1,
}

impl BarFormat {
    pub const ALL: [BarFormat; 4] = [
        BarFormat::Day,
        BarFormat::FiveMinute,
        BarFormat::Lc5,
        BarFormat::Lc1,
    ];

    /// Resolves a file extension, with or without its leading dot.
    pub fn from_extension(extension: &str) -> Result<Self, TraderError> {
        match extension.trim_start_matches('.') {
            "day" => Ok(BarFormat::Day),
            "5" => Ok(BarFormat::FiveMinute),
            "lc5" => Ok(BarFormat::Lc5),
            "lc1" => Ok(BarFormat::Lc1),
            _ => Err(TraderError::UnsupportedFormat {
                extension: extension.to_string(),
            }),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            BarFormat::Day => ".day",
            BarFormat::FiveMinute => ".5",
            BarFormat::Lc5 => ".lc5",
            BarFormat::Lc1 => ".lc1",
        }
    }

    /// Width of the time bucket a bar of this format covers.
    pub fn bucket_minutes(self) -> u32 {
        match self {
            BarFormat::Day => 24 * 60,
            BarFormat::FiveMinute | BarFormat::Lc5 => 5,
            BarFormat::Lc1 => 1,
        }
    }

    /// Decodes record number `index` (used only for error reporting).
    pub fn decode(self, index: u64, record: &[u8; RECORD_SIZE]) -> Result<Bar, TraderError> {
        let corrupt = |reason: String| TraderError::CorruptRecord { index, reason };

        match self {
            BarFormat::Day => {
                let raw_date = u32_at(record, 0);
                let date = NaiveDate::from_ymd_opt(
                    (raw_date / 10_000) as i32,
                    raw_date / 100 % 100,
                    raw_date % 100,
                )
                .ok_or_else(|| corrupt(format!("invalid date {raw_date}")))?;
                let time = NaiveTime::from_hms_opt(DAY_CLOSE_HOUR, 0, 0)
                    .ok_or_else(|| corrupt("invalid close time".into()))?;
                Ok(Bar::Day(DayBar {
                    timestamp: date.and_time(time),
                    open: u32_at(record, 4),
                    high: u32_at(record, 8),
                    low: u32_at(record, 12),
                    close: u32_at(record, 16),
                    amount: f32_at(record, 20),
                    volume: u32_at(record, 24),
                }))
            }
            BarFormat::FiveMinute => {
                let timestamp = packed_timestamp(u16_at(record, 0), u16_at(record, 2))
                    .map_err(corrupt)?;
                Ok(Bar::FiveMinute(FiveMinuteBar {
                    timestamp,
                    open: u32_at(record, 4),
                    high: u32_at(record, 8),
                    low: u32_at(record, 12),
                    close: u32_at(record, 16),
                    amount: f32_at(record, 20),
                    volume: u32_at(record, 24),
                }))
            }
            BarFormat::Lc5 | BarFormat::Lc1 => {
                let timestamp = packed_timestamp(u16_at(record, 0), u16_at(record, 2))
                    .map_err(corrupt)?;
                Ok(Bar::Minute(MinuteBar {
                    timestamp,
                    bucket_minutes: self.bucket_minutes(),
                    open: f32_at(record, 4),
                    high: f32_at(record, 8),
                    low: f32_at(record, 12),
                    close: f32_at(record, 16),
                    amount: f32_at(record, 20),
                    volume: u32_at(record, 24),
                }))
            }
        }
    }
}

/// Daily bar; prices are stored in hundredths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayBar {
    pub timestamp: NaiveDateTime,
    pub open: u32,
    pub high: u32,
    pub low: u32,
    pub close: u32,
    pub amount: f32,
    pub volume: u32,
}

/// Five-minute bar from a `.5` file; prices are stored in hundredths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiveMinuteBar {
    pub timestamp: NaiveDateTime,
    pub open: u32,
    pub high: u32,
    pub low: u32,
    pub close: u32,
    pub amount: f32,
    pub volume: u32,
}

/// Minute-bucket bar from the `.lc1`/`.lc5` family; prices are floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinuteBar {
    pub timestamp: NaiveDateTime,
    pub bucket_minutes: u32,
    pub open: f32,
    pub high: f32,
    pub low: f32,
    pub close: f32,
    pub amount: f32,
    pub volume: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bar {
    Day(DayBar),
    FiveMinute(FiveMinuteBar),
    Minute(MinuteBar),
}

fn cents(value: u32) -> f64 {
    f64::from(value) / 100.0
}

impl Bar {
    pub fn timestamp(&self) -> NaiveDateTime {
        match self {
            Bar::Day(b) => b.timestamp,
            Bar::FiveMinute(b) => b.timestamp,
            Bar::Minute(b) => b.timestamp,
        }
    }

    pub fn open(&self) -> f64 {
        match self {
            Bar::Day(b) => cents(b.open),
            Bar::FiveMinute(b) => cents(b.open),
            Bar::Minute(b) => f64::from(b.open),
        }
    }

    pub fn high(&self) -> f64 {
        match self {
            Bar::Day(b) => cents(b.high),
            Bar::FiveMinute(b) => cents(b.high),
            Bar::Minute(b) => f64::from(b.high),
        }
    }

    pub fn low(&self) -> f64 {
        match self {
            Bar::Day(b) => cents(b.low),
            Bar::FiveMinute(b) => cents(b.low),
            Bar::Minute(b) => f64::from(b.low),
        }
    }

    pub fn close(&self) -> f64 {
        match self {
            Bar::Day(b) => cents(b.close),
            Bar::FiveMinute(b) => cents(b.close),
            Bar::Minute(b) => f64::from(b.close),
        }
    }

    pub fn volume(&self) -> f64 {
        match self {
            Bar::Day(b) => f64::from(b.volume),
            Bar::FiveMinute(b) => f64::from(b.volume),
            Bar::Minute(b) => f64::from(b.volume),
        }
    }

    /// Turnover for the bucket.
    pub fn amount(&self) -> f64 {
        match self {
            Bar::Day(b) => f64::from(b.amount),
            Bar::FiveMinute(b) => f64::from(b.amount),
            Bar::Minute(b) => f64::from(b.amount),
        }
    }
}

fn u16_at(record: &[u8; RECORD_SIZE], offset: usize) -> u16 {
    u16::from_le_bytes([record[offset], record[offset + 1]])
}

fn u32_at(record: &[u8; RECORD_SIZE], offset: usize) -> u32 {
    u32::from_le_bytes([
        record[offset],
        record[offset + 1],
        record[offset + 2],
        record[offset + 3],
    ])
}

fn f32_at(record: &[u8; RECORD_SIZE], offset: usize) -> f32 {
    f32::from_bits(u32_at(record, offset))
}

/// year = v / 2048 + 2004, month = (v % 2048) / 100, day = (v % 2048) % 100
fn packed_timestamp(date: u16, minutes: u16) -> Result<NaiveDateTime, String> {
    let date = u32::from(date);
    let year = (date / 2048 + 2004) as i32;
    let month = date % 2048 / 100;
    let day = date % 2048 % 100;
    let minutes = u32::from(minutes);

    let date = NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format!("invalid packed date {year}-{month}-{day}"))?;
    let time = NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0)
        .ok_or_else(|| format!("invalid minute of day {minutes}"))?;
    Ok(date.and_time(time))
}
