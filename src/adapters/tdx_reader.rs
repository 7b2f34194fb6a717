//! Reader for TDX binary bar files.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use tracing::{debug, error};

use crate::domain::bar::{Bar, BarFormat, RECORD_SIZE};
use crate::domain::error::TraderError;
use crate::pipeline::{Stream, bounded_source};

/// Opens `path` and streams its bars.
///
/// Open and stat failures are returned directly. The format tag is taken from
/// the file extension; an unrecognized one produces a sequence with no
/// elements that ends with [`TraderError::UnsupportedFormat`].
pub fn read_bars(path: &Path) -> Result<Stream<Bar>, TraderError> {
    let file = File::open(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "unable to open file");
        e
    })?;
    let len = file.metadata()?.len();
    let tag = path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    debug!(path = %path.display(), len, tag = %tag, "opened bar file");
    Ok(decode_bars(file, len, &tag, path.display().to_string()))
}

/// Decodes the `len` bytes of `reader` as fixed 32-byte records.
///
/// Yields `len / 32` bars in file order; a trailing partial record is
/// ignored. `reader` is released once the sequence ends or is dropped.
pub fn decode_bars<R>(reader: R, len: u64, tag: &str, label: impl Into<String>) -> Stream<Bar>
where
    R: Read + Send + 'static,
{
    let tag = tag.to_string();
    let count = len / RECORD_SIZE as u64;
    bounded_source("tdx-decode", label, BufReader::new(reader), move |reader, sink| {
        let format = BarFormat::from_extension(&tag)?;
        let mut record = [0u8; RECORD_SIZE];

        for index in 0..count {
            if sink.is_cancelled() {
                debug!(index, count, "decode cancelled");
                return Ok(());
            }
            reader
                .read_exact(&mut record)
                .map_err(|source| TraderError::ReadFailed { index, source })?;
            let bar = format.decode(index, &record)?;
            if !sink.send(bar) {
                return Ok(());
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn day_file(dates: &[u32], trailing: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (i, date) in dates.iter().enumerate() {
            let mut record = [0u8; RECORD_SIZE];
            record[0..4].copy_from_slice(&date.to_le_bytes());
            record[16..20].copy_from_slice(&(1000 + i as u32).to_le_bytes());
            bytes.extend_from_slice(&record);
        }
        bytes.extend(std::iter::repeat_n(0xAB, trailing));
        bytes
    }

    fn decode(bytes: Vec<u8>, tag: &str) -> Stream<Bar> {
        let len = bytes.len() as u64;
        decode_bars(Cursor::new(bytes), len, tag, "memory")
    }

    #[test]
    fn yields_one_bar_per_record_in_order() {
        let bars = decode(day_file(&[20240102, 20240103, 20240104], 0), ".day")
            .try_collect()
            .unwrap();
        assert_eq!(bars.len(), 3);
        let closes: Vec<f64> = bars.iter().map(Bar::close).collect();
        assert_eq!(closes, vec![10.0, 10.01, 10.02]);
    }

    #[test]
    fn trailing_partial_record_is_dropped() {
        let bars = decode(day_file(&[20240102, 20240103], 31), ".day")
            .try_collect()
            .unwrap();
        assert_eq!(bars.len(), 2);
    }

    #[test]
    fn unsupported_tag_yields_nothing() {
        let mut bars = decode(day_file(&[20240102], 0), ".txt");
        assert_eq!(bars.next(), None);
        match bars.finish() {
            Err(TraderError::UnsupportedFormat { extension }) => assert_eq!(extension, ".txt"),
            other => panic!("expected UnsupportedFormat, got {other:?}"),
        }
    }

    #[test]
    fn corrupt_record_keeps_earlier_bars() {
        let mut bars = decode(day_file(&[20240102, 0, 20240104], 0), ".day");
        assert_eq!(bars.by_ref().count(), 1);
        assert!(matches!(
            bars.take_error(),
            Some(TraderError::CorruptRecord { index: 1, .. })
        ));
    }

    #[test]
    fn short_read_is_read_failure() {
        // Claims two records but holds only one.
        let bytes = day_file(&[20240102], 0);
        let mut bars = decode_bars(Cursor::new(bytes), 64, ".day", "short");
        assert_eq!(bars.by_ref().count(), 1);
        match bars.take_error() {
            Some(err @ TraderError::ReadFailed { index: 1, .. }) => assert!(err.is_mid_stream()),
            other => panic!("expected ReadFailed at record 1, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_fails_synchronously() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_bars(&dir.path().join("absent.day")).err().unwrap();
        match err {
            TraderError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("expected Io, got {other:?}"),
        }
    }

    #[test]
    fn reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sh600000.day");
        std::fs::write(&path, day_file(&[20240102, 20240103], 5)).unwrap();

        let bars = read_bars(&path).unwrap().try_collect().unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(
            bars[1].timestamp().date(),
            chrono::NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()
        );
    }
}
