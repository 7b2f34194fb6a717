//! File-backed asset repository over a directory of TDX bar files.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use tracing::debug;

use crate::adapters::tdx_reader::read_bars;
use crate::domain::error::TraderError;
use crate::domain::observation::Observation;
use crate::pipeline::Stream;
use crate::ports::asset_port::AssetRepository;

/// Serves `<base>/<name><extension>` files, one asset per file.
#[derive(Debug, Clone)]
pub struct TdxFileRepository {
    base_path: PathBuf,
    extension: String,
}

impl TdxFileRepository {
    /// `extension` may be given with or without its leading dot.
    pub fn new(base_path: impl Into<PathBuf>, extension: &str) -> Self {
        let extension = format!(".{}", extension.trim_start_matches('.'));
        Self {
            base_path: base_path.into(),
            extension,
        }
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    fn asset_path(&self, name: &str) -> PathBuf {
        self.base_path.join(format!("{}{}", name, self.extension))
    }
}

impl AssetRepository for TdxFileRepository {
    fn list_assets(&self) -> Result<Vec<String>, TraderError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut assets = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(asset) = name.strip_suffix(self.extension.as_str()) {
                if !asset.is_empty() {
                    assets.push(asset.to_string());
                }
            }
        }

        assets.sort();
        Ok(assets)
    }

    fn get(&self, name: &str) -> Result<Stream<Observation>, TraderError> {
        let path = self.asset_path(name);
        let bars = read_bars(&path).map_err(|e| match e {
            TraderError::Io(io) if io.kind() == ErrorKind::NotFound => TraderError::NotFound {
                name: name.to_string(),
            },
            other => other,
        })?;
        Ok(bars.map(Observation::from))
    }

    fn get_since(
        &self,
        name: &str,
        date: NaiveDateTime,
    ) -> Result<Stream<Observation>, TraderError> {
        Ok(self.get(name)?.filter(move |obs| obs.date >= date))
    }

    fn last_date(&self, name: &str) -> Result<NaiveDateTime, TraderError> {
        match self.get(name)?.last_value()? {
            Some(obs) => Ok(obs.date),
            None => Err(TraderError::EmptyAsset {
                name: name.to_string(),
            }),
        }
    }

    fn append(&self, name: &str, observations: Stream<Observation>) -> Result<(), TraderError> {
        debug!(asset = name, "append refused on read-only bar files");
        drop(observations);
        Err(TraderError::UnsupportedOperation {
            operation: format!("append to {name}"),
        })
    }
}
