//! Snapshot storage
//!
//! Saves and loads market snapshot series as pretty-printed JSON, one file
//! per named series. Loaded series are checked for chronological order.

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::{validate_series, HedgeResult, MarketSnapshot};

/// Write a snapshot series to a JSON file
pub fn save_snapshots(path: impl AsRef<Path>, snapshots: &[MarketSnapshot]) -> HedgeResult<()> {
    let json = serde_json::to_string_pretty(snapshots)?;
    fs::write(path.as_ref(), json)?;
    tracing::info!("Saved {} snapshots to {:?}", snapshots.len(), path.as_ref());
    Ok(())
}

/// Read a snapshot series from a JSON file, rejecting out-of-order dates
pub fn load_snapshots(path: impl AsRef<Path>) -> HedgeResult<Vec<MarketSnapshot>> {
    let json = fs::read_to_string(path.as_ref())?;
    let snapshots: Vec<MarketSnapshot> = serde_json::from_str(&json)?;
    validate_series(&snapshots)?;
    tracing::info!("Loaded {} snapshots from {:?}", snapshots.len(), path.as_ref());
    Ok(snapshots)
}

/// Directory of named snapshot series
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Open a store, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> HedgeResult<Self> {
        let dir = dir.into();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { dir })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}_snapshots.json", name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    pub fn save(&self, name: &str, snapshots: &[MarketSnapshot]) -> HedgeResult<()> {
        save_snapshots(self.path(name), snapshots)
    }

    /// Load a series; `None` when nothing is stored under that name
    pub fn load(&self, name: &str) -> HedgeResult<Option<Vec<MarketSnapshot>>> {
        if !self.contains(name) {
            return Ok(None);
        }
        load_snapshots(self.path(name)).map(Some)
    }

    pub fn remove(&self, name: &str) -> HedgeResult<()> {
        let path = self.path(name);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Names of stored series, sorted
    pub fn list(&self) -> HedgeResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let file_name = entry?.file_name().to_string_lossy().to_string();
            if let Some(name) = file_name.strip_suffix("_snapshots.json") {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
