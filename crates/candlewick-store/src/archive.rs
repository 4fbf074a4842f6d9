//! On-disk JSON archive of the candle store.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use candlewick_aggregate::Candle;
use candlewick_types::Timeframe;
use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::{ArchiveError, CandleSnapshot, CandleStore, SymbolSeries};

/// Result type for archive operations.
type Result<T> = std::result::Result<T, ArchiveError>;

/// Serialized form of one timeframe snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArchivedSnapshot {
    timeframe: Timeframe,
    version: u64,
    watermark: Option<DateTime<Utc>>,
    retained_from: Option<DateTime<Utc>>,
    #[serde(default)]
    retired: BTreeMap<String, u64>,
    candles: Vec<Candle>,
}

impl From<&CandleSnapshot> for ArchivedSnapshot {
    fn from(snapshot: &CandleSnapshot) -> Self {
        let mut symbols: Vec<&String> = snapshot.series.keys().collect();
        symbols.sort_unstable();
        let candles = symbols
            .into_iter()
            .flat_map(|symbol| snapshot.series[symbol].values().cloned())
            .collect();
        Self {
            timeframe: snapshot.timeframe,
            version: snapshot.version,
            watermark: snapshot.watermark,
            retained_from: snapshot.retained_from,
            retired: snapshot.retired.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            candles,
        }
    }
}

impl From<ArchivedSnapshot> for CandleSnapshot {
    fn from(archived: ArchivedSnapshot) -> Self {
        let mut series: HashMap<String, SymbolSeries> = HashMap::new();
        for candle in archived.candles {
            series
                .entry(candle.symbol.clone())
                .or_default()
                .insert(candle.bucket_start, candle);
        }
        Self {
            timeframe: archived.timeframe,
            version: archived.version,
            watermark: archived.watermark,
            retained_from: archived.retained_from,
            series: series.into_iter().map(|(k, v)| (k, Arc::new(v))).collect(),
            retired: archived.retired.into_iter().collect(),
        }
    }
}

/// Saves and loads candle snapshots as `candles/<timeframe>.json`.
///
/// Writes go to a temporary file that is renamed over the target, so a
/// crash mid-write leaves the previous archive intact.
#[derive(Debug, Clone)]
pub struct CandleArchive {
    /// Base directory for state storage.
    base_path: PathBuf,
    /// Directory for candle JSON files.
    candles_path: PathBuf,
}

impl CandleArchive {
    /// Creates an archive rooted at `base_path`.
    ///
    /// Creates the necessary subdirectories if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn new(base_path: PathBuf) -> Result<Self> {
        let candles_path = base_path.join("candles");
        for path in [&base_path, &candles_path] {
            if !path.exists() {
                fs::create_dir_all(path).map_err(|e| ArchiveError::CreateDir {
                    path: path.clone(),
                    source: e,
                })?;
            }
        }
        Ok(Self {
            base_path,
            candles_path,
        })
    }

    /// Returns the default path for candlewick state storage.
    ///
    /// Uses the `directories` crate to find the platform data directory:
    /// - Linux: `~/.local/share/candlewick/`
    /// - macOS: `~/Library/Application Support/candlewick/`
    /// - Windows: `C:\Users\<User>\AppData\Roaming\candlewick\`
    ///
    /// Falls back to `~/.candlewick/` if the platform-specific location
    /// cannot be determined.
    #[must_use]
    pub fn default_path() -> PathBuf {
        ProjectDirs::from("", "", "candlewick").map_or_else(dirs_fallback, |proj_dirs| {
            proj_dirs.data_dir().to_path_buf()
        })
    }

    /// Creates an archive at the default path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories cannot be created.
    pub fn with_default_path() -> Result<Self> {
        Self::new(Self::default_path())
    }

    /// Returns the base path for state storage.
    #[must_use]
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Returns the path of a timeframe's archive file.
    #[must_use]
    pub fn timeframe_path(&self, timeframe: Timeframe) -> PathBuf {
        self.candles_path.join(format!("{timeframe}.json"))
    }

    /// Writes one snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be serialized or written.
    pub fn save_snapshot(&self, snapshot: &CandleSnapshot) -> Result<()> {
        let path = self.timeframe_path(snapshot.timeframe());
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&ArchivedSnapshot::from(snapshot))?;

        fs::write(&tmp, json).map_err(|e| ArchiveError::WriteFile {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, &path).map_err(|e| ArchiveError::WriteFile { path, source: e })
    }

    /// Writes every timeframe that has seen at least one commit.
    ///
    /// Returns the number of timeframes written.
    ///
    /// # Errors
    ///
    /// Returns an error if any snapshot cannot be written.
    pub fn save(&self, store: &CandleStore) -> Result<usize> {
        let mut written = 0;
        for timeframe in Timeframe::all() {
            let snapshot = store.snapshot(*timeframe);
            if snapshot.version() == 0 {
                continue;
            }
            self.save_snapshot(&snapshot)?;
            written += 1;
        }
        tracing::info!(path = %self.candles_path.display(), timeframes = written, "saved candle archive");
        Ok(written)
    }

    /// Reads one timeframe's snapshot, if it was ever saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_snapshot(&self, timeframe: Timeframe) -> Result<Option<CandleSnapshot>> {
        let path = self.timeframe_path(timeframe);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).map_err(|e| ArchiveError::ReadFile {
            path: path.clone(),
            source: e,
        })?;
        let archived: ArchivedSnapshot = serde_json::from_str(&content)
            .map_err(|e| ArchiveError::ParseJson { path, source: e })?;
        Ok(Some(archived.into()))
    }

    /// Restores every saved timeframe into `store`.
    ///
    /// Returns the number of timeframes restored.
    ///
    /// # Errors
    ///
    /// Returns an error if an archive file is unreadable or inconsistent.
    pub fn load(&self, store: &CandleStore) -> Result<usize> {
        let mut restored = 0;
        for timeframe in Timeframe::all() {
            if let Some(snapshot) = self.load_snapshot(*timeframe)? {
                store.restore(snapshot)?;
                restored += 1;
            }
        }
        tracing::debug!(path = %self.candles_path.display(), timeframes = restored, "loaded candle archive");
        Ok(restored)
    }
}

/// Fallback for determining home directory.
fn dirs_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
        .join(".candlewick")
}

#[cfg(test)]
mod tests {
    use super::*;
    use candlewick_aggregate::CandleState;
    use chrono::{TimeDelta, TimeZone};
    use tempfile::TempDir;

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + TimeDelta::minutes(minute)
    }

    fn candle(symbol: &str, minute: i64) -> Candle {
        Candle {
            bucket_start: at(minute * 5),
            symbol: symbol.to_string(),
            timeframe: Timeframe::Minute5,
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
            volume: 3.0,
            vwap: None,
            tick_count: 2,
            state: CandleState::Materialized,
        }
    }

    #[test]
    fn test_archive_creation() {
        let temp_dir = TempDir::new().unwrap();
        let archive = CandleArchive::new(temp_dir.path().to_path_buf()).unwrap();
        assert!(archive.base_path().exists());
        assert!(temp_dir.path().join("candles").exists());
        assert!(
            archive
                .timeframe_path(Timeframe::Hour4)
                .to_string_lossy()
                .ends_with("4h.json")
        );
    }

    #[test]
    fn test_save_and_load_store() {
        let temp_dir = TempDir::new().unwrap();
        let archive = CandleArchive::new(temp_dir.path().to_path_buf()).unwrap();

        let store = CandleStore::new();
        store
            .commit(
                Timeframe::Minute5,
                (0..4).map(|m| candle("BTC", m)).chain([candle("ETH", 0)]),
                at(20),
            )
            .unwrap();
        store.retire_before(Timeframe::Minute5, at(5)).unwrap();
        assert_eq!(archive.save(&store).unwrap(), 1);
        assert!(!archive.timeframe_path(Timeframe::Minute1).exists());

        let restored = CandleStore::new();
        assert_eq!(archive.load(&restored).unwrap(), 1);
        let original = store.snapshot(Timeframe::Minute5);
        let loaded = restored.snapshot(Timeframe::Minute5);
        assert_eq!(loaded.len(), original.len());
        assert_eq!(loaded.version(), original.version());
        assert_eq!(loaded.watermark(), Some(at(20)));
        assert_eq!(loaded.retained_from(), Some(at(5)));
        assert_eq!(loaded.retired("BTC"), 1);
        assert_eq!(loaded.retired("ETH"), 1);
        assert_eq!(loaded.series("BTC"), original.series("BTC"));
    }

    #[test]
    fn test_load_missing_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let archive = CandleArchive::new(temp_dir.path().to_path_buf()).unwrap();
        assert!(archive.load_snapshot(Timeframe::Day1).unwrap().is_none());
        assert_eq!(archive.load(&CandleStore::new()).unwrap(), 0);
    }

    #[test]
    fn test_corrupt_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let archive = CandleArchive::new(temp_dir.path().to_path_buf()).unwrap();
        fs::write(archive.timeframe_path(Timeframe::Hour1), "not json").unwrap();
        assert!(matches!(
            archive.load_snapshot(Timeframe::Hour1),
            Err(ArchiveError::ParseJson { .. })
        ));
    }
}
