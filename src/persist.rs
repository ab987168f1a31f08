//! History snapshots: portable JSON image of a session's history.
//!
//! # Layout
//!
//! ```text
//! {
//!   "version":     1,
//!   "created_at":  <unix seconds the session started>,
//!   "exported_at": <unix seconds of the export>,
//!   "windows":     [ { "name", "capacity", "values": [..] }, .. ],
//!   "records":     [ { "score", "label", "timestamp", "source" }, .. ],
//!   "config":      { ..SealConfig.. }
//! }
//! ```
//!
//! Windows keep registration order and values oldest first, so restoring
//! replays them into an identical tracker.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::SealConfig;
use crate::error::{SealError, SealResult};
use crate::history::{HistoryTracker, WindowSnapshot};
use crate::record::ScoreRecord;

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

/// Serializable image of a [`HistoryTracker`] plus the config it ran under.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    /// Format version, [`SNAPSHOT_VERSION`] for new snapshots.
    pub version: u16,
    /// Unix timestamp (seconds) when the originating session started.
    pub created_at: i64,
    /// Unix timestamp (seconds) of the export.
    pub exported_at: i64,
    /// Every window in registration order.
    pub windows: Vec<WindowSnapshot>,
    /// The record log, oldest first.
    pub records: Vec<ScoreRecord>,
    /// Config at export time.
    pub config: SealConfig,
}

impl HistorySnapshot {
    /// Capture `tracker` and `config`, stamped with the current time.
    pub fn from_tracker(tracker: &HistoryTracker, config: &SealConfig, created_at: i64) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            created_at,
            exported_at: chrono::Utc::now().timestamp(),
            windows: tracker.snapshot(),
            records: tracker.records().cloned().collect(),
            config: config.clone(),
        }
    }

    /// Total values held across all windows.
    pub fn value_count(&self) -> usize {
        self.windows.iter().map(|w| w.values.len()).sum()
    }

    /// Rebuild a tracker with the same windows, values and records.
    ///
    /// The record log capacity comes from `config.validation_history_max`.
    pub fn into_tracker(self) -> SealResult<HistoryTracker> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SealError::Persistence(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        let mut tracker = HistoryTracker::new(self.config.validation_history_max)?;
        for window in self.windows {
            tracker.add_window(&window.name, window.capacity)?;
            for v in window.values {
                tracker.record(&window.name, v)?;
            }
        }
        for record in self.records {
            tracker.push_record(record);
        }
        Ok(tracker)
    }

    /// Write as pretty JSON, creating parent directories.
    pub fn write_json(&self, path: &Path) -> SealResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| SealError::Persistence(format!("snapshot encode error: {e}")))?;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| {
                SealError::Persistence(format!("failed to create {}: {e}", dir.display()))
            })?;
        }
        fs::write(path, json).map_err(|e| {
            SealError::Persistence(format!("failed to write snapshot to {}: {e}", path.display()))
        })
    }

    /// Read a snapshot written by [`write_json`](Self::write_json).
    pub fn read_json(path: &Path) -> SealResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            SealError::Persistence(format!("failed to read snapshot at {}: {e}", path.display()))
        })?;
        serde_json::from_str(&text)
            .map_err(|e| SealError::Persistence(format!("snapshot parse error: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::WindowSpec;

    fn populated() -> HistoryTracker {
        let specs = WindowSpec::standard(3, 5, 10);
        let mut t = HistoryTracker::with_windows(&specs, 4).unwrap();
        for i in 1..=6 {
            let s = i as f64 / 10.0;
            t.record_all(s).unwrap();
            t.push_record(ScoreRecord::at(s, "L", format!("q{i}"), i));
        }
        t
    }

    #[test]
    fn test_snapshot_captures_everything() {
        let t = populated();
        let mut config = SealConfig::default();
        config.validation_history_max = 4;
        let snap = HistorySnapshot::from_tracker(&t, &config, 100);
        assert_eq!(snap.version, SNAPSHOT_VERSION);
        assert_eq!(snap.created_at, 100);
        assert_eq!(snap.windows.len(), 4);
        assert_eq!(snap.windows[0].name, "short_term");
        assert_eq!(snap.windows[0].values, vec![0.4, 0.5, 0.6]);
        assert_eq!(snap.records.len(), 4);
        assert_eq!(snap.value_count(), 3 + 5 + 6 + 6);
    }

    #[test]
    fn test_into_tracker_restores_windows_and_records() {
        let t = populated();
        let mut config = SealConfig::default();
        config.validation_history_max = 4;
        let snap = HistorySnapshot::from_tracker(&t, &config, 0);
        let restored = snap.clone().into_tracker().unwrap();
        assert_eq!(restored.snapshot(), t.snapshot());
        assert_eq!(restored.record_count(), 4);
        assert_eq!(restored.records().next().unwrap().source(), "q3");
        let names: Vec<&str> = restored.window_names().collect();
        assert_eq!(names, vec!["short_term", "medium_term", "long_term", "eternal_term"]);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history").join("snapshot.json");
        let snap = HistorySnapshot::from_tracker(&populated(), &SealConfig::default(), 7);
        snap.write_json(&path).unwrap();
        let back = HistorySnapshot::read_json(&path).unwrap();
        assert_eq!(back, snap);
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut snap = HistorySnapshot::from_tracker(&populated(), &SealConfig::default(), 0);
        snap.version = 99;
        assert!(matches!(snap.into_tracker(), Err(SealError::Persistence(_))));
    }

    #[test]
    fn test_corrupt_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            HistorySnapshot::read_json(&path),
            Err(SealError::Persistence(_))
        ));
    }
}
