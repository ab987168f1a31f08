//! Bounded score history: named FIFO windows plus a capped record log.
//!
//! Each window keeps the most recent scores up to its capacity; the oldest
//! entry is evicted first. Windows exist only once registered, so a typo in a
//! window name fails loudly instead of creating a fresh, empty window.
//!
//! Default windows:
//!
//! | Name | Capacity |
//! |---|---|
//! | `short_term` | 10 |
//! | `medium_term` | 100 |
//! | `long_term` | 1000 |
//! | `eternal_term` | unbounded |
//!
//! # Invariants
//! - `len() ≤ capacity` for every bounded window, after every append.
//! - Contents are always the last `capacity` appended values, in order.
//! - `average()` of an empty window is `None`, never NaN.

use std::collections::VecDeque;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::error::{SealError, SealResult};
use crate::record::ScoreRecord;

/// Default capacity of the record log.
pub const DEFAULT_RECORD_CAPACITY: usize = 1000;

// ─── RingWindow ─────────────────────────────────────────────────────────────

/// Fixed-capacity FIFO buffer of scores. `capacity == None` means unbounded.
#[derive(Clone, Debug, PartialEq)]
pub struct RingWindow {
    capacity: Option<usize>,
    values: VecDeque<f64>,
}

impl RingWindow {
    /// Bounded window holding at most `capacity` values.
    ///
    /// Capacity 0 is rejected: a window that can never hold data is a config error.
    pub fn bounded(capacity: usize) -> SealResult<Self> {
        if capacity == 0 {
            return Err(SealError::invalid("window_capacity", "must be >= 1, got 0"));
        }
        Ok(Self {
            capacity: Some(capacity),
            values: VecDeque::with_capacity(capacity.min(1024)),
        })
    }

    /// Window that never evicts.
    pub fn unbounded() -> Self {
        Self {
            capacity: None,
            values: VecDeque::new(),
        }
    }

    /// Append `score`, evicting the oldest value once capacity is exceeded.
    pub fn push(&mut self, score: f64) {
        self.values.push_back(score);
        if let Some(cap) = self.capacity {
            while self.values.len() > cap {
                self.values.pop_front();
            }
        }
    }

    /// Configured capacity (`None` = unbounded).
    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Number of values currently held.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// `true` when the window holds no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    /// Arithmetic mean, or `None` when empty.
    pub fn average(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Count, mean, and population standard deviation.
    ///
    /// `std_dev` is `None` when empty and `Some(0.0)` for a single value.
    pub fn stats(&self) -> WindowStats {
        let count = self.values.len();
        let average = self.average();
        let std_dev = average.map(|mean| {
            if count < 2 {
                0.0
            } else {
                let var = self.values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
                    / count as f64;
                var.sqrt()
            }
        });
        WindowStats {
            count,
            average,
            std_dev,
        }
    }
}

/// Summary of one window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    /// Values currently held.
    pub count: usize,
    /// Mean, `None` when empty.
    pub average: Option<f64>,
    /// Population standard deviation, `None` when empty.
    pub std_dev: Option<f64>,
}

/// Name and capacity of a window to register.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowSpec {
    /// Window name.
    pub name: String,
    /// Capacity (`None` = unbounded).
    pub capacity: Option<usize>,
}

impl WindowSpec {
    /// Definition of a window called `name`.
    pub fn new(name: impl Into<String>, capacity: Option<usize>) -> Self {
        Self {
            name: name.into(),
            capacity,
        }
    }

    /// The four standard windows with the given bounded capacities.
    pub fn standard(short: usize, medium: usize, long: usize) -> Vec<Self> {
        vec![
            Self::new("short_term", Some(short)),
            Self::new("medium_term", Some(medium)),
            Self::new("long_term", Some(long)),
            Self::new("eternal_term", None),
        ]
    }
}

/// Read-only copy of one window for export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WindowSnapshot {
    /// Window name.
    pub name: String,
    /// Capacity (`None` = unbounded).
    pub capacity: Option<usize>,
    /// Values oldest-first.
    pub values: Vec<f64>,
}

// ─── HistoryTracker ─────────────────────────────────────────────────────────

/// Named score windows plus a capped log of [`ScoreRecord`]s.
pub struct HistoryTracker {
    windows: HashMap<String, RingWindow>,
    /// Registration order, for stable iteration and export.
    order: Vec<String>,
    records: VecDeque<ScoreRecord>,
    record_capacity: usize,
}

impl HistoryTracker {
    /// Empty tracker with no windows.
    pub fn new(record_capacity: usize) -> SealResult<Self> {
        if record_capacity == 0 {
            return Err(SealError::invalid(
                "validation_history_max",
                "must be >= 1, got 0",
            ));
        }
        Ok(Self {
            windows: HashMap::new(),
            order: Vec::new(),
            records: VecDeque::new(),
            record_capacity,
        })
    }

    /// Tracker pre-populated with `specs`.
    pub fn with_windows(specs: &[WindowSpec], record_capacity: usize) -> SealResult<Self> {
        let mut tracker = Self::new(record_capacity)?;
        for spec in specs {
            tracker.add_window(&spec.name, spec.capacity)?;
        }
        Ok(tracker)
    }

    /// Register a window. Duplicate names are rejected.
    pub fn add_window(&mut self, name: &str, capacity: Option<usize>) -> SealResult<()> {
        if self.windows.contains_key(name) {
            return Err(SealError::invalid(
                "window",
                format!("window {name:?} already registered"),
            ));
        }
        let window = match capacity {
            Some(cap) => RingWindow::bounded(cap)?,
            None => RingWindow::unbounded(),
        };
        self.windows.insert(name.to_string(), window);
        self.order.push(name.to_string());
        Ok(())
    }

    /// Append `score` to the window called `name`.
    ///
    /// Unknown names fail with `NotFound`; non-finite scores with
    /// `InvalidParameter`. Neither mutates anything.
    pub fn record(&mut self, name: &str, score: f64) -> SealResult<()> {
        check_finite(score)?;
        let window = self
            .windows
            .get_mut(name)
            .ok_or_else(|| SealError::not_found("window", name))?;
        window.push(score);
        Ok(())
    }

    /// Append `score` to every registered window.
    pub fn record_all(&mut self, score: f64) -> SealResult<()> {
        check_finite(score)?;
        for window in self.windows.values_mut() {
            window.push(score);
        }
        Ok(())
    }

    /// Append a record to the log, evicting the oldest beyond capacity.
    pub fn push_record(&mut self, record: ScoreRecord) {
        self.records.push_back(record);
        while self.records.len() > self.record_capacity {
            self.records.pop_front();
        }
    }

    /// Mean of the window called `name`; `Ok(None)` when it is empty.
    pub fn average(&self, name: &str) -> SealResult<Option<f64>> {
        Ok(self.window(name)?.average())
    }

    /// Summary statistics of the window called `name`.
    pub fn window_stats(&self, name: &str) -> SealResult<WindowStats> {
        Ok(self.window(name)?.stats())
    }

    /// Borrow the window called `name`.
    pub fn window(&self, name: &str) -> SealResult<&RingWindow> {
        self.windows
            .get(name)
            .ok_or_else(|| SealError::not_found("window", name))
    }

    /// Window names in registration order.
    pub fn window_names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Logged records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &ScoreRecord> {
        self.records.iter()
    }

    /// Number of logged records.
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Capacity of the record log.
    pub fn record_capacity(&self) -> usize {
        self.record_capacity
    }

    /// Copies of every window, in registration order.
    pub fn snapshot(&self) -> Vec<WindowSnapshot> {
        self.order
            .iter()
            .filter_map(|name| {
                self.windows.get(name).map(|w| WindowSnapshot {
                    name: name.clone(),
                    capacity: w.capacity(),
                    values: w.iter().collect(),
                })
            })
            .collect()
    }
}

impl core::fmt::Debug for HistoryTracker {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HistoryTracker")
            .field("windows", &self.order)
            .field("record_count", &self.records.len())
            .field("record_capacity", &self.record_capacity)
            .finish()
    }
}

fn check_finite(score: f64) -> SealResult<()> {
    if score.is_finite() {
        Ok(())
    } else {
        Err(SealError::invalid("score", format!("must be finite, got {score}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standard() -> HistoryTracker {
        HistoryTracker::with_windows(
            &WindowSpec::standard(10, 100, 1000),
            DEFAULT_RECORD_CAPACITY,
        )
        .unwrap()
    }

    #[test]
    fn test_capacity_ten_evicts_oldest() {
        let mut h = standard();
        let fed: Vec<f64> = (1..=11).map(|i| i as f64 / 10.0).collect();
        for &s in &fed {
            h.record("short_term", s).unwrap();
        }
        let kept: Vec<f64> = h.window("short_term").unwrap().iter().collect();
        assert_eq!(kept.len(), 10);
        assert_eq!(kept, fed[1..].to_vec());
        assert!(!kept.contains(&0.1));
    }

    #[test]
    fn test_overflow_by_k_keeps_last_c() {
        let mut w = RingWindow::bounded(5).unwrap();
        for i in 0..(5 + 7) {
            w.push(i as f64);
        }
        assert_eq!(w.len(), 5);
        assert_eq!(w.iter().collect::<Vec<_>>(), vec![7.0, 8.0, 9.0, 10.0, 11.0]);
    }

    #[test]
    fn test_unbounded_never_evicts() {
        let mut w = RingWindow::unbounded();
        for i in 0..5000 {
            w.push(i as f64);
        }
        assert_eq!(w.len(), 5000);
        assert_eq!(w.capacity(), None);
    }

    #[test]
    fn test_empty_average_is_none() {
        let h = standard();
        for name in ["short_term", "medium_term", "long_term", "eternal_term"] {
            assert_eq!(h.average(name).unwrap(), None);
        }
    }

    #[test]
    fn test_average() {
        let mut h = standard();
        for s in [0.2, 0.4, 0.9] {
            h.record("medium_term", s).unwrap();
        }
        let avg = h.average("medium_term").unwrap().unwrap();
        assert!((avg - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_window_is_not_found() {
        let mut h = standard();
        let err = h.record("yearly", 0.5).unwrap_err();
        assert!(matches!(err, SealError::NotFound { kind: "window", .. }));
        assert!(h.average("yearly").is_err());
        assert_eq!(h.window_names().count(), 4, "no window was created");
    }

    #[test]
    fn test_non_finite_score_rejected() {
        let mut h = standard();
        assert!(h.record("short_term", f64::NAN).is_err());
        assert!(h.record_all(f64::INFINITY).is_err());
        assert_eq!(h.average("short_term").unwrap(), None);
    }

    #[test]
    fn test_record_all_fans_out() {
        let mut h = standard();
        for i in 0..15 {
            h.record_all(i as f64 / 15.0).unwrap();
        }
        assert_eq!(h.window("short_term").unwrap().len(), 10);
        assert_eq!(h.window("medium_term").unwrap().len(), 15);
        assert_eq!(h.window("eternal_term").unwrap().len(), 15);
    }

    #[test]
    fn test_window_stats() {
        let mut w = RingWindow::bounded(4).unwrap();
        assert_eq!(
            w.stats(),
            WindowStats { count: 0, average: None, std_dev: None }
        );
        w.push(0.5);
        assert_eq!(w.stats().std_dev, Some(0.0));
        w.push(1.0);
        let s = w.stats();
        assert_eq!(s.count, 2);
        assert!((s.average.unwrap() - 0.75).abs() < 1e-12);
        assert!((s.std_dev.unwrap() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_and_zero_capacity_rejected() {
        let mut h = standard();
        assert!(h.add_window("short_term", Some(3)).is_err());
        assert!(h.add_window("zero", Some(0)).is_err());
        assert!(HistoryTracker::new(0).is_err());
    }

    #[test]
    fn test_record_log_is_capped() {
        let mut h = HistoryTracker::new(3).unwrap();
        for i in 0..5 {
            h.push_record(ScoreRecord::at(i as f64 / 10.0, "L", "s", i));
        }
        let ts: Vec<i64> = h.records().map(ScoreRecord::timestamp).collect();
        assert_eq!(ts, vec![2, 3, 4]);
    }

    #[test]
    fn test_snapshot_preserves_order_and_contents() {
        let mut h = standard();
        h.record("long_term", 0.3).unwrap();
        let snap = h.snapshot();
        let names: Vec<&str> = snap.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["short_term", "medium_term", "long_term", "eternal_term"]);
        assert_eq!(snap[2].values, vec![0.3]);
        assert_eq!(snap[3].capacity, None);
    }
}
