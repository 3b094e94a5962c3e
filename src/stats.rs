//! Recorder activity counters.
//!
//! Tracks how much work the recorder did without keeping any of the
//! recorded values. Counters are lock-free so both callback paths and the
//! dispatch tasks can update them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Running counters for one recorder process.
#[derive(Debug)]
pub struct RecorderStats {
    /// Container notifications processed while recording
    notifications: AtomicU64,
    /// Change events detected
    changes_detected: AtomicU64,
    /// Batches the collector accepted
    batches_dispatched: AtomicU64,
    /// Events carried by accepted batches
    events_dispatched: AtomicU64,
    /// Batches lost to transport or server errors
    transport_failures: AtomicU64,
    /// Transitions into Recording
    sessions_started: AtomicU64,
    /// Process start time
    started_at: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl RecorderStats {
    pub fn new() -> Self {
        Self {
            notifications: AtomicU64::new(0),
            changes_detected: AtomicU64::new(0),
            batches_dispatched: AtomicU64::new(0),
            events_dispatched: AtomicU64::new(0),
            transport_failures: AtomicU64::new(0),
            sessions_started: AtomicU64::new(0),
            started_at: Utc::now(),
            persist_path: None,
        }
    }

    /// Create stats that accumulate on top of a persisted file.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("Could not load previous recorder stats: {}", e);
        }

        stats
    }

    pub fn record_notification(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_change(&self) {
        self.changes_detected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a batch the collector accepted.
    pub fn record_batch_dispatched(&self, events: u64) {
        self.batches_dispatched.fetch_add(1, Ordering::Relaxed);
        self.events_dispatched.fetch_add(events, Ordering::Relaxed);
    }

    pub fn record_transport_failure(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            notifications: self.notifications.load(Ordering::Relaxed),
            changes_detected: self.changes_detected.load(Ordering::Relaxed),
            batches_dispatched: self.batches_dispatched.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            started_at: self.started_at,
            uptime_secs: (Utc::now() - self.started_at).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Recorder Statistics:\n\
             - Sessions started: {}\n\
             - Notifications processed: {}\n\
             - Changes detected: {}\n\
             - Batches dispatched: {} ({} events)\n\
             - Transport failures: {}\n\
             - Uptime: {} seconds",
            stats.sessions_started,
            stats.notifications,
            stats.changes_detected,
            stats.batches_dispatched,
            stats.events_dispatched,
            stats.transport_failures,
            stats.uptime_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                notifications: stats.notifications,
                changes_detected: stats.changes_detected,
                batches_dispatched: stats.batches_dispatched,
                events_dispatched: stats.events_dispatched,
                transport_failures: stats.transport_failures,
                sessions_started: stats.sessions_started,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.notifications
                    .store(persisted.notifications, Ordering::Relaxed);
                self.changes_detected
                    .store(persisted.changes_detected, Ordering::Relaxed);
                self.batches_dispatched
                    .store(persisted.batches_dispatched, Ordering::Relaxed);
                self.events_dispatched
                    .store(persisted.events_dispatched, Ordering::Relaxed);
                self.transport_failures
                    .store(persisted.transport_failures, Ordering::Relaxed);
                self.sessions_started
                    .store(persisted.sessions_started, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for RecorderStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of recorder statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub notifications: u64,
    pub changes_detected: u64,
    pub batches_dispatched: u64,
    pub events_dispatched: u64,
    pub transport_failures: u64,
    pub sessions_started: u64,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    notifications: u64,
    changes_detected: u64,
    batches_dispatched: u64,
    events_dispatched: u64,
    transport_failures: u64,
    sessions_started: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared stats.
pub type SharedStats = Arc<RecorderStats>;

pub fn create_shared_stats() -> SharedStats {
    Arc::new(RecorderStats::new())
}

pub fn create_shared_stats_with_persistence(path: PathBuf) -> SharedStats {
    Arc::new(RecorderStats::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = RecorderStats::new();
        stats.record_notification();
        stats.record_notification();
        stats.record_change();
        stats.record_batch_dispatched(3);
        stats.record_batch_dispatched(2);

        let snapshot = stats.stats();
        assert_eq!(snapshot.notifications, 2);
        assert_eq!(snapshot.changes_detected, 1);
        assert_eq!(snapshot.batches_dispatched, 2);
        assert_eq!(snapshot.events_dispatched, 5);
    }

    #[test]
    fn test_summary_format() {
        let summary = RecorderStats::new().summary();
        assert!(summary.contains("Changes detected"));
        assert!(summary.contains("Transport failures"));
    }

    #[test]
    fn test_persistence_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("varbit-recorder-stats-{}", uuid::Uuid::new_v4()))
            .join("stats.json");

        let stats = RecorderStats::with_persistence(path.clone());
        stats.record_change();
        stats.record_batch_dispatched(1);
        stats.save().unwrap();

        let reloaded = RecorderStats::with_persistence(path.clone());
        assert_eq!(reloaded.stats().changes_detected, 1);
        assert_eq!(reloaded.stats().events_dispatched, 1);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }
}
