//! On-disk session records.
//!
//! One JSON file per profile under the configured sessions dir, so a later
//! CLI invocation can find, inspect, and close sessions launched by an
//! earlier one. The records are advisory: liveness is always re-checked
//! against the process and its control channel, never trusted from disk.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::launcher;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub profile_id: String,
    pub pid: u32,
    pub debug_port: u16,
    pub control_endpoint: String,
    /// Unix seconds at launch.
    pub started_at: u64,
}

impl SessionRecord {
    pub fn new(profile_id: &str, pid: u32, debug_port: u16, control_endpoint: &str) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            pid,
            debug_port,
            control_endpoint: control_endpoint.to_string(),
            started_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
        }
    }
}

/// Re-checked state of a recorded session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Process alive and control channel answering.
    Running,
    /// Process alive but the control channel is gone.
    Stale,
    /// Process gone; record is a leftover.
    NotRunning,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Stale => "stale",
            SessionStatus::NotRunning => "not running",
        }
    }
}

pub struct RecordStore {
    dir: PathBuf,
}

impl RecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn record_path(&self, profile_id: &str) -> PathBuf {
        // Profile ids are caller-chosen; keep the filename filesystem-safe.
        let safe: String = profile_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }

    pub fn save(&self, record: &SessionRecord) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.record_path(&record.profile_id);
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, json)?;
        tracing::debug!(profile_id = %record.profile_id, path = %path.display(), "session record saved");
        Ok(())
    }

    pub fn load(&self, profile_id: &str) -> Result<Option<SessionRecord>> {
        let path = self.record_path(profile_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        match serde_json::from_str(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::warn!(path = %path.display(), "discarding corrupt session record: {}", e);
                Ok(None)
            }
        }
    }

    pub fn remove(&self, profile_id: &str) -> Result<()> {
        let path = self.record_path(profile_id);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    /// All readable records, sorted by launch time.
    pub fn list(&self) -> Result<Vec<SessionRecord>> {
        let mut records = Vec::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(records),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            match serde_json::from_str::<SessionRecord>(&content) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "skipping corrupt session record: {}", e)
                }
            }
        }

        records.sort_by_key(|r| r.started_at);
        Ok(records)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Re-check one record against reality.
pub async fn check_status(record: &SessionRecord) -> SessionStatus {
    if !launcher::process_alive(record.pid) {
        return SessionStatus::NotRunning;
    }

    let url = format!("http://127.0.0.1:{}/json/version", record.debug_port);
    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    match client.get(&url).send().await {
        Ok(response) if response.status().is_success() => SessionStatus::Running,
        _ => SessionStatus::Stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, RecordStore) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn save_load_remove_round_trip() {
        let (_dir, store) = store();
        let record = SessionRecord::new("acct-1", 4242, 9333, "ws://127.0.0.1:9333/x");

        store.save(&record).unwrap();
        let loaded = store.load("acct-1").unwrap().unwrap();
        assert_eq!(loaded.pid, 4242);
        assert_eq!(loaded.debug_port, 9333);
        assert_eq!(loaded.control_endpoint, "ws://127.0.0.1:9333/x");

        store.remove("acct-1").unwrap();
        assert!(store.load("acct-1").unwrap().is_none());
    }

    #[test]
    fn missing_record_is_none_not_error() {
        let (_dir, store) = store();
        assert!(store.load("never-launched").unwrap().is_none());
        // Removing a missing record is fine too.
        store.remove("never-launched").unwrap();
    }

    #[test]
    fn corrupt_record_is_skipped() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        assert!(store.load("bad").unwrap().is_none());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn list_orders_by_launch_time() {
        let (_dir, store) = store();
        let mut a = SessionRecord::new("a", 1, 1, "ws://a");
        let mut b = SessionRecord::new("b", 2, 2, "ws://b");
        a.started_at = 200;
        b.started_at = 100;
        store.save(&a).unwrap();
        store.save(&b).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].profile_id, "b");
        assert_eq!(listed[1].profile_id, "a");
    }

    #[test]
    fn record_paths_are_sanitized() {
        let (dir, store) = store();
        let record = SessionRecord::new("../escape/attempt", 1, 1, "ws://x");
        store.save(&record).unwrap();
        // The record lands inside the store dir, not outside it.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().flatten().collect();
        assert_eq!(entries.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn dead_pid_reports_not_running() {
        let record = SessionRecord::new("x", 4_000_000, 19997, "ws://x");
        assert_eq!(check_status(&record).await, SessionStatus::NotRunning);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn live_pid_with_dead_port_reports_stale() {
        let record = SessionRecord::new("x", std::process::id(), 19998, "ws://x");
        assert_eq!(check_status(&record).await, SessionStatus::Stale);
    }
}
