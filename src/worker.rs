use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::WorkerThresholds;
use crate::schema::workers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkerType {
    AircraftTracker,
    HistoryTrawler,
}

impl WorkerType {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerType::AircraftTracker => "aircraft-tracker",
            WorkerType::HistoryTrawler => "history-trawler",
        }
    }

    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "aircraft-tracker" => Ok(WorkerType::AircraftTracker),
            "history-trawler" => Ok(WorkerType::HistoryTrawler),
            other => Err(anyhow::anyhow!("unknown worker type: {other}")),
        }
    }
}

/// Derived worker status (spec.md §4.7) — never stored directly, always
/// computed from the timestamp tuple on [`Worker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Ready,
    Initialising,
    Running,
    Shutdown,
    Error,
    Unknown,
}

/// A scraper process; an aircraft-tracker pushes realtime data, a
/// history-trawler fetches past days (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = workers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Worker {
    pub name: String,
    pub unique_id: String,
    pub worker_type: String,
    pub enabled: bool,
    pub phone_home_url: Option<String>,
    pub proxy_url: Option<String>,
    pub pid: Option<i32>,
    pub running: bool,
    pub initialising: bool,
    pub executed_at: Option<DateTime<Utc>>,
    pub shutdown_at: Option<DateTime<Utc>>,
    pub init_started_at: Option<DateTime<Utc>>,
    pub last_update: Option<DateTime<Utc>>,
    pub error_json: Option<serde_json::Value>,
}

impl Worker {
    /// Derives [`WorkerStatus`] from the timestamp tuple per the decision
    /// table in spec.md §4.7. Status is never stored; this is the single
    /// source of truth.
    pub fn status(&self) -> WorkerStatus {
        match (
            self.running,
            self.executed_at.is_some(),
            self.shutdown_at.is_some(),
            self.initialising,
            self.init_started_at.is_some(),
            self.error_json.is_some(),
        ) {
            (false, false, false, false, false, false) => WorkerStatus::Ready,
            (false, false, false, true, true, false) => WorkerStatus::Initialising,
            (true, true, false, false, true, false) => WorkerStatus::Running,
            (false, _, _, false, _, true) => WorkerStatus::Error,
            (false, executed, _, false, init_started, false) if executed || init_started => {
                WorkerStatus::Shutdown
            }
            _ => WorkerStatus::Unknown,
        }
    }

    /// Ready|Shutdown -> Initialising, via `workerInitialising`.
    pub fn begin_initialising(&mut self, now: DateTime<Utc>) {
        self.initialising = true;
        self.init_started_at = Some(now);
        self.running = false;
        self.shutdown_at = None;
        self.error_json = None;
    }

    /// Initialising -> Running, on the worker's "initialised" signal.
    pub fn mark_running(&mut self, pid: Option<i32>, now: DateTime<Utc>) {
        self.running = true;
        self.initialising = false;
        self.executed_at = Some(now);
        self.last_update = Some(now);
        self.pid = pid;
    }

    /// Running|Initialising -> Shutdown, on "shutdown" signal or
    /// termination.
    pub fn mark_shutdown(&mut self, now: DateTime<Utc>) {
        self.running = false;
        self.initialising = false;
        self.shutdown_at = Some(now);
        self.pid = None;
    }

    /// any -> Ready, via explicit reset.
    pub fn reset(&mut self) {
        self.running = false;
        self.initialising = false;
        self.executed_at = None;
        self.shutdown_at = None;
        self.init_started_at = None;
        self.error_json = None;
        self.pid = None;
    }

    pub fn heartbeat(&mut self, now: DateTime<Utc>) {
        self.last_update = Some(now);
    }

    pub fn record_error(&mut self, error: serde_json::Value) {
        self.error_json = Some(error);
    }

    /// True if a periodic sweep should force-terminate and reset this
    /// worker (spec.md §4.7 "Stuck detection").
    pub fn is_stuck(&self, now: DateTime<Utc>, thresholds: &WorkerThresholds) -> bool {
        match self.status() {
            WorkerStatus::Initialising => self
                .init_started_at
                .is_some_and(|t| now - t > chrono::Duration::from_std(thresholds.stuck_timeout).unwrap()),
            WorkerStatus::Running => self
                .last_update
                .is_none_or(|t| now - t > chrono::Duration::from_std(thresholds.stuck_timeout).unwrap()),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare(name: &str) -> Worker {
        Worker {
            name: name.to_string(),
            unique_id: "u1".to_string(),
            worker_type: WorkerType::AircraftTracker.as_str().to_string(),
            enabled: true,
            phone_home_url: None,
            proxy_url: None,
            pid: None,
            running: false,
            initialising: false,
            executed_at: None,
            shutdown_at: None,
            init_started_at: None,
            last_update: None,
            error_json: None,
        }
    }

    #[test]
    fn fresh_worker_is_ready() {
        assert_eq!(bare("w1").status(), WorkerStatus::Ready);
    }

    #[test]
    fn initialising_lifecycle() {
        let mut w = bare("w1");
        let t0 = Utc::now();
        w.begin_initialising(t0);
        assert_eq!(w.status(), WorkerStatus::Initialising);
        w.mark_running(Some(123), t0 + chrono::Duration::seconds(1));
        assert_eq!(w.status(), WorkerStatus::Running);
        w.mark_shutdown(t0 + chrono::Duration::seconds(2));
        assert_eq!(w.status(), WorkerStatus::Shutdown);
    }

    #[test]
    fn errored_worker_reports_error_status() {
        let mut w = bare("w1");
        w.record_error(serde_json::json!({"code": "boom"}));
        assert_eq!(w.status(), WorkerStatus::Error);
    }

    #[test]
    fn stuck_detection_honours_timeout() {
        let thresholds = WorkerThresholds {
            stuck_timeout: std::time::Duration::from_secs(60),
            max_stitch_days: 100,
        };
        let mut w = bare("w1");
        let t0 = Utc::now();
        w.begin_initialising(t0);
        assert!(!w.is_stuck(t0 + chrono::Duration::seconds(10), &thresholds));
        assert!(w.is_stuck(t0 + chrono::Duration::seconds(120), &thresholds));
    }
}
