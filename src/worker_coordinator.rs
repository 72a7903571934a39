//! Worker Coordinator (C8, spec.md §4.7): assigns history-trawl work,
//! sweeps for stuck workers, and manages the spawn/terminate lifecycle of
//! worker processes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{info, warn};

use crate::aircraft_present_day_repo::AircraftPresentDayRepository;
use crate::config::WorkerThresholds;
use crate::error::DomainError;
use crate::worker_lock::WorkerLock;
use crate::worker_repo::WorkersRepository;

pub struct WorkerCoordinator {
    pub workers_repo: WorkersRepository,
    pub present_day_repo: AircraftPresentDayRepository,
    pub thresholds: WorkerThresholds,
    /// Binary name enumerated when reconciling externally-launched
    /// instances (spec.md §4.7: "`node` (or the configured binary)").
    pub worker_binary: String,
}

impl WorkerCoordinator {
    pub fn new(
        workers_repo: WorkersRepository,
        present_day_repo: AircraftPresentDayRepository,
        thresholds: WorkerThresholds,
        worker_binary: String,
    ) -> Self {
        Self {
            workers_repo,
            present_day_repo,
            thresholds,
            worker_binary,
        }
    }

    /// `assignTraceHistoryWork(worker)` (spec.md §4.7): returns the
    /// `(icao, date)` assigned to `worker_name`, inserting a WorkerLock.
    /// If the worker already holds a lock and `multiple_assignments_allowed`
    /// is false, that existing assignment is returned unchanged.
    pub async fn assign_trace_history_work(
        &self,
        worker_name: &str,
        multiple_assignments_allowed: bool,
    ) -> Result<(String, NaiveDate), DomainError> {
        if !multiple_assignments_allowed
            && let Some(existing) = self
                .workers_repo
                .existing_lock(worker_name)
                .await
                .map_err(|_| DomainError::NoAssignableWorkLeft)?
        {
            return Ok((existing.icao, existing.date));
        }

        loop {
            let candidate = self
                .present_day_repo
                .find_unlocked_unverified()
                .await
                .map_err(|_| DomainError::NoAssignableWorkLeft)?
                .ok_or(DomainError::NoAssignableWorkLeft)?;

            let lock = WorkerLock {
                worker_name: worker_name.to_string(),
                icao: candidate.0.clone(),
                date: candidate.1,
            };
            let inserted = self
                .workers_repo
                .insert_lock(&lock)
                .await
                .map_err(|_| DomainError::NoAssignableWorkLeft)?;
            if inserted {
                return Ok(candidate);
            }
            // Someone else took it between the select and the insert; retry.
        }
    }

    /// `traceHistorySubmitted`completion (spec.md §4.7): marks the day
    /// verified and releases the worker's lock on it.
    pub async fn complete_trace_history_work(&self, worker_name: &str, icao: &str, date: NaiveDate) -> anyhow::Result<()> {
        self.present_day_repo.set_flags(icao, date, Some(true), None, None).await?;
        self.workers_repo.release_lock(worker_name, icao, date).await?;
        Ok(())
    }

    /// Periodic sweep (spec.md §4.7 "Stuck detection"): force-terminates
    /// and resets any worker that has been Initialising or Running without
    /// a heartbeat past `WORKER_STUCK_TIMEOUT`.
    pub async fn sweep_stuck_workers(&self) -> anyhow::Result<Vec<String>> {
        let now = Utc::now();
        let workers = self.workers_repo.all().await?;
        let mut reset = Vec::new();

        for mut worker in workers {
            if !worker.is_stuck(now, &self.thresholds) {
                continue;
            }
            warn!(worker = worker.name, pid = ?worker.pid, "worker stuck, terminating");
            metrics::counter!("aireyes_worker_stuck_total").increment(1);
            if let Some(pid) = worker.pid {
                terminate_pid(pid);
            }
            worker.mark_shutdown(now);
            worker.reset();
            self.workers_repo.upsert(&worker).await?;
            self.workers_repo.release_all_locks_for(&worker.name).await?;
            reset.push(worker.name);
        }

        Ok(reset)
    }

    /// Spawns a worker process (spec.md §4.7 "Process lifecycle"):
    /// serializes `config` as JSON, base64-encodes it, and execs
    /// `[worker_binary, script_name, encoded_config]`. Records the PID and
    /// transitions the worker to Initialising.
    pub async fn spawn_worker<T: Serialize>(&self, worker_name: &str, script_name: &str, config: &T) -> anyhow::Result<u32> {
        let encoded = BASE64.encode(serde_json::to_vec(config)?);

        let child = std::process::Command::new(&self.worker_binary)
            .arg(script_name)
            .arg(&encoded)
            .spawn()?;
        let pid = child.id();

        let mut worker = self
            .workers_repo
            .get(worker_name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("unknown worker: {worker_name}"))?;
        worker.begin_initialising(Utc::now());
        worker.pid = Some(pid as i32);
        self.workers_repo.upsert(&worker).await?;

        info!(worker = worker_name, pid, "spawned worker process");
        Ok(pid)
    }

    /// Reconciles recorded PIDs against the live process table (spec.md
    /// §4.7: "enumerate processes named `node` (or the configured
    /// binary), parse their third argument, and reconcile PIDs"). Workers
    /// whose recorded PID no longer has a matching live process, running
    /// the configured binary, are marked Shutdown.
    pub async fn reconcile_processes(&self) -> anyhow::Result<Vec<String>> {
        let mut system = System::new_all();
        system.refresh_processes(ProcessesToUpdate::All, true);

        let mut reconciled = Vec::new();
        for mut worker in self.workers_repo.all().await? {
            let Some(pid) = worker.pid else { continue };
            let still_alive = system
                .process(Pid::from_u32(pid as u32))
                .is_some_and(|p| p.name().to_string_lossy().contains(&self.worker_binary));
            if !still_alive {
                worker.mark_shutdown(Utc::now());
                self.workers_repo.upsert(&worker).await?;
                reconciled.push(worker.name);
            }
        }

        Ok(reconciled)
    }

    /// Externally-launched instances this coordinator didn't spawn itself:
    /// processes matching `worker_binary` whose second argument (the
    /// script name) identifies a worker we know about but have no PID
    /// recorded for.
    pub fn discover_external_instances(&self) -> Vec<(String, u32)> {
        let mut system = System::new_all();
        system.refresh_processes(ProcessesToUpdate::All, true);

        system
            .processes()
            .values()
            .filter(|p| p.name().to_string_lossy().contains(&self.worker_binary))
            .filter_map(|p| {
                let args = p.cmd();
                // [worker_binary, script_name, encoded_config] — the
                // "third argument" in spec.md §4.7 is the script name at
                // index 1 of the process's own argv (index 0 is argv[0]).
                let script_name = args.get(1)?.to_string_lossy().into_owned();
                Some((script_name, p.pid().as_u32()))
            })
            .collect()
    }
}

fn terminate_pid(pid: i32) {
    let mut system = System::new_all();
    system.refresh_processes(ProcessesToUpdate::All, true);
    if let Some(process) = system.process(Pid::from_u32(pid as u32)) {
        process.kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::Worker;

    fn bare_worker(name: &str) -> Worker {
        Worker {
            name: name.to_string(),
            unique_id: "u1".to_string(),
            worker_type: "history-trawler".to_string(),
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
    fn stuck_worker_is_reset_to_ready() {
        let thresholds = WorkerThresholds {
            stuck_timeout: std::time::Duration::from_secs(60),
            max_stitch_days: 100,
        };
        let mut w = bare_worker("w1");
        let t0 = Utc::now();
        w.begin_initialising(t0);
        assert!(w.is_stuck(t0 + chrono::Duration::seconds(120), &thresholds));
        w.mark_shutdown(t0 + chrono::Duration::seconds(120));
        w.reset();
        assert_eq!(w.status(), crate::worker::WorkerStatus::Ready);
    }
}
