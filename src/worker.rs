// Background worker: emits heartbeats to the recorder and runs store maintenance.
// Heartbeats fire every heartbeat_interval_secs; the gate plus `Heartbeat` let one per hour through.
// Maintenance (prune + VACUUM) runs on a cron schedule or a fixed interval.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::time::{Duration, interval};
use tracing::{Instrument, debug, info, warn};

use crate::metrics_repo::MetricsRepo;
use crate::models::Trigger;
use crate::recorder::{Recorder, RunOutcome};

/// Recorder, store and shutdown for the worker.
pub struct WorkerDeps {
    pub recorder: Arc<Recorder>,
    pub repo: Arc<MetricsRepo>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Worker timing.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub heartbeat_interval_secs: u64,
    /// Time source for heartbeats. `Utc::now` outside tests.
    pub clock: fn() -> DateTime<Utc>,
    /// Optional cron expression for maintenance (e.g. "0 30 3 * * *"). Uses local time.
    pub maintenance_schedule: Option<String>,
    /// Run maintenance every N seconds when maintenance_schedule is not set.
    pub maintenance_interval_secs: u64,
}

/// Remembers the last UTC hour a heartbeat ran so repeat minute-0 beats are skipped.
#[derive(Debug, Default)]
pub struct Heartbeat {
    last_hour: Option<i64>,
}

impl Heartbeat {
    /// One beat at `now`. Skipped when this hour already ran; a busy run does not count.
    pub async fn beat(&mut self, recorder: &Recorder, now: DateTime<Utc>) -> RunOutcome {
        let hour = now.timestamp().div_euclid(3600);
        if self.last_hour == Some(hour) {
            return RunOutcome::Skipped;
        }
        let outcome = recorder.run_at(Trigger::Heartbeat(now), now).await;
        if !matches!(outcome, RunOutcome::Skipped | RunOutcome::Busy) {
            self.last_hour = Some(hour);
        }
        outcome
    }
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        recorder,
        repo,
        mut shutdown_rx,
    } = deps;

    let worker_span = tracing::span!(
        tracing::Level::DEBUG,
        "worker",
        heartbeat_interval_secs = config.heartbeat_interval_secs
    );

    tokio::spawn(async move {
        let mut beat = interval(Duration::from_secs(config.heartbeat_interval_secs));
        beat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let (maintenance_tx, mut maintenance_rx) = tokio::sync::mpsc::channel::<()>(1);
        let scheduler = tokio::spawn(maintenance_scheduler(config.clone(), maintenance_tx));

        let mut heartbeat = Heartbeat::default();
        let mut runs_recorded: u64 = 0;
        let mut runs_failed: u64 = 0;

        loop {
            tokio::select! {
                _ = beat.tick() => {
                    // A slow run must not hold up shutdown.
                    tokio::select! {
                        outcome = heartbeat.beat(&recorder, (config.clock)()) => match outcome {
                            RunOutcome::Recorded(_) => runs_recorded += 1,
                            RunOutcome::Failed(_) => runs_failed += 1,
                            RunOutcome::Skipped | RunOutcome::Busy => {}
                        },
                        _ = &mut shutdown_rx => {
                            debug!("Worker shutting down during a run");
                            break;
                        }
                    }
                }
                Some(()) = maintenance_rx.recv() => {
                    run_maintenance(&repo).await;
                    info!(runs_recorded, runs_failed, "recorder stats");
                }
                _ = &mut shutdown_rx => {
                    debug!("Worker shutting down");
                    break;
                }
            }
        }
        scheduler.abort();
    }
    .instrument(worker_span))
}

/// Prune expired buckets and summaries, then VACUUM.
pub async fn run_maintenance(repo: &MetricsRepo) {
    match repo.prune_old_data().await {
        Ok(pruned) => debug!(operation = "prune_old_data", pruned, "old data pruned"),
        Err(e) => {
            warn!(error = %e, operation = "prune_old_data", "Failed to prune old data");
            return;
        }
    }
    if let Err(e) = repo.vacuum().await {
        warn!(error = %e, operation = "vacuum", "vacuum failed");
    } else {
        info!("maintenance complete");
    }
}

/// Sends a message on `tx` at each maintenance time (cron or fixed interval). Uses local time for cron.
async fn maintenance_scheduler(config: WorkerConfig, tx: tokio::sync::mpsc::Sender<()>) {
    if let Some(ref cron_str) = config.maintenance_schedule {
        let Ok(schedule) = cron::Schedule::from_str(cron_str) else {
            warn!(cron = %cron_str, "invalid maintenance_schedule; maintenance will not run");
            return;
        };
        loop {
            let now = chrono::Local::now();
            let next = schedule.after(&now).next();
            if let Some(next) = next {
                let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
                tokio::time::sleep(delay).await;
                if tx.send(()).await.is_err() {
                    break;
                }
            } else {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
    } else {
        let interval = Duration::from_secs(config.maintenance_interval_secs);
        loop {
            tokio::time::sleep(interval).await;
            if tx.send(()).await.is_err() {
                break;
            }
        }
    }
}
