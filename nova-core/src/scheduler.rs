use crate::config::Config;
use crate::error::MissionError;
use crate::locks::LockRegistry;
use crate::missions::{simulate, MissionEnv};
use chrono::Utc;
use futures::future::join_all;
use metrics::counter;
use nova_domain::{BodyId, FleetId, PlayerId};
use nova_store::bmc::Bmc;
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{event, Level};

/// Drives mission resolution: polls for due fleets, fans them out to a
/// bounded worker pool, and owns the retry/dead-letter policy. Each worker
/// resolves one mission end-to-end under the lock discipline of
/// `LockRegistry`.
pub struct Scheduler {
    env: MissionEnv,
    locks: Arc<LockRegistry>,
    worker_count: usize,
    poll_interval: Duration,
    db_deadline: Duration,
    max_retries: u32,
    dead_letters: Mutex<HashSet<FleetId>>,
}

impl Scheduler {
    pub fn new(bmc: Arc<dyn Bmc>, config: &Config) -> Self {
        Self {
            env: MissionEnv::new(bmc),
            locks: Arc::new(LockRegistry::new()),
            worker_count: config.worker_count.max(1),
            poll_interval: Duration::from_secs(config.poll_interval_seconds.max(1)),
            db_deadline: Duration::from_secs(config.db_deadline_seconds.max(1)),
            max_retries: config.max_retries,
            dead_letters: Mutex::new(HashSet::new()),
        }
    }

    /// Polls until cancelled. Every tick drains the currently due missions.
    pub async fn run(self: Arc<Self>, cancellation: CancellationToken) {
        event!(Level::INFO, workers = self.worker_count, "scheduler running");
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if let Err(err) = Arc::clone(&self).drain_due().await {
                event!(Level::WARN, error = %err, "polling for due fleets failed");
            }
        }
        event!(Level::INFO, "scheduler stopped");
    }

    /// Resolves everything currently due, bounded by the worker pool.
    /// Returns how many missions were picked up.
    pub async fn drain_due(self: Arc<Self>) -> anyhow::Result<usize> {
        let due = self
            .env
            .bmc
            .fleet_bmc()
            .due_fleets(&self.env.ctx, Utc::now())
            .await?;

        let semaphore = Arc::new(Semaphore::new(self.worker_count));
        let mut workers = Vec::with_capacity(due.len());
        let picked = due.len();

        for fleet in due {
            if self.dead_letters.lock().await.contains(&fleet.id) {
                continue;
            }
            let scheduler = Arc::clone(&self);
            let semaphore = Arc::clone(&semaphore);
            workers.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.expect("semaphore never closed");
                scheduler.process_mission(fleet.id).await;
            }));
        }

        join_all(workers).await;
        Ok(picked)
    }

    /// One mission, retried with bounded backoff on transient failures and
    /// dead-lettered on fatal ones. Once `simulate` has begun mutating
    /// state it runs to completion; there is no cancellation point inside.
    fn process_mission(self: Arc<Self>, fleet_id: FleetId) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async move {
            let mut attempt = 0;
            loop {
                match self.resolve_once(fleet_id).await {
                    Ok(()) => return,
                    Err(err) if err.is_transient() && attempt < self.max_retries => {
                        attempt += 1;
                        let backoff = Duration::from_millis(100 * 2u64.pow(attempt));
                        event!(Level::WARN, fleet = %fleet_id, attempt, error = %err, "transient failure, backing off");
                        counter!("nova_mission_retries_total").increment(1);
                        tokio::time::sleep(backoff).await;
                    }
                    Err(err) if err.is_transient() => {
                        // Retries exhausted: the job stays unacknowledged and
                        // the next poll picks the fleet up again.
                        event!(Level::WARN, fleet = %fleet_id, error = %err, "transient failure, re-queued");
                        return;
                    }
                    Err(err) => {
                        event!(Level::ERROR, fleet = %fleet_id, error = %err, "mission dead-lettered");
                        counter!("nova_missions_dead_lettered_total").increment(1);
                        self.dead_letters.lock().await.insert(fleet_id);
                        return;
                    }
                }
            }
        })
    }

    fn resolve_once(&self, fleet_id: FleetId) -> Pin<Box<dyn Future<Output = Result<(), MissionError>> + Send + '_>> {
        Box::pin(async move {
            // First look without locks, to learn the lock set.
            let Some(fleet) = self
                .env
                .bmc
                .fleet_bmc()
                .get_fleet(&self.env.ctx, fleet_id)
                .await
                .map_err(MissionError::from_store)?
            else {
                // A sibling ACS component already resolved the engagement.
                return Ok(());
            };
            if !fleet.is_due(Utc::now()) {
                return Ok(());
            }

            let (players, bodies) = self.lock_set(&fleet).await?;
            let _guard = self.locks.acquire(&players, &bodies).await;

            // Re-read under the locks: the fleet may have been recalled or
            // resolved while we queued.
            let Some(fleet) = self
                .env
                .bmc
                .fleet_bmc()
                .get_fleet(&self.env.ctx, fleet_id)
                .await
                .map_err(MissionError::from_store)?
            else {
                return Ok(());
            };
            if !fleet.is_due(Utc::now()) {
                return Ok(());
            }

            let follow_up = tokio::time::timeout(self.db_deadline, simulate(fleet, &self.env))
                .await
                .map_err(|_| MissionError::DeadlineExceeded)??;

            event!(Level::DEBUG, fleet = %fleet_id, follow_up = follow_up.script_name(), "mission done");
            Ok(())
        })
    }

    /// Everything a mission may touch: the owner and source body, the
    /// target body and its owner, and for joint operations every component
    /// fleet's owner and source. The registry sorts before acquiring.
    fn lock_set<'a>(&'a self, fleet: &'a nova_domain::Fleet) -> Pin<Box<dyn Future<Output = Result<(Vec<PlayerId>, Vec<BodyId>), MissionError>> + Send + 'a>> {
        Box::pin(async move {
            let mut players = vec![fleet.player];
            let mut bodies = vec![fleet.source];

            if let Some(target_id) = fleet.target {
                bodies.push(target_id);
                if let Some(target) = self
                    .env
                    .bmc
                    .planet_bmc()
                    .get_body(&self.env.ctx, target_id)
                    .await
                    .map_err(MissionError::from_store)?
                {
                    players.push(target.player);
                }
            }

            if let Some(acs_id) = fleet.acs {
                let components = self
                    .env
                    .bmc
                    .fleet_bmc()
                    .fleets_of_acs(&self.env.ctx, acs_id)
                    .await
                    .map_err(MissionError::from_store)?;
                for component in components {
                    players.push(component.player);
                    bodies.push(component.source);
                }
            }

            Ok((players, bodies))
        })
    }
}
