//! Poll loop.
//!
//! Periodically fetches the authoritative card list and reconciles it into
//! the store. The first successful fetch is always applied and clears the
//! loading flag; later fetches are applied only when the number of resolved
//! cards differs from what the store holds. Same-count edits made on the
//! server are therefore not picked up until the count changes.
//!
//! Stopping is idempotent. A fetch that is in flight when the loop is
//! stopped is allowed to finish, but its result is dropped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::errors::BookwatchResult;
use crate::store::ReconcilingStore;
use crate::types::card::CardList;

/// Source of authoritative card snapshots.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetches the current server-side card list.
    async fn fetch(&self) -> BookwatchResult<CardList>;
}

/// Result of a single poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The snapshot replaced the store contents.
    Applied,
    /// The resolved-card count matched, nothing was replaced.
    Unchanged,
    /// The fetch failed; the store was left alone.
    Failed,
    /// The loop was stopped while the fetch was in flight.
    Discarded,
}

/// Counters describing poll activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollStats {
    /// Ticks started.
    pub ticks: u64,
    /// Snapshots applied.
    pub applied: u64,
    /// Snapshots skipped by change detection.
    pub unchanged: u64,
    /// Failed fetches.
    pub failures: u64,
    /// Fetches that completed after stop.
    pub discarded: u64,
    /// Time of the last successful fetch.
    pub last_success_at: Option<DateTime<Utc>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs reconciliation steps against a store.
///
/// Usually driven by [`PollLoop`], but can be ticked by hand.
pub struct Poller {
    store: Arc<ReconcilingStore>,
    source: Arc<dyn SnapshotSource>,
    stopped: Arc<Mutex<bool>>,
    stats: Arc<Mutex<PollStats>>,
    initialized: bool,
}

impl Poller {
    /// Creates a poller whose first successful tick always applies.
    pub fn new(store: Arc<ReconcilingStore>, source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            store,
            source,
            stopped: Arc::new(Mutex::new(false)),
            stats: Arc::new(Mutex::new(PollStats::default())),
            initialized: false,
        }
    }

    /// Returns a copy of the poll counters.
    pub fn stats(&self) -> PollStats {
        lock(&self.stats).clone()
    }

    /// Fetches one snapshot and reconciles it.
    pub async fn tick(&mut self) -> TickOutcome {
        lock(&self.stats).ticks += 1;

        let outcome = match self.source.fetch().await {
            Ok(snapshot) => self.apply(snapshot),
            Err(err) => {
                tracing::warn!(error = %err, "Poll fetch failed");
                TickOutcome::Failed
            }
        };

        let mut stats = lock(&self.stats);
        match outcome {
            TickOutcome::Applied => stats.applied += 1,
            TickOutcome::Unchanged => stats.unchanged += 1,
            TickOutcome::Failed => stats.failures += 1,
            TickOutcome::Discarded => stats.discarded += 1,
        }
        if matches!(outcome, TickOutcome::Applied | TickOutcome::Unchanged) {
            stats.last_success_at = Some(Utc::now());
        }
        outcome
    }

    /// Applies a fetched snapshot unless the loop has been stopped.
    ///
    /// The stop flag stays locked while the store is mutated, so once
    /// `stop` returns no snapshot can land.
    fn apply(&mut self, snapshot: CardList) -> TickOutcome {
        let stopped = lock(&self.stopped);
        if *stopped {
            tracing::debug!("Discarding snapshot fetched after stop");
            return TickOutcome::Discarded;
        }

        if !self.initialized {
            self.store.replace_all(snapshot);
            self.store.set_loading(false);
            self.initialized = true;
            return TickOutcome::Applied;
        }

        let fetched = snapshot.iter().filter(|card| !card.is_pending()).count();
        let current = self.store.resolved_count();
        if fetched == current {
            tracing::trace!(count = current, "Snapshot count unchanged");
            return TickOutcome::Unchanged;
        }

        tracing::debug!(fetched, current, "Snapshot count changed");
        self.store.replace_all(snapshot);
        TickOutcome::Applied
    }

    fn is_stopped(&self) -> bool {
        *lock(&self.stopped)
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("initialized", &self.initialized)
            .field("stats", &self.stats())
            .finish()
    }
}

/// Shortest period a poll loop runs at.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Recurring poll task factory.
#[derive(Debug, Clone)]
pub struct PollLoop {
    interval: Duration,
}

impl PollLoop {
    /// Creates a poll loop with the given period, raised to
    /// [`MIN_POLL_INTERVAL`] if shorter.
    pub fn new(interval: Duration) -> Self {
        if interval < MIN_POLL_INTERVAL {
            tracing::warn!(?interval, "Poll interval too short, using the minimum");
        }
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    /// Returns the poll period.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Spawns the loop on the current Tokio runtime.
    ///
    /// The first fetch happens immediately. Must be called from within a
    /// runtime.
    pub fn start(&self, store: Arc<ReconcilingStore>, source: Arc<dyn SnapshotSource>) -> PollHandle {
        let mut poller = Poller::new(store, source);
        let stopped = Arc::clone(&poller.stopped);
        let stats = Arc::clone(&poller.stats);
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let period = self.interval;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = stop_rx.changed() => break,
                }
                if poller.is_stopped() {
                    break;
                }
                poller.tick().await;
            }
            tracing::debug!("Poll loop exited");
        });

        tracing::debug!(?period, "Poll loop started");

        PollHandle {
            stopped,
            stats,
            stop_tx,
            task: Some(task),
        }
    }
}

/// Handle to a running poll loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct PollHandle {
    stopped: Arc<Mutex<bool>>,
    stats: Arc<Mutex<PollStats>>,
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    /// Stops the loop. Safe to call any number of times.
    pub fn stop(&self) {
        let was_stopped = std::mem::replace(&mut *lock(&self.stopped), true);
        self.stop_tx.send_replace(true);
        if !was_stopped {
            tracing::debug!("Poll loop stop requested");
        }
    }

    /// Returns true once `stop` has been called.
    pub fn is_stopped(&self) -> bool {
        *lock(&self.stopped)
    }

    /// Returns a copy of the poll counters.
    pub fn stats(&self) -> PollStats {
        lock(&self.stats).clone()
    }

    /// Stops the loop and waits for the task to exit.
    pub async fn join(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "Poll task ended abnormally");
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
