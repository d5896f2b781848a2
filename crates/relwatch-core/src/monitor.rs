//! Recurring release checks with observable state.
//!
//! An [`UpdateMonitor`] owns one schedule at a time. Each tick fetches the
//! latest release, compares its tag to the baseline version and publishes:
//! - field-level [`StateChanged`] events on [`UpdateMonitor::subscribe_changes`],
//! - fetch failures on [`UpdateMonitor::subscribe_errors`],
//! - the optional update callback, after the state update, on every tick
//!   whose tag differs from the baseline (level-triggered).
//!
//! Failures never end the schedule; the next tick simply runs at the normal
//! interval.

mod state;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use log::{debug, info};
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::checker::ReleaseChecker;
use crate::error::{FetchError, MonitorError};
use crate::release::Release;

pub use state::{FieldValue, MonitorState, StateChanged, StateField};

/// Shortest accepted polling period; the releases API rate-limits
/// unauthenticated clients.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

const EVENT_CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollInterval {
    Every(Duration),
    /// Check once when monitoring starts; later checks only via
    /// [`UpdateMonitor::check_now`].
    Infinite,
}

impl Default for PollInterval {
    fn default() -> Self {
        Self::Every(DEFAULT_POLL_INTERVAL)
    }
}

impl PollInterval {
    /// # Errors
    /// [`MonitorError::InvalidInterval`] for a finite period shorter than
    /// [`MIN_POLL_INTERVAL`].
    pub fn validate(self) -> Result<Self, MonitorError> {
        match self {
            Self::Every(interval) if interval < MIN_POLL_INTERVAL => {
                Err(MonitorError::InvalidInterval {
                    interval,
                    minimum: MIN_POLL_INTERVAL,
                })
            }
            _ => Ok(self),
        }
    }
}

pub type UpdateCallback = Arc<dyn Fn(&Release) + Send + Sync>;

/// Result of a single tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    UpToDate,
    UpdateAvailable(Release),
    Failed(FetchError),
    /// Another tick was still running.
    Skipped,
    /// The schedule was stopped or replaced while the fetch was in flight;
    /// nothing was applied.
    Discarded,
}

struct ActiveSchedule {
    baseline: String,
    on_update: Option<UpdateCallback>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct Schedule {
    generation: u64,
    active: Option<ActiveSchedule>,
}

struct Shared {
    checker: ReleaseChecker,
    schedule: Mutex<Schedule>,
    state: watch::Sender<MonitorState>,
    changes: broadcast::Sender<StateChanged>,
    errors: broadcast::Sender<FetchError>,
    /// Held for the whole of a tick, update callback included.
    tick_lock: tokio::sync::Mutex<()>,
}

impl Shared {
    fn lock_schedule(&self) -> MutexGuard<'_, Schedule> {
        self.schedule.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active_for(&self, generation: u64) -> Option<(String, Option<UpdateCallback>)> {
        let schedule = self.lock_schedule();
        match &schedule.active {
            Some(active) if schedule.generation == generation => {
                Some((active.baseline.clone(), active.on_update.clone()))
            }
            _ => None,
        }
    }

    /// Scheduled ticks queue behind a tick already in flight, so a schedule
    /// started mid-fetch still gets its first check.
    async fn scheduled_tick(&self, generation: u64) -> TickOutcome {
        let _running = self.tick_lock.lock().await;
        self.run_tick(generation).await
    }

    async fn manual_tick(&self, generation: u64) -> TickOutcome {
        let Ok(_running) = self.tick_lock.try_lock() else {
            debug!("Release check already in flight, skipping manual check");
            return TickOutcome::Skipped;
        };
        self.run_tick(generation).await
    }

    async fn run_tick(&self, generation: u64) -> TickOutcome {
        let Some((baseline, on_update)) = self.active_for(generation) else {
            return TickOutcome::Discarded;
        };

        let result = self.checker.fetch_latest().await;

        {
            let schedule = self.lock_schedule();
            if schedule.generation != generation || schedule.active.is_none() {
                debug!("Discarding result of release check from stopped schedule {generation}");
                return TickOutcome::Discarded;
            }
            self.apply(&result, &baseline);
        }

        match result {
            Ok(release) if release.version != baseline => {
                info!(
                    "Update available: {} (current {baseline}) at {}",
                    release.version, release.permalink
                );
                if let Some(on_update) = &on_update {
                    on_update(&release);
                }
                TickOutcome::UpdateAvailable(release)
            }
            Ok(release) => {
                debug!("Release {} matches current version", release.version);
                TickOutcome::UpToDate
            }
            Err(error) => TickOutcome::Failed(error),
        }
    }

    /// Fold one fetch result into the state and publish the resulting
    /// events. Callers hold the schedule lock. A failure is published before
    /// the state changes so that state watchers can read it.
    fn apply(&self, result: &Result<Release, FetchError>, baseline: &str) {
        if let Err(error) = result {
            debug!("Release check failed: {error}");
            let _ = self.errors.send(error.clone());
        }

        let now = Utc::now();
        let mut changes = Vec::new();

        self.state.send_if_modified(|current| {
            let before = current.clone();
            match result {
                Ok(release) if release.version != baseline => {
                    current.update_available = true;
                    current.update_url = Some(release.permalink.clone());
                }
                Ok(_) => {
                    current.update_available = false;
                    current.update_url = None;
                }
                Err(_) => {}
            }
            current.last_checked = Some(current.last_checked.map_or(now, |last| last.max(now)));
            changes = state::diff(&before, current);
            !changes.is_empty()
        });

        for change in changes {
            debug!("{:?} changed: {} -> {}", change.field, change.old, change.new);
            let _ = self.changes.send(change);
        }
    }
}

async fn run_schedule(
    shared: Arc<Shared>,
    generation: u64,
    interval: PollInterval,
    cancel: CancellationToken,
) {
    let PollInterval::Every(period) = interval else {
        if !cancel.is_cancelled() {
            shared.scheduled_tick(generation).await;
        }
        return;
    };

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                shared.scheduled_tick(generation).await;
            }
        }
    }
    debug!("Release check schedule {generation} ended");
}

/// Polls a repository for releases newer than a baseline version.
///
/// Dropping the monitor stops its schedule.
pub struct UpdateMonitor {
    shared: Arc<Shared>,
}

impl UpdateMonitor {
    #[must_use]
    pub fn new(checker: ReleaseChecker) -> Self {
        let initial = MonitorState {
            account: checker.account().map(ToString::to_string),
            repository: checker.repository().map(ToString::to_string),
            ..MonitorState::default()
        };
        let (changes, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (errors, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            shared: Arc::new(Shared {
                checker,
                schedule: Mutex::new(Schedule::default()),
                state: watch::Sender::new(initial),
                changes,
                errors,
                tick_lock: tokio::sync::Mutex::new(()),
            }),
        }
    }

    #[must_use]
    pub fn checker(&self) -> &ReleaseChecker {
        &self.shared.checker
    }

    #[must_use]
    pub fn release_api_url(&self, release_id: &str) -> String {
        self.shared.checker.release_api_url(release_id)
    }

    /// Fetch a release directly, outside the schedule. Errors are returned to
    /// the caller and not published on the error channel.
    ///
    /// # Errors
    /// See [`ReleaseChecker::fetch_release`].
    pub async fn fetch_release(&self, release_id: &str) -> Result<Release, FetchError> {
        self.shared.checker.fetch_release(release_id).await
    }

    /// Start checking for releases newer than `baseline_version`, replacing
    /// any schedule already running. The first check runs immediately.
    ///
    /// # Errors
    /// [`MonitorError::InvalidInterval`] for a finite interval under
    /// [`MIN_POLL_INTERVAL`], [`MonitorError::NoRuntime`] outside a Tokio
    /// runtime. Nothing is started or stopped on error.
    pub fn start(
        &self,
        baseline_version: impl Into<String>,
        on_update: Option<UpdateCallback>,
        interval: PollInterval,
    ) -> Result<(), MonitorError> {
        let interval = interval.validate()?;
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| MonitorError::NoRuntime)?;
        let baseline = baseline_version.into();
        let cancel = CancellationToken::new();

        let generation = {
            let mut schedule = self.shared.lock_schedule();
            if let Some(previous) = schedule.active.take() {
                debug!("Replacing release check schedule {}", schedule.generation);
                previous.cancel.cancel();
            }
            schedule.generation += 1;
            schedule.active = Some(ActiveSchedule {
                baseline: baseline.clone(),
                on_update,
                cancel: cancel.clone(),
            });
            self.shared.state.send_modify(|state| {
                state.baseline_version = Some(baseline.clone());
                state.interval = Some(interval);
            });
            schedule.generation
        };

        info!(
            "Monitoring {} for releases newer than {baseline} ({interval:?})",
            self.shared.checker.release_api_url(crate::checker::LATEST_RELEASE)
        );
        runtime.spawn(run_schedule(
            Arc::clone(&self.shared),
            generation,
            interval,
            cancel,
        ));
        Ok(())
    }

    /// Cancel the active schedule. Once this returns no new tick starts and
    /// a tick still fetching has its result discarded, callback included.
    /// Idempotent.
    pub fn stop(&self) {
        let mut schedule = self.shared.lock_schedule();
        if let Some(active) = schedule.active.take() {
            active.cancel.cancel();
            schedule.generation += 1;
            info!("Stopped monitoring for releases");
        }
    }

    #[must_use]
    pub fn is_monitoring(&self) -> bool {
        self.shared.lock_schedule().active.is_some()
    }

    /// Run one tick now against the active schedule. Returns
    /// [`TickOutcome::Skipped`] rather than waiting when a tick is in flight.
    ///
    /// # Errors
    /// [`MonitorError::NotMonitoring`] when no schedule is active.
    pub async fn check_now(&self) -> Result<TickOutcome, MonitorError> {
        let generation = {
            let schedule = self.shared.lock_schedule();
            if schedule.active.is_none() {
                return Err(MonitorError::NotMonitoring);
            }
            schedule.generation
        };
        Ok(self.shared.manual_tick(generation).await)
    }

    /// Wait until no tick is in flight. A tick whose result was applied has
    /// also finished its update callback once this returns.
    pub async fn wait_idle(&self) {
        drop(self.shared.tick_lock.lock().await);
    }

    #[must_use]
    pub fn state(&self) -> MonitorState {
        self.shared.state.borrow().clone()
    }

    /// Receiver that always holds the latest [`MonitorState`].
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<MonitorState> {
        self.shared.state.subscribe()
    }

    #[must_use]
    pub fn subscribe_changes(&self) -> broadcast::Receiver<StateChanged> {
        self.shared.changes.subscribe()
    }

    #[must_use]
    pub fn subscribe_errors(&self) -> broadcast::Receiver<FetchError> {
        self.shared.errors.subscribe()
    }
}

impl Drop for UpdateMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
