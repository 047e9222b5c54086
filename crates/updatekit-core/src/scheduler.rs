//! Periodic update checks.
//!
//! The scheduler runs one background task that checks every period and
//! publishes a single [`UpdateAvailable`] when an update shows up, then stops.
//! Checking resumes only after [`UpdateScheduler::restart`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use updatekit_platform::{ProcessEnvironment, VariableSource};

use crate::checker::UpdateChecker;
use crate::deployment::ApplicationDeployment;
use crate::error::UpdateError;

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Shorter periods, including zero, are raised to this.
pub const MIN_CHECK_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    /// Stopped after an update was found or on request.
    Stopped,
}

/// Published once per transition into "update available".
#[derive(Debug, Clone)]
pub struct UpdateAvailable<S = ProcessEnvironment> {
    pub deployment: Arc<ApplicationDeployment<S>>,
    pub current_version: String,
    pub available_version: String,
}

struct Run {
    state: SchedulerState,
    generation: u64,
    cancel: CancellationToken,
}

pub struct UpdateScheduler<S = ProcessEnvironment> {
    checker: Arc<UpdateChecker<S>>,
    period: Duration,
    events: mpsc::UnboundedSender<UpdateAvailable<S>>,
    run: Arc<Mutex<Run>>,
}

impl<S> UpdateScheduler<S>
where
    S: VariableSource + Send + Sync + 'static,
{
    /// Create a scheduler in the `Idle` state. Nothing runs until
    /// [`UpdateScheduler::start`]. `period` is at least [`MIN_CHECK_INTERVAL`].
    #[must_use]
    pub fn new(
        checker: Arc<UpdateChecker<S>>,
        period: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<UpdateAvailable<S>>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            checker,
            period: period.max(MIN_CHECK_INTERVAL),
            events,
            run: Arc::new(Mutex::new(Run {
                state: SchedulerState::Idle,
                generation: 0,
                cancel: CancellationToken::new(),
            })),
        };
        (scheduler, receiver)
    }

    /// Create a scheduler and start it right away.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn(
        checker: Arc<UpdateChecker<S>>,
        period: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<UpdateAvailable<S>>) {
        let (scheduler, receiver) = Self::new(checker, period);
        scheduler.start();
        (scheduler, receiver)
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        lock(&self.run).state
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    #[must_use]
    pub fn checker(&self) -> &Arc<UpdateChecker<S>> {
        &self.checker
    }

    /// Start checking. The first check happens one period from now.
    ///
    /// Returns `false` if the scheduler is already running.
    pub fn start(&self) -> bool {
        let mut run = lock(&self.run);
        if run.state == SchedulerState::Running {
            return false;
        }

        run.generation += 1;
        run.cancel = CancellationToken::new();
        run.state = SchedulerState::Running;

        debug!(
            "Starting update checks every {}s",
            self.period.as_secs_f64()
        );
        tokio::spawn(poll(
            Arc::clone(&self.checker),
            self.period,
            self.events.clone(),
            Arc::clone(&self.run),
            run.generation,
            run.cancel.clone(),
        ));
        true
    }

    /// Resume checking after the scheduler stopped.
    pub fn restart(&self) -> bool {
        self.start()
    }

    /// Stop checking. An in-flight check is cancelled.
    pub fn stop(&self) {
        let mut run = lock(&self.run);
        run.cancel.cancel();
        if run.state == SchedulerState::Running {
            run.state = SchedulerState::Stopped;
        }
    }
}

impl<S> Drop for UpdateScheduler<S> {
    fn drop(&mut self) {
        lock(&self.run).cancel.cancel();
    }
}

fn lock(run: &Mutex<Run>) -> MutexGuard<'_, Run> {
    run.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Moves a run from `Running` to `Stopped` if it is still the current one.
fn finish(run: &Mutex<Run>, generation: u64) -> bool {
    let mut run = lock(run);
    if run.generation != generation || run.state != SchedulerState::Running {
        return false;
    }
    run.state = SchedulerState::Stopped;
    run.cancel.cancel();
    true
}

async fn poll<S>(
    checker: Arc<UpdateChecker<S>>,
    period: Duration,
    events: mpsc::UnboundedSender<UpdateAvailable<S>>,
    run: Arc<Mutex<Run>>,
    generation: u64,
    cancel: CancellationToken,
) where
    S: VariableSource + Send + Sync + 'static,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match checker.check_for_update(&cancel).await {
            Ok(_) => {}
            Err(UpdateError::Cancelled) => break,
            Err(error) => {
                warn!("Scheduled update check failed: {error}");
                continue;
            }
        }

        let state = checker.state();
        if !state.is_update_available {
            continue;
        }

        if !finish(&run, generation) {
            break;
        }

        let notification = UpdateAvailable {
            deployment: Arc::clone(checker.deployment()),
            current_version: state
                .current_version
                .map(|version| version.to_string())
                .unwrap_or_default(),
            available_version: state
                .available_version
                .map(|version| version.to_string())
                .unwrap_or_default(),
        };
        info!(
            "Update {} found, stopping scheduled checks",
            notification.available_version
        );
        if events.send(notification).is_err() {
            debug!("Update notification dropped, no receiver");
        }
        break;
    }
}
