//! Playback scheduler
//!
//! Advances the rotation on a fixed period and asks for a new batch every
//! time playback wraps back to the batch boundary. Batch requests go through
//! the `GenerationQueue` and are never awaited, so a slow provider cannot
//! stall advancement.

use chrono::Utc;
use lofai_common::events::{BatchTrigger, EventBus, RadioEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::coordinator::GenerationQueue;
use crate::rotation::RotationStore;

/// Index at which a wraparound batch is requested
pub const BATCH_BOUNDARY: usize = 0;

/// Default seconds between automatic advances
pub const DEFAULT_ADVANCE_INTERVAL_SECS: u64 = 60;

/// Scheduler lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
}

struct RunningTimer {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Periodic driver of rotation advancement
pub struct PlaybackScheduler {
    store: Arc<RotationStore>,
    generation: GenerationQueue,
    event_bus: EventBus,
    /// `None` disables the timer; advancement is then client-driven
    period: Option<Duration>,
    timer: Mutex<Option<RunningTimer>>,
}

impl PlaybackScheduler {
    pub fn new(
        store: Arc<RotationStore>,
        generation: GenerationQueue,
        event_bus: EventBus,
        period: Option<Duration>,
    ) -> Self {
        Self {
            store,
            generation,
            event_bus,
            period: period.filter(|p| !p.is_zero()),
            timer: Mutex::new(None),
        }
    }

    pub async fn state(&self) -> SchedulerState {
        match *self.timer.lock().await {
            Some(_) => SchedulerState::Running,
            None => SchedulerState::Idle,
        }
    }

    /// Request the initial batch and arm the repeating timer
    ///
    /// Starting a running scheduler does nothing.
    pub async fn start(self: &Arc<Self>) {
        let mut timer = self.timer.lock().await;
        if timer.is_some() {
            debug!("Scheduler already running");
            return;
        }

        self.generation.request_batch(BatchTrigger::Startup);

        let cancel = CancellationToken::new();
        let handle = match self.period {
            Some(period) => {
                info!(period_secs = period.as_secs_f64(), "Scheduler started");
                let scheduler = Arc::clone(self);
                let token = cancel.clone();
                Some(tokio::spawn(async move {
                    scheduler.run_timer(period, token).await;
                }))
            }
            None => {
                info!("Scheduler started without timer, advancement is client-driven");
                None
            }
        };

        *timer = Some(RunningTimer { cancel, handle });
    }

    /// Cancel the timer; an in-flight batch is left to finish on its own
    pub async fn shutdown(&self) {
        let running = self.timer.lock().await.take();
        let Some(running) = running else {
            return;
        };

        running.cancel.cancel();
        if let Some(handle) = running.handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Scheduler timer task ended abnormally");
            }
        }
        info!("Scheduler stopped");
    }

    /// Advance one track now, requesting a batch on wraparound
    ///
    /// Returns the new current index.
    pub fn advance_now(&self) -> usize {
        let current = self.store.advance();
        let previous = (current + self.store.size() - 1) % self.store.size();
        info!(previous, current, "Advanced track");

        self.event_bus.emit_lossy(RadioEvent::TrackAdvanced {
            previous,
            current,
            timestamp: Utc::now(),
        });

        if current == BATCH_BOUNDARY {
            self.generation.request_batch(BatchTrigger::Wraparound);
        }
        current
    }

    async fn run_timer(&self, period: Duration, cancel: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Scheduler timer cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    self.advance_now();
                }
            }
        }
    }
}
