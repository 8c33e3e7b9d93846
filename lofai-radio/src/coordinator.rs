//! Regeneration coordinator
//!
//! Regenerates every slot of the rotation from the current preference. At
//! most one batch runs at a time: the batch lock is a `tokio::sync::Mutex`
//! and a second caller waits for the first batch to finish instead of
//! cancelling it.
//!
//! Slots are synthesized one after another in index order. A failed slot is
//! logged, left Empty and skipped; the batch runs to the end. The exception
//! is a rejected credential: it is a configuration error, so the batch stops,
//! the slot keeps its previous audio and generation stays disabled for the
//! rest of the process.
//!
//! `GenerationQueue` is the bounded front door used by the scheduler and the
//! HTTP API: a single worker task drains a channel of capacity one, so
//! overlapping triggers collapse into at most one pending batch.

use chrono::Utc;
use lofai_common::events::{BatchTrigger, EventBus, RadioEvent};
use serde::Serialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::prompt::PreferenceStore;
use crate::rotation::RotationStore;
use crate::synthesis::{AudioSynthesizer, SynthesisError};

/// Outcome of one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub trigger: BatchTrigger,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_slots: Vec<usize>,
}

impl BatchReport {
    fn new(trigger: BatchTrigger) -> Self {
        Self {
            trigger,
            succeeded: 0,
            failed: 0,
            failed_slots: Vec::new(),
        }
    }
}

/// Owns the generation lock and drives per-slot synthesis
pub struct RegenerationCoordinator {
    store: Arc<RotationStore>,
    preferences: Arc<PreferenceStore>,
    synthesizer: Arc<dyn AudioSynthesizer>,
    event_bus: EventBus,
    batch_lock: Mutex<()>,
    /// Cleared for good once the provider rejects the credential
    enabled: Arc<AtomicBool>,
}

impl RegenerationCoordinator {
    pub fn new(
        store: Arc<RotationStore>,
        preferences: Arc<PreferenceStore>,
        synthesizer: Arc<dyn AudioSynthesizer>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            preferences,
            synthesizer,
            event_bus,
            batch_lock: Mutex::new(()),
            enabled: Arc::new(AtomicBool::new(true)),
        }
    }

    /// False once the provider has rejected the credential
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Regenerate every slot in index order
    ///
    /// Waits for any batch already in progress. Never fails: per-slot errors
    /// are counted in the returned report.
    pub async fn generate_batch(&self, trigger: BatchTrigger) -> BatchReport {
        let _guard = self.batch_lock.lock().await;

        if !self.is_enabled() {
            debug!(%trigger, "Generation disabled, skipping batch");
            return BatchReport::new(trigger);
        }

        // One prompt for the whole batch; later preference changes apply to the next one
        let request = self.preferences.current().await;
        let prompt = request.prompt();

        info!(
            %trigger,
            mood = %request.mood,
            instrument = %request.instrument,
            slots = self.store.size(),
            provider = self.synthesizer.provider_name(),
            "Starting batch generation"
        );
        self.event_bus.emit_lossy(RadioEvent::BatchStarted {
            trigger,
            timestamp: Utc::now(),
        });

        let mut report = BatchReport::new(trigger);

        for index in 0..self.store.size() {
            match self.generate_slot(index, &prompt).await {
                Ok(()) => {
                    report.succeeded += 1;
                    info!(slot = index, "Track saved");
                    self.event_bus.emit_lossy(RadioEvent::SlotReady {
                        index,
                        timestamp: Utc::now(),
                    });
                }
                Err(Error::Synthesis(SynthesisError::InvalidApiKey)) => {
                    report.failed += 1;
                    report.failed_slots.push(index);
                    self.restore_slot(index).await;
                    self.disable("synthesis provider rejected the API key");
                    break;
                }
                Err(e) => {
                    report.failed += 1;
                    report.failed_slots.push(index);
                    error!(slot = index, error = %e, "Failed to generate track");
                    self.discard_slot(index).await;
                    self.event_bus.emit_lossy(RadioEvent::SlotFailed {
                        index,
                        error: e.to_string(),
                        timestamp: Utc::now(),
                    });
                }
            }
        }

        info!(
            %trigger,
            succeeded = report.succeeded,
            failed = report.failed,
            "Finished batch generation"
        );
        self.event_bus.emit_lossy(RadioEvent::BatchCompleted {
            succeeded: report.succeeded,
            failed: report.failed,
            timestamp: Utc::now(),
        });

        report
    }

    /// Synthesize one slot and publish it atomically
    async fn generate_slot(&self, index: usize, prompt: &str) -> Result<()> {
        self.store.set_slot_generating(index).await?;
        debug!(slot = index, "Generating track");

        let audio = self.synthesizer.synthesize(prompt).await?;
        if audio.is_empty() {
            return Err(Error::Internal("provider returned an empty payload".to_string()));
        }

        let temp = self.store.temp_path(index);
        let committed = self.store.committed_path(index);
        write_then_rename(&temp, &committed, &audio).await?;

        self.store.set_slot_ready(index, committed).await
    }

    /// Drop any partial artifact and leave the slot Empty
    async fn discard_slot(&self, index: usize) {
        let temp = self.store.temp_path(index);
        match tokio::fs::remove_file(&temp).await {
            Ok(()) => debug!(slot = index, "Removed partial temp file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(slot = index, error = %e, "Failed to remove temp file"),
        }

        if let Err(e) = self.store.set_slot_empty(index).await {
            warn!(slot = index, error = %e, "Failed to mark slot empty");
        }
    }

    /// Put a slot back to whatever is committed on disk
    async fn restore_slot(&self, index: usize) {
        let committed = self.store.committed_path(index);
        let has_payload = tokio::fs::metadata(&committed)
            .await
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false);

        let result = if has_payload {
            self.store.set_slot_ready(index, committed).await
        } else {
            self.store.set_slot_empty(index).await
        };
        if let Err(e) = result {
            warn!(slot = index, error = %e, "Failed to restore slot");
        }
    }

    /// Stop all further generation, reporting it once
    fn disable(&self, reason: &str) {
        if self.enabled.swap(false, Ordering::AcqRel) {
            error!(reason, "Configuration error, music generation disabled");
            self.event_bus.emit_lossy(RadioEvent::GenerationDisabled {
                reason: reason.to_string(),
                timestamp: Utc::now(),
            });
        }
    }
}

/// Persist to a temporary file, then rename over the committed path
async fn write_then_rename(temp: &Path, committed: &Path, payload: &[u8]) -> Result<()> {
    if let Some(parent) = committed.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(temp, payload).await?;
    tokio::fs::rename(temp, committed).await?;
    Ok(())
}

/// Bounded handle for requesting background batches
///
/// Cloning is cheap. A disabled queue (no synthesis credential, or one the
/// provider rejected) ignores every request.
#[derive(Clone)]
pub struct GenerationQueue {
    tx: Option<mpsc::Sender<BatchTrigger>>,
    enabled: Arc<AtomicBool>,
}

impl GenerationQueue {
    /// Queue with room for one pending trigger, plus its receiving end
    pub fn channel() -> (Self, mpsc::Receiver<BatchTrigger>) {
        Self::channel_with_flag(Arc::new(AtomicBool::new(true)))
    }

    fn channel_with_flag(enabled: Arc<AtomicBool>) -> (Self, mpsc::Receiver<BatchTrigger>) {
        let (tx, rx) = mpsc::channel(1);
        (
            Self {
                tx: Some(tx),
                enabled,
            },
            rx,
        )
    }

    /// Queue that never runs anything
    pub fn disabled() -> Self {
        Self {
            tx: None,
            enabled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the worker task that runs queued batches on the coordinator
    ///
    /// The queue shares the coordinator's enabled flag, so it stops
    /// accepting work once the coordinator disables generation.
    pub fn spawn(coordinator: Arc<RegenerationCoordinator>) -> (Self, JoinHandle<()>) {
        let (queue, mut rx) = Self::channel_with_flag(Arc::clone(&coordinator.enabled));

        let handle = tokio::spawn(async move {
            info!("Generation worker started");
            while let Some(trigger) = rx.recv().await {
                let report = coordinator.generate_batch(trigger).await;
                debug!(?report, "Generation worker finished batch");
            }
            info!("Generation worker stopped");
        });

        (queue, handle)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
            && self.tx.as_ref().map(|tx| !tx.is_closed()).unwrap_or(false)
    }

    /// Ask for a batch without waiting for it
    ///
    /// Returns `true` if the request was queued. A request made while another
    /// is still pending is coalesced into it and returns `false`.
    pub fn request_batch(&self, trigger: BatchTrigger) -> bool {
        let Some(tx) = self.tx.as_ref().filter(|_| self.enabled.load(Ordering::Acquire)) else {
            debug!(%trigger, "Generation disabled, ignoring batch request");
            return false;
        };

        match tx.try_send(trigger) {
            Ok(()) => {
                info!(%trigger, "Batch generation requested");
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(%trigger, "Batch already pending, request coalesced");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(%trigger, "Generation worker has stopped, request dropped");
                false
            }
        }
    }
}
