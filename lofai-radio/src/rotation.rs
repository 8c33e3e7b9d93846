//! Rotation store
//!
//! Holds the fixed-size slot array and the current playback index.
//!
//! The current index is a lock-free atomic so that playback fetches never
//! wait on a batch in progress. Slot contents sit behind a `RwLock`; each
//! slot is updated independently, there is no cross-slot atomicity.
//!
//! On disk a committed slot is `<audio_dir>/<index>.mp3`; writes in flight
//! use `<audio_dir>/<index>.mp3.tmp` and are published by rename.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

/// Default number of slots in the rotation
pub const DEFAULT_ROTATION_SIZE: usize = 10;

const TRACK_EXTENSION: &str = "mp3";
const TEMP_SUFFIX: &str = "tmp";

/// Availability of a single slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    /// No committed audio
    Empty,
    /// Audio is being synthesized for this slot
    Generating,
    /// Committed audio is available at the slot path
    Ready,
}

/// One rotation position
#[derive(Debug, Clone, Serialize)]
pub struct RotationSlot {
    pub index: usize,
    pub status: SlotStatus,
    /// Committed payload location (Some only while Ready)
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl RotationSlot {
    fn empty(index: usize) -> Self {
        Self {
            index,
            status: SlotStatus::Empty,
            path: None,
        }
    }
}

/// Process-wide rotation state
pub struct RotationStore {
    audio_dir: PathBuf,
    /// Fixed at construction; slots are never added or removed
    size: usize,
    current: AtomicUsize,
    slots: RwLock<Vec<RotationSlot>>,
}

impl RotationStore {
    /// Create a store with every slot Empty, without touching the filesystem
    pub fn new(audio_dir: impl Into<PathBuf>, size: usize) -> Self {
        let size = size.max(1);
        Self {
            audio_dir: audio_dir.into(),
            size,
            current: AtomicUsize::new(0),
            slots: RwLock::new((0..size).map(RotationSlot::empty).collect()),
        }
    }

    /// Open the audio directory and adopt payloads committed by a previous run
    ///
    /// Creates the directory if missing. Non-empty `<i>.mp3` files become
    /// Ready; leftover `.tmp` files are deleted.
    pub async fn open(audio_dir: impl Into<PathBuf>, size: usize) -> Result<Self> {
        let store = Self::new(audio_dir, size);
        tokio::fs::create_dir_all(&store.audio_dir).await?;

        let mut adopted = 0;
        {
            let mut slots = store.slots.write().await;
            for slot in slots.iter_mut() {
                let temp = store.temp_path(slot.index);
                if tokio::fs::try_exists(&temp).await.unwrap_or(false) {
                    debug!(slot = slot.index, "Removing stale temp file");
                    if let Err(e) = tokio::fs::remove_file(&temp).await {
                        warn!(slot = slot.index, error = %e, "Failed to remove stale temp file");
                    }
                }

                let committed = store.committed_path(slot.index);
                match tokio::fs::metadata(&committed).await {
                    Ok(meta) if meta.is_file() && meta.len() > 0 => {
                        slot.status = SlotStatus::Ready;
                        slot.path = Some(committed);
                        adopted += 1;
                    }
                    _ => {}
                }
            }
        }

        info!(
            audio_dir = %store.audio_dir.display(),
            size = store.size(),
            adopted,
            "Rotation store opened"
        );
        Ok(store)
    }

    /// Number of slots in the rotation
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Current playback index, always in `[0, size)`
    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    /// Move to the next slot, wrapping at the end of the rotation
    ///
    /// Returns the new index.
    pub fn advance(&self) -> usize {
        let size = self.size;
        let previous = self
            .current
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % size))
            .unwrap_or_else(|i| i);
        (previous + 1) % size
    }

    /// Status of a single slot
    pub async fn slot_status(&self, index: usize) -> Result<SlotStatus> {
        let slots = self.slots.read().await;
        let slot = Self::slot(&slots, index)?;
        Ok(slot.status)
    }

    /// Mark a slot as being regenerated
    pub async fn set_slot_generating(&self, index: usize) -> Result<()> {
        let mut slots = self.slots.write().await;
        let slot = Self::slot_mut(&mut slots, index)?;
        slot.status = SlotStatus::Generating;
        slot.path = None;
        Ok(())
    }

    /// Publish a committed payload for a slot
    pub async fn set_slot_ready(&self, index: usize, path: PathBuf) -> Result<()> {
        let mut slots = self.slots.write().await;
        let slot = Self::slot_mut(&mut slots, index)?;
        slot.status = SlotStatus::Ready;
        slot.path = Some(path);
        Ok(())
    }

    /// Mark a slot Empty and remove any stale committed payload
    pub async fn set_slot_empty(&self, index: usize) -> Result<()> {
        {
            let mut slots = self.slots.write().await;
            let slot = Self::slot_mut(&mut slots, index)?;
            slot.status = SlotStatus::Empty;
            slot.path = None;
        }

        let committed = self.committed_path(index);
        match tokio::fs::remove_file(&committed).await {
            Ok(()) => debug!(slot = index, "Removed stale committed payload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(slot = index, error = %e, "Failed to remove stale payload"),
        }
        Ok(())
    }

    /// Path of the committed payload, or `NotYetAvailable` unless the slot is Ready
    pub async fn ready_path(&self, index: usize) -> Result<PathBuf> {
        let slots = self.slots.read().await;
        let slot = Self::slot(&slots, index)?;
        match (&slot.status, &slot.path) {
            (SlotStatus::Ready, Some(path)) => Ok(path.clone()),
            _ => Err(Error::NotYetAvailable(index)),
        }
    }

    /// Copy of all slots, in index order
    pub async fn snapshot(&self) -> Vec<RotationSlot> {
        self.slots.read().await.clone()
    }

    /// Final location of a slot's payload
    pub fn committed_path(&self, index: usize) -> PathBuf {
        self.audio_dir.join(format!("{}.{}", index, TRACK_EXTENSION))
    }

    /// In-progress location of a slot's payload
    pub fn temp_path(&self, index: usize) -> PathBuf {
        self.audio_dir
            .join(format!("{}.{}.{}", index, TRACK_EXTENSION, TEMP_SUFFIX))
    }

    /// Reject indices outside the rotation
    pub fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.size {
            return Err(Error::SlotOutOfRange {
                index,
                size: self.size,
            });
        }
        Ok(())
    }

    fn slot(slots: &[RotationSlot], index: usize) -> Result<&RotationSlot> {
        let size = slots.len();
        slots.get(index).ok_or(Error::SlotOutOfRange { index, size })
    }

    fn slot_mut(slots: &mut [RotationSlot], index: usize) -> Result<&mut RotationSlot> {
        let size = slots.len();
        slots
            .get_mut(index)
            .ok_or(Error::SlotOutOfRange { index, size })
    }
}
