use guildplan_libs::{Room, RoomStore};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error};

#[derive(Serialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    #[serde(rename = "saving")]
    Saving,
    #[serde(rename = "ok")]
    Saved,
    #[serde(rename = "error")]
    Failed,
}

/// Cancels a scheduled save that has not fired yet
#[derive(Debug, Clone)]
pub struct SaveHandle {
    cancelled: Arc<AtomicBool>,
}

impl SaveHandle {
    fn new() -> Self {
        SaveHandle {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn same(&self, other: &SaveHandle) -> bool {
        Arc::ptr_eq(&self.cancelled, &other.cancelled)
    }
}

/// Coalesces bursts of edits into one write per room.
///
/// Every `schedule` call cancels the pending save of that slug and starts a
/// new timer, so only the last room handed in within the window is written.
#[derive(Clone)]
pub struct DebouncedSaver {
    store: Arc<dyn RoomStore>,
    delay: Duration,
    pending: Arc<Mutex<HashMap<String, SaveHandle>>>,
    status: Arc<Mutex<HashMap<String, SaveStatus>>>,
}

impl DebouncedSaver {
    pub fn new(store: Arc<dyn RoomStore>, delay: Duration) -> DebouncedSaver {
        DebouncedSaver {
            store,
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            status: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn status(&self, slug: &str) -> Option<SaveStatus> {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(slug)
            .copied()
    }

    fn set_status(&self, slug: &str, status: SaveStatus) {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slug.to_string(), status);
    }

    /// Whether `slug` has a save waiting on its timer or still writing
    pub fn is_pending(&self, slug: &str) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(slug)
    }

    /// Drops the last save status of `slug`
    pub fn forget(&self, slug: &str) {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(slug);
    }

    /// Removes `handle` from the pending saves if no newer one replaced it.
    /// Returns whether it was still the latest.
    fn settle(&self, slug: &str, handle: &SaveHandle) -> bool {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.get(slug) {
            Some(latest) if latest.same(handle) => {
                pending.remove(slug);
                true
            }
            _ => false,
        }
    }

    /// Must be called from within a tokio runtime
    pub fn schedule(&self, slug: &str, room: Room) -> SaveHandle {
        let handle = SaveHandle::new();
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(slug.to_string(), handle.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        self.set_status(slug, SaveStatus::Saving);

        let saver = self.clone();
        let slug = slug.to_string();
        let timer = handle.clone();

        tokio::spawn(async move {
            sleep(saver.delay).await;
            if timer.is_cancelled() {
                saver.settle(&slug, &timer);
                return;
            }

            let store = Arc::clone(&saver.store);
            let target = slug.clone();
            let result = tokio::task::spawn_blocking(move || store.save(&target, &room)).await;

            let status = match result {
                Ok(Ok(())) => {
                    debug!("saved room {}", slug);
                    SaveStatus::Saved
                }
                Ok(Err(e)) => {
                    error!("saving room {} failed: {}", slug, e);
                    SaveStatus::Failed
                }
                Err(e) => {
                    error!("save task for room {} did not finish: {}", slug, e);
                    SaveStatus::Failed
                }
            };

            // a newer edit keeps the room in `saving`
            if saver.settle(&slug, &timer) {
                saver.set_status(&slug, status);
            }
        });

        handle
    }
}
