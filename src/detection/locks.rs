//! Keyed async locks
//!
//! One mutex per subject, created on demand and dropped again once nobody
//! holds or waits for it, so the map stays proportional to in-flight work.
//! Guards are owned, so they can be moved into a blocking task and released
//! only when that task finishes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

#[derive(Default)]
pub struct SubjectLocks {
    entries: Arc<LockMap>,
}

/// Held while a subject's critical section runs
pub struct SubjectGuard {
    entries: Arc<LockMap>,
    subject: String,
    handle: Arc<AsyncMutex<()>>,
    _guard: OwnedMutexGuard<()>,
}

impl SubjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until `subject` is free, then hold it until the guard drops
    pub async fn acquire(&self, subject: &str) -> SubjectGuard {
        let handle = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries
                .entry(subject.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        let guard = handle.clone().lock_owned().await;

        SubjectGuard {
            entries: Arc::clone(&self.entries),
            subject: subject.to_string(),
            handle,
            _guard: guard,
        }
    }

    /// Number of subjects currently locked or awaited
    pub fn active(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for SubjectGuard {
    fn drop(&mut self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        // The map, this guard's handle and the owned lock guard itself: anything
        // beyond those three is a waiter that still needs the entry
        if Arc::strong_count(&self.handle) <= 3 {
            entries.remove(&self.subject);
        }
    }
}
