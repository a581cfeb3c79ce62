use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

type SlotKey = (Uuid, NaiveDate);

/// Serialises booking attempts for one doctor and date inside this process.
///
/// The store's uniqueness guarantee still decides the winner; holding the
/// guard only keeps the pre-insert conflict check accurate.
#[derive(Default)]
pub struct SlotLocks {
    locks: Mutex<HashMap<SlotKey, Arc<AsyncMutex<()>>>>,
}

impl SlotLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, doctor_id: Uuid, date: NaiveDate) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries only referenced by the map have no holder or waiter
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry((doctor_id, date)).or_default())
        };

        debug!("Waiting for booking lock on doctor {} / {}", doctor_id, date);
        lock.lock_owned().await
    }

    /// Number of (doctor, date) pairs currently tracked.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
