//! Thread-shared engine handle.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::engine::SleepEngine;

/// Cloneable handle to one engine behind a mutex. Callers lock for the
/// duration of a single operation; snapshots are taken inside the lock and
/// returned by value, so nothing borrows across it.
#[derive(Clone)]
pub struct SharedEngine(Arc<Mutex<SleepEngine>>);

impl SharedEngine {
    pub fn new(engine: SleepEngine) -> Self {
        Self(Arc::new(Mutex::new(engine)))
    }

    pub fn lock(&self) -> parking_lot::MutexGuard<'_, SleepEngine> {
        self.0.lock()
    }
}
