//! Module `locks`
//!
//! Provides a registry of per-path exclusive locks used to serialize writers
//! touching the same file. Entries are created on first use and removed as soon
//! as no thread holds or waits for them, so the map only ever contains paths
//! that are currently in use.

use log::{debug, error};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crate::error::StorageError;

/// Ownership and queue length of a single key.
#[derive(Default)]
struct LockState {
    owner: Option<ThreadId>,
    // Threads holding or waiting for the lock. Only changed under the map lock.
    queued: usize,
}

#[derive(Default)]
struct LockEntry {
    state: Mutex<LockState>,
    released: Condvar,
}

/// Maps canonical path strings to reference-counted exclusive locks.
///
/// Lock order is always the registry map first, then an entry's state. A
/// thread blocked waiting for a key holds neither.
#[derive(Default)]
pub struct LockRegistry {
    entries: Mutex<HashMap<String, Arc<LockEntry>>>,
}

fn lock_ignoring_poison<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        lock_ignoring_poison(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Blocks the calling thread until it owns `key`.
    pub fn acquire(&self, key: &str) -> Result<(), StorageError> {
        self.acquire_timeout(key, None)
    }

    /// Like [`acquire`](Self::acquire), but gives up after `timeout` with
    /// [`StorageError::LockTimeout`]. `None` waits forever.
    ///
    /// Locks are not reentrant: acquiring a key the calling thread already
    /// owns waits on itself.
    pub fn acquire_timeout(&self, key: &str, timeout: Option<Duration>) -> Result<(), StorageError> {
        // Insert-or-reuse and the queue increment happen under the map lock,
        // so a concurrent release cannot drop the entry we are about to use.
        let entry = {
            let mut entries = lock_ignoring_poison(&self.entries);
            let entry = Arc::clone(entries.entry(key.to_string()).or_default());
            lock_ignoring_poison(&entry.state).queued += 1;
            entry
        };

        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut state = lock_ignoring_poison(&entry.state);

        while state.owner.is_some() {
            match deadline {
                None => {
                    state = entry
                        .released
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        drop(state);
                        self.abandon(key, &entry);
                        debug!("Gave up waiting for lock on path: {key}");
                        return Err(StorageError::LockTimeout(key.to_string()));
                    }
                    let (guard, _) = entry
                        .released
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner);
                    state = guard;
                }
            }
        }

        state.owner = Some(thread::current().id());
        debug!("Lock acquired for path: {key}");
        Ok(())
    }

    /// Releases `key`. Fails with [`StorageError::UnheldLock`] unless the
    /// calling thread owns it.
    pub fn release(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = lock_ignoring_poison(&self.entries);
        let entry = entries
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::UnheldLock(key.to_string()))?;

        let mut state = lock_ignoring_poison(&entry.state);
        if state.owner != Some(thread::current().id()) {
            return Err(StorageError::UnheldLock(key.to_string()));
        }

        state.owner = None;
        state.queued -= 1;
        if state.queued == 0 {
            // Nobody can start waiting while we hold the map lock
            entries.remove(key);
        }
        drop(state);
        drop(entries);

        // Wake every waiter: one of them may be about to time out instead of
        // taking the lock.
        entry.released.notify_all();
        debug!("Lock released for path: {key}");
        Ok(())
    }

    /// Acquires `key` and returns a guard that releases it when dropped.
    pub fn lock(&self, key: &str, timeout: Option<Duration>) -> Result<PathLockGuard<'_>, StorageError> {
        self.acquire_timeout(key, timeout)?;
        Ok(PathLockGuard {
            registry: self,
            key: key.to_string(),
            _not_send: PhantomData,
        })
    }

    /// Undoes the queue increment of a waiter that timed out.
    fn abandon(&self, key: &str, entry: &Arc<LockEntry>) {
        let mut entries = lock_ignoring_poison(&self.entries);
        let mut state = lock_ignoring_poison(&entry.state);
        state.queued -= 1;
        if state.queued == 0 {
            if let Some(current) = entries.get(key) {
                if Arc::ptr_eq(current, entry) {
                    entries.remove(key);
                }
            }
        }
    }
}

/// Owns a key in a [`LockRegistry`] until dropped.
///
/// Ownership is tracked per thread, so the guard cannot be sent elsewhere.
pub struct PathLockGuard<'a> {
    registry: &'a LockRegistry,
    key: String,
    _not_send: PhantomData<*const ()>,
}

impl PathLockGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for PathLockGuard<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.registry.release(&self.key) {
            error!("Failed to release lock for {}: {e}", self.key);
        }
    }
}
