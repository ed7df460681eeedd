//! Snapshot / apply / commit-or-revert protocol and the per-key in-flight guard.

use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;

/// Identity of a mutable record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordKey {
    Post(String),
    User(String),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post(id) => write!(f, "post:{id}"),
            Self::User(id) => write!(f, "user:{id}"),
        }
    }
}

/// A locally applied change that the backend has not confirmed yet.
///
/// Holds the value from before the change and the value after it. Settling
/// consumes it, so a mutation is committed or reverted exactly once.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "an optimistic change must be committed or reverted"]
pub struct Optimistic<T> {
    snapshot: T,
    applied: T,
}

impl<T: Clone> Optimistic<T> {
    /// Snapshot `current` and compute the optimistic value with `apply`.
    pub fn begin(current: &T, apply: impl FnOnce(&T) -> T) -> Self {
        Self {
            snapshot: current.clone(),
            applied: apply(current),
        }
    }

    pub fn snapshot(&self) -> &T {
        &self.snapshot
    }

    pub fn applied(&self) -> &T {
        &self.applied
    }

    /// Keep the optimistic value, letting `reconcile` overwrite it with
    /// authoritative data.
    pub fn commit(self, reconcile: impl FnOnce(T) -> T) -> T {
        reconcile(self.applied)
    }

    /// Restore the exact pre-mutation value.
    pub fn revert(self) -> T {
        self.snapshot
    }
}

/// Set of keys with an outstanding mutation.
#[derive(Debug, Default)]
pub struct InFlightKeys {
    keys: Mutex<HashSet<RecordKey>>,
}

impl InFlightKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or `None` when a mutation for it is already running.
    pub fn try_begin(&self, key: RecordKey) -> Option<InFlightGuard<'_>> {
        let mut keys = self.lock();
        if !keys.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard { owner: self, key })
    }

    pub fn contains(&self, key: &RecordKey) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<RecordKey>> {
        self.keys
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Releases its key on drop, including when the owning future is cancelled.
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    owner: &'a InFlightKeys,
    key: RecordKey,
}

impl InFlightGuard<'_> {
    pub fn key(&self) -> &RecordKey {
        &self.key
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.lock().remove(&self.key);
    }
}
