/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

//! Process-wide table of live Sequencers.
//!
//! Completion reports travel with a [`SequencerHandle`] instead of a
//! reference to the Sequencer. The table maps handles to non-owning
//! references; an entry is inserted when a Sequencer is built and removed as
//! the first step of its shutdown, after which reports for that handle are
//! dropped.

use super::core::Shared;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock, Weak};

/// Opaque token identifying one Sequencer instance in the registry.
///
/// Handles are allocated from a monotonic counter and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequencerHandle(u64);

impl SequencerHandle {
    /// Raw numeric value of the handle.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SequencerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

static REGISTRY: LazyLock<DashMap<SequencerHandle, Weak<Shared>>> = LazyLock::new(DashMap::new);

/// Allocates a fresh handle without registering anything under it.
pub(crate) fn allocate() -> SequencerHandle {
    SequencerHandle(NEXT_HANDLE.fetch_add(1, Ordering::Relaxed))
}

pub(crate) fn register(handle: SequencerHandle, shared: &Arc<Shared>) {
    REGISTRY.insert(handle, Arc::downgrade(shared));
}

/// Removes `handle` from the table.
///
/// Blocks until any report currently running against this handle has
/// returned. Returns `false` if the handle was not registered.
pub(crate) fn deregister(handle: SequencerHandle) -> bool {
    REGISTRY.remove(&handle).is_some()
}

/// Runs `f` against the Sequencer registered under `handle`.
///
/// The entry guard is held for the duration of `f`, so [`deregister`] cannot
/// complete while a report is being applied. Returns `None` when the handle
/// is unknown.
pub(crate) fn with_registered<R>(handle: SequencerHandle, f: impl FnOnce(&Shared) -> R) -> Option<R> {
    let entry = REGISTRY.get(&handle)?;
    let shared = entry.value().upgrade()?;
    let result = f(&shared);
    drop(shared);
    drop(entry);
    Some(result)
}

#[cfg(test)]
pub(crate) fn is_registered(handle: SequencerHandle) -> bool {
    REGISTRY.contains_key(&handle)
}
