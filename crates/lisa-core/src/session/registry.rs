//! Thread registry
//!
//! Maps thread ids to local handles. Owned by whoever owns the session scope
//! (the HTTP server, a terminal chat) and handed to the orchestrator.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};

/// Local view of one remote conversation thread
#[derive(Debug)]
pub struct ThreadHandle {
    id: String,
    turns: AtomicUsize,
    /// Set once the service has accepted a message on this thread
    confirmed: AtomicBool,
    /// Held for the whole submit -> poll -> fetch cycle
    submission: Mutex<()>,
}

impl ThreadHandle {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            turns: AtomicUsize::new(0),
            confirmed: AtomicBool::new(false),
            submission: Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Wait for any in-flight submission on this thread, then claim the slot
    pub async fn begin_turn(&self) -> TurnGuard<'_> {
        let guard = self.submission.lock().await;
        let turn = self.turns.fetch_add(1, Ordering::Relaxed) + 1;
        TurnGuard {
            _guard: guard,
            turn,
        }
    }

    pub fn confirm(&self) {
        self.confirmed.store(true, Ordering::Relaxed);
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed.load(Ordering::Relaxed)
    }
}

/// Exclusive right to submit on a thread until dropped
pub struct TurnGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    turn: usize,
}

impl TurnGuard<'_> {
    pub fn turn(&self) -> usize {
        self.turn
    }
}

/// Registry of thread handles, read-mostly after creation
#[derive(Debug, Default)]
pub struct ThreadRegistry {
    threads: DashMap<String, Arc<ThreadHandle>>,
}

impl ThreadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the handle for `id`, registering it on first use
    pub fn get_or_insert(&self, id: &str) -> Arc<ThreadHandle> {
        if let Some(handle) = self.threads.get(id) {
            return Arc::clone(handle.value());
        }
        let handle = self
            .threads
            .entry(id.to_string())
            .or_insert_with(|| Arc::new(ThreadHandle::new(id)));
        Arc::clone(handle.value())
    }

    /// Drop `id` if the service never accepted a message on it and no
    /// submission still holds its handle
    pub fn forget_unconfirmed(&self, id: &str) -> bool {
        self.threads
            .remove_if(id, |_, handle| {
                !handle.is_confirmed() && Arc::strong_count(handle) == 1
            })
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}
