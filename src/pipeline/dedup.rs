//! Per-thread serialisation and answered-message ledger.
//!
//! Two triggers for the same thread never run concurrently, and a message
//! that already received a reply is not answered again.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::OwnedMutexGuard;

/// Answered pairs remembered before the oldest are forgotten.
pub const DEFAULT_LEDGER_CAPACITY: usize = 10_000;

type Key = (String, String);

pub struct ThreadGate {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    ledger: Mutex<Ledger>,
}

struct Ledger {
    order: VecDeque<Key>,
    seen: HashSet<Key>,
    capacity: usize,
}

/// Exclusive access to one thread until dropped.
pub struct ThreadPermit<'a> {
    gate: &'a ThreadGate,
    thread_id: String,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

fn relock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ThreadGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            ledger: Mutex::new(Ledger {
                order: VecDeque::new(),
                seen: HashSet::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Wait for exclusive access to `thread_id`.
    pub async fn lock(&self, thread_id: &str) -> ThreadPermit<'_> {
        let lock = {
            let mut locks = relock(&self.locks);
            Arc::clone(locks.entry(thread_id.to_string()).or_default())
        };
        let guard = Arc::clone(&lock).lock_owned().await;
        ThreadPermit {
            gate: self,
            thread_id: thread_id.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    /// Record `(thread_id, message_id)` as answered. False if it already was.
    pub fn claim(&self, thread_id: &str, message_id: &str) -> bool {
        let key = (thread_id.to_string(), message_id.to_string());
        let mut ledger = relock(&self.ledger);
        if ledger.seen.contains(&key) {
            return false;
        }
        if ledger.order.len() >= ledger.capacity {
            if let Some(oldest) = ledger.order.pop_front() {
                ledger.seen.remove(&oldest);
            }
        }
        ledger.seen.insert(key.clone());
        ledger.order.push_back(key);
        true
    }

    /// Forget a claim so a later trigger may retry.
    pub fn release(&self, thread_id: &str, message_id: &str) {
        let key = (thread_id.to_string(), message_id.to_string());
        let mut ledger = relock(&self.ledger);
        if ledger.seen.remove(&key) {
            ledger.order.retain(|k| k != &key);
        }
    }

    pub fn is_answered(&self, thread_id: &str, message_id: &str) -> bool {
        let key = (thread_id.to_string(), message_id.to_string());
        relock(&self.ledger).seen.contains(&key)
    }

    /// Threads with a live lock entry.
    pub fn active_threads(&self) -> usize {
        relock(&self.locks).len()
    }
}

impl Default for ThreadGate {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_CAPACITY)
    }
}

impl Drop for ThreadPermit<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = relock(&self.gate.locks);
        // Only the map and this permit hold the lock: nobody is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.thread_id);
        }
    }
}
