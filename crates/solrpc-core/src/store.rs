//! Message store for pubsub payloads.
//!
//! A subscription channel can tap every inbound frame into a store so a
//! separate consumer drains them oldest-first. The store behaves like a
//! sorted set keyed by an increasing score: appending a message that is
//! already present moves it to the newest score instead of duplicating it.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::TransportError;

/// Default time a message may sit in the store before it is dropped.
pub const DEFAULT_EXPIRATION: Duration = Duration::from_secs(10);

/// Append-only queue consumed oldest-first.
pub trait MessageStore: Send + Sync {
    /// Add a message with the next score.
    fn append(&self, message: &str) -> Result<(), TransportError>;

    /// Remove and return the oldest message with its score.
    fn pop_oldest(&self) -> Result<Option<(String, u64)>, TransportError>;

    /// Number of messages currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Entry {
    message: String,
    inserted_at: Instant,
}

#[derive(Default)]
struct StoreInner {
    by_score: BTreeMap<u64, Entry>,
    scores: HashMap<String, u64>,
    last_score: u64,
}

impl StoreInner {
    fn evict_expired(&mut self, ttl: Duration) {
        let now = Instant::now();
        while let Some((&score, entry)) = self.by_score.first_key_value() {
            if now.duration_since(entry.inserted_at) < ttl {
                break;
            }
            if let Some(entry) = self.by_score.remove(&score) {
                self.scores.remove(&entry.message);
            }
            tracing::debug!(score, "expired stored message");
        }
    }
}

/// In-memory store. All data is lost when the process exits.
pub struct InMemoryStore {
    expiration: Option<Duration>,
    inner: Mutex<StoreInner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(Some(DEFAULT_EXPIRATION))
    }
}

impl InMemoryStore {
    /// `expiration = None` keeps messages until they are popped.
    pub fn new(expiration: Option<Duration>) -> Self {
        Self {
            expiration,
            inner: Mutex::new(StoreInner::default()),
        }
    }

    /// Highest score handed out so far (0 when nothing was stored).
    pub fn highest_score(&self) -> u64 {
        self.lock().map(|inner| inner.last_score).unwrap_or(0)
    }

    /// Snapshot of stored messages, oldest first.
    pub fn messages(&self) -> Vec<(String, u64)> {
        let Ok(mut inner) = self.lock() else {
            return vec![];
        };
        if let Some(ttl) = self.expiration {
            inner.evict_expired(ttl);
        }
        inner
            .by_score
            .iter()
            .map(|(score, e)| (e.message.clone(), *score))
            .collect()
    }

    /// Drop everything.
    pub fn clear(&self) {
        if let Ok(mut inner) = self.lock() {
            inner.by_score.clear();
            inner.scores.clear();
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, StoreInner>, TransportError> {
        self.inner
            .lock()
            .map_err(|_| TransportError::Other("message store lock poisoned".into()))
    }
}

impl MessageStore for InMemoryStore {
    fn append(&self, message: &str) -> Result<(), TransportError> {
        let mut inner = self.lock()?;
        if let Some(ttl) = self.expiration {
            inner.evict_expired(ttl);
        }
        if let Some(old) = inner.scores.remove(message) {
            inner.by_score.remove(&old);
        }
        inner.last_score += 1;
        let score = inner.last_score;
        inner.scores.insert(message.to_string(), score);
        inner.by_score.insert(
            score,
            Entry {
                message: message.to_string(),
                inserted_at: Instant::now(),
            },
        );
        Ok(())
    }

    fn pop_oldest(&self) -> Result<Option<(String, u64)>, TransportError> {
        let mut inner = self.lock()?;
        if let Some(ttl) = self.expiration {
            inner.evict_expired(ttl);
        }
        let Some((score, entry)) = inner.by_score.pop_first() else {
            return Ok(None);
        };
        inner.scores.remove(&entry.message);
        Ok(Some((entry.message, score)))
    }

    fn len(&self) -> usize {
        self.lock().map(|inner| inner.by_score.len()).unwrap_or(0)
    }
}
