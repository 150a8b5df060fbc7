//! A Single Cache Shard
//!
//! A shard owns a bounded map from key to [`Entry`] plus the recency order of
//! those keys. It is not synchronized by itself; the engine wraps every shard
//! in its own mutex and only ever calls into a shard while holding that lock.
//!
//! Every operation takes the current `Instant` explicitly. The engine passes
//! `Instant::now()`; tests pass synthetic instants to step through time.
//!
//! ## Expiry
//!
//! Expiry is lazy: an expired entry is only discovered (and purged) when it is
//! looked up. Until then it keeps its slot, so it can push a live entry out
//! through LRU eviction.

use crate::storage::lru::{LruList, NodeId};
use bytes::Bytes;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// A stored value and its metadata.
#[derive(Debug, Clone)]
pub struct Entry {
    /// The stored bytes. Immutable once stored.
    pub value: Bytes,
    /// Opaque client flags, returned verbatim
    pub flags: u32,
    /// Time-to-live in seconds measured from the last access (0 = never expires)
    pub ttl: u64,
    /// When this value was stored
    pub created_at: Instant,
    /// Last read or touch
    pub accessed_at: Instant,
    /// When this entry expires (None = never expires)
    pub expires_at: Option<Instant>,
}

impl Entry {
    pub fn new(value: Bytes, flags: u32, ttl: u64, now: Instant) -> Self {
        Self {
            value,
            flags,
            ttl,
            created_at: now,
            accessed_at: now,
            expires_at: deadline(now, ttl),
        }
    }

    /// Checks if this entry has expired at `now`.
    #[inline]
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }

    /// Records an access at `now`, sliding the expiry window forward.
    pub fn refresh(&mut self, now: Instant) {
        self.accessed_at = now;
        self.expires_at = deadline(now, self.ttl);
    }

    /// Replaces the ttl and restarts the expiry window at `now`.
    pub fn retime(&mut self, ttl: u64, now: Instant) {
        self.ttl = ttl;
        self.refresh(now);
    }
}

/// `now + ttl`, or `None` for "never". A deadline past the clock's range
/// also means never.
fn deadline(now: Instant, ttl: u64) -> Option<Instant> {
    if ttl == 0 {
        return None;
    }
    now.checked_add(Duration::from_secs(ttl))
}

#[derive(Debug)]
struct Slot {
    node: NodeId,
    entry: Entry,
}

/// Result of a shard lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Hit { value: Bytes, flags: u32 },
    Miss,
    /// The key was present but had expired; it has been purged.
    Expired,
}

/// What `delete` and `touch` found for a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Found,
    Absent,
    /// Present but expired; purged and treated as absent.
    Expired,
}

impl Presence {
    pub fn is_found(self) -> bool {
        matches!(self, Presence::Found)
    }
}

/// Result of a shard store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stored {
    /// True if the key did not exist before
    pub inserted: bool,
    /// Number of least-recently-used entries evicted to make room
    pub evicted: usize,
}

/// One independently-locked partition of the key space.
#[derive(Debug)]
pub struct Shard {
    capacity: usize,
    map: HashMap<String, Slot>,
    recency: LruList,
}

impl Shard {
    /// Creates an empty shard holding at most `capacity` entries.
    ///
    /// Storage is allocated lazily; an idle shard costs only a few words.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::new(),
            recency: LruList::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Looks up `key`, refreshing and promoting it on a hit.
    pub fn get(&mut self, key: &str, now: Instant) -> Lookup {
        let Some(slot) = self.map.get_mut(key) else {
            return Lookup::Miss;
        };

        if slot.entry.is_expired(now) {
            self.purge(key);
            return Lookup::Expired;
        }

        slot.entry.refresh(now);
        let node = slot.node;
        let hit = Lookup::Hit {
            value: slot.entry.value.clone(),
            flags: slot.entry.flags,
        };
        self.recency.move_to_front(node);
        hit
    }

    /// Stores `value` under `key` as the most recently used entry.
    ///
    /// An existing entry is replaced in place. A new entry may push the shard
    /// over capacity, in which case least-recently-used entries are evicted
    /// until it fits again.
    pub fn set(&mut self, key: &str, value: Bytes, ttl: u64, flags: u32, now: Instant) -> Stored {
        let entry = Entry::new(value, flags, ttl, now);

        if let Some(slot) = self.map.get_mut(key) {
            slot.entry = entry;
            let node = slot.node;
            self.recency.move_to_front(node);
            debug_assert!(self.is_consistent());
            return Stored {
                inserted: false,
                evicted: 0,
            };
        }

        let node = self.recency.push_front(key.to_owned());
        self.map.insert(key.to_owned(), Slot { node, entry });

        let mut evicted = 0;
        while self.map.len() > self.capacity {
            match self.recency.pop_back() {
                Some(oldest) => {
                    self.map.remove(&oldest);
                    evicted += 1;
                }
                None => break,
            }
        }
        debug_assert!(self.is_consistent());

        Stored {
            inserted: true,
            evicted,
        }
    }

    /// Removes `key`. The value is dropped, not reused.
    pub fn delete(&mut self, key: &str, now: Instant) -> Presence {
        match self.map.remove(key) {
            Some(slot) => {
                self.recency.remove(slot.node);
                debug_assert!(self.is_consistent());
                if slot.entry.is_expired(now) {
                    Presence::Expired
                } else {
                    Presence::Found
                }
            }
            None => Presence::Absent,
        }
    }

    /// Gives `key` a new ttl starting at `now` and promotes it.
    /// The stored value and flags are left as they are.
    ///
    /// An entry that has already expired is not revived: it is purged and
    /// reported as [`Presence::Expired`], which callers treat as not found.
    pub fn touch(&mut self, key: &str, ttl: u64, now: Instant) -> Presence {
        let Some(slot) = self.map.get_mut(key) else {
            return Presence::Absent;
        };

        if slot.entry.is_expired(now) {
            self.purge(key);
            return Presence::Expired;
        }

        slot.entry.retime(ttl, now);
        let node = slot.node;
        self.recency.move_to_front(node);
        Presence::Found
    }

    /// Returns the entry for `key` without refreshing or promoting it.
    #[cfg(test)]
    pub(crate) fn peek(&self, key: &str) -> Option<&Entry> {
        self.map.get(key).map(|slot| &slot.entry)
    }

    /// Keys from most- to least-recently used.
    #[cfg(test)]
    pub(crate) fn keys_by_recency(&self) -> impl Iterator<Item = &str> + '_ {
        self.recency.iter()
    }

    fn purge(&mut self, key: &str) {
        if let Some(slot) = self.map.remove(key) {
            self.recency.remove(slot.node);
        }
        debug_assert!(self.is_consistent());
    }

    /// The map and the recency list hold the same keys, within capacity.
    ///
    /// Only the list ends are checked, so this stays O(1).
    fn is_consistent(&self) -> bool {
        let mapped = |key: Option<&str>| key.map_or(true, |k| self.map.contains_key(k));

        self.map.len() == self.recency.len()
            && self.map.len() <= self.capacity
            && mapped(self.recency.front())
            && mapped(self.recency.back())
    }
}
