//! The shared download queue.
//!
//! Workers mutate items concurrently; the manifest writer only ever sees a
//! point-in-time snapshot taken under the lock. The lock is never held across
//! an `.await`.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::item::{Item, ItemStatus, PlaylistKey};

/// What the manifest writer needs to know about one queued item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub local_id: String,
    pub item_id: String,
    pub status: ItemStatus,
}

/// Read access to the queue for completion checks.
pub trait ItemQueue: Send + Sync {
    /// Every queued item belonging to `key`, taken under the queue lock.
    fn playlist_snapshot(&self, key: &PlaylistKey) -> Vec<QueueEntry>;
}

/// In-process queue keyed by local id (`{item_id}-{n}`).
#[derive(Debug, Default)]
pub struct SharedQueue {
    items: Mutex<BTreeMap<String, Item>>,
}

impl SharedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Item>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an item and returns its local id.
    ///
    /// The same `item_id` may be queued more than once; each copy gets the next
    /// free suffix.
    pub fn insert(&self, item: Item) -> String {
        let mut items = self.lock();
        let mut n = 1;
        let local_id = loop {
            let candidate = format_local_id(&item.item_id, n);
            if !items.contains_key(&candidate) {
                break candidate;
            }
            n += 1;
        };
        items.insert(local_id.clone(), item);
        local_id
    }

    pub fn get(&self, local_id: &str) -> Option<Item> {
        self.lock().get(local_id).cloned()
    }

    /// Applies `f` to the item. Returns false if it is no longer queued.
    pub fn update<F>(&self, local_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut Item),
    {
        match self.lock().get_mut(local_id) {
            Some(item) => {
                f(item);
                true
            }
            None => false,
        }
    }

    pub fn set_status(&self, local_id: &str, status: ItemStatus) -> bool {
        self.update(local_id, |item| item.item_status = status)
    }

    pub fn remove(&self, local_id: &str) -> Option<Item> {
        self.lock().remove(local_id)
    }

    /// Copy of every queued item, ordered by local id.
    pub fn snapshot(&self) -> Vec<(String, Item)> {
        self.lock()
            .iter()
            .map(|(id, item)| (id.clone(), item.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl ItemQueue for SharedQueue {
    fn playlist_snapshot(&self, key: &PlaylistKey) -> Vec<QueueEntry> {
        self.lock()
            .iter()
            .filter(|(_, item)| item.is_playlist_member(key))
            .map(|(local_id, item)| QueueEntry {
                local_id: local_id.clone(),
                item_id: item.item_id.clone(),
                status: item.item_status,
            })
            .collect()
    }
}

/// Local id for the `n`th queued copy of `item_id`.
pub fn format_local_id(item_id: &str, n: u32) -> String {
    format!("{}-{}", item_id, n)
}
