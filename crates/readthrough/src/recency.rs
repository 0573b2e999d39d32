use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::entry::Entry;

/// Node in the doubly-linked recency ordering.
struct Node {
    entry: Arc<Entry>,
    prev: Option<NonNull<Node>>,
    next: Option<NonNull<Node>>,
}

/// Recency ordering of resident entries: front is the most recently used,
/// back the least. A handle map keyed by id makes splice and unlink O(1).
///
/// The structure is always used behind the cache's coarse order mutex; every
/// mutation of the key index happens under the same lock hold, which is what
/// keeps the two in bijection outside critical sections.
pub(crate) struct RecencyList {
    nodes: HashMap<u64, NonNull<Node>>,
    /// Most recently used.
    head: Option<NonNull<Node>>,
    /// Least recently used.
    tail: Option<NonNull<Node>>,
}

// SAFETY: the raw node pointers are owned exclusively by this structure and
// are only dereferenced inside its `&mut self` methods; no handle escapes.
// Moving the list across threads is sound as long as the payload is, which
// `Arc<Entry>` guarantees.
unsafe impl Send for RecencyList {}

impl RecencyList {
    pub(crate) fn new() -> Self {
        RecencyList {
            nodes: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Links a freshly admitted entry in at the most recently used position.
    ///
    /// The id must not currently be resident.
    pub(crate) fn push_front(&mut self, entry: Arc<Entry>) {
        let id = entry.id();
        debug_assert!(!self.nodes.contains_key(&id), "id {id} already resident");

        let node = NonNull::from(Box::leak(Box::new(Node {
            entry,
            prev: None,
            next: None,
        })));
        unsafe { self.link_front(node) };
        self.nodes.insert(id, node);
    }

    /// Splices the entry for `id` to the most recently used position.
    ///
    /// A no-op if the id is no longer resident or the resident entry is not
    /// `entry` anymore (the id was removed and re-admitted concurrently).
    pub(crate) fn move_to_front(&mut self, id: u64, entry: &Arc<Entry>) {
        let Some(&node) = self.nodes.get(&id) else {
            return;
        };
        if !Arc::ptr_eq(unsafe { &node.as_ref().entry }, entry) {
            return;
        }
        if self.head == Some(node) {
            return;
        }
        unsafe {
            self.unlink(node);
            self.link_front(node);
        }
    }

    /// Unlinks the entry for `id`, returning whether anything was removed.
    ///
    /// Identity-checked like [`move_to_front`](Self::move_to_front): a stale
    /// handle to a removed-and-readmitted id does not unlink its successor.
    pub(crate) fn remove(&mut self, id: u64, entry: &Arc<Entry>) -> bool {
        let Some(&node) = self.nodes.get(&id) else {
            return false;
        };
        if !Arc::ptr_eq(unsafe { &node.as_ref().entry }, entry) {
            return false;
        }
        self.nodes.remove(&id);
        unsafe {
            self.unlink(node);
            drop(Box::from_raw(node.as_ptr()));
        }
        true
    }

    /// Unlinks and returns the least recently used entry.
    pub(crate) fn pop_back(&mut self) -> Option<Arc<Entry>> {
        let node = self.tail?;
        unsafe {
            self.unlink(node);
            let boxed = Box::from_raw(node.as_ptr());
            self.nodes.remove(&boxed.entry.id());
            Some(boxed.entry)
        }
    }

    /// Removes entries that are ready and idle for longer than `ttl`,
    /// walking from the least recently used end.
    ///
    /// The walk stops at the first entry that is still a placeholder or was
    /// accessed within `ttl`; the return value is the instant at which that
    /// entry would next expire, or `None` when the walk emptied the list.
    /// That instant can already be in the past, e.g. for a placeholder whose
    /// load has outlived `ttl` — it is a lower bound on the next expiry, not
    /// a schedule. Removed ids are appended to `expired` so the caller can
    /// drop the matching index handles under the same lock hold.
    pub(crate) fn expire_idle(
        &mut self,
        epoch: Instant,
        ttl: Duration,
        now: Instant,
        expired: &mut Vec<u64>,
    ) -> Option<Instant> {
        while let Some(node) = self.tail {
            let (id, ready, last_access) = {
                let node = unsafe { node.as_ref() };
                (
                    node.entry.id(),
                    node.entry.is_ready(),
                    node.entry.last_access(epoch),
                )
            };
            if !ready || now.saturating_duration_since(last_access) <= ttl {
                return Some(last_access + ttl);
            }
            self.nodes.remove(&id);
            unsafe {
                self.unlink(node);
                drop(Box::from_raw(node.as_ptr()));
            }
            expired.push(id);
        }
        None
    }

    /// Links a detached node in as the new head.
    unsafe fn link_front(&mut self, mut node: NonNull<Node>) {
        unsafe {
            let node_mut = node.as_mut();
            node_mut.prev = None;
            node_mut.next = self.head;
        }
        match self.head {
            Some(mut head) => unsafe { head.as_mut().prev = Some(node) },
            None => self.tail = Some(node),
        }
        self.head = Some(node);
    }

    /// Detaches a node from the list without freeing it.
    unsafe fn unlink(&mut self, node: NonNull<Node>) {
        let (prev, next) = {
            let node = unsafe { node.as_ref() };
            (node.prev, node.next)
        };
        match prev {
            Some(mut prev) => unsafe { prev.as_mut().next = next },
            None => self.head = next,
        }
        match next {
            Some(mut next) => unsafe { next.as_mut().prev = prev },
            None => self.tail = prev,
        }
    }

    /// Ids in order, most recently used first.
    #[cfg(test)]
    fn ids(&self) -> Vec<u64> {
        let mut ids = Vec::with_capacity(self.nodes.len());
        let mut cursor = self.head;
        while let Some(node) = cursor {
            let node = unsafe { node.as_ref() };
            ids.push(node.entry.id());
            cursor = node.next;
        }
        ids
    }

    /// Walks the list both ways and cross-checks it against the handle map.
    #[cfg(test)]
    fn assert_consistent(&self) {
        let forward = self.ids();
        assert_eq!(forward.len(), self.nodes.len());

        let mut backward = Vec::with_capacity(forward.len());
        let mut cursor = self.tail;
        while let Some(node) = cursor {
            let node = unsafe { node.as_ref() };
            backward.push(node.entry.id());
            cursor = node.prev;
        }
        backward.reverse();
        assert_eq!(forward, backward);

        for id in &forward {
            assert!(self.nodes.contains_key(id));
        }
    }
}

impl Drop for RecencyList {
    fn drop(&mut self) {
        let mut cursor = self.head;
        while let Some(node) = cursor {
            let boxed = unsafe { Box::from_raw(node.as_ptr()) };
            cursor = boxed.next;
        }
        self.nodes.clear();
        self.head = None;
        self.tail = None;
    }
}
