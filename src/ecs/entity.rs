//! Entity management

use std::collections::HashSet;

/// Entity ID type - opaque numeric ID with no intrinsic fields
pub type EntityId = u64;

/// Default cap on the number of destroyed IDs kept for reuse
pub const MAX_FREE_IDS: usize = 10_000;

/// Entity allocator with a bounded free list.
///
/// Destroyed IDs are handed out again (most recent first) until the free
/// list is full; past that point they are abandoned and creation keeps
/// issuing fresh, monotonically increasing IDs.
#[derive(Debug, Clone)]
pub struct EntityAllocator {
    next_id: EntityId,
    free_list: Vec<EntityId>,
    alive: HashSet<EntityId>,
    max_free: usize,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::with_max_free(MAX_FREE_IDS)
    }

    pub fn with_max_free(max_free: usize) -> Self {
        Self {
            next_id: 0,
            free_list: Vec::new(),
            alive: HashSet::new(),
            max_free,
        }
    }

    /// # Panics
    ///
    /// Panics if the `u64` ID space is exhausted.
    pub fn allocate(&mut self) -> EntityId {
        let id = if let Some(id) = self.free_list.pop() {
            id
        } else {
            let id = self.next_id;
            self.next_id = match id.checked_add(1) {
                Some(next) => next,
                None => panic!("entity id space exhausted"),
            };
            id
        };
        self.alive.insert(id);
        id
    }

    /// Returns whether `id` was alive. Only live IDs are offered for reuse.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.alive.remove(&id) {
            return false;
        }
        if self.free_list.len() < self.max_free {
            self.free_list.push(id);
        }
        true
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        self.alive.contains(&id)
    }

    pub fn count(&self) -> usize {
        self.alive.len()
    }

    pub fn next_id(&self) -> EntityId {
        self.next_id
    }

    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    pub fn max_free(&self) -> usize {
        self.max_free
    }

    /// Marks `id` as live without going through `allocate`, pulling it off
    /// the free list and moving the counter past it if needed.
    pub(crate) fn claim(&mut self, id: EntityId) {
        if self.alive.insert(id) {
            self.free_list.retain(|free| *free != id);
        }
        if id >= self.next_id {
            self.next_id = id.saturating_add(1);
        }
    }

    /// Moves the counter forward to `next_id`; never moves it backwards.
    pub(crate) fn resume_from(&mut self, next_id: EntityId) {
        self.next_id = self.next_id.max(next_id);
    }

    /// Live IDs in ascending order.
    pub fn alive_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.alive.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
