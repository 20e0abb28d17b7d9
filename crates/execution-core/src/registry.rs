//! Order registry keyed by each order's current identifier.
//!
//! Records live in slots of an arena; identifiers only index into it. A rename
//! therefore re-points one index entry under a single write lock and the
//! record itself never moves, so there is no moment where neither the old nor
//! the new identifier resolves. The temporary identifier stays resolvable as
//! an alias until the record is removed.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::RegistryError;
use crate::order::OrderRecord;

#[derive(Debug, Default)]
struct Arena {
    slots: Vec<Option<OrderRecord>>,
    free: Vec<usize>,
    /// current id -> slot
    index: HashMap<String, usize>,
    /// previous (temporary) id -> slot
    aliases: HashMap<String, usize>,
}

impl Arena {
    fn resolve(&self, id: &str) -> Option<usize> {
        self.index
            .get(id)
            .or_else(|| self.aliases.get(id))
            .copied()
    }

    fn record(&self, slot: usize) -> Option<&OrderRecord> {
        self.slots.get(slot).and_then(|s| s.as_ref())
    }

    fn record_mut(&mut self, slot: usize) -> Option<&mut OrderRecord> {
        self.slots.get_mut(slot).and_then(|s| s.as_mut())
    }
}

/// Thread-safe registry of live orders.
///
/// Shared by the intent path and the report-delivery path; every operation
/// takes the lock once and releases it before returning.
#[derive(Debug, Default)]
pub struct OrderRegistry {
    arena: RwLock<Arena>,
}

impl OrderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record under its current identifier.
    pub fn register(&self, record: OrderRecord) -> Result<(), RegistryError> {
        let mut arena = self.arena.write();
        let id = record.order_id().to_string();
        if arena.index.contains_key(&id) {
            return Err(RegistryError::DuplicateOrder(id));
        }

        let slot = match arena.free.pop() {
            Some(slot) => {
                arena.slots[slot] = Some(record);
                slot
            }
            None => {
                arena.slots.push(Some(record));
                arena.slots.len() - 1
            }
        };
        arena.index.insert(id, slot);
        Ok(())
    }

    /// Atomically move a record from `old_id` to `new_id`.
    ///
    /// `old_id` keeps resolving to the record as an alias.
    pub fn rename(&self, old_id: &str, new_id: &str) -> Result<(), RegistryError> {
        let mut arena = self.arena.write();
        let slot = arena
            .index
            .get(old_id)
            .copied()
            .ok_or_else(|| RegistryError::UnknownOrder(old_id.to_string()))?;
        if old_id == new_id {
            return Ok(());
        }
        if arena.index.contains_key(new_id) {
            return Err(RegistryError::DuplicateOrder(new_id.to_string()));
        }

        arena.index.remove(old_id);
        arena.index.insert(new_id.to_string(), slot);
        arena.aliases.insert(old_id.to_string(), slot);
        if let Some(record) = arena.record_mut(slot) {
            record.rename(new_id.to_string());
        }
        Ok(())
    }

    /// Clone of the record under `id` (current id or former temporary id).
    pub fn get(&self, id: &str) -> Option<OrderRecord> {
        let arena = self.arena.read();
        arena.resolve(id).and_then(|slot| arena.record(slot)).cloned()
    }

    /// Current identifier of the record reachable through `id`.
    pub fn current_id(&self, id: &str) -> Option<String> {
        let arena = self.arena.read();
        arena
            .resolve(id)
            .and_then(|slot| arena.record(slot))
            .map(|r| r.order_id().to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.arena.read().resolve(id).is_some()
    }

    /// Mutate the record under `id` in place while holding the lock.
    pub fn update<R>(&self, id: &str, f: impl FnOnce(&mut OrderRecord) -> R) -> Option<R> {
        let mut arena = self.arena.write();
        let slot = arena.resolve(id)?;
        arena.record_mut(slot).map(f)
    }

    /// Mutate several records under one lock acquisition.
    ///
    /// Fails without touching anything if any identifier is unknown.
    pub fn update_many<R>(
        &self,
        ids: &[String],
        mut f: impl FnMut(&mut OrderRecord) -> R,
    ) -> Result<Vec<R>, RegistryError> {
        let mut arena = self.arena.write();
        let mut slots = Vec::with_capacity(ids.len());
        for id in ids {
            let slot = arena
                .resolve(id)
                .ok_or_else(|| RegistryError::UnknownOrder(id.clone()))?;
            slots.push(slot);
        }

        let mut results = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(record) = arena.record_mut(slot) {
                results.push(f(record));
            }
        }
        Ok(results)
    }

    /// Remove a record along with its aliases.
    pub fn remove(&self, id: &str) -> Option<OrderRecord> {
        let mut arena = self.arena.write();
        let slot = arena.resolve(id)?;
        let record = arena.slots.get_mut(slot)?.take()?;

        arena.index.retain(|_, s| *s != slot);
        arena.aliases.retain(|_, s| *s != slot);
        arena.free.push(slot);
        Some(record)
    }

    /// Clones of every live record.
    pub fn snapshot_all(&self) -> Vec<OrderRecord> {
        let arena = self.arena.read();
        arena.slots.iter().flatten().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.arena.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared handle to the order registry.
pub type SharedOrderRegistry = Arc<OrderRegistry>;

/// Create a new shared order registry.
pub fn create_order_registry() -> SharedOrderRegistry {
    Arc::new(OrderRegistry::new())
}
