//! Bidirectional relation store.
//!
//! Two mirrored tables live behind one lock:
//!
//! ```text
//!            ┌──────────────── RwLock ────────────────┐
//!            │                                        │
//!            │  left:  EntityKey ──► {right keys}     │
//!            │              ▲              │          │
//!            │              └── mirrored ──┘          │
//!            │  right: EntityKey ──► {left keys}      │
//!            └────────────────────────────────────────┘
//! ```
//!
//! Invariants held across every public call:
//! - symmetry: `r ∈ left[k]` iff `k ∈ right[r]`
//! - existence-dependency: no key maps to an empty set
//!
//! Every mutation touches both tables inside a single write guard, so a
//! concurrent reader never sees one side without its mirror.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{RelationError, Result};
use crate::key::{EntityKey, RelationSet};

/// Map from an entity to the opposite-side keys it relates to.
pub type RelationTable = HashMap<EntityKey, RelationSet>;

/// Selects which table acts as "own" for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// Result of an upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// The key did not exist before this call.
    pub created: bool,
    /// At least one new relation was added.
    pub updated: bool,
}

/// Size counters for monitoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub left_entities: usize,
    pub right_entities: usize,
    /// Symmetric pairs, each counted once.
    pub relations: usize,
}

#[derive(Debug, Default)]
struct MirroredTables {
    left: RelationTable,
    right: RelationTable,
}

impl MirroredTables {
    fn table(&self, side: Side) -> &RelationTable {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Borrow (own, opposite) mutably at the same time.
    fn split_mut(&mut self, side: Side) -> (&mut RelationTable, &mut RelationTable) {
        match side {
            Side::Left => (&mut self.left, &mut self.right),
            Side::Right => (&mut self.right, &mut self.left),
        }
    }

    fn verify(&self) -> Result<()> {
        for side in [Side::Left, Side::Right] {
            verify_direction(self.table(side), self.table(side.opposite()), side)?;
        }
        Ok(())
    }
}

fn verify_direction(own: &RelationTable, opposite: &RelationTable, side: Side) -> Result<()> {
    for (key, related) in own {
        if related.is_empty() {
            return Err(RelationError::InvariantViolated(format!(
                "{side:?} entity {key} has no relations"
            )));
        }
        for r in related {
            let linked = opposite.get(r).is_some_and(|back| back.contains(key));
            if !linked {
                return Err(RelationError::InvariantViolated(format!(
                    "{side:?} entity {key} relates to {r} without a back-link"
                )));
            }
        }
    }
    Ok(())
}

fn upsert_into(
    own: &mut RelationTable,
    opposite: &mut RelationTable,
    key: EntityKey,
    related: RelationSet,
) -> UpsertOutcome {
    let created = !own.contains_key(&key);
    let mut updated = false;

    let own_related = own.entry(key.clone()).or_default();
    for r in related {
        if own_related.contains(&r) {
            continue;
        }
        opposite.entry(r.clone()).or_default().insert(key.clone());
        own_related.insert(r);
        updated = true;
    }

    UpsertOutcome { created, updated }
}

fn remove_from(
    own: &mut RelationTable,
    opposite: &mut RelationTable,
    key: &EntityKey,
) -> Option<RelationSet> {
    let related = own.remove(key)?;
    for r in &related {
        if let Some(back) = opposite.get_mut(r) {
            back.remove(key);
            // Cascade: an opposite entity left without relations ceases to exist.
            if back.is_empty() {
                opposite.remove(r);
            }
        }
    }
    Some(related)
}

fn rank(table: &RelationTable) -> Vec<(EntityKey, usize)> {
    let mut ranked: Vec<(EntityKey, usize)> = table
        .iter()
        .map(|(key, related)| (key.clone(), related.len()))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

/// Invariant-preserving pair of mirrored relation tables.
///
/// Construct one per logical dataset and share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct RelationStore {
    tables: RwLock<MirroredTables>,
}

impl RelationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_tables(&self) -> Result<RwLockReadGuard<'_, MirroredTables>> {
        self.tables.read().map_err(|_| {
            log::error!("Relation store lock poisoned (read)");
            RelationError::LockPoisoned
        })
    }

    fn write_tables(&self) -> Result<RwLockWriteGuard<'_, MirroredTables>> {
        self.tables.write().map_err(|_| {
            log::error!("Relation store lock poisoned (write)");
            RelationError::LockPoisoned
        })
    }

    /// Create `key` on `side` if absent, then merge `related` into it and
    /// back-link each new relation on the opposite side.
    ///
    /// An empty `related` is rejected with [`RelationError::EmptyRelations`]
    /// before the lock is taken. Calling again with an already-contained
    /// set returns the default outcome and changes nothing.
    pub fn upsert(&self, side: Side, key: EntityKey, related: RelationSet) -> Result<UpsertOutcome> {
        Ok(self.merge(side, key, related)?.0)
    }

    /// Like [`upsert`](Self::upsert), but also returns the relations of
    /// `key` as they stand right after the merge, read under the same guard.
    pub fn merge(
        &self,
        side: Side,
        key: EntityKey,
        related: RelationSet,
    ) -> Result<(UpsertOutcome, RelationSet)> {
        if related.is_empty() {
            log::warn!("Rejected upsert of {key} with no relations");
            return Err(RelationError::EmptyRelations);
        }

        let mut tables = self.write_tables()?;
        let (own, opposite) = tables.split_mut(side);
        let outcome = upsert_into(own, opposite, key.clone(), related);
        let merged = own.get(&key).cloned().unwrap_or_default();
        debug_assert!(tables.verify().is_ok(), "upsert broke table symmetry");
        Ok((outcome, merged))
    }

    /// Relations of `key`, or the empty set if it does not exist.
    pub fn read(&self, side: Side, key: &EntityKey) -> Result<RelationSet> {
        let tables = self.read_tables()?;
        Ok(tables.table(side).get(key).cloned().unwrap_or_default())
    }

    /// Delete `key` and return the relations it had.
    ///
    /// Opposite entities whose only relation was `key` are removed too.
    /// Returns `None` if `key` did not exist.
    pub fn remove(&self, side: Side, key: &EntityKey) -> Result<Option<RelationSet>> {
        let mut tables = self.write_tables()?;
        let (own, opposite) = tables.split_mut(side);
        let removed = remove_from(own, opposite, key);
        debug_assert!(tables.verify().is_ok(), "delete broke table symmetry");
        Ok(removed)
    }

    /// Delete `key`; `false` if it did not exist.
    pub fn delete(&self, side: Side, key: &EntityKey) -> Result<bool> {
        Ok(self.remove(side, key)?.is_some())
    }

    /// Every key on `side` with its relation count, most related first.
    /// Equal counts are ordered by key (label, then year).
    pub fn rank_by_relation_count(&self, side: Side) -> Result<Vec<(EntityKey, usize)>> {
        let tables = self.read_tables()?;
        Ok(rank(tables.table(side)))
    }

    pub fn contains(&self, side: Side, key: &EntityKey) -> Result<bool> {
        Ok(self.read_tables()?.table(side).contains_key(key))
    }

    pub fn len(&self, side: Side) -> Result<usize> {
        Ok(self.read_tables()?.table(side).len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        let tables = self.read_tables()?;
        Ok(tables.left.is_empty() && tables.right.is_empty())
    }

    pub fn stats(&self) -> Result<StoreStats> {
        let tables = self.read_tables()?;
        Ok(StoreStats {
            left_entities: tables.left.len(),
            right_entities: tables.right.len(),
            relations: tables.left.values().map(|related| related.len()).sum(),
        })
    }

    /// Verify symmetry and existence-dependency over a consistent snapshot.
    pub fn check_invariants(&self) -> Result<()> {
        self.read_tables()?.verify()
    }
}
