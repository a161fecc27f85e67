use std::collections::HashMap;

use crate::types::EntityId;

/// Dense array keyed by stable id.
///
/// Values are packed contiguously for iteration; `ids[i]` is the owner of
/// `dense[i]`. Erase swap-removes, so dense order is not stable across erases.
pub struct PackedArray<T> {
    dense: Vec<T>,
    ids: Vec<EntityId>,
    index: HashMap<EntityId, usize>,
}

impl<T> Default for PackedArray<T> {
    fn default() -> Self {
        Self { dense: Vec::new(), ids: Vec::new(), index: HashMap::new() }
    }
}

impl<T> PackedArray<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value for `id`. Returns the previous value.
    pub fn insert(&mut self, id: EntityId, value: T) -> Option<T> {
        if let Some(&i) = self.index.get(&id) {
            return Some(std::mem::replace(&mut self.dense[i], value));
        }
        self.index.insert(id, self.dense.len());
        self.dense.push(value);
        self.ids.push(id);
        None
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.index.get(&id).map(|&i| &self.dense[i])
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.index.get(&id).map(|&i| &mut self.dense[i])
    }

    /// Mutable access to two distinct entries at once.
    pub fn get_pair_mut(&mut self, a: EntityId, b: EntityId) -> Option<(&mut T, &mut T)> {
        let ia = *self.index.get(&a)?;
        let ib = *self.index.get(&b)?;
        if ia == ib {
            return None;
        }
        if ia < ib {
            let (lo, hi) = self.dense.split_at_mut(ib);
            Some((&mut lo[ia], &mut hi[0]))
        } else {
            let (lo, hi) = self.dense.split_at_mut(ia);
            Some((&mut hi[0], &mut lo[ib]))
        }
    }

    /// Swap-remove the value for `id`.
    pub fn erase(&mut self, id: EntityId) -> Option<T> {
        let i = self.index.remove(&id)?;
        let value = self.dense.swap_remove(i);
        self.ids.swap_remove(i);
        if let Some(&moved) = self.ids.get(i) {
            self.index.insert(moved, i);
        }
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Owner ids in dense order.
    pub fn ids(&self) -> &[EntityId] {
        &self.ids
    }

    pub fn values(&self) -> &[T] {
        &self.dense
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.ids.iter().copied().zip(self.dense.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.ids.iter().copied().zip(self.dense.iter_mut())
    }
}
