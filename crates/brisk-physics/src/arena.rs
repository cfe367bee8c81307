//! Generational arena
//!
//! Colliders and entities reference each other by handle instead of by
//! pointer. A slot's generation is bumped every time it is reused, so a handle
//! to a removed value can never resolve to whatever replaced it.

use std::marker::PhantomData;

use brisk_core::Entity;

use crate::collider::ColliderId;

/// Handle types that can address an [`Arena`]
pub trait ArenaKey: Copy {
    fn from_parts(index: u32, generation: u32) -> Self;
    fn index(&self) -> u32;
    fn generation(&self) -> u32;
}

impl ArenaKey for Entity {
    fn from_parts(index: u32, generation: u32) -> Self {
        Entity::new(index, generation)
    }

    fn index(&self) -> u32 {
        Entity::index(self)
    }

    fn generation(&self) -> u32 {
        Entity::generation(self)
    }
}

impl ArenaKey for ColliderId {
    fn from_parts(index: u32, generation: u32) -> Self {
        ColliderId::new(index, generation)
    }

    fn index(&self) -> u32 {
        ColliderId::index(self)
    }

    fn generation(&self) -> u32 {
        ColliderId::generation(self)
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage addressed by generational handles
#[derive(Debug, Clone)]
pub struct Arena<K, T> {
    slots: Vec<Slot<T>>,
    free_indices: Vec<u32>,
    len: usize,
    _key: PhantomData<K>,
}

impl<K: ArenaKey, T> Arena<K, T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_indices: Vec::new(),
            len: 0,
            _key: PhantomData,
        }
    }

    pub fn insert(&mut self, value: T) -> K {
        self.insert_with(|_| value)
    }

    /// Insert a value that needs to know its own handle
    pub fn insert_with(&mut self, build: impl FnOnce(K) -> T) -> K {
        self.len += 1;
        if let Some(index) = self.free_indices.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            let key = K::from_parts(index, slot.generation);
            slot.value = Some(build(key));
            key
        } else {
            let index = self.slots.len() as u32;
            let key = K::from_parts(index, 0);
            self.slots.push(Slot {
                generation: 0,
                value: Some(build(key)),
            });
            key
        }
    }

    pub fn remove(&mut self, key: K) -> Option<T> {
        let slot = self.slots.get_mut(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        let value = slot.value.take()?;
        self.free_indices.push(key.index());
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, key: K) -> Option<&T> {
        self.slots
            .get(key.index() as usize)
            .filter(|slot| slot.generation == key.generation())
            .and_then(|slot| slot.value.as_ref())
    }

    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        self.slots
            .get_mut(key.index() as usize)
            .filter(|slot| slot.generation == key.generation())
            .and_then(|slot| slot.value.as_mut())
    }

    /// Mutable access to two distinct values at once
    pub fn get2_mut(&mut self, a: K, b: K) -> Option<(&mut T, &mut T)> {
        let (ia, ib) = (a.index() as usize, b.index() as usize);
        if ia == ib || !self.contains(a) || !self.contains(b) {
            return None;
        }

        let (first, second) = if ia < ib {
            let (left, right) = self.slots.split_at_mut(ib);
            (&mut left[ia], &mut right[0])
        } else {
            let (left, right) = self.slots.split_at_mut(ia);
            (&mut right[0], &mut left[ib])
        };

        Some((first.value.as_mut()?, second.value.as_mut()?))
    }

    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                self.free_indices.push(index as u32);
            }
        }
        self.len = 0;
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (K::from_parts(index as u32, slot.generation), value))
        })
    }

    pub fn keys(&self) -> impl Iterator<Item = K> + '_ {
        self.iter().map(|(key, _)| key)
    }
}

impl<K: ArenaKey, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut arena: Arena<Entity, &str> = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");

        assert_eq!(arena.get(a), Some(&"a"));
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut arena: Arena<Entity, u32> = Arena::new();
        let first = arena.insert(1);
        assert_eq!(arena.remove(first), Some(1));

        let second = arena.insert(2);
        assert_eq!(first.index(), second.index());
        assert_ne!(first.generation(), second.generation());
        assert!(arena.get(first).is_none());
        assert!(arena.remove(first).is_none());
        assert_eq!(arena.get(second), Some(&2));
    }

    #[test]
    fn test_get2_mut() {
        let mut arena: Arena<ColliderId, u32> = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);

        let (x, y) = arena.get2_mut(b, a).unwrap();
        std::mem::swap(x, y);
        assert_eq!(arena.get(a), Some(&2));
        assert_eq!(arena.get(b), Some(&1));
        assert!(arena.get2_mut(a, a).is_none());
    }

    #[test]
    fn test_insert_with_sees_own_key() {
        let mut arena: Arena<ColliderId, ColliderId> = Arena::new();
        let key = arena.insert_with(|key| key);
        assert_eq!(arena.get(key), Some(&key));
    }
}
