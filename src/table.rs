//! Open-addressed hash table with linear probing and tombstone deletion.
//! The teacher's `table.rs` (both the `dynac/` and root variants) wraps
//! `std::collections::HashMap` instead, which can't express tombstone
//! deletion or the raw-bytes probe the interner needs — this is written
//! from scratch against the book algorithm (`examples/original_source/clox`
//! doesn't include `table.c`, but `vm.c`'s calls into `table_get`/
//! `table_set`/`table_delete`/`table_add_all`/`table_find_string` fix the
//! exact contract), keeping only the teacher's method names
//! (`insert`→`set`, `find`→`get`) as the naming convention.

use std::mem::size_of;

use crate::objects::object_string::{fnv1a, ObjString};
use crate::value::Value;

const LOAD_FACTOR: f64 = 0.75;

#[derive(Clone, Copy)]
enum Slot {
    Empty,
    Tombstone,
    Occupied(*mut ObjString, Value),
}

pub struct Table {
    entries: Vec<Slot>,
    count: usize, // occupied, not counting tombstones
}

impl Table {
    pub fn new() -> Self {
        Table {
            entries: Vec::new(),
            count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn capacity(&self) -> usize {
        self.entries.len()
    }

    fn find_slot(entries: &[Slot], capacity: usize, key: *mut ObjString) -> usize {
        let hash = unsafe { (*key).hash };
        let mut index = (hash as usize) % capacity;
        let mut first_tombstone: Option<usize> = None;
        loop {
            match entries[index] {
                Slot::Empty => return first_tombstone.unwrap_or(index),
                Slot::Tombstone => {
                    if first_tombstone.is_none() {
                        first_tombstone = Some(index);
                    }
                }
                Slot::Occupied(k, _) if std::ptr::eq(k, key) => return index,
                Slot::Occupied(_, _) => {}
            }
            index = (index + 1) % capacity;
        }
    }

    fn grow(&mut self) {
        let new_capacity = if self.capacity() == 0 { 8 } else { self.capacity() * 2 };
        let mut new_entries = vec![Slot::Empty; new_capacity];
        let mut new_count = 0;
        for slot in &self.entries {
            if let Slot::Occupied(key, value) = slot {
                let index = Self::find_slot(&new_entries, new_capacity, *key);
                new_entries[index] = Slot::Occupied(*key, *value);
                new_count += 1;
            }
        }
        self.entries = new_entries;
        self.count = new_count;
    }

    /// Returns `true` if `key` was not already present (a fresh insert),
    /// `false` if it overwrote an existing entry's value.
    pub fn set(&mut self, key: *mut ObjString, value: Value) -> bool {
        if (self.count + 1) as f64 > self.capacity() as f64 * LOAD_FACTOR {
            self.grow();
        }
        let index = Self::find_slot(&self.entries, self.capacity(), key);
        let is_new = !matches!(self.entries[index], Slot::Occupied(_, _));
        if is_new && !matches!(self.entries[index], Slot::Tombstone) {
            self.count += 1;
        }
        self.entries[index] = Slot::Occupied(key, value);
        is_new
    }

    pub fn get(&self, key: *mut ObjString) -> Option<Value> {
        if self.capacity() == 0 {
            return None;
        }
        match self.entries[Self::find_slot(&self.entries, self.capacity(), key)] {
            Slot::Occupied(_, value) => Some(value),
            _ => None,
        }
    }

    pub fn delete(&mut self, key: *mut ObjString) -> bool {
        if self.capacity() == 0 {
            return false;
        }
        let index = Self::find_slot(&self.entries, self.capacity(), key);
        if let Slot::Occupied(_, _) = self.entries[index] {
            self.entries[index] = Slot::Tombstone;
            true
        } else {
            false
        }
    }

    pub fn add_all(&mut self, other: &Table) {
        for slot in &other.entries {
            if let Slot::Occupied(key, value) = slot {
                self.set(*key, *value);
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (*mut ObjString, Value)> + '_ {
        self.entries.iter().filter_map(|slot| match slot {
            Slot::Occupied(key, value) => Some((*key, *value)),
            _ => None,
        })
    }

    /// Special probe used only by the string interner: look a string up by
    /// its raw bytes + precomputed hash rather than by an existing
    /// `ObjString` pointer, so `copy_string` can check "do we already have
    /// this string" before allocating a new one.
    pub fn find_string(&self, bytes: &[u8], hash: u32) -> Option<*mut ObjString> {
        if self.capacity() == 0 {
            return None;
        }
        debug_assert_eq!(fnv1a(bytes), hash);
        let mut index = (hash as usize) % self.capacity();
        loop {
            match self.entries[index] {
                Slot::Empty => return None,
                Slot::Occupied(key, _) => {
                    let candidate = unsafe { &*key };
                    if candidate.hash == hash && candidate.as_bytes() == bytes {
                        return Some(key);
                    }
                }
                Slot::Tombstone => {}
            }
            index = (index + 1) % self.capacity();
        }
    }

    /// Drops interner entries whose key string was not marked during the
    /// last trace — called right before sweep per the GC's contract.
    pub fn remove_unmarked_keys(&mut self) {
        for slot in &mut self.entries {
            if let Slot::Occupied(key, _) = slot {
                let marked = unsafe { (**key).header.marked.get() };
                if !marked {
                    *slot = Slot::Tombstone;
                    self.count -= 1;
                }
            }
        }
    }

    pub fn deep_size(&self) -> usize {
        size_of::<Table>() + self.entries.capacity() * size_of::<Slot>()
    }
}

impl Default for Table {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leak_string(content: &str) -> *mut ObjString {
        let hash = fnv1a(content.as_bytes());
        Box::into_raw(Box::new(ObjString::new(content.to_string(), hash)))
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut table = Table::new();
        let key = leak_string("answer");
        assert!(table.set(key, Value::Number(42.0)));
        assert_eq!(table.get(key).unwrap(), Value::Number(42.0));
    }

    #[test]
    fn delete_then_get_returns_none_but_slot_is_reusable() {
        let mut table = Table::new();
        let key = leak_string("gone");
        table.set(key, Value::Bool(true));
        assert!(table.delete(key));
        assert!(table.get(key).is_none());
        assert!(table.set(key, Value::Bool(false)));
        assert_eq!(table.get(key).unwrap(), Value::Bool(false));
    }

    #[test]
    fn grows_past_load_factor() {
        let mut table = Table::new();
        let keys: Vec<_> = (0..20).map(|i| leak_string(&format!("k{i}"))).collect();
        for (i, k) in keys.iter().enumerate() {
            table.set(*k, Value::Number(i as f64));
        }
        assert_eq!(table.len(), 20);
        for (i, k) in keys.iter().enumerate() {
            assert_eq!(table.get(*k).unwrap(), Value::Number(i as f64));
        }
    }

    #[test]
    fn find_string_locates_by_raw_bytes() {
        let mut table = Table::new();
        let key = leak_string("hello");
        table.set(key, Value::Bool(true));
        let found = table.find_string(b"hello", fnv1a(b"hello"));
        assert_eq!(found, Some(key));
        assert!(table.find_string(b"nope", fnv1a(b"nope")).is_none());
    }
}
