//! Grown from the teacher's `memory.rs`, which only held a
//! `grow_capacity!` macro for doubling buffer sizes. `Table`'s own growth
//! is inlined now (it needs to rehash, not just resize), so what is left
//! here is the GC threshold growth the teacher's macro was conceptually
//! adjacent to.

use crate::constants::GC_HEAP_GROW_FACTOR;

pub fn next_gc_threshold(bytes_after_collection: usize) -> usize {
    bytes_after_collection * GC_HEAP_GROW_FACTOR
}
