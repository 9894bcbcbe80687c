//! Fixed sizing constants shared across the call stack and operand stack.

/// Matches clox's `UINT8_COUNT`: one call frame can hold at most this many
/// locals/temporaries, since `OP_GET_LOCAL`/`OP_SET_LOCAL` operands are u8.
pub const UINT8_COUNT: usize = 256;

/// Maximum nested call depth.
pub const FRAMES_MAX: usize = 64;

/// Maximum live operand-stack slots across all frames.
pub const MAX_STACK_SIZE: usize = FRAMES_MAX * UINT8_COUNT;

/// Initial GC trigger threshold, in bytes tracked by the allocator.
pub const INITIAL_GC_THRESHOLD: usize = 1024 * 1024;

/// Growth factor applied to `next_gc` after a collection.
pub const GC_HEAP_GROW_FACTOR: usize = 2;
