//! Library surface so `tests/end_to_end.rs` can drive the VM without
//! shelling out to the `wisp` binary. The teacher's crate is binary-only;
//! that works for a throwaway smoke test, but an integration suite needs
//! something a `tests/*.rs` file can actually depend on, so the real
//! modules live here and `main.rs` is a thin driver over them.

pub mod call_frame;
pub mod chunk;
pub mod compiler;
pub mod constants;
pub mod debug;
pub mod gc;
pub mod heap;
pub mod memory;
pub mod objects;
pub mod scanner;
pub mod std_mod;
pub mod table;
pub mod value;
pub mod vm;

pub use vm::{InterpretResult, Vm};
