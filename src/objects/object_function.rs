//! Grounded in the teacher's `objects/object_function.rs` and
//! `object_manager.rs::alloc_function`.

use std::fmt;
use std::mem::size_of;

use super::object_string::ObjString;
use super::{GcSize, ObjHeader, ObjKind};
use crate::chunk::Chunk;

#[repr(C)]
pub struct ObjFunction {
    pub header: ObjHeader,
    pub arity: u8,
    pub upvalue_count: usize,
    pub chunk: Chunk,
    pub name: *mut ObjString, // null for the top-level script
}

impl ObjFunction {
    pub fn new(name: *mut ObjString) -> Self {
        ObjFunction {
            header: ObjHeader::new(ObjKind::Function),
            arity: 0,
            upvalue_count: 0,
            chunk: Chunk::new(),
            name,
        }
    }

    pub fn name_str(&self) -> &str {
        if self.name.is_null() {
            "script"
        } else {
            unsafe { (*self.name).as_str() }
        }
    }
}

impl GcSize for ObjFunction {
    fn shallow_size(&self) -> usize {
        size_of::<ObjFunction>()
    }

    fn deep_size(&self) -> usize {
        size_of::<ObjFunction>() + self.chunk.deep_size()
    }
}

impl fmt::Display for ObjFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_null() {
            write!(f, "<script>")
        } else {
            write!(f, "<fn {}>", self.name_str())
        }
    }
}
