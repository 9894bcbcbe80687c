//! Grounded in the teacher's `objects/object_struct.rs`
//! (`ObjectStructType`/`ObjectStructInstance`), renamed to the spec's
//! Class/Instance vocabulary. The teacher stored fields by a
//! `Vec<String>` + index table; the spec's runtime needs open-addressed
//! `Table`s (methods keyed by interned name, same structure globals use),
//! so this keeps the teacher's two-struct split but swaps the field index
//! for a real `Table`.

use std::mem::size_of;

use super::object_string::ObjString;
use super::{GcSize, ObjHeader, ObjKind};
use crate::table::Table;

#[repr(C)]
pub struct ObjClass {
    pub header: ObjHeader,
    pub name: *mut ObjString,
    pub methods: Table,
}

impl ObjClass {
    pub fn new(name: *mut ObjString) -> Self {
        ObjClass {
            header: ObjHeader::new(ObjKind::Class),
            name,
            methods: Table::new(),
        }
    }

    pub fn name_str(&self) -> &str {
        unsafe { (*self.name).as_str() }
    }
}

impl GcSize for ObjClass {
    fn shallow_size(&self) -> usize {
        size_of::<ObjClass>()
    }

    fn deep_size(&self) -> usize {
        size_of::<ObjClass>() + self.methods.deep_size()
    }
}
