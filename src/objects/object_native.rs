//! Grounded in the teacher's `objects/object_native_function.rs`: a
//! `NativeObject` trait object embedded behind the common header, same
//! shape as the teacher's `ObjectNativeFunction { object, name, arity,
//! native_object: Box<dyn NativeObject> }`.

use std::mem::size_of;

use super::{GcSize, ObjHeader, ObjKind};
use crate::value::Value;

pub trait NativeObject {
    fn run(&self, args: &[Value]) -> Result<Value, String>;
}

#[repr(C)]
pub struct ObjNative {
    pub header: ObjHeader,
    pub arity: u8,
    pub name: String,
    pub native: Box<dyn NativeObject>,
}

impl ObjNative {
    pub fn new(name: String, arity: u8, native: Box<dyn NativeObject>) -> Self {
        ObjNative {
            header: ObjHeader::new(ObjKind::Native),
            arity,
            name,
            native,
        }
    }
}

impl GcSize for ObjNative {
    fn shallow_size(&self) -> usize {
        size_of::<ObjNative>()
    }
}
