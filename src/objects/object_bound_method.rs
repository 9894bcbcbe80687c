//! No teacher counterpart (the teacher's struct/trait model never grew
//! method binding) — grounded directly in `bind_method`/`OP_GET_PROPERTY`
//! in `examples/original_source/clox/vm.c`, expressed with this crate's
//! existing header/closure shapes.

use std::mem::size_of;

use super::object_closure::ObjClosure;
use super::{GcSize, ObjHeader, ObjKind};
use crate::value::Value;

#[repr(C)]
pub struct ObjBoundMethod {
    pub header: ObjHeader,
    pub receiver: Value,
    pub method: *mut ObjClosure,
}

impl ObjBoundMethod {
    pub fn new(receiver: Value, method: *mut ObjClosure) -> Self {
        ObjBoundMethod {
            header: ObjHeader::new(ObjKind::BoundMethod),
            receiver,
            method,
        }
    }

    pub fn method_display(&self) -> String {
        unsafe { (*self.method).function_display() }
    }
}

impl GcSize for ObjBoundMethod {
    fn shallow_size(&self) -> usize {
        size_of::<ObjBoundMethod>()
    }
}
