//! Grounded in the teacher's `objects/object_closure.rs` (the `dynac/`
//! variant, which keeps actual upvalue objects rather than the root
//! variant's bare index list — indices alone can't express the open/closed
//! transition).

use std::mem::size_of;

use super::object_function::ObjFunction;
use super::object_upvalue::ObjUpvalue;
use super::{GcSize, ObjHeader, ObjKind};

#[repr(C)]
pub struct ObjClosure {
    pub header: ObjHeader,
    pub function: *mut ObjFunction,
    pub upvalues: Vec<*mut ObjUpvalue>,
}

impl ObjClosure {
    pub fn new(function: *mut ObjFunction) -> Self {
        let upvalue_count = unsafe { (*function).upvalue_count };
        ObjClosure {
            header: ObjHeader::new(ObjKind::Closure),
            function,
            upvalues: Vec::with_capacity(upvalue_count),
        }
    }

    pub fn function_display(&self) -> String {
        unsafe { format!("{}", *self.function) }
    }
}

impl GcSize for ObjClosure {
    fn shallow_size(&self) -> usize {
        size_of::<ObjClosure>()
    }

    fn deep_size(&self) -> usize {
        size_of::<ObjClosure>() + self.upvalues.capacity() * size_of::<*mut ObjUpvalue>()
    }
}
