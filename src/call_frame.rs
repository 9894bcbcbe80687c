//! Grounded in the teacher's `call_frame.rs`, radically simplified per the
//! spec's design note: an index into the VM's operand stack instead of a
//! `NonNull<Value>` pointer into it (which would dangle the moment the
//! stack `Vec` reallocates). The teacher's dead `SHARED_FUNCTION`/`Once`
//! singleton is dropped entirely — it has no role once the VM owns an
//! explicit stack instead of reaching for global state.

use crate::objects::object_closure::ObjClosure;

pub struct CallFrame {
    pub closure: *mut ObjClosure,
    pub ip: usize,
    pub slot_base: usize,
}

impl CallFrame {
    pub fn new(closure: *mut ObjClosure, slot_base: usize) -> Self {
        CallFrame {
            closure,
            ip: 0,
            slot_base,
        }
    }

    pub fn function(&self) -> *mut crate::objects::object_function::ObjFunction {
        unsafe { (*self.closure).function }
    }
}
