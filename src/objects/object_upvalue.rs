//! Grounded in the teacher's `objects/object_upvalue.rs`, adapted per the
//! spec's design note to hold a stack *index* rather than a raw pointer
//! into the operand stack. `UpvalueState` replaces the teacher's
//! `location: *mut Value` + `closed: Value` pair with a tagged enum, which
//! is the more idiomatic Rust way to express "points at the stack, or owns
//! its value" without a dangling-pointer hazard once the stack `Vec`
//! reallocates.

use std::cell::Cell;
use std::mem::size_of;

use super::{GcSize, ObjHeader, ObjKind};
use crate::value::Value;

#[derive(Clone, Copy)]
pub enum UpvalueState {
    Open(usize),
    Closed(Value),
}

#[repr(C)]
pub struct ObjUpvalue {
    pub header: ObjHeader,
    pub state: Cell<UpvalueState>,
}

impl ObjUpvalue {
    pub fn new(stack_index: usize) -> Self {
        ObjUpvalue {
            header: ObjHeader::new(ObjKind::Upvalue),
            state: Cell::new(UpvalueState::Open(stack_index)),
        }
    }

    pub fn is_open_at(&self, index: usize) -> bool {
        matches!(self.state.get(), UpvalueState::Open(i) if i == index)
    }

    pub fn stack_index(&self) -> Option<usize> {
        match self.state.get() {
            UpvalueState::Open(i) => Some(i),
            UpvalueState::Closed(_) => None,
        }
    }

    pub fn close(&self, value: Value) {
        self.state.set(UpvalueState::Closed(value));
    }
}

impl GcSize for ObjUpvalue {
    fn shallow_size(&self) -> usize {
        size_of::<ObjUpvalue>()
    }
}
