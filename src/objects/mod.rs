//! Heap object model: a common header (`ObjHeader`) embedded as the first
//! field of every concrete object, dispatched on by `ObjKind`. This mirrors
//! the teacher's `#[repr(C)]` header-embedding pattern (see
//! `object.rs`/`object_string.rs` in the teacher crate) instead of a safe
//! arena-of-`Box<dyn Any>` (the alternative shown by loxido's
//! `allocator.rs`): the teacher's raw-pointer approach is what the rest of
//! this crate's call frames and upvalues are built against, so it stays
//! primary.

pub mod object_bound_method;
pub mod object_class;
pub mod object_closure;
pub mod object_function;
pub mod object_instance;
pub mod object_native;
pub mod object_string;
pub mod object_upvalue;

use std::cell::Cell;
use std::mem::size_of;

use object_bound_method::ObjBoundMethod;
use object_class::ObjClass;
use object_closure::ObjClosure;
use object_function::ObjFunction;
use object_instance::ObjInstance;
use object_native::ObjNative;
use object_string::ObjString;
use object_upvalue::ObjUpvalue;

#[repr(C)]
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
pub enum ObjKind {
    String,
    Function,
    Native,
    Closure,
    Upvalue,
    Class,
    Instance,
    BoundMethod,
}

/// Header embedded as the first field of every heap object. `marked` is the
/// GC mark bit; `next` threads every live allocation into the object
/// manager's intrusive list so the sweep phase can walk them without a
/// separate `Vec<*mut ObjHeader>` bookkeeping structure duplicating it.
#[repr(C)]
pub struct ObjHeader {
    pub kind: ObjKind,
    pub marked: Cell<bool>,
    pub next: Cell<*mut ObjHeader>,
}

impl ObjHeader {
    pub fn new(kind: ObjKind) -> Self {
        ObjHeader {
            kind,
            marked: Cell::new(false),
            next: Cell::new(std::ptr::null_mut()),
        }
    }
}

/// Every concrete object reports its own allocation footprint so the GC's
/// byte-accounting (`Heap::bytes_allocated`) stays accurate as strings grow,
/// closures capture more upvalues, etc.
pub trait GcSize {
    fn shallow_size(&self) -> usize;
    fn deep_size(&self) -> usize {
        self.shallow_size()
    }
}

/// Safety: caller guarantees `header` actually points at the start of the
/// concrete object matching `header.kind` (true for every header obtained
/// from the object manager, which is the only place these are minted).
pub unsafe fn deep_size(header: *const ObjHeader) -> usize {
    match (*header).kind {
        ObjKind::String => (*(header as *const ObjString)).deep_size(),
        ObjKind::Function => (*(header as *const ObjFunction)).deep_size(),
        ObjKind::Native => (*(header as *const ObjNative)).deep_size(),
        ObjKind::Closure => (*(header as *const ObjClosure)).deep_size(),
        ObjKind::Upvalue => (*(header as *const ObjUpvalue)).deep_size(),
        ObjKind::Class => (*(header as *const ObjClass)).deep_size(),
        ObjKind::Instance => (*(header as *const ObjInstance)).deep_size(),
        ObjKind::BoundMethod => (*(header as *const ObjBoundMethod)).deep_size(),
    }
}

pub unsafe fn header_size() -> usize {
    size_of::<ObjHeader>()
}

/// Safety: same contract as `deep_size` — `header` must match its own kind.
pub unsafe fn object_fmt(header: *mut ObjHeader, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match (*header).kind {
        ObjKind::String => write!(f, "{}", (*(header as *const ObjString)).as_str()),
        ObjKind::Function => write!(f, "{}", *(header as *const ObjFunction)),
        ObjKind::Native => write!(f, "<native fn>"),
        ObjKind::Closure => write!(f, "{}", (*(header as *const ObjClosure)).function_display()),
        ObjKind::Upvalue => write!(f, "upvalue"),
        ObjKind::Class => write!(f, "{}", (*(header as *const ObjClass)).name_str()),
        ObjKind::Instance => write!(f, "{} instance", (*(header as *const ObjInstance)).class_name_str()),
        ObjKind::BoundMethod => write!(f, "{}", (*(header as *const ObjBoundMethod)).method_display()),
    }
}
