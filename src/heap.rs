//! The allocator. Grounded in the teacher's `objects/object_manager.rs`
//! (`alloc_string`/`alloc_function`/`alloc_closure`/... via
//! `Box::into_raw`, `pending_bytes` accounting) and in loxido's
//! `allocator.rs` `alloc_gc`/`intern_gc` pattern of threading the current
//! GC roots through every allocating call so a collection can safely run
//! mid-allocation. Combines what the teacher split into `ObjectManager`
//! (bookkeeping) and `GarbageCollector` (mark/sweep) into one owner, since
//! both need the same intrusive object list and byte counter.

use crate::constants::INITIAL_GC_THRESHOLD;
use crate::gc::{GCStats, GarbageCollector, GcRoots};
use crate::objects::object_bound_method::ObjBoundMethod;
use crate::objects::object_class::ObjClass;
use crate::objects::object_closure::ObjClosure;
use crate::objects::object_function::ObjFunction;
use crate::objects::object_instance::ObjInstance;
use crate::objects::object_native::{NativeObject, ObjNative};
use crate::objects::object_string::{fnv1a, ObjString};
use crate::objects::object_upvalue::ObjUpvalue;
use crate::objects::{GcSize, ObjHeader};
use crate::table::Table;
use crate::value::Value;

pub struct Heap {
    head: *mut ObjHeader,
    pub strings: Table,
    pub bytes_allocated: usize,
    pub next_gc: usize,
    gc: GarbageCollector,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            head: std::ptr::null_mut(),
            strings: Table::new(),
            bytes_allocated: 0,
            next_gc: INITIAL_GC_THRESHOLD,
            gc: GarbageCollector::new(),
        }
    }

    pub fn stats(&self) -> &GCStats {
        self.gc.stats()
    }

    fn link<T: GcSize>(&mut self, object: T, header_kind_check: impl Fn(&T) -> *mut ObjHeader) -> *mut ObjHeader {
        let size = object.deep_size();
        let ptr = Box::into_raw(Box::new(object));
        let header = header_kind_check(unsafe { &*ptr });
        unsafe {
            (*header).next.set(self.head);
        }
        self.head = header;
        self.bytes_allocated += size;
        header
    }

    fn maybe_collect(&mut self, roots: GcRoots) {
        let should_collect = cfg!(feature = "stress_gc") || self.bytes_allocated > self.next_gc;
        if !should_collect {
            return;
        }
        let (head, after, next_gc) = self.gc.collect(self.head, self.bytes_allocated, &mut self.strings, roots);
        self.head = head;
        self.bytes_allocated = after;
        self.next_gc = next_gc;
    }

    /// Interns `content`, allocating a new `ObjString` only if an equal one
    /// isn't already known. Mirrors clox's `copyString`/`takeString` split
    /// collapsed into one call since Rust gives us an owned `String`
    /// either way.
    pub fn intern(&mut self, content: &str, roots: GcRoots) -> *mut ObjString {
        let hash = fnv1a(content.as_bytes());
        if let Some(existing) = self.strings.find_string(content.as_bytes(), hash) {
            return existing;
        }
        self.maybe_collect(roots);
        let header = self.link(ObjString::new(content.to_string(), hash), |s| {
            &s.header as *const _ as *mut ObjHeader
        });
        let string_ptr = header as *mut ObjString;
        self.strings.set(string_ptr, Value::Bool(true));
        string_ptr
    }

    pub fn alloc_function(&mut self, name: *mut ObjString, roots: GcRoots) -> *mut ObjFunction {
        self.maybe_collect(roots);
        let header = self.link(ObjFunction::new(name), |f| &f.header as *const _ as *mut ObjHeader);
        header as *mut ObjFunction
    }

    pub fn alloc_native(&mut self, name: String, arity: u8, native: Box<dyn NativeObject>, roots: GcRoots) -> *mut ObjNative {
        self.maybe_collect(roots);
        let header = self.link(ObjNative::new(name, arity, native), |n| &n.header as *const _ as *mut ObjHeader);
        header as *mut ObjNative
    }

    pub fn alloc_closure(&mut self, function: *mut ObjFunction, roots: GcRoots) -> *mut ObjClosure {
        self.maybe_collect(roots);
        let header = self.link(ObjClosure::new(function), |c| &c.header as *const _ as *mut ObjHeader);
        header as *mut ObjClosure
    }

    pub fn alloc_upvalue(&mut self, stack_index: usize, roots: GcRoots) -> *mut ObjUpvalue {
        self.maybe_collect(roots);
        let header = self.link(ObjUpvalue::new(stack_index), |u| &u.header as *const _ as *mut ObjHeader);
        header as *mut ObjUpvalue
    }

    pub fn alloc_class(&mut self, name: *mut ObjString, roots: GcRoots) -> *mut ObjClass {
        self.maybe_collect(roots);
        let header = self.link(ObjClass::new(name), |c| &c.header as *const _ as *mut ObjHeader);
        header as *mut ObjClass
    }

    pub fn alloc_instance(&mut self, class: *mut ObjClass, roots: GcRoots) -> *mut ObjInstance {
        self.maybe_collect(roots);
        let header = self.link(ObjInstance::new(class), |i| &i.header as *const _ as *mut ObjHeader);
        header as *mut ObjInstance
    }

    pub fn alloc_bound_method(&mut self, receiver: Value, method: *mut ObjClosure, roots: GcRoots) -> *mut ObjBoundMethod {
        self.maybe_collect(roots);
        let header = self.link(ObjBoundMethod::new(receiver, method), |b| &b.header as *const _ as *mut ObjHeader);
        header as *mut ObjBoundMethod
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Heap {
    /// Frees every remaining object unconditionally — there is no live VM
    /// left to root anything against, matching the teacher's
    /// `ObjectManager`'s own `Drop` impl.
    fn drop(&mut self) {
        let mut current = self.head;
        while !current.is_null() {
            let next = unsafe { (*current).next.get() };
            unsafe { free_on_drop(current) };
            current = next;
        }
    }
}

unsafe fn free_on_drop(ptr: *mut ObjHeader) {
    use crate::objects::ObjKind;
    match (*ptr).kind {
        ObjKind::String => drop(Box::from_raw(ptr as *mut ObjString)),
        ObjKind::Function => drop(Box::from_raw(ptr as *mut ObjFunction)),
        ObjKind::Native => drop(Box::from_raw(ptr as *mut ObjNative)),
        ObjKind::Closure => drop(Box::from_raw(ptr as *mut ObjClosure)),
        ObjKind::Upvalue => drop(Box::from_raw(ptr as *mut ObjUpvalue)),
        ObjKind::Class => drop(Box::from_raw(ptr as *mut ObjClass)),
        ObjKind::Instance => drop(Box::from_raw(ptr as *mut ObjInstance)),
        ObjKind::BoundMethod => drop(Box::from_raw(ptr as *mut ObjBoundMethod)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_roots<'a>(globals: &'a Table) -> GcRoots<'a> {
        GcRoots {
            stack: &[],
            frames: &[],
            open_upvalues: &[],
            globals,
            init_string: std::ptr::null_mut(),
            extra: &[],
        }
    }

    #[test]
    fn interning_the_same_content_returns_the_same_pointer() {
        let mut heap = Heap::new();
        let globals = Table::new();
        let a = heap.intern("hi", no_roots(&globals));
        let b = heap.intern("hi", no_roots(&globals));
        assert_eq!(a, b);
    }

    #[test]
    fn allocations_are_tracked_in_bytes_allocated() {
        let mut heap = Heap::new();
        let globals = Table::new();
        assert_eq!(heap.bytes_allocated, 0);
        heap.intern("tracked", no_roots(&globals));
        assert!(heap.bytes_allocated > 0);
    }
}
