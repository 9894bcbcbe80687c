use std::mem::size_of;

use super::object_class::ObjClass;
use super::{GcSize, ObjHeader, ObjKind};
use crate::table::Table;

#[repr(C)]
pub struct ObjInstance {
    pub header: ObjHeader,
    pub class: *mut ObjClass,
    pub fields: Table,
}

impl ObjInstance {
    pub fn new(class: *mut ObjClass) -> Self {
        ObjInstance {
            header: ObjHeader::new(ObjKind::Instance),
            class,
            fields: Table::new(),
        }
    }

    pub fn class_name_str(&self) -> &str {
        unsafe { (*self.class).name_str() }
    }
}

impl GcSize for ObjInstance {
    fn shallow_size(&self) -> usize {
        size_of::<ObjInstance>()
    }

    fn deep_size(&self) -> usize {
        size_of::<ObjInstance>() + self.fields.deep_size()
    }
}
