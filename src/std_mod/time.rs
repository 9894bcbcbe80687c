//! Grounded in the teacher's `dynac/src/std_mod/time.rs` (`ClockTime`
//! implementing `NativeObject::run`), adjusted from milliseconds-since-
//! `UNIX_EPOCH` to seconds-since-process-start, matching the bundled
//! `clock()` native's contract.

use std::time::Instant;

use once_cell::sync::OnceCell;

use crate::objects::object_native::NativeObject;
use crate::value::Value;

static PROCESS_START: OnceCell<Instant> = OnceCell::new();

fn process_start() -> Instant {
    *PROCESS_START.get_or_init(Instant::now)
}

pub struct ClockNative;

impl NativeObject for ClockNative {
    fn run(&self, _args: &[Value]) -> Result<Value, String> {
        Ok(Value::Number(process_start().elapsed().as_secs_f64()))
    }
}
