//! The dispatch loop and call protocol. Grounded structurally in the
//! teacher's `dynac/src/vm.rs` (`push`/`pop`/`peek`/`is_falsey`/`run`/
//! `binary_op`/`read_byte`/`read_constant`, and the
//! `debug_trace_execution`-gated tracing module), with the actual runtime
//! semantics — `call`/`call_value`/`invoke`/`bind_method`,
//! upvalue capture/close, the stack-trace format, and every opcode's exact
//! behavior — taken from `examples/original_source/clox/vm.c`, which is
//! this crate's semantics in their original form.

use std::io::Write;

use crate::call_frame::CallFrame;
use crate::chunk::OpCode;
use crate::compiler::compile;
use crate::constants::FRAMES_MAX;
use crate::gc::GcRoots;
use crate::heap::Heap;
use crate::objects::object_bound_method::ObjBoundMethod;
use crate::objects::object_class::ObjClass;
use crate::objects::object_closure::ObjClosure;
use crate::objects::object_function::ObjFunction;
use crate::objects::object_instance::ObjInstance;
use crate::objects::object_native::ObjNative;
use crate::objects::object_string::ObjString;
use crate::objects::object_upvalue::{ObjUpvalue, UpvalueState};
use crate::objects::{ObjHeader, ObjKind};
use crate::std_mod::time::ClockNative;
use crate::table::Table;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretResult {
    Ok,
    CompileError,
    RuntimeError,
}

/// Builds a `GcRoots` directly from `$self`'s fields (never through a
/// `&self` helper method) so the borrow checker sees disjoint field
/// borrows and a subsequent `$self.heap.alloc_*` call on the same
/// expression is free to borrow `heap` mutably at the same time.
macro_rules! roots {
    ($self:ident, $extra:expr) => {
        GcRoots {
            stack: &$self.stack,
            frames: &$self.frames,
            open_upvalues: &$self.open_upvalues,
            globals: &$self.globals,
            init_string: $self.init_string as *mut ObjHeader,
            extra: $extra,
        }
    };
}

pub struct Vm {
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: Table,
    heap: Heap,
    open_upvalues: Vec<*mut ObjUpvalue>,
    init_string: *mut ObjString,
    out: Box<dyn Write>,
    err: Box<dyn Write>,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_io(Box::new(std::io::stdout()), Box::new(std::io::stderr()))
    }

    pub fn with_io(out: Box<dyn Write>, err: Box<dyn Write>) -> Self {
        let mut heap = Heap::new();
        let globals = Table::new();
        let init_string = heap.intern(
            "init",
            GcRoots {
                stack: &[],
                frames: &[],
                open_upvalues: &[],
                globals: &globals,
                init_string: std::ptr::null_mut(),
                extra: &[],
            },
        );
        let mut vm = Vm {
            stack: Vec::with_capacity(crate::constants::MAX_STACK_SIZE),
            frames: Vec::with_capacity(FRAMES_MAX),
            globals,
            heap,
            open_upvalues: Vec::new(),
            init_string,
            out,
            err,
        };
        vm.define_native("clock", 0, Box::new(ClockNative));
        vm
    }

    fn define_native(&mut self, name: &str, arity: u8, native: Box<dyn crate::objects::object_native::NativeObject>) {
        let name_str = self.heap.intern(name, roots!(self, &[]));
        self.stack.push(Value::Obj(name_str as *mut ObjHeader));
        let native_obj = self.heap.alloc_native(name.to_string(), arity, native, roots!(self, &[]));
        self.stack.push(Value::Obj(native_obj as *mut ObjHeader));
        let value = *self.stack.last().unwrap();
        self.globals.set(name_str, value);
        self.stack.pop();
        self.stack.pop();
    }

    fn reset_stack(&mut self) {
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();
    }

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("stack underflow")
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    fn runtime_error(&mut self, message: &str) {
        let _ = writeln!(self.err, "{}", message);
        for frame in self.frames.iter().rev() {
            let function = frame.function();
            let line = unsafe { (*function).chunk.lines[frame.ip.saturating_sub(1)] };
            let name = unsafe { (*function).name_str().to_string() };
            if name == "script" {
                let _ = writeln!(self.err, "[line {}] in script", line);
            } else {
                let _ = writeln!(self.err, "[line {}] in {}()", line, name);
            }
        }
        self.reset_stack();
    }

    // ---- call protocol ----

    fn call(&mut self, closure: *mut ObjClosure, arg_count: u8) -> bool {
        let function = unsafe { (*closure).function };
        let arity = unsafe { (*function).arity };
        if arg_count != arity {
            self.runtime_error(&format!("Expected {} arguments but got {}.", arity, arg_count));
            return false;
        }
        if self.frames.len() == FRAMES_MAX {
            self.runtime_error("Stack overflow.");
            return false;
        }
        let slot_base = self.stack.len() - arg_count as usize - 1;
        self.frames.push(CallFrame::new(closure, slot_base));
        true
    }

    fn call_value(&mut self, callee: Value, arg_count: u8) -> bool {
        let ptr = match callee {
            Value::Obj(ptr) => ptr,
            _ => {
                self.runtime_error("Can only call functions and classes.");
                return false;
            }
        };
        match unsafe { (*ptr).kind } {
            ObjKind::BoundMethod => {
                let bound = ptr as *mut ObjBoundMethod;
                let receiver = unsafe { (*bound).receiver };
                let len = self.stack.len();
                self.stack[len - arg_count as usize - 1] = receiver;
                self.call(unsafe { (*bound).method }, arg_count)
            }
            ObjKind::Class => {
                let class = ptr as *mut ObjClass;
                let extra = [ptr];
                let instance = self.heap.alloc_instance(class, roots!(self, &extra));
                let len = self.stack.len();
                self.stack[len - arg_count as usize - 1] = Value::Obj(instance as *mut ObjHeader);
                let init = unsafe { (*class).methods.get(self.init_string) };
                if let Some(init_value) = init {
                    let closure = init_value.as_obj() as *mut ObjClosure;
                    self.call(closure, arg_count)
                } else if arg_count != 0 {
                    self.runtime_error(&format!("Expected 0 arguments but got {}.", arg_count));
                    false
                } else {
                    true
                }
            }
            ObjKind::Closure => self.call(ptr as *mut ObjClosure, arg_count),
            ObjKind::Native => {
                let native = ptr as *mut ObjNative;
                let arity = unsafe { (*native).arity };
                if arg_count != arity {
                    self.runtime_error(&format!("Expected {} arguments but got {}.", arity, arg_count));
                    return false;
                }
                let len = self.stack.len();
                let args: Vec<Value> = self.stack[len - arg_count as usize..].to_vec();
                match unsafe { (*native).native.run(&args) } {
                    Ok(result) => {
                        self.stack.truncate(len - arg_count as usize - 1);
                        self.push(result);
                        true
                    }
                    Err(message) => {
                        self.runtime_error(&message);
                        false
                    }
                }
            }
            _ => {
                self.runtime_error("Can only call functions and classes.");
                false
            }
        }
    }

    fn invoke_from_class(&mut self, class: *mut ObjClass, name: *mut ObjString, arg_count: u8) -> bool {
        match unsafe { (*class).methods.get(name) } {
            Some(method) => self.call(method.as_obj() as *mut ObjClosure, arg_count),
            None => {
                self.runtime_error(&format!("Undefined property '{}'.", unsafe { (*name).as_str() }));
                false
            }
        }
    }

    fn invoke(&mut self, name: *mut ObjString, arg_count: u8) -> bool {
        let receiver = self.peek(arg_count as usize);
        if !receiver.is_obj_kind(ObjKind::Instance) {
            self.runtime_error("Only instances have methods.");
            return false;
        }
        let instance = receiver.as_obj() as *mut ObjInstance;
        if let Some(value) = unsafe { (*instance).fields.get(name) } {
            let len = self.stack.len();
            self.stack[len - 1 - arg_count as usize] = value;
            return self.call_value(value, arg_count);
        }
        let class = unsafe { (*instance).class };
        self.invoke_from_class(class, name, arg_count)
    }

    fn bind_method(&mut self, class: *mut ObjClass, name: *mut ObjString) -> bool {
        let method = match unsafe { (*class).methods.get(name) } {
            Some(m) => m,
            None => {
                self.runtime_error(&format!("Undefined property '{}'.", unsafe { (*name).as_str() }));
                return false;
            }
        };
        let receiver = self.peek(0);
        let method_ptr = method.as_obj();
        let extra = [method_ptr];
        let bound = self.heap.alloc_bound_method(receiver, method_ptr as *mut ObjClosure, roots!(self, &extra));
        self.pop();
        self.push(Value::Obj(bound as *mut ObjHeader));
        true
    }

    fn define_method(&mut self, name: *mut ObjString) {
        let method = self.peek(0);
        let class = self.peek(1).as_obj() as *mut ObjClass;
        unsafe { (*class).methods.set(name, method) };
        self.pop();
    }

    // ---- upvalues ----

    fn capture_upvalue(&mut self, stack_index: usize) -> *mut ObjUpvalue {
        let mut insert_at = self.open_upvalues.len();
        for (i, &uv) in self.open_upvalues.iter().enumerate() {
            match unsafe { (*uv).stack_index() } {
                Some(idx) if idx == stack_index => return uv,
                Some(idx) if idx < stack_index => {
                    insert_at = i;
                    break;
                }
                _ => {}
            }
        }
        let created = self.heap.alloc_upvalue(stack_index, roots!(self, &[]));
        self.open_upvalues.insert(insert_at, created);
        created
    }

    fn close_upvalues(&mut self, from_index: usize) {
        while let Some(&uv) = self.open_upvalues.first() {
            let idx = match unsafe { (*uv).stack_index() } {
                Some(i) => i,
                None => break,
            };
            if idx < from_index {
                break;
            }
            let value = self.stack[idx];
            unsafe { (*uv).close(value) };
            self.open_upvalues.remove(0);
        }
    }

    fn concatenate(&mut self) {
        let b_ptr = self.peek(0).as_obj();
        let a_ptr = self.peek(1).as_obj();
        let combined = format!("{}{}", self.peek(1).as_str(), self.peek(0).as_str());
        let extra = [a_ptr, b_ptr];
        let result = self.heap.intern(&combined, roots!(self, &extra));
        self.pop();
        self.pop();
        self.push(Value::Obj(result as *mut ObjHeader));
    }

    fn binary_numeric_op(&mut self, f: fn(f64, f64) -> Value) -> bool {
        if !self.peek(0).is_number() || !self.peek(1).is_number() {
            self.runtime_error("Operands must be numbers.");
            return false;
        }
        let b = self.pop().as_number();
        let a = self.pop().as_number();
        self.push(f(a, b));
        true
    }

    // ---- bytecode reading ----

    fn current_function(&self) -> *mut ObjFunction {
        self.frames.last().unwrap().function()
    }

    fn read_byte(&mut self) -> u8 {
        let function = self.current_function();
        let frame = self.frames.last_mut().unwrap();
        let byte = unsafe { (*function).chunk.code[frame.ip] };
        frame.ip += 1;
        byte
    }

    fn read_short(&mut self) -> u16 {
        let hi = self.read_byte() as u16;
        let lo = self.read_byte() as u16;
        (hi << 8) | lo
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_byte();
        let function = self.current_function();
        unsafe { (*function).chunk.constants[index as usize] }
    }

    fn read_string(&mut self) -> *mut ObjString {
        unsafe { self.read_constant().as_obj_string() }
    }

    #[cfg(feature = "debug_trace_execution")]
    fn trace(&self) {
        print!("          ");
        for value in &self.stack {
            print!("[ {} ]", value);
        }
        println!();
        let frame = self.frames.last().unwrap();
        let function = frame.function();
        unsafe {
            crate::debug::disassemble_instruction(&(*function).chunk, frame.ip);
        }
    }

    fn run(&mut self) -> InterpretResult {
        loop {
            #[cfg(feature = "debug_trace_execution")]
            self.trace();

            let instruction = self.read_byte();
            let op = match OpCode::from_byte(instruction) {
                Some(op) => op,
                None => {
                    self.runtime_error("Unknown opcode.");
                    return InterpretResult::RuntimeError;
                }
            };
            match op {
                OpCode::Constant => {
                    let value = self.read_constant();
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frames.last().unwrap().slot_base;
                    self.push(self.stack[base + slot]);
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte() as usize;
                    let base = self.frames.last().unwrap().slot_base;
                    self.stack[base + slot] = self.peek(0);
                }
                OpCode::GetGlobal => {
                    let name = self.read_string();
                    match self.globals.get(name) {
                        Some(value) => self.push(value),
                        None => {
                            let message = format!("Undefined variable '{}'.", unsafe { (*name).as_str() });
                            self.runtime_error(&message);
                            return InterpretResult::RuntimeError;
                        }
                    }
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string();
                    let value = self.peek(0);
                    self.globals.set(name, value);
                    self.pop();
                }
                OpCode::SetGlobal => {
                    let name = self.read_string();
                    let value = self.peek(0);
                    if self.globals.set(name, value) {
                        self.globals.delete(name);
                        let message = format!("Undefined variable '{}'.", unsafe { (*name).as_str() });
                        self.runtime_error(&message);
                        return InterpretResult::RuntimeError;
                    }
                }
                OpCode::GetUpvalue => {
                    let slot = self.read_byte() as usize;
                    let closure = self.frames.last().unwrap().closure;
                    let upvalue = unsafe { (*closure).upvalues[slot] };
                    let value = match unsafe { (*upvalue).state.get() } {
                        UpvalueState::Open(i) => self.stack[i],
                        UpvalueState::Closed(v) => v,
                    };
                    self.push(value);
                }
                OpCode::SetUpvalue => {
                    let slot = self.read_byte() as usize;
                    let closure = self.frames.last().unwrap().closure;
                    let upvalue = unsafe { (*closure).upvalues[slot] };
                    let value = self.peek(0);
                    match unsafe { (*upvalue).state.get() } {
                        UpvalueState::Open(i) => self.stack[i] = value,
                        UpvalueState::Closed(_) => unsafe { (*upvalue).state.set(UpvalueState::Closed(value)) },
                    }
                }
                OpCode::GetProperty => {
                    let receiver = self.peek(0);
                    if !receiver.is_obj_kind(ObjKind::Instance) {
                        self.runtime_error("Only instances have properties.");
                        return InterpretResult::RuntimeError;
                    }
                    let instance = receiver.as_obj() as *mut ObjInstance;
                    let name = self.read_string();
                    if let Some(value) = unsafe { (*instance).fields.get(name) } {
                        self.pop();
                        self.push(value);
                    } else {
                        let class = unsafe { (*instance).class };
                        if !self.bind_method(class, name) {
                            return InterpretResult::RuntimeError;
                        }
                    }
                }
                OpCode::SetProperty => {
                    let receiver = self.peek(1);
                    if !receiver.is_obj_kind(ObjKind::Instance) {
                        self.runtime_error("Only instances have fields.");
                        return InterpretResult::RuntimeError;
                    }
                    let instance = receiver.as_obj() as *mut ObjInstance;
                    let name = self.read_string();
                    let value = self.peek(0);
                    unsafe { (*instance).fields.set(name, value) };
                    let value = self.pop();
                    self.pop();
                    self.push(value);
                }
                OpCode::GetSuper => {
                    let name = self.read_string();
                    let superclass = self.pop().as_obj() as *mut ObjClass;
                    if !self.bind_method(superclass, name) {
                        return InterpretResult::RuntimeError;
                    }
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b));
                }
                OpCode::Greater => {
                    if !self.binary_numeric_op(|a, b| Value::Bool(a > b)) {
                        return InterpretResult::RuntimeError;
                    }
                }
                OpCode::Less => {
                    if !self.binary_numeric_op(|a, b| Value::Bool(a < b)) {
                        return InterpretResult::RuntimeError;
                    }
                }
                OpCode::Add => {
                    if self.peek(0).is_string() && self.peek(1).is_string() {
                        self.concatenate();
                    } else if self.peek(0).is_number() && self.peek(1).is_number() {
                        let b = self.pop().as_number();
                        let a = self.pop().as_number();
                        self.push(Value::Number(a + b));
                    } else {
                        self.runtime_error("Operands must be two numbers or two strings.");
                        return InterpretResult::RuntimeError;
                    }
                }
                OpCode::Subtract => {
                    if !self.binary_numeric_op(|a, b| Value::Number(a - b)) {
                        return InterpretResult::RuntimeError;
                    }
                }
                OpCode::Multiply => {
                    if !self.binary_numeric_op(|a, b| Value::Number(a * b)) {
                        return InterpretResult::RuntimeError;
                    }
                }
                OpCode::Divide => {
                    if !self.binary_numeric_op(|a, b| Value::Number(a / b)) {
                        return InterpretResult::RuntimeError;
                    }
                }
                OpCode::Negate => {
                    if !self.peek(0).is_number() {
                        self.runtime_error("Operand must be a number.");
                        return InterpretResult::RuntimeError;
                    }
                    let value = -self.pop().as_number();
                    self.push(Value::Number(value));
                }
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsey()));
                }
                OpCode::Print => {
                    let value = self.pop();
                    let _ = writeln!(self.out, "{}", value);
                }
                OpCode::Jump => {
                    let offset = self.read_short();
                    self.frames.last_mut().unwrap().ip += offset as usize;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_short();
                    if self.peek(0).is_falsey() {
                        self.frames.last_mut().unwrap().ip += offset as usize;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_short();
                    self.frames.last_mut().unwrap().ip -= offset as usize;
                }
                OpCode::Call => {
                    let arg_count = self.read_byte();
                    let callee = self.peek(arg_count as usize);
                    if !self.call_value(callee, arg_count) {
                        return InterpretResult::RuntimeError;
                    }
                }
                OpCode::Invoke => {
                    let method = self.read_string();
                    let arg_count = self.read_byte();
                    if !self.invoke(method, arg_count) {
                        return InterpretResult::RuntimeError;
                    }
                }
                OpCode::SuperInvoke => {
                    let method = self.read_string();
                    let arg_count = self.read_byte();
                    let superclass = self.pop().as_obj() as *mut ObjClass;
                    if !self.invoke_from_class(superclass, method, arg_count) {
                        return InterpretResult::RuntimeError;
                    }
                }
                OpCode::Closure => {
                    let function_value = self.read_constant();
                    let function = function_value.as_obj() as *mut ObjFunction;
                    let extra = [function as *mut ObjHeader];
                    let closure = self.heap.alloc_closure(function, roots!(self, &extra));
                    self.push(Value::Obj(closure as *mut ObjHeader));
                    let upvalue_count = unsafe { (*function).upvalue_count };
                    for _ in 0..upvalue_count {
                        let is_local = self.read_byte();
                        let index = self.read_byte();
                        let upvalue = if is_local == 1 {
                            let base = self.frames.last().unwrap().slot_base;
                            self.capture_upvalue(base + index as usize)
                        } else {
                            let enclosing = self.frames.last().unwrap().closure;
                            unsafe { (*enclosing).upvalues[index as usize] }
                        };
                        unsafe { (*closure).upvalues.push(upvalue) };
                    }
                }
                OpCode::CloseUpvalue => {
                    let top = self.stack.len() - 1;
                    self.close_upvalues(top);
                    self.pop();
                }
                OpCode::Return => {
                    let result = self.pop();
                    let frame = self.frames.pop().unwrap();
                    self.close_upvalues(frame.slot_base);
                    if self.frames.is_empty() {
                        self.pop();
                        return InterpretResult::Ok;
                    }
                    self.stack.truncate(frame.slot_base);
                    self.push(result);
                }
                OpCode::Class => {
                    let name = self.read_string();
                    let class = self.heap.alloc_class(name, roots!(self, &[]));
                    self.push(Value::Obj(class as *mut ObjHeader));
                }
                OpCode::Inherit => {
                    let superclass_value = self.peek(1);
                    if !superclass_value.is_obj_kind(ObjKind::Class) {
                        self.runtime_error("Superclass must be a class.");
                        return InterpretResult::RuntimeError;
                    }
                    let superclass = superclass_value.as_obj() as *mut ObjClass;
                    let subclass = self.peek(0).as_obj() as *mut ObjClass;
                    unsafe {
                        let super_methods: *const Table = &(*superclass).methods;
                        (*subclass).methods.add_all(&*super_methods);
                    }
                    self.pop();
                }
                OpCode::Method => {
                    let name = self.read_string();
                    self.define_method(name);
                }
            }
        }
    }

    pub fn interpret(&mut self, source: &str) -> InterpretResult {
        let function = match compile(source, &mut self.heap, &self.globals) {
            Some(f) => f,
            None => return InterpretResult::CompileError,
        };
        self.push(Value::Obj(function as *mut ObjHeader));
        let extra = [function as *mut ObjHeader];
        let closure = self.heap.alloc_closure(function, roots!(self, &extra));
        self.pop();
        self.push(Value::Obj(closure as *mut ObjHeader));
        if !self.call(closure, 0) {
            return InterpretResult::RuntimeError;
        }
        self.run()
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> (InterpretResult, String, String) {
        let out = Box::new(Vec::<u8>::new());
        let err = Box::new(Vec::<u8>::new());
        // Capture buffers are owned by the VM; pull them back out via a
        // second pass isn't possible once moved, so use a shared sink.
        let out_buf = std::sync::Arc::new(std::sync::Mutex::new(Vec::<u8>::new()));
        let err_buf = std::sync::Arc::new(std::sync::Mutex::new(Vec::<u8>::new()));
        struct SharedWriter(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);
        impl Write for SharedWriter {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().write(buf)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let _ = out;
        let _ = err;
        let mut vm = Vm::with_io(Box::new(SharedWriter(out_buf.clone())), Box::new(SharedWriter(err_buf.clone())));
        let result = vm.interpret(source);
        let stdout = String::from_utf8(out_buf.lock().unwrap().clone()).unwrap();
        let stderr = String::from_utf8(err_buf.lock().unwrap().clone()).unwrap();
        (result, stdout, stderr)
    }

    #[test]
    fn prints_arithmetic() {
        let (result, out, _err) = run("print 1 + 2 * 3;");
        assert_eq!(result, InterpretResult::Ok);
        assert_eq!(out, "7\n");
    }

    #[test]
    fn string_concatenation() {
        let (result, out, _err) = run("print \"foo\" + \"bar\";");
        assert_eq!(result, InterpretResult::Ok);
        assert_eq!(out, "foobar\n");
    }

    #[test]
    fn closures_capture_and_mutate_shared_upvalues() {
        let source = r#"
            fun makeCounter() {
                var count = 0;
                fun increment() {
                    count = count + 1;
                    print count;
                }
                return increment;
            }
            var counter = makeCounter();
            counter();
            counter();
        "#;
        let (result, out, _err) = run(source);
        assert_eq!(result, InterpretResult::Ok);
        assert_eq!(out, "1\n2\n");
    }

    #[test]
    fn classes_methods_and_inheritance() {
        let source = r#"
            class Animal {
                init(name) {
                    this.name = name;
                }
                speak() {
                    print this.name + " makes a sound.";
                }
            }
            class Dog < Animal {
                speak() {
                    super.speak();
                    print this.name + " barks.";
                }
            }
            var d = Dog("Rex");
            d.speak();
        "#;
        let (result, out, _err) = run(source);
        assert_eq!(result, InterpretResult::Ok);
        assert_eq!(out, "Rex makes a sound.\nRex barks.\n");
    }

    #[test]
    fn runtime_error_reports_a_stack_trace() {
        let source = "fun a() { b(); } fun b() { nil + 1; } a();";
        let (result, _out, err) = run(source);
        assert_eq!(result, InterpretResult::RuntimeError);
        assert!(err.contains("Operands must be two numbers or two strings."));
        assert!(err.contains("in b()"));
        assert!(err.contains("in a()"));
        assert!(err.contains("in script"));
    }

    #[test]
    fn undefined_global_is_a_runtime_error() {
        let (result, _out, err) = run("print undefinedThing;");
        assert_eq!(result, InterpretResult::RuntimeError);
        assert!(err.contains("Undefined variable 'undefinedThing'."));
    }

    #[test]
    fn gc_instance_fields_survive_cycle() {
        let source = r#"
            class Box { }
            var b = Box();
            b.value = "kept";
            print b.value;
        "#;
        let (result, out, _err) = run(source);
        assert_eq!(result, InterpretResult::Ok);
        assert_eq!(out, "kept\n");
    }
}
