//! Whole-pipeline scenarios (scanner → compiler → VM), one per literal
//! input/output pair. Grounded directly in the source program this crate
//! implements (`examples/original_source/clox/vm.c`'s behavior), not in
//! the teacher, which never had an end-to-end suite of its own.

use std::io::Write;
use std::sync::{Arc, Mutex};

use wisp::{InterpretResult, Vm};

struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn run(source: &str) -> (InterpretResult, String, String) {
    let out = Arc::new(Mutex::new(Vec::new()));
    let err = Arc::new(Mutex::new(Vec::new()));
    let mut vm = Vm::with_io(Box::new(SharedWriter(out.clone())), Box::new(SharedWriter(err.clone())));
    let result = vm.interpret(source);
    let stdout = String::from_utf8(out.lock().unwrap().clone()).unwrap();
    let stderr = String::from_utf8(err.lock().unwrap().clone()).unwrap();
    (result, stdout, stderr)
}

#[test]
fn arithmetic_precedence() {
    let (result, out, _) = run("print 1 + 2 * 3;");
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "7\n");
}

#[test]
fn string_concatenation_is_interned() {
    let (result, out, _) = run(
        r#"
        var a = "he";
        var b = "llo";
        print a + b;
        print (a + b) == "hello";
        "#,
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "hello\ntrue\n");
}

#[test]
fn closures_share_state_across_calls() {
    let (result, out, _) = run(
        r#"
        fun makeCounter() {
            var i = 0;
            fun c() {
                i = i + 1;
                return i;
            }
            return c;
        }
        var c = makeCounter();
        print c();
        print c();
        print c();
        "#,
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "1\n2\n3\n");
}

#[test]
fn constructor_and_method_call() {
    let (result, out, _) = run(
        r#"
        class A {
            init(x) {
                this.x = x;
            }
            get() {
                return this.x;
            }
        }
        print A(42).get();
        "#,
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "42\n");
}

#[test]
fn inheritance_and_super_calls() {
    let (result, out, _) = run(
        r#"
        class A {
            f() {
                return "A";
            }
        }
        class B < A {
            f() {
                return "B" + super.f();
            }
        }
        print B().f();
        "#,
    );
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "BA\n");
}

#[test]
fn undefined_variable_assignment_is_a_runtime_error_and_leaves_globals_unchanged() {
    let (result, out, err) = run(
        r#"
        var x;
        print x;
        y = 1;
        "#,
    );
    assert_eq!(out, "nil\n");
    assert_eq!(result, InterpretResult::RuntimeError);
    assert!(err.contains("Undefined variable 'y'."));
}

#[test]
fn sixty_four_nested_frames_succeed_and_the_sixty_fifth_overflows() {
    // The script's own frame counts against FRAMES_MAX, so f(62) makes for
    // exactly 64 live frames (script + 63 calls of f) and still succeeds;
    // f(63) needs a 65th and overflows.
    let source = "fun f(n) { if (n == 0) { return 0; } return 1 + f(n - 1); } print f(62);";
    let (result, out, _) = run(source);
    assert_eq!(result, InterpretResult::Ok);
    assert_eq!(out, "62\n");

    let overflowing = "fun f(n) { if (n == 0) { return 0; } return 1 + f(n - 1); } print f(63);";
    let (result, _out, err) = run(overflowing);
    assert_eq!(result, InterpretResult::RuntimeError);
    assert!(err.contains("Stack overflow."));
}

#[test]
fn compile_error_short_circuits_before_running() {
    let (result, out, _err) = run("print 1 +;");
    assert_eq!(result, InterpretResult::CompileError);
    assert_eq!(out, "");
}
