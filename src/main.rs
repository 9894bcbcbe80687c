//! CLI driver. Grounded in the teacher's `dynac/src/main.rs` module-
//! registration style (`mod chunk; mod debug; mod value;` ...), with the
//! REPL/run-file dispatch and exit codes taken from
//! `examples/original_source/clox/main.c`'s `repl`/`runFile`/`main`.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::ExitCode;

use wisp::{InterpretResult, Vm};

fn repl(vm: &mut Vm) {
    let stdin = io::stdin();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let mut line = String::new();
        if stdin.read_line(&mut line).unwrap_or(0) == 0 {
            println!();
            break;
        }
        vm.interpret(&line);
    }
}

fn run_file(vm: &mut Vm, path: &str) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Could not open file \"{}\": {}.", path, err);
            return ExitCode::from(74);
        }
    };
    match vm.interpret(&source) {
        InterpretResult::Ok => ExitCode::from(0),
        InterpretResult::CompileError => ExitCode::from(65),
        InterpretResult::RuntimeError => ExitCode::from(70),
    }
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let mut vm = Vm::new();

    match args.len() {
        1 => {
            repl(&mut vm);
            ExitCode::from(0)
        }
        2 => run_file(&mut vm, &args[1]),
        _ => {
            eprintln!("Usage: wisp [path]");
            ExitCode::from(64)
        }
    }
}
