//! Instruction disassembler, grounded in the teacher's root-level
//! `src/debug.rs` (`disassemble_chunk`/`disassemble_instruction`/
//! `jump_instruction`/`constant_instruction`/`simple_instruction`/
//! `byte_instruction`), extended to cover the full opcode table (the
//! teacher's draft only handles a handful of opcodes). Only compiled in
//! when a debug feature actually wants it, so it never costs anything in
//! a release build without `debug_print_code`/`debug_trace_execution`.

use crate::chunk::{Chunk, OpCode};

pub fn disassemble_chunk(chunk: &Chunk, name: &str) {
    println!("== {} ==", name);
    let mut offset = 0;
    while offset < chunk.len() {
        offset = disassemble_instruction(chunk, offset);
    }
}

pub fn disassemble_instruction(chunk: &Chunk, offset: usize) -> usize {
    print!("{:04} ", offset);
    if offset > 0 && chunk.lines[offset] == chunk.lines[offset - 1] {
        print!("   | ");
    } else {
        print!("{:4} ", chunk.lines[offset]);
    }

    let byte = chunk.code[offset];
    match OpCode::from_byte(byte) {
        Some(op) => match op {
            OpCode::Constant => constant_instruction("OP_CONSTANT", chunk, offset),
            OpCode::Nil => simple_instruction("OP_NIL", offset),
            OpCode::True => simple_instruction("OP_TRUE", offset),
            OpCode::False => simple_instruction("OP_FALSE", offset),
            OpCode::Pop => simple_instruction("OP_POP", offset),
            OpCode::GetLocal => byte_instruction("OP_GET_LOCAL", chunk, offset),
            OpCode::SetLocal => byte_instruction("OP_SET_LOCAL", chunk, offset),
            OpCode::GetGlobal => constant_instruction("OP_GET_GLOBAL", chunk, offset),
            OpCode::DefineGlobal => constant_instruction("OP_DEFINE_GLOBAL", chunk, offset),
            OpCode::SetGlobal => constant_instruction("OP_SET_GLOBAL", chunk, offset),
            OpCode::GetUpvalue => byte_instruction("OP_GET_UPVALUE", chunk, offset),
            OpCode::SetUpvalue => byte_instruction("OP_SET_UPVALUE", chunk, offset),
            OpCode::GetProperty => constant_instruction("OP_GET_PROPERTY", chunk, offset),
            OpCode::SetProperty => constant_instruction("OP_SET_PROPERTY", chunk, offset),
            OpCode::GetSuper => constant_instruction("OP_GET_SUPER", chunk, offset),
            OpCode::Equal => simple_instruction("OP_EQUAL", offset),
            OpCode::Greater => simple_instruction("OP_GREATER", offset),
            OpCode::Less => simple_instruction("OP_LESS", offset),
            OpCode::Add => simple_instruction("OP_ADD", offset),
            OpCode::Subtract => simple_instruction("OP_SUBTRACT", offset),
            OpCode::Multiply => simple_instruction("OP_MULTIPLY", offset),
            OpCode::Divide => simple_instruction("OP_DIVIDE", offset),
            OpCode::Negate => simple_instruction("OP_NEGATE", offset),
            OpCode::Not => simple_instruction("OP_NOT", offset),
            OpCode::Print => simple_instruction("OP_PRINT", offset),
            OpCode::Jump => jump_instruction("OP_JUMP", 1, chunk, offset),
            OpCode::JumpIfFalse => jump_instruction("OP_JUMP_IF_FALSE", 1, chunk, offset),
            OpCode::Loop => jump_instruction("OP_LOOP", -1, chunk, offset),
            OpCode::Call => byte_instruction("OP_CALL", chunk, offset),
            OpCode::Invoke => invoke_instruction("OP_INVOKE", chunk, offset),
            OpCode::SuperInvoke => invoke_instruction("OP_SUPER_INVOKE", chunk, offset),
            OpCode::Closure => closure_instruction(chunk, offset),
            OpCode::CloseUpvalue => simple_instruction("OP_CLOSE_UPVALUE", offset),
            OpCode::Return => simple_instruction("OP_RETURN", offset),
            OpCode::Class => constant_instruction("OP_CLASS", chunk, offset),
            OpCode::Inherit => simple_instruction("OP_INHERIT", offset),
            OpCode::Method => constant_instruction("OP_METHOD", chunk, offset),
        },
        None => {
            println!("Unknown opcode {}", byte);
            offset + 1
        }
    }
}

fn simple_instruction(name: &str, offset: usize) -> usize {
    println!("{}", name);
    offset + 1
}

fn byte_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    let slot = chunk.code[offset + 1];
    println!("{:-16} {:4}", name, slot);
    offset + 2
}

fn jump_instruction(name: &str, sign: i32, chunk: &Chunk, offset: usize) -> usize {
    let jump = ((chunk.code[offset + 1] as u16) << 8) | chunk.code[offset + 2] as u16;
    let target = offset as i32 + 3 + sign * jump as i32;
    println!("{:-16} {:4} -> {}", name, offset, target);
    offset + 3
}

fn constant_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    let constant = chunk.code[offset + 1];
    println!("{:-16} {:4} '{}'", name, constant, chunk.constants[constant as usize]);
    offset + 2
}

fn invoke_instruction(name: &str, chunk: &Chunk, offset: usize) -> usize {
    let constant = chunk.code[offset + 1];
    let arg_count = chunk.code[offset + 2];
    println!("{:-16} ({} args) {:4} '{}'", name, arg_count, constant, chunk.constants[constant as usize]);
    offset + 3
}

fn closure_instruction(chunk: &Chunk, offset: usize) -> usize {
    let mut offset = offset + 1;
    let constant = chunk.code[offset];
    offset += 1;
    println!("{:-16} {:4} '{}'", "OP_CLOSURE", constant, chunk.constants[constant as usize]);

    let function_value = chunk.constants[constant as usize];
    let upvalue_count = unsafe { (*(function_value.as_obj() as *const crate::objects::object_function::ObjFunction)).upvalue_count };
    for _ in 0..upvalue_count {
        let is_local = chunk.code[offset];
        offset += 1;
        let index = chunk.code[offset];
        offset += 1;
        println!(
            "{:04}      |                     {} {}",
            offset - 2,
            if is_local == 1 { "local" } else { "upvalue" },
            index
        );
    }
    offset
}
