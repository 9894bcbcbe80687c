//! Single-pass Pratt-parser compiler. Grounded in the teacher's
//! `dynac/src/compiler.rs` for the overall `Parser`/`Compiler`/
//! `Precedence`/`ParseRule` shape, error-reporting format
//! (`[line {}] Error at '{}': {}`) and `synchronize()` panic-mode
//! recovery — extended with class/method/`this`/`super`/inheritance
//! compilation, which the teacher's draft never reached, following the
//! opcode contract in `examples/original_source/clox/vm.c`.

use crate::chunk::OpCode;
use crate::constants::UINT8_COUNT;
use crate::gc::GcRoots;
use crate::heap::Heap;
use crate::objects::object_function::ObjFunction;
use crate::objects::object_string::ObjString;
use crate::objects::ObjHeader;
use crate::scanner::{Scanner, Token, TokenType};
use crate::table::Table;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Precedence {
    None,
    Assignment,
    Or,
    And,
    Equality,
    Comparison,
    Term,
    Factor,
    Unary,
    Call,
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call => Primary,
            Primary => Primary,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FunctionType {
    Function,
    Script,
    Method,
    Initializer,
}

struct Local<'src> {
    name: Token<'src>,
    depth: i32,
}

struct UpvalueDesc {
    index: u8,
    is_local: bool,
}

struct Compiler<'src> {
    function: *mut ObjFunction,
    function_type: FunctionType,
    locals: Vec<Local<'src>>,
    upvalues: Vec<UpvalueDesc>,
    scope_depth: i32,
}

impl<'src> Compiler<'src> {
    fn new(function: *mut ObjFunction, function_type: FunctionType) -> Self {
        // Slot 0 is reserved: the receiver for methods, or an unnamed
        // placeholder for plain functions (matches clox's
        // `initCompiler`).
        let receiver_name = if function_type == FunctionType::Method || function_type == FunctionType::Initializer {
            "this"
        } else {
            ""
        };
        Compiler {
            function,
            function_type,
            locals: vec![Local {
                name: Token { token_type: TokenType::Identifier, value: receiver_name, line: 0 },
                depth: 0,
            }],
            upvalues: Vec::new(),
            scope_depth: 0,
        }
    }
}

struct ClassCompiler {
    has_superclass: bool,
}

pub struct Parser<'src, 'h> {
    current: Token<'src>,
    previous: Token<'src>,
    scanner: Scanner<'src>,
    had_error: bool,
    panic_mode: bool,
    compilers: Vec<Compiler<'src>>,
    class_compilers: Vec<ClassCompiler>,
    heap: &'h mut Heap,
    globals: &'h Table,
}

type ParseFn<'src, 'h> = fn(&mut Parser<'src, 'h>, bool);

struct ParseRule<'src, 'h> {
    prefix: Option<ParseFn<'src, 'h>>,
    infix: Option<ParseFn<'src, 'h>>,
    precedence: Precedence,
}

fn get_rule<'src, 'h>(token_type: TokenType) -> ParseRule<'src, 'h> {
    use Precedence::*;
    use TokenType::*;
    let (prefix, infix, precedence): (Option<ParseFn>, Option<ParseFn>, Precedence) = match token_type {
        LeftParen => (Some(Parser::grouping), Some(Parser::call), Call),
        Dot => (None, Some(Parser::dot), Call),
        Minus => (Some(Parser::unary), Some(Parser::binary), Term),
        Plus => (None, Some(Parser::binary), Term),
        Slash => (None, Some(Parser::binary), Factor),
        Star => (None, Some(Parser::binary), Factor),
        Bang => (Some(Parser::unary), None, None),
        BangEqual => (None, Some(Parser::binary), Equality),
        EqualEqual => (None, Some(Parser::binary), Equality),
        Greater => (None, Some(Parser::binary), Comparison),
        GreaterEqual => (None, Some(Parser::binary), Comparison),
        Less => (None, Some(Parser::binary), Comparison),
        LessEqual => (None, Some(Parser::binary), Comparison),
        Identifier => (Some(Parser::variable), None, None),
        StringLiteral => (Some(Parser::string), None, None),
        Number => (Some(Parser::number), None, None),
        And => (None, Some(Parser::and_), Precedence::And),
        Or => (None, Some(Parser::or_), Precedence::Or),
        False => (Some(Parser::literal), None, None),
        Nil => (Some(Parser::literal), None, None),
        True => (Some(Parser::literal), None, None),
        This => (Some(Parser::this_), None, None),
        Super => (Some(Parser::super_), None, None),
        _ => (None, None, Precedence::None),
    };
    ParseRule { prefix, infix, precedence }
}

impl<'src, 'h> Parser<'src, 'h> {
    pub fn new(source: &'src str, heap: &'h mut Heap, globals: &'h Table) -> Self {
        let mut scanner = Scanner::new(source);
        let current = scanner.scan_token();
        let mut parser = Parser {
            current,
            previous: current,
            scanner,
            had_error: false,
            panic_mode: false,
            compilers: Vec::new(),
            class_compilers: Vec::new(),
            heap,
            globals,
        };
        let pinned: Vec<*mut ObjHeader> = Vec::new();
        let roots = parser.roots_with(&pinned);
        let script_fn = parser.heap.alloc_function(std::ptr::null_mut(), roots);
        parser.compilers.push(Compiler::new(script_fn, FunctionType::Script));
        parser
    }

    fn roots_with<'a>(&'a self, extra: &'a [*mut ObjHeader]) -> GcRoots<'a> {
        GcRoots {
            stack: &[],
            frames: &[],
            open_upvalues: &[],
            globals: self.globals,
            init_string: std::ptr::null_mut(),
            extra,
        }
    }

    fn pinned(&self) -> Vec<*mut ObjHeader> {
        self.compilers.iter().map(|c| c.function as *mut ObjHeader).collect()
    }

    fn intern(&mut self, text: &str) -> *mut ObjString {
        let pinned = self.pinned();
        let roots = self.roots_with(&pinned);
        self.heap.intern(text, roots)
    }

    fn alloc_function(&mut self, name: *mut ObjString) -> *mut ObjFunction {
        let pinned = self.pinned();
        let roots = self.roots_with(&pinned);
        self.heap.alloc_function(name, roots)
    }

    fn current_compiler(&mut self) -> &mut Compiler<'src> {
        self.compilers.last_mut().unwrap()
    }

    fn current_chunk(&mut self) -> &mut crate::chunk::Chunk {
        unsafe { &mut (*self.current_compiler().function).chunk }
    }

    // ---- token plumbing ----

    fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.token_type != TokenType::Error {
                break;
            }
            self.error_at_current(self.current.value);
        }
    }

    fn check(&self, token_type: TokenType) -> bool {
        self.current.token_type == token_type
    }

    fn match_token(&mut self, token_type: TokenType) -> bool {
        if !self.check(token_type) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, token_type: TokenType, message: &str) {
        if self.current.token_type == token_type {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.current;
        self.error_at(token, message);
    }

    fn error(&mut self, message: &str) {
        let token = self.previous;
        self.error_at(token, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.panic_mode {
            return;
        }
        self.panic_mode = true;
        eprint!("[line {}] Error", token.line);
        if token.token_type == TokenType::Eof {
            eprint!(" at end");
        } else if token.token_type != TokenType::Error {
            eprint!(" at '{}'", token.value);
        }
        eprintln!(": {}", message);
        self.had_error = true;
    }

    fn synchronize(&mut self) {
        self.panic_mode = false;
        while self.current.token_type != TokenType::Eof {
            if self.previous.token_type == TokenType::Semicolon {
                return;
            }
            match self.current.token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    // ---- byte emission ----

    fn emit_byte(&mut self, byte: u8) {
        let line = self.previous.line;
        self.current_chunk().write(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op.to_byte());
    }

    fn emit_op_byte(&mut self, op: OpCode, byte: u8) {
        self.emit_op(op);
        self.emit_byte(byte);
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);
        let offset = self.current_chunk().len() - loop_start + 2;
        if offset > u16::MAX as usize {
            self.error("Loop body too large.");
        }
        self.emit_byte(((offset >> 8) & 0xff) as u8);
        self.emit_byte((offset & 0xff) as u8);
    }

    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.current_chunk().len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        let jump = self.current_chunk().len() - offset - 2;
        if jump > u16::MAX as usize {
            self.error("Too much code to jump over.");
        }
        self.current_chunk().patch_byte(offset, ((jump >> 8) & 0xff) as u8);
        self.current_chunk().patch_byte(offset + 1, (jump & 0xff) as u8);
    }

    fn emit_return(&mut self) {
        if self.current_compiler().function_type == FunctionType::Initializer {
            self.emit_op_byte(OpCode::GetLocal, 0);
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.emit_op(OpCode::Return);
    }

    fn make_constant(&mut self, value: Value) -> u8 {
        let index = self.current_chunk().add_constant(value);
        if index > u8::MAX as usize {
            self.error("Too many constants in one chunk.");
            return 0;
        }
        index as u8
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op_byte(OpCode::Constant, index);
    }

    fn identifier_constant(&mut self, token: Token<'src>) -> u8 {
        let string = self.intern(token.value);
        self.make_constant(Value::Obj(string as *mut ObjHeader))
    }

    // ---- scopes and locals ----

    fn begin_scope(&mut self) {
        self.current_compiler().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.current_compiler().scope_depth -= 1;
        let depth = self.current_compiler().scope_depth;
        while let Some(local) = self.current_compiler().locals.last() {
            if local.depth > depth {
                self.emit_op(OpCode::Pop);
                self.current_compiler().locals.pop();
            } else {
                break;
            }
        }
    }

    fn identifiers_equal(a: &Token, b: &Token) -> bool {
        a.value == b.value
    }

    fn resolve_local(compiler: &Compiler<'src>, name: &Token<'src>) -> Option<u8> {
        for (i, local) in compiler.locals.iter().enumerate().rev() {
            if Self::identifiers_equal(&local.name, name) {
                return Some(i as u8);
            }
        }
        None
    }

    fn add_upvalue(compiler: &mut Compiler<'src>, index: u8, is_local: bool) -> u8 {
        for (i, uv) in compiler.upvalues.iter().enumerate() {
            if uv.index == index && uv.is_local == is_local {
                return i as u8;
            }
        }
        compiler.upvalues.push(UpvalueDesc { index, is_local });
        unsafe { (*compiler.function).upvalue_count = compiler.upvalues.len() };
        (compiler.upvalues.len() - 1) as u8
    }

    fn resolve_upvalue(compilers: &mut [Compiler<'src>], level: usize, name: &Token<'src>) -> Option<u8> {
        if level == 0 {
            return None;
        }
        if let Some(local) = Self::resolve_local(&compilers[level - 1], name) {
            return Some(Self::add_upvalue(&mut compilers[level], local, true));
        }
        if let Some(upvalue) = Self::resolve_upvalue(compilers, level - 1, name) {
            return Some(Self::add_upvalue(&mut compilers[level], upvalue, false));
        }
        None
    }

    fn add_local(&mut self, name: Token<'src>) {
        if self.current_compiler().locals.len() >= UINT8_COUNT {
            self.error("Too many local variables in function.");
            return;
        }
        self.current_compiler().locals.push(Local { name, depth: -1 });
    }

    fn declare_variable(&mut self) {
        if self.current_compiler().scope_depth == 0 {
            return;
        }
        let name = self.previous;
        let depth = self.current_compiler().scope_depth;
        for local in self.current_compiler().locals.iter().rev() {
            if local.depth != -1 && local.depth < depth {
                break;
            }
            if Self::identifiers_equal(&local.name, &name) {
                self.error("Already a variable with this name in this scope.");
            }
        }
        self.add_local(name);
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenType::Identifier, message);
        self.declare_variable();
        if self.current_compiler().scope_depth > 0 {
            return 0;
        }
        let name = self.previous;
        self.identifier_constant(name)
    }

    fn mark_initialized(&mut self) {
        if self.current_compiler().scope_depth == 0 {
            return;
        }
        let depth = self.current_compiler().scope_depth;
        self.current_compiler().locals.last_mut().unwrap().depth = depth;
    }

    fn define_variable(&mut self, global: u8) {
        if self.current_compiler().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_op_byte(OpCode::DefineGlobal, global);
    }

    fn argument_list(&mut self) -> u8 {
        let mut count: u8 = 0;
        if !self.check(TokenType::RightParen) {
            loop {
                self.expression();
                if count == u8::MAX {
                    self.error("Can't have more than 255 arguments.");
                }
                count += 1;
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after arguments.");
        count
    }

    fn named_variable(&mut self, name: Token<'src>, can_assign: bool) {
        let (get_op, set_op, arg): (OpCode, OpCode, u8) = if let Some(local) = Self::resolve_local(self.compilers.last().unwrap(), &name) {
            (OpCode::GetLocal, OpCode::SetLocal, local)
        } else if let Some(level) = {
            let top = self.compilers.len() - 1;
            Self::resolve_upvalue(&mut self.compilers, top, &name)
        } {
            (OpCode::GetUpvalue, OpCode::SetUpvalue, level)
        } else {
            let constant = self.identifier_constant(name);
            (OpCode::GetGlobal, OpCode::SetGlobal, constant)
        };
        if can_assign && self.match_token(TokenType::Equal) {
            self.expression();
            self.emit_op_byte(set_op, arg);
        } else {
            self.emit_op_byte(get_op, arg);
        }
    }

    // ---- expression parsing ----

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let prefix = get_rule(self.previous.token_type).prefix;
        let prefix = match prefix {
            Some(f) => f,
            None => {
                self.error("Expect expression.");
                return;
            }
        };
        let can_assign = precedence <= Precedence::Assignment;
        prefix(self, can_assign);

        while precedence <= get_rule(self.current.token_type).precedence {
            self.advance();
            let infix = get_rule(self.previous.token_type).infix.unwrap();
            infix(self, can_assign);
        }

        if can_assign && self.match_token(TokenType::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn number(&mut self, _can_assign: bool) {
        let value: f64 = self.previous.value.parse().unwrap();
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self, _can_assign: bool) {
        let text = self.previous.value;
        let obj = self.intern(text);
        self.emit_constant(Value::Obj(obj as *mut ObjHeader));
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.previous.token_type {
            TokenType::False => self.emit_op(OpCode::False),
            TokenType::Nil => self.emit_op(OpCode::Nil),
            TokenType::True => self.emit_op(OpCode::True),
            _ => unreachable!(),
        }
    }

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self, _can_assign: bool) {
        let op_type = self.previous.token_type;
        self.parse_precedence(Precedence::Unary);
        match op_type {
            TokenType::Minus => self.emit_op(OpCode::Negate),
            TokenType::Bang => self.emit_op(OpCode::Not),
            _ => unreachable!(),
        }
    }

    fn binary(&mut self, _can_assign: bool) {
        let op_type = self.previous.token_type;
        let rule = get_rule(op_type);
        self.parse_precedence(rule.precedence.next());
        match op_type {
            TokenType::BangEqual => {
                self.emit_op(OpCode::Equal);
                self.emit_op(OpCode::Not);
            }
            TokenType::EqualEqual => self.emit_op(OpCode::Equal),
            TokenType::Greater => self.emit_op(OpCode::Greater),
            TokenType::GreaterEqual => {
                self.emit_op(OpCode::Less);
                self.emit_op(OpCode::Not);
            }
            TokenType::Less => self.emit_op(OpCode::Less),
            TokenType::LessEqual => {
                self.emit_op(OpCode::Greater);
                self.emit_op(OpCode::Not);
            }
            TokenType::Plus => self.emit_op(OpCode::Add),
            TokenType::Minus => self.emit_op(OpCode::Subtract),
            TokenType::Star => self.emit_op(OpCode::Multiply),
            TokenType::Slash => self.emit_op(OpCode::Divide),
            _ => unreachable!(),
        }
    }

    fn and_(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or_(&mut self, _can_assign: bool) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.previous;
        self.named_variable(name, can_assign);
    }

    fn this_(&mut self, _can_assign: bool) {
        if self.class_compilers.is_empty() {
            self.error("Can't use 'this' outside of a class.");
            return;
        }
        let name = self.previous;
        self.named_variable(name, false);
    }

    fn super_token(&self) -> Token<'src> {
        Token { token_type: TokenType::Identifier, value: "super", line: self.previous.line }
    }

    fn super_(&mut self, _can_assign: bool) {
        if self.class_compilers.is_empty() {
            self.error("Can't use 'super' outside of a class.");
        } else if !self.class_compilers.last().unwrap().has_superclass {
            self.error("Can't use 'super' in a class with no superclass.");
        }
        self.consume(TokenType::Dot, "Expect '.' after 'super'.");
        self.consume(TokenType::Identifier, "Expect superclass method name.");
        let method_name = self.previous;
        let method_constant = self.identifier_constant(method_name);

        let this_token = Token { token_type: TokenType::Identifier, value: "this", line: method_name.line };
        let super_token = self.super_token();
        self.named_variable(this_token, false);
        if self.match_token(TokenType::LeftParen) {
            let arg_count = self.argument_list();
            self.named_variable(super_token, false);
            self.emit_op_byte(OpCode::SuperInvoke, method_constant);
            self.emit_byte(arg_count);
        } else {
            self.named_variable(super_token, false);
            self.emit_op_byte(OpCode::GetSuper, method_constant);
        }
    }

    fn call(&mut self, _can_assign: bool) {
        let arg_count = self.argument_list();
        self.emit_op_byte(OpCode::Call, arg_count);
    }

    fn dot(&mut self, can_assign: bool) {
        self.consume(TokenType::Identifier, "Expect property name after '.'.");
        let name = self.previous;
        let name_constant = self.identifier_constant(name);
        if can_assign && self.match_token(TokenType::Equal) {
            self.expression();
            self.emit_op_byte(OpCode::SetProperty, name_constant);
        } else if self.match_token(TokenType::LeftParen) {
            let arg_count = self.argument_list();
            self.emit_op_byte(OpCode::Invoke, name_constant);
            self.emit_byte(arg_count);
        } else {
            self.emit_op_byte(OpCode::GetProperty, name_constant);
        }
    }

    // ---- statements and declarations ----

    fn block(&mut self) {
        while !self.check(TokenType::RightBrace) && !self.check(TokenType::Eof) {
            self.declaration();
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.");
    }

    fn function(&mut self, function_type: FunctionType) {
        let name = self.intern(self.previous.value);
        let function = self.alloc_function(name);
        self.compilers.push(Compiler::new(function, function_type));
        self.begin_scope();

        self.consume(TokenType::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenType::RightParen) {
            loop {
                unsafe {
                    (*function).arity += 1;
                    if (*function).arity > 255 {
                        self.error_at_current("Can't have more than 255 parameters.");
                    }
                }
                let constant = self.parse_variable("Expect parameter name.");
                self.define_variable(constant);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.");
        self.consume(TokenType::LeftBrace, "Expect '{' before function body.");
        self.block();

        self.emit_return();
        let compiler = self.compilers.pop().unwrap();
        #[cfg(feature = "debug_print_code")]
        if !self.had_error {
            crate::debug::disassemble_chunk(unsafe { &(*compiler.function).chunk }, unsafe { (*compiler.function).name_str() });
        }
        let upvalue_count = compiler.upvalues.len();
        let upvalues = compiler.upvalues;

        let value = Value::Obj(function as *mut ObjHeader);
        let index = self.make_constant(value);
        self.emit_op_byte(OpCode::Closure, index);
        for uv in &upvalues {
            self.emit_byte(if uv.is_local { 1 } else { 0 });
            self.emit_byte(uv.index);
        }
        debug_assert_eq!(upvalue_count, upvalues.len());
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        self.mark_initialized();
        self.function(FunctionType::Function);
        self.define_variable(global);
    }

    fn method(&mut self) {
        self.consume(TokenType::Identifier, "Expect method name.");
        let name_token = self.previous;
        let constant = self.identifier_constant(name_token);
        let function_type = if name_token.value == "init" { FunctionType::Initializer } else { FunctionType::Method };
        self.function(function_type);
        self.emit_op_byte(OpCode::Method, constant);
    }

    fn class_declaration(&mut self) {
        self.consume(TokenType::Identifier, "Expect class name.");
        let class_name = self.previous;
        let name_constant = self.identifier_constant(class_name);
        self.declare_variable();

        self.emit_op_byte(OpCode::Class, name_constant);
        self.define_variable(name_constant);

        self.class_compilers.push(ClassCompiler { has_superclass: false });

        if self.match_token(TokenType::Less) {
            self.consume(TokenType::Identifier, "Expect superclass name.");
            let superclass_name = self.previous;
            self.variable(false);

            if superclass_name.value == class_name.value {
                self.error("A class can't inherit from itself.");
            }

            self.begin_scope();
            self.add_local(Token { token_type: TokenType::Identifier, value: "super", line: superclass_name.line });
            self.define_variable(0);

            self.named_variable(class_name, false);
            self.emit_op(OpCode::Inherit);
            self.class_compilers.last_mut().unwrap().has_superclass = true;
        }

        self.named_variable(class_name, false);
        self.consume(TokenType::LeftBrace, "Expect '{' before class body.");
        while !self.check(TokenType::RightBrace) && !self.check(TokenType::Eof) {
            self.method();
        }
        self.consume(TokenType::RightBrace, "Expect '}' after class body.");
        self.emit_op(OpCode::Pop);

        let class_compiler = self.class_compilers.pop().unwrap();
        if class_compiler.has_superclass {
            self.end_scope();
        }
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.match_token(TokenType::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenType::Semicolon, "Expect ';' after variable declaration.");
        self.define_variable(global);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenType::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenType::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn if_statement(&mut self) {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);

        if self.match_token(TokenType::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.current_chunk().len();
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.");
        if self.match_token(TokenType::Semicolon) {
            // no initializer
        } else if self.match_token(TokenType::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.current_chunk().len();
        let mut exit_jump: Option<usize> = None;
        if !self.match_token(TokenType::Semicolon) {
            self.expression();
            self.consume(TokenType::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.match_token(TokenType::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.current_chunk().len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenType::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(OpCode::Pop);
        }
        self.end_scope();
    }

    fn return_statement(&mut self) {
        if self.compilers.last().unwrap().function_type == FunctionType::Script {
            self.error("Can't return from top-level code.");
        }
        if self.match_token(TokenType::Semicolon) {
            self.emit_return();
        } else {
            if self.compilers.last().unwrap().function_type == FunctionType::Initializer {
                self.error("Can't return a value from an initializer.");
            }
            self.expression();
            self.consume(TokenType::Semicolon, "Expect ';' after return value.");
            self.emit_op(OpCode::Return);
        }
    }

    fn statement(&mut self) {
        if self.match_token(TokenType::Print) {
            self.print_statement();
        } else if self.match_token(TokenType::If) {
            self.if_statement();
        } else if self.match_token(TokenType::While) {
            self.while_statement();
        } else if self.match_token(TokenType::For) {
            self.for_statement();
        } else if self.match_token(TokenType::Return) {
            self.return_statement();
        } else if self.match_token(TokenType::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn declaration(&mut self) {
        if self.match_token(TokenType::Class) {
            self.class_declaration();
        } else if self.match_token(TokenType::Fun) {
            self.fun_declaration();
        } else if self.match_token(TokenType::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.panic_mode {
            self.synchronize();
        }
    }

    fn end_compiler(&mut self) -> *mut ObjFunction {
        self.emit_return();
        let compiler = self.compilers.pop().unwrap();
        #[cfg(feature = "debug_print_code")]
        if !self.had_error {
            crate::debug::disassemble_chunk(unsafe { &(*compiler.function).chunk }, unsafe { (*compiler.function).name_str() });
        }
        compiler.function
    }

    pub fn compile(mut self) -> Option<*mut ObjFunction> {
        self.advance();
        while !self.match_token(TokenType::Eof) {
            self.declaration();
        }
        let function = self.end_compiler();
        if self.had_error {
            None
        } else {
            Some(function)
        }
    }
}

pub fn compile(source: &str, heap: &mut Heap, globals: &Table) -> Option<*mut ObjFunction> {
    let parser = Parser::new(source, heap, globals);
    parser.compile()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_trivial_expression_statement() {
        let mut heap = Heap::new();
        let globals = Table::new();
        let function = compile("1 + 2;", &mut heap, &globals).expect("should compile");
        let chunk = unsafe { &(*function).chunk };
        assert!(chunk.code.contains(&OpCode::Add.to_byte()));
        assert!(chunk.code.contains(&OpCode::Pop.to_byte()));
    }

    #[test]
    fn reports_error_on_unterminated_block() {
        let mut heap = Heap::new();
        let globals = Table::new();
        assert!(compile("{ var x = 1;", &mut heap, &globals).is_none());
    }

    #[test]
    fn compiles_a_class_with_a_method() {
        let mut heap = Heap::new();
        let globals = Table::new();
        let function = compile("class A { greet() { print \"hi\"; } }", &mut heap, &globals).expect("should compile");
        let chunk = unsafe { &(*function).chunk };
        assert!(chunk.code.contains(&OpCode::Class.to_byte()));
        assert!(chunk.code.contains(&OpCode::Method.to_byte()));
    }
}
