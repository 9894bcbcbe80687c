//! Grounded directly in the teacher's `dynac/src/scanner.rs`: a `phf`
//! perfect-hash keyword map feeding a small trie matcher built once behind
//! a lazily-initialized static, plus a straightforward single-pass
//! character scanner. `std::sync::OnceLock` is swapped for
//! `once_cell::sync::OnceCell` so the `once_cell` dependency the teacher's
//! `Cargo.toml` already declares is actually exercised.

use std::iter::Peekable;
use std::str::Chars;

use once_cell::sync::OnceCell;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenType {
    // single-character
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,
    // one or two character
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    // literals
    Identifier,
    StringLiteral,
    Number,
    // keywords
    And,
    Class,
    Else,
    False,
    For,
    Fun,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,
    // bookkeeping
    Error,
    Eof,
}

static KEYWORDS: phf::Map<&'static str, TokenType> = phf::phf_map! {
    "and" => TokenType::And,
    "class" => TokenType::Class,
    "else" => TokenType::Else,
    "false" => TokenType::False,
    "for" => TokenType::For,
    "fun" => TokenType::Fun,
    "if" => TokenType::If,
    "nil" => TokenType::Nil,
    "or" => TokenType::Or,
    "print" => TokenType::Print,
    "return" => TokenType::Return,
    "super" => TokenType::Super,
    "this" => TokenType::This,
    "true" => TokenType::True,
    "var" => TokenType::Var,
    "while" => TokenType::While,
};

#[derive(Default)]
struct TrieNode {
    children: std::collections::HashMap<char, TrieNode>,
    token_type: Option<TokenType>,
}

static TRIE_ROOT: OnceCell<TrieNode> = OnceCell::new();

fn trie_root() -> &'static TrieNode {
    TRIE_ROOT.get_or_init(|| {
        let mut root = TrieNode::default();
        for (word, token_type) in KEYWORDS.entries() {
            let mut node = &mut root;
            for c in word.chars() {
                node = node.children.entry(c).or_default();
            }
            node.token_type = Some(*token_type);
        }
        root
    })
}

fn lookup_keyword(text: &str) -> Option<TokenType> {
    let mut node = trie_root();
    for c in text.chars() {
        node = node.children.get(&c)?;
    }
    node.token_type
}

#[derive(Debug, Clone, Copy)]
pub struct Token<'a> {
    pub token_type: TokenType,
    pub value: &'a str,
    pub line: i32,
}

pub struct Scanner<'a> {
    source: &'a str,
    chars: Peekable<Chars<'a>>,
    start: usize,
    current: usize,
    line: i32,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Scanner {
            source,
            chars: source.chars().peekable(),
            start: 0,
            current: 0,
            line: 1,
        }
    }

    fn is_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.chars.next().unwrap();
        self.current += c.len_utf8();
        c
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn peek_next(&self) -> Option<char> {
        let mut clone = self.chars.clone();
        clone.next();
        clone.next()
    }

    fn match_char(&mut self, expected: char) -> bool {
        match self.peek() {
            Some(c) if c == expected => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    fn make_token(&self, token_type: TokenType) -> Token<'a> {
        Token {
            token_type,
            value: &self.source[self.start..self.current],
            line: self.line,
        }
    }

    fn error_token(&self, message: &'static str) -> Token<'a> {
        Token {
            token_type: TokenType::Error,
            value: message,
            line: self.line,
        }
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\r') | Some('\t') => {
                    self.advance();
                }
                Some('\n') => {
                    self.line += 1;
                    self.advance();
                }
                Some('/') if self.peek_next() == Some('/') => {
                    while self.peek() != Some('\n') && !self.is_end() {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn make_string_token(&mut self) -> Token<'a> {
        while self.peek() != Some('"') && !self.is_end() {
            if self.peek() == Some('\n') {
                self.line += 1;
            }
            self.advance();
        }
        if self.is_end() {
            return self.error_token("Unterminated string.");
        }
        self.advance(); // closing quote
        Token {
            token_type: TokenType::StringLiteral,
            value: &self.source[self.start + 1..self.current - 1],
            line: self.line,
        }
    }

    fn make_number_token(&mut self) -> Token<'a> {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') && matches!(self.peek_next(), Some(c) if c.is_ascii_digit()) {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        self.make_token(TokenType::Number)
    }

    fn make_identifier_token(&mut self) -> Token<'a> {
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.advance();
        }
        let text = &self.source[self.start..self.current];
        let token_type = lookup_keyword(text).unwrap_or(TokenType::Identifier);
        self.make_token(token_type)
    }

    pub fn scan_token(&mut self) -> Token<'a> {
        self.skip_whitespace();
        self.start = self.current;
        if self.is_end() {
            return self.make_token(TokenType::Eof);
        }
        let c = self.advance();
        if c.is_alphabetic() || c == '_' {
            return self.make_identifier_token();
        }
        if c.is_ascii_digit() {
            return self.make_number_token();
        }
        match c {
            '(' => self.make_token(TokenType::LeftParen),
            ')' => self.make_token(TokenType::RightParen),
            '{' => self.make_token(TokenType::LeftBrace),
            '}' => self.make_token(TokenType::RightBrace),
            ';' => self.make_token(TokenType::Semicolon),
            ',' => self.make_token(TokenType::Comma),
            '.' => self.make_token(TokenType::Dot),
            '-' => self.make_token(TokenType::Minus),
            '+' => self.make_token(TokenType::Plus),
            '/' => self.make_token(TokenType::Slash),
            '*' => self.make_token(TokenType::Star),
            '!' => {
                let t = if self.match_char('=') { TokenType::BangEqual } else { TokenType::Bang };
                self.make_token(t)
            }
            '=' => {
                let t = if self.match_char('=') { TokenType::EqualEqual } else { TokenType::Equal };
                self.make_token(t)
            }
            '<' => {
                let t = if self.match_char('=') { TokenType::LessEqual } else { TokenType::Less };
                self.make_token(t)
            }
            '>' => {
                let t = if self.match_char('=') { TokenType::GreaterEqual } else { TokenType::Greater };
                self.make_token(t)
            }
            '"' => self.make_string_token(),
            _ => self.error_token("Unexpected character."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_a_class_declaration() {
        let mut scanner = Scanner::new("class Foo {}");
        let types: Vec<_> = std::iter::from_fn(|| {
            let t = scanner.scan_token();
            if t.token_type == TokenType::Eof { None } else { Some(t.token_type) }
        })
        .collect();
        assert_eq!(
            types,
            vec![TokenType::Class, TokenType::Identifier, TokenType::LeftBrace, TokenType::RightBrace]
        );
    }

    #[test]
    fn scans_numbers_and_strings() {
        let mut scanner = Scanner::new("1.5 \"hi\"");
        let a = scanner.scan_token();
        assert_eq!(a.token_type, TokenType::Number);
        assert_eq!(a.value, "1.5");
        let b = scanner.scan_token();
        assert_eq!(b.token_type, TokenType::StringLiteral);
        assert_eq!(b.value, "hi");
    }

    #[test]
    fn unterminated_string_is_an_error_token() {
        let mut scanner = Scanner::new("\"oops");
        assert_eq!(scanner.scan_token().token_type, TokenType::Error);
    }
}
