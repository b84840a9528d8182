//! Lexer (tokenizer) for traced scripts
//!
//! Converts raw source text into a flat [`Token`] stream consumed by the parser.
//! Block structure is indentation based: the lexer tracks an indentation stack
//! and emits [`TokenKind::Indent`] / [`TokenKind::Dedent`] around nested blocks
//! and [`TokenKind::Newline`] at the end of each logical line. Newlines inside
//! brackets and after a trailing backslash do not end the logical line.

use super::ast::SourceLocation;
use std::fmt;

/// All token variants produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Int(i64),
    Float(f64),
    Str(String),

    // Identifiers
    Name(String),

    // Keywords
    Def,
    Return,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Not,
    And,
    Or,
    Is,
    True,
    False,
    None,
    Break,
    Continue,
    Pass,
    Global,
    Del,
    Assert,
    Raise,
    Try,
    Except,
    As,

    // Arithmetic
    Plus,        // +
    Minus,       // -
    Star,        // *
    DoubleStar,  // **
    Slash,       // /
    DoubleSlash, // //
    Percent,     // %

    // Bitwise
    Amp,   // &
    Pipe,  // |
    Caret, // ^
    Tilde, // ~
    LtLt,  // <<
    GtGt,  // >>

    // Comparison
    EqEq,  // ==
    NotEq, // !=
    Lt,    // <
    Le,    // <=
    Gt,    // >
    Ge,    // >=

    // Assignment
    Eq,            // =
    PlusEq,        // +=
    MinusEq,       // -=
    StarEq,        // *=
    SlashEq,       // /=
    DoubleSlashEq, // //=
    PercentEq,     // %=
    DoubleStarEq,  // **=

    // Punctuation
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semicolon,

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

/// A token and the location of its first character
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, location: SourceLocation) -> Self {
        Token { kind, location }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Int(n) => write!(f, "int literal {}", n),
            TokenKind::Float(x) => write!(f, "float literal {}", x),
            TokenKind::Str(s) => write!(f, "string literal {:?}", s),
            TokenKind::Name(s) => write!(f, "name '{}'", s),
            TokenKind::Def => write!(f, "'def'"),
            TokenKind::Return => write!(f, "'return'"),
            TokenKind::If => write!(f, "'if'"),
            TokenKind::Elif => write!(f, "'elif'"),
            TokenKind::Else => write!(f, "'else'"),
            TokenKind::While => write!(f, "'while'"),
            TokenKind::For => write!(f, "'for'"),
            TokenKind::In => write!(f, "'in'"),
            TokenKind::Not => write!(f, "'not'"),
            TokenKind::And => write!(f, "'and'"),
            TokenKind::Or => write!(f, "'or'"),
            TokenKind::Is => write!(f, "'is'"),
            TokenKind::True => write!(f, "'True'"),
            TokenKind::False => write!(f, "'False'"),
            TokenKind::None => write!(f, "'None'"),
            TokenKind::Break => write!(f, "'break'"),
            TokenKind::Continue => write!(f, "'continue'"),
            TokenKind::Pass => write!(f, "'pass'"),
            TokenKind::Global => write!(f, "'global'"),
            TokenKind::Del => write!(f, "'del'"),
            TokenKind::Assert => write!(f, "'assert'"),
            TokenKind::Raise => write!(f, "'raise'"),
            TokenKind::Try => write!(f, "'try'"),
            TokenKind::Except => write!(f, "'except'"),
            TokenKind::As => write!(f, "'as'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::DoubleStar => write!(f, "'**'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::DoubleSlash => write!(f, "'//'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::Amp => write!(f, "'&'"),
            TokenKind::Pipe => write!(f, "'|'"),
            TokenKind::Caret => write!(f, "'^'"),
            TokenKind::Tilde => write!(f, "'~'"),
            TokenKind::LtLt => write!(f, "'<<'"),
            TokenKind::GtGt => write!(f, "'>>'"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::PlusEq => write!(f, "'+='"),
            TokenKind::MinusEq => write!(f, "'-='"),
            TokenKind::StarEq => write!(f, "'*='"),
            TokenKind::SlashEq => write!(f, "'/='"),
            TokenKind::DoubleSlashEq => write!(f, "'//='"),
            TokenKind::PercentEq => write!(f, "'%='"),
            TokenKind::DoubleStarEq => write!(f, "'**='"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Colon => write!(f, "':'"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Indent => write!(f, "indent"),
            TokenKind::Dedent => write!(f, "dedent"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

/// Lexer error type
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} (line {}, column {})", .location.line, .location.column)]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

/// Lexer for script source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    indent_stack: Vec<usize>,
    bracket_depth: usize,
    at_line_start: bool,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            indent_stack: vec![0],
            bracket_depth: 0,
            at_line_start: true,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            if self.at_line_start && self.bracket_depth == 0 {
                if self.skip_blank_line() {
                    continue;
                }
                self.measure_indentation(&mut tokens)?;
            }

            self.skip_whitespace_and_comments()?;

            let Some(ch) = self.peek() else {
                break;
            };

            if ch == '\n' {
                let loc = self.current_location();
                self.advance();
                if self.bracket_depth == 0 {
                    tokens.push(Token::new(TokenKind::Newline, loc));
                    self.at_line_start = true;
                }
                continue;
            }

            tokens.push(self.next_token()?);
        }

        let loc = self.current_location();
        if tokens
            .last()
            .is_some_and(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Dedent))
        {
            tokens.push(Token::new(TokenKind::Newline, loc));
        }
        while self.indent_stack.len() > 1 {
            self.indent_stack.pop();
            tokens.push(Token::new(TokenKind::Dedent, loc));
        }
        tokens.push(Token::new(TokenKind::Eof, loc));

        Ok(tokens)
    }

    /// Consume a line holding only whitespace and/or a comment.
    /// Returns false (consuming nothing) when the line has code on it.
    fn skip_blank_line(&mut self) -> bool {
        let mut offset = 0;
        while let Some(ch) = self.peek_ahead(offset) {
            match ch {
                ' ' | '\t' | '\r' | '\x0c' => offset += 1,
                '\n' | '#' => break,
                _ => return false,
            }
        }
        if self.peek_ahead(offset).is_none() {
            // Trailing whitespace at end of input
            for _ in 0..offset {
                self.advance();
            }
            return false;
        }
        while let Some(ch) = self.advance() {
            if ch == '\n' {
                break;
            }
        }
        true
    }

    /// Emit Indent/Dedent tokens for the line that starts here
    fn measure_indentation(&mut self, tokens: &mut Vec<Token>) -> Result<(), LexError> {
        self.at_line_start = false;

        let mut width = 0;
        loop {
            match self.peek() {
                Some(' ') => width += 1,
                Some('\t') => width = (width / 8 + 1) * 8,
                Some('\x0c') | Some('\r') => {}
                _ => break,
            }
            self.advance();
        }

        if self.is_at_end() {
            return Ok(());
        }

        let loc = self.current_location();
        let top = self.indent_stack.last().copied().unwrap_or(0);

        if width > top {
            self.indent_stack.push(width);
            tokens.push(Token::new(TokenKind::Indent, loc));
        } else if width < top {
            while self.indent_stack.last().is_some_and(|&level| level > width) {
                self.indent_stack.pop();
                tokens.push(Token::new(TokenKind::Dedent, loc));
            }
            if self.indent_stack.last().copied() != Some(width) {
                return Err(LexError {
                    message: "unindent does not match any outer indentation level".to_string(),
                    location: loc,
                });
            }
        }

        Ok(())
    }

    /// Get next token
    fn next_token(&mut self) -> Result<Token, LexError> {
        let loc = self.current_location();
        let ch = self.advance().ok_or_else(|| LexError {
            message: "unexpected end of file".to_string(),
            location: loc,
        })?;

        let kind = match ch {
            '"' | '\'' => self.string_literal(ch, false, loc)?,

            '0'..='9' => self.number_literal(ch, loc)?,
            '.' if self.peek().is_some_and(|c| c.is_ascii_digit()) => {
                self.number_literal(ch, loc)?
            }

            c if c == '_' || c.is_alphabetic() => {
                let ident = self.identifier(c);
                let raw_prefix = ident == "r" || ident == "R";
                match self.peek() {
                    Some(q @ ('"' | '\'')) if raw_prefix => {
                        self.advance();
                        self.string_literal(q, true, loc)?
                    }
                    _ => keyword_or_name(ident),
                }
            }

            '+' => self.with_eq(TokenKind::Plus, TokenKind::PlusEq),
            '-' => self.with_eq(TokenKind::Minus, TokenKind::MinusEq),
            '*' => {
                if self.peek() == Some('*') {
                    self.advance();
                    self.with_eq(TokenKind::DoubleStar, TokenKind::DoubleStarEq)
                } else {
                    self.with_eq(TokenKind::Star, TokenKind::StarEq)
                }
            }
            '/' => {
                if self.peek() == Some('/') {
                    self.advance();
                    self.with_eq(TokenKind::DoubleSlash, TokenKind::DoubleSlashEq)
                } else {
                    self.with_eq(TokenKind::Slash, TokenKind::SlashEq)
                }
            }
            '%' => self.with_eq(TokenKind::Percent, TokenKind::PercentEq),
            '=' => self.with_eq(TokenKind::Eq, TokenKind::EqEq),
            '!' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::NotEq
                } else {
                    return Err(LexError {
                        message: "invalid syntax: '!'".to_string(),
                        location: loc,
                    });
                }
            }
            '<' => {
                if self.peek() == Some('<') {
                    self.advance();
                    TokenKind::LtLt
                } else {
                    self.with_eq(TokenKind::Lt, TokenKind::Le)
                }
            }
            '>' => {
                if self.peek() == Some('>') {
                    self.advance();
                    TokenKind::GtGt
                } else {
                    self.with_eq(TokenKind::Gt, TokenKind::Ge)
                }
            }
            '&' => TokenKind::Amp,
            '|' => TokenKind::Pipe,
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            '(' | '[' | '{' => {
                self.bracket_depth += 1;
                match ch {
                    '(' => TokenKind::LParen,
                    '[' => TokenKind::LBracket,
                    _ => TokenKind::LBrace,
                }
            }
            ')' | ']' | '}' => {
                self.bracket_depth = self.bracket_depth.saturating_sub(1);
                match ch {
                    ')' => TokenKind::RParen,
                    ']' => TokenKind::RBracket,
                    _ => TokenKind::RBrace,
                }
            }
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            ';' => TokenKind::Semicolon,

            _ => {
                return Err(LexError {
                    message: format!("invalid character '{}'", ch),
                    location: loc,
                });
            }
        };

        Ok(Token::new(kind, loc))
    }

    /// `plain` or, when followed by `=`, `with_eq`
    fn with_eq(&mut self, plain: TokenKind, with_eq: TokenKind) -> TokenKind {
        if self.peek() == Some('=') {
            self.advance();
            with_eq
        } else {
            plain
        }
    }

    /// Parse string literal; the opening quote is already consumed
    fn string_literal(
        &mut self,
        quote: char,
        raw: bool,
        loc: SourceLocation,
    ) -> Result<TokenKind, LexError> {
        let triple = self.peek() == Some(quote) && self.peek_ahead(1) == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut string = String::new();

        loop {
            let ch = self.advance().ok_or_else(|| LexError {
                message: "unterminated string literal".to_string(),
                location: loc,
            })?;

            if ch == quote {
                if !triple {
                    return Ok(TokenKind::Str(string));
                }
                if self.peek() == Some(quote) && self.peek_ahead(1) == Some(quote) {
                    self.advance();
                    self.advance();
                    return Ok(TokenKind::Str(string));
                }
                string.push(ch);
                continue;
            }

            if ch == '\n' && !triple {
                return Err(LexError {
                    message: "unterminated string literal".to_string(),
                    location: loc,
                });
            }

            if ch != '\\' {
                string.push(ch);
                continue;
            }

            let escaped = self.advance().ok_or_else(|| LexError {
                message: "unterminated string literal".to_string(),
                location: loc,
            })?;

            if raw {
                string.push('\\');
                string.push(escaped);
                continue;
            }

            match escaped {
                '\n' => {}
                'n' => string.push('\n'),
                't' => string.push('\t'),
                'r' => string.push('\r'),
                '0' => string.push('\0'),
                'a' => string.push('\x07'),
                'b' => string.push('\x08'),
                'f' => string.push('\x0c'),
                'v' => string.push('\x0b'),
                '\\' => string.push('\\'),
                '\'' => string.push('\''),
                '"' => string.push('"'),
                'x' => {
                    let hex: String = (0..2).filter_map(|_| self.advance()).collect();
                    let code = u32::from_str_radix(&hex, 16)
                        .ok()
                        .filter(|_| hex.len() == 2)
                        .and_then(char::from_u32)
                        .ok_or_else(|| LexError {
                            message: format!("invalid \\x escape: \\x{}", hex),
                            location: self.current_location(),
                        })?;
                    string.push(code);
                }
                other => {
                    string.push('\\');
                    string.push(other);
                }
            }
        }
    }

    /// Parse numeric literal (ints in any supported base, or floats)
    fn number_literal(&mut self, first: char, loc: SourceLocation) -> Result<TokenKind, LexError> {
        if first == '0' {
            let radix = match self.peek() {
                Some('x') | Some('X') => Some(16),
                Some('o') | Some('O') => Some(8),
                Some('b') | Some('B') => Some(2),
                _ => None,
            };
            if let Some(radix) = radix {
                self.advance();
                let digits = self.take_digits(|c| c.is_digit(radix));
                return i64::from_str_radix(&digits, radix)
                    .map(TokenKind::Int)
                    .map_err(|_| LexError {
                        message: format!("invalid integer literal '{}'", digits),
                        location: loc,
                    });
            }
        }

        let mut text = String::new();
        text.push(first);
        let mut is_float = first == '.';
        text.push_str(&self.take_digits(|c| c.is_ascii_digit()));

        if !is_float && self.peek() == Some('.') {
            self.advance();
            is_float = true;
            text.push('.');
            text.push_str(&self.take_digits(|c| c.is_ascii_digit()));
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            let sign = self.peek_ahead(1);
            let exponent_follows = match sign {
                Some('+') | Some('-') => self.peek_ahead(2).is_some_and(|c| c.is_ascii_digit()),
                Some(c) => c.is_ascii_digit(),
                None => false,
            };
            if exponent_follows {
                is_float = true;
                self.advance();
                text.push('e');
                if let Some(s @ ('+' | '-')) = self.peek() {
                    self.advance();
                    text.push(s);
                }
                text.push_str(&self.take_digits(|c| c.is_ascii_digit()));
            }
        }

        if is_float {
            text.parse::<f64>()
                .map(TokenKind::Float)
                .map_err(|_| LexError {
                    message: format!("invalid float literal '{}'", text),
                    location: loc,
                })
        } else {
            text.parse::<i64>().map(TokenKind::Int).map_err(|_| LexError {
                message: format!("integer literal '{}' is too large", text),
                location: loc,
            })
        }
    }

    /// Consume digits accepted by `accept`, dropping `_` separators
    fn take_digits(&mut self, accept: impl Fn(char) -> bool) -> String {
        let mut digits = String::new();
        while let Some(ch) = self.peek() {
            if accept(ch) {
                digits.push(ch);
            } else if ch != '_' {
                break;
            }
            self.advance();
        }
        digits
    }

    /// Parse the rest of an identifier
    fn identifier(&mut self, first_char: char) -> String {
        let mut ident = String::new();
        ident.push(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        ident
    }

    /// Skip spaces, comments and backslash continuations (not newlines)
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\x0c') => {
                    self.advance();
                }
                Some('#') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                }
                Some('\\') => {
                    let after = match self.peek_ahead(1) {
                        Some('\r') => self.peek_ahead(2),
                        other => other,
                    };
                    if after != Some('\n') {
                        return Err(LexError {
                            message: "unexpected character after line continuation character"
                                .to_string(),
                            location: self.current_location(),
                        });
                    }
                    while let Some(ch) = self.advance() {
                        if ch == '\n' {
                            break;
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    /// Peek at current character without consuming
    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    /// Peek ahead n characters
    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    /// Advance to next character
    fn advance(&mut self) -> Option<char> {
        let ch = *self.input.get(self.position)?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    /// Check if at end of input
    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Get current source location
    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

fn keyword_or_name(ident: String) -> TokenKind {
    match ident.as_str() {
        "def" => TokenKind::Def,
        "return" => TokenKind::Return,
        "if" => TokenKind::If,
        "elif" => TokenKind::Elif,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "for" => TokenKind::For,
        "in" => TokenKind::In,
        "not" => TokenKind::Not,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "is" => TokenKind::Is,
        "True" => TokenKind::True,
        "False" => TokenKind::False,
        "None" => TokenKind::None,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "pass" => TokenKind::Pass,
        "global" => TokenKind::Global,
        "del" => TokenKind::Del,
        "assert" => TokenKind::Assert,
        "raise" => TokenKind::Raise,
        "try" => TokenKind::Try,
        "except" => TokenKind::Except,
        "as" => TokenKind::As,
        _ => TokenKind::Name(ident),
    }
}
