//! Script source parser
//!
//! This module transforms script source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens, including INDENT/DEDENT)
//! - [`parse`]: Parser struct, helpers and the program entry point
//! - [`ast`]: AST node definitions
//!
//! # Supported Language
//!
//! The parser accepts an indentation-structured scripting language:
//! - Statements: assignment (chained, tuple unpacking, augmented), `if`/`elif`/`else`,
//!   `while`, `for ... in`, `def`, `return`, `global`, `del`, `assert`, `raise`,
//!   `try`/`except`, `pass`, `break`, `continue`
//! - Expressions: arithmetic, bitwise, comparison chains, `and`/`or`/`not`,
//!   conditional expressions, calls with keyword arguments, subscripts, slices,
//!   attribute access, list/tuple/dict displays
//! - No classes, imports, closures, comprehensions, lambdas or generators
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent parser, one method per precedence level.
//! No external parser generator dependencies.

pub mod ast;
pub mod lexer;
pub mod parse;

mod declarations;
mod expressions;
mod statements;

pub use parse::{ParseError, Parser};

/// Parse a whole script
pub fn parse_program(source: &str) -> Result<ast::Program, ParseError> {
    Parser::new(source)?.parse_program()
}
