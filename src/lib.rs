//! # Introduction
//!
//! linetrace runs a script written in a small Python-like language and prints,
//! as it goes, the variables each traced frame can see together with call and
//! return markers indented by call depth.
//!
//! ## Execution pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Interpreter → TraceHook → Tracer → stdout
//! ```
//!
//! 1. [`parser`] tokenises the source (including indentation) and builds an AST.
//! 2. [`interpreter`] walks the AST and reports call, line, return and
//!    exception events through [`interpreter::hook::TraceHook`].
//! 3. [`memory`] holds the value model: [`memory::value::Value`] and the
//!    [`memory::stack::Stack`] of frames with their bindings.
//! 4. [`snapshot`] keeps the per-frame bindings the tracer has observed and
//!    renders the merged `name = repr` view.
//! 5. [`tracer`] is the hook itself plus the session entry points
//!    [`tracer::trace_file`] and [`tracer::trace_source`].
//! 6. [`terminal`] is the output stream shared by the script and the tracer.
//!
//! ## Supported language
//!
//! Values: `None`, `bool`, `int`, `float`, `str`, `list`, `tuple`, `dict`, `range`,
//! functions and exceptions.
//! Statements: assignment, `if/elif/else`, `while`, `for`, `def`, `return`,
//! `global`, `del`, `assert`, `raise`, `try/except`, `break`, `continue`, `pass`.
//! Built-ins: `print`, `len`, `range`, `min`, `max`, `abs`, `str`, `int`, `float`,
//! `sorted`, `sum`, `enumerate`, `zip`, `map`, `filter`, `exit` and friends.

pub mod interpreter;
pub mod memory;
pub mod parser;
pub mod snapshot;
pub mod terminal;
pub mod tracer;

pub use terminal::Terminal;
pub use tracer::{trace_file, trace_source, ColorChoice, TraceError, TraceOptions, Tracer};
