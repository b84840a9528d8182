//! Script execution engine
//!
//! This module provides the core execution logic:
//! - [`engine`]: the [`engine::Interpreter`], frames, calls and name resolution
//! - [`statements`] and [`loops`]: statement execution
//! - [`expressions`] and [`ops`]: expression evaluation and operator semantics
//! - [`builtins`], [`methods`] and [`prelude`]: the standard library
//! - [`hook`]: the trace hook seam
//! - [`errors`]: script exceptions
//!
//! # Execution Model
//!
//! The interpreter walks the AST and executes statements one at a time. Before
//! each statement it reports a `Line` event to the installed
//! [`hook::TraceHook`]; frame entry and exit are reported as `Call` and
//! `Return`, and a raised exception as `Exception` in every frame it passes.

pub mod builtins;
pub mod engine;
pub mod errors;
pub mod expressions;
pub mod hook;
pub mod loops;
pub mod methods;
pub mod ops;
pub mod prelude;
pub mod statements;
