//! Memory model for the interpreter
//!
//! This module provides the core runtime abstractions:
//! - [`value`]: Runtime value representation and the debug representation of values
//! - [`stack`]: Ordered bindings, namespaces and the call stack

pub mod stack;
pub mod value;
