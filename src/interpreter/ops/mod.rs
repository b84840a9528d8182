pub mod access;
pub mod assign;
pub mod binary;
pub mod compare;
pub mod unary;

// Everything here is `impl Interpreter`; nothing to re-export
