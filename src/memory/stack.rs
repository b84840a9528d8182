//! Call stack implementation
//!
//! This module provides the call stack for function execution:
//! - [`Bindings`]: an insertion-ordered name → value map
//! - [`Namespace`]: shared handle to a [`Bindings`] (module globals, function locals)
//! - [`Frame`]: a single activation record
//! - [`Stack`]: the call stack containing frames
//!
//! A module-level frame uses the module namespace as both its locals and its
//! globals, so assignments at module level land in the globals directly.

use super::value::Value;
use crate::parser::ast::FunctionDef;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Insertion-ordered variable bindings
///
/// Overwriting a name keeps its original position; removing it and binding it
/// again moves it to the end.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    entries: Vec<(String, Value)>,
    index: FxHashMap<String, usize>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn set(&mut self, name: &str, value: Value) {
        match self.index.get(name) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(name.to_string(), self.entries.len());
                self.entries.push((name.to_string(), value));
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let position = self.index.remove(name)?;
        let (_, value) = self.entries.remove(position);
        for slot in self.index.values_mut() {
            if *slot > position {
                *slot -= 1;
            }
        }
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bindings in first-assignment order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Shared, mutable bindings
pub type Namespace = Rc<RefCell<Bindings>>;

pub fn new_namespace() -> Namespace {
    Rc::new(RefCell::new(Bindings::new()))
}

/// Stack frame for a module or function activation
#[derive(Debug, Clone)]
pub struct Frame {
    /// Unique for the lifetime of the interpreter
    pub id: u64,
    /// `<module>` or the function name
    pub name: String,
    pub filename: Rc<str>,
    /// Line of the statement currently executing
    pub line: usize,
    pub locals: Namespace,
    pub globals: Namespace,
    /// `None` for module-level code
    pub function: Option<Rc<FunctionDef>>,
    /// Whether the trace hook asked to follow this frame
    pub traced: bool,
}

impl Frame {
    pub fn is_module(&self) -> bool {
        self.function.is_none()
    }

    /// Whether assignments to `name` bind in this frame's locals
    pub fn is_local(&self, name: &str) -> bool {
        self.function
            .as_ref()
            .is_some_and(|def| def.local_names.contains(name))
    }

    /// Whether `name` was declared `global` in this frame's function
    pub fn is_declared_global(&self, name: &str) -> bool {
        self.function
            .as_ref()
            .is_some_and(|def| def.global_names.contains(name))
    }
}

/// Call stack
#[derive(Debug, Default)]
pub struct Stack {
    frames: Vec<Frame>,
    next_id: u64,
}

impl Stack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame; its id is assigned here
    pub fn push(&mut self, mut frame: Frame) -> &Frame {
        frame.id = self.next_id;
        self.next_id += 1;
        self.frames.push(frame);
        &self.frames[self.frames.len() - 1]
    }

    pub fn pop(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn current(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
