//! Scope snapshots for the line tracer
//!
//! A [`Scope`] mirrors the bindings of one traced frame. It is created when the
//! frame is entered, refreshed from the frame's locals at each of its own
//! events, and discarded when the frame returns. Refreshing only ever adds or
//! overwrites names: a variable deleted in the frame keeps its last value here.
//!
//! [`SnapshotStack`] holds the scopes of all traced frames and renders the
//! *merged view* the tracer prints: the innermost scope's bindings first, then
//! each enclosing scope's bindings for names not already shown. Enclosing scopes
//! are not refreshed while an inner frame runs, so a `global` assignment made in
//! a function only shows up once the module scope sees its next event (unless
//! [`SnapshotStack::refresh_module`] is used).
//!
//! # Visibility
//!
//! [`VisibilityPolicy`] hides dunder names and values whose representation
//! starts with `<` (functions, classes, the [`UNREPRESENTABLE`] marker). The
//! policy decides whether a name enters a scope. Once a name is shown it follows
//! every rebinding, even to a value the policy would hide.
//!
//! # Repeats
//!
//! The stack remembers the last view printed at any depth, so a line is
//! suppressed only when it repeats the line printed just before it. A caller's
//! view is printed again after a callee returns.

use crate::memory::stack::{Bindings, Frame};
use crate::memory::value::Value;
use rustc_hash::FxHashSet;
use std::fmt::Write as _;

pub use crate::memory::value::SnapshotError;

/// Placeholder for a value whose representation failed
pub const UNREPRESENTABLE: &str = "<unrepresentable>";

/// Rendering of an empty view
pub const NO_VARIABLES: &str = "<no variables>";

/// Which bindings a snapshot shows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityPolicy {
    /// Show names starting with `__`
    pub display_dunders: bool,
    /// Show values whose representation starts with `<`
    pub display_unrepresentables: bool,
}

impl VisibilityPolicy {
    pub fn is_visible(&self, name: &str, repr: &str) -> bool {
        if name.starts_with("__") && !self.display_dunders {
            return false;
        }
        if repr.starts_with('<') && !self.display_unrepresentables {
            return false;
        }
        true
    }
}

/// Debug representation of `value`, or [`UNREPRESENTABLE`]
pub fn stringify(value: &Value) -> String {
    match value.repr() {
        Ok(repr) => repr,
        Err(err) => {
            tracing::debug!(error = %err, type_name = value.type_name(), "value has no representation");
            UNREPRESENTABLE.to_string()
        }
    }
}

/// `a = 1, b = [2]`, or [`NO_VARIABLES`]
fn render_bindings<'a>(bindings: impl Iterator<Item = (&'a str, &'a Value)>) -> String {
    let mut out = String::new();
    for (i, (name, value)) in bindings.enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{} = {}", name, stringify(value));
    }
    if out.is_empty() {
        out.push_str(NO_VARIABLES);
    }
    out
}

/// The observed bindings of one traced frame
#[derive(Debug)]
pub struct Scope {
    pub frame_id: u64,
    pub name: String,
    pub is_module: bool,
    bindings: Bindings,
}

impl Scope {
    pub fn new(frame: &Frame) -> Self {
        Scope {
            frame_id: frame.id,
            name: frame.name.clone(),
            is_module: frame.is_module(),
            bindings: Bindings::new(),
        }
    }

    /// Merge `namespace` into the scope
    ///
    /// New names enter only if `policy` shows them; names already in the scope
    /// always take their current value.
    pub fn refresh(&mut self, namespace: &Bindings, policy: VisibilityPolicy) {
        for (name, value) in namespace.iter() {
            if self.bindings.contains(name) || policy.is_visible(name, &stringify(value)) {
                self.bindings.set(name, value.clone());
            }
        }
    }

    /// This scope's own bindings, without enclosing scopes
    pub fn render(&self) -> String {
        render_bindings(self.bindings.iter())
    }
}

/// Scopes of the traced frames, outermost first
#[derive(Debug, Default)]
pub struct SnapshotStack {
    scopes: Vec<Scope>,
    policy: VisibilityPolicy,
    /// View most recently printed, at any depth
    last_shown: Option<String>,
}

impl SnapshotStack {
    pub fn new(policy: VisibilityPolicy) -> Self {
        SnapshotStack {
            scopes: Vec::new(),
            policy,
            last_shown: None,
        }
    }

    /// Start observing `frame`
    pub fn push(&mut self, frame: &Frame) {
        let mut scope = Scope::new(frame);
        scope.refresh(&frame.locals.borrow(), self.policy);
        self.scopes.push(scope);
    }

    pub fn pop(&mut self) -> Option<Scope> {
        self.scopes.pop()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Refresh the innermost scope from `frame`, which must be the frame it mirrors
    pub fn refresh_top(&mut self, frame: &Frame) {
        let policy = self.policy;
        match self.scopes.last_mut() {
            Some(scope) if scope.frame_id == frame.id => {
                scope.refresh(&frame.locals.borrow(), policy);
            }
            _ => tracing::debug!(frame = %frame.name, "event for a frame without a scope"),
        }
    }

    /// Refresh the module scope from the live module namespace
    ///
    /// Does nothing while the module frame itself is innermost; its own events
    /// refresh it.
    pub fn refresh_module(&mut self, globals: &Bindings) {
        let policy = self.policy;
        if self.scopes.len() < 2 {
            return;
        }
        if let Some(module) = self.scopes.first_mut().filter(|scope| scope.is_module) {
            module.refresh(globals, policy);
        }
    }

    /// Innermost bindings first, each name once
    pub fn merged(&self) -> String {
        let mut seen = FxHashSet::default();
        let visible = self.scopes.iter().rev().flat_map(|scope| scope.bindings.iter());
        render_bindings(visible.filter(|(name, _)| seen.insert(*name)))
    }

    /// Record `view` as printed
    ///
    /// Returns `false` when it repeats the view printed just before, whichever
    /// scope that came from.
    pub fn mark_shown(&mut self, view: &str) -> bool {
        if self.last_shown.as_deref() == Some(view) {
            return false;
        }
        self.last_shown = Some(view.to_string());
        true
    }

    /// Each scope's own rendering, innermost first
    pub fn frames_top_first(&self) -> impl Iterator<Item = String> + '_ {
        self.scopes.iter().rev().map(Scope::render)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::stack::new_namespace;
    use crate::memory::value::{Function, MAX_REPR_DEPTH};
    use crate::parser::parse_program;
    use crate::parser::ast::StmtKind;
    use std::rc::Rc;

    fn module_frame(id: u64) -> Frame {
        let globals = new_namespace();
        Frame {
            id,
            name: "<module>".to_string(),
            filename: Rc::from("t.py"),
            line: 1,
            locals: globals.clone(),
            globals,
            function: None,
            traced: true,
        }
    }

    fn function_frame(id: u64, globals: &Frame) -> Frame {
        let program = parse_program("def f():\n    pass\n").unwrap();
        let StmtKind::FunctionDef(def) = &program.body[0].kind else {
            panic!("expected a function definition");
        };
        Frame {
            id,
            name: "f".to_string(),
            filename: Rc::from("t.py"),
            line: 1,
            locals: new_namespace(),
            globals: globals.globals.clone(),
            function: Some(def.clone()),
            traced: true,
        }
    }

    fn nested_list(depth: usize) -> Value {
        let mut value = Value::None;
        for _ in 0..depth {
            value = Value::list(vec![value]);
        }
        value
    }

    #[test]
    fn test_visibility_policy() {
        let policy = VisibilityPolicy::default();
        assert!(policy.is_visible("a", "1"));
        assert!(!policy.is_visible("__name__", "'__main__'"));
        assert!(!policy.is_visible("f", "<function f>"));

        let everything = VisibilityPolicy {
            display_dunders: true,
            display_unrepresentables: true,
        };
        assert!(everything.is_visible("__name__", "'__main__'"));
        assert!(everything.is_visible("f", "<function f>"));
    }

    #[test]
    fn test_stringify_falls_back_on_failure() {
        assert_eq!(stringify(&Value::str("x")), "'x'");
        assert_eq!(stringify(&nested_list(MAX_REPR_DEPTH + 1)), UNREPRESENTABLE);
    }

    #[test]
    fn test_scope_is_cumulative_and_ordered() {
        let frame = module_frame(1);
        let mut scope = Scope::new(&frame);
        let policy = VisibilityPolicy::default();

        frame.locals.borrow_mut().set("b", Value::Int(1));
        frame.locals.borrow_mut().set("a", Value::Int(2));
        scope.refresh(&frame.locals.borrow(), policy);
        assert_eq!(scope.render(), "b = 1, a = 2");

        frame.locals.borrow_mut().remove("b");
        frame.locals.borrow_mut().set("a", Value::Int(3));
        frame.locals.borrow_mut().set("b", Value::Int(4));
        scope.refresh(&frame.locals.borrow(), policy);
        assert_eq!(scope.render(), "b = 4, a = 3");

        frame.locals.borrow_mut().remove("a");
        scope.refresh(&frame.locals.borrow(), policy);
        assert_eq!(scope.render(), "b = 4, a = 3");
    }

    #[test]
    fn test_hidden_names_never_enter() {
        let frame = module_frame(1);
        let mut scope = Scope::new(&frame);
        let policy = VisibilityPolicy::default();

        frame.locals.borrow_mut().set("__name__", Value::str("__main__"));
        frame.locals.borrow_mut().set("g", nested_list(MAX_REPR_DEPTH + 1));
        scope.refresh(&frame.locals.borrow(), policy);
        assert_eq!(scope.render(), NO_VARIABLES);

        frame.locals.borrow_mut().set("g", Value::Int(1));
        scope.refresh(&frame.locals.borrow(), policy);
        assert_eq!(scope.render(), "g = 1");
    }

    #[test]
    fn test_shown_name_follows_rebinding_to_hidden_value() {
        let frame = module_frame(1);
        let mut scope = Scope::new(&frame);
        let policy = VisibilityPolicy::default();

        frame.locals.borrow_mut().set("x", Value::Int(1));
        scope.refresh(&frame.locals.borrow(), policy);
        assert_eq!(scope.render(), "x = 1");

        frame.locals.borrow_mut().set("x", nested_list(MAX_REPR_DEPTH + 1));
        scope.refresh(&frame.locals.borrow(), policy);
        assert_eq!(scope.render(), format!("x = {}", UNREPRESENTABLE));
    }

    #[test]
    fn test_merged_view_prefers_inner_scope() {
        let module = module_frame(1);
        module.locals.borrow_mut().set("x", Value::Int(1));
        module.locals.borrow_mut().set("y", Value::Int(2));

        let mut stack = SnapshotStack::new(VisibilityPolicy::default());
        stack.push(&module);

        let function = function_frame(2, &module);
        function.locals.borrow_mut().set("y", Value::Int(3));
        stack.push(&function);

        assert_eq!(stack.depth(), 2);
        assert_eq!(stack.merged(), "y = 3, x = 1");
        let frames: Vec<String> = stack.frames_top_first().collect();
        assert_eq!(frames, vec!["y = 3", "x = 1, y = 2"]);
    }

    #[test]
    fn test_enclosing_scope_lags_until_refreshed() {
        let module = module_frame(1);
        module.locals.borrow_mut().set("x", Value::Int(1));
        let mut stack = SnapshotStack::new(VisibilityPolicy::default());
        stack.push(&module);

        let function = function_frame(2, &module);
        stack.push(&function);
        module.globals.borrow_mut().set("x", Value::Int(2));

        stack.refresh_top(&function);
        assert_eq!(stack.merged(), "x = 1");

        stack.refresh_module(&module.globals.borrow());
        assert_eq!(stack.merged(), "x = 2");
    }

    #[test]
    fn test_mark_shown_compares_with_previous_line() {
        let module = module_frame(1);
        let mut stack = SnapshotStack::new(VisibilityPolicy::default());
        stack.push(&module);
        assert!(stack.mark_shown(NO_VARIABLES));
        assert!(!stack.mark_shown(NO_VARIABLES));

        // A callee printing the same view is still a repeat
        let function = function_frame(2, &module);
        stack.push(&function);
        assert!(!stack.mark_shown(NO_VARIABLES));
        assert!(stack.mark_shown("a = 1"));

        // The caller's unchanged view differs from the callee's last line
        stack.pop();
        assert!(!stack.mark_shown("a = 1"));
        assert!(stack.mark_shown(NO_VARIABLES));
    }

    #[test]
    fn test_functions_are_hidden_by_default() {
        let module = module_frame(1);
        let program = parse_program("def f():\n    pass\n").unwrap();
        let StmtKind::FunctionDef(def) = &program.body[0].kind else {
            panic!("expected a function definition");
        };
        let function = Function {
            def: def.clone(),
            defaults: Vec::new(),
            globals: module.globals.clone(),
            filename: Rc::from("t.py"),
        };
        module.locals.borrow_mut().set("f", Value::Function(Rc::new(function)));

        let mut stack = SnapshotStack::new(VisibilityPolicy::default());
        stack.push(&module);
        assert_eq!(stack.merged(), NO_VARIABLES);

        let mut shown = SnapshotStack::new(VisibilityPolicy {
            display_dunders: false,
            display_unrepresentables: true,
        });
        shown.push(&module);
        assert_eq!(shown.merged(), "f = <function f>");
    }
}
