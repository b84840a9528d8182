//! Execution engine for the scripting language
//!
//! The [`Interpreter`] owns the call stack, the built-in namespace and the output
//! terminal. It walks the AST statement by statement and reports every frame
//! boundary and statement to an optional [`TraceHook`].
//!
//! # Frames and events
//!
//! - [`Interpreter::enter_frame`] pushes a frame and fires `Call`; the hook's answer
//!   decides whether the frame is traced at all.
//! - [`Interpreter::trace_line`] records the current line and fires `Line`.
//! - [`Interpreter::leave_frame`] fires `Exception` (once per frame) and `Return`,
//!   then pops the frame.
//!
//! # Name resolution
//!
//! A function's local names are computed by the parser. Reads of a local name
//! never fall back to globals (an unassigned local raises `UnboundLocalError`);
//! other names resolve in the defining module's globals, then in the built-ins.

use crate::interpreter::builtins::Builtin;
use crate::interpreter::errors::{ExceptionKind, ExceptionValue, ScriptError, TracebackEntry};
use crate::interpreter::hook::{TraceDirective, TraceEvent, TraceHook};
use crate::interpreter::prelude::{PRELUDE_FILENAME, PRELUDE_SOURCE};
use crate::memory::stack::{new_namespace, Bindings, Frame, Namespace, Stack};
use crate::memory::value::{Function, Value};
use crate::parser::ast::*;
use crate::parser::parse_program;
use crate::terminal::Terminal;
use std::cell::RefCell;
use std::rc::Rc;

/// Default maximum call depth
pub const DEFAULT_RECURSION_LIMIT: usize = 1000;

/// Frame name of module-level code
pub const MODULE_FRAME_NAME: &str = "<module>";

/// How a statement finished
#[derive(Debug)]
pub(crate) enum ControlFlow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// The main interpreter that executes scripts
pub struct Interpreter {
    /// Native built-ins, exception classes and prelude functions
    pub(crate) builtins: Namespace,

    /// Call stack
    pub(crate) stack: Stack,

    /// Destination of `print`
    pub(crate) terminal: Terminal,

    /// Receiver of trace events
    hook: Option<Box<dyn TraceHook>>,

    /// Maximum number of frames on the stack
    recursion_limit: usize,

    /// Exceptions being handled by enclosing `except` clauses, innermost last
    pub(crate) handling: Vec<Rc<ExceptionValue>>,

    prelude_loaded: bool,
}

impl Interpreter {
    /// Create an interpreter whose `print` writes to `terminal`
    pub fn new(terminal: Terminal) -> Self {
        let builtins = new_namespace();
        {
            let mut namespace = builtins.borrow_mut();
            for builtin in Builtin::ALL {
                namespace.set(builtin.name(), Value::Builtin(builtin));
            }
            for kind in ExceptionKind::ALL {
                namespace.set(kind.name(), Value::ExceptionClass(kind));
            }
        }

        Interpreter {
            builtins,
            stack: Stack::new(),
            terminal,
            hook: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            handling: Vec::new(),
            prelude_loaded: false,
        }
    }

    pub fn set_hook(&mut self, hook: Box<dyn TraceHook>) {
        self.hook = Some(hook);
    }

    /// Detach the trace hook
    pub fn take_hook(&mut self) -> Option<Box<dyn TraceHook>> {
        self.hook.take()
    }

    pub fn set_recursion_limit(&mut self, limit: usize) {
        self.recursion_limit = limit.max(1);
    }

    /// Run a parsed program as the main module of file `filename`
    pub fn run(&mut self, program: &Program, filename: &str) -> Result<(), ScriptError> {
        self.load_prelude()?;

        let globals = new_namespace();
        {
            let mut namespace = globals.borrow_mut();
            namespace.set("__name__", Value::str("__main__"));
            namespace.set("__file__", Value::str(filename));
        }

        tracing::debug!(filename, statements = program.body.len(), "running module");
        self.run_module(program, Rc::from(filename), globals)
    }

    /// Execute the prelude into the built-in namespace, untraced
    fn load_prelude(&mut self) -> Result<(), ScriptError> {
        if self.prelude_loaded {
            return Ok(());
        }

        let program = parse_program(PRELUDE_SOURCE).map_err(|err| {
            ScriptError::new(
                ExceptionKind::RuntimeError,
                format!("failed to load the prelude: {}", err),
                err.location,
            )
        })?;

        let hook = self.hook.take();
        let result = self.run_module(&program, Rc::from(PRELUDE_FILENAME), self.builtins.clone());
        self.hook = hook;
        result?;

        self.prelude_loaded = true;
        tracing::debug!("prelude loaded");
        Ok(())
    }

    fn run_module(
        &mut self,
        program: &Program,
        filename: Rc<str>,
        globals: Namespace,
    ) -> Result<(), ScriptError> {
        let first_line = program.body.first().map_or(1, |stmt| stmt.location.line);
        self.enter_frame(Frame {
            id: 0,
            name: MODULE_FRAME_NAME.to_string(),
            filename,
            line: first_line,
            locals: globals.clone(),
            globals,
            function: None,
            traced: false,
        });

        let result = self.exec_block(&program.body).map(|_| Value::None);
        self.leave_frame(result).map(|_| ())
    }

    // ===== Frames and trace events =====

    /// Push a frame and offer it to the hook
    pub(crate) fn enter_frame(&mut self, frame: Frame) {
        self.stack.push(frame);
        let directive = self.fire(TraceEvent::Call);
        if let Some(frame) = self.stack.current_mut() {
            frame.traced = directive == TraceDirective::Trace;
        }
    }

    /// Finish the current frame with `result` and pop it
    pub(crate) fn leave_frame(
        &mut self,
        result: Result<Value, ScriptError>,
    ) -> Result<Value, ScriptError> {
        let result = match result {
            Ok(value) => {
                if self.current_traced() {
                    self.fire(TraceEvent::Return(&value));
                }
                Ok(value)
            }
            Err(mut err) => {
                self.report_exception(&mut err);
                if let Some(frame) = self.stack.current() {
                    err.traceback.push(TracebackEntry {
                        filename: frame.filename.clone(),
                        function: frame.name.clone(),
                        line: frame.line,
                    });
                }
                if self.current_traced() {
                    self.fire(TraceEvent::Return(&Value::None));
                }
                Err(err)
            }
        };

        self.stack.pop();
        result
    }

    /// Record that the statement at `line` is about to run
    pub(crate) fn trace_line(&mut self, line: usize) {
        let traced = match self.stack.current_mut() {
            Some(frame) => {
                frame.line = line;
                frame.traced
            }
            None => false,
        };
        if traced {
            self.fire(TraceEvent::Line);
        }
    }

    /// Move the current frame to `line` without an event
    pub(crate) fn set_line(&mut self, line: usize) {
        if let Some(frame) = self.stack.current_mut() {
            frame.line = line;
        }
    }

    /// Fire the exception event for `err` unless this frame already did
    pub(crate) fn report_exception(&mut self, err: &mut ScriptError) {
        let Some(frame) = self.stack.current() else {
            return;
        };
        if err.reported_in == Some(frame.id) {
            return;
        }
        err.reported_in = Some(frame.id);
        if frame.traced {
            let exception = err.exception.clone();
            self.fire(TraceEvent::Exception(&exception));
        }
    }

    fn current_traced(&self) -> bool {
        self.stack.current().is_some_and(|frame| frame.traced)
    }

    fn fire(&mut self, event: TraceEvent<'_>) -> TraceDirective {
        match (self.hook.as_mut(), self.stack.current()) {
            (Some(hook), Some(frame)) => hook.on_event(frame, event),
            _ => TraceDirective::Skip,
        }
    }

    // ===== Calls =====

    /// Call any callable value
    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        match callee {
            Value::Function(func) => self.call_function(func, args, kwargs, location),
            Value::Builtin(builtin) => self.call_builtin(*builtin, args, kwargs, location),
            Value::Method(method) => self.call_method(method, args, kwargs, location),
            Value::ExceptionClass(kind) => {
                if let Some((name, _)) = kwargs.first() {
                    return Err(ScriptError::type_error(
                        format!("{}() got an unexpected keyword argument '{}'", kind.name(), name),
                        location,
                    ));
                }
                Ok(Value::Exception(Rc::new(ExceptionValue::new(*kind, args))))
            }
            other => Err(ScriptError::type_error(
                format!("'{}' object is not callable", other.type_name()),
                location,
            )),
        }
    }

    /// Call a user-defined function in a new frame
    pub(crate) fn call_function(
        &mut self,
        func: &Rc<Function>,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Value, ScriptError> {
        if self.stack.depth() >= self.recursion_limit {
            return Err(ScriptError::new(
                ExceptionKind::RecursionError,
                "maximum recursion depth exceeded",
                location,
            ));
        }

        let locals = self.bind_arguments(func, args, kwargs, location)?;
        self.enter_frame(Frame {
            id: 0,
            name: func.def.name.clone(),
            filename: func.filename.clone(),
            line: func.def.location.line,
            locals: Rc::new(RefCell::new(locals)),
            globals: func.globals.clone(),
            function: Some(func.def.clone()),
            traced: false,
        });

        let result = self.exec_block(&func.def.body).map(|flow| match flow {
            ControlFlow::Return(value) => value,
            _ => Value::None,
        });
        self.leave_frame(result)
    }

    /// Match call arguments to parameters
    fn bind_arguments(
        &self,
        func: &Function,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
        location: SourceLocation,
    ) -> Result<Bindings, ScriptError> {
        let name = func.name();
        let params = &func.def.params;
        let first_default = params.len() - func.defaults.len();

        if args.len() > params.len() {
            let expected = if func.defaults.is_empty() {
                params.len().to_string()
            } else {
                format!("from {} to {}", first_default, params.len())
            };
            return Err(ScriptError::type_error(
                format!(
                    "{}() takes {} positional argument{} but {} {} given",
                    name,
                    expected,
                    if params.len() == 1 { "" } else { "s" },
                    args.len(),
                    if args.len() == 1 { "was" } else { "were" }
                ),
                location,
            ));
        }

        let mut slots: Vec<Option<Value>> = vec![None; params.len()];
        for (slot, value) in slots.iter_mut().zip(args) {
            *slot = Some(value);
        }

        for (key, value) in kwargs {
            let Some(index) = params.iter().position(|p| p.name == key) else {
                return Err(ScriptError::type_error(
                    format!("{}() got an unexpected keyword argument '{}'", name, key),
                    location,
                ));
            };
            if slots[index].is_some() {
                return Err(ScriptError::type_error(
                    format!("{}() got multiple values for argument '{}'", name, key),
                    location,
                ));
            }
            slots[index] = Some(value);
        }

        let mut locals = Bindings::new();
        let mut missing = Vec::new();
        for (i, (param, slot)) in params.iter().zip(slots).enumerate() {
            let value = match slot {
                Some(value) => value,
                None if i >= first_default => func.defaults[i - first_default].clone(),
                None => {
                    missing.push(format!("'{}'", param.name));
                    continue;
                }
            };
            locals.set(&param.name, value);
        }

        if !missing.is_empty() {
            let names = match missing.as_slice() {
                [one] => one.clone(),
                [first, second] => format!("{} and {}", first, second),
                [rest @ .., last] => format!("{}, and {}", rest.join(", "), last),
                [] => String::new(),
            };
            return Err(ScriptError::type_error(
                format!(
                    "{}() missing {} required positional argument{}: {}",
                    name,
                    missing.len(),
                    if missing.len() == 1 { "" } else { "s" },
                    names
                ),
                location,
            ));
        }

        Ok(locals)
    }

    // ===== Names =====

    pub(crate) fn current_frame(&self, location: SourceLocation) -> Result<&Frame, ScriptError> {
        self.stack.current().ok_or_else(|| {
            ScriptError::new(ExceptionKind::RuntimeError, "no active frame", location)
        })
    }

    pub(crate) fn load_name(&self, name: &str, location: SourceLocation) -> Result<Value, ScriptError> {
        let frame = self.current_frame(location)?;

        if frame.is_local(name) {
            return frame.locals.borrow().get(name).cloned().ok_or_else(|| {
                ScriptError::new(
                    ExceptionKind::UnboundLocalError,
                    format!(
                        "cannot access local variable '{}' where it is not associated with a value",
                        name
                    ),
                    location,
                )
            });
        }

        if let Some(value) = frame.globals.borrow().get(name) {
            return Ok(value.clone());
        }

        if let Some(value) = self.builtins.borrow().get(name) {
            return Ok(value.clone());
        }

        Err(ScriptError::new(
            ExceptionKind::NameError,
            format!("name '{}' is not defined", name),
            location,
        ))
    }

    pub(crate) fn store_name(
        &mut self,
        name: &str,
        value: Value,
        location: SourceLocation,
    ) -> Result<(), ScriptError> {
        let frame = self.current_frame(location)?;
        let namespace = if frame.is_module() || frame.is_declared_global(name) {
            &frame.globals
        } else {
            &frame.locals
        };
        namespace.borrow_mut().set(name, value);
        Ok(())
    }

    pub(crate) fn delete_name(&mut self, name: &str, location: SourceLocation) -> Result<(), ScriptError> {
        let frame = self.current_frame(location)?;
        let local = frame.is_local(name);
        let namespace = if local { &frame.locals } else { &frame.globals };

        if namespace.borrow_mut().remove(name).is_some() {
            return Ok(());
        }

        Err(if local {
            ScriptError::new(
                ExceptionKind::UnboundLocalError,
                format!(
                    "cannot access local variable '{}' where it is not associated with a value",
                    name
                ),
                location,
            )
        } else {
            ScriptError::new(
                ExceptionKind::NameError,
                format!("name '{}' is not defined", name),
                location,
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(source: &str) -> (Result<(), ScriptError>, String) {
        let (terminal, buffer) = Terminal::capture();
        let program = parse_program(source).unwrap();
        let mut interpreter = Interpreter::new(terminal);
        let result = interpreter.run(&program, "test.py");
        (result, buffer.contents())
    }

    #[test]
    fn test_print_and_arithmetic() {
        let (result, output) = run("x = 2\ny = x * 3 + 1\nprint(x, y, sep=', ')\n");
        assert!(result.is_ok());
        assert_eq!(output, "2, 7\n");
    }

    #[test]
    fn test_function_defaults_and_keywords() {
        let (result, output) =
            run("def f(a, b=10, c=100):\n    return a + b + c\nprint(f(1), f(1, c=2), f(b=0, a=0))\n");
        assert!(result.is_ok());
        assert_eq!(output, "111 13 100\n");
    }

    #[test]
    fn test_argument_errors() {
        let (result, _) = run("def f(a, b):\n    pass\nf(1)\n");
        assert_eq!(
            result.unwrap_err().to_string(),
            "TypeError: f() missing 1 required positional argument: 'b'"
        );

        let (result, _) = run("def f(a):\n    pass\nf(1, 2)\n");
        assert_eq!(
            result.unwrap_err().to_string(),
            "TypeError: f() takes 1 positional argument but 2 were given"
        );

        let (result, _) = run("def f(a):\n    pass\nf(1, a=2)\n");
        assert_eq!(
            result.unwrap_err().to_string(),
            "TypeError: f() got multiple values for argument 'a'"
        );
    }

    #[test]
    fn test_global_declaration_writes_module_scope() {
        let (result, output) =
            run("x = 1\ndef f():\n    global x\n    x = 2\nf()\nprint(x)\n");
        assert!(result.is_ok());
        assert_eq!(output, "2\n");
    }

    #[test]
    fn test_unbound_local() {
        let (result, _) = run("x = 1\ndef f():\n    print(x)\n    x = 2\nf()\n");
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::UnboundLocalError);
    }

    #[test]
    fn test_name_error_traceback() {
        let (result, _) = run("def f():\n    return missing\nf()\n");
        let err = result.unwrap_err();
        assert_eq!(err.to_string(), "NameError: name 'missing' is not defined");
        let frames: Vec<(&str, usize)> = err
            .traceback
            .iter()
            .map(|entry| (entry.function.as_str(), entry.line))
            .collect();
        assert_eq!(frames, vec![("f", 2), ("<module>", 3)]);
    }

    #[test]
    fn test_recursion_limit() {
        let (terminal, _) = Terminal::capture();
        let program = parse_program("def f(n):\n    return f(n + 1)\nf(0)\n").unwrap();
        let mut interpreter = Interpreter::new(terminal);
        interpreter.set_recursion_limit(50);
        let err = interpreter.run(&program, "test.py").unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::RecursionError);
    }

    #[test]
    fn test_prelude_functions_are_builtins() {
        let (result, output) = run("print(sum([1, 2, 3]), sorted([3, 1, 2]))\n");
        assert!(result.is_ok());
        assert_eq!(output, "6 [1, 2, 3]\n");
    }
}
