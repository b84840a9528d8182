//! Loop statement execution (`while`, `for`).
//!
//! Adds `impl Interpreter` methods for the two loop forms. `break` and
//! `continue` are reported through [`LoopBodyResult`] so the loop driver can
//! react without inspecting the body's statements.
//!
//! After every iteration that completes (normally or through `continue`) the
//! driver fires a `Line` event at the loop header, the way the header is
//! re-evaluated before the next iteration.

use crate::interpreter::engine::{ControlFlow, Interpreter};
use crate::interpreter::errors::ScriptError;
use crate::interpreter::ops::binary::MAX_SEQUENCE_LEN;
use crate::memory::value::{Value, ValueIter};
use crate::parser::ast::{Expr, SourceLocation, Stmt};

/// Result returned by [`Interpreter::exec_loop_body`] to signal how the body ended.
pub(crate) enum LoopBodyResult {
    /// Body completed normally or via `continue`; the loop should iterate again.
    Continue,
    /// `break` was encountered; the loop should exit cleanly.
    Break,
    /// `return` was triggered; the loop unwinds and hands the flow to the caller.
    Exit(ControlFlow),
}

impl Interpreter {
    pub(crate) fn exec_loop_body(&mut self, body: &[Stmt]) -> Result<LoopBodyResult, ScriptError> {
        Ok(match self.exec_block(body)? {
            ControlFlow::Normal | ControlFlow::Continue => LoopBodyResult::Continue,
            ControlFlow::Break => LoopBodyResult::Break,
            flow @ ControlFlow::Return(_) => LoopBodyResult::Exit(flow),
        })
    }

    pub(crate) fn exec_while(
        &mut self,
        condition: &Expr,
        body: &[Stmt],
        location: SourceLocation,
    ) -> Result<ControlFlow, ScriptError> {
        while self.eval_expr(condition)?.is_truthy() {
            match self.exec_loop_body(body)? {
                LoopBodyResult::Continue => self.trace_line(location.line),
                LoopBodyResult::Break => break,
                LoopBodyResult::Exit(flow) => return Ok(flow),
            }
        }
        Ok(ControlFlow::Normal)
    }

    pub(crate) fn exec_for(
        &mut self,
        target: &Expr,
        iter: &Expr,
        body: &[Stmt],
        location: SourceLocation,
    ) -> Result<ControlFlow, ScriptError> {
        let iterable = self.eval_expr(iter)?;
        let items = self.iterate(&iterable, location)?;

        for item in items {
            self.assign_target(target, item)?;
            match self.exec_loop_body(body)? {
                LoopBodyResult::Continue => self.trace_line(location.line),
                LoopBodyResult::Break => break,
                LoopBodyResult::Exit(flow) => return Ok(flow),
            }
        }
        Ok(ControlFlow::Normal)
    }

    /// Start iterating over `value`
    pub(crate) fn iterate(
        &self,
        value: &Value,
        location: SourceLocation,
    ) -> Result<ValueIter, ScriptError> {
        ValueIter::new(value).map_err(|type_name| {
            ScriptError::type_error(format!("'{}' object is not iterable", type_name), location)
        })
    }

    /// Collect all items of an iterable
    pub(crate) fn collect_iterable(
        &self,
        value: &Value,
        location: SourceLocation,
    ) -> Result<Vec<Value>, ScriptError> {
        if let Value::Range(range) = value {
            if range.len() > MAX_SEQUENCE_LEN {
                return Err(ScriptError::memory(location));
            }
        }
        Ok(self.iterate(value, location)?.collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::interpreter::engine::Interpreter;
    use crate::interpreter::errors::ExceptionKind;
    use crate::parser::parse_program;
    use crate::terminal::Terminal;

    fn output(source: &str) -> String {
        let (terminal, buffer) = Terminal::capture();
        let program = parse_program(source).unwrap();
        Interpreter::new(terminal).run(&program, "test.py").unwrap();
        buffer.contents()
    }

    #[test]
    fn test_while_with_break_and_continue() {
        let source = "i = 0\nwhile True:\n    i += 1\n    if i == 2:\n        continue\n    if i > 4:\n        break\n    print(i)\n";
        assert_eq!(output(source), "1\n3\n4\n");
    }

    #[test]
    fn test_for_over_range_dict_and_string() {
        let source = "for i in range(3):\n    print(i)\nfor k in {'a': 1, 'b': 2}:\n    print(k)\nfor c in 'xy':\n    print(c)\n";
        assert_eq!(output(source), "0\n1\n2\na\nb\nx\ny\n");
    }

    #[test]
    fn test_return_from_inside_loop() {
        let source = "def first_even(xs):\n    for x in xs:\n        if x % 2 == 0:\n            return x\n    return None\nprint(first_even([1, 3, 4, 6]))\n";
        assert_eq!(output(source), "4\n");
    }

    #[test]
    fn test_huge_range_is_not_collected() {
        let (terminal, _) = Terminal::capture();
        let program = parse_program("xs = list(range(10 ** 18))\n").unwrap();
        let err = Interpreter::new(terminal).run(&program, "test.py").unwrap_err();
        assert_eq!(err.kind(), ExceptionKind::MemoryError);

        let source = "for i in range(10 ** 18):\n    if i == 2:\n        break\nprint(i)\n";
        assert_eq!(output(source), "2\n");
    }

    #[test]
    fn test_for_unpacks_targets() {
        let source = "for i, (a, b) in [(0, (1, 2)), (1, (3, 4))]:\n    print(i, a + b)\n";
        assert_eq!(output(source), "0 3\n1 7\n");
    }
}
