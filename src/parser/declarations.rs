//! Function definition parsing and scope analysis
//!
//! Besides parsing `def name(params): block`, this module decides which names
//! are local to each function. A name is local when the body binds it anywhere
//! (assignment, augmented assignment, `for` target, `del`, nested `def`,
//! `except ... as`) and does not declare it `global`. The interpreter relies on
//! this to raise `UnboundLocalError` and to route `global` assignments to the
//! module scope.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};
use rustc_hash::FxHashSet;
use std::rc::Rc;

impl Parser {
    /// Parse a function definition; `def` is already consumed
    pub(crate) fn parse_function_def(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let name = self.expect_identifier()?;
        self.expect_token(&TokenKind::LParen, "expected '(' after function name")?;

        let mut params: Vec<Param> = Vec::new();
        while !self.check(&TokenKind::RParen) {
            let param_loc = self.current_location();
            let param_name = self.expect_identifier()?;

            if params.iter().any(|p| p.name == param_name) {
                return Err(ParseError {
                    message: format!(
                        "duplicate argument '{}' in function definition",
                        param_name
                    ),
                    location: param_loc,
                });
            }

            let default = if self.match_token(&TokenKind::Eq) {
                Some(self.parse_expression()?)
            } else {
                if params.iter().any(|p| p.default.is_some()) {
                    return Err(ParseError {
                        message: "non-default argument follows default argument".to_string(),
                        location: param_loc,
                    });
                }
                None
            };

            params.push(Param {
                name: param_name,
                default,
            });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_rparen("after parameters")?;
        self.expect_colon("after function signature")?;
        // Loops around a `def` do not extend into its body
        let enclosing = (self.loop_depth, self.in_function);
        self.loop_depth = 0;
        self.in_function = true;
        let body = self.parse_block("function definition");
        (self.loop_depth, self.in_function) = enclosing;
        let body = body?;

        let mut global_names = FxHashSet::default();
        collect_globals(&body, &mut global_names);

        if let Some(param) = params.iter().find(|p| global_names.contains(&p.name)) {
            return Err(ParseError {
                message: format!("name '{}' is parameter and global", param.name),
                location: loc,
            });
        }

        let mut local_names: FxHashSet<String> = params.iter().map(|p| p.name.clone()).collect();
        collect_bound_names(&body, &mut local_names);
        local_names.retain(|n| !global_names.contains(n));

        Ok(Stmt::new(
            StmtKind::FunctionDef(Rc::new(FunctionDef {
                name,
                params,
                body,
                local_names,
                global_names,
                location: loc,
            })),
            loc,
        ))
    }
}

/// Names declared `global` anywhere in `body` (nested functions excluded)
fn collect_globals(body: &[Stmt], out: &mut FxHashSet<String>) {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Global(names) => out.extend(names.iter().cloned()),
            _ => for_each_nested_block(&stmt.kind, |block| collect_globals(block, out)),
        }
    }
}

/// Names bound by statements in `body` (nested function bodies excluded)
fn collect_bound_names(body: &[Stmt], out: &mut FxHashSet<String>) {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    collect_target_names(target, out);
                }
            }
            StmtKind::AugAssign { target, .. } => collect_target_names(target, out),
            StmtKind::For { target, .. } => collect_target_names(target, out),
            StmtKind::Del(targets) => {
                for target in targets {
                    collect_target_names(target, out);
                }
            }
            StmtKind::FunctionDef(def) => {
                out.insert(def.name.clone());
            }
            StmtKind::Try { handlers, .. } => {
                for handler in handlers {
                    if let Some(binding) = &handler.binding {
                        out.insert(binding.clone());
                    }
                }
            }
            _ => {}
        }
        for_each_nested_block(&stmt.kind, |block| collect_bound_names(block, out));
    }
}

fn collect_target_names(target: &Expr, out: &mut FxHashSet<String>) {
    match target {
        Expr::Name(name, _) => {
            out.insert(name.clone());
        }
        Expr::Tuple(items, _) | Expr::List(items, _) => {
            for item in items {
                collect_target_names(item, out);
            }
        }
        _ => {}
    }
}

/// Visit the statement blocks nested directly in a compound statement
fn for_each_nested_block(kind: &StmtKind, mut visit: impl FnMut(&[Stmt])) {
    match kind {
        StmtKind::If { branches, orelse } => {
            for branch in branches {
                visit(&branch.body);
            }
            if let Some(orelse) = orelse {
                visit(orelse);
            }
        }
        StmtKind::While { body, .. } | StmtKind::For { body, .. } => visit(body),
        StmtKind::Try { body, handlers } => {
            visit(body);
            for handler in handlers {
                visit(&handler.body);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::StmtKind;
    use crate::parser::parse::Parser;

    fn function(source: &str) -> std::rc::Rc<crate::parser::ast::FunctionDef> {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        match &program.body[0].kind {
            StmtKind::FunctionDef(def) => def.clone(),
            other => panic!("Expected function definition, got {:?}", other),
        }
    }

    #[test]
    fn test_locals_include_params_and_assignments() {
        let def = function(
            "def f(a):\n    b = 1\n    for i, x in a:\n        pass\n    if a:\n        c = 2\n",
        );
        for name in ["a", "b", "i", "x", "c"] {
            assert!(def.local_names.contains(name), "{name} should be local");
        }
        assert!(def.global_names.is_empty());
    }

    #[test]
    fn test_global_names_are_not_local() {
        let def = function("def f():\n    global x\n    x = 2\n    y = 3\n");
        assert!(def.global_names.contains("x"));
        assert!(!def.local_names.contains("x"));
        assert!(def.local_names.contains("y"));
    }

    #[test]
    fn test_nested_function_bodies_are_not_scanned() {
        let def = function("def f():\n    def g():\n        inner = 1\n    return g\n");
        assert!(def.local_names.contains("g"));
        assert!(!def.local_names.contains("inner"));
    }

    #[test]
    fn test_parameter_declared_global_is_rejected() {
        let err = Parser::new("def f(x):\n    global x\n")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert_eq!(err.message, "name 'x' is parameter and global");
    }

    #[test]
    fn test_default_ordering() {
        let err = Parser::new("def f(a=1, b):\n    pass\n")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert_eq!(err.message, "non-default argument follows default argument");
    }
}
