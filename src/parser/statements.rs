//! Statement parsing implementation
//!
//! This module handles parsing of all statement types:
//!
//! - Simple statements: expressions, assignments, `pass`, `break`, `continue`,
//!   `return`, `global`, `del`, `assert`, `raise`
//! - Compound statements: `if`/`elif`/`else`, `while`, `for`, `try`/`except`
//!   (function definitions live in `declarations`)
//! - Blocks: an indented suite, or simple statements on the header's line
//!
//! # Grammar
//!
//! ```text
//! statement     ::= compound_stmt | simple_stmts
//! simple_stmts  ::= simple_stmt (';' simple_stmt)* [';'] NEWLINE
//! block         ::= NEWLINE INDENT statement+ DEDENT | simple_stmts
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

/// Keywords of the full language that scripts may not use
const UNSUPPORTED_STATEMENTS: &[&str] = &[
    "import", "from", "class", "with", "nonlocal", "finally", "async", "await", "yield",
];

impl Parser {
    /// Parse one statement; simple statements joined by `;` come back together
    pub(crate) fn parse_statement(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let loc = self.current_location();

        if self.match_token(&TokenKind::If) {
            return Ok(vec![self.parse_if_statement(loc)?]);
        }

        if self.match_token(&TokenKind::While) {
            return Ok(vec![self.parse_while_statement(loc)?]);
        }

        if self.match_token(&TokenKind::For) {
            return Ok(vec![self.parse_for_statement(loc)?]);
        }

        if self.match_token(&TokenKind::Def) {
            return Ok(vec![self.parse_function_def(loc)?]);
        }

        if self.match_token(&TokenKind::Try) {
            return Ok(vec![self.parse_try_statement(loc)?]);
        }

        if self.check(&TokenKind::Indent) {
            return Err(self.error_here("unexpected indent"));
        }

        if self.check(&TokenKind::Elif)
            || self.check(&TokenKind::Else)
            || self.check(&TokenKind::Except)
        {
            return Err(self.error_here(format!("invalid syntax: unexpected {}", self.peek())));
        }

        if let TokenKind::Name(name) = &self.peek().kind {
            if UNSUPPORTED_STATEMENTS.contains(&name.as_str()) {
                return Err(self.error_here(format!("'{}' is not supported", name)));
            }
        }

        self.parse_simple_statements()
    }

    /// Parse `simple_stmt (';' simple_stmt)* NEWLINE`
    pub(crate) fn parse_simple_statements(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut statements = vec![self.parse_simple_statement()?];

        while self.match_token(&TokenKind::Semicolon) {
            if self.check(&TokenKind::Newline) || self.is_at_end() {
                break;
            }
            let mut stmt = self.parse_simple_statement()?;
            stmt.continues_line = true;
            statements.push(stmt);
        }

        if !self.is_at_end() {
            self.expect_token(&TokenKind::Newline, "expected end of line")?;
        }

        Ok(statements)
    }

    /// Parse the suite after a compound statement header's ':'
    pub(crate) fn parse_block(&mut self, ctx: &str) -> Result<Vec<Stmt>, ParseError> {
        if !self.match_token(&TokenKind::Newline) {
            return self.parse_simple_statements();
        }

        if !self.match_token(&TokenKind::Indent) {
            return Err(self.error_here(format!("expected an indented block after {}", ctx)));
        }

        let mut statements = Vec::new();
        while !self.check(&TokenKind::Dedent) && !self.is_at_end() {
            if self.match_token(&TokenKind::Newline) {
                continue;
            }
            statements.extend(self.parse_statement()?);
        }
        self.match_token(&TokenKind::Dedent);

        Ok(statements)
    }

    fn at_statement_end(&self) -> bool {
        self.check(&TokenKind::Newline) || self.check(&TokenKind::Semicolon) || self.is_at_end()
    }

    /// Parse a single simple statement
    fn parse_simple_statement(&mut self) -> Result<Stmt, ParseError> {
        let loc = self.current_location();

        if self.match_token(&TokenKind::Pass) {
            return Ok(Stmt::new(StmtKind::Pass, loc));
        }

        if self.match_token(&TokenKind::Break) {
            if self.loop_depth == 0 {
                return Err(ParseError {
                    message: "'break' outside loop".to_string(),
                    location: loc,
                });
            }
            return Ok(Stmt::new(StmtKind::Break, loc));
        }

        if self.match_token(&TokenKind::Continue) {
            if self.loop_depth == 0 {
                return Err(ParseError {
                    message: "'continue' not properly in loop".to_string(),
                    location: loc,
                });
            }
            return Ok(Stmt::new(StmtKind::Continue, loc));
        }

        if self.match_token(&TokenKind::Return) {
            if !self.in_function {
                return Err(ParseError {
                    message: "'return' outside function".to_string(),
                    location: loc,
                });
            }
            let value = if self.at_statement_end() {
                None
            } else {
                Some(self.parse_expression_list()?)
            };
            return Ok(Stmt::new(StmtKind::Return(value), loc));
        }

        if self.match_token(&TokenKind::Global) {
            let mut names = vec![self.expect_identifier()?];
            while self.match_token(&TokenKind::Comma) {
                names.push(self.expect_identifier()?);
            }
            return Ok(Stmt::new(StmtKind::Global(names), loc));
        }

        if self.match_token(&TokenKind::Del) {
            let targets = match self.parse_expression_list()? {
                Expr::Tuple(items, _) => items,
                single => vec![single],
            };
            for target in &targets {
                if !matches!(target, Expr::Name(..) | Expr::Subscript { .. }) {
                    return Err(ParseError {
                        message: "cannot delete expression".to_string(),
                        location: target.location(),
                    });
                }
            }
            return Ok(Stmt::new(StmtKind::Del(targets), loc));
        }

        if self.match_token(&TokenKind::Assert) {
            let test = self.parse_expression()?;
            let message = if self.match_token(&TokenKind::Comma) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            return Ok(Stmt::new(StmtKind::Assert { test, message }, loc));
        }

        if self.match_token(&TokenKind::Raise) {
            let exception = if self.at_statement_end() {
                None
            } else {
                Some(self.parse_expression()?)
            };
            return Ok(Stmt::new(StmtKind::Raise(exception), loc));
        }

        self.parse_expression_statement(loc)
    }

    /// Expression statement, assignment or augmented assignment
    fn parse_expression_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let first = self.parse_expression_list()?;

        if let Some(op) = self.match_augmented_operator() {
            if !matches!(first, Expr::Name(..) | Expr::Subscript { .. }) {
                return Err(ParseError {
                    message: "illegal expression for augmented assignment".to_string(),
                    location: first.location(),
                });
            }
            let value = self.parse_expression_list()?;
            return Ok(Stmt::new(
                StmtKind::AugAssign {
                    target: first,
                    op,
                    value,
                },
                loc,
            ));
        }

        if !self.check(&TokenKind::Eq) {
            return Ok(Stmt::new(StmtKind::Expr(first), loc));
        }

        let mut exprs = vec![first];
        while self.match_token(&TokenKind::Eq) {
            exprs.push(self.parse_expression_list()?);
        }
        let value = exprs.pop().ok_or_else(|| self.error_here("expected a value"))?;

        for target in &exprs {
            if !target.is_assignable() {
                let what = match target {
                    Expr::NoneLiteral(_)
                    | Expr::BoolLiteral(..)
                    | Expr::IntLiteral(..)
                    | Expr::FloatLiteral(..)
                    | Expr::StringLiteral(..) => "literal",
                    Expr::Call { .. } => "function call",
                    Expr::Attribute { .. } => "attribute",
                    _ => "expression",
                };
                return Err(ParseError {
                    message: format!("cannot assign to {}", what),
                    location: target.location(),
                });
            }
        }

        Ok(Stmt::new(
            StmtKind::Assign {
                targets: exprs,
                value,
            },
            loc,
        ))
    }

    fn match_augmented_operator(&mut self) -> Option<BinOp> {
        let op = match self.peek().kind {
            TokenKind::PlusEq => BinOp::Add,
            TokenKind::MinusEq => BinOp::Sub,
            TokenKind::StarEq => BinOp::Mul,
            TokenKind::SlashEq => BinOp::Div,
            TokenKind::DoubleSlashEq => BinOp::FloorDiv,
            TokenKind::PercentEq => BinOp::Mod,
            TokenKind::DoubleStarEq => BinOp::Pow,
            _ => return None,
        };
        self.advance();
        Some(op)
    }

    fn parse_if_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let condition = self.parse_expression()?;
        self.expect_colon("after 'if' condition")?;
        let body = self.parse_block("'if' statement")?;

        let mut branches = vec![Branch {
            condition,
            body,
            location: loc,
        }];

        loop {
            let elif_loc = self.current_location();
            if !self.match_token(&TokenKind::Elif) {
                break;
            }
            let condition = self.parse_expression()?;
            self.expect_colon("after 'elif' condition")?;
            let body = self.parse_block("'elif' statement")?;
            branches.push(Branch {
                condition,
                body,
                location: elif_loc,
            });
        }

        let orelse = if self.match_token(&TokenKind::Else) {
            self.expect_colon("after 'else'")?;
            Some(self.parse_block("'else' statement")?)
        } else {
            None
        };

        Ok(Stmt::new(StmtKind::If { branches, orelse }, loc))
    }

    fn parse_loop_body(&mut self, ctx: &str) -> Result<Vec<Stmt>, ParseError> {
        self.loop_depth += 1;
        let body = self.parse_block(ctx);
        self.loop_depth -= 1;
        body
    }

    fn parse_while_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let condition = self.parse_expression()?;
        self.expect_colon("after 'while' condition")?;
        let body = self.parse_loop_body("'while' statement")?;

        Ok(Stmt::new(StmtKind::While { condition, body }, loc))
    }

    fn parse_for_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        let target = self.parse_target_list()?;
        if !target.is_assignable() {
            return Err(ParseError {
                message: "cannot assign to expression in 'for' loop".to_string(),
                location: target.location(),
            });
        }
        self.expect_token(&TokenKind::In, "expected 'in' in 'for' statement")?;
        let iter = self.parse_expression_list()?;
        self.expect_colon("after 'for' clause")?;
        let body = self.parse_loop_body("'for' statement")?;

        Ok(Stmt::new(StmtKind::For { target, iter, body }, loc))
    }

    fn parse_try_statement(&mut self, loc: SourceLocation) -> Result<Stmt, ParseError> {
        self.expect_colon("after 'try'")?;
        let body = self.parse_block("'try' statement")?;

        let mut handlers = Vec::new();
        loop {
            let handler_loc = self.current_location();
            if !self.match_token(&TokenKind::Except) {
                break;
            }
            let kind = if self.check(&TokenKind::Colon) {
                None
            } else {
                Some(self.expect_identifier()?)
            };
            let binding = if kind.is_some() && self.match_token(&TokenKind::As) {
                Some(self.expect_identifier()?)
            } else {
                None
            };
            self.expect_colon("after 'except' clause")?;
            let body = self.parse_block("'except' statement")?;
            handlers.push(ExceptHandler {
                kind,
                binding,
                body,
                location: handler_loc,
            });
        }

        if handlers.is_empty() {
            return Err(self.error_here("expected 'except' block"));
        }

        Ok(Stmt::new(StmtKind::Try { body, handlers }, loc))
    }
}
