//! Expression parsing implementation
//!
//! One method per precedence level, lowest binding first:
//!
//! ```text
//! conditional  ::= or_expr ['if' or_expr 'else' conditional]
//! or_expr      ::= and_expr ('or' and_expr)*
//! and_expr     ::= not_expr ('and' not_expr)*
//! not_expr     ::= 'not' not_expr | comparison
//! comparison   ::= bit_or (comp_op bit_or)*
//! bit_or       ::= bit_xor ('|' bit_xor)*      ... down through ^ & << >> + - * / // %
//! factor       ::= ('-' | '+' | '~') factor | power
//! power        ::= postfix ['**' factor]
//! postfix      ::= atom ('(' args ')' | '[' subscript ']' | '.' NAME)*
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse expression (top-level entry point, no bare tuples)
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_conditional()
    }

    /// Parse `expr, expr, ...`; more than one element (or a trailing comma) makes a tuple
    pub(crate) fn parse_expression_list(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        let first = self.parse_expression()?;

        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if !self.starts_expression() {
                break;
            }
            items.push(self.parse_expression()?);
        }

        Ok(Expr::Tuple(items, loc))
    }

    /// Parse the target of a `for` loop; stops before `in`
    pub(crate) fn parse_target_list(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        let first = self.parse_bitwise_or()?;

        if !self.check(&TokenKind::Comma) {
            return Ok(first);
        }

        let mut items = vec![first];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::In) {
                break;
            }
            items.push(self.parse_bitwise_or()?);
        }

        Ok(Expr::Tuple(items, loc))
    }

    /// Whether the next token can begin an expression
    fn starts_expression(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Int(_)
                | TokenKind::Float(_)
                | TokenKind::Str(_)
                | TokenKind::Name(_)
                | TokenKind::True
                | TokenKind::False
                | TokenKind::None
                | TokenKind::Not
                | TokenKind::Minus
                | TokenKind::Plus
                | TokenKind::Tilde
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
        )
    }

    /// Parse `a if condition else b`
    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_or()?;

        let loc = self.current_location();
        if !self.match_token(&TokenKind::If) {
            return Ok(expr);
        }

        let condition = self.parse_or()?;
        self.expect_token(&TokenKind::Else, "expected 'else' in conditional expression")?;
        let else_expr = self.parse_conditional()?;

        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then_expr: Box::new(expr),
            else_expr: Box::new(else_expr),
            location: loc,
        })
    }

    /// Parse logical OR
    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;

        loop {
            let loc = self.current_location();
            if !self.match_token(&TokenKind::Or) {
                break;
            }
            let right = self.parse_and()?;
            left = Expr::BoolOp {
                op: BoolOp::Or,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse logical AND
    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;

        loop {
            let loc = self.current_location();
            if !self.match_token(&TokenKind::And) {
                break;
            }
            let right = self.parse_not()?;
            left = Expr::BoolOp {
                op: BoolOp::And,
                left: Box::new(left),
                right: Box::new(right),
                location: loc,
            };
        }

        Ok(left)
    }

    /// Parse logical NOT
    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        if self.match_token(&TokenKind::Not) {
            let operand = self.parse_not()?;
            return Ok(Expr::UnaryOp {
                op: UnOp::Not,
                operand: Box::new(operand),
                location: loc,
            });
        }

        self.parse_comparison()
    }

    /// Parse a (possibly chained) comparison
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        let left = self.parse_bitwise_or()?;
        let mut comparisons = Vec::new();

        loop {
            let kind = self.peek().kind.clone();
            let op = match kind {
                TokenKind::EqEq => CmpOp::Eq,
                TokenKind::NotEq => CmpOp::Ne,
                TokenKind::Lt => CmpOp::Lt,
                TokenKind::Le => CmpOp::Le,
                TokenKind::Gt => CmpOp::Gt,
                TokenKind::Ge => CmpOp::Ge,
                TokenKind::In => CmpOp::In,
                TokenKind::Is => {
                    if self
                        .peek_ahead(1)
                        .is_some_and(|t| matches!(t.kind, TokenKind::Not))
                    {
                        self.advance();
                        CmpOp::IsNot
                    } else {
                        CmpOp::Is
                    }
                }
                TokenKind::Not
                    if self
                        .peek_ahead(1)
                        .is_some_and(|t| matches!(t.kind, TokenKind::In)) =>
                {
                    self.advance();
                    CmpOp::NotIn
                }
                _ => break,
            };
            self.advance();
            comparisons.push((op, self.parse_bitwise_or()?));
        }

        if comparisons.is_empty() {
            return Ok(left);
        }

        Ok(Expr::Compare {
            left: Box::new(left),
            comparisons,
            location: loc,
        })
    }

    /// Parse a left-associative binary level driven by `table`
    fn parse_binary_level(
        &mut self,
        table: &[(TokenKind, BinOp)],
        next: fn(&mut Self) -> Result<Expr, ParseError>,
    ) -> Result<Expr, ParseError> {
        let mut left = next(self)?;

        'outer: loop {
            let loc = self.current_location();
            for (kind, op) in table {
                if self.match_token(kind) {
                    let right = next(self)?;
                    left = Expr::BinaryOp {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                        location: loc,
                    };
                    continue 'outer;
                }
            }
            break;
        }

        Ok(left)
    }

    /// Parse bitwise OR (|)
    pub(crate) fn parse_bitwise_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&[(TokenKind::Pipe, BinOp::BitOr)], Self::parse_bitwise_xor)
    }

    /// Parse bitwise XOR (^)
    fn parse_bitwise_xor(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&[(TokenKind::Caret, BinOp::BitXor)], Self::parse_bitwise_and)
    }

    /// Parse bitwise AND (&)
    fn parse_bitwise_and(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(&[(TokenKind::Amp, BinOp::BitAnd)], Self::parse_shift)
    }

    /// Parse bitwise shift (<< >>)
    fn parse_shift(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[(TokenKind::LtLt, BinOp::Shl), (TokenKind::GtGt, BinOp::Shr)],
            Self::parse_additive,
        )
    }

    /// Parse additive (+ -)
    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
            Self::parse_multiplicative,
        )
    }

    /// Parse multiplicative (* / // %)
    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(
            &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::DoubleSlash, BinOp::FloorDiv),
                (TokenKind::Percent, BinOp::Mod),
            ],
            Self::parse_factor,
        )
    }

    /// Parse unary (- + ~)
    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();
        let op = match self.peek().kind {
            TokenKind::Minus => UnOp::Neg,
            TokenKind::Plus => UnOp::Pos,
            TokenKind::Tilde => UnOp::Invert,
            _ => return self.parse_power(),
        };
        self.advance();
        let operand = self.parse_factor()?;

        // Fold negative literals so `-5` reprs and compares like a constant
        if let (UnOp::Neg, Expr::IntLiteral(n, _)) = (op, &operand) {
            if let Some(negated) = n.checked_neg() {
                return Ok(Expr::IntLiteral(negated, loc));
            }
        }

        Ok(Expr::UnaryOp {
            op,
            operand: Box::new(operand),
            location: loc,
        })
    }

    /// Parse exponentiation (right-associative, binds tighter than unary on its left)
    fn parse_power(&mut self) -> Result<Expr, ParseError> {
        let base = self.parse_postfix()?;

        let loc = self.current_location();
        if self.match_token(&TokenKind::DoubleStar) {
            let exponent = self.parse_factor()?;
            return Ok(Expr::BinaryOp {
                op: BinOp::Pow,
                left: Box::new(base),
                right: Box::new(exponent),
                location: loc,
            });
        }

        Ok(base)
    }

    /// Parse calls, subscripts and attribute access
    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_atom()?;

        loop {
            let loc = self.current_location();

            if self.match_token(&TokenKind::LParen) {
                let args = self.parse_call_arguments()?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                    location: loc,
                };
            } else if self.match_token(&TokenKind::LBracket) {
                let index = self.parse_subscript()?;
                self.expect_token(&TokenKind::RBracket, "expected ']' after subscript")?;
                expr = Expr::Subscript {
                    object: Box::new(expr),
                    index: Box::new(index),
                    location: loc,
                };
            } else if self.match_token(&TokenKind::Dot) {
                let name = self.expect_identifier()?;
                expr = Expr::Attribute {
                    object: Box::new(expr),
                    name,
                    location: loc,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parse call arguments; `(` is already consumed
    fn parse_call_arguments(&mut self) -> Result<Vec<Argument>, ParseError> {
        let mut args = Vec::new();
        let mut seen_keyword = false;

        while !self.check(&TokenKind::RParen) {
            let is_keyword = matches!(self.peek().kind, TokenKind::Name(_))
                && self
                    .peek_ahead(1)
                    .is_some_and(|t| matches!(t.kind, TokenKind::Eq));

            if is_keyword {
                let name = self.expect_identifier()?;
                self.advance(); // '='
                if args
                    .iter()
                    .any(|a| matches!(a, Argument::Keyword(existing, _) if *existing == name))
                {
                    return Err(self.error_here(format!("keyword argument repeated: {}", name)));
                }
                args.push(Argument::Keyword(name, self.parse_expression()?));
                seen_keyword = true;
            } else {
                if seen_keyword {
                    return Err(self.error_here("positional argument follows keyword argument"));
                }
                args.push(Argument::Positional(self.parse_expression()?));
            }

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_rparen("after call arguments")?;
        Ok(args)
    }

    /// Parse an index or a `lower:upper:step` slice
    fn parse_subscript(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        let lower = if self.check(&TokenKind::Colon) {
            None
        } else {
            let index = self.parse_expression_list()?;
            if !self.check(&TokenKind::Colon) {
                return Ok(index);
            }
            Some(Box::new(index))
        };

        self.advance(); // ':'

        let upper = if self.check(&TokenKind::Colon) || self.check(&TokenKind::RBracket) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        let step = if self.match_token(&TokenKind::Colon) && !self.check(&TokenKind::RBracket) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        Ok(Expr::Slice {
            lower,
            upper,
            step,
            location: loc,
        })
    }

    /// Parse literals, names and bracketed displays
    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let loc = self.current_location();

        match &self.peek().kind {
            TokenKind::Int(n) => {
                let n = *n;
                self.advance();
                Ok(Expr::IntLiteral(n, loc))
            }
            TokenKind::Float(x) => {
                let x = *x;
                self.advance();
                Ok(Expr::FloatLiteral(x, loc))
            }
            TokenKind::Str(_) => {
                // Adjacent literals concatenate
                let mut text = String::new();
                while let TokenKind::Str(s) = &self.peek().kind {
                    text.push_str(s);
                    self.advance();
                }
                Ok(Expr::StringLiteral(text, loc))
            }
            TokenKind::Name(name) => {
                if matches!(name.as_str(), "lambda" | "yield" | "await") {
                    return Err(self.error_here(format!("'{}' is not supported", name)));
                }
                let name = name.clone();
                self.advance();
                Ok(Expr::Name(name, loc))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::BoolLiteral(true, loc))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::BoolLiteral(false, loc))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expr::NoneLiteral(loc))
            }
            TokenKind::LParen => {
                self.advance();
                self.parse_parenthesized(loc)
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.parse_comma_separated(&TokenKind::RBracket)?;
                self.expect_token(&TokenKind::RBracket, "expected ']' after list items")?;
                Ok(Expr::List(items, loc))
            }
            TokenKind::LBrace => {
                self.advance();
                self.parse_dict_display(loc)
            }
            _ => Err(self.error_here(format!("expected an expression, found {}", self.peek()))),
        }
    }

    /// `( ... )`: grouping, empty tuple, or tuple
    fn parse_parenthesized(&mut self, loc: SourceLocation) -> Result<Expr, ParseError> {
        if self.match_token(&TokenKind::RParen) {
            return Ok(Expr::Tuple(Vec::new(), loc));
        }

        let first = self.parse_expression()?;
        if self.match_token(&TokenKind::RParen) {
            return Ok(first);
        }

        self.expect_token(&TokenKind::Comma, "expected ',' or ')'")?;
        let mut items = vec![first];
        items.extend(self.parse_comma_separated(&TokenKind::RParen)?);
        self.expect_rparen("after tuple items")?;

        Ok(Expr::Tuple(items, loc))
    }

    /// Items up to (not including) `close`, allowing a trailing comma
    fn parse_comma_separated(&mut self, close: &TokenKind) -> Result<Vec<Expr>, ParseError> {
        let mut items = Vec::new();
        while !self.check(close) {
            items.push(self.parse_expression()?);
            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }
        Ok(items)
    }

    /// `{ key: value, ... }`
    fn parse_dict_display(&mut self, loc: SourceLocation) -> Result<Expr, ParseError> {
        let mut entries = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            let key = self.parse_expression()?;
            if !self.check(&TokenKind::Colon) {
                return Err(self.error_here("set displays are not supported"));
            }
            self.advance();
            let value = self.parse_expression()?;
            entries.push((key, value));

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_token(&TokenKind::RBrace, "expected '}' after dict entries")?;
        Ok(Expr::Dict(entries, loc))
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn expr(source: &str) -> Expr {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        match &program.body[0].kind {
            StmtKind::Expr(e) => e.clone(),
            StmtKind::Assign { value, .. } => value.clone(),
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        match expr("1 + 2 * 3\n") {
            Expr::BinaryOp {
                op: BinOp::Add,
                right,
                ..
            } => assert!(matches!(*right, Expr::BinaryOp { op: BinOp::Mul, .. })),
            other => panic!("Expected addition, got {:?}", other),
        }
    }

    #[test]
    fn test_power_binds_tighter_than_unary_minus() {
        match expr("-2 ** 2\n") {
            Expr::UnaryOp { op: UnOp::Neg, operand, .. } => {
                assert!(matches!(*operand, Expr::BinaryOp { op: BinOp::Pow, .. }))
            }
            other => panic!("Expected negation, got {:?}", other),
        }
    }

    #[test]
    fn test_chained_comparison() {
        match expr("a < b <= c\n") {
            Expr::Compare { comparisons, .. } => {
                let ops: Vec<CmpOp> = comparisons.iter().map(|(op, _)| *op).collect();
                assert_eq!(ops, vec![CmpOp::Lt, CmpOp::Le]);
            }
            other => panic!("Expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_not_in_and_is_not() {
        match expr("a not in b\n") {
            Expr::Compare { comparisons, .. } => assert_eq!(comparisons[0].0, CmpOp::NotIn),
            other => panic!("Expected comparison, got {:?}", other),
        }
        match expr("a is not None\n") {
            Expr::Compare { comparisons, .. } => assert_eq!(comparisons[0].0, CmpOp::IsNot),
            other => panic!("Expected comparison, got {:?}", other),
        }
    }

    #[test]
    fn test_tuples_and_displays() {
        assert!(matches!(expr("x = 1, 2\n"), Expr::Tuple(ref items, _) if items.len() == 2));
        assert!(matches!(expr("x = (1,)\n"), Expr::Tuple(ref items, _) if items.len() == 1));
        assert!(matches!(expr("x = ()\n"), Expr::Tuple(ref items, _) if items.is_empty()));
        assert!(matches!(expr("x = (1)\n"), Expr::IntLiteral(1, _)));
        assert!(matches!(expr("x = [1, 2,]\n"), Expr::List(ref items, _) if items.len() == 2));
        assert!(matches!(expr("x = {'a': 1}\n"), Expr::Dict(ref entries, _) if entries.len() == 1));
    }

    #[test]
    fn test_slices() {
        match expr("xs[1:]\n") {
            Expr::Subscript { index, .. } => match *index {
                Expr::Slice {
                    lower, upper, step, ..
                } => {
                    assert!(lower.is_some());
                    assert!(upper.is_none());
                    assert!(step.is_none());
                }
                other => panic!("Expected slice, got {:?}", other),
            },
            other => panic!("Expected subscript, got {:?}", other),
        }
        assert!(matches!(
            expr("xs[::-1]\n"),
            Expr::Subscript { ref index, .. } if matches!(**index, Expr::Slice { ref step, .. } if step.is_some())
        ));
    }

    #[test]
    fn test_keyword_arguments() {
        match expr("print(a, b, sep='-')\n") {
            Expr::Call { args, .. } => {
                assert!(matches!(args[2], Argument::Keyword(ref name, _) if name == "sep"));
            }
            other => panic!("Expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_conditional_expression() {
        assert!(matches!(expr("x = 1 if c else 2\n"), Expr::Conditional { .. }));
    }

    #[test]
    fn test_adjacent_strings_concatenate() {
        assert!(matches!(expr("x = 'ab' 'cd'\n"), Expr::StringLiteral(ref s, _) if s == "abcd"));
    }
}
