use super::{Parser, Restrictions, Result};
use crate::{
    ast::{BinaryOperator, Expr, ExprKind, LambdaParam, Type, UnaryOperator},
    error::{ErrorKind, SyntaxError},
    token::{Keyword, Location, Operator, TokenKind},
};

impl Parser<'_> {
    pub(super) fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_binary(0)
    }

    /// Precedence climbing: parses an operand, then every binary operator
    /// binding tighter than `min_precedence`. An operator must be on the same
    /// line as its left operand.
    pub(super) fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr> {
        let mut lhs = self.parse_unary()?;
        while self.on_same_line() {
            let Some((op, precedence)) = self.binary_operator() else {
                break;
            };
            if precedence <= min_precedence {
                break;
            }
            self.advance();
            let rhs = if op.is_assignment() {
                // Right associative.
                self.parse_binary(precedence - 1)?
            } else {
                self.parse_binary(precedence)?
            };
            if op.is_assignment()
                && !matches!(
                    lhs.kind,
                    ExprKind::Identifier(_)
                        | ExprKind::MemberSelector { .. }
                        | ExprKind::ArraySubscript { .. }
                )
            {
                return Err(SyntaxError::new(
                    ErrorKind::InvalidAssignmentTarget,
                    lhs.location,
                ));
            }
            let location = lhs.location.clone();
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                location,
            );
        }
        Ok(lhs)
    }

    /// The binary operator at the cursor and its precedence. Higher binds
    /// tighter.
    fn binary_operator(&self) -> Option<(BinaryOperator, u8)> {
        use BinaryOperator as B;
        let TokenKind::Operator(op) = self.peek().kind else {
            return None;
        };
        let r = self.restrictions;
        let entry = match op {
            Operator::Assign if !r.no_assign => (B::Assign, 1),
            Operator::PlusAssign if !r.no_assign => (B::AddAssign, 1),
            Operator::MinusAssign if !r.no_assign => (B::SubAssign, 1),
            Operator::StarAssign if !r.no_assign => (B::MulAssign, 1),
            Operator::SlashAssign if !r.no_assign => (B::DivAssign, 1),
            Operator::PercentAssign if !r.no_assign => (B::RemAssign, 1),
            Operator::Range if !r.no_range => (B::Range, 2),
            Operator::Ellipsis if !r.no_range => (B::RangeInclusive, 2),
            Operator::OrOr => (B::Or, 3),
            Operator::AndAnd => (B::And, 4),
            Operator::Pipe if !r.no_pipe => (B::BitOr, 5),
            Operator::Caret => (B::BitXor, 6),
            Operator::Ampersand => (B::BitAnd, 7),
            Operator::Equal => (B::Eq, 8),
            Operator::NotEqual => (B::NotEq, 8),
            Operator::Less => (B::Less, 9),
            Operator::LessEqual => (B::LessEq, 9),
            Operator::Greater => (B::Greater, 9),
            Operator::GreaterEqual => (B::GreaterEq, 9),
            Operator::ShiftLeft => (B::Shl, 10),
            Operator::ShiftRight => (B::Shr, 10),
            Operator::Plus => (B::Add, 11),
            Operator::Minus => (B::Sub, 11),
            Operator::Star => (B::Mul, 12),
            Operator::Slash => (B::Div, 12),
            Operator::Percent => (B::Rem, 12),
            _ => return None,
        };
        Some(entry)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek().kind {
            TokenKind::Operator(Operator::Minus) => UnaryOperator::Neg,
            TokenKind::Operator(Operator::Bang) => UnaryOperator::Not,
            TokenKind::Operator(Operator::Tilde) => UnaryOperator::BitNot,
            TokenKind::Operator(Operator::Increment) => UnaryOperator::PreIncrement,
            TokenKind::Operator(Operator::Decrement) => UnaryOperator::PreDecrement,
            _ => return self.parse_postfix(),
        };
        let token = self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::new(
            ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            token.location,
        ))
    }

    /// A primary followed by member accesses, calls and subscripts, then at
    /// most one `++` or `--`.
    fn parse_postfix(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let location = expr.location.clone();
            if self.take(Operator::Dot) {
                let (member, _) = self.parse_identifier()?;
                expr = if self.is(Operator::LeftParen) && self.on_same_line() {
                    let args = self.parse_call_arguments()?;
                    ExprKind::MethodCall {
                        receiver: Some(Box::new(expr)),
                        name: member,
                        args,
                    }
                } else {
                    ExprKind::MemberSelector {
                        object: Box::new(expr),
                        member,
                    }
                }
                .at(location);
            } else if !self.on_same_line() {
                break;
            } else if let (Operator::LeftParen, ExprKind::Identifier(name)) =
                (self.current_operator(), &expr.kind)
            {
                let name = *name;
                let args = self.parse_call_arguments()?;
                expr = ExprKind::MethodCall {
                    receiver: None,
                    name,
                    args,
                }
                .at(location);
            } else if self.is(Operator::LeftBracket) {
                self.advance();
                let index = self.with_restrictions(
                    Restrictions {
                        no_range: true,
                        ..Restrictions::default()
                    },
                    Parser::parse_expression,
                )?;
                self.consume(Operator::RightBracket)?;
                expr = ExprKind::ArraySubscript {
                    array: Box::new(expr),
                    index: Box::new(index),
                }
                .at(location);
            } else {
                break;
            }
            self.parse_trailing_lambda(&mut expr)?;
        }

        if self.on_same_line() {
            let op = match self.current_operator() {
                Operator::Increment => UnaryOperator::PostIncrement,
                Operator::Decrement => UnaryOperator::PostDecrement,
                _ => return Ok(expr),
            };
            self.advance();
            let location = expr.location.clone();
            expr = ExprKind::Unary {
                op,
                operand: Box::new(expr),
            }
            .at(location);
        }
        Ok(expr)
    }

    /// `call(args) |x| { ... }` passes the lambda as the last argument.
    fn parse_trailing_lambda(&mut self, call: &mut Expr) -> Result<()> {
        let ExprKind::MethodCall { args, .. } = &mut call.kind else {
            return Ok(());
        };
        if self.restrictions.no_pipe
            || !self.on_same_line()
            || !self.is_any(&[Operator::Pipe, Operator::OrOr])
        {
            return Ok(());
        }
        let head = self.lookahead(|p| {
            p.parse_lambda_params()?;
            p.consume(Operator::LeftBrace)
        });
        if head.is_some() {
            args.push(self.parse_lambda()?);
        }
        Ok(())
    }

    /// The operator at the cursor, or [`Operator::Placeholder`] for any
    /// other token.
    fn current_operator(&self) -> Operator {
        match self.peek().kind {
            TokenKind::Operator(op) => op,
            _ => Operator::Placeholder,
        }
    }

    /// `'(' (expr (',' expr)*)? ')'`. Inside patterns the arguments are
    /// patterns themselves.
    pub(super) fn parse_call_arguments(&mut self) -> Result<Vec<Expr>> {
        self.consume(Operator::LeftParen)?;
        let args = if self.restrictions.in_pattern {
            self.parse_list(&[Operator::RightParen], Parser::parse_pattern)?
        } else {
            self.with_restrictions(Restrictions::default(), |p| {
                p.parse_list(&[Operator::RightParen], Parser::parse_expression)
            })?
        };
        self.consume(Operator::RightParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.peek().clone();
        let location = token.location.clone();
        let kind = match token.kind {
            TokenKind::Identifier(text) => {
                self.advance();
                ExprKind::Identifier(self.ctx.tree.intern(&text))
            }
            TokenKind::Integer(text) => {
                self.advance();
                ExprKind::Integer(text)
            }
            TokenKind::Float(text) => {
                self.advance();
                ExprKind::Float(text)
            }
            TokenKind::String(text) => {
                self.advance();
                ExprKind::String(text)
            }
            TokenKind::Char(c) => {
                self.advance();
                ExprKind::Char(c)
            }
            TokenKind::Keyword(keyword @ (Keyword::True | Keyword::False)) => {
                self.advance();
                ExprKind::Bool(keyword == Keyword::True)
            }
            TokenKind::Keyword(Keyword::This) => {
                self.advance();
                ExprKind::This
            }
            TokenKind::Operator(Operator::Placeholder) => {
                self.advance();
                if self.restrictions.in_pattern {
                    ExprKind::Wildcard
                } else {
                    ExprKind::Placeholder
                }
            }
            TokenKind::Keyword(Keyword::Yield) => {
                self.advance();
                let ends = self.at_statement_end()
                    || self.is_any(&[Operator::RightParen, Operator::Comma, Operator::RightBracket]);
                let value = if ends {
                    None
                } else {
                    Some(Box::new(self.parse_expression()?))
                };
                ExprKind::Yield(value)
            }
            TokenKind::Operator(Operator::LeftParen) => return self.parse_parenthesized(),
            TokenKind::Operator(Operator::LeftBracket) => {
                self.advance();
                let elements = self.with_restrictions(
                    Restrictions {
                        no_range: true,
                        ..Restrictions::default()
                    },
                    |p| p.parse_list(&[Operator::RightBracket], Parser::parse_expression),
                )?;
                self.consume(Operator::RightBracket)?;
                ExprKind::ArrayLiteral(elements)
            }
            TokenKind::Operator(Operator::Pipe | Operator::OrOr) => return self.parse_lambda(),
            TokenKind::Keyword(Keyword::New) => {
                self.advance();
                return self.parse_allocation(location);
            }
            TokenKind::Keyword(Keyword::Match) => return self.parse_match(),
            TokenKind::Keyword(Keyword::Fun) => {
                self.advance();
                let args = self.parse_arguments()?;
                let return_type = self.parse_type()?;
                let body = self.with_restrictions(Restrictions::default(), |p| {
                    p.parse_braced_block()
                })?;
                ExprKind::AnonymousFunction {
                    args,
                    return_type,
                    body,
                }
            }
            _ => return Err(self.unexpected("expression")),
        };
        Ok(Expr::new(kind, location))
    }

    /// `(Type) operand` or `(expr)`. The cast is tried first.
    fn parse_parenthesized(&mut self) -> Result<Expr> {
        let location = self.peek().location.clone();
        if self.lookahead(Parser::parse_cast_head).is_some() {
            let ty = self.parse_cast_head()?;
            let expr = self.parse_unary()?;
            return Ok(ExprKind::TypeCast {
                ty,
                expr: Box::new(expr),
            }
            .at(location));
        }
        self.consume(Operator::LeftParen)?;
        let expr = self.with_restrictions(Restrictions::default(), Parser::parse_expression)?;
        self.consume(Operator::RightParen)?;
        Ok(expr)
    }

    /// `'(' Type ')'`, when followed on the same line by something that can
    /// start an operand. Prefix `-`, `++`, `--` and `[` only follow types
    /// that can't be read as an expression.
    fn parse_cast_head(&mut self) -> Result<Type> {
        self.consume(Operator::LeftParen)?;
        let ty = self.parse_type()?;
        self.consume(Operator::RightParen)?;
        let starts_operand = match self.peek().kind {
            TokenKind::Identifier(_)
            | TokenKind::Integer(_)
            | TokenKind::Float(_)
            | TokenKind::String(_)
            | TokenKind::Char(_) => true,
            TokenKind::Keyword(keyword) => matches!(
                keyword,
                Keyword::This
                    | Keyword::True
                    | Keyword::False
                    | Keyword::New
                    | Keyword::Match
                    | Keyword::Fun
            ),
            TokenKind::Operator(
                Operator::LeftParen | Operator::Bang | Operator::Tilde | Operator::Placeholder,
            ) => true,
            // `(a) - b` is a subtraction unless `a` can only be a type.
            TokenKind::Operator(
                Operator::Minus
                | Operator::Increment
                | Operator::Decrement
                | Operator::LeftBracket,
            ) => ty.is_value_type() || !ty.arguments.is_empty() || ty.array_dimensions > 0,
            _ => false,
        };
        if !starts_operand || !self.on_same_line() {
            return Err(self.unexpected("operand of a cast"));
        }
        Ok(ty)
    }

    /// After `new`: `Type(args)` or `Type[length]`.
    fn parse_allocation(&mut self, location: Location) -> Result<Expr> {
        let ty = self.parse_type()?;
        if self.take(Operator::LeftBracket) {
            let length = self.with_restrictions(
                Restrictions {
                    no_range: true,
                    ..Restrictions::default()
                },
                Parser::parse_expression,
            )?;
            self.consume(Operator::RightBracket)?;
            return Ok(ExprKind::ArrayAllocation {
                element_type: ty,
                length: Box::new(length),
            }
            .at(location));
        }
        let args = self.with_restrictions(Restrictions::default(), Parser::parse_call_arguments)?;
        Ok(ExprKind::HeapAllocation { ty, args }.at(location))
    }

    /// `'|' (Type? name (',' Type? name)*)? '|' block` or `'||' block`
    fn parse_lambda(&mut self) -> Result<Expr> {
        let location = self.peek().location.clone();
        let params = self.parse_lambda_params()?;
        let body = self.with_restrictions(Restrictions::default(), Parser::parse_braced_block)?;
        Ok(ExprKind::Lambda { params, body }.at(location))
    }

    fn parse_lambda_params(&mut self) -> Result<Vec<LambdaParam>> {
        if self.take(Operator::OrOr) {
            return Ok(Vec::new());
        }
        self.consume(Operator::Pipe)?;
        let params = self.parse_list(&[Operator::Pipe], |p| {
            if p.lookahead(Parser::parse_typed_binding).is_some() {
                let (ty, name) = p.parse_typed_binding()?;
                return Ok(LambdaParam { name, ty: Some(ty) });
            }
            let (name, _) = p.parse_identifier()?;
            Ok(LambdaParam { name, ty: None })
        })?;
        self.consume(Operator::Pipe)?;
        Ok(params)
    }
}

impl ExprKind {
    pub(super) fn at(self, location: Location) -> Expr {
        Expr::new(self, location)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::ExprKind,
        context::Context,
        parser::parse_expression,
        util::test_utils::{tree_tests, TEST_FILE},
    };

    tree_tests!(
        use parser;

        fn test_precedence() {
            let expr = "1+2*3";
            let tree_ok = "
                binary Add
                  int 1
                  binary Mul
                    int 2
                    int 3
            ";
        }

        fn test_left_associativity() {
            let expr = "a - b - c";
            let tree_ok = "
                binary Sub
                  binary Sub
                    ident a
                    ident b
                  ident c
            ";
        }

        fn test_assignment_is_right_associative() {
            let expr = "a = b += c";
            let tree_ok = "
                binary Assign
                  ident a
                  binary AddAssign
                    ident b
                    ident c
            ";
        }

        fn test_invalid_assignment_target() {
            let expr = "f() = 1";
            let expected_errors = &["1:1: invalid assignment target"];
        }

        fn test_logical_and_bitwise_levels() {
            let expr = "a || b && c | d ^ e & f == g < h << i";
            let tree_ok = "
                binary Or
                  ident a
                  binary And
                    ident b
                    binary BitOr
                      ident c
                      binary BitXor
                        ident d
                        binary BitAnd
                          ident e
                          binary Eq
                            ident f
                            binary Less
                              ident g
                              binary Shl
                                ident h
                                ident i
            ";
        }

        fn test_member_chain_binds_before_addition() {
            let expr = "a.b.c + d.len()";
            let tree_ok = "
                binary Add
                  member c
                    member b
                      ident a
                  call len
                    receiver
                      ident d
            ";
        }

        fn test_calls_and_subscripts() {
            let expr = "f(x, 1)[i]++";
            let tree_ok = "
                unary PostIncrement
                  subscript
                    call f
                      arguments
                        ident x
                        int 1
                    ident i
            ";
        }

        fn test_prefix_operators() {
            let expr = "-!~x";
            let tree_ok = "
                unary Neg
                  unary Not
                    unary BitNot
                      ident x
            ";
        }

        fn test_cast() {
            let expr = "(float) x + 1";
            let tree_ok = "
                binary Add
                  cast float
                    ident x
                  int 1
            ";
        }

        fn test_generic_cast() {
            let expr = "((Box<int>) r).value";
            let tree_ok = "
                member value
                  cast Box<int>
                    ident r
            ";
        }

        fn test_cast_of_negated_operand() {
            let expr = "(int) -x + (float[]) [1.0]";
            let tree_ok = "
                binary Add
                  cast int
                    unary Neg
                      ident x
                  cast float[]
                    array
                      float 1.0
            ";
        }

        fn test_parenthesized_expression_is_not_a_cast() {
            let expr = "(a) - (b < c)";
            let tree_ok = "
                binary Sub
                  ident a
                  binary Less
                    ident b
                    ident c
            ";
        }

        fn test_allocations() {
            let expr = "new Pair<int, string>(1, \"one\")";
            let tree_ok = r#"
                new Pair<int, string>
                  int 1
                  string "one"
            "#;
        }

        fn test_array_literal() {
            let expr = "[1, 2.5, 'c', true, this, _]";
            let tree_ok = "
                array
                  int 1
                  float 2.5
                  char 'c'
                  bool true
                  this
                  placeholder
            ";
        }

        fn test_range_is_gated_in_brackets() {
            let expr = "[0..2]";
            let expected_errors = &["1:3: expected `,` or `]`, but got `..`"];
        }

        fn test_lambdas() {
            let expr = "each(xs) |int x, y| { print(x) }";
            let tree_ok = "
                call each
                  arguments
                    ident xs
                    lambda |int x, y|
                      call print
                        arguments
                          ident x
            ";
        }

        fn test_nested_trailing_lambdas() {
            let expr = "f() |a| { g() |b| { h() |c| { c } } }";
            let tree_ok = "
                call f
                  arguments
                    lambda |a|
                      call g
                        arguments
                          lambda |b|
                            call h
                              arguments
                                lambda |c|
                                  ident c
            ";
        }

        fn test_errors_inside_trailing_lambda_point_into_the_body() {
            let statements = "each(xs) |x| {\n  let = 1\n}";
            let expected_errors = &["2:7: expected expression, but got `=`"];
        }

        fn test_lambda_head_vs_bitwise_or() {
            let expr = "f(a) | b";
            let tree_ok = "
                binary BitOr
                  call f
                    arguments
                      ident a
                  ident b
            ";
        }

        fn test_empty_lambda_and_anonymous_function() {
            let expr = "run(|| { yield }, fun(int x) int { return x })";
            let tree_ok = "
                call run
                  arguments
                    lambda ||
                      yield
                    function (int x) int
                      return
                        ident x
            ";
        }

        fn test_match() {
            let expr = "
                match shape {
                    Circle c if c.r > 0 -> c.area(),
                    Square { side: s } | Rect { w: s } -> { s * s },
                    1...5 -> 0,
                    _ -> -1
                }
            ";
            let tree_ok = "
                match
                  ident shape
                  case
                    typed Circle c
                    guard
                      binary Greater
                        member r
                          ident c
                        int 0
                    body
                      call area
                        receiver
                          ident c
                  case
                    decompose Square
                      field side
                        ident s
                    decompose Rect
                      field w
                        ident s
                    body
                      binary Mul
                        ident s
                        ident s
                  case
                    binary RangeInclusive
                      int 1
                      int 5
                    body
                      int 0
                  case
                    wildcard
                    body
                      unary Neg
                        int 1
            ";
        }

        fn test_operator_on_next_line_ends_expression() {
            let expr = "a\n+ b";
            let expected_errors = &["2:1: expected end of file, but got `+`"];
        }

        fn test_missing_operand() {
            let expr = "1 +";
            let expected_errors = &["1:4: expected expression, but got end of file"];
        }
    );

    #[test]
    fn deeply_nested_trailing_lambdas_parse_in_linear_time() {
        let depth = 64;
        let src = format!("{}x{}", "f() |a| { ".repeat(depth), " }".repeat(depth));
        let mut ctx = Context::default();
        let expr = parse_expression(&mut ctx, TEST_FILE, &src).unwrap();
        assert!(matches!(expr.kind, ExprKind::MethodCall { .. }));
    }
}
