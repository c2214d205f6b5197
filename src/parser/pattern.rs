use super::{Parser, Restrictions, Result};
use crate::{
    ast::{Block, Expr, ExprKind, MatchCase, Stmt, StmtKind},
    token::{Keyword, Operator},
};

const PATTERN: Restrictions = Restrictions {
    no_range: false,
    no_pipe: true,
    no_assign: true,
    in_pattern: true,
};

impl Parser<'_> {
    /// A pattern is a decomposition `Type { field: pattern, ... }`, a typed
    /// binding `Type name`, or an expression in which `_` is a wildcard and
    /// call arguments are patterns again.
    pub(super) fn parse_pattern(&mut self) -> Result<Expr> {
        self.with_restrictions(PATTERN, |p| {
            if p.lookahead(Parser::parse_decomposition_head).is_some() {
                return p.parse_decomposition();
            }
            let location = p.peek().location.clone();
            if p.lookahead(Parser::parse_typed_binding).is_some() {
                let (ty, name) = p.parse_typed_binding()?;
                return Ok(ExprKind::Typed { ty, name }.at(location));
            }
            p.parse_binary(0)
        })
    }

    /// `Type {` followed by `}` or `name :`.
    fn parse_decomposition_head(&mut self) -> Result<()> {
        self.parse_type()?;
        if !self.on_same_line() {
            return Err(self.unexpected("`{`"));
        }
        self.consume(Operator::LeftBrace)?;
        if self.is(Operator::RightBrace) {
            return Ok(());
        }
        self.parse_identifier()?;
        self.consume(Operator::Colon)?;
        Ok(())
    }

    fn parse_decomposition(&mut self) -> Result<Expr> {
        let location = self.peek().location.clone();
        let ty = self.parse_type()?;
        self.consume(Operator::LeftBrace)?;
        let fields = self.parse_list(&[Operator::RightBrace], |p| {
            let (name, _) = p.parse_identifier()?;
            p.consume(Operator::Colon)?;
            Ok((name, p.parse_pattern()?))
        })?;
        self.consume(Operator::RightBrace)?;
        Ok(ExprKind::ClassDecomposition { ty, fields }.at(location))
    }

    /// `match subject { case (',' case)* }`
    pub(super) fn parse_match(&mut self) -> Result<Expr> {
        let token = self.consume_keyword(Keyword::Match)?;
        self.with_restrictions(Restrictions::default(), |p| {
            let subject = p.parse_expression()?;
            p.consume(Operator::LeftBrace)?;
            if p.is(Operator::RightBrace) {
                return Err(p.unexpected("match case"));
            }
            let cases = p.parse_list(&[Operator::RightBrace], Parser::parse_match_case)?;
            p.consume(Operator::RightBrace)?;
            Ok(ExprKind::Match {
                subject: Box::new(subject),
                cases,
            }
            .at(token.location))
        })
    }

    /// `pattern ('|' pattern)* ('if' guard)? '->' (block | expr)`
    fn parse_match_case(&mut self) -> Result<MatchCase> {
        let location = self.peek().location.clone();
        let mut patterns = vec![self.parse_pattern()?];
        while self.take(Operator::Pipe) {
            patterns.push(self.parse_pattern()?);
        }
        let guard = if self.take_keyword(Keyword::If) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume(Operator::Arrow)?;
        let body = if self.is(Operator::LeftBrace) {
            self.parse_braced_block()?
        } else {
            let expr = self.parse_expression()?;
            let location = expr.location.clone();
            Block {
                statements: vec![Stmt {
                    kind: StmtKind::Expr(expr),
                    location,
                }],
            }
        };
        Ok(MatchCase {
            patterns,
            guard,
            body,
            location,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests!(
        use parser;

        fn test_call_patterns_nest() {
            let statements = "if let Some(Pair(a, _)) = find(k) { use(a) }";
            let tree_ok = "
                let __subject1
                  call find
                    arguments
                      ident k
                match
                  ident __subject1
                  case
                    call Some
                      arguments
                        call Pair
                          arguments
                            ident a
                            wildcard
                    body
                      call use
                        arguments
                          ident a
                  case
                    wildcard
                    body
            ";
        }

        fn test_nested_decomposition() {
            let expr = "match line { Line { from: Point { x: 0, y: y }, to: _ } -> y }";
            let tree_ok = "
                match
                  ident line
                  case
                    decompose Line
                      field from
                        decompose Point
                          field x
                            int 0
                          field y
                            ident y
                      field to
                        wildcard
                    body
                      ident y
            ";
        }

        fn test_empty_decomposition() {
            let expr = "match unit { Unit {} -> 1 }";
            let tree_ok = "
                match
                  ident unit
                  case
                    decompose Unit
                    body
                      int 1
            ";
        }

        fn test_patterns_reject_assignment() {
            let expr = "match x { a = 1 -> 0 }";
            let expected_errors = &["1:13: expected `->`, but got `=`"];
        }

        fn test_empty_match() {
            let expr = "match x {}";
            let expected_errors = &["1:10: expected match case, but got `}`"];
        }

        fn test_trailing_comma_after_case() {
            let expr = "match x { _ -> 0, }";
            let expected_errors = &["1:17: unexpected trailing comma"];
        }
    );
}
