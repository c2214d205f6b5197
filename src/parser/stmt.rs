use super::{Parser, Result};
use crate::{
    ast::{
        Block, Expr, ExprKind, ForHeader, MatchCase, Name, Stmt, StmtKind, Type,
        VariableDeclaration,
    },
    error::{ErrorKind, SyntaxError},
    token::{Keyword, Location, Operator, TokenKind},
};

impl Parser<'_> {
    /// `'{' statement* '}'`
    pub(super) fn parse_braced_block(&mut self) -> Result<Block> {
        self.consume(Operator::LeftBrace)?;
        self.ctx.tree.start_block();
        while !self.is(Operator::RightBrace) && !self.peek().is_eof() {
            self.parse_statement()?;
        }
        let block = self.ctx.tree.finish_block();
        self.consume(Operator::RightBrace)?;
        Ok(block)
    }

    /// A braced block, or a single statement standing in for one.
    fn parse_body(&mut self) -> Result<Block> {
        if self.is(Operator::LeftBrace) {
            return self.parse_braced_block();
        }
        self.ctx.tree.start_block();
        let result = self.parse_statement();
        let block = self.ctx.tree.finish_block();
        result.map(|()| block)
    }

    pub(super) fn parse_statements_until_eof(&mut self) -> Result<()> {
        while !self.peek().is_eof() {
            self.parse_statement()?;
        }
        Ok(())
    }

    fn emit(&mut self, kind: StmtKind, location: Location) {
        self.ctx.tree.add_statement(Stmt { kind, location });
    }

    /// Parses one statement and appends it (or what it desugars to) to the
    /// current block.
    pub(super) fn parse_statement(&mut self) -> Result<()> {
        let location = self.peek().location.clone();
        let kind = match self.peek().kind {
            TokenKind::Keyword(Keyword::If) => {
                self.advance();
                if self.take_keyword(Keyword::Let) {
                    return self.parse_optional_binding(location, true);
                }
                self.parse_if()?
            }
            TokenKind::Keyword(Keyword::While) => {
                self.advance();
                let condition = self.parse_expression()?;
                let body = self.parse_body()?;
                StmtKind::While { condition, body }
            }
            TokenKind::Keyword(Keyword::For) => {
                self.advance();
                self.parse_for()?
            }
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                StmtKind::Break
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                StmtKind::Continue
            }
            TokenKind::Keyword(Keyword::Return) => {
                self.advance();
                if self.at_statement_end() {
                    StmtKind::Return(None)
                } else {
                    StmtKind::Return(Some(self.parse_expression()?))
                }
            }
            TokenKind::Keyword(Keyword::Defer) => {
                self.advance();
                StmtKind::Defer(self.parse_body()?)
            }
            TokenKind::Keyword(Keyword::Goto) => {
                self.advance();
                let (label, _) = self.parse_identifier()?;
                StmtKind::Jump(label)
            }
            TokenKind::Keyword(Keyword::Super) => {
                if self.ctx.tree.current_class().is_none() {
                    return Err(self.error_here(ErrorKind::ConstructorOutsideClass));
                }
                self.advance();
                let args = self.parse_call_arguments()?;
                StmtKind::ConstructorCall { args }
            }
            TokenKind::Keyword(Keyword::Let | Keyword::Var) => {
                let is_mutable = self.advance().is_keyword(Keyword::Var);
                match self.parse_binding(is_mutable)? {
                    Some(declaration) => StmtKind::VariableDeclaration(declaration),
                    None => return self.parse_optional_binding(location, false),
                }
            }
            TokenKind::Identifier(_) => {
                if let Some(label) = self.lookahead(Parser::parse_label) {
                    self.parse_label()?;
                    self.emit(StmtKind::Label(label), location);
                    return Ok(());
                }
                StmtKind::Expr(self.parse_expression()?)
            }
            _ => StmtKind::Expr(self.parse_expression()?),
        };
        self.expect_terminator()?;
        self.emit(kind, location);
        Ok(())
    }

    /// Whether nothing else belongs to the current statement.
    pub(super) fn at_statement_end(&self) -> bool {
        self.lexer.previous_token_was_newline()
            || self.peek().is_eof()
            || self.is(Operator::RightBrace)
    }

    fn parse_label(&mut self) -> Result<Name> {
        let (label, _) = self.parse_identifier()?;
        if !self.on_same_line() {
            return Err(self.unexpected("`:`"));
        }
        self.consume(Operator::Colon)?;
        Ok(label)
    }

    fn parse_if(&mut self) -> Result<StmtKind> {
        let condition = self.parse_expression()?;
        let then_block = self.parse_body()?;
        let else_block = if self.take_keyword(Keyword::Else) {
            Some(self.parse_body()?)
        } else {
            None
        };
        Ok(StmtKind::If {
            condition,
            then_block,
            else_block,
        })
    }

    /// `for (init; condition; step) body` or `for Type? name in iterable body`
    fn parse_for(&mut self) -> Result<StmtKind> {
        let header = if self.take(Operator::LeftParen) {
            let init = if self.is(Operator::Semicolon) {
                None
            } else {
                Some(Box::new(self.parse_for_init()?))
            };
            self.consume(Operator::Semicolon)?;
            let condition = if self.is(Operator::Semicolon) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.consume(Operator::Semicolon)?;
            let step = if self.is(Operator::RightParen) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.consume(Operator::RightParen)?;
            ForHeader::Classic {
                init,
                condition,
                step,
            }
        } else {
            let ty = if self.lookahead(Parser::parse_typed_binding).is_some() {
                Some(self.parse_type()?)
            } else {
                None
            };
            let (variable, _) = self.parse_identifier()?;
            self.consume_keyword(Keyword::In)?;
            let iterable = self.parse_expression()?;
            ForHeader::Each {
                variable,
                ty,
                iterable,
            }
        };
        let body = self.parse_body()?;
        Ok(StmtKind::For { header, body })
    }

    fn parse_for_init(&mut self) -> Result<Stmt> {
        let location = self.peek().location.clone();
        if self.is_keyword(Keyword::Let) || self.is_keyword(Keyword::Var) {
            let is_mutable = self.advance().is_keyword(Keyword::Var);
            let Some(declaration) = self.parse_binding(is_mutable)? else {
                return Err(SyntaxError::new(ErrorKind::RefutableBinding, location));
            };
            return Ok(Stmt {
                kind: StmtKind::VariableDeclaration(declaration),
                location,
            });
        }
        Ok(Stmt {
            kind: StmtKind::Expr(self.parse_expression()?),
            location,
        })
    }

    /// `Type name`, the head of a typed binding.
    pub(super) fn parse_typed_binding(&mut self) -> Result<(Type, Name)> {
        let ty = self.parse_type()?;
        if !self.on_same_line() {
            return Err(self.unexpected("identifier"));
        }
        let (name, _) = self.parse_identifier()?;
        Ok((ty, name))
    }

    /// The part of a `let` or `var` after the keyword. Returns `None`,
    /// without consuming anything, when the binding is a pattern rather than
    /// a plain (optionally typed) name.
    fn parse_binding(&mut self, is_mutable: bool) -> Result<Option<VariableDeclaration>> {
        let (name, ty) = if self.lookahead(Parser::parse_typed_binding).is_some() {
            let (ty, name) = self.parse_typed_binding()?;
            (name, Some(ty))
        } else if self.lookahead(Parser::parse_plain_binding).is_some() {
            let (name, _) = self.parse_identifier()?;
            (name, None)
        } else {
            return Ok(None);
        };
        let initializer = if self.take(Operator::Assign) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(Some(VariableDeclaration {
            name,
            ty,
            initializer,
            is_mutable,
        }))
    }

    /// A name followed by `=` or by the end of the statement.
    fn parse_plain_binding(&mut self) -> Result<()> {
        self.parse_identifier()?;
        if self.is(Operator::Assign) || self.at_statement_end() || self.is(Operator::Semicolon) {
            Ok(())
        } else {
            Err(self.unexpected("`=`"))
        }
    }

    /// `let pattern = subject { ... } (else { ... })?`, also reached through
    /// `if let`. Desugars to a declaration of a fresh subject variable and a
    /// two case match on it, the second case being a wildcard.
    fn parse_optional_binding(&mut self, location: Location, is_if: bool) -> Result<()> {
        let pattern = self.parse_pattern()?;
        self.consume(Operator::Assign)?;
        let subject = self.parse_expression()?;
        if !self.is(Operator::LeftBrace) {
            if is_if {
                return Err(self.unexpected("`{`"));
            }
            return Err(SyntaxError::new(ErrorKind::RefutableBinding, pattern.location));
        }
        let then_block = self.parse_braced_block()?;
        let else_block = if self.take_keyword(Keyword::Else) {
            self.parse_body()?
        } else {
            Block::default()
        };
        self.expect_terminator()?;

        let subject_name = self.ctx.tree.fresh_name("subject");
        let subject_location = subject.location.clone();
        self.emit(
            StmtKind::VariableDeclaration(VariableDeclaration {
                name: subject_name,
                ty: None,
                initializer: Some(subject),
                is_mutable: false,
            }),
            location.clone(),
        );
        let cases = vec![
            MatchCase {
                location: pattern.location.clone(),
                patterns: vec![pattern],
                guard: None,
                body: then_block,
            },
            MatchCase {
                patterns: vec![Expr::new(ExprKind::Wildcard, location.clone())],
                guard: None,
                body: else_block,
                location: location.clone(),
            },
        ];
        let subject = Expr::new(ExprKind::Identifier(subject_name), subject_location);
        let matching = Expr::new(
            ExprKind::Match {
                subject: Box::new(subject),
                cases,
            },
            location.clone(),
        );
        self.emit(StmtKind::Expr(matching), location);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests!(
        use parser;

        fn test_newline_separates_statements() {
            let statements = "let x = 1\nlet y = 2";
            let tree_ok = "
                let x
                  int 1
                let y
                  int 2
            ";
        }

        fn test_statements_need_a_line_break() {
            let statements = "let x = 1 let y = 2";
            let expected_errors = &["1:11: expected a line break before keyword `let`"];
        }

        fn test_typed_and_mutable_declarations() {
            let statements = "
                var int count = 0
                let string name
            ";
            let tree_ok = "
                var count: int
                  int 0
                let name: string
            ";
        }

        fn test_if_else_chain() {
            let statements = "
                if a { f() } else if b {
                    g()
                } else h()
            ";
            let tree_ok = "
                if
                  ident a
                  then
                    call f
                  else
                    if
                      ident b
                      then
                        call g
                      else
                        call h
            ";
        }

        fn test_if_let_desugars_to_match() {
            let statements = "if let Some(x) = f() { use(x) } else { fallback() }";
            let tree_ok = "
                let __subject1
                  call f
                match
                  ident __subject1
                  case
                    call Some
                      arguments
                        ident x
                    body
                      call use
                        arguments
                          ident x
                  case
                    wildcard
                    body
                      call fallback
            ";
        }

        fn test_let_else_without_else() {
            let statements = "let Point { x: int a } = p { use(a) }";
            let tree_ok = "
                let __subject1
                  ident p
                match
                  ident __subject1
                  case
                    decompose Point
                      field x
                        typed int a
                    body
                      call use
                        arguments
                          ident a
                  case
                    wildcard
                    body
            ";
        }

        fn test_refutable_binding_needs_a_block() {
            let statements = "let Some(x) = f()";
            let expected_errors = &[
                "1:5: a declaration binding must not be a pattern that can fail to match",
            ];
        }

        fn test_loops() {
            let statements = "
                while i < 10 i += 1
                for (var i = 0; i < n; i++) {
                    continue
                }
                for int x in xs { break }
                for y in 0..n {}
            ";
            let tree_ok = "
                while
                  binary Less
                    ident i
                    int 10
                  body
                    binary AddAssign
                      ident i
                      int 1
                for
                  init
                    var i
                      int 0
                  condition
                    binary Less
                      ident i
                      ident n
                  step
                    unary PostIncrement
                      ident i
                  body
                    continue
                for int x in
                  ident xs
                  body
                    break
                for y in
                  binary Range
                    int 0
                    ident n
                  body
            ";
        }

        fn test_jumps_labels_and_defer() {
            let statements = "
                start:
                defer close()
                goto start
                return
            ";
            let tree_ok = "
                label start
                defer
                  call close
                goto start
                return
            ";
        }

        fn test_return_value() {
            let statements = "return a + 1";
            let tree_ok = "
                return
                  binary Add
                    ident a
                    int 1
            ";
        }

        fn test_super_outside_class() {
            let statements = "super(1)";
            let expected_errors = &["1:1: constructor call outside of a class"];
        }
    );
}
