use std::{path::Path, rc::Rc};

use tracing::{debug, trace};

use crate::{
    ast::{Block, Expr, Name, Type},
    context::Context,
    error::{Error, ErrorKind, SyntaxError},
    lexer::Lexer,
    token::{Keyword, Location, Operator, Token, TokenKind},
};

mod decl;
mod expr;
mod pattern;
mod stmt;

type Result<T, E = SyntaxError> = std::result::Result<T, E>;

/// Parses the file at `path` and everything it imports into `ctx.tree`.
pub fn parse_file(ctx: &mut Context, path: &Path) -> Result<(), Error> {
    let (name, text) = ctx.files.load(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ctx.tree.register_import(&name);
    debug!(file = %name, "parsing");
    Parser::new(ctx, name, &text).parse_program()?;
    Ok(())
}

/// Parses an in-memory program. `name` is used for locations and
/// diagnostics.
pub fn parse_source(ctx: &mut Context, name: &str, src: &str) -> Result<()> {
    let (name, text) = ctx.files.insert(name, src);
    ctx.tree.register_import(&name);
    Parser::new(ctx, name, &text).parse_program()
}

/// Parses a single expression spanning the whole source.
pub fn parse_expression(ctx: &mut Context, name: &str, src: &str) -> Result<Expr> {
    let (name, text) = ctx.files.insert(name, src);
    let mut p = Parser::new(ctx, name, &text);
    let expr = p.parse_expression()?;
    p.expect_eof()?;
    Ok(expr)
}

/// Parses a sequence of statements spanning the whole source, as if it were
/// the body of a function.
pub fn parse_statements(ctx: &mut Context, name: &str, src: &str) -> Result<Block> {
    let (name, text) = ctx.files.insert(name, src);
    let mut p = Parser::new(ctx, name, &text);
    p.ctx.tree.start_block();
    let result = p.parse_statements_until_eof();
    let block = p.ctx.tree.finish_block();
    result.map(|()| block)
}

/// Grammar contexts in which some productions are turned off.
#[derive(Copy, Clone, Debug, Default)]
struct Restrictions {
    /// `..` and `...` are not binary operators (array literals and
    /// subscripts).
    no_range: bool,
    /// `|` separates pattern alternatives rather than being a binary operator.
    no_pipe: bool,
    /// Assignments are not allowed (patterns).
    no_assign: bool,
    /// A lone `_` is a wildcard, and call arguments are patterns.
    in_pattern: bool,
}

pub(crate) struct Parser<'ctx> {
    lexer: Lexer,
    ctx: &'ctx mut Context,
    restrictions: Restrictions,
    /// Set after a `>>` closed a generic argument list, while the second
    /// `>` still has to close the enclosing one.
    pending_greater: Option<Location>,
}

impl<'ctx> Parser<'ctx> {
    fn new(ctx: &'ctx mut Context, file: Rc<str>, src: &str) -> Parser<'ctx> {
        Parser {
            lexer: Lexer::new(file, src),
            ctx,
            restrictions: Restrictions::default(),
            pending_greater: None,
        }
    }

    fn parse_program(&mut self) -> Result<()> {
        while !self.peek().is_eof() {
            self.parse_declaration()?;
        }
        Ok(())
    }

    /// Runs `f` speculatively. The cursor and the tree's block stack are
    /// always restored afterwards, whether `f` succeeded or not; the caller
    /// re-parses the alternative it commits to.
    fn lookahead<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Option<T> {
        let checkpoint = self.lexer.checkpoint();
        let depth = self.ctx.tree.block_depth();
        let restrictions = self.restrictions;
        let pending_greater = self.pending_greater.clone();

        let result = f(self);

        self.lexer.restore(checkpoint);
        self.ctx.tree.truncate_blocks(depth);
        self.restrictions = restrictions;
        self.pending_greater = pending_greater;

        match result {
            Ok(value) => Some(value),
            Err(error) => {
                trace!(at = ?error.location, reason = %error.kind, "rejected speculative parse");
                None
            }
        }
    }

    /// Runs `f` with `restrictions` in place of the current ones.
    fn with_restrictions<T>(
        &mut self,
        restrictions: Restrictions,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = std::mem::replace(&mut self.restrictions, restrictions);
        let result = f(self);
        self.restrictions = saved;
        result
    }

    /// Parses `item (',' item)*` up to one of `closing`, which is not
    /// consumed. Leading and trailing commas are rejected.
    fn parse_list<T>(
        &mut self,
        closing: &[Operator],
        mut item: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        if self.is(Operator::Comma) {
            return Err(self.error_here(ErrorKind::LeadingComma));
        }
        while !self.is_any(closing) {
            items.push(item(self)?);
            if self.is_any(closing) {
                break;
            }
            if !self.is(Operator::Comma) {
                let expected = std::iter::once(Operator::Comma)
                    .chain(closing.iter().copied())
                    .map(|op| format!("`{}`", op.as_str()))
                    .collect::<Vec<_>>()
                    .join(" or ");
                return Err(self.unexpected(&expected));
            }
            let comma = self.advance();
            if self.is_any(closing) {
                return Err(SyntaxError::new(ErrorKind::TrailingComma, comma.location));
            }
        }
        Ok(items)
    }

    /// `Name ('<' type (',' type)* '>')? ('[' ']')*`
    fn parse_type(&mut self) -> Result<Type> {
        let ty = self.parse_type_inner()?;
        if let Some(location) = self.pending_greater.take() {
            return Err(SyntaxError::new(
                ErrorKind::Unexpected {
                    expected: "a type".into(),
                    actual: TokenKind::Operator(Operator::Greater),
                },
                location,
            ));
        }
        Ok(ty)
    }

    fn parse_type_inner(&mut self) -> Result<Type> {
        let (name, location) = self.parse_identifier()?;
        let mut ty = Type::named(name, location);
        if self.is(Operator::Less) && !self.lexer.previous_token_was_newline() {
            self.advance();
            loop {
                ty.arguments.push(self.parse_type_inner()?);
                if self.pending_greater.is_some() || !self.take(Operator::Comma) {
                    break;
                }
            }
            self.close_type_arguments()?;
        }
        while self.pending_greater.is_none() && self.is(Operator::LeftBracket) {
            let checkpoint = self.lexer.checkpoint();
            self.advance();
            if !self.take(Operator::RightBracket) {
                self.lexer.restore(checkpoint);
                break;
            }
            ty.array_dimensions += 1;
        }
        Ok(ty)
    }

    fn close_type_arguments(&mut self) -> Result<()> {
        if self.pending_greater.take().is_some() || self.take(Operator::Greater) {
            return Ok(());
        }
        if self.is(Operator::ShiftRight) {
            let token = self.advance();
            self.pending_greater = Some(token.location);
            return Ok(());
        }
        Err(self.unexpected("`>`"))
    }

    fn parse_identifier(&mut self) -> Result<(Name, Location)> {
        match &self.lexer.peek_token().kind {
            TokenKind::Identifier(text) => {
                let name = self.ctx.tree.intern(text);
                let token = self.advance();
                Ok((name, token.location))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Like [`Parser::parse_identifier`], but drops a leading `__`, which
    /// lets a declaration alias a name the compiler generates.
    fn parse_declared_name(&mut self) -> Result<(Name, Location)> {
        match &self.lexer.peek_token().kind {
            TokenKind::Identifier(text) => {
                let text = text.strip_prefix("__").unwrap_or(text);
                let name = self.ctx.tree.intern(text);
                let token = self.advance();
                Ok((name, token.location))
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    /// Every declaration and statement must be followed by a line break, a
    /// closing brace or the end of the file.
    fn expect_terminator(&self) -> Result<()> {
        let token = self.peek();
        if self.lexer.previous_token_was_newline()
            || token.is_eof()
            || token.is_operator(Operator::RightBrace)
        {
            return Ok(());
        }
        Err(self.error_here(ErrorKind::MissingTerminator(token.kind.clone())))
    }

    fn expect_eof(&self) -> Result<()> {
        if self.peek().is_eof() {
            Ok(())
        } else {
            Err(self.unexpected("end of file"))
        }
    }
}

/// Token level helpers.
impl Parser<'_> {
    fn peek(&self) -> &Token {
        self.lexer.peek_token()
    }

    fn advance(&mut self) -> Token {
        self.lexer.consume_token()
    }

    fn is(&self, operator: Operator) -> bool {
        self.peek().is_operator(operator)
    }

    fn is_any(&self, operators: &[Operator]) -> bool {
        operators.iter().any(|&op| self.is(op))
    }

    fn is_keyword(&self, keyword: Keyword) -> bool {
        self.peek().is_keyword(keyword)
    }

    /// Whether the current token starts on the same line as the previous one.
    fn on_same_line(&self) -> bool {
        !self.lexer.previous_token_was_newline()
    }

    fn take(&mut self, operator: Operator) -> bool {
        if self.is(operator) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn take_keyword(&mut self, keyword: Keyword) -> bool {
        if self.is_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn consume(&mut self, operator: Operator) -> Result<Token> {
        if self.is(operator) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("`{}`", operator.as_str())))
        }
    }

    fn consume_keyword(&mut self, keyword: Keyword) -> Result<Token> {
        if self.is_keyword(keyword) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&format!("keyword `{}`", keyword.as_str())))
        }
    }

    fn error_here(&self, kind: ErrorKind) -> SyntaxError {
        SyntaxError::new(kind, self.peek().location.clone())
    }

    /// Builds the error for an unexpected current token. Invalid tokens are
    /// reported as such.
    fn unexpected(&self, expected: &str) -> SyntaxError {
        let token = self.peek();
        let kind = match &token.kind {
            TokenKind::Invalid(text) => ErrorKind::InvalidToken(text.clone()),
            actual => ErrorKind::Unexpected {
                expected: expected.into(),
                actual: actual.clone(),
            },
        };
        SyntaxError::new(kind, token.location.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::test_utils::tree_tests;

    tree_tests!(
        use parser;

        fn test_types_with_nested_arguments() {
            let statements = "let Map<string, List<int>> m = x";
            let tree_ok = "
                let m: Map<string, List<int>>
                  ident x
            ";
        }

        fn test_array_types() {
            let statements = "var int[][] grid = new int[4]";
            let tree_ok = "
                var grid: int[][]
                  new array int
                    int 4
            ";
        }

        fn test_unbalanced_type_arguments() {
            let program = "class A { List<int>> m }";
            let expected_errors = &["1:19: expected a type, but got `>`"];
        }

        fn test_leading_comma() {
            let expr = "f(, a)";
            let expected_errors = &["1:3: unexpected leading comma"];
        }

        fn test_trailing_comma() {
            let expr = "f(a, b,)";
            let expected_errors = &["1:7: unexpected trailing comma"];
        }

        fn test_missing_comma() {
            let expr = "f(a b)";
            let expected_errors = &["1:5: expected `,` or `)`, but got identifier `b`"];
        }

        fn test_invalid_token() {
            let expr = "a + #";
            let expected_errors = &["1:5: invalid token `#`"];
        }
    );

    #[test]
    fn lookahead_restores_cursor() {
        let mut ctx = Context::default();
        let (name, text) = ctx.files.insert("t.plume", "(a < b) + c");
        let mut p = Parser::new(&mut ctx, name, &text);
        let before = p.lexer.checkpoint();
        let cast = p.lookahead(|p| {
            p.consume(Operator::LeftParen)?;
            let ty = p.parse_type()?;
            p.consume(Operator::RightParen)?;
            Ok(ty)
        });
        assert!(cast.is_none());
        assert_eq!(p.lexer.checkpoint(), before);

        let ok = p.lookahead(|p| p.consume(Operator::LeftParen));
        assert!(ok.is_some());
        assert_eq!(p.lexer.checkpoint(), before);
    }

    #[test]
    fn lookahead_restores_pending_greater() {
        let mut ctx = Context::default();
        let (name, text) = ctx.files.insert("t.plume", "(a<b>> c)");
        let mut p = Parser::new(&mut ctx, name, &text);
        let attempt = p.lookahead(|p| {
            p.consume(Operator::LeftParen)?;
            p.parse_type()
        });
        assert!(attempt.is_none());
        assert!(p.pending_greater.is_none());
        assert!(p.is(Operator::LeftParen));
    }
}
