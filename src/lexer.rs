use std::rc::Rc;

use crate::token::{Location, Operator, Token, TokenKind, KEYWORDS};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

/// Lexes the provided source, returning every token. The last token is always
/// [`TokenKind::Eof`].
pub fn lex(file: Rc<str>, src: &str) -> Vec<Token> {
    Scanner::new(file, src).scan()
}

/// A fully materialized token stream with a bidirectional cursor.
///
/// The cursor never rests on a [`TokenKind::Newline`]: consuming a token also
/// skips the line breaks after it, which the parser can still observe through
/// [`Lexer::previous_token_was_newline`].
pub struct Lexer {
    tokens: Vec<Token>,
    cursor: usize,
}

/// An opaque snapshot of a [`Lexer`] cursor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint(usize);

impl Lexer {
    pub fn new(file: Rc<str>, src: &str) -> Lexer {
        Lexer::from_tokens(lex(file, src))
    }

    pub fn from_tokens(tokens: Vec<Token>) -> Lexer {
        assert!(
            tokens.last().is_some_and(Token::is_eof),
            "token stream must end with eof"
        );
        let mut lexer = Lexer { tokens, cursor: 0 };
        lexer.skip_newlines();
        lexer
    }

    /// Returns the current token and advances past it and any line breaks
    /// that follow. Once at the end, keeps returning the eof token.
    pub fn consume_token(&mut self) -> Token {
        let token = self.tokens[self.cursor].clone();
        if !token.is_eof() {
            self.cursor += 1;
            self.skip_newlines();
        }
        token
    }

    /// Returns the current token without advancing.
    pub fn peek_token(&self) -> &Token {
        &self.tokens[self.cursor]
    }

    /// Moves the cursor back to the previous non-newline token.
    pub fn step_back(&mut self) {
        while self.cursor > 0 {
            self.cursor -= 1;
            if self.tokens[self.cursor].kind != TokenKind::Newline {
                break;
            }
        }
    }

    /// Whether a line break separates the current token from the one before
    /// it.
    pub fn previous_token_was_newline(&self) -> bool {
        self.cursor > 0 && self.tokens[self.cursor - 1].kind == TokenKind::Newline
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.cursor)
    }

    pub fn restore(&mut self, Checkpoint(cursor): Checkpoint) {
        debug_assert!(cursor < self.tokens.len());
        self.cursor = cursor;
    }

    fn skip_newlines(&mut self) {
        while self.tokens[self.cursor].kind == TokenKind::Newline {
            self.cursor += 1;
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ScanState {
    Idle,
    Identifier,
    Integer,
    Float,
}

/// The scanner state machine. Identifiers and numbers are accumulated into a
/// pending buffer which is flushed when any other character shows up.
struct Scanner<'src> {
    src: &'src str,
    location: Location,
    state: ScanState,
    pending: String,
    pending_start: Location,
    tokens: Vec<Token>,
}

impl Scanner<'_> {
    fn new(file: Rc<str>, src: &str) -> Scanner<'_> {
        let location = Location::start_of(file);
        Scanner {
            src,
            pending_start: location.clone(),
            location,
            state: ScanState::Idle,
            pending: String::new(),
            tokens: Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY.min(src.len() / 2 + 1)),
        }
    }

    fn scan(mut self) -> Vec<Token> {
        while let Some(c) = self.peek() {
            if self.continue_pending(c) {
                self.pending.push(c);
                self.advance();
                continue;
            }
            self.flush();
            match c {
                ' ' | '\t' | '\r' => self.advance(),
                '\n' => {
                    let location = self.location.clone();
                    self.advance();
                    self.produce(TokenKind::Newline, location);
                }
                c if c.is_alphabetic() || c == '_' => self.start_pending(ScanState::Identifier),
                c if c.is_ascii_digit() => self.start_pending(ScanState::Integer),
                '"' => self.string(),
                '\'' => self.char_literal(),
                '/' if self.peek_nth(1) == Some('/') => self.line_comment(),
                '/' if self.peek_nth(1) == Some('*') => self.block_comment(),
                _ => self.operator(),
            }
        }
        self.flush();
        let eof = self.location.clone();
        self.produce(TokenKind::Eof, eof);
        self.tokens
    }

    /// Whether `c` extends the pending identifier or number. A `.` turns an
    /// integer into a float, unless it's the start of a range.
    fn continue_pending(&mut self, c: char) -> bool {
        match self.state {
            ScanState::Idle => false,
            ScanState::Identifier => c.is_alphanumeric() || c == '_',
            ScanState::Integer if c == '.' && self.peek_nth(1) != Some('.') => {
                self.state = ScanState::Float;
                true
            }
            ScanState::Integer | ScanState::Float => c.is_ascii_digit(),
        }
    }

    fn start_pending(&mut self, state: ScanState) {
        debug_assert!(self.pending.is_empty());
        self.state = state;
        self.pending_start = self.location.clone();
    }

    /// Emits the pending identifier, keyword or number, if any.
    fn flush(&mut self) {
        let state = std::mem::replace(&mut self.state, ScanState::Idle);
        if state == ScanState::Idle {
            return;
        }
        let text = std::mem::take(&mut self.pending);
        let kind = match state {
            ScanState::Identifier if text == "_" => TokenKind::Operator(Operator::Placeholder),
            ScanState::Identifier => match KEYWORDS.get(text.as_str()) {
                Some(&keyword) => TokenKind::Keyword(keyword),
                None => TokenKind::Identifier(text.into_boxed_str()),
            },
            ScanState::Integer => TokenKind::Integer(text.into_boxed_str()),
            ScanState::Float => TokenKind::Float(text.into_boxed_str()),
            ScanState::Idle => unreachable!(),
        };
        let start = self.pending_start.clone();
        self.produce(kind, start);
    }

    /// Scans a string literal. The literal may not contain a line break; an
    /// unterminated literal becomes an invalid token and the line break is
    /// left for the main loop.
    fn string(&mut self) {
        let start = self.location.clone();
        let mut raw = String::new();
        self.advance(); // "
        loop {
            match self.peek() {
                None | Some('\n') => {
                    let text = format!("\"{raw}");
                    self.produce(TokenKind::Invalid(text.into_boxed_str()), start);
                    return;
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some('\\') if !matches!(self.peek_nth(1), None | Some('\n')) => {
                    raw.push('\\');
                    self.advance();
                    raw.extend(self.peek());
                    self.advance();
                }
                Some(c) => {
                    raw.push(c);
                    self.advance();
                }
            }
        }
        let value = perform_escape(&raw);
        self.produce(TokenKind::String(value.into_boxed_str()), start);
    }

    /// Scans `'c'` or `'\n'`. Anything else is an invalid token.
    fn char_literal(&mut self) {
        let start = self.location.clone();
        self.advance(); // '
        let value = match (self.peek(), self.peek_nth(1)) {
            (Some('\\'), Some('n')) => {
                self.advance();
                self.advance();
                Some('\n')
            }
            (Some(c), _) if c != '\n' && c != '\'' => {
                self.advance();
                Some(c)
            }
            _ => None,
        };
        match value {
            Some(c) if self.peek() == Some('\'') => {
                self.advance();
                self.produce(TokenKind::Char(c), start);
            }
            _ => {
                let text = self.src[start.offset..self.location.offset].to_string();
                self.produce(TokenKind::Invalid(text.into_boxed_str()), start);
            }
        }
    }

    fn line_comment(&mut self) {
        while !matches!(self.peek(), Some('\n') | None) {
            self.advance();
        }
    }

    fn block_comment(&mut self) {
        self.advance(); // /
        self.advance(); // *
        loop {
            match self.peek() {
                None => return,
                Some('*') if self.peek_nth(1) == Some('/') => {
                    self.advance();
                    self.advance();
                    return;
                }
                Some(_) => self.advance(),
            }
        }
    }

    /// Builds an operator token using maximal munch over a fixed lookahead.
    fn operator(&mut self) {
        use Operator::*;

        let start = self.location.clone();
        let Some(c) = self.peek() else { return };
        self.advance();
        let next = self.peek();

        let operator = match c {
            '+' => match next {
                Some('+') => self.advance_with(Increment),
                Some('=') => self.advance_with(PlusAssign),
                _ => Plus,
            },
            '-' => match next {
                Some('-') => self.advance_with(Decrement),
                Some('=') => self.advance_with(MinusAssign),
                Some('>') => self.advance_with(Arrow),
                _ => Minus,
            },
            '*' => match next {
                Some('=') => self.advance_with(StarAssign),
                _ => Star,
            },
            '/' => match next {
                Some('=') => self.advance_with(SlashAssign),
                _ => Slash,
            },
            '%' => match next {
                Some('=') => self.advance_with(PercentAssign),
                _ => Percent,
            },
            '=' => match next {
                Some('=') => self.advance_with(Equal),
                _ => Assign,
            },
            '!' => match next {
                Some('=') => self.advance_with(NotEqual),
                _ => Bang,
            },
            '<' => match next {
                Some('=') => self.advance_with(LessEqual),
                Some('<') => self.advance_with(ShiftLeft),
                _ => Less,
            },
            '>' => match next {
                Some('=') => self.advance_with(GreaterEqual),
                Some('>') => self.advance_with(ShiftRight),
                _ => Greater,
            },
            '&' => match next {
                Some('&') => self.advance_with(AndAnd),
                _ => Ampersand,
            },
            '|' => match next {
                Some('|') => self.advance_with(OrOr),
                _ => Pipe,
            },
            '.' => match (next, self.peek_nth(1)) {
                (Some('.'), Some('.')) => {
                    self.advance();
                    self.advance_with(Ellipsis)
                }
                (Some('.'), _) => self.advance_with(Range),
                _ => Dot,
            },
            '^' => Caret,
            '~' => Tilde,
            ',' => Comma,
            ';' => Semicolon,
            ':' => Colon,
            '?' => Question,
            '@' => At,
            '(' => LeftParen,
            ')' => RightParen,
            '{' => LeftBrace,
            '}' => RightBrace,
            '[' => LeftBracket,
            ']' => RightBracket,
            other => {
                let text = other.to_string().into_boxed_str();
                self.produce(TokenKind::Invalid(text), start);
                return;
            }
        };
        self.produce(TokenKind::Operator(operator), start);
    }
}

impl Scanner<'_> {
    fn peek(&self) -> Option<char> {
        self.src[self.location.offset..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.location.offset..].chars().nth(n)
    }

    /// Advances one character, keeping track of lines and columns.
    fn advance(&mut self) {
        match self.peek() {
            Some('\n') => self.location.step_line(),
            Some(c) => self.location.step_column(c),
            None => {}
        }
    }

    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    fn produce(&mut self, kind: TokenKind, location: Location) {
        self.tokens.push(Token::new(kind, location));
    }
}

/// Replaces the `\n` and `\r` escape sequences. Other escapes are kept as
/// written, since the target language understands them.
fn perform_escape(raw: &str) -> String {
    let mut buf = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            buf.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => buf.push('\n'),
            Some('r') => buf.push('\r'),
            Some(other) => {
                buf.push('\\');
                buf.push(other);
            }
            None => buf.push('\\'),
        }
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Keyword;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex("test".into(), src).into_iter().map(|t| t.kind).collect()
    }

    fn op(operator: Operator) -> TokenKind {
        TokenKind::Operator(operator)
    }

    fn ident(name: &str) -> TokenKind {
        TokenKind::Identifier(name.into())
    }

    #[test]
    fn test_operators_maximal_munch() {
        use Operator::*;
        let cases: &[(&str, &[Operator])] = &[
            ("= ==", &[Assign, Equal]),
            ("< <= <<", &[Less, LessEqual, ShiftLeft]),
            (". .. ...", &[Dot, Range, Ellipsis]),
            ("- -- -= ->", &[Minus, Decrement, MinusAssign, Arrow]),
            ("+++", &[Increment, Plus]),
            ("!=!", &[NotEqual, Bang]),
        ];
        for (src, expected) in cases {
            let lexed = kinds(src);
            let mut want: Vec<_> = expected.iter().copied().map(op).collect();
            want.push(TokenKind::Eof);
            assert_eq!(lexed, want, "input {src:?}");
        }
        assert_eq!(
            kinds("a||b"),
            [ident("a"), op(OrOr), ident("b"), TokenKind::Eof]
        );
    }

    #[test]
    fn test_numbers_and_ranges() {
        assert_eq!(
            kinds("1.5 1..5 10...20 3."),
            [
                TokenKind::Float("1.5".into()),
                TokenKind::Integer("1".into()),
                op(Operator::Range),
                TokenKind::Integer("5".into()),
                TokenKind::Integer("10".into()),
                op(Operator::Ellipsis),
                TokenKind::Integer("20".into()),
                TokenKind::Float("3.".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_identifiers_keywords_and_placeholder() {
        assert_eq!(
            kinds("class _ _x __Alias process2 x1"),
            [
                TokenKind::Keyword(Keyword::Class),
                op(Operator::Placeholder),
                ident("_x"),
                ident("__Alias"),
                ident("process2"),
                ident("x1"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_newlines_are_tokens() {
        assert_eq!(
            kinds("a\n\nb // comment\nc /* multi\nline */ d"),
            [
                ident("a"),
                TokenKind::Newline,
                TokenKind::Newline,
                ident("b"),
                TokenKind::Newline,
                ident("c"),
                ident("d"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds(r#""hello" "a\nb\r" "q\"x" "\t""#),
            [
                TokenKind::String("hello".into()),
                TokenKind::String("a\nb\r".into()),
                TokenKind::String("q\\\"x".into()),
                TokenKind::String("\\t".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_invalid() {
        assert_eq!(
            kinds("\"abc\nx"),
            [
                TokenKind::Invalid("\"abc".into()),
                TokenKind::Newline,
                ident("x"),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_char_literals() {
        assert_eq!(kinds("'a'"), [TokenKind::Char('a'), TokenKind::Eof]);
        assert_eq!(kinds(r"'\n'"), [TokenKind::Char('\n'), TokenKind::Eof]);
        assert_eq!(
            kinds("'ab'"),
            [
                TokenKind::Invalid("'a".into()),
                ident("b"),
                TokenKind::Invalid("'".into()),
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("''"),
            [
                TokenKind::Invalid("'".into()),
                TokenKind::Invalid("'".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_invalid() {
        assert_eq!(
            kinds("a $ b"),
            [ident("a"), TokenKind::Invalid("$".into()), ident("b"), TokenKind::Eof]
        );
    }

    #[test]
    fn test_locations() {
        let tokens = lex("f".into(), "class A\n  int x");
        let positions: Vec<_> = tokens
            .iter()
            .map(|t| (t.location.line, t.location.column, t.location.offset))
            .collect();
        assert_eq!(
            positions,
            [(1, 1, 0), (1, 7, 6), (1, 8, 7), (2, 3, 10), (2, 7, 14), (2, 8, 15)]
        );
    }

    #[test]
    fn test_cursor_skips_newlines() {
        let mut lexer = Lexer::new("f".into(), "\n\na\n\nb c");
        assert_eq!(lexer.peek_token().kind, ident("a"));
        assert!(lexer.previous_token_was_newline());
        assert_eq!(lexer.consume_token().kind, ident("a"));
        assert!(lexer.previous_token_was_newline());
        assert_eq!(lexer.consume_token().kind, ident("b"));
        assert!(!lexer.previous_token_was_newline());
        lexer.step_back();
        assert_eq!(lexer.peek_token().kind, ident("b"));
        lexer.step_back();
        assert_eq!(lexer.peek_token().kind, ident("a"));
        assert_eq!(lexer.consume_token().kind, ident("a"));
        assert_eq!(lexer.consume_token().kind, ident("b"));
        assert_eq!(lexer.consume_token().kind, ident("c"));
        assert!(lexer.consume_token().is_eof());
        assert!(lexer.consume_token().is_eof());
    }

    #[test]
    fn test_checkpoint_restore() {
        let mut lexer = Lexer::new("f".into(), "a b c");
        lexer.consume_token();
        let checkpoint = lexer.checkpoint();
        lexer.consume_token();
        lexer.consume_token();
        assert!(lexer.peek_token().is_eof());
        lexer.restore(checkpoint);
        assert_eq!(lexer.checkpoint(), checkpoint);
        assert_eq!(lexer.peek_token().kind, ident("b"));
    }
}
