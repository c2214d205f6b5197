use std::{fmt, rc::Rc};

/// A position in some source file.
///
/// Locations are built by the lexer while it walks the source text and are
/// copied into every token and AST node. Once attached they are never
/// mutated.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: Rc<str>,
    /// 1-based line.
    pub line: u32,
    /// 1-based column, counted in characters.
    pub column: u32,
    /// Byte offset into the source buffer.
    pub offset: usize,
}

impl Location {
    /// The location of the first character of `file`.
    pub fn start_of(file: Rc<str>) -> Location {
        Location {
            file,
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    /// Advances past `c`, which must not be a line break.
    pub fn step_column(&mut self, c: char) {
        debug_assert_ne!(c, '\n');
        self.column += 1;
        self.offset += c.len_utf8();
    }

    /// Advances past a line break.
    pub fn step_line(&mut self) {
        self.line += 1;
        self.column = 1;
        self.offset += 1;
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: Location,
}

impl Token {
    pub fn new(kind: TokenKind, location: Location) -> Token {
        Token { kind, location }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    pub fn is_operator(&self, operator: Operator) -> bool {
        self.kind == TokenKind::Operator(operator)
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {:?})", self.kind, self.location)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Input the lexer could not make sense of. Holds the offending text.
    Invalid(Box<str>),
    Eof,
    Newline,
    Keyword(Keyword),
    Operator(Operator),
    Identifier(Box<str>),
    Char(char),
    /// Raw digits, as written.
    Integer(Box<str>),
    /// Raw digits and the decimal point, as written.
    Float(Box<str>),
    /// String contents, with `\n` and `\r` already escaped.
    String(Box<str>),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Invalid(text) => write!(f, "invalid token `{text}`"),
            TokenKind::Eof => write!(f, "end of file"),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Keyword(keyword) => write!(f, "keyword `{}`", keyword.as_str()),
            TokenKind::Operator(operator) => write!(f, "`{}`", operator.as_str()),
            TokenKind::Identifier(name) => write!(f, "identifier `{name}`"),
            TokenKind::Char(c) => write!(f, "character {c:?}"),
            TokenKind::Integer(text) => write!(f, "integer `{text}`"),
            TokenKind::Float(text) => write!(f, "float `{text}`"),
            TokenKind::String(text) => write!(f, "string {text:?}"),
        }
    }
}

macro_rules! keywords {
    ($($variant:ident => $text:literal,)*) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
        pub enum Keyword {
            $($variant,)*
        }

        impl Keyword {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Keyword::$variant => $text,)*
                }
            }
        }

        pub static KEYWORDS: phf::Map<&'static str, Keyword> = phf::phf_map! {
            $($text => Keyword::$variant,)*
        };
    };
}

keywords! {
    Class => "class",
    Interface => "interface",
    Process => "process",
    Message => "message",
    Enum => "enum",
    Native => "native",
    Private => "private",
    Static => "static",
    Virtual => "virtual",
    Import => "import",
    Let => "let",
    Var => "var",
    If => "if",
    Else => "else",
    While => "while",
    For => "for",
    In => "in",
    Break => "break",
    Continue => "continue",
    Return => "return",
    Defer => "defer",
    Goto => "goto",
    Match => "match",
    New => "new",
    Yield => "yield",
    True => "true",
    False => "false",
    This => "this",
    Init => "init",
    Super => "super",
    Fun => "fun",
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Plus,
    Increment,
    PlusAssign,
    Minus,
    Decrement,
    MinusAssign,
    /// `->`
    Arrow,
    Star,
    StarAssign,
    Slash,
    SlashAssign,
    Percent,
    PercentAssign,
    Assign,
    Equal,
    Bang,
    NotEqual,
    Less,
    LessEqual,
    ShiftLeft,
    Greater,
    GreaterEqual,
    ShiftRight,
    Ampersand,
    AndAnd,
    Pipe,
    OrOr,
    Caret,
    Tilde,
    Dot,
    /// `..`
    Range,
    /// `...`
    Ellipsis,
    Comma,
    Semicolon,
    Colon,
    Question,
    At,
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    /// A lone `_`.
    Placeholder,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        use Operator::*;
        match self {
            Plus => "+",
            Increment => "++",
            PlusAssign => "+=",
            Minus => "-",
            Decrement => "--",
            MinusAssign => "-=",
            Arrow => "->",
            Star => "*",
            StarAssign => "*=",
            Slash => "/",
            SlashAssign => "/=",
            Percent => "%",
            PercentAssign => "%=",
            Assign => "=",
            Equal => "==",
            Bang => "!",
            NotEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            ShiftLeft => "<<",
            Greater => ">",
            GreaterEqual => ">=",
            ShiftRight => ">>",
            Ampersand => "&",
            AndAnd => "&&",
            Pipe => "|",
            OrOr => "||",
            Caret => "^",
            Tilde => "~",
            Dot => ".",
            Range => "..",
            Ellipsis => "...",
            Comma => ",",
            Semicolon => ";",
            Colon => ":",
            Question => "?",
            At => "@",
            LeftParen => "(",
            RightParen => ")",
            LeftBrace => "{",
            RightBrace => "}",
            LeftBracket => "[",
            RightBracket => "]",
            Placeholder => "_",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_table_round_trips() {
        for (text, keyword) in KEYWORDS.entries() {
            assert_eq!(keyword.as_str(), *text);
        }
        assert_eq!(KEYWORDS.get("process"), Some(&Keyword::Process));
        assert_eq!(KEYWORDS.get("Process"), None);
    }

    #[test]
    fn location_steps() {
        let mut loc = Location::start_of("main.plume".into());
        loc.step_column('a');
        loc.step_column('é');
        assert_eq!((loc.line, loc.column, loc.offset), (1, 3, 3));
        loc.step_line();
        assert_eq!((loc.line, loc.column, loc.offset), (2, 1, 4));
        assert_eq!(loc.to_string(), "main.plume:2:1");
    }
}
