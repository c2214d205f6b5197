use std::{fmt::Write as _, io, path::PathBuf};

use crate::{
    context::FileCache,
    token::{Location, TokenKind},
};

/// The only error the lexer and parser pipeline produce. Compilation stops
/// at the first one.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct SyntaxError {
    pub kind: ErrorKind,
    pub location: Location,
}

impl SyntaxError {
    pub fn new(kind: ErrorKind, location: Location) -> SyntaxError {
        SyntaxError { kind, location }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("expected {expected}, but got {actual}")]
    Unexpected {
        expected: Box<str>,
        actual: TokenKind,
    },
    #[error("invalid token `{0}`")]
    InvalidToken(Box<str>),
    #[error("expected a line break before {0}")]
    MissingTerminator(TokenKind),
    #[error("unexpected leading comma")]
    LeadingComma,
    #[error("unexpected trailing comma")]
    TrailingComma,
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("a declaration binding must not be a pattern that can fail to match")]
    RefutableBinding,
    #[error("constructor call outside of a class")]
    ConstructorOutsideClass,
    #[error("module `{0}` not found")]
    ModuleNotFound(Box<str>),
    #[error("could not read module `{}`: {reason}", path.display())]
    ModuleUnreadable { path: PathBuf, reason: Box<str> },
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error("could not read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Renders the diagnostic the way the driver prints it:
    ///
    /// ```text
    /// main.plume:3:7: Error: expected identifier, but got `{`
    /// class {
    ///       ^
    /// ```
    pub fn render(&self, files: &FileCache) -> String {
        match self {
            Error::Syntax(error) => error.render(files),
            Error::Io { .. } => format!("Error: {self}"),
        }
    }
}

impl SyntaxError {
    pub fn render(&self, files: &FileCache) -> String {
        let Location {
            ref file,
            line,
            column,
            ..
        } = self.location;
        let mut out = format!("{file}:{line}:{column}: Error: {}", self.kind);
        if let Some(text) = files.line(file, line) {
            // Tabs are kept so the caret lines up with the echoed source.
            let pad: String = text
                .chars()
                .take(column.saturating_sub(1) as usize)
                .map(|c| if c == '\t' { '\t' } else { ' ' })
                .collect();
            _ = write!(out, "\n{text}\n{pad}^");
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Operator;

    #[test]
    fn renders_caret_under_column() {
        let mut files = FileCache::default();
        files.insert("main.plume", "class A {}\n\tclass {\n");
        let mut location = Location::start_of("main.plume".into());
        location.step_line();
        for c in "\tclass ".chars() {
            location.step_column(c);
        }
        let error = SyntaxError::new(
            ErrorKind::Unexpected {
                expected: "identifier".into(),
                actual: TokenKind::Operator(Operator::LeftBrace),
            },
            location,
        );
        assert_eq!(
            Error::from(error).render(&files),
            "main.plume:2:8: Error: expected identifier, but got `{`\n\tclass {\n\t      ^"
        );
    }

    #[test]
    fn renders_without_source() {
        let files = FileCache::default();
        let error = SyntaxError::new(
            ErrorKind::ModuleNotFound("a.b".into()),
            Location::start_of("gone.plume".into()),
        );
        assert_eq!(
            error.render(&files),
            "gone.plume:1:1: Error: module `a.b` not found"
        );
    }
}
