/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into declarations in
/// the [`tree::Tree`].
pub mod parser;

/// The process generator expands `process` declarations into the classes
/// implementing their message passing.
pub mod process;

pub mod ast;
pub mod context;
pub mod error;
pub mod names;
pub mod token;
pub mod tree;

pub mod util {
    pub mod fmt {
        pub mod tree;
    }
    pub mod intern;
    #[cfg(test)]
    pub(crate) mod test_utils;
}
