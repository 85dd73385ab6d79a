use thiserror::Error;
use tinybridge_core::{LexError, ParseError, Span};

/// Either kind of front-end failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyntaxError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl SyntaxError {
    pub fn span(&self) -> Span {
        match self {
            SyntaxError::Lex(error) => error.span(),
            SyntaxError::Parse(error) => error.span,
        }
    }
}
