//! Tiny language front end.
//!
//! - [`lexer`]: source text to tokens
//! - [`ast`]: arena-allocated syntax tree and the recursive-descent [`Parser`]
//!
//! # Example
//!
//! ```
//! use bumpalo::Bump;
//! use tinybridge_parser::Parser;
//!
//! let arena = Bump::new();
//! let script = Parser::parse("func main() { pos(self(), 10, 20) }", &arena).unwrap();
//! assert_eq!(script.items.len(), 1);
//! ```

pub mod ast;
mod error;
pub mod lexer;

pub use ast::Parser;
pub use error::SyntaxError;
pub use lexer::{Lexer, Token, TokenKind};
