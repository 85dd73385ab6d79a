//! Core types for the Tiny script bridge.
//!
//! This crate is the leaf of the workspace. It defines the value model that
//! crosses the script/host boundary and the plumbing every other crate uses:
//!
//! - [`ScriptValue`] and [`NativeRef`]: the interpreter's tagged value
//! - [`FromScript`] / [`IntoScript`]: the Value Converter
//! - [`Signature`] and [`ScriptType`]: parsed foreign function signatures
//! - [`ContextId`]: generation-tagged script context identity
//! - [`CallContext`] and [`NativeFn`]: how the VM calls into native code
//! - error types for every phase

pub mod convert;
pub mod error;
pub mod ids;
pub mod runtime;
pub mod signature;
pub mod span;
pub mod value;

pub use convert::{FromScript, IntoArgs, IntoScript, NativeReturn};
pub use error::{
    CompileError, CompileErrorKind, ConversionError, LexError, NativeError, ParseError,
    ParseErrorKind, RegistrationError, RuntimeError, SignatureError,
};
pub use ids::ContextId;
pub use runtime::{CallContext, NativeCallable, NativeFn};
pub use signature::{ScriptType, Signature, SignatureHash};
pub use span::Span;
pub use value::{NativeRef, ScriptValue};
