//! Error types for every phase of the bridge.
//!
//! ```text
//! LexError / ParseError   - Tiny source could not be read
//! CompileError            - wraps the above plus semantic errors, per unit
//! SignatureError          - a signature string could not be parsed
//! RegistrationError       - a type, global or function could not be bound
//! ConversionError         - a ScriptValue had the wrong tag for a host type
//! NativeError             - a native function failed
//! RuntimeError            - script execution failed
//! ```

use std::fmt;

use thiserror::Error;

use crate::ids::ContextId;
use crate::span::Span;

// ============================================================================
// Lexer Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}'")]
    UnexpectedChar { ch: char, span: Span },

    #[error("unterminated string")]
    UnterminatedString { span: Span },

    #[error("unterminated comment")]
    UnterminatedComment { span: Span },

    #[error("invalid escape '\\{ch}'")]
    InvalidEscape { ch: char, span: Span },

    #[error("invalid number: {detail}")]
    InvalidNumber { span: Span, detail: String },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::UnterminatedComment { span }
            | LexError::InvalidEscape { span, .. }
            | LexError::InvalidNumber { span, .. } => *span,
        }
    }
}

// ============================================================================
// Parse Errors
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    ExpectedToken,
    UnexpectedToken,
    UnexpectedEof,
    ExpectedExpression,
    ExpectedIdentifier,
    ExpectedType,
    ExpectedBlock,
    ExpectedItem,
    InvalidAssignment,
    NestingTooDeep,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ParseErrorKind::ExpectedToken => "expected token",
            ParseErrorKind::UnexpectedToken => "unexpected token",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::ExpectedExpression => "expected expression",
            ParseErrorKind::ExpectedIdentifier => "expected identifier",
            ParseErrorKind::ExpectedType => "expected type",
            ParseErrorKind::ExpectedBlock => "expected block",
            ParseErrorKind::ExpectedItem => "expected 'func' or 'var'",
            ParseErrorKind::InvalidAssignment => "invalid assignment target",
            ParseErrorKind::NestingTooDeep => "nesting too deep",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for ParseError {}

// ============================================================================
// Compile Errors
// ============================================================================

/// What went wrong while compiling a unit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileErrorKind {
    #[error(transparent)]
    Lex(LexError),

    #[error(transparent)]
    Parse(ParseError),

    #[error("unknown identifier '{name}'")]
    UnknownIdentifier { name: String },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    #[error("'{name}' expects {expected} argument(s), found {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("function '{name}' is already defined")]
    DuplicateFunction { name: String },

    #[error("global '{name}' is already defined")]
    DuplicateGlobal { name: String },

    #[error("initializer of global '{name}' must be a literal")]
    NonLiteralGlobal { name: String },

    #[error("too many locals in '{function}'")]
    TooManyLocals { function: String },
}

/// A failed compile, carrying the interpreter's diagnostic.
///
/// Displays as `unit:line:col: message`, which is never empty.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{unit}:{span}: {kind}")]
pub struct CompileError {
    pub unit: String,
    pub span: Span,
    pub kind: CompileErrorKind,
}

impl CompileError {
    pub fn new(unit: impl Into<String>, span: Span, kind: CompileErrorKind) -> Self {
        Self {
            unit: unit.into(),
            span,
            kind,
        }
    }

    pub fn from_lex(unit: impl Into<String>, error: LexError) -> Self {
        Self::new(unit, error.span(), CompileErrorKind::Lex(error))
    }

    pub fn from_parse(unit: impl Into<String>, error: ParseError) -> Self {
        let span = error.span;
        Self::new(unit, span, CompileErrorKind::Parse(error))
    }

    /// The full diagnostic text.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

// ============================================================================
// Signature and Registration Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("empty signature")]
    Empty,

    #[error("signature '{signature}' is missing '('")]
    MissingOpenParen { signature: String },

    #[error("signature '{signature}' is missing ')'")]
    MissingCloseParen { signature: String },

    #[error("signature '{signature}' has an invalid function name")]
    InvalidName { signature: String },

    #[error("signature '{signature}' has an invalid type '{name}'")]
    InvalidType { signature: String, name: String },

    #[error("signature '{signature}' declares parameter {position} as void")]
    VoidParameter { signature: String, position: usize },

    #[error("signature '{signature}' has unexpected trailing input '{rest}'")]
    TrailingInput { signature: String, rest: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error("'{signature}' does not match the bound closure: {detail}")]
    SignatureMismatch { signature: String, detail: String },

    #[error("unknown type '{name}'")]
    UnknownType { name: String },

    #[error("'{name}' is not a valid type name")]
    InvalidTypeName { name: String },

    #[error("global '{name}' is already declared as {existing}, not {requested}")]
    GlobalTypeConflict {
        name: String,
        existing: String,
        requested: String,
    },
}

// ============================================================================
// Conversion and Native Errors
// ============================================================================

/// A script value could not be decoded into the requested host type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("native handle mismatch: expected {expected}, got {actual}")]
    NativeTypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("null handle cannot be converted to {target_type}")]
    NullHandle { target_type: &'static str },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    #[error("argument {index}: {source}")]
    Argument {
        index: usize,
        #[source]
        source: ConversionError,
    },

    #[error("argument {index} out of bounds ({count} given)")]
    ArgumentIndexOutOfBounds { index: usize, count: usize },

    #[error("no binding for '{name}' in {context}")]
    UnresolvedBinding { context: ContextId, name: String },

    #[error("{type_name} handle no longer refers to a live object")]
    StaleHandle { type_name: &'static str },

    #[error("{message}")]
    Other { message: String },
}

impl NativeError {
    pub fn other(message: impl Into<String>) -> Self {
        NativeError::Other {
            message: message.into(),
        }
    }
}

// ============================================================================
// Runtime Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("cannot apply '{op}' to {left} and {right}")]
    InvalidOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("cannot apply '{op}' to {operand}")]
    InvalidOperand {
        op: &'static str,
        operand: &'static str,
    },

    #[error("condition must be bool, got {actual}")]
    NonBoolCondition { actual: &'static str },

    #[error("division by zero")]
    DivisionByZero,

    #[error("stack overflow at call depth {depth}")]
    StackOverflow { depth: usize },

    #[error("no function at index {index}")]
    InvalidFunctionIndex { index: usize },

    #[error("no global at index {index}")]
    InvalidGlobalIndex { index: usize },

    #[error("'{function}' expects {expected} argument(s), got {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("nothing has been compiled")]
    NotCompiled,

    #[error("native function '{function}' failed: {source}")]
    Native {
        function: String,
        #[source]
        source: NativeError,
    },
}
