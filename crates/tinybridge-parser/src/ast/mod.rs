//! Syntax tree for Tiny scripts.
//!
//! All nodes live in a [`bumpalo::Bump`] arena for the duration of one
//! compile; `'ast` is the arena lifetime.

mod parser;

pub use parser::Parser;

use std::fmt;

use tinybridge_core::Span;

use crate::lexer::TokenKind;

/// A parsed compile unit.
#[derive(Debug, Clone, Copy)]
pub struct Script<'ast> {
    pub items: &'ast [Item<'ast>],
}

impl<'ast> Script<'ast> {
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl<'ast>> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(func) => Some(func),
            Item::Global(_) => None,
        })
    }

    pub fn globals(&self) -> impl Iterator<Item = &GlobalDecl<'ast>> {
        self.items.iter().filter_map(|item| match item {
            Item::Global(global) => Some(global),
            Item::Function(_) => None,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Item<'ast> {
    Function(FunctionDecl<'ast>),
    Global(GlobalDecl<'ast>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ident<'ast> {
    pub name: &'ast str,
    pub span: Span,
}

/// A type annotation; only the name is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRef<'ast> {
    pub name: &'ast str,
    pub span: Span,
}

/// `func name(params)[: ret] { body }`
#[derive(Debug, Clone, Copy)]
pub struct FunctionDecl<'ast> {
    pub name: Ident<'ast>,
    pub params: &'ast [Param<'ast>],
    pub ret: Option<TypeRef<'ast>>,
    pub body: Block<'ast>,
}

#[derive(Debug, Clone, Copy)]
pub struct Param<'ast> {
    pub name: Ident<'ast>,
    pub ty: Option<TypeRef<'ast>>,
}

/// Top-level `var name[: type] [= literal]`.
#[derive(Debug, Clone, Copy)]
pub struct GlobalDecl<'ast> {
    pub name: Ident<'ast>,
    pub ty: Option<TypeRef<'ast>>,
    pub init: Option<&'ast Expr<'ast>>,
}

#[derive(Debug, Clone, Copy)]
pub struct Block<'ast> {
    pub stmts: &'ast [Stmt<'ast>],
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub enum Stmt<'ast> {
    /// `var x[: T] [= e]` or `x := e`
    Var {
        name: Ident<'ast>,
        ty: Option<TypeRef<'ast>>,
        init: Option<&'ast Expr<'ast>>,
    },
    /// `x = e`
    Assign {
        target: Ident<'ast>,
        value: &'ast Expr<'ast>,
    },
    If {
        cond: &'ast Expr<'ast>,
        then_block: Block<'ast>,
        /// Either a block or a nested `if` for `else if`.
        else_branch: Option<&'ast Stmt<'ast>>,
    },
    While {
        cond: &'ast Expr<'ast>,
        body: Block<'ast>,
    },
    Return {
        value: Option<&'ast Expr<'ast>>,
        span: Span,
    },
    Block(Block<'ast>),
    Expr(&'ast Expr<'ast>),
}

#[derive(Debug, Clone, Copy)]
pub struct Expr<'ast> {
    pub kind: ExprKind<'ast>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub enum ExprKind<'ast> {
    Int(i64),
    Float(f32),
    Str(&'ast str),
    Bool(bool),
    Null,
    Var(&'ast str),
    Call {
        callee: Ident<'ast>,
        args: &'ast [Expr<'ast>],
    },
    Unary {
        op: UnaryOp,
        operand: &'ast Expr<'ast>,
    },
    Binary {
        op: BinaryOp,
        left: &'ast Expr<'ast>,
        right: &'ast Expr<'ast>,
    },
}

impl ExprKind<'_> {
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            ExprKind::Int(_) | ExprKind::Float(_) | ExprKind::Str(_) | ExprKind::Bool(_) | ExprKind::Null
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    /// Prefix operators bind tighter than any binary operator.
    pub const BINDING_POWER: u8 = 13;

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        let op = match kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Rem,
            TokenKind::EqualEqual => BinaryOp::Eq,
            TokenKind::NotEqual => BinaryOp::Ne,
            TokenKind::Less => BinaryOp::Lt,
            TokenKind::LessEqual => BinaryOp::Le,
            TokenKind::Greater => BinaryOp::Gt,
            TokenKind::GreaterEqual => BinaryOp::Ge,
            TokenKind::AndAnd => BinaryOp::And,
            TokenKind::OrOr => BinaryOp::Or,
            _ => return None,
        };
        Some(op)
    }

    /// Left and right binding power; all binary operators are left-associative.
    pub fn binding_power(self) -> (u8, u8) {
        match self {
            BinaryOp::Or => (1, 2),
            BinaryOp::And => (3, 4),
            BinaryOp::Eq | BinaryOp::Ne => (5, 6),
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => (7, 8),
            BinaryOp::Add | BinaryOp::Sub => (9, 10),
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => (11, 12),
        }
    }

    pub fn is_short_circuit(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
