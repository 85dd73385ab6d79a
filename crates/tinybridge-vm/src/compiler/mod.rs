//! AST to bytecode compiler.
//!
//! Compilation runs in two passes over a [`Script`]:
//!
//! 1. Declare globals and function signatures, so functions may call each
//!    other regardless of order.
//! 2. Compile each function body into a [`Chunk`].
//!
//! Nothing in the [`State`] changes until both passes succeed.

mod scope;

use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tinybridge_core::{CompileError, CompileErrorKind, ScriptType, ScriptValue, Span};
use tinybridge_parser::ast::{
    BinaryOp, Block, Expr, ExprKind, FunctionDecl, Ident, Script, Stmt, TypeRef, UnaryOp,
};

use crate::bytecode::{Chunk, Constant, ConstantPool, Instr};
use crate::state::{GlobalOrigin, GlobalSlot, State};
use scope::LocalScope;

/// Upper bound on local slots in one function.
const MAX_LOCALS: u32 = u16::MAX as u32;

// ============================================================================
// Output
// ============================================================================

#[derive(Debug)]
pub(crate) struct CompiledFunction {
    pub name: String,
    pub arity: usize,
    /// Parameters plus locals.
    pub slots: usize,
    pub chunk: Chunk,
}

/// A compiled unit.
#[derive(Debug)]
pub(crate) struct Program {
    pub functions: Vec<CompiledFunction>,
    pub function_index: FxHashMap<String, usize>,
    pub constants: ConstantPool,
    /// Global slot and initial value for every top-level `var`.
    pub global_inits: Vec<(usize, ScriptValue)>,
}

pub(crate) struct CompileOutput {
    pub program: Program,
    pub globals: Vec<GlobalSlot>,
    pub global_index: FxHashMap<String, usize>,
}

// ============================================================================
// Unit compiler
// ============================================================================

pub(crate) struct Compiler<'s> {
    state: &'s State,
    unit: &'s str,
    globals: Vec<GlobalSlot>,
    global_index: FxHashMap<String, usize>,
    function_index: FxHashMap<String, usize>,
    arities: Vec<usize>,
    constants: ConstantPool,
}

impl<'s> Compiler<'s> {
    pub fn new(state: &'s State, unit: &'s str) -> Self {
        Self {
            state,
            unit,
            globals: state.globals.clone(),
            global_index: state.global_index.clone(),
            function_index: FxHashMap::default(),
            arities: Vec::new(),
            constants: ConstantPool::new(),
        }
    }

    pub fn compile(mut self, script: &Script<'_>) -> Result<CompileOutput, CompileError> {
        let global_inits = self.declare_globals(script)?;
        self.declare_functions(script)?;

        let mut functions = Vec::with_capacity(self.arities.len());
        for decl in script.functions() {
            functions.push(FunctionCompiler::new(&mut self, decl).compile()?);
        }

        Ok(CompileOutput {
            program: Program {
                functions,
                function_index: self.function_index,
                constants: self.constants,
                global_inits,
            },
            globals: self.globals,
            global_index: self.global_index,
        })
    }

    fn error(&self, span: Span, kind: CompileErrorKind) -> CompileError {
        CompileError::new(self.unit, span, kind)
    }

    fn duplicate_global(&self, name: Ident<'_>) -> CompileError {
        self.error(
            name.span,
            CompileErrorKind::DuplicateGlobal {
                name: name.name.to_string(),
            },
        )
    }

    fn resolve_function(&self, callee: Ident<'_>) -> Result<CallTarget, CompileError> {
        if let Some(&index) = self.function_index.get(callee.name) {
            return Ok(CallTarget::Script {
                index,
                arity: self.arities[index],
            });
        }
        if let Some(index) = self.state.foreign_function_index(callee.name) {
            let arity = self
                .state
                .foreign_function(index)
                .map_or(0, |f| f.signature.arity());
            return Ok(CallTarget::Foreign { index, arity });
        }
        Err(self.error(
            callee.span,
            CompileErrorKind::UnknownFunction {
                name: callee.name.to_string(),
            },
        ))
    }

    fn check_type(&self, ty: Option<TypeRef<'_>>) -> Result<(), CompileError> {
        match ty {
            Some(ty) if !self.state.knows_type(ty.name) => Err(self.error(
                ty.span,
                CompileErrorKind::UnknownType {
                    name: ty.name.to_string(),
                },
            )),
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Pass 1: declarations
    // ========================================================================

    fn declare_globals(&mut self, script: &Script<'_>) -> Result<Vec<(usize, ScriptValue)>, CompileError> {
        let mut inits = Vec::new();
        let mut declared = FxHashSet::default();

        for global in script.globals() {
            let name = global.name.name;
            self.check_type(global.ty)?;

            if !declared.insert(name) {
                return Err(self.duplicate_global(global.name));
            }

            let ty = global.ty.map_or(ScriptType::Any, |t| ScriptType::from_name(t.name));
            let value = match global.init {
                Some(init) => literal_value(init).ok_or_else(|| {
                    self.error(
                        init.span,
                        CompileErrorKind::NonLiteralGlobal {
                            name: name.to_string(),
                        },
                    )
                })?,
                None => default_value(&ty),
            };

            let index = match self.global_index.get(name).copied() {
                Some(index) if self.globals[index].origin == GlobalOrigin::Host => {
                    return Err(self.duplicate_global(global.name));
                }
                // Redeclared by a recompile of the same state.
                Some(index) => {
                    self.globals[index].ty = ty;
                    index
                }
                None => {
                    let index = self.globals.len();
                    self.globals.push(GlobalSlot {
                        name: name.to_string(),
                        ty,
                        origin: GlobalOrigin::Script,
                    });
                    self.global_index.insert(name.to_string(), index);
                    index
                }
            };
            inits.push((index, value));
        }

        Ok(inits)
    }

    fn declare_functions(&mut self, script: &Script<'_>) -> Result<(), CompileError> {
        for decl in script.functions() {
            let name = decl.name.name;
            if self.function_index.contains_key(name)
                || self.state.foreign_function_index(name).is_some()
            {
                return Err(self.error(
                    decl.name.span,
                    CompileErrorKind::DuplicateFunction {
                        name: name.to_string(),
                    },
                ));
            }
            for param in decl.params {
                self.check_type(param.ty)?;
            }
            self.check_type(decl.ret)?;

            self.function_index.insert(name.to_string(), self.arities.len());
            self.arities.push(decl.params.len());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum CallTarget {
    Script { index: usize, arity: usize },
    Foreign { index: usize, arity: usize },
}

impl CallTarget {
    fn arity(self) -> usize {
        match self {
            CallTarget::Script { arity, .. } | CallTarget::Foreign { arity, .. } => arity,
        }
    }
}

fn literal_value(expr: &Expr<'_>) -> Option<ScriptValue> {
    let value = match expr.kind {
        ExprKind::Int(v) => ScriptValue::Int(v),
        ExprKind::Float(v) => ScriptValue::Float(v),
        ExprKind::Str(s) => ScriptValue::string(s),
        ExprKind::Bool(v) => ScriptValue::Bool(v),
        ExprKind::Null => ScriptValue::Null,
        _ => return None,
    };
    Some(value)
}

fn default_value(ty: &ScriptType) -> ScriptValue {
    match ty {
        ScriptType::Bool => ScriptValue::Bool(false),
        ScriptType::Int => ScriptValue::Int(0),
        ScriptType::Float => ScriptValue::Float(0.0),
        ScriptType::Str => ScriptValue::string(""),
        _ => ScriptValue::Null,
    }
}

// ============================================================================
// Pass 2: function bodies
// ============================================================================

struct FunctionCompiler<'c, 's, 'ast> {
    unit: &'c mut Compiler<'s>,
    decl: &'c FunctionDecl<'ast>,
    chunk: Chunk,
    scope: LocalScope<'ast>,
}

impl<'c, 's, 'ast> FunctionCompiler<'c, 's, 'ast> {
    fn new(unit: &'c mut Compiler<'s>, decl: &'c FunctionDecl<'ast>) -> Self {
        Self {
            unit,
            decl,
            chunk: Chunk::new(),
            scope: LocalScope::new(),
        }
    }

    fn compile(mut self) -> Result<CompiledFunction, CompileError> {
        let decl = self.decl;
        for param in decl.params {
            self.scope.declare(param.name.name);
        }

        self.block(&decl.body)?;

        // Falling off the end returns null.
        let line = decl.body.span.line;
        self.chunk.write(Instr::PushNull, line);
        self.chunk.write(Instr::Return, line);

        if self.scope.slot_count() > MAX_LOCALS {
            return Err(self.unit.error(
                self.decl.name.span,
                CompileErrorKind::TooManyLocals {
                    function: self.decl.name.name.to_string(),
                },
            ));
        }

        Ok(CompiledFunction {
            name: self.decl.name.name.to_string(),
            arity: self.decl.params.len(),
            slots: self.scope.slot_count() as usize,
            chunk: self.chunk,
        })
    }

    fn emit(&mut self, instr: Instr, span: Span) -> usize {
        self.chunk.write(instr, span.line)
    }

    fn unknown_identifier(&self, ident: Ident<'_>) -> CompileError {
        self.unit.error(
            ident.span,
            CompileErrorKind::UnknownIdentifier {
                name: ident.name.to_string(),
            },
        )
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn block(&mut self, block: &Block<'ast>) -> Result<(), CompileError> {
        self.scope.push_block();
        for stmt in block.stmts {
            self.stmt(stmt)?;
        }
        self.scope.pop_block();
        Ok(())
    }

    fn stmt(&mut self, stmt: &Stmt<'ast>) -> Result<(), CompileError> {
        match *stmt {
            Stmt::Var { name, ty, init } => {
                self.unit.check_type(ty)?;
                match init {
                    Some(init) => self.expr(init)?,
                    None => {
                        let value = ty.map_or(ScriptValue::Null, |t| {
                            default_value(&ScriptType::from_name(t.name))
                        });
                        self.push_value(value, name.span);
                    }
                }
                // Declared after the initializer so `x := x + 1` reads the outer `x`.
                let slot = self.scope.declare(name.name);
                self.emit(Instr::StoreLocal(slot), name.span);
            }
            Stmt::Assign { target, value } => {
                self.expr(value)?;
                if let Some(slot) = self.scope.lookup(target.name) {
                    self.emit(Instr::StoreLocal(slot), target.span);
                } else if let Some(&index) = self.unit.global_index.get(target.name) {
                    self.emit(Instr::StoreGlobal(index as u32), target.span);
                } else {
                    return Err(self.unknown_identifier(target));
                }
            }
            Stmt::If {
                cond,
                ref then_block,
                else_branch,
            } => {
                self.expr(cond)?;
                let to_else = self.chunk.emit_jump(Instr::JumpIfFalse(u32::MAX), cond.span.line);
                self.block(then_block)?;
                match else_branch {
                    Some(branch) => {
                        let to_end = self.chunk.emit_jump(Instr::Jump(u32::MAX), cond.span.line);
                        self.chunk.patch_jump(to_else);
                        self.stmt(branch)?;
                        self.chunk.patch_jump(to_end);
                    }
                    None => self.chunk.patch_jump(to_else),
                }
            }
            Stmt::While { cond, ref body } => {
                let start = self.chunk.current_offset();
                self.expr(cond)?;
                let exit = self.chunk.emit_jump(Instr::JumpIfFalse(u32::MAX), cond.span.line);
                self.block(body)?;
                self.chunk.emit_loop(start, cond.span.line);
                self.chunk.patch_jump(exit);
            }
            Stmt::Return { value, span } => {
                match value {
                    Some(value) => self.expr(value)?,
                    None => {
                        self.emit(Instr::PushNull, span);
                    }
                }
                self.emit(Instr::Return, span);
            }
            Stmt::Block(ref block) => self.block(block)?,
            Stmt::Expr(expr) => {
                self.expr(expr)?;
                self.emit(Instr::Pop, expr.span);
            }
        }
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn push_value(&mut self, value: ScriptValue, span: Span) {
        let instr = match value {
            ScriptValue::Bool(true) => Instr::PushTrue,
            ScriptValue::Bool(false) => Instr::PushFalse,
            ScriptValue::Int(v) => Instr::Const(self.unit.constants.add(Constant::Int(v))),
            ScriptValue::Float(v) => Instr::Const(self.unit.constants.add(Constant::Float(v))),
            ScriptValue::Str(s) => Instr::Const(self.unit.constants.add(Constant::Str(s))),
            ScriptValue::Null | ScriptValue::Native(_) => Instr::PushNull,
        };
        self.emit(instr, span);
    }

    fn expr(&mut self, expr: &Expr<'ast>) -> Result<(), CompileError> {
        let span = expr.span;
        match expr.kind {
            ExprKind::Int(v) => self.push_value(ScriptValue::Int(v), span),
            ExprKind::Float(v) => self.push_value(ScriptValue::Float(v), span),
            ExprKind::Str(s) => self.push_value(ScriptValue::Str(Rc::from(s)), span),
            ExprKind::Bool(v) => self.push_value(ScriptValue::Bool(v), span),
            ExprKind::Null => {
                self.emit(Instr::PushNull, span);
            }
            ExprKind::Var(name) => {
                if let Some(slot) = self.scope.lookup(name) {
                    self.emit(Instr::LoadLocal(slot), span);
                } else if let Some(&index) = self.unit.global_index.get(name) {
                    self.emit(Instr::LoadGlobal(index as u32), span);
                } else {
                    return Err(self.unknown_identifier(Ident { name, span }));
                }
            }
            ExprKind::Call { callee, args } => self.call(callee, args, span)?,
            ExprKind::Unary { op, operand } => {
                self.expr(operand)?;
                let instr = match op {
                    UnaryOp::Neg => Instr::Neg,
                    UnaryOp::Not => Instr::Not,
                };
                self.emit(instr, span);
            }
            ExprKind::Binary { op, left, right } => self.binary(op, left, right, span)?,
        }
        Ok(())
    }

    fn call(&mut self, callee: Ident<'ast>, args: &[Expr<'ast>], span: Span) -> Result<(), CompileError> {
        let target = self.unit.resolve_function(callee)?;
        let expected = target.arity();
        if args.len() != expected || args.len() > u8::MAX as usize {
            return Err(self.unit.error(
                span,
                CompileErrorKind::ArityMismatch {
                    name: callee.name.to_string(),
                    expected,
                    found: args.len(),
                },
            ));
        }

        for arg in args {
            self.expr(arg)?;
        }

        let argc = args.len() as u8;
        let instr = match target {
            CallTarget::Script { index, .. } => Instr::Call {
                function: index as u32,
                argc,
            },
            CallTarget::Foreign { index, .. } => Instr::CallForeign {
                function: index as u32,
                argc,
            },
        };
        self.emit(instr, span);
        Ok(())
    }

    fn binary(
        &mut self,
        op: BinaryOp,
        left: &Expr<'ast>,
        right: &Expr<'ast>,
        span: Span,
    ) -> Result<(), CompileError> {
        let instr = match op {
            BinaryOp::And => return self.and(left, right, span),
            BinaryOp::Or => return self.or(left, right, span),
            BinaryOp::Add => Instr::Add,
            BinaryOp::Sub => Instr::Sub,
            BinaryOp::Mul => Instr::Mul,
            BinaryOp::Div => Instr::Div,
            BinaryOp::Rem => Instr::Rem,
            BinaryOp::Eq => Instr::Eq,
            BinaryOp::Ne => Instr::Ne,
            BinaryOp::Lt => Instr::Lt,
            BinaryOp::Le => Instr::Le,
            BinaryOp::Gt => Instr::Gt,
            BinaryOp::Ge => Instr::Ge,
        };
        self.expr(left)?;
        self.expr(right)?;
        self.emit(instr, span);
        Ok(())
    }

    /// `a && b`  =>  a; JumpIfFalse(F); b; CheckBool; Jump(end); F: false
    fn and(&mut self, left: &Expr<'ast>, right: &Expr<'ast>, span: Span) -> Result<(), CompileError> {
        self.expr(left)?;
        let to_false = self.chunk.emit_jump(Instr::JumpIfFalse(u32::MAX), span.line);
        self.expr(right)?;
        self.emit(Instr::CheckBool, right.span);
        let to_end = self.chunk.emit_jump(Instr::Jump(u32::MAX), span.line);
        self.chunk.patch_jump(to_false);
        self.emit(Instr::PushFalse, span);
        self.chunk.patch_jump(to_end);
        Ok(())
    }

    /// `a || b`  =>  a; JumpIfFalse(R); true; Jump(end); R: b; CheckBool
    fn or(&mut self, left: &Expr<'ast>, right: &Expr<'ast>, span: Span) -> Result<(), CompileError> {
        self.expr(left)?;
        let to_right = self.chunk.emit_jump(Instr::JumpIfFalse(u32::MAX), span.line);
        self.emit(Instr::PushTrue, span);
        let to_end = self.chunk.emit_jump(Instr::Jump(u32::MAX), span.line);
        self.chunk.patch_jump(to_right);
        self.expr(right)?;
        self.emit(Instr::CheckBool, right.span);
        self.chunk.patch_jump(to_end);
        Ok(())
    }
}
