//! Interpreter state: one compile unit plus everything bound into it.

use rustc_hash::{FxHashMap, FxHashSet};
use tinybridge_core::{
    CompileError, ContextId, NativeFn, RegistrationError, ScriptType, ScriptValue, Signature,
    signature::is_identifier,
};

use crate::compiler::{Compiler, Program};

/// Who declared a global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalOrigin {
    /// Bound by the host with [`State::bind_global_var`].
    Host,
    /// Declared by a top-level `var` in compiled source.
    Script,
}

#[derive(Debug, Clone)]
pub struct GlobalSlot {
    pub name: String,
    pub ty: ScriptType,
    pub origin: GlobalOrigin,
}

/// A host function callable from scripts.
#[derive(Debug, Clone)]
pub struct ForeignFunction {
    pub signature: Signature,
    pub callable: NativeFn,
}

/// Compiled program, foreign functions, registered types and global
/// declarations for one script context.
///
/// Global *values* live in a [`Thread`](crate::Thread).
#[derive(Debug)]
pub struct State {
    id: ContextId,
    types: FxHashSet<String>,
    foreign: Vec<ForeignFunction>,
    foreign_index: FxHashMap<String, usize>,
    pub(crate) globals: Vec<GlobalSlot>,
    pub(crate) global_index: FxHashMap<String, usize>,
    pub(crate) program: Option<Program>,
}

impl State {
    pub fn new(id: ContextId) -> Self {
        Self {
            id,
            types: FxHashSet::default(),
            foreign: Vec::new(),
            foreign_index: FxHashMap::default(),
            globals: Vec::new(),
            global_index: FxHashMap::default(),
            program: None,
        }
    }

    /// Identity passed to every foreign call made on behalf of this state.
    pub fn id(&self) -> ContextId {
        self.id
    }

    // ========================================================================
    // Types
    // ========================================================================

    /// Declare an opaque type. Returns `false` if it was already known.
    pub fn register_type(&mut self, name: &str) -> Result<bool, RegistrationError> {
        if !is_identifier(name) || ScriptType::from_name(name).is_primitive() {
            return Err(RegistrationError::InvalidTypeName {
                name: name.to_string(),
            });
        }
        Ok(self.types.insert(name.to_string()))
    }

    /// Whether `name` is a registered opaque type.
    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains(name)
    }

    /// Whether `name` may appear in a declaration: a primitive or a registered type.
    pub fn knows_type(&self, name: &str) -> bool {
        match ScriptType::from_name(name) {
            ScriptType::Named(named) => self.types.contains(&named),
            _ => true,
        }
    }

    fn check_type(&self, ty: &ScriptType) -> Result<(), RegistrationError> {
        match ty {
            ScriptType::Named(name) if !self.types.contains(name) => {
                Err(RegistrationError::UnknownType { name: name.clone() })
            }
            _ => Ok(()),
        }
    }

    // ========================================================================
    // Foreign functions
    // ========================================================================

    /// Bind a host function under `signature.name()`.
    ///
    /// Rebinding a name replaces the callable in place, so code compiled
    /// against the old binding keeps working.
    pub fn bind_foreign_function(
        &mut self,
        signature: Signature,
        callable: NativeFn,
    ) -> Result<usize, RegistrationError> {
        for ty in signature.params().iter().chain(std::iter::once(signature.ret())) {
            self.check_type(ty)?;
        }

        let entry = ForeignFunction {
            signature,
            callable,
        };
        if let Some(&index) = self.foreign_index.get(entry.signature.name()) {
            self.foreign[index] = entry;
            return Ok(index);
        }

        let index = self.foreign.len();
        self.foreign_index
            .insert(entry.signature.name().to_string(), index);
        self.foreign.push(entry);
        Ok(index)
    }

    pub fn foreign_function_index(&self, name: &str) -> Option<usize> {
        self.foreign_index.get(name).copied()
    }

    pub fn foreign_function(&self, index: usize) -> Option<&ForeignFunction> {
        self.foreign.get(index)
    }

    pub fn foreign_function_count(&self) -> usize {
        self.foreign.len()
    }

    // ========================================================================
    // Globals
    // ========================================================================

    /// Declare a host global and return its slot.
    ///
    /// Declaring the same name with the same type again returns the existing
    /// slot.
    pub fn bind_global_var(&mut self, name: &str, type_name: &str) -> Result<usize, RegistrationError> {
        if !is_identifier(type_name) {
            return Err(RegistrationError::InvalidTypeName {
                name: type_name.to_string(),
            });
        }
        let ty = ScriptType::from_name(type_name);
        if ty == ScriptType::Void {
            return Err(RegistrationError::InvalidTypeName {
                name: type_name.to_string(),
            });
        }
        self.check_type(&ty)?;

        if let Some(&index) = self.global_index.get(name) {
            let existing = &self.globals[index];
            if existing.ty != ty {
                return Err(RegistrationError::GlobalTypeConflict {
                    name: name.to_string(),
                    existing: existing.ty.to_string(),
                    requested: ty.to_string(),
                });
            }
            return Ok(index);
        }

        let index = self.globals.len();
        self.globals.push(GlobalSlot {
            name: name.to_string(),
            ty,
            origin: GlobalOrigin::Host,
        });
        self.global_index.insert(name.to_string(), index);
        Ok(index)
    }

    pub fn global_index(&self, name: &str) -> Option<usize> {
        self.global_index.get(name).copied()
    }

    pub fn global_slot(&self, index: usize) -> Option<&GlobalSlot> {
        self.globals.get(index)
    }

    pub fn global_count(&self) -> usize {
        self.globals.len()
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    /// Compile `source` as this state's program.
    ///
    /// On failure nothing changes: the previous program, if any, stays
    /// callable.
    pub fn compile_string(&mut self, unit: &str, source: &str) -> Result<(), CompileError> {
        #[cfg(feature = "profiling")]
        profiling::scope!("State::compile_string");

        let arena = bumpalo::Bump::new();
        let script = tinybridge_parser::Parser::parse(source, &arena).map_err(|err| match err {
            tinybridge_parser::SyntaxError::Lex(err) => CompileError::from_lex(unit, err),
            tinybridge_parser::SyntaxError::Parse(err) => CompileError::from_parse(unit, err),
        })?;

        let output = Compiler::new(self, unit).compile(&script)?;
        tracing::debug!(
            unit,
            context = %self.id,
            functions = output.program.functions.len(),
            "compiled script unit"
        );

        self.globals = output.globals;
        self.global_index = output.global_index;
        self.program = Some(output.program);
        Ok(())
    }

    pub fn is_compiled(&self) -> bool {
        self.program.is_some()
    }

    /// Index of a compiled script function.
    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.program.as_ref()?.function_index.get(name).copied()
    }

    pub fn function_count(&self) -> usize {
        self.program.as_ref().map_or(0, |p| p.functions.len())
    }

    pub fn function_arity(&self, index: usize) -> Option<usize> {
        let function = self.program.as_ref()?.functions.get(index)?;
        Some(function.arity)
    }

    pub fn function_name(&self, index: usize) -> Option<&str> {
        let function = self.program.as_ref()?.functions.get(index)?;
        Some(&function.name)
    }

    /// Initial values of globals declared by the current program.
    pub(crate) fn script_global_inits(&self) -> &[(usize, ScriptValue)] {
        self.program.as_ref().map_or(&[], |p| &p.global_inits)
    }
}
