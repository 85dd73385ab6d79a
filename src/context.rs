//! One compiled script unit plus the thread that runs it.

use std::fmt;

use tinybridge_core::{
    CompileError, ContextId, FromScript, IntoArgs, IntoScript, ScriptValue, Signature,
};
use tinybridge_vm::{State, Thread};

use crate::binding::{IntoNativeClosure, check_signature, trampoline};
use crate::bridge::Bridge;
use crate::error::{BridgeError, Result};

/// A script context.
///
/// Created against a [`Bridge`], whose live set it joins until dropped.
/// Functions bound here are visible only to scripts compiled in this
/// context.
///
/// ```
/// use tinybridge::{Bridge, ScriptContext};
///
/// let bridge = Bridge::new();
/// let mut ctx = ScriptContext::new(&bridge);
/// ctx.bind_function("double(int): int", |x: i64| x * 2).unwrap();
/// ctx.compile("func run(): int { return double(21) }").unwrap();
///
/// assert_eq!(ctx.call_function::<i64, _>("run", ()), 42);
/// ```
pub struct ScriptContext {
    id: ContextId,
    unit_name: String,
    bridge: Bridge,
    // Declared before `state` so it is dropped first.
    thread: Thread,
    state: State,
}

impl ScriptContext {
    pub fn new(bridge: &Bridge) -> Self {
        Self::with_unit_name(bridge, "script")
    }

    /// A context whose diagnostics name `unit_name` as the source.
    pub fn with_unit_name(bridge: &Bridge, unit_name: &str) -> Self {
        let id = bridge.allocate_context();
        let state = State::new(id);
        let thread = Thread::new(&state);
        tracing::debug!(context = %id, unit = unit_name, "created script context");
        Self {
            id,
            unit_name: unit_name.to_string(),
            bridge: bridge.clone(),
            thread,
            state,
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    // ========================================================================
    // Types and globals
    // ========================================================================

    /// Declare an opaque type. Returns `true` the first time `name` is seen.
    pub fn register_type(&mut self, name: &str) -> bool {
        match self.state.register_type(name) {
            Ok(added) => added,
            Err(err) => {
                tracing::error!(context = %self.id, %err, "failed to register type");
                false
            }
        }
    }

    pub fn register_types<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        for name in names {
            self.register_type(name);
        }
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.state.has_type(name)
    }

    /// Declare a global of `type_name` and set it to `value`.
    ///
    /// Declaring the same name again with the same type just updates the
    /// value.
    pub fn bind_global_variable<T: IntoScript>(
        &mut self,
        name: &str,
        type_name: &str,
        value: T,
    ) -> Result<()> {
        let index = self.state.bind_global_var(name, type_name)?;
        self.thread.set_global(index, value.into_script());
        Ok(())
    }

    /// Current value of a global, host-bound or declared by the script.
    pub fn global(&self, name: &str) -> Option<ScriptValue> {
        let index = self.state.global_index(name)?;
        self.thread.global(index).cloned()
    }

    // ========================================================================
    // Native functions
    // ========================================================================

    /// Bind `closure` as the script function described by `signature`.
    ///
    /// The closure's parameter and return types must match the signature.
    /// Binding a name again replaces the previous closure.
    pub fn bind_function<M, F>(&mut self, signature: &str, closure: F) -> Result<()>
    where
        F: IntoNativeClosure<M>,
    {
        let signature = Signature::parse(signature)?;
        check_signature(&signature, &F::param_types(), &F::return_type())?;

        let stub = trampoline(
            self.bridge.clone(),
            signature.shape_hash(),
            signature.name().to_string(),
        );
        self.state.bind_foreign_function(signature.clone(), stub)?;
        self.bridge.bind(self.id, &signature, closure.into_erased());
        Ok(())
    }

    // ========================================================================
    // Compilation
    // ========================================================================

    /// Compile `source`, replacing the current program.
    ///
    /// On failure the previous program, bindings, types and globals are left
    /// as they were.
    pub fn compile(&mut self, source: &str) -> std::result::Result<(), CompileError> {
        #[cfg(feature = "profiling")]
        profiling::scope!("ScriptContext::compile");

        self.state.compile_string(&self.unit_name, source)?;
        self.thread.sync_globals(&self.state);
        Ok(())
    }

    pub fn is_compiled(&self) -> bool {
        self.state.is_compiled()
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.state.function_index(name).is_some()
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Call a script function and return its raw result.
    pub fn try_call_function<A: IntoArgs>(&mut self, name: &str, args: A) -> Result<ScriptValue> {
        #[cfg(feature = "profiling")]
        profiling::scope!("ScriptContext::call");

        let index = self
            .state
            .function_index(name)
            .ok_or_else(|| BridgeError::UnresolvedFunction {
                name: name.to_string(),
            })?;
        let args = args.into_args();
        tracing::trace!(context = %self.id, function = name, argc = args.len(), "calling script");
        Ok(self.thread.call_function(&self.state, index, &args)?)
    }

    /// Call a script function, logging any failure and returning
    /// `R::default()` in its place.
    pub fn call_function<R, A>(&mut self, name: &str, args: A) -> R
    where
        R: FromScript + Default,
        A: IntoArgs,
    {
        let value = match self.try_call_function(name, args) {
            Ok(value) => value,
            Err(BridgeError::UnresolvedFunction { name }) => {
                tracing::error!(context = %self.id, "Function '{name}' not found");
                return R::default();
            }
            Err(err) => {
                tracing::error!(context = %self.id, function = name, %err, "script call failed");
                return R::default();
            }
        };
        R::from_script(&value).unwrap_or_else(|err| {
            tracing::error!(context = %self.id, function = name, %err, "bad return value");
            R::default()
        })
    }
}

impl Drop for ScriptContext {
    fn drop(&mut self) {
        self.bridge.release_context(self.id);
        tracing::debug!(context = %self.id, "released script context");
    }
}

impl fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptContext")
            .field("id", &self.id)
            .field("unit_name", &self.unit_name)
            .field("compiled", &self.state.is_compiled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_releases_identity() {
        let bridge = Bridge::new();
        let ctx = ScriptContext::new(&bridge);
        let id = ctx.id();
        assert!(bridge.is_live(id));
        drop(ctx);
        assert!(!bridge.is_live(id));
        assert_eq!(bridge.live_contexts(), 0);
    }

    #[test]
    fn register_type_is_idempotent() {
        let bridge = Bridge::new();
        let mut ctx = ScriptContext::new(&bridge);
        assert!(ctx.register_type("Node"));
        assert!(!ctx.register_type("Node"));
        assert!(!ctx.register_type("int"));
        ctx.register_types(["Action", "Layer"]);
        assert!(ctx.has_type("Action"));
        assert!(ctx.has_type("Layer"));
    }

    #[test]
    fn globals_are_readable() {
        let bridge = Bridge::new();
        let mut ctx = ScriptContext::new(&bridge);
        ctx.bind_global_variable("limit", "int", 7).unwrap();
        ctx.compile("var greeting = \"hi\"\nfunc get(): int { return limit }").unwrap();

        assert_eq!(ctx.global("limit"), Some(ScriptValue::Int(7)));
        assert_eq!(ctx.global("greeting"), Some(ScriptValue::string("hi")));
        assert_eq!(ctx.call_function::<i64, _>("get", ()), 7);
        assert_eq!(ctx.global("missing"), None);
    }

    #[test]
    fn mismatched_closure_is_rejected() {
        let bridge = Bridge::new();
        let mut ctx = ScriptContext::new(&bridge);
        let err = ctx
            .bind_function("half(float): float", |x: i64| x / 2)
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Registration(tinybridge_core::RegistrationError::SignatureMismatch { .. })
        ));
        assert!(matches!(
            ctx.bind_function("broken(", || {}),
            Err(BridgeError::Signature(_))
        ));
    }

    #[test]
    fn unknown_type_in_signature_is_rejected() {
        let bridge = Bridge::new();
        let mut ctx = ScriptContext::new(&bridge);
        let err = ctx
            .bind_function("make(): Widget", || tinybridge_core::ScriptValue::Null)
            .unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Registration(tinybridge_core::RegistrationError::UnknownType { .. })
        ));
        assert_eq!(bridge.registry_count(), 0);
    }

    #[test]
    fn try_call_reports_missing_function() {
        let bridge = Bridge::new();
        let mut ctx = ScriptContext::new(&bridge);
        ctx.compile("func f() {}").unwrap();
        assert!(matches!(
            ctx.try_call_function("g", ()),
            Err(BridgeError::UnresolvedFunction { .. })
        ));
        assert_eq!(ctx.try_call_function("f", ()).unwrap(), ScriptValue::Null);
    }

    #[test]
    fn runtime_failure_falls_back_to_default() {
        let bridge = Bridge::new();
        let mut ctx = ScriptContext::new(&bridge);
        ctx.compile("func div(a: int, b: int): int { return a / b }").unwrap();
        assert_eq!(ctx.call_function::<i64, _>("div", (6, 3)), 2);
        assert_eq!(ctx.call_function::<i64, _>("div", (6, 0)), 0);
        assert_eq!(ctx.call_function::<String, _>("div", (6, 3)), "");
    }
}
