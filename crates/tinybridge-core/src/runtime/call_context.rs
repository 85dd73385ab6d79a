//! Call context bridging the VM and native Rust functions.

use std::fmt;

use crate::convert::{FromScript, IntoScript};
use crate::error::NativeError;
use crate::ids::ContextId;
use crate::value::ScriptValue;

/// What a native function sees when the VM calls it.
///
/// Carries the identity of the calling script context, which is how a
/// trampoline finds the closure bound for that context.
///
/// ```ignore
/// let x: i32 = ctx.arg(0)?;
/// ctx.set_return(x * 2);
/// ```
pub struct CallContext<'vm> {
    context: ContextId,
    function: &'vm str,
    args: &'vm [ScriptValue],
    return_slot: &'vm mut ScriptValue,
}

impl<'vm> CallContext<'vm> {
    pub fn new(
        context: ContextId,
        function: &'vm str,
        args: &'vm [ScriptValue],
        return_slot: &'vm mut ScriptValue,
    ) -> Self {
        Self {
            context,
            function,
            args,
            return_slot,
        }
    }

    /// Identity of the script context making the call.
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Name of the function being called.
    pub fn function(&self) -> &str {
        self.function
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    pub fn args(&self) -> &[ScriptValue] {
        self.args
    }

    pub fn arg_slot(&self, index: usize) -> Result<&ScriptValue, NativeError> {
        self.args
            .get(index)
            .ok_or(NativeError::ArgumentIndexOutOfBounds {
                index,
                count: self.args.len(),
            })
    }

    /// Decode argument `index` as a `T`.
    pub fn arg<T: FromScript>(&self, index: usize) -> Result<T, NativeError> {
        let slot = self.arg_slot(index)?;
        T::from_script(slot).map_err(|source| NativeError::Argument { index, source })
    }

    pub fn set_return_slot(&mut self, value: ScriptValue) {
        *self.return_slot = value;
    }

    pub fn set_return<T: IntoScript>(&mut self, value: T) {
        *self.return_slot = value.into_script();
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("context", &self.context)
            .field("function", &self.function)
            .field("arg_count", &self.args.len())
            .finish()
    }
}
