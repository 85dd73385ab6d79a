//! Typed closures and the trampolines that dispatch to them.
//!
//! A closure such as `|x: i32| x * 2` is erased into an [`ErasedClosure`]
//! that decodes its arguments from the call context and encodes its result.
//! The VM never sees the closure itself. It sees one [`trampoline`] per bound
//! name, which finds the closure for the calling context in the bridge.

use tinybridge_core::{
    CallContext, FromScript, NativeError, NativeFn, NativeReturn, RegistrationError, ScriptType,
    Signature, SignatureHash,
};

use crate::bridge::Bridge;
use crate::registry::{ErasedClosure, erased};

/// A Rust closure that can be bound as a script function.
///
/// Implemented for `Fn` closures of up to six arguments whose parameters
/// implement [`FromScript`] and whose result implements [`NativeReturn`].
/// `Marker` only disambiguates the arities.
pub trait IntoNativeClosure<Marker> {
    fn param_types() -> Vec<ScriptType>;

    fn return_type() -> ScriptType;

    fn into_erased(self) -> ErasedClosure;
}

macro_rules! impl_into_native_closure {
    ($($arg:ident => $index:tt),*) => {
        impl<Func, Ret, $($arg,)*> IntoNativeClosure<fn($($arg,)*) -> Ret> for Func
        where
            Func: Fn($($arg),*) -> Ret + 'static,
            Ret: NativeReturn,
            $($arg: FromScript,)*
        {
            fn param_types() -> Vec<ScriptType> {
                vec![$(<$arg as FromScript>::expected_type()),*]
            }

            fn return_type() -> ScriptType {
                Ret::return_type()
            }

            #[allow(unused_variables)]
            fn into_erased(self) -> ErasedClosure {
                erased(move |ctx| {
                    let result = (self)($(ctx.arg::<$arg>($index)?),*);
                    result.into_native()
                })
            }
        }
    };
}

impl_into_native_closure!();
impl_into_native_closure!(A => 0);
impl_into_native_closure!(A => 0, B => 1);
impl_into_native_closure!(A => 0, B => 1, C => 2);
impl_into_native_closure!(A => 0, B => 1, C => 2, D => 3);
impl_into_native_closure!(A => 0, B => 1, C => 2, D => 3, E => 4);
impl_into_native_closure!(A => 0, B => 1, C => 2, D => 3, E => 4, F => 5);

/// Check that a closure with `params -> ret` can stand behind `signature`.
pub fn check_signature(
    signature: &Signature,
    params: &[ScriptType],
    ret: &ScriptType,
) -> Result<(), RegistrationError> {
    let mismatch = |detail: String| RegistrationError::SignatureMismatch {
        signature: signature.to_string(),
        detail,
    };

    if signature.arity() != params.len() {
        return Err(mismatch(format!(
            "closure takes {} arguments, signature declares {}",
            params.len(),
            signature.arity()
        )));
    }
    for (index, (declared, actual)) in signature.params().iter().zip(params).enumerate() {
        if !declared.accepts(actual) {
            return Err(mismatch(format!(
                "argument {index} is {declared} but the closure takes {actual}"
            )));
        }
    }
    if !signature.ret().accepts(ret) {
        return Err(mismatch(format!(
            "returns {} but the closure returns {ret}",
            signature.ret()
        )));
    }
    Ok(())
}

/// The VM-facing stub for one bound name.
///
/// On each call it looks up `(calling context, name)` in the registry for
/// `hash`. A miss is reported as [`NativeError::UnresolvedBinding`].
pub fn trampoline(bridge: Bridge, hash: SignatureHash, name: String) -> NativeFn {
    NativeFn::new(move |ctx: &mut CallContext| -> Result<(), NativeError> {
        let context = ctx.context();
        let Some(closure) = bridge.resolve(hash, context, &name) else {
            tracing::error!(%context, function = %name, "no binding for native call");
            return Err(NativeError::UnresolvedBinding {
                context,
                name: name.clone(),
            });
        };
        let value = closure(&*ctx)?;
        ctx.set_return_slot(value);
        Ok(())
    })
}
