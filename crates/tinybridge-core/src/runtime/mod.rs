//! Native function storage and the call context the VM hands to it.
//!
//! - [`NativeFn`]: type-erased callable registered with the VM
//! - [`CallContext`]: arguments, calling context identity and return slot

mod call_context;
mod native_fn;

pub use call_context::CallContext;
pub use native_fn::{NativeCallable, NativeFn};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConversionError, NativeError};
    use crate::ids::ContextId;
    use crate::value::ScriptValue;

    #[test]
    fn native_fn_reads_args_and_sets_return() {
        let add = NativeFn::new(|ctx: &mut CallContext| -> Result<(), NativeError> {
            let a: i64 = ctx.arg(0)?;
            let b: i64 = ctx.arg(1)?;
            ctx.set_return(a + b);
            Ok(())
        });

        let args = [ScriptValue::Int(10), ScriptValue::Int(20)];
        let mut ret = ScriptValue::Null;
        let mut ctx = CallContext::new(ContextId::new(0, 0), "add", &args, &mut ret);
        add.call(&mut ctx).unwrap();

        assert_eq!(ret, ScriptValue::Int(30));
    }

    #[test]
    fn context_identity_is_visible() {
        let args: [ScriptValue; 0] = [];
        let mut ret = ScriptValue::Null;
        let ctx = CallContext::new(ContextId::new(4, 1), "f", &args, &mut ret);
        assert_eq!(ctx.context(), ContextId::new(4, 1));
        assert_eq!(ctx.function(), "f");
        assert_eq!(ctx.arg_count(), 0);
    }

    #[test]
    fn missing_argument_is_an_error() {
        let args = [ScriptValue::Int(1)];
        let mut ret = ScriptValue::Null;
        let ctx = CallContext::new(ContextId::new(0, 0), "f", &args, &mut ret);
        assert_eq!(
            ctx.arg::<i32>(3),
            Err(NativeError::ArgumentIndexOutOfBounds { index: 3, count: 1 })
        );
    }

    #[test]
    fn argument_conversion_failure_names_position() {
        let args = [ScriptValue::Int(1), ScriptValue::string("x")];
        let mut ret = ScriptValue::Null;
        let ctx = CallContext::new(ContextId::new(0, 0), "f", &args, &mut ret);
        assert_eq!(
            ctx.arg::<i32>(1),
            Err(NativeError::Argument {
                index: 1,
                source: ConversionError::TypeMismatch {
                    expected: "int",
                    actual: "str"
                }
            })
        );
    }

    #[test]
    fn clones_share_the_callable() {
        let f = NativeFn::new(|ctx: &mut CallContext| -> Result<(), NativeError> {
            ctx.set_return(true);
            Ok(())
        });
        let g = f.clone();
        let mut ret = ScriptValue::Null;
        let mut ctx = CallContext::new(ContextId::new(0, 0), "g", &[], &mut ret);
        g.call(&mut ctx).unwrap();
        assert_eq!(ret, ScriptValue::Bool(true));
    }
}
