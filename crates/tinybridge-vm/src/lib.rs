//! Interpreter for the Tiny scripting language.
//!
//! A [`State`] owns a compiled unit and everything bound into it: foreign
//! functions, opaque type names and global declarations. A [`Thread`] runs
//! the state's functions and keeps the values of its globals.
//!
//! ```
//! use tinybridge_core::{CallContext, ContextId, NativeError, NativeFn, ScriptValue, Signature};
//! use tinybridge_vm::{State, Thread};
//!
//! let mut state = State::new(ContextId::new(0, 0));
//! state
//!     .bind_foreign_function(
//!         Signature::parse("twice(int): int").unwrap(),
//!         NativeFn::new(|ctx: &mut CallContext| -> Result<(), NativeError> {
//!             let x: i64 = ctx.arg(0)?;
//!             ctx.set_return(x * 2);
//!             Ok(())
//!         }),
//!     )
//!     .unwrap();
//! state
//!     .compile_string("demo", "func main(n: int): int { return twice(n) + 1 }")
//!     .unwrap();
//!
//! let mut thread = Thread::new(&state);
//! let main = state.function_index("main").unwrap();
//! let out = thread.call_function(&state, main, &[ScriptValue::Int(20)]).unwrap();
//! assert_eq!(out, ScriptValue::Int(41));
//! ```

pub mod bytecode;
mod compiler;
mod state;
mod thread;


pub use state::{ForeignFunction, GlobalOrigin, GlobalSlot, State};
pub use thread::{MAX_CALL_DEPTH, Thread};
