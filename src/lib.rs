//! Bridge between Tiny scripts and a host node graph.
//!
//! Host closures are bound into a [`ScriptContext`] under a signature
//! string. Each context gets a generation-tagged identity from the shared
//! [`Bridge`], which keeps one [`BindingRegistry`] per signature shape and
//! prunes entries whose context has since been dropped.
//!
//! ```
//! use tinybridge::{Bridge, ScriptContext};
//!
//! let bridge = Bridge::new();
//!
//! let mut first = ScriptContext::new(&bridge);
//! let mut second = ScriptContext::new(&bridge);
//! first.bind_function("greet(): str", || "A").unwrap();
//! second.bind_function("greet(): str", || "B").unwrap();
//!
//! let source = "func hello(): str { return greet() }";
//! first.compile(source).unwrap();
//! second.compile(source).unwrap();
//!
//! assert_eq!(first.call_function::<String, _>("hello", ()), "A");
//! assert_eq!(second.call_function::<String, _>("hello", ()), "B");
//! ```
//!
//! [`ScriptNode`] builds on top of this: it owns a scene subtree and binds a
//! catalog of node and action functions so scripts can build UI. A
//! [`ScriptWatcher`] reloads such a node whenever its source file changes.

mod binding;
mod bridge;
mod config;
mod context;
mod error;
mod facade;
mod live;
mod registry;
mod reload;

pub use binding::IntoNativeClosure;
pub use bridge::Bridge;
pub use config::{CatalogFlavor, NodeConfig};
pub use context::ScriptContext;
pub use error::{BridgeError, Result};
pub use facade::{ActionHandle, NodeHandle, PROMPT_INPUT_TAG, ScriptNode};
pub use live::LiveStateSet;
pub use registry::{BindingKey, BindingRegistry, BindingTable, ErasedClosure, erased};
pub use reload::ScriptWatcher;

pub use tinybridge_core::{
    CompileError, ContextId, FromScript, IntoArgs, IntoScript, NativeError, NativeReturn,
    ScriptType, ScriptValue, Signature, SignatureHash, impl_native_type,
};
pub use tinybridge_scene as scene;
