use std::path::PathBuf;

use thiserror::Error;
use tinybridge_core::{
    CompileError, ConversionError, NativeError, RegistrationError, RuntimeError, SignatureError,
};
use tinybridge_scene::SceneError;

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Anything the bridge can fail with.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Signature(#[from] SignatureError),

    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Native(#[from] NativeError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error("function '{name}' not found")]
    UnresolvedFunction { name: String },

    #[error("script context is already running")]
    ContextBusy,

    #[error("scene is already borrowed")]
    SceneBusy,

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
