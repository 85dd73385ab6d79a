//! Script-visible handle types.

use tinybridge_core::impl_native_type;
use tinybridge_scene::{Action, NodeId};

/// A scene node as scripts see it (`Node`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle(pub NodeId);

impl_native_type!(NodeHandle => "Node");

/// An action description as scripts see it (`Action`).
#[derive(Debug, Clone, PartialEq)]
pub struct ActionHandle(pub Action);

impl_native_type!(ActionHandle => "Action");
