use thiserror::Error;

use crate::node::NodeId;

/// Errors from scene graph operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("{id} no longer exists")]
    StaleNode { id: NodeId },

    #[error("{kind} node {id} does not support {capability}")]
    MissingCapability {
        id: NodeId,
        kind: &'static str,
        capability: &'static str,
    },

    #[error("cannot attach {child} under {parent}: it would become its own ancestor")]
    Cycle { parent: NodeId, child: NodeId },
}
