//! Hot reload of a script node from a file on disk.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::SystemTime;

use tinybridge_scene::{Node, NodeId, SceneHandle};

use crate::bridge::Bridge;
use crate::config::NodeConfig;
use crate::error::BridgeError;
use crate::facade::ScriptNode;

/// Rebuilds a [`ScriptNode`] whenever its source file changes.
///
/// A failed read or compile keeps whatever node is currently shown.
#[derive(Debug)]
pub struct ScriptWatcher {
    path: PathBuf,
    config: NodeConfig,
    modified: Option<SystemTime>,
    current: Option<ScriptNode>,
}

impl ScriptWatcher {
    pub fn new(path: impl Into<PathBuf>, config: NodeConfig) -> Self {
        Self {
            path: path.into(),
            config,
            modified: None,
            current: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The node built from the last source that compiled.
    pub fn current(&self) -> Option<&ScriptNode> {
        self.current.as_ref()
    }

    /// Check the file once. Returns `true` if a new node replaced the old one.
    pub fn poll(&mut self, scene: &SceneHandle, bridge: &Bridge, parent: NodeId) -> bool {
        let Ok(modified) = fs::metadata(&self.path).and_then(|meta| meta.modified()) else {
            return false;
        };
        if self.modified == Some(modified) {
            return false;
        }
        // Recorded up front so a broken file is not recompiled every frame.
        self.modified = Some(modified);

        let source = match fs::read_to_string(&self.path) {
            Ok(source) => source,
            Err(source) => {
                let err = BridgeError::Io {
                    path: self.path.clone(),
                    source,
                };
                tracing::error!(%err, "reload failed");
                return false;
            }
        };

        let node = match ScriptNode::create(scene, bridge, &source, &self.config) {
            Ok(node) => node,
            Err(err) => {
                tracing::error!(path = %self.path.display(), %err, "reload failed, keeping previous node");
                return false;
            }
        };

        // Attach before touching the shown node so a failure leaves it in place.
        let root = node.root();
        let attached = scene.try_with_mut(|s| -> Result<(), tinybridge_scene::SceneError> {
            s.add_child(parent, root)?;
            s.node_mut(root)?.z_order = self.config.z_order;
            s.center_in_parent(root)?;
            let id = self.config.node_id.as_str();
            let stale: Vec<NodeId> = s
                .children(parent)
                .iter()
                .copied()
                .filter(|&child| child != root && s.get(child).and_then(Node::id) == Some(id))
                .collect();
            for old in stale {
                s.destroy(old);
            }
            s.set_id(root, &self.config.node_id)
        });
        match attached {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::error!(%err, "could not attach reloaded node, keeping previous node");
                return false;
            }
            Err(_) => {
                tracing::error!("{}, keeping previous node", BridgeError::SceneBusy);
                return false;
            }
        }

        tracing::debug!(path = %self.path.display(), node = %root, "reloaded script node");
        // The old node tears down whatever is left of its subtree when dropped.
        drop(self.current.replace(node));
        true
    }

    /// Poll once per scene tick for as long as `parent` lives.
    pub fn install(
        self,
        scene: &SceneHandle,
        bridge: &Bridge,
        parent: NodeId,
    ) -> Rc<RefCell<ScriptWatcher>> {
        let watcher = Rc::new(RefCell::new(self));
        let polled = Rc::clone(&watcher);
        let bridge = bridge.clone();
        scene.schedule(
            parent,
            Rc::new(move |scene: &SceneHandle, _dt: f32| {
                if let Ok(mut watcher) = polled.try_borrow_mut() {
                    watcher.poll(scene, &bridge, parent);
                }
            }),
        );
        watcher
    }
}
