//! Script-driven scene nodes.
//!
//! A [`ScriptNode`] owns a subtree of the scene and a [`ScriptContext`] whose
//! catalog of bound functions lets the script build and animate that
//! subtree. Scripts only reach the scene through the catalog.
//!
//! Closures in the catalog hold the scene and the context weakly, so a
//! script node that has been dropped cannot be reached through a stale
//! button or dialog callback.

mod catalog;
mod dialog;
mod handles;

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;
use tinybridge_core::{ContextId, FromScript, IntoArgs, NativeError};
use tinybridge_scene::{Node, NodeId, NodeKind, Scene, SceneError, SceneHandle, WeakSceneHandle};

use crate::bridge::Bridge;
use crate::config::NodeConfig;
use crate::context::ScriptContext;
use crate::error::{BridgeError, Result};

pub use dialog::PROMPT_INPUT_TAG;
pub use handles::{ActionHandle, NodeHandle};

type NodeMap = Rc<RefCell<FxHashMap<String, NodeId>>>;

/// A scene subtree driven by a script.
pub struct ScriptNode {
    scene: WeakSceneHandle,
    root: NodeId,
    menu: NodeId,
    globals: NodeMap,
    created: Rc<RefCell<Vec<NodeId>>>,
    context: Rc<RefCell<ScriptContext>>,
}

impl ScriptNode {
    /// Build a node from `source`: create the subtree, bind the catalog for
    /// `config.flavor`, compile, then run the entry point if there is one.
    ///
    /// The new root is left detached; attach it wherever it belongs.
    pub fn create(
        scene: &SceneHandle,
        bridge: &Bridge,
        source: &str,
        config: &NodeConfig,
    ) -> Result<ScriptNode> {
        let (root, menu) = scene
            .try_with_mut(|s| -> std::result::Result<_, SceneError> {
                let root = s.create(NodeKind::Node);
                let menu = s.create(NodeKind::Menu);
                s.add_child(root, menu)?;
                Ok((root, menu))
            })
            .map_err(|_| BridgeError::SceneBusy)??;

        let mut context = ScriptContext::with_unit_name(bridge, &config.unit_name);
        context.register_types(["Node", "Action"]);

        let node = ScriptNode {
            scene: scene.downgrade(),
            root,
            menu,
            globals: NodeMap::default(),
            created: Rc::default(),
            context: Rc::new(RefCell::new(context)),
        };
        let env = NodeEnv {
            scene: node.scene.clone(),
            root,
            menu,
            context: Rc::downgrade(&node.context),
            globals: Rc::clone(&node.globals),
            created: Rc::clone(&node.created),
            config: Rc::new(config.clone()),
        };

        {
            let mut ctx = node.context.borrow_mut();
            catalog::install(&mut ctx, &env)?;
            if let Err(err) = ctx.compile(source) {
                tracing::error!("Error: {err}");
                return Err(err.into());
            }
        }

        if node.context.borrow().has_function(&config.entry_point) {
            node.context
                .borrow_mut()
                .call_function::<(), _>(&config.entry_point, ());
        }
        Ok(node)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// The menu that holds this node's buttons.
    pub fn menu(&self) -> NodeId {
        self.menu
    }

    pub fn context(&self) -> &Rc<RefCell<ScriptContext>> {
        &self.context
    }

    pub fn context_id(&self) -> ContextId {
        self.context.borrow().id()
    }

    /// Make `node` reachable from the script as `getGlobal(name)`.
    pub fn bind_global(&self, name: &str, node: NodeId) {
        self.globals.borrow_mut().insert(name.to_string(), node);
    }

    /// Call a script function, logging failures and returning
    /// `R::default()` in their place.
    pub fn call<R, A>(&self, name: &str, args: A) -> R
    where
        R: FromScript + Default,
        A: IntoArgs,
    {
        match self.context.try_borrow_mut() {
            Ok(mut ctx) => ctx.call_function(name, args),
            Err(_) => {
                tracing::error!(function = name, "{}", BridgeError::ContextBusy);
                R::default()
            }
        }
    }

    /// Whether the scene still holds this node's root.
    pub fn is_alive(&self) -> bool {
        self.scene
            .upgrade()
            .is_some_and(|scene| scene.with(|s| s.contains(self.root)))
    }

    pub fn scene(&self) -> Option<SceneHandle> {
        self.scene.upgrade()
    }
}

impl Drop for ScriptNode {
    fn drop(&mut self) {
        let Some(scene) = self.scene.upgrade() else {
            return;
        };
        let created = std::mem::take(&mut *self.created.borrow_mut());
        let root = self.root;
        let destroyed = scene.try_with_mut(|s| {
            let mut count = s.destroy(root);
            // Nodes the script built but never attached anywhere.
            for id in created {
                if s.contains(id) && s.parent(id).is_none() {
                    count += s.destroy(id);
                }
            }
            count
        });
        match destroyed {
            Ok(count) => tracing::debug!(node = %root, count, "destroyed script node"),
            Err(_) => tracing::warn!(node = %root, "scene busy, script node left in place"),
        }
    }
}

impl fmt::Debug for ScriptNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptNode")
            .field("root", &self.root)
            .field("menu", &self.menu)
            .field("context", &self.context)
            .finish()
    }
}

// ============================================================================
// Environment captured by catalog closures
// ============================================================================

#[derive(Clone)]
pub(crate) struct NodeEnv {
    scene: WeakSceneHandle,
    root: NodeId,
    menu: NodeId,
    context: Weak<RefCell<ScriptContext>>,
    globals: NodeMap,
    created: Rc<RefCell<Vec<NodeId>>>,
    config: Rc<NodeConfig>,
}

fn stale_node() -> NativeError {
    NativeError::StaleHandle { type_name: "Node" }
}

fn scene_error(err: SceneError) -> NativeError {
    match err {
        SceneError::StaleNode { .. } => stale_node(),
        other => NativeError::other(other.to_string()),
    }
}

impl NodeEnv {
    fn config(&self) -> &NodeConfig {
        &self.config
    }

    fn scene(&self) -> std::result::Result<SceneHandle, NativeError> {
        self.scene
            .upgrade()
            .ok_or_else(|| NativeError::other("scene is gone"))
    }

    fn with_scene<R>(&self, f: impl FnOnce(&mut Scene) -> R) -> std::result::Result<R, NativeError> {
        self.scene()?
            .try_with_mut(f)
            .map_err(|_| NativeError::other("scene is already borrowed"))
    }

    /// Run a scene operation, mapping its error for the script.
    fn try_scene<R>(
        &self,
        f: impl FnOnce(&mut Scene) -> std::result::Result<R, SceneError>,
    ) -> std::result::Result<R, NativeError> {
        self.with_scene(f)?.map_err(scene_error)
    }

    /// Mutate a node and hand it back for chaining.
    fn update(
        &self,
        node: NodeHandle,
        f: impl FnOnce(&mut Node),
    ) -> std::result::Result<NodeHandle, NativeError> {
        self.with_scene(|s| s.get_mut(node.0).map(f))?
            .ok_or_else(stale_node)?;
        Ok(node)
    }

    fn read<R>(&self, node: NodeHandle, f: impl FnOnce(&Node) -> R) -> std::result::Result<R, NativeError> {
        self.with_scene(|s| s.get(node.0).map(f))?
            .ok_or_else(stale_node)
    }

    /// Run an operation needing a capability the node may lack. A missing
    /// capability is logged and skipped.
    fn capability(
        &self,
        node: NodeHandle,
        f: impl FnOnce(&mut Scene) -> std::result::Result<(), SceneError>,
    ) -> std::result::Result<NodeHandle, NativeError> {
        match self.with_scene(f)? {
            Ok(()) => Ok(node),
            Err(err @ SceneError::MissingCapability { .. }) => {
                tracing::error!(%err, "skipping unsupported operation");
                Ok(node)
            }
            Err(err) => Err(scene_error(err)),
        }
    }

    /// Remember a node the script created so it is cleaned up with us.
    fn track(&self, id: NodeId) {
        self.created.borrow_mut().push(id);
    }

    /// Track `id` and attach it under this node's root.
    fn adopt(&self, scene: &mut Scene, id: NodeId) -> NodeHandle {
        self.track(id);
        if let Err(err) = scene.add_child(self.root, id) {
            tracing::warn!(%err, node = %id, "could not attach new node");
        }
        NodeHandle(id)
    }

    fn global(&self, name: &str) -> Option<NodeHandle> {
        self.globals.borrow().get(name).copied().map(NodeHandle)
    }
}

/// Call back into a script context from a deferred host event.
pub(crate) fn invoke<A: IntoArgs>(context: &Weak<RefCell<ScriptContext>>, name: &str, args: A) {
    let Some(context) = context.upgrade() else {
        tracing::warn!(function = name, "script context is gone, callback dropped");
        return;
    };
    let Ok(mut ctx) = context.try_borrow_mut() else {
        tracing::error!(function = name, "{}", BridgeError::ContextBusy);
        return;
    };
    ctx.call_function::<(), A>(name, args);
}
