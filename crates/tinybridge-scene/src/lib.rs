//! Headless node graph used as the host side of the Tiny bridge.
//!
//! A [`Scene`] owns every node in a generational arena. Nodes form a tree
//! under [`Scene::root`], carry a transform and an optional colour, run
//! [`Action`]s over time and may have per-tick callbacks scheduled on them.
//! [`SceneHandle`] shares a scene between the host and the callbacks that
//! scripts install.
//!
//! ```
//! use tinybridge_scene::{Action, Point, SceneHandle};
//!
//! let scene = SceneHandle::default();
//! let label = scene.with_mut(|s| {
//!     let root = s.root();
//!     let label = s.create_label("hello", "bigFont.fnt");
//!     s.add_child(root, label).unwrap();
//!     s.run_action(label, Action::MoveTo { duration: 1.0, to: Point::new(10.0, 0.0) })
//!         .unwrap();
//!     label
//! });
//!
//! scene.tick(1.0);
//! assert_eq!(scene.with(|s| s.get(label).unwrap().position), Point::new(10.0, 0.0));
//! ```

mod action;
mod error;
mod handle;
mod node;
mod resources;
mod scene;

pub use action::{Action, RunningAction};
pub use error::SceneError;
pub use handle::{SceneHandle, WeakSceneHandle};
pub use node::{
    Axis, Color3, Label, Layout, MenuCallback, Node, NodeId, NodeKind, Point, Rgba, Size, TextInput,
};
pub use resources::{FontMetrics, Resources};
pub use scene::{Scene, TickCallback};
