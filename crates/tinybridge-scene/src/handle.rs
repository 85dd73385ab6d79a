//! Shared ownership of a [`Scene`].
//!
//! Menu and tick callbacks receive a [`SceneHandle`] and may mutate the
//! scene. The handle never holds a borrow across a callback, so callbacks
//! are free to borrow it again.

use std::cell::{BorrowMutError, RefCell};
use std::rc::{Rc, Weak};

use crate::node::NodeId;
use crate::scene::{Scene, TickCallback};

#[derive(Clone, Default)]
pub struct SceneHandle(Rc<RefCell<Scene>>);

impl SceneHandle {
    pub fn new(scene: Scene) -> Self {
        Self(Rc::new(RefCell::new(scene)))
    }

    /// Borrow the scene.
    ///
    /// # Panics
    ///
    /// Panics if the scene is mutably borrowed.
    pub fn with<R>(&self, f: impl FnOnce(&Scene) -> R) -> R {
        f(&self.0.borrow())
    }

    /// Mutably borrow the scene.
    ///
    /// # Panics
    ///
    /// Panics if the scene is already borrowed.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Scene) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    /// Mutably borrow the scene unless it is already borrowed.
    pub fn try_with_mut<R>(&self, f: impl FnOnce(&mut Scene) -> R) -> Result<R, BorrowMutError> {
        let mut scene = self.0.try_borrow_mut()?;
        Ok(f(&mut scene))
    }

    pub fn downgrade(&self) -> WeakSceneHandle {
        WeakSceneHandle(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &SceneHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Advance one frame: actions first, then scheduled callbacks.
    pub fn tick(&self, dt: f32) {
        #[cfg(feature = "profiling")]
        profiling::scope!("SceneHandle::tick");

        let due = self.with_mut(|scene| {
            scene.advance_actions(dt);
            scene.due_callbacks()
        });
        for callback in due {
            callback(self, dt);
        }
    }

    /// Fire a menu item's callback. Returns `false` if the node is gone,
    /// is not a menu item, or has no callback.
    pub fn activate(&self, item: NodeId) -> bool {
        let callback = self.with(|scene| scene.menu_callback(item).ok().flatten());
        match callback {
            Some(callback) => {
                tracing::debug!(%item, "activating menu item");
                callback(self);
                true
            }
            None => false,
        }
    }

    pub fn schedule(&self, owner: NodeId, callback: TickCallback) {
        self.with_mut(|scene| scene.schedule(owner, callback));
    }
}

impl std::fmt::Debug for SceneHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_borrow() {
            Ok(scene) => f.debug_tuple("SceneHandle").field(&*scene).finish(),
            Err(_) => f.write_str("SceneHandle(<borrowed>)"),
        }
    }
}

/// Non-owning counterpart of [`SceneHandle`], held by callbacks that must
/// not keep the scene alive.
#[derive(Clone, Default)]
pub struct WeakSceneHandle(Weak<RefCell<Scene>>);

impl WeakSceneHandle {
    pub fn upgrade(&self) -> Option<SceneHandle> {
        self.0.upgrade().map(SceneHandle)
    }
}

impl std::fmt::Debug for WeakSceneHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WeakSceneHandle")
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::node::{NodeKind, Size};

    #[test]
    fn activate_runs_callback_outside_borrow() {
        let handle = SceneHandle::default();
        let item = handle.with_mut(|scene| {
            scene.create_menu_item(
                Some(Rc::new(|scene: &SceneHandle| {
                    scene.with_mut(|s| {
                        let root = s.root();
                        let child = s.create(NodeKind::Node);
                        s.add_child(root, child).unwrap();
                    });
                })),
                Size::new(10.0, 10.0),
            )
        });

        assert!(handle.activate(item));
        assert_eq!(handle.with(|s| s.children(s.root()).len()), 1);

        let plain = handle.with_mut(|s| s.create(NodeKind::Node));
        assert!(!handle.activate(plain));
    }

    #[test]
    fn scheduled_callbacks_stop_with_owner() {
        let handle = SceneHandle::default();
        let owner = handle.with_mut(|s| s.create(NodeKind::Node));
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        handle.schedule(owner, Rc::new(move |_, _| seen.set(seen.get() + 1)));

        handle.tick(0.016);
        handle.tick(0.016);
        assert_eq!(calls.get(), 2);

        handle.with_mut(|s| s.destroy(owner));
        handle.tick(0.016);
        assert_eq!(calls.get(), 2);
        assert_eq!(handle.with(|s| s.scheduled_count()), 0);
    }

    #[test]
    fn weak_handle_does_not_keep_scene() {
        let handle = SceneHandle::default();
        let weak = handle.downgrade();
        assert!(weak.upgrade().is_some());
        drop(handle);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn try_with_mut_reports_reentry() {
        let handle = SceneHandle::default();
        let inner = handle.clone();
        handle.with(|_| assert!(inner.try_with_mut(|_| ()).is_err()));
        assert!(handle.try_with_mut(|_| ()).is_ok());
    }
}
