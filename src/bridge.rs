//! The host-owned hub shared by every script context.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tinybridge_core::{ContextId, Signature, SignatureHash};

use crate::live::LiveStateSet;
use crate::registry::{BindingKey, BindingTable, ErasedClosure};

struct Shared {
    live: RefCell<LiveStateSet>,
    table: RefCell<BindingTable>,
}

/// Live-context set plus binding table.
///
/// Cloning is cheap and every clone refers to the same state. Contexts
/// created from one `Bridge` never see bindings made through another.
#[derive(Clone)]
pub struct Bridge {
    shared: Rc<Shared>,
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new()
    }
}

impl Bridge {
    pub fn new() -> Self {
        Self {
            shared: Rc::new(Shared {
                live: RefCell::new(LiveStateSet::new()),
                table: RefCell::new(BindingTable::new()),
            }),
        }
    }

    pub(crate) fn allocate_context(&self) -> ContextId {
        self.shared.live.borrow_mut().allocate()
    }

    pub(crate) fn release_context(&self, id: ContextId) -> bool {
        self.shared.live.borrow_mut().release(id)
    }

    pub fn is_live(&self, id: ContextId) -> bool {
        self.shared.live.borrow().contains(id)
    }

    /// Number of contexts currently alive.
    pub fn live_contexts(&self) -> usize {
        self.shared.live.borrow().len()
    }

    /// Number of signature shapes that have a registry.
    pub fn registry_count(&self) -> usize {
        self.shared.table.borrow().len()
    }

    /// Entries in the registry for `hash`, dead or alive.
    pub fn registry_len(&self, hash: SignatureHash) -> usize {
        self.shared
            .table
            .borrow()
            .registry(hash)
            .map_or(0, |registry| registry.len())
    }

    /// Store `closure` for `(context, signature.name())` in the registry of
    /// the signature's shape. Only that registry is pruned.
    pub(crate) fn bind(&self, context: ContextId, signature: &Signature, closure: ErasedClosure) {
        let live = self.shared.live.borrow();
        let mut table = self.shared.table.borrow_mut();
        let registry = table.registry_mut(signature.shape_hash(), &signature.shape());
        let replaced = registry.bind(&live, BindingKey::new(context, signature.name()), closure);
        tracing::debug!(
            %context,
            %signature,
            replaced = replaced.is_some(),
            "bound native closure"
        );
    }

    /// The closure bound for `(context, name)` under `hash`, cloned out so
    /// the table is not borrowed while it runs.
    pub(crate) fn resolve(
        &self,
        hash: SignatureHash,
        context: ContextId,
        name: &str,
    ) -> Option<ErasedClosure> {
        self.shared.table.borrow().registry(hash)?.lookup(context, name)
    }

    /// Prune every registry now instead of waiting for the next bind.
    pub fn prune(&self) -> usize {
        let live = self.shared.live.borrow();
        self.shared.table.borrow_mut().prune_all(&live)
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("live_contexts", &self.live_contexts())
            .field("registries", &self.registry_count())
            .finish()
    }
}
