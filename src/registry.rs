//! Per-signature binding registries.
//!
//! Every bound function shape (parameter types plus return type) gets its own
//! [`BindingRegistry`], mapping `(context, name)` to the closure that context
//! bound. Entries belonging to dead contexts are pruned lazily, right before
//! the next insertion into the same registry.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tinybridge_core::{CallContext, ContextId, NativeError, ScriptValue, SignatureHash};

use crate::live::LiveStateSet;

/// A bound closure with its argument and return types erased.
pub type ErasedClosure = Rc<dyn Fn(&CallContext<'_>) -> Result<ScriptValue, NativeError>>;

/// Box `f` as an [`ErasedClosure`].
pub fn erased<F>(f: F) -> ErasedClosure
where
    F: Fn(&CallContext<'_>) -> Result<ScriptValue, NativeError> + 'static,
{
    Rc::new(f)
}

/// Identifies one registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingKey {
    pub context: ContextId,
    pub name: String,
}

impl BindingKey {
    pub fn new(context: ContextId, name: impl Into<String>) -> Self {
        Self {
            context,
            name: name.into(),
        }
    }
}

impl fmt::Display for BindingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.context, self.name)
    }
}

/// Closures bound under one signature shape.
pub struct BindingRegistry {
    shape: String,
    entries: FxHashMap<ContextId, FxHashMap<String, ErasedClosure>>,
}

impl BindingRegistry {
    pub fn new(shape: impl Into<String>) -> Self {
        Self {
            shape: shape.into(),
            entries: FxHashMap::default(),
        }
    }

    /// Canonical shape shared by every entry, e.g. `(Node,float):Node`.
    pub fn signature(&self) -> &str {
        &self.shape
    }

    /// Prune dead contexts, then store `closure` under `key`.
    ///
    /// Returns the closure previously bound under the same key.
    pub fn bind(
        &mut self,
        live: &LiveStateSet,
        key: BindingKey,
        closure: ErasedClosure,
    ) -> Option<ErasedClosure> {
        let pruned = self.prune(live);
        if pruned > 0 {
            tracing::debug!(shape = %self.shape, pruned, "pruned dead bindings");
        }
        self.entries
            .entry(key.context)
            .or_default()
            .insert(key.name, closure)
    }

    /// Drop every entry whose context is no longer live.
    pub fn prune(&mut self, live: &LiveStateSet) -> usize {
        let mut removed = 0;
        self.entries.retain(|context, names| {
            if live.contains(*context) {
                true
            } else {
                removed += names.len();
                false
            }
        });
        removed
    }

    pub fn resolve(&self, key: &BindingKey) -> Option<ErasedClosure> {
        self.lookup(key.context, &key.name)
    }

    pub(crate) fn lookup(&self, context: ContextId, name: &str) -> Option<ErasedClosure> {
        self.entries.get(&context)?.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(FxHashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(FxHashMap::is_empty)
    }
}

impl fmt::Debug for BindingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingRegistry")
            .field("shape", &self.shape)
            .field("contexts", &self.entries.len())
            .field("entries", &self.len())
            .finish()
    }
}

/// All registries, keyed by signature shape. Created on first use.
#[derive(Debug, Default)]
pub struct BindingTable {
    registries: FxHashMap<SignatureHash, BindingRegistry>,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry for `hash`, creating it with `shape` if needed.
    pub fn registry_mut(&mut self, hash: SignatureHash, shape: &str) -> &mut BindingRegistry {
        self.registries
            .entry(hash)
            .or_insert_with(|| BindingRegistry::new(shape))
    }

    pub fn registry(&self, hash: SignatureHash) -> Option<&BindingRegistry> {
        self.registries.get(&hash)
    }

    /// Number of distinct signature shapes bound so far.
    pub fn len(&self) -> usize {
        self.registries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registries.is_empty()
    }

    /// Prune every registry at once.
    pub fn prune_all(&mut self, live: &LiveStateSet) -> usize {
        self.registries
            .values_mut()
            .map(|registry| registry.prune(live))
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SignatureHash, &BindingRegistry)> {
        self.registries.iter().map(|(&hash, registry)| (hash, registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: i64) -> ErasedClosure {
        erased(move |_ctx| Ok(ScriptValue::Int(value)))
    }

    fn run(closure: &ErasedClosure) -> ScriptValue {
        let mut ret = ScriptValue::Null;
        let ctx = CallContext::new(ContextId::new(0, 0), "f", &[], &mut ret);
        closure(&ctx).unwrap()
    }

    #[test]
    fn bind_overwrites_same_key() {
        let mut live = LiveStateSet::new();
        let ctx = live.allocate();
        let mut registry = BindingRegistry::new("():int");

        assert!(registry.bind(&live, BindingKey::new(ctx, "f"), constant(1)).is_none());
        assert!(registry.bind(&live, BindingKey::new(ctx, "f"), constant(2)).is_some());

        assert_eq!(registry.len(), 1);
        let closure = registry.resolve(&BindingKey::new(ctx, "f")).unwrap();
        assert_eq!(run(&closure), ScriptValue::Int(2));
    }

    #[test]
    fn bind_prunes_dead_contexts_first() {
        let mut live = LiveStateSet::new();
        let dead = live.allocate();
        let alive = live.allocate();
        let mut registry = BindingRegistry::new("():int");
        registry.bind(&live, BindingKey::new(dead, "f"), constant(1));
        registry.bind(&live, BindingKey::new(dead, "g"), constant(1));

        live.release(dead);
        assert_eq!(registry.len(), 2);

        registry.bind(&live, BindingKey::new(alive, "f"), constant(2));
        assert_eq!(registry.len(), 1);
        assert!(registry.resolve(&BindingKey::new(dead, "f")).is_none());
    }

    #[test]
    fn reused_slot_never_sees_old_entry() {
        let mut live = LiveStateSet::new();
        let old = live.allocate();
        let mut registry = BindingRegistry::new("():int");
        registry.bind(&live, BindingKey::new(old, "f"), constant(1));
        live.release(old);

        let new = live.allocate();
        assert_eq!(new.index(), old.index());
        assert!(registry.resolve(&BindingKey::new(new, "f")).is_none());
    }

    #[test]
    fn table_creates_registries_lazily() {
        let live = LiveStateSet::new();
        let mut table = BindingTable::new();
        assert!(table.is_empty());

        let hash = SignatureHash(7);
        table.registry_mut(hash, "():int");
        table.registry_mut(hash, "():int");
        assert_eq!(table.len(), 1);
        assert_eq!(table.registry(hash).map(BindingRegistry::signature), Some("():int"));
        assert_eq!(table.prune_all(&live), 0);
    }

    #[test]
    fn key_display() {
        let key = BindingKey::new(ContextId::new(1, 2), "greet");
        assert_eq!(key.to_string(), "ctx_1v2::greet");
    }
}
