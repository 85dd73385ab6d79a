//! The set of script contexts that are currently alive.

use tinybridge_core::ContextId;

#[derive(Debug, Clone, Copy)]
struct Slot {
    generation: u32,
    live: bool,
}

/// Generational slot table handing out [`ContextId`]s.
///
/// A released slot is reused by the next allocation with its generation
/// bumped, so a released id never becomes live again.
#[derive(Debug, Default)]
pub struct LiveStateSet {
    slots: Vec<Slot>,
    free_list: Vec<u32>,
    live: usize,
}

impl LiveStateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> ContextId {
        self.live += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation = slot.generation.wrapping_add(1);
            slot.live = true;
            return ContextId::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            live: true,
        });
        ContextId::new(index, 0)
    }

    /// Returns `false` if `id` was not live.
    pub fn release(&mut self, id: ContextId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.slots[id.index() as usize].live = false;
        self.free_list.push(id.index());
        self.live -= 1;
        true
    }

    pub fn contains(&self, id: ContextId) -> bool {
        self.slots
            .get(id.index() as usize)
            .is_some_and(|slot| slot.live && slot.generation == id.generation())
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut live = LiveStateSet::new();
        let a = live.allocate();
        assert!(live.release(a));
        let b = live.allocate();

        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert!(!live.contains(a));
        assert!(live.contains(b));
    }

    #[test]
    fn double_release_is_rejected() {
        let mut live = LiveStateSet::new();
        let a = live.allocate();
        let _b = live.allocate();
        assert_eq!(live.len(), 2);
        assert!(live.release(a));
        assert!(!live.release(a));
        assert_eq!(live.len(), 1);
    }

    #[test]
    fn unknown_ids_are_not_live() {
        let live = LiveStateSet::new();
        assert!(live.is_empty());
        assert!(!live.contains(ContextId::new(3, 0)));
    }
}
