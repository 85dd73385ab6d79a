//! Script context identity.

use std::fmt;

/// Identity of one live script context.
///
/// `index` names a slot in the host's live-context table. Slots are reused
/// after their context is dropped, the same way an allocator hands out a
/// freed address again. `generation` is bumped on every reuse, so two
/// contexts never compare equal even when they occupy the same slot.
///
/// # Example
///
/// ```
/// use tinybridge_core::ContextId;
///
/// let first = ContextId::new(3, 0);
/// let reused = ContextId::new(3, 1);
/// assert_eq!(first.index(), reused.index());
/// assert_ne!(first, reused);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId {
    index: u32,
    generation: u32,
}

impl ContextId {
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index; shared by every context that ever lived in this slot.
    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }

    /// Pack into a single integer, generation in the high half.
    #[inline]
    pub const fn to_bits(self) -> u64 {
        ((self.generation as u64) << 32) | self.index as u64
    }

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx_{}v{}", self.index, self.generation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_slot_different_generation_is_distinct() {
        let a = ContextId::new(0, 0);
        let b = ContextId::new(0, 1);
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
    }

    #[test]
    fn bits_pack_and_unpack() {
        let id = ContextId::new(7, 42);
        assert_eq!(ContextId::from_bits(id.to_bits()), id);
        assert_eq!(id.to_bits() >> 32, 42);
    }

    #[test]
    fn display() {
        assert_eq!(ContextId::new(2, 5).to_string(), "ctx_2v5");
    }
}
