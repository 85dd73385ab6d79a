//! Local variable slots for one function being compiled.

/// A local variable in the current scope chain.
#[derive(Debug, Clone, Copy)]
struct Local<'ast> {
    name: &'ast str,
    slot: u32,
}

/// Tracks locals through nested blocks.
///
/// Every declaration gets a fresh slot, so a shadowed variable keeps its
/// value once the inner block ends. Slots are not reused across sibling
/// blocks.
#[derive(Debug, Default)]
pub(crate) struct LocalScope<'ast> {
    locals: Vec<Local<'ast>>,
    /// Length of `locals` when each open block began.
    block_starts: Vec<usize>,
    next_slot: u32,
}

impl<'ast> LocalScope<'ast> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_block(&mut self) {
        self.block_starts.push(self.locals.len());
    }

    pub fn pop_block(&mut self) {
        if let Some(start) = self.block_starts.pop() {
            self.locals.truncate(start);
        }
    }

    /// Declare `name` in the innermost block and return its slot.
    pub fn declare(&mut self, name: &'ast str) -> u32 {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.locals.push(Local { name, slot });
        slot
    }

    /// Slot of the innermost visible `name`.
    pub fn lookup(&self, name: &str) -> Option<u32> {
        self.locals
            .iter()
            .rev()
            .find(|local| local.name == name)
            .map(|local| local.slot)
    }

    /// Number of slots the function frame needs.
    pub fn slot_count(&self) -> u32 {
        self.next_slot
    }
}
