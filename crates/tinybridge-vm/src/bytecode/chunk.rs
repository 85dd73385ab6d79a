//! Instruction buffer for a single function.

use super::Instr;

/// Compiled code for one function, with a source line per instruction.
#[derive(Debug, Clone, Default)]
pub struct Chunk {
    code: Vec<Instr>,
    lines: Vec<u32>,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, instr: Instr, line: u32) -> usize {
        self.code.push(instr);
        self.lines.push(line);
        self.code.len() - 1
    }

    /// Offset the next instruction will be written at.
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Emit a forward jump and return its offset for [`Chunk::patch_jump`].
    pub fn emit_jump(&mut self, instr: Instr, line: u32) -> usize {
        self.write(instr, line)
    }

    /// Point the jump at `offset` to the current position.
    pub fn patch_jump(&mut self, offset: usize) {
        let target = self.code.len() as u32;
        match &mut self.code[offset] {
            Instr::Jump(to) | Instr::JumpIfFalse(to) => *to = target,
            other => debug_assert!(false, "patching non-jump instruction {other:?}"),
        }
    }

    /// Emit a backward jump to `loop_start`.
    pub fn emit_loop(&mut self, loop_start: usize, line: u32) {
        self.write(Instr::Jump(loop_start as u32), line);
    }

    pub fn code(&self) -> &[Instr] {
        &self.code
    }

    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_jump_patching() {
        let mut chunk = Chunk::new();
        chunk.write(Instr::PushTrue, 1);
        let jump = chunk.emit_jump(Instr::JumpIfFalse(u32::MAX), 1);
        chunk.write(Instr::PushNull, 2);
        chunk.write(Instr::Pop, 2);
        chunk.patch_jump(jump);

        assert_eq!(chunk.code()[jump], Instr::JumpIfFalse(4));
        assert_eq!(chunk.line_at(2), Some(2));
    }

    #[test]
    fn loop_jumps_backwards() {
        let mut chunk = Chunk::new();
        let start = chunk.current_offset();
        chunk.write(Instr::PushNull, 1);
        chunk.write(Instr::Pop, 1);
        chunk.emit_loop(start, 1);
        assert_eq!(chunk.code().last(), Some(&Instr::Jump(0)));
        assert_eq!(chunk.len(), 3);
    }
}
