//! Constant pool for a compiled unit.

use std::rc::Rc;

use rustc_hash::FxHashMap;
use tinybridge_core::ScriptValue;

/// Literal values referenced by [`Instr::Const`](super::Instr::Const).
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f32),
    Str(Rc<str>),
}

impl Constant {
    pub fn to_value(&self) -> ScriptValue {
        match self {
            Constant::Int(v) => ScriptValue::Int(*v),
            Constant::Float(v) => ScriptValue::Float(*v),
            Constant::Str(s) => ScriptValue::Str(Rc::clone(s)),
        }
    }
}

/// Hashable form of [`Constant`] used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ConstantKey {
    Int(i64),
    Float(u32), // bit pattern
    Str(Rc<str>),
}

/// Unit-wide constant pool; identical literals share one slot.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    index: FxHashMap<ConstantKey, u32>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, constant: Constant) -> u32 {
        let key = match &constant {
            Constant::Int(v) => ConstantKey::Int(*v),
            Constant::Float(v) => ConstantKey::Float(v.to_bits()),
            Constant::Str(s) => ConstantKey::Str(Rc::clone(s)),
        };
        if let Some(&index) = self.index.get(&key) {
            return index;
        }
        let index = self.constants.len() as u32;
        self.constants.push(constant);
        self.index.insert(key, index);
        index
    }

    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicates() {
        let mut pool = ConstantPool::new();
        let a = pool.add(Constant::Str("hi".into()));
        let b = pool.add(Constant::Int(3));
        let c = pool.add(Constant::Str("hi".into()));
        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn floats_keyed_by_bits() {
        let mut pool = ConstantPool::new();
        let pos = pool.add(Constant::Float(0.0));
        let neg = pool.add(Constant::Float(-0.0));
        assert_ne!(pos, neg);
        assert_eq!(pool.get(neg).map(Constant::to_value), Some(ScriptValue::Float(-0.0)));
    }
}
