//! The tagged value that crosses the script/host boundary.
//!
//! [`ScriptValue`] is the interpreter's own representation. Host code never
//! builds one by hand in the common case; the converters in
//! [`convert`](crate::convert) do that.

use std::any::{Any, TypeId};
use std::fmt;
use std::rc::Rc;

/// A value as the interpreter sees it.
///
/// The float tag is single precision. Host values wider than that lose
/// precision when they pass through a script.
#[derive(Clone, PartialEq, Default)]
pub enum ScriptValue {
    /// The null tag; also what a `void` function returns.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f32),
    /// Interpreter-owned string storage.
    Str(Rc<str>),
    /// An opaque host value.
    Native(NativeRef),
}

impl ScriptValue {
    /// Build a string value, copying `s` into interpreter storage.
    pub fn string(s: impl AsRef<str>) -> Self {
        ScriptValue::Str(Rc::from(s.as_ref()))
    }

    /// Name of this value's tag, or the registered type name for natives.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "bool",
            ScriptValue::Int(_) => "int",
            ScriptValue::Float(_) => "float",
            ScriptValue::Str(_) => "str",
            ScriptValue::Native(native) => native.type_name(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ScriptValue::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ScriptValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            ScriptValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_native(&self) -> Option<&NativeRef> {
        match self {
            ScriptValue::Native(native) => Some(native),
            _ => None,
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Null => write!(f, "Null"),
            ScriptValue::Bool(v) => write!(f, "Bool({})", v),
            ScriptValue::Int(v) => write!(f, "Int({})", v),
            ScriptValue::Float(v) => write!(f, "Float({})", v),
            ScriptValue::Str(s) => write!(f, "Str({:?})", s),
            ScriptValue::Native(native) => write!(f, "Native({})", native.type_name()),
        }
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Null => write!(f, "null"),
            ScriptValue::Bool(v) => write!(f, "{}", v),
            ScriptValue::Int(v) => write!(f, "{}", v),
            ScriptValue::Float(v) => write!(f, "{}", v),
            ScriptValue::Str(s) => write!(f, "{}", s),
            ScriptValue::Native(native) => write!(f, "<{}>", native.type_name()),
        }
    }
}

/// An opaque host value carried by a script.
///
/// Besides the value itself, a `NativeRef` records the script-visible type
/// name and the Rust [`TypeId`] of the payload. Decoding checks the `TypeId`,
/// so a handle of one type can never be read back as another.
#[derive(Clone)]
pub struct NativeRef {
    type_name: &'static str,
    type_id: TypeId,
    value: Rc<dyn Any>,
    eq: fn(&dyn Any, &dyn Any) -> bool,
}

impl NativeRef {
    /// Wrap `value` under the script type name `type_name`.
    pub fn new<T: Any + PartialEq>(type_name: &'static str, value: T) -> Self {
        Self {
            type_name,
            type_id: TypeId::of::<T>(),
            value: Rc::new(value),
            eq: native_eq::<T>,
        }
    }

    /// Script-visible type name, e.g. `"Node"`.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Borrow the payload if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

fn native_eq<T: Any + PartialEq>(a: &dyn Any, b: &dyn Any) -> bool {
    match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

impl PartialEq for NativeRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && (self.eq)(&*self.value, &*other.value)
    }
}

impl fmt::Debug for NativeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeRef")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Marker(u32);

    #[test]
    fn type_names() {
        assert_eq!(ScriptValue::Null.type_name(), "null");
        assert_eq!(ScriptValue::Bool(true).type_name(), "bool");
        assert_eq!(ScriptValue::Int(1).type_name(), "int");
        assert_eq!(ScriptValue::Float(1.0).type_name(), "float");
        assert_eq!(ScriptValue::string("x").type_name(), "str");
        let native = ScriptValue::Native(NativeRef::new("Marker", Marker(1)));
        assert_eq!(native.type_name(), "Marker");
    }

    #[test]
    fn natives_compare_by_payload() {
        let a = NativeRef::new("Marker", Marker(7));
        let b = NativeRef::new("Marker", Marker(7));
        let c = NativeRef::new("Marker", Marker(8));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn natives_of_different_types_never_compare_equal() {
        let a = NativeRef::new("Marker", Marker(1));
        let b = NativeRef::new("Count", 1u32);
        assert_ne!(a, b);
    }

    #[test]
    fn downcast_checks_type() {
        let native = NativeRef::new("Marker", Marker(3));
        assert!(native.is::<Marker>());
        assert_eq!(native.downcast_ref::<Marker>(), Some(&Marker(3)));
        assert!(native.downcast_ref::<u32>().is_none());
    }

    #[test]
    fn accessors() {
        assert_eq!(ScriptValue::Int(4).as_int(), Some(4));
        assert_eq!(ScriptValue::Int(4).as_float(), None);
        assert_eq!(ScriptValue::string("hi").as_str(), Some("hi"));
        assert!(ScriptValue::default().is_null());
    }

    #[test]
    fn display() {
        assert_eq!(ScriptValue::string("a b").to_string(), "a b");
        assert_eq!(ScriptValue::Bool(false).to_string(), "false");
        assert_eq!(ScriptValue::Null.to_string(), "null");
    }
}
