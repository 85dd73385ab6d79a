//! The Value Converter: moving host values in and out of [`ScriptValue`].
//!
//! - [`FromScript`]: decode a script value into a Rust value
//! - [`IntoScript`]: encode a Rust value as a script value
//! - [`IntoArgs`]: encode an argument list for host-to-script calls
//! - [`NativeReturn`]: what a bound closure may return, fallible or not
//!
//! ## Supported Types
//!
//! - Integers: `i8`..`i64`, `u8`..`u64`, `isize`, `usize` (int tag)
//! - Floats: `f32`, `f64` (float tag, single precision)
//! - `bool`, `String`, `&str` (encode only), `Rc<str>`
//! - `()` for void, `Option<T>` for nullable values, `ScriptValue` for `any`
//! - host types declared with [`impl_native_type!`](crate::impl_native_type)
//!
//! Integer decoding truncates to the requested width the way an `as` cast
//! does. Callers that care about range must check it themselves.
//!
//! Each converter also reports the [`ScriptType`] it stands for, which is how
//! a typed closure is checked against a parsed signature at bind time.

use std::any::Any;
use std::rc::Rc;

use crate::error::{ConversionError, NativeError};
use crate::signature::ScriptType;
use crate::value::ScriptValue;

/// Decode a value from a [`ScriptValue`].
pub trait FromScript: Sized {
    /// The script type this decoder expects.
    fn expected_type() -> ScriptType;

    /// Decode `value`, failing if its tag does not match.
    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError>;
}

/// Encode a value as a [`ScriptValue`].
pub trait IntoScript {
    /// The script type this encoder produces.
    fn produced_type() -> ScriptType;

    fn into_script(self) -> ScriptValue;
}

fn mismatch(expected: &'static str, actual: &ScriptValue) -> ConversionError {
    ConversionError::TypeMismatch {
        expected,
        actual: actual.type_name(),
    }
}

// ============================================================================
// Integers
// ============================================================================

macro_rules! impl_script_int {
    ($($ty:ty),*) => {
        $(
            impl FromScript for $ty {
                fn expected_type() -> ScriptType {
                    ScriptType::Int
                }

                fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
                    match value {
                        ScriptValue::Int(v) => Ok(*v as $ty),
                        other => Err(mismatch("int", other)),
                    }
                }
            }

            impl IntoScript for $ty {
                fn produced_type() -> ScriptType {
                    ScriptType::Int
                }

                fn into_script(self) -> ScriptValue {
                    ScriptValue::Int(self as i64)
                }
            }
        )*
    };
}

impl_script_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

// ============================================================================
// Floats
// ============================================================================

impl FromScript for f32 {
    fn expected_type() -> ScriptType {
        ScriptType::Float
    }

    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match value {
            ScriptValue::Float(v) => Ok(*v),
            ScriptValue::Int(v) => Ok(*v as f32),
            other => Err(mismatch("float", other)),
        }
    }
}

impl IntoScript for f32 {
    fn produced_type() -> ScriptType {
        ScriptType::Float
    }

    fn into_script(self) -> ScriptValue {
        ScriptValue::Float(self)
    }
}

impl FromScript for f64 {
    fn expected_type() -> ScriptType {
        ScriptType::Float
    }

    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match value {
            ScriptValue::Float(v) => Ok(*v as f64),
            ScriptValue::Int(v) => Ok(*v as f64),
            other => Err(mismatch("float", other)),
        }
    }
}

impl IntoScript for f64 {
    fn produced_type() -> ScriptType {
        ScriptType::Float
    }

    // Narrowed to the interpreter's float tag.
    fn into_script(self) -> ScriptValue {
        ScriptValue::Float(self as f32)
    }
}

// ============================================================================
// Bool
// ============================================================================

impl FromScript for bool {
    fn expected_type() -> ScriptType {
        ScriptType::Bool
    }

    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match value {
            ScriptValue::Bool(v) => Ok(*v),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl IntoScript for bool {
    fn produced_type() -> ScriptType {
        ScriptType::Bool
    }

    fn into_script(self) -> ScriptValue {
        ScriptValue::Bool(self)
    }
}

// ============================================================================
// Strings
// ============================================================================

impl FromScript for String {
    fn expected_type() -> ScriptType {
        ScriptType::Str
    }

    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match value {
            ScriptValue::Str(s) => Ok(s.to_string()),
            other => Err(mismatch("str", other)),
        }
    }
}

impl IntoScript for String {
    fn produced_type() -> ScriptType {
        ScriptType::Str
    }

    fn into_script(self) -> ScriptValue {
        ScriptValue::Str(Rc::from(self))
    }
}

impl IntoScript for &str {
    fn produced_type() -> ScriptType {
        ScriptType::Str
    }

    fn into_script(self) -> ScriptValue {
        ScriptValue::Str(Rc::from(self))
    }
}

impl FromScript for Rc<str> {
    fn expected_type() -> ScriptType {
        ScriptType::Str
    }

    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match value {
            ScriptValue::Str(s) => Ok(Rc::clone(s)),
            other => Err(mismatch("str", other)),
        }
    }
}

impl IntoScript for Rc<str> {
    fn produced_type() -> ScriptType {
        ScriptType::Str
    }

    fn into_script(self) -> ScriptValue {
        ScriptValue::Str(self)
    }
}

// ============================================================================
// Void, Option and passthrough
// ============================================================================

/// Decoding void ignores the value entirely.
impl FromScript for () {
    fn expected_type() -> ScriptType {
        ScriptType::Void
    }

    fn from_script(_value: &ScriptValue) -> Result<Self, ConversionError> {
        Ok(())
    }
}

impl IntoScript for () {
    fn produced_type() -> ScriptType {
        ScriptType::Void
    }

    fn into_script(self) -> ScriptValue {
        ScriptValue::Null
    }
}

impl<T: FromScript> FromScript for Option<T> {
    fn expected_type() -> ScriptType {
        T::expected_type()
    }

    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        match value {
            ScriptValue::Null => Ok(None),
            other => T::from_script(other).map(Some),
        }
    }
}

impl<T: IntoScript> IntoScript for Option<T> {
    fn produced_type() -> ScriptType {
        T::produced_type()
    }

    fn into_script(self) -> ScriptValue {
        match self {
            Some(value) => value.into_script(),
            None => ScriptValue::Null,
        }
    }
}

impl FromScript for ScriptValue {
    fn expected_type() -> ScriptType {
        ScriptType::Any
    }

    fn from_script(value: &ScriptValue) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl IntoScript for ScriptValue {
    fn produced_type() -> ScriptType {
        ScriptType::Any
    }

    fn into_script(self) -> ScriptValue {
        self
    }
}

// ============================================================================
// Native host types
// ============================================================================

/// Decode a native handle registered under `type_name`.
///
/// Used by [`impl_native_type!`](crate::impl_native_type); the payload's
/// `TypeId` must match `T` exactly.
pub fn native_from_script<T: Any + Clone>(
    type_name: &'static str,
    value: &ScriptValue,
) -> Result<T, ConversionError> {
    match value {
        ScriptValue::Native(native) => {
            native
                .downcast_ref::<T>()
                .cloned()
                .ok_or(ConversionError::NativeTypeMismatch {
                    expected: type_name,
                    actual: native.type_name(),
                })
        }
        ScriptValue::Null => Err(ConversionError::NullHandle {
            target_type: type_name,
        }),
        other => Err(mismatch(type_name, other)),
    }
}

/// Declare a host type as an opaque script type.
///
/// The type must be `Clone + PartialEq + 'static`. Encoding stores a clone
/// inside a [`NativeRef`](crate::NativeRef) tagged with the script name;
/// decoding checks the tag and clones the payload back out.
///
/// ```
/// use tinybridge_core::{impl_native_type, FromScript, IntoScript};
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// struct Handle(u32);
/// impl_native_type!(Handle => "Handle");
///
/// let value = Handle(9).into_script();
/// assert_eq!(value.type_name(), "Handle");
/// assert_eq!(Handle::from_script(&value).unwrap(), Handle(9));
/// ```
#[macro_export]
macro_rules! impl_native_type {
    ($ty:ty => $name:literal) => {
        impl $crate::FromScript for $ty {
            fn expected_type() -> $crate::ScriptType {
                $crate::ScriptType::Named($name.to_string())
            }

            fn from_script(
                value: &$crate::ScriptValue,
            ) -> ::std::result::Result<Self, $crate::ConversionError> {
                $crate::convert::native_from_script::<$ty>($name, value)
            }
        }

        impl $crate::IntoScript for $ty {
            fn produced_type() -> $crate::ScriptType {
                $crate::ScriptType::Named($name.to_string())
            }

            fn into_script(self) -> $crate::ScriptValue {
                $crate::ScriptValue::Native($crate::NativeRef::new($name, self))
            }
        }

        impl $crate::NativeReturn for $ty {
            fn return_type() -> $crate::ScriptType {
                $crate::ScriptType::Named($name.to_string())
            }

            fn into_native(
                self,
            ) -> ::std::result::Result<$crate::ScriptValue, $crate::NativeError> {
                ::std::result::Result::Ok($crate::IntoScript::into_script(self))
            }
        }
    };
}

// ============================================================================
// Closure results
// ============================================================================

/// The result of a bound native closure.
///
/// Every [`IntoScript`] type qualifies, and so does
/// `Result<T, NativeError>` for closures that can fail. A failure aborts the
/// script call that made it.
pub trait NativeReturn {
    fn return_type() -> ScriptType;

    fn into_native(self) -> Result<ScriptValue, NativeError>;
}

macro_rules! impl_native_return {
    ($($ty:ty),*) => {
        $(
            impl NativeReturn for $ty {
                fn return_type() -> ScriptType {
                    <$ty as IntoScript>::produced_type()
                }

                fn into_native(self) -> Result<ScriptValue, NativeError> {
                    Ok(self.into_script())
                }
            }
        )*
    };
}

impl_native_return!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
impl_native_return!(f32, f64, bool, String, &str, Rc<str>, (), ScriptValue);

impl<T: IntoScript> NativeReturn for Option<T> {
    fn return_type() -> ScriptType {
        T::produced_type()
    }

    fn into_native(self) -> Result<ScriptValue, NativeError> {
        Ok(self.into_script())
    }
}

impl<T: IntoScript> NativeReturn for Result<T, NativeError> {
    fn return_type() -> ScriptType {
        T::produced_type()
    }

    fn into_native(self) -> Result<ScriptValue, NativeError> {
        self.map(IntoScript::into_script)
    }
}

// ============================================================================
// Argument lists
// ============================================================================

/// An argument list for calling into a script.
pub trait IntoArgs {
    fn into_args(self) -> Vec<ScriptValue>;
}

impl IntoArgs for () {
    fn into_args(self) -> Vec<ScriptValue> {
        Vec::new()
    }
}

impl IntoArgs for Vec<ScriptValue> {
    fn into_args(self) -> Vec<ScriptValue> {
        self
    }
}

macro_rules! impl_into_args {
    ($($name:ident),+) => {
        impl<$($name: IntoScript),+> IntoArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_args(self) -> Vec<ScriptValue> {
                let ($($name,)+) = self;
                vec![$($name.into_script()),+]
            }
        }
    };
}

impl_into_args!(A);
impl_into_args!(A, B);
impl_into_args!(A, B, C);
impl_into_args!(A, B, C, D);
impl_into_args!(A, B, C, D, E);
impl_into_args!(A, B, C, D, E, F);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Widget(u32);
    impl_native_type!(Widget => "Widget");

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Gadget(u32);
    impl_native_type!(Gadget => "Gadget");

    #[test]
    fn int_roundtrip() {
        let value = 42i32.into_script();
        assert_eq!(value, ScriptValue::Int(42));
        assert_eq!(i32::from_script(&value).unwrap(), 42);
    }

    /// Encode then decode each value and expect it back unchanged.
    fn assert_round_trips<T>(values: &[T])
    where
        T: FromScript + IntoScript + Clone + PartialEq + std::fmt::Debug,
    {
        for value in values {
            let encoded = value.clone().into_script();
            assert_eq!(T::from_script(&encoded).as_ref(), Ok(value), "via {encoded:?}");
        }
    }

    #[test]
    fn boundary_values_round_trip() {
        assert_round_trips(&[true, false]);

        assert_round_trips(&[i8::MIN, -1, 0, i8::MAX]);
        assert_round_trips(&[u8::MIN, u8::MAX]);
        assert_round_trips(&[i16::MIN, i16::MAX]);
        assert_round_trips(&[u16::MIN, u16::MAX]);
        assert_round_trips(&[i32::MIN, i32::MAX]);
        assert_round_trips(&[u32::MIN, u32::MAX]);
        assert_round_trips(&[i64::MIN, -1, 0, i64::MAX]);
        assert_round_trips(&[u64::MIN, 1, u64::MAX]);
        assert_round_trips(&[isize::MIN, isize::MAX]);
        assert_round_trips(&[usize::MIN, usize::MAX]);

        assert_round_trips(&[String::new(), String::from("plain"), String::from("héllo ✓ 日本")]);
        assert_round_trips::<Rc<str>>(&[Rc::from(""), Rc::from("héllo ✓ 日本")]);
        assert_round_trips(&[None, Some(0i64), Some(i64::MIN)]);
    }

    #[test]
    fn wide_unsigned_wraps_through_int_tag() {
        assert_eq!(u64::MAX.into_script(), ScriptValue::Int(-1));
        assert_eq!(u64::from_script(&ScriptValue::Int(-1)).unwrap(), u64::MAX);
    }

    #[test]
    fn f32_round_trips_bit_exact() {
        let values = [
            0.0f32,
            -0.0,
            1.5,
            0.1,
            f32::MAX,
            f32::MIN,
            f32::MIN_POSITIVE,
            f32::EPSILON,
            f32::INFINITY,
            f32::NEG_INFINITY,
        ];
        for value in values {
            let back = f32::from_script(&value.into_script()).unwrap();
            assert_eq!(back.to_bits(), value.to_bits(), "{value:?}");
        }
        assert!(f32::from_script(&f32::NAN.into_script()).unwrap().is_nan());
    }

    #[test]
    fn narrow_int_truncates() {
        assert_eq!(u8::from_script(&ScriptValue::Int(300)).unwrap(), 44);
        assert_eq!(i8::from_script(&ScriptValue::Int(-1)).unwrap(), -1);
        assert_eq!(u32::from_script(&ScriptValue::Int(-1)).unwrap(), u32::MAX);
    }

    #[test]
    fn int_rejects_other_tags() {
        let err = i32::from_script(&ScriptValue::Bool(true)).unwrap_err();
        assert_eq!(
            err,
            ConversionError::TypeMismatch {
                expected: "int",
                actual: "bool"
            }
        );
    }

    #[test]
    fn float_accepts_int_tag() {
        assert_eq!(f32::from_script(&ScriptValue::Int(3)).unwrap(), 3.0);
    }

    #[test]
    fn f64_loses_precision_through_float_tag() {
        let original = 0.1f64;
        let back = f64::from_script(&original.into_script()).unwrap();
        assert_ne!(back, original);
        assert!((back - original).abs() < 1e-6);
    }

    #[test]
    fn string_is_copied() {
        let source = String::from("hello");
        let value = source.clone().into_script();
        drop(source);
        assert_eq!(String::from_script(&value).unwrap(), "hello");
    }

    #[test]
    fn void_decode_ignores_value() {
        assert!(<()>::from_script(&ScriptValue::Int(1)).is_ok());
        assert_eq!(().into_script(), ScriptValue::Null);
    }

    #[test]
    fn option_maps_null() {
        assert_eq!(Option::<i32>::from_script(&ScriptValue::Null).unwrap(), None);
        assert_eq!(
            Option::<i32>::from_script(&ScriptValue::Int(2)).unwrap(),
            Some(2)
        );
        assert_eq!(None::<Widget>.into_script(), ScriptValue::Null);
    }

    #[test]
    fn native_roundtrip() {
        let value = Widget(5).into_script();
        assert_eq!(value.type_name(), "Widget");
        assert_eq!(Widget::from_script(&value).unwrap(), Widget(5));
    }

    #[test]
    fn native_of_wrong_type_is_rejected() {
        let value = Gadget(5).into_script();
        let err = Widget::from_script(&value).unwrap_err();
        assert_eq!(
            err,
            ConversionError::NativeTypeMismatch {
                expected: "Widget",
                actual: "Gadget"
            }
        );
    }

    #[test]
    fn null_native_is_reported() {
        let err = Widget::from_script(&ScriptValue::Null).unwrap_err();
        assert_eq!(err, ConversionError::NullHandle { target_type: "Widget" });
    }

    #[test]
    fn reported_types() {
        assert_eq!(<i64 as FromScript>::expected_type(), ScriptType::Int);
        assert_eq!(<f64 as IntoScript>::produced_type(), ScriptType::Float);
        assert_eq!(<() as IntoScript>::produced_type(), ScriptType::Void);
        assert_eq!(
            <Option<Widget> as IntoScript>::produced_type(),
            ScriptType::Named("Widget".into())
        );
    }

    #[test]
    fn native_return_passes_failures_through() {
        assert_eq!(7i32.into_native(), Ok(ScriptValue::Int(7)));
        assert_eq!(<Widget as NativeReturn>::return_type(), ScriptType::Named("Widget".into()));

        let failed: Result<Widget, NativeError> = Err(NativeError::other("gone"));
        assert_eq!(failed.into_native(), Err(NativeError::other("gone")));
        assert_eq!(<Result<(), NativeError> as NativeReturn>::return_type(), ScriptType::Void);
    }

    #[test]
    fn tuple_args() {
        let args = (1i32, "two", 3.0f32).into_args();
        assert_eq!(
            args,
            vec![
                ScriptValue::Int(1),
                ScriptValue::string("two"),
                ScriptValue::Float(3.0)
            ]
        );
        assert!(().into_args().is_empty());
    }
}
