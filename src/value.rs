//! Opaque argument values recorded in stack frames.
//!
//! The host hands over call arguments as loosely typed values. [`Value`] keeps
//! just enough of their shape for the trace formatter to render a short,
//! type-tagged summary of each one.

use core::fmt;
use std::borrow::Cow;

use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;

/// Ordered associative container, keyed by integers or strings.
pub type ArrayMap = IndexMap<ArrayKey, Value, FxBuildHasher>;

/// Key of an [`ArrayMap`] entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArrayKey {
    /// Integer key.
    Int(i64),
    /// String key.
    Str(String),
}

impl From<i64> for ArrayKey {
    fn from(key: i64) -> Self {
        Self::Int(key)
    }
}

impl From<&str> for ArrayKey {
    fn from(key: &str) -> Self {
        Self::Str(key.to_owned())
    }
}

impl From<String> for ArrayKey {
    fn from(key: String) -> Self {
        Self::Str(key)
    }
}

impl From<ArrayKey> for Value {
    fn from(key: ArrayKey) -> Self {
        match key {
            ArrayKey::Int(key) => Value::Int(key),
            ArrayKey::Str(key) => Value::Str(key),
        }
    }
}

/// A single argument value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A floating point number, rendered fixed-point with six decimals
    /// (`Inf`, `-Inf` and `NaN` for the non-finite values).
    Float(f64),
    /// A string.
    Str(String),
    /// An ordered associative container.
    Array(ArrayMap),
    /// An object, identified by its type name.
    Object(Cow<'static, str>),
    /// Any other primitive, identified by the runtime's name for its type.
    Other(Cow<'static, str>),
}

impl Value {
    /// Builds an array from key/value pairs, keeping their order.
    pub fn array<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<ArrayKey>,
        V: Into<Value>,
    {
        Self::Array(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }

    /// Builds a list, keyed `0..n`.
    pub fn list<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Array(
            (0_i64..)
                .zip(values)
                .map(|(key, value)| (ArrayKey::Int(key), value.into()))
                .collect(),
        )
    }

    /// An object value named after the Rust type `T`.
    #[must_use]
    pub fn object_of<T: ?Sized>() -> Self {
        Self::Object(Cow::Borrowed(core::any::type_name::<T>()))
    }

    /// The runtime's name for the value's type.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "double",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Other(name) => name,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(value) => write!(f, "Bool({value})"),
            Value::Int(value) => write!(f, "Int({value})"),
            Value::Float(value) if value.is_infinite() => {
                f.write_str(if value.is_sign_negative() { "Float(-Inf)" } else { "Float(Inf)" })
            }
            Value::Float(value) => write!(f, "Float({value:.6})"),
            Value::Str(value) => write!(f, "'{value}'"),
            Value::Array(_) => f.write_str("Array"),
            Value::Object(name) => write!(f, "Object({name})"),
            Value::Other(name) => f.write_str(name),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident as $conv:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Self::$variant(<$conv>::from(value))
                }
            }
        )*
    };
}

value_from! {
    bool => Bool as bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => Int as i64,
    u16 => Int as i64,
    u32 => Int as i64,
    f32 => Float as f64,
    f64 => Float as f64,
    String => Str as String,
    &str => Str as String,
    ArrayMap => Array as ArrayMap,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
