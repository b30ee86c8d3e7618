//! Core value types for iteration schemes.
//!
//! Key design decisions:
//! - `Buffer<T>` is a read-only view into an `Arc<[T]>`, so slices and split
//!   parts share the original storage instead of copying it
//! - `Values` is a closed set of backing containers and slicing never
//!   changes the variant (a slice of a float buffer is a float buffer)
//! - `Value::Bool` is its own category: `Bool(true) != Int(1)`

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde::ser::{SerializeSeq, Serializer};
use serde::Serialize;

/// One produced output of a scheme: one value per declared variable,
/// outer levels first.
pub type Record = Vec<Value>;

/// Shared, read-only, sliceable buffer.
#[derive(Clone)]
pub struct Buffer<T> {
    data: Arc<[T]>,
    range: Range<usize>,
}

impl<T> Buffer<T> {
    pub fn new(data: impl Into<Arc<[T]>>) -> Self {
        let data = data.into();
        let len = data.len();
        Self { data, range: 0..len }
    }

    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data[self.range.clone()]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Sub-view relative to this view. Bounds are clamped the way slice
    /// syntax clamps them in dynamic languages: `0..100` on a 6-element
    /// buffer is the whole buffer, an inverted range is empty.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        Self {
            data: Arc::clone(&self.data),
            range: self.range.start + start..self.range.start + end,
        }
    }

    /// True when both views point into the same allocation.
    pub fn shares_storage(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl<T: Clone> Buffer<T> {
    pub fn get(&self, index: usize) -> Option<T> {
        self.as_slice().get(index).cloned()
    }
}

impl<T> From<Vec<T>> for Buffer<T> {
    fn from(values: Vec<T>) -> Self {
        Self::new(values)
    }
}

impl<T: fmt::Debug> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for Buffer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Serialize> Serialize for Buffer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for item in self.iter() {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

/// A single value produced by a scheme: a scalar or a whole sub-sequence
/// (constants are emitted whole, so `[1, 2, 3]` as a constant stays a list).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Seq(Values),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats; booleans do not.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&Values> {
        match self {
            Value::Seq(values) => Some(values),
            _ => None,
        }
    }

    pub fn is_seq(&self) -> bool {
        matches!(self, Value::Seq(_))
    }

    /// Short type name for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Seq(values) => values.kind(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{}", s),
            Value::Seq(values) => {
                write!(f, "[")?;
                for (i, item) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Seq(values) => values.serialize(serializer),
        }
    }
}

macro_rules! value_from {
    ($($ty:ty => |$v:ident| $body:expr),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )+
    };
}

value_from! {
    bool => |b| Value::Bool(b),
    i32 => |i| Value::Int(i64::from(i)),
    u32 => |i| Value::Int(i64::from(i)),
    i64 => |i| Value::Int(i),
    f32 => |x| Value::Float(f64::from(x)),
    f64 => |x| Value::Float(x),
    &str => |s| Value::Str(Arc::from(s)),
    String => |s| Value::Str(Arc::from(s)),
    Arc<str> => |s| Value::Str(s),
    Values => |values| Value::Seq(values),
    Buffer<bool> => |b| Value::Seq(Values::Bools(b)),
    Buffer<i64> => |b| Value::Seq(Values::Ints(b)),
    Buffer<f64> => |b| Value::Seq(Values::Floats(b)),
    Buffer<Value> => |b| Value::Seq(Values::List(b)),
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Seq(Values::from(items))
    }
}

impl<T: Into<Value>> From<BTreeSet<T>> for Value {
    fn from(items: BTreeSet<T>) -> Self {
        Value::Seq(Values::from(items))
    }
}

impl<K: Into<Value>, V> From<BTreeMap<K, V>> for Value {
    fn from(items: BTreeMap<K, V>) -> Self {
        Value::Seq(Values::from(items))
    }
}

/// A sequence container with one of a small closed set of backings.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    /// Generic ordered sequence of arbitrary values.
    List(Buffer<Value>),
    /// Fixed-type boolean buffer.
    Bools(Buffer<bool>),
    /// Fixed-type integer buffer.
    Ints(Buffer<i64>),
    /// Fixed-type float buffer.
    Floats(Buffer<f64>),
}

impl Values {
    pub fn list<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        Values::List(Buffer::from(items))
    }

    pub fn bools(items: impl Into<Arc<[bool]>>) -> Self {
        Values::Bools(Buffer::new(items))
    }

    pub fn ints(items: impl Into<Arc<[i64]>>) -> Self {
        Values::Ints(Buffer::new(items))
    }

    pub fn floats(items: impl Into<Arc<[f64]>>) -> Self {
        Values::Floats(Buffer::new(items))
    }

    pub fn len(&self) -> usize {
        match self {
            Values::List(b) => b.len(),
            Values::Bools(b) => b.len(),
            Values::Ints(b) => b.len(),
            Values::Floats(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`, as a plain value.
    pub fn get(&self, index: usize) -> Option<Value> {
        match self {
            Values::List(b) => b.get(index),
            Values::Bools(b) => b.get(index).map(Value::Bool),
            Values::Ints(b) => b.get(index).map(Value::Int),
            Values::Floats(b) => b.get(index).map(Value::Float),
        }
    }

    /// Slice with the same backing variant.
    pub fn slice(&self, range: Range<usize>) -> Self {
        match self {
            Values::List(b) => Values::List(b.slice(range)),
            Values::Bools(b) => Values::Bools(b.slice(range)),
            Values::Ints(b) => Values::Ints(b.slice(range)),
            Values::Floats(b) => Values::Floats(b.slice(range)),
        }
    }

    pub fn iter(&self) -> ValuesIter<'_> {
        ValuesIter {
            values: self,
            index: 0,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Values::List(_) => "list",
            Values::Bools(_) => "bool buffer",
            Values::Ints(_) => "int buffer",
            Values::Floats(_) => "float buffer",
        }
    }
}

impl<T: Into<Value>> From<Vec<T>> for Values {
    fn from(items: Vec<T>) -> Self {
        Values::list(items)
    }
}

/// Set-like containers keep their iteration order.
impl<T: Into<Value>> From<BTreeSet<T>> for Values {
    fn from(items: BTreeSet<T>) -> Self {
        Values::list(items)
    }
}

/// Mappings iterate over their keys.
impl<K: Into<Value>, V> From<BTreeMap<K, V>> for Values {
    fn from(items: BTreeMap<K, V>) -> Self {
        Values::list(items.into_keys())
    }
}

impl Serialize for Values {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Values::List(b) => b.serialize(serializer),
            Values::Bools(b) => b.serialize(serializer),
            Values::Ints(b) => b.serialize(serializer),
            Values::Floats(b) => b.serialize(serializer),
        }
    }
}

/// Iterator over the elements of a [`Values`].
#[derive(Debug, Clone)]
pub struct ValuesIter<'a> {
    values: &'a Values,
    index: usize,
}

impl Iterator for ValuesIter<'_> {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let item = self.values.get(self.index)?;
        self.index += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.values.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ValuesIter<'_> {}

impl<'a> IntoIterator for &'a Values {
    type Item = Value;
    type IntoIter = ValuesIter<'a>;

    fn into_iter(self) -> ValuesIter<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_slice_shares_storage() {
        let buffer = Buffer::from(vec![1.0, 2.0, 3.0, 4.0]);
        let slice = buffer.slice(1..3);

        assert_eq!(slice.as_slice(), &[2.0, 3.0]);
        assert!(slice.shares_storage(&buffer));

        // Slices of slices stay relative to the view
        let inner = slice.slice(1..2);
        assert_eq!(inner.as_slice(), &[3.0]);
    }

    #[test]
    fn test_buffer_slice_clamps() {
        let buffer = Buffer::from(vec![1, 2, 3]);
        assert_eq!(buffer.slice(0..100).len(), 3);
        assert!(buffer.slice(5..10).is_empty());
        assert!(buffer.slice(2..1).is_empty());
    }

    #[test]
    fn test_values_slice_keeps_variant() {
        let floats = Values::floats(vec![0.5, 1.5, 2.5]);
        assert!(matches!(floats.slice(0..2), Values::Floats(_)));

        let ints = Values::ints(vec![1, 2, 3]);
        assert!(matches!(ints.slice(1..3), Values::Ints(_)));

        let list = Values::list(vec!["a", "b"]);
        assert!(matches!(list.slice(0..1), Values::List(_)));
    }

    #[test]
    fn test_bool_is_not_a_number() {
        let flags = Values::bools(vec![true, false]);
        assert_eq!(flags.get(0), Some(Value::Bool(true)));
        assert_ne!(flags.get(0), Some(Value::Int(1)));
        assert_eq!(Value::Bool(true).as_float(), None);
        assert_eq!(Value::Int(2).as_float(), Some(2.0));
    }

    #[test]
    fn test_set_and_map_conversions() {
        let set: BTreeSet<i64> = [3, 1, 2].into_iter().collect();
        let values = Values::from(set);
        assert_eq!(values.iter().collect::<Vec<_>>(), vec![Value::Int(1), Value::Int(2), Value::Int(3)]);

        let mut map = BTreeMap::new();
        map.insert("b", 2);
        map.insert("a", 1);
        let keys = Values::from(map);
        assert_eq!(keys.get(0), Some(Value::from("a")));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_value_display() {
        let value = Value::from(vec![1, 2, 3]);
        assert_eq!(value.to_string(), "[1, 2, 3]");
        assert_eq!(Value::from("s").to_string(), "s");
    }

    #[test]
    fn test_value_serialize() {
        let value = Value::from(vec![Value::from(1), Value::from("x"), Value::from(true)]);
        assert_eq!(serde_json::to_string(&value).unwrap(), r#"[1,"x",true]"#);

        let floats = Value::Seq(Values::floats(vec![0.5, 1.0]));
        assert_eq!(serde_json::to_string(&floats).unwrap(), "[0.5,1.0]");
    }
}
