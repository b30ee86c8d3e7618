//! Adapters turning flat records into named structures.
//!
//! An adapter is assembled from two functions:
//! - a *getter* extracting a name from one declared variable
//! - a *reshape* turning one record plus the name list into an output
//!
//! Names are taken from the declared variables before iteration starts,
//! never from produced values, so they must be attached when the scheme is
//! built (see [`named`](crate::named)).
//!
//! ```
//! use iterscheme::{constants, element, map_adapter, named, Value};
//!
//! let scheme = constants![named("c", 0.5)].chain(element![named("x", vec![1, 2, 3])])?;
//! let records: Vec<_> = map_adapter(scheme)?.collect::<Result<_, _>>()?;
//!
//! assert_eq!(records.len(), 3);
//! assert_eq!(records[0]["c"], Value::from(0.5));
//! assert_eq!(records[2]["x"], Value::from(3));
//! # Ok::<(), iterscheme::SchemeError>(())
//! ```

use std::collections::HashSet;
use std::marker::PhantomData;
use std::ops::Index;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, SchemeError};
use crate::named::get_name;
use crate::scheme::{NestedIterationScheme, Variable};
use crate::types::{Record, Value};

/// Name-to-value mapping in declaration order.
pub type NamedMap = IndexMap<Arc<str>, Value>;

/// Reshape function pointer used by the provided adapters.
pub type Reshape<R> = fn(Record, &[Arc<str>]) -> Result<R>;

/// Lazy, single-pass sequence of reshaped records.
pub struct Adapted<R, F = Reshape<R>> {
    scheme: NestedIterationScheme,
    names: Arc<[Arc<str>]>,
    reshape: F,
    _output: PhantomData<fn() -> R>,
}

impl<R, F> Adapted<R, F> {
    /// Names extracted from the declared variables, in record order.
    pub fn names(&self) -> &[Arc<str>] {
        &self.names
    }
}

impl<R, F> Iterator for Adapted<R, F>
where
    F: Fn(Record, &[Arc<str>]) -> Result<R>,
{
    type Item = Result<R>;

    fn next(&mut self) -> Option<Result<R>> {
        let record = self.scheme.next()?;
        Some((self.reshape)(record, &self.names))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.scheme.size_hint()
    }
}

impl<R, F> std::fmt::Debug for Adapted<R, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Adapted")
            .field("names", &self.names)
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

/// Build an adapter from a name getter and a reshape function.
///
/// The returned function extracts one name per declared variable (failing
/// with [`SchemeError::UnnamedVariable`] when the getter finds none) and
/// then reshapes every record lazily.
pub fn adapter<S, G, F, R>(getter: G, reshape: F) -> impl Fn(S) -> Result<Adapted<R, F>>
where
    S: Into<NestedIterationScheme>,
    G: Fn(&Variable) -> Option<Arc<str>>,
    F: Fn(Record, &[Arc<str>]) -> Result<R> + Clone,
{
    move |scheme: S| {
        let scheme = scheme.into();
        let names = scheme
            .variables()
            .enumerate()
            .map(|(position, variable)| {
                getter(variable).ok_or(SchemeError::UnnamedVariable { position })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(names = ?names, "adapter names resolved");
        Ok(Adapted {
            scheme,
            names: names.into(),
            reshape: reshape.clone(),
            _output: PhantomData,
        })
    }
}

/// Reshape into a name-to-value map. Duplicate names keep their first
/// position and take the last value.
pub fn to_map(values: Record, names: &[Arc<str>]) -> Result<NamedMap> {
    let mut map = IndexMap::with_capacity(names.len());
    for (name, value) in names.iter().zip(values) {
        map.insert(Arc::clone(name), value);
    }
    Ok(map)
}

/// Reshape into a fixed-field record. Validates `names` on every call;
/// [`record_adapter`] validates them once per scheme instead.
pub fn to_record(values: Record, names: &[Arc<str>]) -> Result<NamedRecord> {
    NamedRecord::new(names, values)
}

fn keep(values: Record, _names: &[Arc<str>]) -> Result<Record> {
    Ok(values)
}

/// Iterate `scheme` as name-to-value maps.
pub fn map_adapter<S>(scheme: S) -> Result<Adapted<NamedMap>>
where
    S: Into<NestedIterationScheme>,
{
    adapter(get_name, to_map as Reshape<NamedMap>)(scheme)
}

/// Iterate `scheme` as fixed-field records.
///
/// Field names are checked once. An invalid name is reported by the first
/// pull, which also ends the sequence.
pub fn record_adapter<S>(scheme: S) -> Result<Records>
where
    S: Into<NestedIterationScheme>,
{
    let inner = adapter(get_name, keep as Reshape<Record>)(scheme)?;
    let invalid = validate_fields(inner.names()).err();
    Ok(Records {
        inner,
        invalid,
        failed: false,
    })
}

/// Lazy sequence of [`NamedRecord`] values sharing one field list.
#[derive(Debug)]
pub struct Records {
    inner: Adapted<Record>,
    invalid: Option<SchemeError>,
    failed: bool,
}

impl Records {
    pub fn names(&self) -> &[Arc<str>] {
        self.inner.names()
    }
}

impl Iterator for Records {
    type Item = Result<NamedRecord>;

    fn next(&mut self) -> Option<Result<NamedRecord>> {
        if self.failed {
            return None;
        }

        let values = match self.inner.next()? {
            Ok(values) => values,
            Err(err) => return Some(Err(err)),
        };
        if let Some(err) = self.invalid.take() {
            self.failed = true;
            return Some(Err(err));
        }

        Some(Ok(NamedRecord {
            fields: Arc::clone(&self.inner.names),
            values,
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        let (lower, upper) = self.inner.size_hint();
        match self.invalid {
            Some(_) => (lower.min(1), upper.map(|n| n.min(1))),
            None => (lower, upper),
        }
    }
}

impl std::iter::FusedIterator for Records {}

/// Record with one named field per declared variable.
///
/// Field names follow identifier rules: ASCII letters, digits and
/// underscores, not starting with a digit or an underscore, not a Rust
/// keyword, and unique within the record.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedRecord {
    fields: Arc<[Arc<str>]>,
    values: Vec<Value>,
}

impl NamedRecord {
    pub fn new(fields: &[Arc<str>], values: Vec<Value>) -> Result<Self> {
        validate_fields(fields)?;
        if fields.len() != values.len() {
            return Err(SchemeError::FieldCountMismatch {
                expected: fields.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            fields: fields.into(),
            values,
        })
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .position(|f| f.as_ref() == field)
            .map(|i| &self.values[i])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|f| f.as_ref())
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.fields.iter().map(|f| f.as_ref()).zip(self.values.iter())
    }
}

impl Index<usize> for NamedRecord {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.values[index]
    }
}

impl Index<&str> for NamedRecord {
    type Output = Value;

    fn index(&self, field: &str) -> &Value {
        match self.get(field) {
            Some(value) => value,
            None => panic!("record has no field '{}'", field),
        }
    }
}

impl Serialize for NamedRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (field, value) in self.iter() {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while", "abstract", "become", "box", "do", "final", "gen", "macro",
    "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

fn validate_fields(fields: &[Arc<str>]) -> Result<()> {
    let mut seen = HashSet::with_capacity(fields.len());
    for field in fields {
        if let Some(reason) = field_name_violation(field) {
            return Err(SchemeError::InvalidFieldName {
                name: field.to_string(),
                reason,
            });
        }
        if !seen.insert(field.as_ref()) {
            return Err(SchemeError::InvalidFieldName {
                name: field.to_string(),
                reason: "duplicate field name",
            });
        }
    }
    Ok(())
}

fn field_name_violation(name: &str) -> Option<&'static str> {
    let mut chars = name.chars();
    let first = match chars.next() {
        Some(c) => c,
        None => return Some("empty name"),
    };
    if first == '_' {
        return Some("names cannot start with an underscore");
    }
    if !first.is_ascii_alphabetic() {
        return Some("names must start with a letter");
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Some("names may only contain letters, digits and underscores");
    }
    if RUST_KEYWORDS.contains(&name) {
        return Some("names cannot be keywords");
    }
    None
}
