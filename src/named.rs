//! Named parameters.
//!
//! `Named<S>` tags any container with an immutable name and otherwise
//! behaves like the container: it dereferences to `S`, iterates like `S`,
//! and implements [`ValueSequence`] whenever `S` does. Slicing keeps the
//! name, so split parts of a named variable are still named.

use std::ops::{Deref, Range};
use std::sync::Arc;

use crate::scheme::Variable;
use crate::sequence::ValueSequence;

/// A container with a parameter name attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Named<S> {
    name: Arc<str>,
    values: S,
}

impl<S> Named<S> {
    pub fn new(name: impl Into<Arc<str>>, values: S) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Name used to identify this collection in structured records.
    pub fn parameter_name(&self) -> &str {
        &self.name
    }

    pub fn inner(&self) -> &S {
        &self.values
    }

    pub fn into_inner(self) -> S {
        self.values
    }

    pub fn into_parts(self) -> (Arc<str>, S) {
        (self.name, self.values)
    }
}

/// Attach `name` to `values`.
///
/// ```
/// use iterscheme::{named, ValueSequence};
///
/// let x = named("x", vec![1, 2, 3, 4, 5, 6]);
/// let head = x.slice(0..3);
/// assert_eq!(head.parameter_name(), "x");
/// assert_eq!(*head, vec![1, 2, 3]);
/// ```
pub fn named<S>(name: impl Into<Arc<str>>, values: S) -> Named<S> {
    Named::new(name, values)
}

/// Name carried by a scheme variable, if it was declared with one.
pub fn get_name(variable: &Variable) -> Option<Arc<str>> {
    variable.name_arc()
}

impl<S> Deref for Named<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.values
    }
}

impl<S: ValueSequence> ValueSequence for Named<S> {
    type Item = S::Item;

    fn len(&self) -> usize {
        self.values.len()
    }

    fn get(&self, index: usize) -> Option<S::Item> {
        self.values.get(index)
    }

    fn slice(&self, range: Range<usize>) -> Self {
        Self {
            name: Arc::clone(&self.name),
            values: self.values.slice(range),
        }
    }
}

impl<S: IntoIterator> IntoIterator for Named<S> {
    type Item = S::Item;
    type IntoIter = S::IntoIter;

    fn into_iter(self) -> S::IntoIter {
        self.values.into_iter()
    }
}

impl<'a, S> IntoIterator for &'a Named<S>
where
    &'a S: IntoIterator,
{
    type Item = <&'a S as IntoIterator>::Item;
    type IntoIter = <&'a S as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        (&self.values).into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Value, Values};

    #[test]
    fn test_slice_keeps_name() {
        let x = named("x", vec![1, 2, 3, 4, 5, 6]);
        let head = x.slice(0..3);

        assert_eq!(head.parameter_name(), "x");
        assert_eq!(head.inner(), &vec![1, 2, 3]);
        assert_eq!(head.len(), 3);
    }

    #[test]
    fn test_indexing_returns_plain_element() {
        let x = named("x", vec![10, 20, 30]);
        assert_eq!(ValueSequence::get(&x, 1), Some(20));
        // Deref exposes the container's own API
        assert_eq!(x[2], 30);
        assert_eq!(x.iter().sum::<i32>(), 60);
    }

    #[test]
    fn test_buffer_backed_slice_stays_buffer() {
        let w = named("w", Values::floats(vec![0.1, 0.2, 0.3, 0.4]));
        let tail = w.slice(2..4);

        assert_eq!(tail.parameter_name(), "w");
        assert!(matches!(tail.inner(), Values::Floats(_)));
        assert_eq!(ValueSequence::get(&tail, 0), Some(Value::Float(0.3)));
    }

    #[test]
    fn test_bools_stay_bools() {
        let flags = named("flag", Values::bools(vec![true, false, true]));
        let sliced = flags.slice(1..3);
        assert!(matches!(sliced.inner(), Values::Bools(_)));
        assert_eq!(ValueSequence::get(&sliced, 0), Some(Value::Bool(false)));
    }

    #[test]
    fn test_iterates_like_inner() {
        let s = named("s", vec!["a", "b"]);
        let collected: Vec<_> = (&s).into_iter().copied().collect();
        assert_eq!(collected, vec!["a", "b"]);
        assert_eq!(s.into_iter().count(), 2);
    }

    #[test]
    fn test_get_name() {
        let named_var = Variable::from(named("c", 0.5));
        assert_eq!(get_name(&named_var).as_deref(), Some("c"));

        let plain = Variable::from(0.5);
        assert_eq!(get_name(&plain), None);
    }
}
