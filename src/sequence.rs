//! The capability contract every value container satisfies.
//!
//! The scheme only ever needs three things from a container: its length,
//! positional access and slicing. Nothing here mutates.

use std::ops::Range;

use crate::types::{Buffer, Value, Values};

/// Minimal ordered-sequence interface.
pub trait ValueSequence {
    type Item;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Plain element at `index`.
    fn get(&self, index: usize) -> Option<Self::Item>;

    /// Half-open sub-range with the same container type.
    fn slice(&self, range: Range<usize>) -> Self
    where
        Self: Sized;
}

impl<T: Clone> ValueSequence for Vec<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.as_slice().len()
    }

    fn get(&self, index: usize) -> Option<T> {
        self.as_slice().get(index).cloned()
    }

    fn slice(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.as_slice().len());
        let start = range.start.min(end);
        self[start..end].to_vec()
    }
}

impl<T: Clone> ValueSequence for Buffer<T> {
    type Item = T;

    fn len(&self) -> usize {
        Buffer::len(self)
    }

    fn get(&self, index: usize) -> Option<T> {
        Buffer::get(self, index)
    }

    fn slice(&self, range: Range<usize>) -> Self {
        Buffer::slice(self, range)
    }
}

impl ValueSequence for Values {
    type Item = Value;

    fn len(&self) -> usize {
        Values::len(self)
    }

    fn get(&self, index: usize) -> Option<Value> {
        Values::get(self, index)
    }

    fn slice(&self, range: Range<usize>) -> Self {
        Values::slice(self, range)
    }
}
