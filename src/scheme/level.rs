//! Variables and levels: the building blocks of a scheme.

use std::ops::Range;
use std::sync::Arc;

use crate::error::{Result, SchemeError};
use crate::named::Named;
use crate::types::{Buffer, Value, Values};

/// One variable of a level: a value with an optional parameter name.
///
/// Loop levels need the value to be a sequence. A leading constant level
/// accepts anything, because constants are emitted whole.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    name: Option<Arc<str>>,
    value: Value,
}

impl Variable {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn name_arc(&self) -> Option<Arc<str>> {
        self.name.clone()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn values(&self) -> Option<&Values> {
        self.value.as_seq()
    }

    /// Length when the variable holds a sequence.
    pub fn len(&self) -> Option<usize> {
        self.values().map(Values::len)
    }

    /// Slice of a sequence variable, keeping the name. Scalars are cloned.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let value = match &self.value {
            Value::Seq(values) => Value::Seq(values.slice(range)),
            scalar => scalar.clone(),
        };
        Self {
            name: self.name.clone(),
            value,
        }
    }
}

macro_rules! variable_from {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Variable {
                fn from(value: $ty) -> Self {
                    Variable::new(value)
                }
            }
        )+
    };
}

variable_from!(
    Value,
    Values,
    bool,
    i32,
    u32,
    i64,
    f32,
    f64,
    &str,
    String,
    Arc<str>,
    Buffer<bool>,
    Buffer<i64>,
    Buffer<f64>,
    Buffer<Value>,
);

impl<T: Into<Value>> From<Vec<T>> for Variable {
    fn from(items: Vec<T>) -> Self {
        Variable::new(items)
    }
}

impl<S: Into<Value>> From<Named<S>> for Variable {
    fn from(named: Named<S>) -> Self {
        let (name, values) = named.into_parts();
        Variable::named(name, values)
    }
}

/// One nesting depth: variables zipped together, optionally partitioned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Level {
    variables: Vec<Variable>,
    partitions: Option<Vec<Range<usize>>>,
}

impl Level {
    pub fn new(variables: impl IntoIterator<Item = Variable>) -> Self {
        Self {
            variables: variables.into_iter().collect(),
            partitions: None,
        }
    }

    /// Level without variables; as the first level it means "no constants".
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    pub fn into_variables(self) -> Vec<Variable> {
        self.variables
    }

    pub fn partitions(&self) -> Option<&[Range<usize>]> {
        self.partitions.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn is_split(&self) -> bool {
        self.partitions.is_some()
    }

    /// Number of zipped rows at a loop level: the shortest variable wins,
    /// and a level with no variables has no rows.
    pub fn rows(&self) -> usize {
        self.variables
            .iter()
            .map(|v| v.len().unwrap_or(0))
            .min()
            .unwrap_or(0)
    }

    /// Shared length of every variable, required for splitting.
    pub(crate) fn common_len(&self) -> Result<usize> {
        let mut common = None;
        for (index, variable) in self.variables.iter().enumerate() {
            let len = variable.len().ok_or_else(|| {
                SchemeError::invalid_split(format!(
                    "variable {} is a {}, not a sequence",
                    index,
                    variable.value().kind()
                ))
            })?;
            match common {
                None => common = Some(len),
                Some(expected) if expected != len => {
                    return Err(SchemeError::invalid_split(format!(
                        "variables have unequal lengths ({} and {})",
                        expected, len
                    )));
                }
                Some(_) => {}
            }
        }
        common.ok_or_else(|| SchemeError::invalid_split("level has no variables"))
    }

    pub(crate) fn set_partitions(&mut self, partitions: Vec<Range<usize>>) {
        self.partitions = Some(partitions);
    }

    /// Copy of this level restricted to one chunk, without partitions.
    pub(crate) fn chunk(&self, range: &Range<usize>) -> Level {
        Level {
            variables: self
                .variables
                .iter()
                .map(|v| v.slice(range.clone()))
                .collect(),
            partitions: None,
        }
    }
}

/// Check that every variable of every level is a sequence. `first_index`
/// is the position of `levels[0]` within the whole scheme, for reporting.
pub(crate) fn ensure_loop_levels(levels: &[Level], first_index: usize) -> Result<()> {
    for (offset, level) in levels.iter().enumerate() {
        for (index, variable) in level.variables().iter().enumerate() {
            if !variable.value().is_seq() {
                return Err(SchemeError::NotASequence {
                    level: first_index + offset,
                    index,
                    kind: variable.value().kind(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::named::named;

    #[test]
    fn test_rows_is_shortest() {
        let level = Level::new([Variable::from(vec![1, 2, 3]), Variable::from(vec!["a", "b"])]);
        assert_eq!(level.rows(), 2);
        assert_eq!(Level::empty().rows(), 0);
    }

    #[test]
    fn test_common_len() {
        let level = Level::new([Variable::from(vec![1, 2]), Variable::from(vec![3, 4])]);
        assert_eq!(level.common_len(), Ok(2));

        let unequal = Level::new([Variable::from(vec![1, 2]), Variable::from(vec![3])]);
        assert!(matches!(unequal.common_len(), Err(SchemeError::InvalidSplit { .. })));

        let scalar = Level::new([Variable::from(0.5)]);
        assert!(matches!(scalar.common_len(), Err(SchemeError::InvalidSplit { .. })));

        assert!(matches!(Level::empty().common_len(), Err(SchemeError::InvalidSplit { .. })));
    }

    #[test]
    fn test_chunk_slices_every_variable() {
        let level = Level::new([
            Variable::from(named("x", vec![1, 2, 3, 4])),
            Variable::from(vec!["a", "b", "c", "d"]),
        ]);
        let chunk = level.chunk(&(1..3));

        assert_eq!(chunk.variables()[0].name(), Some("x"));
        assert_eq!(chunk.variables()[0].len(), Some(2));
        assert_eq!(chunk.variables()[1].values().and_then(|v| v.get(0)), Some(Value::from("b")));
        assert!(!chunk.is_split());
    }

    #[test]
    fn test_ensure_loop_levels_reports_position() {
        let levels = vec![
            Level::new([Variable::from(vec![1])]),
            Level::new([Variable::from(vec![2]), Variable::from("scalar")]),
        ];
        assert_eq!(
            ensure_loop_levels(&levels, 1),
            Err(SchemeError::NotASequence {
                level: 2,
                index: 1,
                kind: "str"
            })
        );
    }
}
