//! Iteration-scheme elements: construction, chaining and splitting.

use tracing::debug;

use super::level::{ensure_loop_levels, Level, Variable};
use super::nested::{part_len, NestedIterationScheme};
use super::split::{balanced_partitions, expand};
use super::SchemeState;
use crate::error::{Result, SchemeError};

/// One or more levels of a nested-loop structure.
///
/// Elements compose left to right with [`chain`](Self::chain): the first
/// level of the result holds the constants (emitted once per record, not
/// looped) and every following level is a loop, outer to inner.
///
/// ```
/// use iterscheme::{constants, element, Value};
///
/// let scheme = constants![0.5, "s"].chain(element![vec![4, 5, 6]])?;
/// let records: Vec<_> = scheme.into_iter().collect();
///
/// assert_eq!(records.len(), 3);
/// assert_eq!(records[0], vec![Value::from(0.5), Value::from("s"), Value::from(4)]);
/// # Ok::<(), iterscheme::SchemeError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct IterationScheme {
    levels: Vec<Level>,
    state: SchemeState,
}

impl IterationScheme {
    /// Single-level element zipping `variables` together. No variables gives
    /// the empty sentinel level.
    pub fn new(variables: impl IntoIterator<Item = Variable>) -> Self {
        Self {
            levels: vec![Level::new(variables)],
            state: SchemeState::Building,
        }
    }

    /// Element whose only level has no variables.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Append `other`'s levels after this element's levels.
    ///
    /// Every appended level becomes a loop level, so its variables must be
    /// sequences.
    pub fn chain(mut self, other: IterationScheme) -> Result<Self> {
        if self.is_frozen() {
            return Err(SchemeError::FrozenSchemeMutation);
        }
        ensure_loop_levels(&other.levels, self.levels.len())?;

        self.levels.extend(other.levels);
        Ok(self)
    }

    /// Partition the first level into `parts` balanced chunks.
    ///
    /// All variables of that level must be sequences of equal length `L`.
    /// Chunks hold `L / parts` rows except the last, which absorbs the
    /// remainder. Later levels are not affected. Splitting again replaces
    /// the previous partitions.
    pub fn split(mut self, parts: usize) -> Result<Self> {
        if self.is_frozen() {
            return Err(SchemeError::FrozenSchemeMutation);
        }
        if parts < 1 {
            return Err(SchemeError::invalid_split(format!(
                "cannot split into {} parts",
                parts
            )));
        }

        let first = self
            .levels
            .first_mut()
            .ok_or_else(|| SchemeError::invalid_split("scheme has no levels"))?;
        let len = first.common_len()?;
        let partitions = balanced_partitions(len, parts)?;

        debug!(len, parts, "split level");
        first.set_partitions(partitions);
        Ok(self)
    }

    /// Standalone level lists, one per combination of chunks.
    ///
    /// Without partitions this is exactly one list, the levels as declared.
    pub fn nested_variables(&self) -> Vec<Vec<Level>> {
        let parts = expand(&self.levels);
        if parts.len() > 1 {
            debug!(parts = parts.len(), "expanded split levels");
        }
        parts
    }

    /// One independent core per split part.
    pub fn into_parts(self) -> Vec<NestedIterationScheme> {
        self.nested_variables()
            .into_iter()
            .map(|part| NestedIterationScheme::from_parts(vec![part]))
            .collect()
    }

    /// Start a pass over this element. The element freezes: later calls to
    /// `chain` or `split` fail.
    pub fn iter(&mut self) -> NestedIterationScheme {
        self.state = SchemeState::Frozen;
        NestedIterationScheme::from_parts(self.nested_variables())
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn into_levels(self) -> Vec<Level> {
        self.levels
    }

    /// Number of levels, constants level included.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn state(&self) -> SchemeState {
        self.state
    }

    pub fn is_frozen(&self) -> bool {
        self.state == SchemeState::Frozen
    }

    /// Records a full pass would produce over all parts, if it fits.
    pub fn len_hint(&self) -> Option<usize> {
        self.nested_variables()
            .iter()
            .try_fold(0usize, |acc, part| acc.checked_add(part_len(part)?))
    }
}

impl Default for IterationScheme {
    fn default() -> Self {
        Self::empty()
    }
}

impl IntoIterator for IterationScheme {
    type Item = crate::types::Record;
    type IntoIter = NestedIterationScheme;

    fn into_iter(self) -> NestedIterationScheme {
        NestedIterationScheme::from(self)
    }
}
