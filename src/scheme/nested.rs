//! The iterator core: flattened Cartesian product across levels.
//!
//! ## Normalization
//!
//! On the first pull the scheme freezes and each part is normalized:
//! - a non-empty first level becomes a fixed prefix emitted whole on every
//!   record (constants are not looped)
//! - an empty first level is dropped
//! - every other level zips its variables positionally into rows
//!
//! ## Product
//!
//! Rows are combined with an odometer: the innermost level advances first
//! and carries into outer levels on overflow, which is standard nested-loop
//! order. The product of zero loop levels is a single record holding just
//! the prefix; a loop level with zero rows produces no records at all.
//!
//! ## Re-entry
//!
//! A core is single-pass. Once exhausted it stays exhausted. Build a fresh
//! core from the original element for another pass.

use smallvec::SmallVec;
use tracing::{debug, trace};

use super::element::IterationScheme;
use super::level::{ensure_loop_levels, Level, Variable};
use super::split::expand;
use super::SchemeState;
use crate::error::{Result, SchemeError};
use crate::types::{Record, Value, Values};

/// Stack-allocated index threshold: schemes up to 8 loop levels deep keep
/// their odometer on the stack.
const SMALL_DEPTH: usize = 8;

type IndexVec = SmallVec<[usize; SMALL_DEPTH]>;

/// Single-pass iterator over the records of a scheme.
///
/// Built from an [`IterationScheme`] (every split part is iterated in turn)
/// or from a raw list of levels.
#[derive(Debug)]
pub struct NestedIterationScheme {
    parts: Vec<Vec<Level>>,
    next_part: usize,
    active: Option<Product>,
    state: SchemeState,
}

impl NestedIterationScheme {
    /// Core over a raw level list. Every level after the first must hold
    /// sequences only.
    pub fn from_levels(levels: Vec<Level>) -> Result<Self> {
        if levels.len() > 1 {
            ensure_loop_levels(&levels[1..], 1)?;
        }
        Ok(Self::from_parts(expand(&levels)))
    }

    pub(crate) fn from_parts(parts: Vec<Vec<Level>>) -> Self {
        Self {
            parts,
            next_part: 0,
            active: None,
            state: SchemeState::Building,
        }
    }

    pub fn state(&self) -> SchemeState {
        self.state
    }

    pub fn is_frozen(&self) -> bool {
        self.state == SchemeState::Frozen
    }

    /// Standalone level lists this core iterates, in order.
    pub fn parts(&self) -> &[Vec<Level>] {
        &self.parts
    }

    /// Append an element's levels to every part. Only allowed before the
    /// first record is pulled.
    pub fn chain(mut self, element: IterationScheme) -> Result<Self> {
        if self.is_frozen() {
            return Err(SchemeError::FrozenSchemeMutation);
        }

        let depth = self.parts.first().map_or(0, Vec::len);
        let (loops, first_index) = match depth {
            // Nothing declared yet: the first appended level holds constants
            0 => (element.levels().get(1..).unwrap_or_default(), 1),
            _ => (element.levels(), depth),
        };
        ensure_loop_levels(loops, first_index)?;

        let appended = element.into_levels();
        let parts = std::mem::take(&mut self.parts);
        self.parts = parts
            .into_iter()
            .flat_map(|mut part| {
                part.extend(appended.iter().cloned());
                expand(&part)
            })
            .collect();
        Ok(self)
    }

    /// Declared variables in the order their values appear in a record.
    ///
    /// These are the original entities, not produced values, so names
    /// attached at construction time are visible here.
    pub fn variables(&self) -> impl Iterator<Item = &Variable> + '_ {
        self.parts
            .first()
            .into_iter()
            .flatten()
            .flat_map(|level| level.variables())
    }

    /// Total number of records, if it fits in a `usize`.
    pub fn total_len(&self) -> Option<usize> {
        self.parts
            .iter()
            .try_fold(0usize, |acc, part| acc.checked_add(part_len(part)?))
    }

    fn freeze(&mut self) {
        self.state = SchemeState::Frozen;
        debug!(
            parts = self.parts.len(),
            depth = self.parts.first().map_or(0, Vec::len),
            "iteration scheme frozen"
        );
    }
}

impl From<IterationScheme> for NestedIterationScheme {
    fn from(element: IterationScheme) -> Self {
        Self::from_parts(element.nested_variables())
    }
}

impl Iterator for NestedIterationScheme {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.state == SchemeState::Building {
            self.freeze();
        }

        loop {
            if let Some(product) = self.active.as_mut() {
                if let Some(record) = product.next() {
                    return Some(record);
                }
                self.active = None;
            }

            let levels = self.parts.get(self.next_part)?.clone();
            trace!(part = self.next_part, "starting part");
            self.next_part += 1;
            self.active = Some(Product::new(levels));
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let active = self.active.as_ref().map_or(Some(0), |p| p.remaining);
        let pending = self.parts[self.next_part.min(self.parts.len())..]
            .iter()
            .try_fold(0usize, |acc, part| acc.checked_add(part_len(part)?));

        match active.zip(pending).and_then(|(a, p)| a.checked_add(p)) {
            Some(total) => (total, Some(total)),
            None => (usize::MAX, None),
        }
    }
}

impl std::iter::FusedIterator for NestedIterationScheme {}

/// Record count of one standalone part.
pub(crate) fn part_len(levels: &[Level]) -> Option<usize> {
    levels
        .iter()
        .skip(1)
        .try_fold(1usize, |acc, level| acc.checked_mul(level.rows()))
}

/// Odometer over the zipped rows of one normalized part.
#[derive(Debug, Clone)]
struct Product {
    /// Constant prefix emitted on every record.
    prefix: Vec<Value>,
    /// Loop levels, each a group of zipped sequences.
    levels: Vec<Vec<Values>>,
    /// Row count per loop level.
    dims: IndexVec,
    /// Current row per loop level.
    indices: IndexVec,
    /// Values per record.
    width: usize,
    /// Records left to produce, unless the product overflows `usize`.
    remaining: Option<usize>,
    first: bool,
    done: bool,
}

impl Product {
    fn new(levels: Vec<Level>) -> Self {
        let remaining = part_len(&levels);
        let mut levels = levels.into_iter();

        // Leading level: fixed prefix, or nothing for the empty sentinel
        let prefix: Vec<Value> = levels
            .next()
            .map(|first| {
                first
                    .into_variables()
                    .into_iter()
                    .map(Variable::into_value)
                    .collect()
            })
            .unwrap_or_default();

        let loops: Vec<(usize, Vec<Values>)> = levels
            .map(|level| {
                let rows = level.rows();
                let group = level
                    .into_variables()
                    .into_iter()
                    .filter_map(|v| match v.into_value() {
                        Value::Seq(values) => Some(values),
                        _ => None,
                    })
                    .collect();
                (rows, group)
            })
            .collect();

        let dims: IndexVec = loops.iter().map(|(rows, _)| *rows).collect();
        let width = prefix.len() + loops.iter().map(|(_, group)| group.len()).sum::<usize>();
        let levels: Vec<Vec<Values>> = loops.into_iter().map(|(_, group)| group).collect();

        let mut indices = IndexVec::with_capacity(dims.len());
        indices.resize(dims.len(), 0);

        trace!(prefix = prefix.len(), dims = ?dims.as_slice(), "normalized part");

        Self {
            done: dims.iter().any(|&d| d == 0),
            prefix,
            levels,
            dims,
            indices,
            width,
            remaining,
            first: true,
        }
    }

    fn current(&self) -> Record {
        let mut record = Vec::with_capacity(self.width);
        record.extend(self.prefix.iter().cloned());
        for (group, &row) in self.levels.iter().zip(self.indices.iter()) {
            record.extend(group.iter().filter_map(|values| values.get(row)));
        }
        record
    }

    /// Advance the odometer, rightmost first.
    fn advance(&mut self) -> bool {
        for i in (0..self.indices.len()).rev() {
            self.indices[i] += 1;
            if self.indices[i] < self.dims[i] {
                return true;
            }
            self.indices[i] = 0;
        }
        false
    }
}

impl Iterator for Product {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.done {
            return None;
        }

        if self.first {
            self.first = false;
        } else if !self.advance() {
            self.done = true;
            self.remaining = Some(0);
            return None;
        }

        self.remaining = self.remaining.map(|n| n.saturating_sub(1));
        Some(self.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheme::no_constants;
    use crate::{constants, element};

    fn ints(record: &Record) -> Vec<i64> {
        record.iter().filter_map(Value::as_int).collect()
    }

    #[test]
    fn test_constants_prefix_and_product() {
        let scheme = constants![0.5, "s"]
            .chain(element![vec![4, 5, 6]])
            .unwrap();
        let records: Vec<_> = NestedIterationScheme::from(scheme).collect();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0], vec![Value::from(0.5), Value::from("s"), Value::from(4)]);
        assert_eq!(records[2], vec![Value::from(0.5), Value::from("s"), Value::from(6)]);
    }

    #[test]
    fn test_innermost_fastest() {
        let scheme = no_constants()
            .chain(element![vec![4, 5, 6]])
            .unwrap()
            .chain(element![vec![1, 2, 3]])
            .unwrap();
        let records: Vec<_> = scheme.into_iter().map(|r| ints(&r)).collect();

        assert_eq!(records.len(), 9);
        assert_eq!(records[0], vec![4, 1]);
        assert_eq!(records[1], vec![4, 2]);
        assert_eq!(records[2], vec![4, 3]);
        assert_eq!(records[3], vec![5, 1]);
        assert_eq!(records[8], vec![6, 3]);
    }

    #[test]
    fn test_zipped_level_is_not_a_product() {
        let scheme = no_constants()
            .chain(element![vec![4, 5, 6]])
            .unwrap()
            .chain(element![vec!["a", "b", "c"], vec![101, 102, 103]])
            .unwrap();
        let records: Vec<_> = scheme.into_iter().collect();

        assert_eq!(records.len(), 9);
        assert_eq!(records[0], vec![Value::from(4), Value::from("a"), Value::from(101)]);
        assert_eq!(records[1], vec![Value::from(4), Value::from("b"), Value::from(102)]);
        assert_eq!(records[5], vec![Value::from(5), Value::from("c"), Value::from(103)]);
    }

    #[test]
    fn test_sequence_constant_emitted_whole() {
        let scheme = constants![vec![1, 2, 3]].chain(element![vec![4, 5, 6]]).unwrap();
        let records: Vec<_> = scheme.into_iter().collect();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0], vec![Value::from(vec![1, 2, 3]), Value::from(4)]);
        assert_eq!(records[1], vec![Value::from(vec![1, 2, 3]), Value::from(5)]);
    }

    #[test]
    fn test_unequal_lengths_truncate_to_shortest() {
        let scheme = no_constants()
            .chain(element![vec![1, 2, 3], vec![10, 20]])
            .unwrap();
        let records: Vec<_> = scheme.into_iter().map(|r| ints(&r)).collect();
        assert_eq!(records, vec![vec![1, 10], vec![2, 20]]);
    }

    #[test]
    fn test_no_loop_levels_yields_one_record() {
        let only_constants: Vec<_> = constants![1, 2].into_iter().collect();
        assert_eq!(only_constants, vec![vec![Value::from(1), Value::from(2)]]);

        let nothing: Vec<_> = no_constants().into_iter().collect();
        assert_eq!(nothing, vec![Vec::<Value>::new()]);
    }

    #[test]
    fn test_empty_loop_level_yields_nothing() {
        let empty_seq = no_constants()
            .chain(element![vec![1, 2]])
            .unwrap()
            .chain(element![Vec::<i64>::new()])
            .unwrap();
        assert_eq!(empty_seq.into_iter().count(), 0);

        let empty_level = no_constants()
            .chain(element![vec![1, 2]])
            .unwrap()
            .chain(no_constants())
            .unwrap();
        assert_eq!(empty_level.into_iter().count(), 0);
    }

    #[test]
    fn test_chain_after_iteration_started() {
        let core = NestedIterationScheme::from(no_constants().chain(element![vec![1, 2]]).unwrap());
        assert!(!core.is_frozen());
        let mut core = core.chain(element![vec![3, 4]]).unwrap();

        assert_eq!(core.next().map(|r| ints(&r)), Some(vec![1, 3]));
        assert!(core.is_frozen());
        assert_eq!(
            core.chain(element![vec![5]]).map(|_| ()),
            Err(SchemeError::FrozenSchemeMutation)
        );
    }

    #[test]
    fn test_core_chain_adds_a_nesting_level() {
        let core = NestedIterationScheme::from(no_constants().chain(element![vec![1, 2]]).unwrap())
            .chain(element![vec![3, 4]])
            .unwrap();
        let records: Vec<_> = core.map(|r| ints(&r)).collect();

        assert_eq!(records, vec![vec![1, 3], vec![1, 4], vec![2, 3], vec![2, 4]]);
    }

    #[test]
    fn test_core_chain_re_expands_split_parts() {
        let core = NestedIterationScheme::from(
            no_constants()
                .chain(element![vec![1, 2, 3, 4]].split(2).unwrap())
                .unwrap(),
        )
        .chain(element![vec![7, 8]])
        .unwrap();

        assert_eq!(core.parts().len(), 2);
        assert_eq!(core.count(), 8);
    }

    #[test]
    fn test_chain_onto_empty_core_accepts_constants() {
        let core = NestedIterationScheme::from_levels(Vec::new())
            .unwrap()
            .chain(constants![0.5])
            .unwrap()
            .chain(element![vec![1, 2]])
            .unwrap();
        let records: Vec<_> = core.collect();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], vec![Value::from(0.5), Value::from(1)]);
    }

    #[test]
    fn test_chain_onto_empty_core_still_checks_loop_levels() {
        let core = NestedIterationScheme::from_levels(Vec::new())
            .unwrap()
            .chain(constants![0.5])
            .unwrap();
        assert!(matches!(
            core.chain(constants![1]),
            Err(SchemeError::NotASequence { level: 1, index: 0, .. })
        ));
    }

    #[test]
    fn test_exhaustion_is_fused() {
        let mut core = NestedIterationScheme::from(no_constants().chain(element![vec![1]]).unwrap());
        assert!(core.next().is_some());
        assert!(core.next().is_none());
        assert!(core.next().is_none());
    }

    #[test]
    fn test_size_hint_is_exact() {
        let scheme = constants![0]
            .chain(element![vec![1, 2, 3]])
            .unwrap()
            .chain(element![vec![1, 2]])
            .unwrap();
        let mut core = NestedIterationScheme::from(scheme);

        assert_eq!(core.size_hint(), (6, Some(6)));
        assert_eq!(core.total_len(), Some(6));
        core.next();
        core.next();
        assert_eq!(core.size_hint(), (4, Some(4)));
    }

    #[test]
    fn test_from_levels_rejects_scalar_loop_variable() {
        let levels = vec![
            Level::new([Variable::from(0.5)]),
            Level::new([Variable::from(0.5)]),
        ];
        assert!(matches!(
            NestedIterationScheme::from_levels(levels),
            Err(SchemeError::NotASequence { level: 1, index: 0, .. })
        ));
    }

    #[test]
    fn test_from_levels_matches_element() {
        let levels = vec![
            Level::empty(),
            Level::new([Variable::from(vec![1, 2])]),
            Level::new([Variable::from(vec![3, 4])]),
        ];
        let raw: Vec<_> = NestedIterationScheme::from_levels(levels).unwrap().collect();
        let built: Vec<_> = no_constants()
            .chain(element![vec![1, 2]])
            .unwrap()
            .chain(element![vec![3, 4]])
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(raw, built);
    }

    #[test]
    fn test_deterministic() {
        let build = || {
            no_constants()
                .chain(element![vec![1, 2, 3]])
                .unwrap()
                .chain(element![vec!["x", "y"]])
                .unwrap()
        };
        let first: Vec<_> = build().into_iter().collect();
        let second: Vec<_> = build().into_iter().collect();
        assert_eq!(first, second);
    }
}
