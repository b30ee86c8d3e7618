//! Balanced partitioning and the expansion of split levels into parts.
//!
//! ## Partitioning
//!
//! `[0, L)` splits into `n` contiguous chunks of `L / n` elements; the
//! last chunk absorbs the remainder. With `L = 10, n = 3` the chunks are
//! `0..3, 3..6, 6..10`. When `L < n` every chunk but the last is empty.
//!
//! ## Expansion
//!
//! A level list with partitions unfolds depth-first into standalone level
//! lists ("parts"). Each partitioned level multiplies the number of parts
//! by its chunk count; the first partitioned level varies slowest, so the
//! parts are in the same order as nested loops over the chunk indices.

use std::ops::Range;

use tracing::trace;

use super::level::Level;
use crate::error::{Result, SchemeError};

/// Divide `[0, len)` into `parts` balanced half-open ranges.
pub fn balanced_partitions(len: usize, parts: usize) -> Result<Vec<Range<usize>>> {
    if parts < 1 {
        return Err(SchemeError::invalid_split(format!(
            "cannot split into {} parts",
            parts
        )));
    }

    let size = len / parts;
    let ranges: Vec<Range<usize>> = (0..parts)
        .map(|i| {
            let start = i * size;
            let end = if i + 1 == parts { len } else { start + size };
            start..end
        })
        .collect();

    trace!(len, parts, chunk = size, last = len - (parts - 1) * size, "balanced partitions");
    Ok(ranges)
}

/// Unfold every partitioned level into standalone, partition-free parts.
///
/// Always returns at least one part.
pub fn expand(levels: &[Level]) -> Vec<Vec<Level>> {
    let mut parts: Vec<Vec<Level>> = vec![Vec::with_capacity(levels.len())];

    for level in levels {
        match level.partitions() {
            None => {
                for part in &mut parts {
                    part.push(level.clone());
                }
            }
            Some(ranges) => {
                parts = parts
                    .into_iter()
                    .flat_map(|prefix| {
                        ranges.iter().map(move |range| {
                            let mut part = prefix.clone();
                            part.push(level.chunk(range));
                            part
                        })
                    })
                    .collect();
            }
        }
    }

    parts
}
