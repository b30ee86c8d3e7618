//! Declarative nested-loop iteration schemes.
//!
//! ```text
//! constants![c1, c2] ─chain─▶ element![x] ─chain─▶ element![y, z]
//!        │                        │                     │
//!   fixed prefix             outer loop            inner loop (zipped)
//!        ▼                        ▼                     ▼
//!   (c1, c2, x[i], y[j], z[j])   for i in x:   for (y[j], z[j]) in zip(y, z)
//! ```
//!
//! - [`Level`]: one nesting depth, variables zipped together
//! - [`IterationScheme`]: builder composing levels by chaining, with splitting
//! - [`NestedIterationScheme`]: the single-pass iterator producing records
//!
//! Splitting a level yields independent parts that can be handed to
//! separate workers; see [`IterationScheme::into_parts`].

pub mod element;
pub mod level;
pub mod nested;
pub mod split;

pub use element::IterationScheme;
pub use level::{Level, Variable};
pub use nested::NestedIterationScheme;
pub use split::balanced_partitions;

/// Whether levels may still be appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SchemeState {
    /// Chaining allowed.
    #[default]
    Building,
    /// Iteration has started; chaining fails.
    Frozen,
}

/// Leading element for schemes without constants.
pub fn no_constants() -> IterationScheme {
    IterationScheme::empty()
}

/// Build a single-level element from heterogeneous variables.
///
/// Each argument goes through `Variable::from`, so plain vectors, numeric
/// buffers, scalars and [`Named`](crate::Named) containers can be mixed.
/// With no arguments this is the empty sentinel element.
///
/// ```
/// use iterscheme::{element, named, Values};
///
/// let level = element![named("x", vec![1, 2, 3]), Values::floats(vec![0.1, 0.2, 0.3])];
/// assert_eq!(level.levels()[0].variables().len(), 2);
/// ```
#[macro_export]
macro_rules! element {
    () => {
        $crate::IterationScheme::empty()
    };
    ($($var:expr),+ $(,)?) => {
        $crate::IterationScheme::new(::std::vec![$($crate::Variable::from($var)),+])
    };
}

/// Leading element holding constants.
///
/// Constants are emitted whole, once per record: `constants![vec![1, 2]]`
/// contributes the list `[1, 2]` to every record rather than looping over it.
#[macro_export]
macro_rules! constants {
    ($($var:expr),* $(,)?) => {
        $crate::element!($($var),*)
    };
}
