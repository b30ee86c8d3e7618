//! iterscheme - declarative nested-loop iteration
//!
//! Describe a parameter sweep as a chain of levels and iterate it as one
//! flat sequence of records: constants first, then the Cartesian product
//! of the loop levels, with the variables of one level zipped together.
//!
//! # Architecture
//!
//! ```text
//! Values → Named → Level → IterationScheme ─chain/split─▶ NestedIterationScheme → Adapter
//!   ↓        ↓       ↓            ↓                                ↓                  ↓
//! buffers  names   zipped     builder with               odometer over rows     NamedMap /
//!                  group      Building/Frozen state      (innermost fastest)    NamedRecord
//! ```
//!
//! # Example
//!
//! ```
//! use iterscheme::{constants, element, no_constants, Value};
//!
//! let scheme = constants![0.5]
//!     .chain(element![vec![1, 2]])?
//!     .chain(element![vec!["a", "b"], vec![10, 20]])?;
//!
//! let records: Vec<_> = scheme.into_iter().collect();
//! assert_eq!(records.len(), 4);
//! assert_eq!(records[1], vec![Value::from(0.5), Value::from(1), Value::from("b"), Value::from(20)]);
//!
//! // Split the outer loop into independent parts
//! let parts = no_constants().chain(element![vec![1, 2, 3, 4]].split(2)?)?.into_parts();
//! assert_eq!(parts.len(), 2);
//! # Ok::<(), iterscheme::SchemeError>(())
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod named;
pub mod scheme;
pub mod sequence;
pub mod types;

// Re-export core types
pub use error::{Result, SchemeError};
pub use named::{get_name, named, Named};
pub use scheme::{
    balanced_partitions, no_constants, IterationScheme, Level, NestedIterationScheme, SchemeState,
    Variable,
};
pub use sequence::ValueSequence;
pub use types::{Buffer, Record, Value, Values};

// Re-export adapters
pub use adapter::{
    adapter, map_adapter, record_adapter, to_map, to_record, Adapted, NamedMap, NamedRecord,
    Records,
};

// Re-export sweep files
pub use config::{ConfigError, SweepConfig};
