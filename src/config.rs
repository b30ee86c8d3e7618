//! Sweep files: TOML descriptions of an iteration scheme.
//!
//! ## Example
//!
//! ```toml
//! [constants]
//! learning_rate = 0.5
//! label = "baseline"
//!
//! [[level]]
//! seed = [1, 2, 3]
//!
//! [[level]]
//! optimizer = ["sgd", "adam"]
//! momentum = [0.0, 0.9]
//!
//! [split]
//! parts = 2
//! ```
//!
//! Keys become variable names in document order. `[constants]` is the
//! fixed prefix; each `[[level]]` table is one zipped loop level, outer to
//! inner. `[split]` partitions the first loop level.
//!
//! Arrays map onto the tightest backing: all booleans become a bool
//! buffer, all integers an int buffer, any mix of integers and floats a
//! float buffer, everything else a generic list.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use crate::error::SchemeError;
use crate::scheme::{no_constants, IterationScheme, Variable};
use crate::types::{Value, Values};

/// Errors from loading or interpreting a sweep file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read sweep file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse sweep file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unsupported value for '{key}': {kind}")]
    UnsupportedValue { key: String, kind: &'static str },

    #[error(transparent)]
    Scheme(#[from] SchemeError),
}

/// Parsed sweep file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepConfig {
    /// File this config was read from (for display).
    pub source: Option<PathBuf>,

    /// Named constants, emitted on every record.
    pub constants: Vec<(String, Value)>,

    /// Loop levels, outer to inner; each holds zipped named sequences.
    pub levels: Vec<Vec<(String, Value)>>,

    /// Number of parts to split the first loop level into.
    pub split: Option<usize>,
}

/// Raw sweep as deserialized from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RawSweep {
    #[serde(default)]
    constants: IndexMap<String, toml::Value>,
    #[serde(default, rename = "level")]
    levels: Vec<IndexMap<String, toml::Value>>,
    split: Option<RawSplit>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSplit {
    parts: usize,
}

impl SweepConfig {
    /// Read and parse a sweep file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawSweep = toml::from_str(content)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSweep) -> Result<Self, ConfigError> {
        let constants = convert_table(raw.constants)?;
        let levels = raw
            .levels
            .into_iter()
            .map(convert_table)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            source: None,
            constants,
            levels,
            split: raw.split.map(|s| s.parts),
        })
    }

    /// Build the described scheme.
    pub fn to_scheme(&self) -> Result<IterationScheme, ConfigError> {
        if self.levels.is_empty() && self.split.is_some() {
            return Err(SchemeError::InvalidSplit {
                reason: "sweep has no loop level to split".to_string(),
            }
            .into());
        }

        let mut scheme = if self.constants.is_empty() {
            no_constants()
        } else {
            IterationScheme::new(named_variables(&self.constants))
        };

        for (index, level) in self.levels.iter().enumerate() {
            let mut element = IterationScheme::new(named_variables(level));
            if index == 0 {
                if let Some(parts) = self.split {
                    element = element.split(parts)?;
                }
            }
            scheme = scheme.chain(element)?;
        }

        Ok(scheme)
    }

    /// Format config for verbose display.
    pub fn display_summary(&self) -> String {
        let mut lines = Vec::new();

        match &self.source {
            Some(source) => lines.push(format!("   Sweep: {}", source.display())),
            None => lines.push("   Sweep: (inline)".to_string()),
        }

        if !self.constants.is_empty() {
            let names: Vec<&str> = self.constants.iter().map(|(k, _)| k.as_str()).collect();
            lines.push(format!("   Constants: {}", names.join(", ")));
        }

        for (depth, level) in self.levels.iter().enumerate() {
            let names: Vec<&str> = level.iter().map(|(k, _)| k.as_str()).collect();
            let label = if names.len() > 1 { " (zipped)" } else { "" };
            lines.push(format!("   Level {}{}: {}", depth, label, names.join(", ")));
        }

        if let Some(parts) = self.split {
            lines.push(format!("   Split: {} parts", parts));
        }

        lines.join("\n")
    }
}

fn named_variables(entries: &[(String, Value)]) -> Vec<Variable> {
    entries
        .iter()
        .map(|(name, value)| Variable::named(name.as_str(), value.clone()))
        .collect()
}

fn convert_table(table: IndexMap<String, toml::Value>) -> Result<Vec<(String, Value)>, ConfigError> {
    table
        .into_iter()
        .map(|(key, value)| {
            let value = convert_value(&key, value)?;
            Ok((key, value))
        })
        .collect()
}

fn convert_value(key: &str, value: toml::Value) -> Result<Value, ConfigError> {
    match value {
        toml::Value::Boolean(b) => Ok(Value::Bool(b)),
        toml::Value::Integer(i) => Ok(Value::Int(i)),
        toml::Value::Float(x) => Ok(Value::Float(x)),
        toml::Value::String(s) => Ok(Value::from(s)),
        toml::Value::Datetime(dt) => Ok(Value::from(dt.to_string())),
        toml::Value::Array(items) => convert_array(key, items).map(Value::Seq),
        toml::Value::Table(_) => Err(ConfigError::UnsupportedValue {
            key: key.to_string(),
            kind: "table",
        }),
    }
}

fn convert_array(key: &str, items: Vec<toml::Value>) -> Result<Values, ConfigError> {
    if !items.is_empty() && items.iter().all(|v| matches!(v, toml::Value::Boolean(_))) {
        let bools: Vec<bool> = items.iter().filter_map(toml::Value::as_bool).collect();
        return Ok(Values::bools(bools));
    }
    if !items.is_empty() && items.iter().all(|v| matches!(v, toml::Value::Integer(_))) {
        let ints: Vec<i64> = items.iter().filter_map(toml::Value::as_integer).collect();
        return Ok(Values::ints(ints));
    }
    let numeric = items
        .iter()
        .all(|v| matches!(v, toml::Value::Integer(_) | toml::Value::Float(_)));
    if !items.is_empty() && numeric {
        let floats: Vec<f64> = items
            .iter()
            .filter_map(|v| match v {
                toml::Value::Integer(i) => Some(*i as f64),
                toml::Value::Float(x) => Some(*x),
                _ => None,
            })
            .collect();
        return Ok(Values::floats(floats));
    }

    let list = items
        .into_iter()
        .map(|v| convert_value(key, v))
        .collect::<Result<Vec<Value>, _>>()?;
    Ok(Values::list(list))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::map_adapter;
    use std::io::Write;

    const SWEEP: &str = r#"
[constants]
learning_rate = 0.5
label = "baseline"

[[level]]
seed = [1, 2, 3]

[[level]]
optimizer = ["sgd", "adam"]
momentum = [0.0, 0.9]
"#;

    #[test]
    fn test_parse_sweep() {
        let config = SweepConfig::from_toml_str(SWEEP).unwrap();

        let constant_names: Vec<&str> = config.constants.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(constant_names, vec!["learning_rate", "label"]);
        assert_eq!(config.levels.len(), 2);
        assert_eq!(config.levels[1][0].0, "optimizer");
        assert!(matches!(config.levels[0][0].1, Value::Seq(Values::Ints(_))));
        assert!(matches!(config.levels[1][1].1, Value::Seq(Values::Floats(_))));
        assert_eq!(config.split, None);
    }

    #[test]
    fn test_sweep_records() {
        let scheme = SweepConfig::from_toml_str(SWEEP).unwrap().to_scheme().unwrap();
        let records: Vec<_> = map_adapter(scheme).unwrap().collect::<Result<_, _>>().unwrap();

        assert_eq!(records.len(), 6);
        let keys: Vec<&str> = records[0].keys().map(|k| k.as_ref()).collect();
        assert_eq!(keys, vec!["learning_rate", "label", "seed", "optimizer", "momentum"]);
        assert_eq!(records[1]["seed"], Value::Int(1));
        assert_eq!(records[1]["optimizer"], Value::from("adam"));
        assert_eq!(records[1]["momentum"], Value::Float(0.9));
        assert_eq!(records[5]["seed"], Value::Int(3));
    }

    #[test]
    fn test_split_section() {
        let content = format!("{}\n[split]\nparts = 3\n", SWEEP);
        let config = SweepConfig::from_toml_str(&content).unwrap();
        assert_eq!(config.split, Some(3));

        let parts = config.to_scheme().unwrap().into_parts();
        assert_eq!(parts.len(), 3);
        assert!(parts.into_iter().all(|p| p.count() == 2));
    }

    #[test]
    fn test_no_constants() {
        let config = SweepConfig::from_toml_str("[[level]]\nx = [true, false]\n").unwrap();
        let records: Vec<_> = config.to_scheme().unwrap().into_iter().collect();
        assert_eq!(records, vec![vec![Value::Bool(true)], vec![Value::Bool(false)]]);
    }

    #[test]
    fn test_mixed_array_is_list() {
        let config = SweepConfig::from_toml_str("[[level]]\nx = [1, \"two\", [3]]\n").unwrap();
        let values = config.levels[0][0].1.as_seq().unwrap();
        assert!(matches!(values, Values::List(_)));
        assert_eq!(values.get(1), Some(Value::from("two")));
        assert_eq!(values.get(2), Some(Value::Seq(Values::ints(vec![3]))));
    }

    #[test]
    fn test_scalar_level_rejected() {
        let config = SweepConfig::from_toml_str("[[level]]\nx = 1\n").unwrap();
        assert!(matches!(
            config.to_scheme(),
            Err(ConfigError::Scheme(SchemeError::NotASequence { .. }))
        ));
    }

    #[test]
    fn test_split_without_levels_rejected() {
        let config = SweepConfig::from_toml_str("[constants]\na = 1\n[split]\nparts = 2\n").unwrap();
        assert!(matches!(
            config.to_scheme(),
            Err(ConfigError::Scheme(SchemeError::InvalidSplit { .. }))
        ));
    }

    #[test]
    fn test_unequal_split_rejected() {
        let config = SweepConfig::from_toml_str("[[level]]\nx = [1, 2]\ny = [1]\n[split]\nparts = 2\n").unwrap();
        assert!(matches!(
            config.to_scheme(),
            Err(ConfigError::Scheme(SchemeError::InvalidSplit { .. }))
        ));
    }

    #[test]
    fn test_unknown_section_rejected() {
        assert!(matches!(
            SweepConfig::from_toml_str("[levels]\nx = [1]\n"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_nested_table_rejected() {
        assert!(matches!(
            SweepConfig::from_toml_str("[constants.inner]\na = 1\n"),
            Err(ConfigError::UnsupportedValue { kind: "table", .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SWEEP.as_bytes()).unwrap();

        let config = SweepConfig::load(file.path()).unwrap();
        assert_eq!(config.source.as_deref(), Some(file.path()));
        let summary = config.display_summary();
        assert!(summary.contains("Level 0: seed"));
        assert!(summary.contains("Level 1 (zipped): optimizer, momentum"));
    }

    #[test]
    fn test_unsplit_sweep_is_single_part() {
        let parts = SweepConfig::from_toml_str(SWEEP).unwrap().to_scheme().unwrap().into_parts();
        assert_eq!(parts.len(), 1);
        assert!(parts.into_iter().all(|p| p.count() == 6));
    }

    #[test]
    fn test_load_missing_file() {
        let err = SweepConfig::load(Path::new("/nonexistent/sweep.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/sweep.toml"));
    }
}
