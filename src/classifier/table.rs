use crate::category::Category;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

const DEFAULT_TOML: &str = include_str!("../../classification-default.toml");

/// Stacks shallower than this are never attributed
pub const MIN_FRAMES: usize = 3;

/// Errors in a classification table definition
#[derive(Error, Debug)]
pub enum TableError {
    #[error("invalid classification table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("classification table has no rules")]
    Empty,

    #[error("rule {index} has an empty function name")]
    EmptyFunction { index: usize },

    #[error("min_frames = {min_frames} is below the minimum of {min}", min = MIN_FRAMES)]
    TooFewFrames { min_frames: usize },
}

/// Which stacks are discarded before classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StackFilter {
    /// Minimum number of resolved frames, at least [`MIN_FRAMES`]
    pub min_frames: usize,

    /// Marker functions that make a sample non-attributable
    pub short_circuit: Vec<String>,
}

impl Default for StackFilter {
    fn default() -> Self {
        Self {
            min_frames: MIN_FRAMES,
            short_circuit: Vec::new(),
        }
    }
}

/// One entry of the table: a kernel function and the category it implies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub function: String,
    pub category: Category,
}

impl Rule {
    pub fn new(function: impl Into<String>, category: Category) -> Self {
        Self {
            function: function.into(),
            category,
        }
    }

    /// True if the rule's function appears anywhere in `stack`
    pub fn matches(&self, stack: &[String]) -> bool {
        stack.iter().any(|frame| *frame == self.function)
    }
}

/// Ordered classification rules plus the pre-filter
///
/// # Example TOML
/// ```toml
/// [filter]
/// min_frames = 3
/// short_circuit = ["ret_from_fork"]
///
/// [[rule]]
/// function = "io_schedule"
/// category = "disk io"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationTable {
    #[serde(default)]
    pub filter: StackFilter,

    #[serde(rename = "rule")]
    pub rules: Vec<Rule>,
}

impl ClassificationTable {
    /// Built-in table, compiled into the binary
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(DEFAULT_TOML).context("Failed to parse embedded classification-default.toml")
    }

    pub fn from_toml_str(content: &str) -> Result<Self, TableError> {
        let table: ClassificationTable = toml::from_str(content)?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).with_context(|| {
            format!("Failed to read classification table: {}", path.display())
        })?;
        let table = Self::from_toml_str(&content)
            .with_context(|| format!("Failed to load classification table: {}", path.display()))?;
        tracing::info!(rules = table.rules.len(), path = %path.display(), "loaded classification table");
        Ok(table)
    }

    fn validate(&self) -> Result<(), TableError> {
        if self.filter.min_frames < MIN_FRAMES {
            return Err(TableError::TooFewFrames {
                min_frames: self.filter.min_frames,
            });
        }
        if self.rules.is_empty() {
            return Err(TableError::Empty);
        }
        if let Some(index) = self.rules.iter().position(|r| r.function.trim().is_empty()) {
            return Err(TableError::EmptyFunction { index });
        }
        Ok(())
    }
}
