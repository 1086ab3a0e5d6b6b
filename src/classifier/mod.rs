// Stack-pattern classification of off-CPU intervals
//
// Each off-CPU sample carries the kernel stack captured when the task was
// scheduled out. An ordered table of (function, category) rules maps that
// stack to a wait category: the first rule whose function appears anywhere in
// the stack wins, regardless of where in the stack it sits. This is a
// heuristic and the rule order is part of its observable behaviour.
//
// Before the table is consulted, stacks that are too shallow or that contain a
// short-circuit marker (return-to-user and fork-return paths) are discarded.
// Those samples are neither charged nor reported as unknown.

mod table;

pub use table::{ClassificationTable, Rule, StackFilter, TableError, MIN_FRAMES};

use crate::category::Category;

/// Why a stack was discarded before classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterReason {
    TooShallow { frames: usize },
    ShortCircuit { marker: String },
}

/// Outcome of classifying one stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Not attributable; ignore the sample
    Filtered(FilterReason),
    /// Passed the filter but matched no rule
    Unknown,
    Category(Category),
}

impl Classification {
    pub fn category(&self) -> Option<Category> {
        match self {
            Classification::Category(c) => Some(*c),
            _ => None,
        }
    }
}

/// Classifies resolved kernel stacks with a [`ClassificationTable`]
#[derive(Debug, Clone)]
pub struct StackClassifier {
    table: ClassificationTable,
}

impl StackClassifier {
    pub fn new(table: ClassificationTable) -> Self {
        Self { table }
    }

    /// Classifier using the built-in table
    pub fn builtin() -> anyhow::Result<Self> {
        Ok(Self::new(ClassificationTable::builtin()?))
    }

    pub fn table(&self) -> &ClassificationTable {
        &self.table
    }

    /// Apply the pre-filter, returning why the stack is discarded
    pub fn prefilter(&self, stack: &[String]) -> Option<FilterReason> {
        let filter = &self.table.filter;

        if stack.len() < filter.min_frames {
            return Some(FilterReason::TooShallow {
                frames: stack.len(),
            });
        }

        filter
            .short_circuit
            .iter()
            .find(|marker| stack.contains(marker))
            .map(|marker| FilterReason::ShortCircuit {
                marker: marker.clone(),
            })
    }

    /// First rule, in table order, whose function occurs in `stack`
    pub fn first_match(&self, stack: &[String]) -> Option<Category> {
        self.table
            .rules
            .iter()
            .find(|rule| rule.matches(stack))
            .map(|rule| rule.category)
    }

    pub fn classify(&self, stack: &[String]) -> Classification {
        if let Some(reason) = self.prefilter(stack) {
            return Classification::Filtered(reason);
        }

        match self.first_match(stack) {
            Some(category) => Classification::Category(category),
            None => Classification::Unknown,
        }
    }
}

#[cfg(test)]
mod tests;
