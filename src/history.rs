// src/history.rs - Append-only record of the transforms applied to the working image

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{BubbleKickerError, Result};
use crate::recipe::Recipe;
use crate::transforms::Operation;

/// One applied transform, in application order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Zero-based position in the log
    pub step: usize,
    pub operation: Operation,
}

impl OperationRecord {
    pub fn description(&self) -> String {
        self.operation.to_string()
    }
}

impl fmt::Display for OperationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)
    }
}

/// Ordered log of applied operations. Only grows, except for [`OperationLog::clear`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationLog {
    entries: Vec<OperationRecord>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, operation: Operation) -> &OperationRecord {
        let step = self.entries.len();
        self.entries.push(OperationRecord { step, operation });
        &self.entries[step]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn records(&self) -> &[OperationRecord] {
        &self.entries
    }

    /// Most recently applied operation
    pub fn last(&self) -> Result<&OperationRecord> {
        self.entries.last().ok_or(BubbleKickerError::EmptyHistory)
    }

    /// Human-readable descriptions, most recent last
    pub fn descriptions(&self) -> Vec<String> {
        self.entries.iter().map(OperationRecord::description).collect()
    }

    /// Turn the recorded steps into a recipe that reproduces them
    pub fn to_recipe(&self, name: &str) -> Recipe {
        Recipe::new(
            name,
            self.entries.iter().map(|r| r.operation.clone()).collect(),
        )
    }
}
