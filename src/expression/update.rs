// Copyright 2025 Stoolap Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Row update functions for the update operators

use std::fmt::Debug;

use crate::core::{Error, Result, Row};
use crate::executor::QueryBindings;

use super::ExpressionRef;

/// Computes the new version of a row
pub trait UpdateFunction: Send + Sync + Debug {
    /// Rows for which this returns false pass through unchanged
    fn row_is_selected(&self, _row: &Row) -> bool {
        true
    }

    /// New row for `original`, of the same row type
    fn evaluate(&self, original: &Row, bindings: &QueryBindings) -> Result<Row>;
}

/// Assigns expression results to fields, leaving other fields unchanged
#[derive(Debug, Clone)]
pub struct ExpressionUpdate {
    assignments: Vec<(usize, ExpressionRef)>,
}

impl ExpressionUpdate {
    pub fn new(assignments: Vec<(usize, ExpressionRef)>) -> Self {
        Self { assignments }
    }
}

impl UpdateFunction for ExpressionUpdate {
    fn evaluate(&self, original: &Row, bindings: &QueryBindings) -> Result<Row> {
        let mut values = original.values().to_vec();
        for (field, expr) in &self.assignments {
            let value = expr.evaluate(Some(original), bindings)?;
            let slot = values.get_mut(*field).ok_or(Error::FieldOutOfRange {
                index: *field,
                len: original.len(),
            })?;
            *slot = value;
        }
        let mut row = Row::new(original.row_type().clone(), values);
        row.set_hkey(original.hkey().cloned());
        Ok(row)
    }
}
