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

//! Expression adapter
//!
//! Operators treat scalar expressions as opaque callables: given an optional
//! row and the current bindings, an [`Expression`] yields a typed value (a
//! NULL for unknown results). Evaluation must be deterministic within one
//! execution.
//!
//! # Expression Types
//!
//! - [`FieldExpr`] - field of the current row
//! - [`LiteralExpr`] - constant
//! - [`BoundFieldExpr`], [`BoundValueExpr`] - bound row field / bound value
//! - [`ComparisonExpr`] - three-valued comparison
//! - [`AndExpr`], [`OrExpr`], [`NotExpr`] - logical operators
//! - [`NullCheckExpr`] - IS NULL / IS NOT NULL
//!
//! [`UpdateFunction`] is the row-to-row contract used by update operators.

pub mod comparison;
pub mod field;
pub mod logical;
pub mod null_check;
pub mod update;

use std::fmt::Debug;
use std::sync::Arc;

use crate::core::{CompareOp, DataType, Result, Row, RowType, Value};
use crate::executor::QueryBindings;

pub use comparison::ComparisonExpr;
pub use field::{BoundFieldExpr, BoundValueExpr, FieldExpr, LiteralExpr};
pub use logical::{AndExpr, NotExpr, OrExpr};
pub use null_check::NullCheckExpr;
pub use update::{ExpressionUpdate, UpdateFunction};

/// Scalar expression evaluated against a row and the bindings
pub trait Expression: Send + Sync + Debug {
    /// Evaluate the expression.
    ///
    /// `row` is `None` where no input row exists (range bounds, default rows).
    fn evaluate(&self, row: Option<&Row>, bindings: &QueryBindings) -> Result<Value>;

    /// Static result type
    fn result_type(&self) -> DataType;

    /// True if evaluation reads the current row
    fn needs_row(&self) -> bool {
        true
    }
}

pub type ExpressionRef = Arc<dyn Expression>;

/// Evaluate a predicate; NULL and false both reject
pub fn evaluate_predicate(
    expr: &dyn Expression,
    row: Option<&Row>,
    bindings: &QueryBindings,
) -> Result<bool> {
    Ok(expr.evaluate(row, bindings)?.is_true())
}

// =============================================================================
// Constructors
// =============================================================================

/// Field `index` of rows of `row_type`
pub fn field(row_type: &RowType, index: usize) -> ExpressionRef {
    Arc::new(FieldExpr::new(
        index,
        row_type.field_type(index).unwrap_or_default(),
    ))
}

/// Fields `0..n` of rows of `row_type`
pub fn fields(row_type: &RowType) -> Vec<ExpressionRef> {
    (0..row_type.field_count()).map(|i| field(row_type, i)).collect()
}

pub fn literal(value: impl Into<Value>) -> ExpressionRef {
    Arc::new(LiteralExpr::new(value.into()))
}

/// Field `index` of the row bound at `position`
pub fn bound_field(position: usize, row_type: &RowType, index: usize) -> ExpressionRef {
    Arc::new(BoundFieldExpr::new(
        position,
        index,
        row_type.field_type(index).unwrap_or_default(),
    ))
}

/// Value bound at `position`
pub fn bound_value(position: usize, data_type: DataType) -> ExpressionRef {
    Arc::new(BoundValueExpr::new(position, data_type))
}

pub fn compare(left: ExpressionRef, op: CompareOp, right: ExpressionRef) -> ExpressionRef {
    Arc::new(ComparisonExpr::new(left, op, right))
}

pub fn and(left: ExpressionRef, right: ExpressionRef) -> ExpressionRef {
    Arc::new(AndExpr::new(left, right))
}

pub fn or(left: ExpressionRef, right: ExpressionRef) -> ExpressionRef {
    Arc::new(OrExpr::new(left, right))
}

pub fn not(operand: ExpressionRef) -> ExpressionRef {
    Arc::new(NotExpr::new(operand))
}

pub fn is_null(operand: ExpressionRef) -> ExpressionRef {
    Arc::new(NullCheckExpr::is_null(operand))
}
