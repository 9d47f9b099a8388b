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

//! Comparison expression

use crate::core::{CompareOp, DataType, Error, Result, Row, Value};
use crate::executor::QueryBindings;

use super::{Expression, ExpressionRef};

/// `left op right` with three-valued logic: a NULL operand yields NULL
#[derive(Debug, Clone)]
pub struct ComparisonExpr {
    left: ExpressionRef,
    op: CompareOp,
    right: ExpressionRef,
}

impl ComparisonExpr {
    pub fn new(left: ExpressionRef, op: CompareOp, right: ExpressionRef) -> Self {
        Self { left, op, right }
    }
}

impl Expression for ComparisonExpr {
    fn evaluate(&self, row: Option<&Row>, bindings: &QueryBindings) -> Result<Value> {
        let left = self.left.evaluate(row, bindings)?;
        let right = self.right.evaluate(row, bindings)?;
        if left.is_null() || right.is_null() {
            return Ok(Value::null(DataType::Boolean));
        }
        match left.compare(&right) {
            Ok(ordering) => Ok(Value::boolean(self.op.matches(ordering))),
            Err(Error::NullComparison) => Ok(Value::null(DataType::Boolean)),
            Err(e) => Err(e),
        }
    }

    fn result_type(&self) -> DataType {
        DataType::Boolean
    }

    fn needs_row(&self) -> bool {
        self.left.needs_row() || self.right.needs_row()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{field, literal, FieldExpr};
    use std::sync::Arc;

    #[test]
    fn test_comparison_three_valued() {
        let bindings = QueryBindings::new();
        let gt = ComparisonExpr::new(
            Arc::new(FieldExpr::new(0, DataType::Integer)),
            CompareOp::Gt,
            literal(5),
        );
        let schema = crate::core::SchemaBuilder::new()
            .table(
                crate::core::TableSpec::new("t")
                    .add_primary_key("id", DataType::Integer)
                    .add_nullable("x", DataType::Integer),
            )
            .build()
            .unwrap();
        let rt = schema.table_type("t").unwrap();
        let row = Row::new(Arc::clone(&rt), vec![Value::integer(7), Value::null_unknown()]);

        assert_eq!(gt.evaluate(Some(&row), &bindings).unwrap(), Value::boolean(true));

        let null_cmp = ComparisonExpr::new(field(&rt, 1), CompareOp::Eq, literal(1));
        assert!(null_cmp.evaluate(Some(&row), &bindings).unwrap().is_null());

        let type_err = ComparisonExpr::new(field(&rt, 0), CompareOp::Eq, literal("x"));
        assert!(type_err.evaluate(Some(&row), &bindings).is_err());
    }
}
