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

//! Logical operators (AND, OR, NOT) with SQL three-valued logic

use crate::core::{DataType, Result, Row, Value};
use crate::executor::QueryBindings;

use super::{Expression, ExpressionRef};

/// Tri-state view of a boolean value
fn truth(value: &Value) -> Option<bool> {
    if value.is_null() {
        None
    } else {
        Some(value.is_true())
    }
}

fn from_truth(truth: Option<bool>) -> Value {
    match truth {
        Some(b) => Value::boolean(b),
        None => Value::null(DataType::Boolean),
    }
}

/// `left AND right`
#[derive(Debug, Clone)]
pub struct AndExpr {
    left: ExpressionRef,
    right: ExpressionRef,
}

impl AndExpr {
    pub fn new(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self { left, right }
    }
}

impl Expression for AndExpr {
    fn evaluate(&self, row: Option<&Row>, bindings: &QueryBindings) -> Result<Value> {
        let left = truth(&self.left.evaluate(row, bindings)?);
        if left == Some(false) {
            return Ok(Value::boolean(false));
        }
        let right = truth(&self.right.evaluate(row, bindings)?);
        Ok(from_truth(match (left, right) {
            (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        }))
    }

    fn result_type(&self) -> DataType {
        DataType::Boolean
    }

    fn needs_row(&self) -> bool {
        self.left.needs_row() || self.right.needs_row()
    }
}

/// `left OR right`
#[derive(Debug, Clone)]
pub struct OrExpr {
    left: ExpressionRef,
    right: ExpressionRef,
}

impl OrExpr {
    pub fn new(left: ExpressionRef, right: ExpressionRef) -> Self {
        Self { left, right }
    }
}

impl Expression for OrExpr {
    fn evaluate(&self, row: Option<&Row>, bindings: &QueryBindings) -> Result<Value> {
        let left = truth(&self.left.evaluate(row, bindings)?);
        if left == Some(true) {
            return Ok(Value::boolean(true));
        }
        let right = truth(&self.right.evaluate(row, bindings)?);
        Ok(from_truth(match (left, right) {
            (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        }))
    }

    fn result_type(&self) -> DataType {
        DataType::Boolean
    }

    fn needs_row(&self) -> bool {
        self.left.needs_row() || self.right.needs_row()
    }
}

/// `NOT operand`
#[derive(Debug, Clone)]
pub struct NotExpr {
    operand: ExpressionRef,
}

impl NotExpr {
    pub fn new(operand: ExpressionRef) -> Self {
        Self { operand }
    }
}

impl Expression for NotExpr {
    fn evaluate(&self, row: Option<&Row>, bindings: &QueryBindings) -> Result<Value> {
        let value = truth(&self.operand.evaluate(row, bindings)?);
        Ok(from_truth(value.map(|b| !b)))
    }

    fn result_type(&self) -> DataType {
        DataType::Boolean
    }

    fn needs_row(&self) -> bool {
        self.operand.needs_row()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::literal;

    fn eval(expr: &dyn Expression) -> Value {
        expr.evaluate(None, &QueryBindings::new()).unwrap()
    }

    #[test]
    fn test_three_valued_logic() {
        let t = || literal(true);
        let f = || literal(false);
        let n = || literal(Value::null(DataType::Boolean));

        assert_eq!(eval(&AndExpr::new(t(), t())), Value::boolean(true));
        assert_eq!(eval(&AndExpr::new(n(), f())), Value::boolean(false));
        assert!(eval(&AndExpr::new(t(), n())).is_null());

        assert_eq!(eval(&OrExpr::new(n(), t())), Value::boolean(true));
        assert!(eval(&OrExpr::new(f(), n())).is_null());

        assert_eq!(eval(&NotExpr::new(f())), Value::boolean(true));
        assert!(eval(&NotExpr::new(n())).is_null());
    }
}
