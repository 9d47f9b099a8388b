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

//! NULL check expression

use crate::core::{DataType, Result, Row, Value};
use crate::executor::QueryBindings;

use super::{Expression, ExpressionRef};

/// `operand IS NULL` / `operand IS NOT NULL`
#[derive(Debug, Clone)]
pub struct NullCheckExpr {
    operand: ExpressionRef,
    negated: bool,
}

impl NullCheckExpr {
    pub fn is_null(operand: ExpressionRef) -> Self {
        Self {
            operand,
            negated: false,
        }
    }

    pub fn is_not_null(operand: ExpressionRef) -> Self {
        Self {
            operand,
            negated: true,
        }
    }
}

impl Expression for NullCheckExpr {
    fn evaluate(&self, row: Option<&Row>, bindings: &QueryBindings) -> Result<Value> {
        let is_null = self.operand.evaluate(row, bindings)?.is_null();
        Ok(Value::boolean(is_null != self.negated))
    }

    fn result_type(&self) -> DataType {
        DataType::Boolean
    }

    fn needs_row(&self) -> bool {
        self.operand.needs_row()
    }
}
