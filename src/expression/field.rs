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

//! Leaf expressions: row fields, literals and bindings

use crate::core::{DataType, Result, Row, Value};
use crate::executor::QueryBindings;

use super::Expression;

/// Field of the current row
#[derive(Debug, Clone)]
pub struct FieldExpr {
    index: usize,
    data_type: DataType,
}

impl FieldExpr {
    pub fn new(index: usize, data_type: DataType) -> Self {
        Self { index, data_type }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl Expression for FieldExpr {
    fn evaluate(&self, row: Option<&Row>, _bindings: &QueryBindings) -> Result<Value> {
        match row {
            Some(row) => row.value(self.index).cloned(),
            None => Ok(Value::null(self.data_type)),
        }
    }

    fn result_type(&self) -> DataType {
        self.data_type
    }
}

/// Constant value
#[derive(Debug, Clone)]
pub struct LiteralExpr {
    value: Value,
}

impl LiteralExpr {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl Expression for LiteralExpr {
    fn evaluate(&self, _row: Option<&Row>, _bindings: &QueryBindings) -> Result<Value> {
        Ok(self.value.clone())
    }

    fn result_type(&self) -> DataType {
        self.value.data_type()
    }

    fn needs_row(&self) -> bool {
        false
    }
}

/// Field of the row bound at a position
#[derive(Debug, Clone)]
pub struct BoundFieldExpr {
    position: usize,
    index: usize,
    data_type: DataType,
}

impl BoundFieldExpr {
    pub fn new(position: usize, index: usize, data_type: DataType) -> Self {
        Self {
            position,
            index,
            data_type,
        }
    }
}

impl Expression for BoundFieldExpr {
    fn evaluate(&self, _row: Option<&Row>, bindings: &QueryBindings) -> Result<Value> {
        bindings.row(self.position)?.value(self.index).cloned()
    }

    fn result_type(&self) -> DataType {
        self.data_type
    }

    fn needs_row(&self) -> bool {
        false
    }
}

/// Value bound at a position
#[derive(Debug, Clone)]
pub struct BoundValueExpr {
    position: usize,
    data_type: DataType,
}

impl BoundValueExpr {
    pub fn new(position: usize, data_type: DataType) -> Self {
        Self {
            position,
            data_type,
        }
    }
}

impl Expression for BoundValueExpr {
    fn evaluate(&self, _row: Option<&Row>, bindings: &QueryBindings) -> Result<Value> {
        bindings.value(self.position).cloned()
    }

    fn result_type(&self) -> DataType {
        self.data_type
    }

    fn needs_row(&self) -> bool {
        false
    }
}
