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

//! Default row for empty input

use crate::core::{Error, InputPreservation, Result, Row, RowTypeRef};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};
use crate::expression::ExpressionRef;

/// Emits one row built from `expressions` when the input produces nothing.
///
/// With [`InputPreservation::KeepInput`] input rows are passed on;
/// otherwise they are only counted.
#[derive(Debug)]
pub struct IfEmpty {
    input: OperatorRef,
    row_type: RowTypeRef,
    expressions: Vec<ExpressionRef>,
    preservation: InputPreservation,
}

impl IfEmpty {
    pub fn new(
        input: OperatorRef,
        row_type: RowTypeRef,
        expressions: Vec<ExpressionRef>,
        preservation: InputPreservation,
    ) -> Result<Self> {
        if expressions.len() != row_type.field_count() {
            return Err(Error::invalid_argument(format!(
                "{} default expressions for {} with {} fields",
                expressions.len(),
                row_type,
                row_type.field_count()
            )));
        }
        Ok(Self {
            input,
            row_type,
            expressions,
            preservation,
        })
    }
}

impl PlanNode for IfEmpty {
    fn name(&self) -> &'static str {
        "IfEmpty_Default"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(IfEmptyCursor {
            input: self.input.cursor(ctx)?,
            row_type: self.row_type.clone(),
            expressions: self.expressions.clone(),
            keep_input: self.preservation == InputPreservation::KeepInput,
            seen: 0,
            done: false,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn describe(&self) -> String {
        format!("{} {:?}", self.row_type, self.preservation)
    }
}

struct IfEmptyCursor {
    input: Box<dyn Cursor>,
    row_type: RowTypeRef,
    expressions: Vec<ExpressionRef>,
    keep_input: bool,
    seen: usize,
    done: bool,
}

impl CursorBody for IfEmptyCursor {
    fn name(&self) -> &'static str {
        "IfEmpty_Default"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.seen = 0;
        self.done = false;
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        if self.done {
            return Ok(None);
        }
        while let Some(row) = self.input.next(bindings)? {
            self.seen += 1;
            if self.keep_input {
                return Ok(Some(row));
            }
        }
        self.done = true;
        if self.seen > 0 {
            return Ok(None);
        }
        let values = self
            .expressions
            .iter()
            .map(|e| e.evaluate(None, bindings))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Row::new(self.row_type.clone(), values)))
    }

    fn release(&mut self) {
        self.input.close();
    }
}
