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

//! Row counts
//!
//! [`Count`] consumes the rows of the counted type and emits one count row
//! when its input is exhausted; rows of other types pass through.
//! [`CountTableStatus`] asks the store for a table's row count.

use crate::core::{Error, Result, Row, RowTypeRef, Schema, TableId, Value};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};

#[derive(Debug)]
pub struct Count {
    input: OperatorRef,
    count_type: RowTypeRef,
    output_type: RowTypeRef,
}

impl Count {
    pub fn new(schema: &Schema, input: OperatorRef, count_type: RowTypeRef) -> Self {
        Self {
            input,
            count_type,
            output_type: schema.count_type(),
        }
    }
}

impl PlanNode for Count {
    fn name(&self) -> &'static str {
        "Count_Default"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(CountCursor {
            input: self.input.cursor(ctx)?,
            count_type: self.count_type.id(),
            output_type: self.output_type.clone(),
            count: 0,
            emitted: false,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn output_type(&self) -> Option<RowTypeRef> {
        Some(self.output_type.clone())
    }

    fn describe(&self) -> String {
        self.count_type.to_string()
    }
}

struct CountCursor {
    input: Box<dyn Cursor>,
    count_type: u32,
    output_type: RowTypeRef,
    count: i64,
    emitted: bool,
}

impl CursorBody for CountCursor {
    fn name(&self) -> &'static str {
        "Count_Default"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.count = 0;
        self.emitted = false;
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        if self.emitted {
            return Ok(None);
        }
        while let Some(row) = self.input.next(bindings)? {
            if row.row_type().id() == self.count_type {
                self.count += 1;
            } else {
                return Ok(Some(row));
            }
        }
        self.emitted = true;
        Ok(Some(Row::new(
            self.output_type.clone(),
            vec![Value::integer(self.count)],
        )))
    }

    fn release(&mut self) {
        self.input.close();
    }
}

#[derive(Debug)]
pub struct CountTableStatus {
    table_type: RowTypeRef,
    table: TableId,
    output_type: RowTypeRef,
}

impl CountTableStatus {
    pub fn new(schema: &Schema, table_type: RowTypeRef) -> Result<Self> {
        let table = table_type.table_id().ok_or_else(|| {
            Error::invalid_argument(format!("{} is not a table row type", table_type))
        })?;
        Ok(Self {
            table_type,
            table,
            output_type: schema.count_type(),
        })
    }
}

impl PlanNode for CountTableStatus {
    fn name(&self) -> &'static str {
        "Count_TableStatus"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(TableStatusCursor {
            ctx: ctx.clone(),
            table: self.table,
            output_type: self.output_type.clone(),
            emitted: false,
        }))
    }

    fn output_type(&self) -> Option<RowTypeRef> {
        Some(self.output_type.clone())
    }

    fn describe(&self) -> String {
        self.table_type.to_string()
    }
}

struct TableStatusCursor {
    ctx: QueryContext,
    table: TableId,
    output_type: RowTypeRef,
    emitted: bool,
}

impl CursorBody for TableStatusCursor {
    fn name(&self) -> &'static str {
        "Count_TableStatus"
    }

    fn open(&mut self, _bindings: &mut QueryBindings) -> Result<()> {
        self.emitted = false;
        Ok(())
    }

    fn next(&mut self, _bindings: &mut QueryBindings) -> Result<Option<Row>> {
        if self.emitted {
            return Ok(None);
        }
        self.emitted = true;
        let count = self.ctx.store().row_count(self.table)?;
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        Ok(Some(Row::new(
            self.output_type.clone(),
            vec![Value::integer(count)],
        )))
    }

    fn release(&mut self) {}
}
