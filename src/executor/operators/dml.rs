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

//! Modification operators
//!
//! Each input row is written to the store as it is pulled. The
//! `*_returning` operators emit the stored row; plain DML plans are run by
//! [`UpdatePlan`](crate::executor::UpdatePlan), which only counts rows.

use std::fmt;
use std::sync::Arc;

use crate::core::{Result, Row};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};
use crate::expression::UpdateFunction;
use crate::storage::StoreRef;

/// The write applied to every input row
#[derive(Clone)]
pub enum DmlAction {
    Insert,
    Update(Arc<dyn UpdateFunction>),
    Delete { cascade: bool },
}

impl DmlAction {
    /// Apply to one row. `None` means the row was not selected for update.
    pub fn apply(&self, store: &StoreRef, row: &Row, bindings: &QueryBindings) -> Result<Option<Row>> {
        match self {
            DmlAction::Insert => store.insert_row(row).map(Some),
            DmlAction::Update(update) => {
                if !update.row_is_selected(row) {
                    return Ok(None);
                }
                let new_row = update.evaluate(row, bindings)?;
                store.update_row(row, &new_row).map(Some)
            }
            DmlAction::Delete { cascade } => {
                store.delete_row(row, *cascade)?;
                Ok(Some(row.clone()))
            }
        }
    }
}

impl fmt::Debug for DmlAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DmlAction::Insert => write!(f, "Insert"),
            DmlAction::Update(update) => write!(f, "Update({:?})", update),
            DmlAction::Delete { cascade } => write!(f, "Delete(cascade: {})", cascade),
        }
    }
}

struct DmlCursor {
    name: &'static str,
    ctx: QueryContext,
    input: Box<dyn Cursor>,
    action: DmlAction,
    modified: usize,
}

impl CursorBody for DmlCursor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.modified = 0;
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        let row = match self.input.next(bindings)? {
            Some(row) => row,
            None => return Ok(None),
        };
        match self.action.apply(self.ctx.store(), &row, bindings)? {
            Some(stored) => {
                self.modified += 1;
                Ok(Some(stored))
            }
            // unselected rows pass through unchanged
            None => Ok(Some(row)),
        }
    }

    fn release(&mut self) {
        log::debug!("{} modified {} rows", self.name, self.modified);
        self.input.close();
    }
}

fn dml_cursor(
    name: &'static str,
    ctx: &QueryContext,
    input: &OperatorRef,
    action: DmlAction,
) -> Result<Box<dyn Cursor>> {
    Ok(managed(DmlCursor {
        name,
        ctx: ctx.clone(),
        input: input.cursor(ctx)?,
        action,
        modified: 0,
    }))
}

#[derive(Debug)]
pub struct InsertReturning {
    input: OperatorRef,
}

impl InsertReturning {
    pub fn new(input: OperatorRef) -> Self {
        Self { input }
    }
}

impl PlanNode for InsertReturning {
    fn name(&self) -> &'static str {
        "Insert_Returning"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        dml_cursor(self.name(), ctx, &self.input, DmlAction::Insert)
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }
}

#[derive(Debug)]
pub struct UpdateReturning {
    input: OperatorRef,
    update: Arc<dyn UpdateFunction>,
}

impl UpdateReturning {
    pub fn new(input: OperatorRef, update: Arc<dyn UpdateFunction>) -> Self {
        Self { input, update }
    }
}

impl PlanNode for UpdateReturning {
    fn name(&self) -> &'static str {
        "Update_Returning"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        dml_cursor(
            self.name(),
            ctx,
            &self.input,
            DmlAction::Update(Arc::clone(&self.update)),
        )
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn describe(&self) -> String {
        format!("{:?}", self.update)
    }
}

#[derive(Debug)]
pub struct DeleteReturning {
    input: OperatorRef,
    cascade: bool,
}

impl DeleteReturning {
    pub fn new(input: OperatorRef, cascade: bool) -> Self {
        Self { input, cascade }
    }
}

impl PlanNode for DeleteReturning {
    fn name(&self) -> &'static str {
        "Delete_Returning"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        dml_cursor(
            self.name(),
            ctx,
            &self.input,
            DmlAction::Delete {
                cascade: self.cascade,
            },
        )
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn describe(&self) -> String {
        if self.cascade {
            "cascade".to_string()
        } else {
            String::new()
        }
    }
}
