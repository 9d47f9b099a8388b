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

//! Execution driver
//!
//! [`QueryCursor`] runs a root operator once per binding set drawn from a
//! [`QueryBindingsCursor`] and hands back rows in order. [`UpdatePlan`]
//! drains a DML input for its side effects and reports the counts.

use std::fmt;

use log::debug;

use crate::core::{Error, Result, Row};

use super::bindings::{QueryBindings, QueryBindingsCursor, SingletonBindingsCursor};
use super::context::{CancellationHandle, QueryContext};
use super::cursor::Cursor;
use super::operators::DmlAction;
use super::plan::OperatorRef;

/// Rows of a query over a sequence of binding sets
pub struct QueryCursor {
    root: Box<dyn Cursor>,
    bindings_cursor: Box<dyn QueryBindingsCursor>,
    /// Binding set the root cursor is currently open with
    current: Option<QueryBindings>,
    cancel: CancellationHandle,
    check_cancellation: bool,
    rows: u64,
    executions: u64,
    done: bool,
}

impl QueryCursor {
    pub fn new(
        root: &OperatorRef,
        ctx: &QueryContext,
        bindings_cursor: Box<dyn QueryBindingsCursor>,
    ) -> Result<Self> {
        Ok(Self {
            root: root.cursor(ctx)?,
            bindings_cursor,
            current: None,
            cancel: ctx.cancellation_handle(),
            check_cancellation: ctx.config().check_cancellation,
            rows: 0,
            executions: 0,
            done: false,
        })
    }

    /// Run `root` once with `bindings`
    pub fn single(root: &OperatorRef, ctx: &QueryContext, bindings: QueryBindings) -> Result<Self> {
        Self::new(root, ctx, Box::new(SingletonBindingsCursor::new(bindings)))
    }

    /// Next row, re-opening the root cursor for every new binding set
    pub fn next_row(&mut self) -> Result<Option<Row>> {
        loop {
            if self.done {
                return Ok(None);
            }
            if self.check_cancellation && self.cancel.is_cancelled() {
                self.close();
                return Err(Error::Cancelled);
            }
            let Some(bindings) = self.current.as_mut() else {
                let Some(mut bindings) = self.bindings_cursor.next_bindings() else {
                    self.close();
                    return Ok(None);
                };
                if let Err(e) = self.root.open(&mut bindings) {
                    self.close();
                    return Err(e);
                }
                self.executions += 1;
                self.current = Some(bindings);
                continue;
            };
            match self.root.next(bindings) {
                Ok(Some(row)) => {
                    self.rows += 1;
                    return Ok(Some(row));
                }
                Ok(None) => {
                    self.root.close();
                    self.current = None;
                }
                Err(e) => {
                    self.close();
                    return Err(e);
                }
            }
        }
    }

    /// Drain all remaining rows
    pub fn collect_rows(&mut self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        while let Some(row) = self.next_row()? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Stop the query; later calls to [`next_row`](Self::next_row) return `None`
    pub fn close(&mut self) {
        if self.done {
            return;
        }
        self.root.close();
        self.current = None;
        self.done = true;
        debug!(
            "query over {} closed after {} rows in {} executions",
            self.root.name(),
            self.rows,
            self.executions
        );
    }

    pub fn is_closed(&self) -> bool {
        self.done
    }
}

impl Iterator for QueryCursor {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

impl Drop for QueryCursor {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for QueryCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCursor")
            .field("root", &self.root.name())
            .field("rows", &self.rows)
            .field("done", &self.done)
            .finish()
    }
}

/// Counts reported by [`UpdatePlan::run`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateResult {
    /// Input rows seen
    pub rows_touched: u64,
    /// Input rows actually written
    pub rows_modified: u64,
}

/// A DML statement that only reports counts
#[derive(Debug, Clone)]
pub struct UpdatePlan {
    input: OperatorRef,
    action: DmlAction,
}

impl UpdatePlan {
    pub fn new(input: OperatorRef, action: DmlAction) -> Self {
        Self { input, action }
    }

    pub fn input(&self) -> &OperatorRef {
        &self.input
    }

    pub fn action(&self) -> &DmlAction {
        &self.action
    }

    pub fn run(&self, ctx: &QueryContext, bindings: &mut QueryBindings) -> Result<UpdateResult> {
        let mut cursor = self.input.cursor(ctx)?;
        cursor.open(bindings)?;
        let result = self.drain(ctx, cursor.as_mut(), bindings);
        cursor.close();
        let result = result?;
        debug!(
            "{:?}: {} rows touched, {} modified",
            self.action, result.rows_touched, result.rows_modified
        );
        Ok(result)
    }

    fn drain(
        &self,
        ctx: &QueryContext,
        cursor: &mut dyn Cursor,
        bindings: &mut QueryBindings,
    ) -> Result<UpdateResult> {
        let mut result = UpdateResult::default();
        while let Some(row) = cursor.next(bindings)? {
            if ctx.config().check_cancellation {
                ctx.check_cancelled()?;
            }
            result.rows_touched += 1;
            if self.action.apply(ctx.store(), &row, bindings)?.is_some() {
                result.rows_modified += 1;
            }
        }
        Ok(result)
    }
}
