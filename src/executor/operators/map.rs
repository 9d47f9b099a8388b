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

//! Nested loops
//!
//! [`MapNestedLoops`] binds each outer row at a binding position and runs
//! the inner plan with it; only inner rows are emitted. With a lookahead
//! quantum above one, inner cursors for the next outer rows are opened
//! (and their storage requests issued) while earlier ones still stream.
//!
//! [`EmitBoundRow`] is the usual inner-side leaf: it turns the bound outer
//! row (or one component of it) back into a row of the stream.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::core::{Error, Result, Row, RowTypeRef};
use crate::executor::bindings::{Binding, QueryBindings};
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};
use crate::executor::utils::component_offset;

// ============================================================================
// MapNestedLoops
// ============================================================================

#[derive(Debug)]
pub struct MapNestedLoops {
    outer: OperatorRef,
    inner: OperatorRef,
    binding_position: usize,
    quantum: usize,
}

impl MapNestedLoops {
    pub fn new(
        outer: OperatorRef,
        inner: OperatorRef,
        binding_position: usize,
        quantum: usize,
    ) -> Self {
        Self {
            outer,
            inner,
            binding_position,
            quantum,
        }
    }
}

impl PlanNode for MapNestedLoops {
    fn name(&self) -> &'static str {
        "Map_NestedLoops"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(MapCursor {
            ctx: ctx.clone(),
            outer: self.outer.cursor(ctx)?,
            inner: Arc::clone(&self.inner),
            binding_position: self.binding_position,
            quantum: self.quantum,
            pending: VecDeque::new(),
            pool: Vec::new(),
            outer_done: false,
            outer_rows: 0,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.outer, &self.inner]
    }

    fn describe(&self) -> String {
        format!("binding {}, lookahead {}", self.binding_position, self.quantum)
    }
}

/// An outer row with its opened inner cursor
struct InnerLoop {
    binding: Option<Binding>,
    cursor: Box<dyn Cursor>,
}

struct MapCursor {
    ctx: QueryContext,
    outer: Box<dyn Cursor>,
    inner: OperatorRef,
    binding_position: usize,
    quantum: usize,
    pending: VecDeque<InnerLoop>,
    /// Closed inner cursors, reopened for later outer rows
    pool: Vec<Box<dyn Cursor>>,
    outer_done: bool,
    outer_rows: usize,
}

impl MapCursor {
    fn fill(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        while !self.outer_done && self.pending.len() < self.quantum {
            let row = match self.outer.next(bindings)? {
                Some(row) => row,
                None => {
                    self.outer_done = true;
                    break;
                }
            };
            self.outer_rows += 1;
            let mut cursor = match self.pool.pop() {
                Some(cursor) => cursor,
                None => self.inner.cursor(&self.ctx)?,
            };
            let (opened, binding) =
                bindings.scoped(self.binding_position, Binding::Row(row), |b| cursor.open(b));
            opened?;
            self.pending.push_back(InnerLoop {
                binding: Some(binding),
                cursor,
            });
        }
        Ok(())
    }
}

impl CursorBody for MapCursor {
    fn name(&self) -> &'static str {
        "Map_NestedLoops"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.pending.clear();
        self.outer_done = false;
        self.outer_rows = 0;
        self.outer.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        loop {
            self.fill(bindings)?;
            let position = self.binding_position;
            let front = match self.pending.front_mut() {
                Some(front) => front,
                None => return Ok(None),
            };
            let binding = front
                .binding
                .take()
                .ok_or(Error::BindingNotFound(position))?;
            let cursor = &mut front.cursor;
            let (row, binding) = bindings.scoped(position, binding, |b| cursor.next(b));
            front.binding = Some(binding);
            if let Some(row) = row? {
                return Ok(Some(row));
            }
            // inner exhausted: the outer row goes out of scope
            if let Some(mut done) = self.pending.pop_front() {
                done.cursor.close();
                self.pool.push(done.cursor);
            }
        }
    }

    fn release(&mut self) {
        for mut inner in self.pending.drain(..) {
            inner.cursor.close();
        }
        self.outer.close();
        log::debug!("Map_NestedLoops ran the inner plan for {} outer rows", self.outer_rows);
    }
}

// ============================================================================
// EmitBoundRow
// ============================================================================

#[derive(Debug)]
pub struct EmitBoundRow {
    input: OperatorRef,
    input_type: RowTypeRef,
    output_type: RowTypeRef,
    bound_type: RowTypeRef,
    binding_position: usize,
    offset: usize,
}

impl EmitBoundRow {
    pub fn new(
        input: OperatorRef,
        input_type: RowTypeRef,
        output_type: Option<RowTypeRef>,
        bound_type: RowTypeRef,
        binding_position: usize,
    ) -> Result<Self> {
        let output_type = output_type.unwrap_or_else(|| bound_type.clone());
        let offset = component_offset(&bound_type, &output_type).ok_or_else(|| {
            Error::invalid_argument(format!(
                "{} is not a component of {}",
                output_type, bound_type
            ))
        })?;
        Ok(Self {
            input,
            input_type,
            output_type,
            bound_type,
            binding_position,
            offset,
        })
    }
}

impl PlanNode for EmitBoundRow {
    fn name(&self) -> &'static str {
        "EmitBoundRow_Nested"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(EmitBoundRowCursor {
            input: self.input.cursor(ctx)?,
            input_type: self.input_type.id(),
            output_type: self.output_type.clone(),
            bound_type: self.bound_type.clone(),
            binding_position: self.binding_position,
            offset: self.offset,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn describe(&self) -> String {
        format!(
            "{} of bound {} at {} per {}",
            self.output_type, self.bound_type, self.binding_position, self.input_type
        )
    }
}

struct EmitBoundRowCursor {
    input: Box<dyn Cursor>,
    input_type: u32,
    output_type: RowTypeRef,
    bound_type: RowTypeRef,
    binding_position: usize,
    offset: usize,
}

impl EmitBoundRowCursor {
    fn bound_component(&self, bindings: &QueryBindings) -> Result<Row> {
        let bound = bindings.row(self.binding_position)?;
        if bound.row_type() != &self.bound_type {
            return Err(Error::row_type_mismatch(&self.bound_type, bound.row_type()));
        }
        if self.output_type == self.bound_type {
            return Ok(bound.clone());
        }
        let end = self.offset + self.output_type.field_count();
        let mut row = Row::new(self.output_type.clone(), bound.values()[self.offset..end].to_vec());
        let hkey = match (bound.hkey(), self.output_type.hkey_len()) {
            (Some(hkey), Some(len)) => Some(hkey.truncate(len.min(hkey.len()))),
            _ => None,
        };
        row.set_hkey(hkey);
        Ok(row)
    }
}

impl CursorBody for EmitBoundRowCursor {
    fn name(&self) -> &'static str {
        "EmitBoundRow_Nested"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        match self.input.next(bindings)? {
            Some(row) if row.row_type().id() == self.input_type => {
                self.bound_component(bindings).map(Some)
            }
            other => Ok(other),
        }
    }

    fn release(&mut self) {
        self.input.close();
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{FlattenOptions, InputPreservation, JoinType};
    use crate::executor::operators::test_support::{describe, Fixture};

    #[test]
    fn test_map_runs_inner_per_outer_row() {
        let f = Fixture::new();
        let customer = f.row_type("customer");
        let outer = f.api.filter(f.scan(), &[customer.clone()]).unwrap();
        let inner = f
            .api
            .branch_lookup_nested(
                0,
                customer.clone(),
                &f.row_type("order"),
                None,
                InputPreservation::KeepInput,
                5,
            )
            .unwrap();
        let op = f.api.map_nested_loops(outer, inner, 5, 1).unwrap();
        assert_eq!(
            describe(&f.run(&op)),
            vec![
                "customer 1",
                "order 10",
                "item 100",
                "item 101",
                "order 11",
                "item 110",
                "customer 2",
                "order 20",
                "item 200",
                "customer 3"
            ]
        );
    }

    #[test]
    fn test_pipelined_map_matches_sequential() {
        let f = Fixture::new();
        let order = f.row_type("order");
        let build = |quantum| {
            let outer = f.api.filter(f.scan(), &[order.clone()]).unwrap();
            let inner = f
                .api
                .ancestor_lookup_nested(0, order.clone(), &[f.row_type("customer")], 1)
                .unwrap();
            f.api.map_nested_loops(outer, inner, 1, quantum).unwrap()
        };
        let sequential = f.run(&build(1));
        assert_eq!(describe(&sequential), vec!["customer 1", "customer 1", "customer 2"]);
        for quantum in [2, 3, 16] {
            assert_eq!(f.run(&build(quantum)), sequential);
        }
    }

    #[test]
    fn test_close_releases_prefetched_inner_cursors() {
        let f = Fixture::new();
        let customer = f.row_type("customer");
        let outer = f.api.filter(f.scan(), &[customer.clone()]).unwrap();
        let inner = f
            .api
            .branch_lookup_nested(
                0,
                customer.clone(),
                &f.row_type("address"),
                None,
                InputPreservation::DiscardInput,
                0,
            )
            .unwrap();
        let op = f.api.map_nested_loops(outer, inner, 0, 3).unwrap();
        let mut cursor = op.cursor(&f.ctx).unwrap();
        let mut bindings = crate::executor::QueryBindings::new();
        cursor.open(&mut bindings).unwrap();
        assert!(cursor.next(&mut bindings).unwrap().is_some());
        assert!(f.store.outstanding_requests() > 1);
        cursor.close();
        assert_eq!(f.store.outstanding_requests(), 0);
        cursor.close();
    }

    #[test]
    fn test_emit_bound_row_component() {
        let f = Fixture::new();
        let customer = f.row_type("customer");
        let order = f.row_type("order");
        let flattened = f
            .api
            .flatten_hkey_ordered(
                f.scan(),
                customer.clone(),
                order.clone(),
                JoinType::Inner,
                FlattenOptions::empty(),
            )
            .unwrap();
        let flat_type = flattened.output_type().unwrap();
        let outer = f.api.filter(flattened, &[flat_type.clone()]).unwrap();

        // one customer row per (customer, order) pair
        let values_type = f.api.schema().values_type(vec![]);
        let tick = f.api.values_scan(values_type.clone(), vec![vec![]]).unwrap();
        let inner = f
            .api
            .emit_bound_row_nested(tick, values_type, Some(customer.clone()), flat_type, 2)
            .unwrap();
        let op = f.api.map_nested_loops(outer, inner, 2, 1).unwrap();
        let rows = f.run(&op);
        assert_eq!(describe(&rows), vec!["customer 1", "customer 1", "customer 2"]);
        assert_eq!(rows[0].hkey().unwrap().len(), 1);

        assert!(f
            .api
            .emit_bound_row_nested(f.scan(), customer, Some(f.row_type("item")), order, 2)
            .is_err());
    }
}
