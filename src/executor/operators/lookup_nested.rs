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

//! Nested lookups
//!
//! Inner sides of nested loops: the lookup key is the row bound at a
//! binding position by an enclosing [`MapNestedLoops`](super::MapNestedLoops),
//! and the requests are issued when the cursor opens.

use crate::core::{Error, GroupId, InputPreservation, Result, Row, RowType, RowTypeRef, Schema};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::PlanNode;

use super::lookup::{LookupBatch, LookupTarget};

#[derive(Debug)]
pub struct AncestorLookupNested {
    group: GroupId,
    input_type: RowTypeRef,
    target: LookupTarget,
    binding_position: usize,
}

impl AncestorLookupNested {
    pub fn new(
        group: GroupId,
        input_type: RowTypeRef,
        ancestor_types: &[RowTypeRef],
        binding_position: usize,
    ) -> Result<Self> {
        let target = LookupTarget::ancestors(&input_type, ancestor_types)?;
        Ok(Self {
            group,
            input_type,
            target,
            binding_position,
        })
    }
}

impl PlanNode for AncestorLookupNested {
    fn name(&self) -> &'static str {
        "AncestorLookup_Nested"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(NestedLookupCursor {
            name: self.name(),
            ctx: ctx.clone(),
            group: self.group,
            input_type: self.input_type.clone(),
            target: self.target.clone(),
            keep_input: false,
            binding_position: self.binding_position,
            batch: None,
        }))
    }

    fn describe(&self) -> String {
        format!(
            "{} at binding {} -> {}",
            self.input_type,
            self.binding_position,
            self.target.describe()
        )
    }
}

#[derive(Debug)]
pub struct BranchLookupNested {
    group: GroupId,
    input_type: RowTypeRef,
    target: LookupTarget,
    flag: InputPreservation,
    binding_position: usize,
}

impl BranchLookupNested {
    pub fn new(
        schema: &Schema,
        group: GroupId,
        input_type: RowTypeRef,
        root_type: &RowType,
        output_types: Option<&[RowTypeRef]>,
        flag: InputPreservation,
        binding_position: usize,
    ) -> Result<Self> {
        let target = LookupTarget::branch(schema, &input_type, root_type, output_types)?;
        Ok(Self {
            group,
            input_type,
            target,
            flag,
            binding_position,
        })
    }
}

impl PlanNode for BranchLookupNested {
    fn name(&self) -> &'static str {
        "BranchLookup_Nested"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(NestedLookupCursor {
            name: self.name(),
            ctx: ctx.clone(),
            group: self.group,
            input_type: self.input_type.clone(),
            target: self.target.clone(),
            keep_input: self.flag == InputPreservation::KeepInput,
            binding_position: self.binding_position,
            batch: None,
        }))
    }

    fn describe(&self) -> String {
        format!(
            "{} at binding {} -> {}, {:?}",
            self.input_type,
            self.binding_position,
            self.target.describe(),
            self.flag
        )
    }
}

struct NestedLookupCursor {
    name: &'static str,
    ctx: QueryContext,
    group: GroupId,
    input_type: RowTypeRef,
    target: LookupTarget,
    keep_input: bool,
    binding_position: usize,
    batch: Option<LookupBatch>,
}

impl CursorBody for NestedLookupCursor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        let bound = bindings.row(self.binding_position)?;
        if bound.row_type() != &self.input_type {
            return Err(Error::row_type_mismatch(&self.input_type, bound.row_type()));
        }
        let batch = self
            .target
            .start(self.ctx.store(), self.group, bound.clone(), self.keep_input)?;
        self.batch = Some(batch);
        Ok(())
    }

    fn next(&mut self, _bindings: &mut QueryBindings) -> Result<Option<Row>> {
        match self.batch.as_mut() {
            Some(batch) => batch.next_row(),
            None => Ok(None),
        }
    }

    fn release(&mut self) {
        self.batch = None;
    }
}
