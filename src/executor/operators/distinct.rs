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

//! Adjacent duplicate removal
//!
//! Drops a row of the distinct type when it equals the previous row of that
//! type. Input sorted on all fields therefore comes out fully distinct.

use std::cmp::Ordering;

use crate::core::{CollatorRef, Error, Result, Row, RowTypeRef};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};
use crate::executor::utils::compare_values_collated;

#[derive(Debug)]
pub struct DistinctPartial {
    input: OperatorRef,
    distinct_type: RowTypeRef,
    collators: Option<Vec<Option<CollatorRef>>>,
}

impl DistinctPartial {
    pub fn new(
        input: OperatorRef,
        distinct_type: RowTypeRef,
        collators: Option<Vec<Option<CollatorRef>>>,
    ) -> Result<Self> {
        if let Some(c) = &collators {
            if c.len() != distinct_type.field_count() {
                return Err(Error::invalid_argument(format!(
                    "{} collators for {} fields of {}",
                    c.len(),
                    distinct_type.field_count(),
                    distinct_type
                )));
            }
        }
        Ok(Self {
            input,
            distinct_type,
            collators,
        })
    }
}

impl PlanNode for DistinctPartial {
    fn name(&self) -> &'static str {
        "Distinct_Partial"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(DistinctCursor {
            input: self.input.cursor(ctx)?,
            distinct_type: self.distinct_type.id(),
            collators: self.collators.clone(),
            previous: None,
            dropped: 0,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn describe(&self) -> String {
        self.distinct_type.to_string()
    }
}

struct DistinctCursor {
    input: Box<dyn Cursor>,
    distinct_type: u32,
    collators: Option<Vec<Option<CollatorRef>>>,
    previous: Option<Row>,
    dropped: usize,
}

impl CursorBody for DistinctCursor {
    fn name(&self) -> &'static str {
        "Distinct_Partial"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.previous = None;
        self.dropped = 0;
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        while let Some(row) = self.input.next(bindings)? {
            if row.row_type().id() != self.distinct_type {
                return Ok(Some(row));
            }
            let duplicate = self.previous.as_ref().is_some_and(|prev| {
                compare_values_collated(prev.values(), row.values(), self.collators.as_deref())
                    == Ordering::Equal
            });
            if duplicate {
                self.dropped += 1;
                continue;
            }
            self.previous = Some(row.clone());
            return Ok(Some(row));
        }
        Ok(None)
    }

    fn release(&mut self) {
        log::debug!("Distinct_Partial dropped {} duplicates", self.dropped);
        self.previous = None;
        self.input.close();
    }
}
