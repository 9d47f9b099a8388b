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

//! Sorting
//!
//! Both sorts are blocking: the first `next` drains the input and only rows
//! of the sort type are kept. Sort keys are evaluated once per row.
//!
//! - [`SortInsertionLimited`] keeps at most `limit` rows in a sorted vector,
//!   so memory is bounded by the limit rather than by the input.
//! - [`SortGeneral`] materializes the input and runs a stable sort.

use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::core::{Error, Result, Row, RowTypeRef, SortOption, Value};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::ordering::RowOrdering;
use crate::executor::plan::{OperatorRef, PlanNode};

struct Keyed {
    keys: Vec<Value>,
    row: Row,
}

fn check_ordering(ordering: &RowOrdering) -> Result<()> {
    if ordering.is_empty() {
        return Err(Error::invalid_argument("sort without sort keys"));
    }
    Ok(())
}

// ============================================================================
// SortInsertionLimited
// ============================================================================

#[derive(Debug)]
pub struct SortInsertionLimited {
    input: OperatorRef,
    sort_type: RowTypeRef,
    ordering: RowOrdering,
    option: SortOption,
    limit: usize,
}

impl SortInsertionLimited {
    pub fn new(
        input: OperatorRef,
        sort_type: RowTypeRef,
        ordering: RowOrdering,
        option: SortOption,
        limit: i64,
    ) -> Result<Self> {
        check_ordering(&ordering)?;
        let limit = usize::try_from(limit)
            .map_err(|_| Error::invalid_argument(format!("negative sort limit {}", limit)))?;
        Ok(Self {
            input,
            sort_type,
            ordering,
            option,
            limit,
        })
    }
}

impl PlanNode for SortInsertionLimited {
    fn name(&self) -> &'static str {
        "Sort_InsertionLimited"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(SortCursor {
            name: self.name(),
            input: self.input.cursor(ctx)?,
            sort_type: self.sort_type.id(),
            ordering: self.ordering.clone(),
            suppress: self.option == SortOption::SuppressDuplicates,
            strategy: Strategy::Insertion { limit: self.limit },
            sorted: None,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn describe(&self) -> String {
        format!(
            "{} {} {:?} limit {}",
            self.sort_type, self.ordering, self.option, self.limit
        )
    }
}

// ============================================================================
// SortGeneral
// ============================================================================

#[derive(Debug)]
pub struct SortGeneral {
    input: OperatorRef,
    sort_type: RowTypeRef,
    ordering: RowOrdering,
    option: SortOption,
}

impl SortGeneral {
    pub fn new(
        input: OperatorRef,
        sort_type: RowTypeRef,
        ordering: RowOrdering,
        option: SortOption,
    ) -> Result<Self> {
        check_ordering(&ordering)?;
        Ok(Self {
            input,
            sort_type,
            ordering,
            option,
        })
    }
}

impl PlanNode for SortGeneral {
    fn name(&self) -> &'static str {
        "Sort_General"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(SortCursor {
            name: self.name(),
            input: self.input.cursor(ctx)?,
            sort_type: self.sort_type.id(),
            ordering: self.ordering.clone(),
            suppress: self.option == SortOption::SuppressDuplicates,
            strategy: Strategy::General,
            sorted: None,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn describe(&self) -> String {
        format!("{} {} {:?}", self.sort_type, self.ordering, self.option)
    }
}

// ============================================================================
// Cursor
// ============================================================================

enum Strategy {
    Insertion { limit: usize },
    General,
}

struct SortCursor {
    name: &'static str,
    input: Box<dyn Cursor>,
    sort_type: u32,
    ordering: RowOrdering,
    suppress: bool,
    strategy: Strategy,
    sorted: Option<VecDeque<Row>>,
}

impl SortCursor {
    fn load(&mut self, bindings: &mut QueryBindings) -> Result<VecDeque<Row>> {
        let mut entries: Vec<Keyed> = Vec::new();
        let mut read = 0usize;
        while let Some(row) = self.input.next(bindings)? {
            if row.row_type().id() != self.sort_type {
                continue;
            }
            read += 1;
            let keys = self.ordering.evaluate(&row, bindings)?;
            match self.strategy {
                Strategy::Insertion { limit } => {
                    // after any equal keys, so equal rows keep input order
                    let at = entries.partition_point(|e| {
                        self.ordering.compare_keys(&e.keys, &keys) != Ordering::Greater
                    });
                    if at >= limit {
                        continue;
                    }
                    if self.suppress
                        && at > 0
                        && self.ordering.compare_keys(&entries[at - 1].keys, &keys)
                            == Ordering::Equal
                    {
                        continue;
                    }
                    entries.insert(at, Keyed { keys, row });
                    entries.truncate(limit);
                }
                Strategy::General => entries.push(Keyed { keys, row }),
            }
        }
        if let Strategy::General = self.strategy {
            let ordering = &self.ordering;
            entries.sort_by(|a, b| ordering.compare_keys(&a.keys, &b.keys));
            if self.suppress {
                entries.dedup_by(|b, a| ordering.compare_keys(&a.keys, &b.keys) == Ordering::Equal);
            }
        }
        log::debug!("{} sorted {} of {} rows", self.name, entries.len(), read);
        Ok(entries.into_iter().map(|e| e.row).collect())
    }
}

impl CursorBody for SortCursor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.sorted = None;
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        if self.sorted.is_none() {
            let sorted = self.load(bindings)?;
            self.input.close();
            self.sorted = Some(sorted);
        }
        Ok(self.sorted.as_mut().and_then(|rows| rows.pop_front()))
    }

    fn release(&mut self) {
        self.sorted = None;
        self.input.close();
    }
}
