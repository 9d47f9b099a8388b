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

//! Unions
//!
//! - [`UnionAll`] concatenates two inputs, retyping rows to a common type
//!   when the input types differ.
//! - [`UnionOrdered`] merges two inputs sorted on their trailing ordering
//!   fields.
//! - [`HKeyUnionOrdered`] merges two hKey-ordered inputs into hKey rows of
//!   a common ancestor table, without duplicates.
//!
//! Ordered merges skip rows of types other than their declared input
//! types.

use std::cmp::Ordering;
use std::collections::VecDeque;

use crate::core::{Error, HKey, Result, Row, RowType, RowTypeRef, Schema, Value};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};
use crate::executor::utils::compare_directed;

// ============================================================================
// Merge keys
// ============================================================================

/// Location of the comparison fields within one side's rows.
///
/// The last `ordering_fields` fields of a row are its ordering fields; the
/// first `ascending.len()` of those are compared.
#[derive(Debug, Clone)]
pub(crate) struct MergeKey {
    start: usize,
    len: usize,
}

impl MergeKey {
    pub(crate) fn new(row_type: &RowType, ordering_fields: usize, compared: usize) -> Result<Self> {
        let fields = row_type.field_count();
        if ordering_fields > fields {
            return Err(Error::invalid_argument(format!(
                "{} ordering fields but {} has {} fields",
                ordering_fields, row_type, fields
            )));
        }
        if compared > ordering_fields {
            return Err(Error::invalid_argument(format!(
                "comparing {} fields of {} ordering fields of {}",
                compared, ordering_fields, row_type
            )));
        }
        Ok(Self {
            start: fields - ordering_fields,
            len: compared,
        })
    }

    pub(crate) fn key<'a>(&self, row: &'a Row) -> &'a [Value] {
        let values = row.values();
        let end = (self.start + self.len).min(values.len());
        &values[self.start.min(end)..end]
    }
}

/// Next row of `row_type` from `input`, skipping other types
pub(crate) fn next_of_type(
    input: &mut dyn Cursor,
    row_type: u32,
    bindings: &mut QueryBindings,
) -> Result<Option<Row>> {
    while let Some(row) = input.next(bindings)? {
        if row.row_type().id() == row_type {
            return Ok(Some(row));
        }
        log::trace!("{} skipped a {} row", input.name(), row.row_type());
    }
    Ok(None)
}

// ============================================================================
// UnionAll
// ============================================================================

#[derive(Debug)]
pub struct UnionAll {
    left: OperatorRef,
    left_type: RowTypeRef,
    right: OperatorRef,
    right_type: RowTypeRef,
    output_type: RowTypeRef,
    open_both: bool,
}

impl UnionAll {
    pub fn new(
        schema: &Schema,
        left: OperatorRef,
        left_type: RowTypeRef,
        right: OperatorRef,
        right_type: RowTypeRef,
        open_both: bool,
    ) -> Result<Self> {
        if left_type.field_count() != right_type.field_count() {
            return Err(Error::invalid_argument(format!(
                "union of {} ({} fields) and {} ({} fields)",
                left_type,
                left_type.field_count(),
                right_type,
                right_type.field_count()
            )));
        }
        let output_type = if left_type == right_type {
            left_type.clone()
        } else {
            schema.union_type(&left_type, &right_type)
        };
        Ok(Self {
            left,
            left_type,
            right,
            right_type,
            output_type,
            open_both,
        })
    }
}

impl PlanNode for UnionAll {
    fn name(&self) -> &'static str {
        "UnionAll_Default"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(UnionAllCursor {
            inputs: [self.left.cursor(ctx)?, self.right.cursor(ctx)?],
            input_types: [self.left_type.id(), self.right_type.id()],
            output_type: self.output_type.clone(),
            open_both: self.open_both,
            current: 0,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.left, &self.right]
    }

    fn output_type(&self) -> Option<RowTypeRef> {
        Some(self.output_type.clone())
    }

    fn describe(&self) -> String {
        format!(
            "{} {}{}",
            self.left_type,
            self.right_type,
            if self.open_both { " open both" } else { "" }
        )
    }
}

struct UnionAllCursor {
    inputs: [Box<dyn Cursor>; 2],
    input_types: [u32; 2],
    output_type: RowTypeRef,
    open_both: bool,
    current: usize,
}

impl CursorBody for UnionAllCursor {
    fn name(&self) -> &'static str {
        "UnionAll_Default"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.current = 0;
        self.inputs[0].open(bindings)?;
        if self.open_both {
            self.inputs[1].open(bindings)?;
        }
        Ok(())
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        while self.current < 2 {
            let i = self.current;
            if let Some(row) = self.inputs[i].next(bindings)? {
                if row.row_type().id() == self.input_types[i] && row.row_type() != &self.output_type
                {
                    return Ok(Some(row.retype(self.output_type.clone())));
                }
                return Ok(Some(row));
            }
            self.inputs[i].close();
            self.current += 1;
            if self.current == 1 && !self.open_both {
                self.inputs[1].open(bindings)?;
            }
        }
        Ok(None)
    }

    fn release(&mut self) {
        for input in &mut self.inputs {
            input.close();
        }
    }
}

// ============================================================================
// UnionOrdered
// ============================================================================

#[derive(Debug)]
pub struct UnionOrdered {
    left: OperatorRef,
    right: OperatorRef,
    left_type: RowTypeRef,
    right_type: RowTypeRef,
    left_key: MergeKey,
    right_key: MergeKey,
    ascending: Vec<bool>,
    output_equal: bool,
}

impl UnionOrdered {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        left: OperatorRef,
        right: OperatorRef,
        left_type: RowTypeRef,
        right_type: RowTypeRef,
        left_ordering_fields: usize,
        right_ordering_fields: usize,
        ascending: Vec<bool>,
        output_equal: bool,
    ) -> Result<Self> {
        let left_key = MergeKey::new(&left_type, left_ordering_fields, ascending.len())?;
        let right_key = MergeKey::new(&right_type, right_ordering_fields, ascending.len())?;
        Ok(Self {
            left,
            right,
            left_type,
            right_type,
            left_key,
            right_key,
            ascending,
            output_equal,
        })
    }
}

impl PlanNode for UnionOrdered {
    fn name(&self) -> &'static str {
        "Union_Ordered"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(UnionOrderedCursor {
            left: self.left.cursor(ctx)?,
            right: self.right.cursor(ctx)?,
            left_type: self.left_type.id(),
            right_type: self.right_type.id(),
            left_key: self.left_key.clone(),
            right_key: self.right_key.clone(),
            ascending: self.ascending.clone(),
            output_equal: self.output_equal,
            left_row: None,
            right_row: None,
            pending: VecDeque::new(),
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.left, &self.right]
    }

    fn describe(&self) -> String {
        format!(
            "{} {} ascending {:?}{}",
            self.left_type,
            self.right_type,
            self.ascending,
            if self.output_equal { " output equal" } else { "" }
        )
    }
}

struct UnionOrderedCursor {
    left: Box<dyn Cursor>,
    right: Box<dyn Cursor>,
    left_type: u32,
    right_type: u32,
    left_key: MergeKey,
    right_key: MergeKey,
    ascending: Vec<bool>,
    output_equal: bool,
    left_row: Option<Row>,
    right_row: Option<Row>,
    pending: VecDeque<Row>,
}

impl CursorBody for UnionOrderedCursor {
    fn name(&self) -> &'static str {
        "Union_Ordered"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.pending.clear();
        self.left.open(bindings)?;
        self.right.open(bindings)?;
        self.left_row = next_of_type(self.left.as_mut(), self.left_type, bindings)?;
        self.right_row = next_of_type(self.right.as_mut(), self.right_type, bindings)?;
        Ok(())
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        if let Some(row) = self.pending.pop_front() {
            return Ok(Some(row));
        }
        let ord = match (&self.left_row, &self.right_row) {
            (None, None) => return Ok(None),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(l), Some(r)) => compare_directed(
                self.left_key.key(l),
                self.right_key.key(r),
                &self.ascending,
            ),
        };
        let mut out = None;
        if ord != Ordering::Greater {
            out = self.left_row.take();
            self.left_row = next_of_type(self.left.as_mut(), self.left_type, bindings)?;
        }
        if ord != Ordering::Less {
            let right = self.right_row.take();
            self.right_row = next_of_type(self.right.as_mut(), self.right_type, bindings)?;
            match (&out, right) {
                (None, right) => out = right,
                (Some(_), Some(right)) if self.output_equal => self.pending.push_back(right),
                _ => {}
            }
        }
        Ok(out)
    }

    fn release(&mut self) {
        self.left_row = None;
        self.right_row = None;
        self.pending.clear();
        self.left.close();
        self.right.close();
    }
}

// ============================================================================
// HKeyUnionOrdered
// ============================================================================

#[derive(Debug)]
pub struct HKeyUnionOrdered {
    left: OperatorRef,
    right: OperatorRef,
    left_type: RowTypeRef,
    right_type: RowTypeRef,
    output_type: RowTypeRef,
    hkey_len: usize,
}

impl HKeyUnionOrdered {
    pub fn new(
        schema: &Schema,
        left: OperatorRef,
        right: OperatorRef,
        left_type: RowTypeRef,
        right_type: RowTypeRef,
        output_table_type: &RowTypeRef,
    ) -> Result<Self> {
        let table = output_table_type.table_id().ok_or_else(|| {
            Error::invalid_argument(format!("{} is not a table row type", output_table_type))
        })?;
        let output_path = schema.path(table)?;
        for input in [&left_type, &right_type] {
            let covers = input
                .table_path()
                .is_some_and(|path| path.starts_with(&output_path));
            if !covers {
                return Err(Error::invalid_argument(format!(
                    "{} rows do not carry hkeys of {}",
                    input, output_table_type
                )));
            }
        }
        Ok(Self {
            left,
            right,
            left_type,
            right_type,
            output_type: schema.hkey_type(table)?,
            hkey_len: output_path.len(),
        })
    }
}

impl PlanNode for HKeyUnionOrdered {
    fn name(&self) -> &'static str {
        "HKeyUnion_Ordered"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(HKeyUnionCursor {
            left: self.left.cursor(ctx)?,
            right: self.right.cursor(ctx)?,
            left_type: self.left_type.id(),
            right_type: self.right_type.id(),
            output_type: self.output_type.clone(),
            hkey_len: self.hkey_len,
            left_hkey: None,
            right_hkey: None,
            last: None,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.left, &self.right]
    }

    fn output_type(&self) -> Option<RowTypeRef> {
        Some(self.output_type.clone())
    }

    fn describe(&self) -> String {
        format!("{} {} -> {}", self.left_type, self.right_type, self.output_type)
    }
}

struct HKeyUnionCursor {
    left: Box<dyn Cursor>,
    right: Box<dyn Cursor>,
    left_type: u32,
    right_type: u32,
    output_type: RowTypeRef,
    hkey_len: usize,
    left_hkey: Option<HKey>,
    right_hkey: Option<HKey>,
    last: Option<HKey>,
}

impl HKeyUnionCursor {
    fn next_hkey(
        input: &mut dyn Cursor,
        row_type: u32,
        hkey_len: usize,
        bindings: &mut QueryBindings,
    ) -> Result<Option<HKey>> {
        match next_of_type(input, row_type, bindings)? {
            Some(row) => Ok(Some(row.require_hkey()?.truncate(hkey_len))),
            None => Ok(None),
        }
    }
}

impl CursorBody for HKeyUnionCursor {
    fn name(&self) -> &'static str {
        "HKeyUnion_Ordered"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.last = None;
        self.left.open(bindings)?;
        self.right.open(bindings)?;
        self.left_hkey = Self::next_hkey(self.left.as_mut(), self.left_type, self.hkey_len, bindings)?;
        self.right_hkey =
            Self::next_hkey(self.right.as_mut(), self.right_type, self.hkey_len, bindings)?;
        Ok(())
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        loop {
            let take_left = match (&self.left_hkey, &self.right_hkey) {
                (None, None) => return Ok(None),
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (Some(l), Some(r)) => l <= r,
            };
            let hkey = if take_left {
                let hkey = self.left_hkey.take();
                self.left_hkey =
                    Self::next_hkey(self.left.as_mut(), self.left_type, self.hkey_len, bindings)?;
                hkey
            } else {
                let hkey = self.right_hkey.take();
                self.right_hkey =
                    Self::next_hkey(self.right.as_mut(), self.right_type, self.hkey_len, bindings)?;
                hkey
            };
            let hkey = match hkey {
                Some(hkey) => hkey,
                None => continue,
            };
            if self.last.as_ref() == Some(&hkey) {
                continue;
            }
            self.last = Some(hkey.clone());
            return Ok(Some(Row::with_hkey(self.output_type.clone(), Vec::new(), hkey)));
        }
    }

    fn release(&mut self) {
        self.left_hkey = None;
        self.right_hkey = None;
        self.left.close();
        self.right.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataType;
    use crate::executor::operators::test_support::Fixture;
    use crate::executor::operators::{IndexKeyRange, IndexOrdering};
    use crate::expression::literal;
    use crate::storage::IndexScanSelector;

    fn ints(f: &Fixture, row_type: &RowTypeRef, keys: &[i64]) -> OperatorRef {
        let rows = keys.iter().map(|k| vec![literal(*k), literal("v")]).collect();
        f.api.values_scan(row_type.clone(), rows).unwrap()
    }

    fn firsts(rows: &[Row]) -> Vec<String> {
        rows.iter().map(|r| r[0].to_string()).collect()
    }

    #[test]
    fn test_union_all_retypes() {
        let f = Fixture::new();
        let a = f.api.schema().values_type(vec![DataType::Integer, DataType::Text]);
        let b = f.api.schema().values_type(vec![DataType::Integer, DataType::Text]);
        let op = f
            .api
            .union_all(ints(&f, &a, &[1, 2]), a.clone(), ints(&f, &b, &[3]), b.clone(), false)
            .unwrap();
        let rows = f.run(&op);
        assert_eq!(firsts(&rows), vec!["1", "2", "3"]);
        let output = rows[0].row_type().clone();
        assert!(rows.iter().all(|r| r.row_type() == &output));
        assert_ne!(&output, &a);

        let same = f
            .api
            .union_all(ints(&f, &a, &[1]), a.clone(), ints(&f, &a, &[2]), a.clone(), true)
            .unwrap();
        assert!(f.run(&same).iter().all(|r| r.row_type() == &a));
    }

    #[test]
    fn test_union_ordered_merge() {
        let f = Fixture::new();
        let t = f.api.schema().values_type(vec![DataType::Text, DataType::Integer]);
        let values = |keys: &[i64]| {
            let rows = keys.iter().map(|k| vec![literal("x"), literal(*k)]).collect();
            f.api.values_scan(t.clone(), rows).unwrap()
        };
        let keys = |rows: &[Row]| -> Vec<String> { rows.iter().map(|r| r[1].to_string()).collect() };

        let op = f
            .api
            .union_ordered(values(&[1, 3, 5]), values(&[2, 3, 6]), t.clone(), t.clone(), 1, 1, &[true], false)
            .unwrap();
        assert_eq!(keys(&f.run(&op)), vec!["1", "2", "3", "5", "6"]);

        let op = f
            .api
            .union_ordered(values(&[5, 3]), values(&[6, 3, 1]), t.clone(), t.clone(), 1, 1, &[false], true)
            .unwrap();
        assert_eq!(keys(&f.run(&op)), vec!["6", "5", "3", "3", "1"]);
    }

    #[test]
    fn test_union_ordered_validation() {
        let f = Fixture::new();
        let t = f.api.schema().values_type(vec![DataType::Integer]);
        let input = ints(&f, &f.api.schema().values_type(vec![DataType::Integer, DataType::Text]), &[]);
        assert!(f
            .api
            .union_ordered(input.clone(), input.clone(), t.clone(), t.clone(), 2, 1, &[true], false)
            .is_err());
        assert!(f
            .api
            .union_ordered(input.clone(), input.clone(), t.clone(), t.clone(), -1, 1, &[], false)
            .is_err());
        assert!(f
            .api
            .union_ordered(input.clone(), input, t.clone(), t, 1, 0, &[true], false)
            .is_err());
    }

    #[test]
    fn test_hkey_union_dedups() {
        let f = Fixture::new();
        let customer = f.row_type("customer");
        let name_index = f.api.schema().index_by_name("customer_name").unwrap().clone();
        let total_index = f.api.schema().index_by_name("name_total").unwrap().clone();
        let left = f
            .api
            .index_scan(
                &f.api.schema().index_type("customer_name").unwrap(),
                IndexKeyRange::all(),
                IndexOrdering::new(),
                IndexScanSelector::inner(&name_index),
            )
            .unwrap();
        let right = f
            .api
            .index_scan(
                &f.api.schema().index_type("name_total").unwrap(),
                IndexKeyRange::all(),
                IndexOrdering::new(),
                IndexScanSelector::inner(&total_index),
            )
            .unwrap();
        let op = f
            .api
            .hkey_union_ordered(
                left,
                right,
                f.api.schema().index_type("customer_name").unwrap(),
                f.api.schema().index_type("name_total").unwrap(),
                &customer,
            )
            .unwrap();
        let rows = f.run(&op);
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.hkey().unwrap().len() == 1));
        assert!(rows.windows(2).all(|w| w[0].hkey() < w[1].hkey()));
    }
}
