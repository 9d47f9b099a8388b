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

//! Row selection
//!
//! - [`SelectHKeyOrdered`] - predicate on one row type; when a row is
//!   rejected its descendants that follow it in hKey order go too
//! - [`Filter`] - keep only rows of the listed types

use rustc_hash::FxHashSet;

use crate::core::{HKey, Result, Row, RowTypeRef};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};
use crate::expression::{evaluate_predicate, ExpressionRef};

#[derive(Debug)]
pub struct SelectHKeyOrdered {
    input: OperatorRef,
    predicate_type: RowTypeRef,
    predicate: ExpressionRef,
}

impl SelectHKeyOrdered {
    pub fn new(input: OperatorRef, predicate_type: RowTypeRef, predicate: ExpressionRef) -> Self {
        Self {
            input,
            predicate_type,
            predicate,
        }
    }
}

impl PlanNode for SelectHKeyOrdered {
    fn name(&self) -> &'static str {
        "Select_HKeyOrdered"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(SelectCursor {
            input: self.input.cursor(ctx)?,
            predicate_type: self.predicate_type.id(),
            predicate: self.predicate.clone(),
            rejected: None,
            rows_checked: 0,
            rows_passed: 0,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn describe(&self) -> String {
        format!("{} where {:?}", self.predicate_type, self.predicate)
    }
}

struct SelectCursor {
    input: Box<dyn Cursor>,
    predicate_type: u32,
    predicate: ExpressionRef,
    /// hKey of the last rejected row; its descendants are skipped
    rejected: Option<HKey>,
    rows_checked: usize,
    rows_passed: usize,
}

impl SelectCursor {
    fn is_descendant_of_rejected(&self, row: &Row) -> bool {
        match (&self.rejected, row.hkey()) {
            (Some(rejected), Some(hkey)) => rejected.is_strict_prefix_of(hkey),
            _ => false,
        }
    }
}

impl CursorBody for SelectCursor {
    fn name(&self) -> &'static str {
        "Select_HKeyOrdered"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.rejected = None;
        self.rows_checked = 0;
        self.rows_passed = 0;
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        while let Some(row) = self.input.next(bindings)? {
            if row.row_type().id() == self.predicate_type {
                self.rows_checked += 1;
                if evaluate_predicate(self.predicate.as_ref(), Some(&row), bindings)? {
                    self.rejected = None;
                    self.rows_passed += 1;
                    return Ok(Some(row));
                }
                log::trace!("select rejected {}", row);
                self.rejected = row.hkey().cloned();
                continue;
            }
            if self.is_descendant_of_rejected(&row) {
                continue;
            }
            self.rejected = None;
            return Ok(Some(row));
        }
        Ok(None)
    }

    fn release(&mut self) {
        self.input.close();
        log::debug!(
            "Select_HKeyOrdered: {} rows checked, {} passed",
            self.rows_checked,
            self.rows_passed
        );
    }
}

#[derive(Debug)]
pub struct Filter {
    input: OperatorRef,
    keep_types: Vec<RowTypeRef>,
}

impl Filter {
    pub fn new(input: OperatorRef, keep_types: Vec<RowTypeRef>) -> Self {
        Self { input, keep_types }
    }
}

impl PlanNode for Filter {
    fn name(&self) -> &'static str {
        "Filter_Default"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(FilterCursor {
            input: self.input.cursor(ctx)?,
            keep: self.keep_types.iter().map(|t| t.id()).collect(),
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn describe(&self) -> String {
        let names: Vec<String> = self.keep_types.iter().map(|t| t.name()).collect();
        names.join(", ")
    }
}

struct FilterCursor {
    input: Box<dyn Cursor>,
    keep: FxHashSet<u32>,
}

impl CursorBody for FilterCursor {
    fn name(&self) -> &'static str {
        "Filter_Default"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        while let Some(row) = self.input.next(bindings)? {
            if self.keep.contains(&row.row_type().id()) {
                return Ok(Some(row));
            }
        }
        Ok(None)
    }

    fn release(&mut self) {
        self.input.close();
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{CompareOp, Value};
    use crate::executor::operators::test_support::{describe, Fixture};
    use crate::expression::{compare, field, literal};

    #[test]
    fn test_select_drops_descendants_of_rejected_rows() {
        let f = Fixture::new();
        let order = f.row_type("order");
        let predicate = compare(field(&order, 2), CompareOp::Gte, literal(75));
        let op = f.api.select_hkey_ordered(f.scan(), order, predicate).unwrap();
        let rows = f.run(&op);
        // order 11 (total 50) and its item are gone, address 1000 stays
        assert_eq!(
            describe(&rows),
            vec![
                "customer 1",
                "order 10",
                "item 100",
                "item 101",
                "address 1000",
                "customer 2",
                "order 20",
                "item 200",
                "customer 3",
                "address 3000"
            ]
        );
    }

    #[test]
    fn test_select_null_predicate_rejects() {
        let f = Fixture::new();
        let customer = f.row_type("customer");
        let predicate = compare(field(&customer, 1), CompareOp::Eq, literal(Value::null_unknown()));
        let op = f.api.select_hkey_ordered(f.scan(), customer, predicate).unwrap();
        assert!(f.run(&op).is_empty());
    }

    #[test]
    fn test_filter_by_type() {
        let f = Fixture::new();
        let op = f
            .api
            .filter(f.scan(), &[f.row_type("customer"), f.row_type("address")])
            .unwrap();
        assert_eq!(
            describe(&f.run(&op)),
            vec!["customer 1", "address 1000", "customer 2", "customer 3", "address 3000"]
        );
    }
}
