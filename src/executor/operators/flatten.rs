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

//! Flatten
//!
//! Joins a parent type and its child type over an hKey-ordered stream into
//! rows of the flattened type (parent fields followed by child fields).
//!
//! ```text
//! input                      flatten(customer, order, LEFT)
//! customer 1                 -
//! order 10                   customer 1 + order 10
//! item 100                   item 100                   (passes through)
//! customer 2                 customer 2 + NULLs         (left-join row)
//! ```
//!
//! A left-join row is placed where its child would have been, at the parent
//! hKey extended with a NULL child segment, so the output stays in hKey
//! order. With `LeftJoinShortensHKey` it carries the parent hKey instead,
//! which keeps later ancestor lookups from descending into a missing child.

use std::collections::VecDeque;

use crate::core::{
    Error, FlattenOption, FlattenOptions, HKey, JoinType, Result, Row, RowTypeRef, Schema, Value,
};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};
use crate::executor::utils::{leaf_table, typed_nulls};

#[derive(Debug)]
pub struct Flatten {
    input: OperatorRef,
    parent_type: RowTypeRef,
    child_type: RowTypeRef,
    output_type: RowTypeRef,
    join_type: JoinType,
    options: FlattenOptions,
    child_ordinal: u32,
    /// Typed NULLs for the child's primary key segment
    child_key_nulls: Vec<Value>,
}

impl Flatten {
    pub fn new(
        schema: &Schema,
        input: OperatorRef,
        parent_type: RowTypeRef,
        child_type: RowTypeRef,
        join_type: JoinType,
        options: FlattenOptions,
    ) -> Result<Self> {
        if !parent_type.is_parent_of(&child_type) {
            return Err(Error::invalid_argument(format!(
                "{} is not the parent of {}",
                parent_type, child_type
            )));
        }
        if options.contains(FlattenOption::LeftJoinShortensHKey) && !join_type.keeps_left_orphans()
        {
            return Err(Error::invalid_argument(format!(
                "LeftJoinShortensHKey requires a left or full join, not {}",
                join_type
            )));
        }
        let child_table = leaf_table(&child_type).ok_or_else(|| {
            Error::invalid_argument(format!("{} does not have an hkey", child_type))
        })?;
        let child_def = schema.table(child_table)?;
        let child_key_nulls = child_def
            .primary_key
            .iter()
            .map(|i| Value::null(child_def.columns[*i].data_type))
            .collect();

        Ok(Self {
            output_type: schema.flattened_type(&parent_type, &child_type),
            input,
            parent_type,
            child_type,
            join_type,
            options,
            child_ordinal: child_def.ordinal,
            child_key_nulls,
        })
    }
}

impl PlanNode for Flatten {
    fn name(&self) -> &'static str {
        "Flatten_HKeyOrdered"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(FlattenCursor {
            input: self.input.cursor(ctx)?,
            parent_type: self.parent_type.clone(),
            child_type: self.child_type.clone(),
            output_type: self.output_type.clone(),
            join_type: self.join_type,
            keep_parent: self.options.contains(FlattenOption::KeepParent),
            keep_child: self.options.contains(FlattenOption::KeepChild),
            shorten_hkey: self.options.contains(FlattenOption::LeftJoinShortensHKey),
            child_ordinal: self.child_ordinal,
            child_key_nulls: self.child_key_nulls.clone(),
            parent: None,
            parent_matched: false,
            output: VecDeque::new(),
            input_done: false,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn output_type(&self) -> Option<RowTypeRef> {
        Some(self.output_type.clone())
    }

    fn describe(&self) -> String {
        format!(
            "{} {} {}{}",
            self.parent_type,
            self.join_type,
            self.child_type,
            if self.options.is_empty() {
                String::new()
            } else {
                format!(" {:?}", self.options)
            }
        )
    }
}

struct FlattenCursor {
    input: Box<dyn Cursor>,
    parent_type: RowTypeRef,
    child_type: RowTypeRef,
    output_type: RowTypeRef,
    join_type: JoinType,
    keep_parent: bool,
    keep_child: bool,
    shorten_hkey: bool,
    child_ordinal: u32,
    child_key_nulls: Vec<Value>,
    /// Most recent parent row
    parent: Option<Row>,
    parent_matched: bool,
    output: VecDeque<Row>,
    input_done: bool,
}

impl FlattenCursor {
    /// hKey a child of the pending parent would have, with NULL key values
    fn left_join_position(&self) -> Option<HKey> {
        let parent = self.parent.as_ref()?;
        let hkey = parent.hkey()?;
        Some(hkey.extend(self.child_ordinal, self.child_key_nulls.iter().cloned()))
    }

    /// Finish the pending parent, emitting its left-join row if it had no child
    fn resolve_parent(&mut self) {
        let parent = match self.parent.take() {
            Some(parent) => parent,
            None => return,
        };
        if self.parent_matched || !self.join_type.keeps_left_orphans() {
            return;
        }
        let hkey = if self.shorten_hkey {
            parent.hkey().cloned()
        } else {
            parent
                .hkey()
                .map(|h| h.extend(self.child_ordinal, self.child_key_nulls.iter().cloned()))
        };
        let nulls = typed_nulls(self.child_type.fields());
        log::trace!("flatten left-join row for {}", parent);
        self.output
            .push_back(Row::combine(self.output_type.clone(), parent.values(), &nulls, hkey));
    }

    fn is_child_of_parent(&self, child: &Row) -> bool {
        match (self.parent.as_ref().and_then(|p| p.hkey()), child.hkey()) {
            (Some(parent), Some(child)) => parent.is_strict_prefix_of(child),
            _ => false,
        }
    }

    fn process(&mut self, row: Row) {
        if row.row_type() == &self.parent_type {
            self.resolve_parent();
            if self.keep_parent {
                self.output.push_back(row.clone());
            }
            self.parent = Some(row);
            self.parent_matched = false;
        } else if row.row_type() == &self.child_type {
            if self.is_child_of_parent(&row) {
                self.parent_matched = true;
                if let Some(parent) = &self.parent {
                    self.output.push_back(Row::combine(
                        self.output_type.clone(),
                        parent.values(),
                        row.values(),
                        row.hkey().cloned(),
                    ));
                }
            } else {
                self.resolve_parent();
                if self.join_type.keeps_right_orphans() {
                    let nulls = typed_nulls(self.parent_type.fields());
                    self.output.push_back(Row::combine(
                        self.output_type.clone(),
                        &nulls,
                        row.values(),
                        row.hkey().cloned(),
                    ));
                }
            }
            if self.keep_child {
                self.output.push_back(row);
            }
        } else {
            let passed = match (self.left_join_position(), row.hkey()) {
                (Some(position), Some(hkey)) => position <= *hkey,
                _ => true,
            };
            if passed && !self.parent_matched {
                self.resolve_parent();
            }
            self.output.push_back(row);
        }
    }
}

impl CursorBody for FlattenCursor {
    fn name(&self) -> &'static str {
        "Flatten_HKeyOrdered"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.parent = None;
        self.parent_matched = false;
        self.output.clear();
        self.input_done = false;
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        loop {
            if let Some(row) = self.output.pop_front() {
                return Ok(Some(row));
            }
            if self.input_done {
                return Ok(None);
            }
            match self.input.next(bindings)? {
                Some(row) => self.process(row),
                None => {
                    self.input_done = true;
                    self.resolve_parent();
                }
            }
        }
    }

    fn release(&mut self) {
        self.parent = None;
        self.output.clear();
        self.input.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::operators::test_support::{describe, Fixture};

    fn flattened(rows: &[Row]) -> Vec<String> {
        rows.iter()
            .map(|r| {
                let values: Vec<String> = r.values().iter().map(|v| v.to_string()).collect();
                format!("{}[{}]", r.row_type().name(), values.join(","))
            })
            .collect()
    }

    #[test]
    fn test_inner_join_law() {
        let f = Fixture::new();
        let customer = f.row_type("customer");
        let order = f.row_type("order");
        let op = f
            .api
            .flatten_hkey_ordered(f.scan(), customer, order, JoinType::Inner, FlattenOptions::empty())
            .unwrap();
        let rows = f.run(&op);
        assert_eq!(
            describe(&rows),
            vec![
                "flatten(customer, order) 1",
                "item 100",
                "item 101",
                "flatten(customer, order) 1",
                "item 110",
                "address 1000",
                "flatten(customer, order) 2",
                "item 200",
                "address 3000"
            ]
        );
        assert_eq!(rows[0].len(), 5);
        assert_eq!(rows[0][2], Value::integer(10));
    }

    #[test]
    fn test_outer_join_law() {
        let f = Fixture::new();
        let customer = f.row_type("customer");
        let order = f.row_type("order");
        let input = f.api.filter(f.scan(), &[customer.clone(), order.clone()]).unwrap();
        let options = FlattenOptions::of(&[FlattenOption::KeepParent, FlattenOption::KeepChild]);
        let op = f
            .api
            .flatten_hkey_ordered(input, customer, order, JoinType::Left, options)
            .unwrap();
        let rows = f.run(&op);
        assert_eq!(rows.len(), 10);
        let last = rows.last().unwrap();
        assert_eq!(
            flattened(std::slice::from_ref(last)),
            vec!["flatten(customer, order)[3,carol,NULL,NULL,NULL]"]
        );
        assert_eq!(rows[8].row_type().name(), "customer");
    }

    #[test]
    fn test_left_join_row_keeps_hkey_order() {
        let f = Fixture::new();
        let customer = f.row_type("customer");
        let address = f.row_type("address");
        let op = f
            .api
            .flatten_hkey_ordered(f.scan(), customer, address, JoinType::Left, FlattenOptions::empty())
            .unwrap();
        let rows = f.run(&op);
        let hkeys: Vec<HKey> = rows.iter().map(|r| r.hkey().unwrap().clone()).collect();
        assert!(hkeys.windows(2).all(|w| w[0] < w[1]));

        // customer 2 has no address: its row comes after its orders
        let position = rows
            .iter()
            .position(|r| r[0] == Value::integer(2) && r.len() == 5)
            .unwrap();
        assert_eq!(describe(&rows[position - 2..position]), vec!["order 20", "item 200"]);
        assert!(rows[position][2].is_null());
    }

    #[test]
    fn test_shortened_hkey_and_right_orphans() {
        let f = Fixture::new();
        f.store
            .insert("order", vec![Value::integer(30), Value::integer(9), Value::integer(1)])
            .unwrap();
        let customer = f.row_type("customer");
        let order = f.row_type("order");
        let input = f.api.filter(f.scan(), &[customer.clone(), order.clone()]).unwrap();

        let full = f
            .api
            .flatten_hkey_ordered(
                input,
                customer.clone(),
                order.clone(),
                JoinType::Full,
                FlattenOptions::of(&[FlattenOption::LeftJoinShortensHKey]),
            )
            .unwrap();
        let rows = f.run(&full);
        // order 30 belongs to the missing customer 9, after carol
        let orphan = rows.iter().position(|r| r[2] == Value::integer(30)).unwrap();
        assert_eq!(orphan, rows.len() - 1);
        assert!(rows[orphan][0].is_null());
        assert!(rows[orphan][1].is_null());
        let carol = rows.iter().find(|r| r[0] == Value::integer(3)).unwrap();
        assert!(carol[2].is_null());
        assert_eq!(carol.hkey().unwrap().len(), 1);

        assert!(matches!(
            f.api.flatten_hkey_ordered(
                f.scan(),
                customer.clone(),
                order,
                JoinType::Inner,
                FlattenOptions::of(&[FlattenOption::LeftJoinShortensHKey])
            ),
            Err(Error::InvalidArgument(_))
        ));
        assert!(f
            .api
            .flatten_hkey_ordered(f.scan(), customer, f.row_type("item"), JoinType::Inner, FlattenOptions::empty())
            .is_err());
    }
}
