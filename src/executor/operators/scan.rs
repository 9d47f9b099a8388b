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

//! Group scans
//!
//! - [`GroupScan`] - every row of a group in hKey order
//! - [`GroupScanPositional`] - the row (or subtree) at the hKey of a bound row
//! - [`ValuesScan`] - a fixed list of rows evaluated against the bindings

use std::fmt::Write;

use crate::core::{Error, GroupId, Result, Row, RowTypeRef};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::PlanNode;
use crate::expression::ExpressionRef;
use crate::storage::RowStream;

// ============================================================================
// GroupScan
// ============================================================================

#[derive(Debug)]
pub struct GroupScan {
    group: GroupId,
}

impl GroupScan {
    pub fn new(group: GroupId) -> Self {
        Self { group }
    }
}

impl PlanNode for GroupScan {
    fn name(&self) -> &'static str {
        "GroupScan_Default"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(StreamCursor {
            name: self.name(),
            ctx: ctx.clone(),
            source: StreamSource::Group(self.group),
            stream: None,
            rows: 0,
        }))
    }

    fn describe(&self) -> String {
        format!("group #{}", self.group)
    }
}

// ============================================================================
// GroupScanPositional
// ============================================================================

/// Scan at the hKey of the row bound at `binding_position`.
///
/// With `hkey_type` the bound hKey is first shortened to that type's depth,
/// so a bound item row can start a scan at its customer.
#[derive(Debug)]
pub struct GroupScanPositional {
    group: GroupId,
    binding_position: usize,
    deep: bool,
    hkey_type: Option<RowTypeRef>,
}

impl GroupScanPositional {
    pub fn new(
        group: GroupId,
        binding_position: usize,
        deep: bool,
        hkey_type: Option<RowTypeRef>,
    ) -> Result<Self> {
        if let Some(t) = &hkey_type {
            if t.hkey_len().is_none() {
                return Err(Error::invalid_argument(format!(
                    "{} does not have an hkey",
                    t
                )));
            }
        }
        Ok(Self {
            group,
            binding_position,
            deep,
            hkey_type,
        })
    }
}

impl PlanNode for GroupScanPositional {
    fn name(&self) -> &'static str {
        "GroupScan_Positional"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(StreamCursor {
            name: self.name(),
            ctx: ctx.clone(),
            source: StreamSource::Bound {
                group: self.group,
                position: self.binding_position,
                deep: self.deep,
                hkey_len: self.hkey_type.as_ref().and_then(|t| t.hkey_len()),
            },
            stream: None,
            rows: 0,
        }))
    }

    fn describe(&self) -> String {
        let mut s = format!(
            "group #{}, binding {}, {}",
            self.group,
            self.binding_position,
            if self.deep { "deep" } else { "shallow" }
        );
        if let Some(t) = &self.hkey_type {
            let _ = write!(s, ", shorten to {}", t);
        }
        s
    }
}

enum StreamSource {
    Group(GroupId),
    Bound {
        group: GroupId,
        position: usize,
        deep: bool,
        hkey_len: Option<usize>,
    },
}

struct StreamCursor {
    name: &'static str,
    ctx: QueryContext,
    source: StreamSource,
    stream: Option<Box<dyn RowStream>>,
    rows: usize,
}

impl CursorBody for StreamCursor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.rows = 0;
        let stream = match &self.source {
            StreamSource::Group(group) => self.ctx.store().scan_group(*group)?,
            StreamSource::Bound {
                group,
                position,
                deep,
                hkey_len,
            } => {
                let bound = bindings.row(*position)?;
                let hkey = bound.require_hkey()?;
                let hkey = match hkey_len {
                    Some(len) => hkey.truncate(*len),
                    None => hkey.clone(),
                };
                self.ctx.store().scan_hkey(*group, &hkey, *deep)?
            }
        };
        self.stream = Some(stream);
        Ok(())
    }

    fn next(&mut self, _bindings: &mut QueryBindings) -> Result<Option<Row>> {
        let row = match self.stream.as_mut() {
            Some(stream) => stream.next_row()?,
            None => None,
        };
        if row.is_some() {
            self.rows += 1;
        }
        Ok(row)
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            log::debug!("{} closed after {} rows", self.name, self.rows);
        }
    }
}

// ============================================================================
// ValuesScan
// ============================================================================

#[derive(Debug)]
pub struct ValuesScan {
    row_type: RowTypeRef,
    rows: Vec<Vec<ExpressionRef>>,
}

impl ValuesScan {
    pub fn new(row_type: RowTypeRef, rows: Vec<Vec<ExpressionRef>>) -> Result<Self> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != row_type.field_count() {
                return Err(Error::invalid_argument(format!(
                    "values row {} has {} expressions, {} expects {}",
                    i,
                    row.len(),
                    row_type,
                    row_type.field_count()
                )));
            }
        }
        Ok(Self { row_type, rows })
    }
}

impl PlanNode for ValuesScan {
    fn name(&self) -> &'static str {
        "ValuesScan_Default"
    }

    fn cursor(&self, _ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(ValuesScanCursor {
            row_type: self.row_type.clone(),
            rows: self.rows.clone(),
            position: 0,
        }))
    }

    fn describe(&self) -> String {
        format!("{} rows of {}", self.rows.len(), self.row_type)
    }
}

struct ValuesScanCursor {
    row_type: RowTypeRef,
    rows: Vec<Vec<ExpressionRef>>,
    position: usize,
}

impl CursorBody for ValuesScanCursor {
    fn name(&self) -> &'static str {
        "ValuesScan_Default"
    }

    fn open(&mut self, _bindings: &mut QueryBindings) -> Result<()> {
        self.position = 0;
        Ok(())
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        let exprs = match self.rows.get(self.position) {
            Some(exprs) => exprs,
            None => return Ok(None),
        };
        self.position += 1;
        let values = exprs
            .iter()
            .map(|e| e.evaluate(None, bindings))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Row::new(self.row_type.clone(), values)))
    }

    fn release(&mut self) {
        self.position = self.rows.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, Value};
    use crate::executor::operators::test_support::{describe, Fixture};
    use crate::expression::{bound_value, literal};

    #[test]
    fn test_group_scan_hkey_order() {
        let f = Fixture::new();
        let rows = f.run(&f.scan());
        assert_eq!(rows.len(), 12);
        assert_eq!(
            describe(&rows[..4]),
            vec!["customer 1", "order 10", "item 100", "item 101"]
        );
        let hkeys: Vec<_> = rows.iter().map(|r| r.hkey().unwrap().clone()).collect();
        assert!(hkeys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(f.store.outstanding_requests(), 0);
    }

    #[test]
    fn test_positional_scan() {
        let f = Fixture::new();
        let rows = f.run(&f.scan());
        let item = rows.iter().find(|r| r[0] == Value::integer(110)).unwrap().clone();

        let customer = f.row_type("customer");
        let op = f.api.group_scan_positional(0, 2, true, Some(customer)).unwrap();
        let mut bindings = QueryBindings::new();
        bindings.set_row(2, item.clone());
        let subtree = f.run_with(&op, &mut bindings);
        assert_eq!(subtree.len(), 7);

        let exact = f.api.group_scan_positional(0, 2, false, None).unwrap();
        let rows = f.run_with(&exact, &mut bindings);
        assert_eq!(rows, vec![item]);
    }

    #[test]
    fn test_positional_scan_requires_binding() {
        let f = Fixture::new();
        let op = f.api.group_scan_positional(0, 9, false, None).unwrap();
        let mut cursor = op.cursor(&f.ctx).unwrap();
        let err = cursor.open(&mut QueryBindings::new()).unwrap_err();
        assert_eq!(err, Error::BindingNotFound(9));
    }

    #[test]
    fn test_values_scan() {
        let f = Fixture::new();
        let row_type = f.api.schema().values_type(vec![DataType::Integer, DataType::Text]);
        let op = f
            .api
            .values_scan(
                row_type.clone(),
                vec![
                    vec![literal(1), literal("x")],
                    vec![bound_value(0, DataType::Integer), literal("y")],
                ],
            )
            .unwrap();
        let mut bindings = QueryBindings::new();
        bindings.set_value(0, Value::integer(7));
        let rows = f.run_with(&op, &mut bindings);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], Value::integer(7));

        assert!(f.api.values_scan(row_type, vec![vec![literal(1)]]).is_err());
    }
}
