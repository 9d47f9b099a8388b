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

//! Index scan
//!
//! Scans an index key range in a per-column direction, optionally collated.
//! For group indexes the selector decides which hierarchy levels must be
//! present in an entry (inner, left or right join semantics).

use std::collections::VecDeque;
use std::fmt;

use crate::core::{CollatorRef, Error, IndexId, Result, Row, RowTypeKind, RowTypeRef, Value};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::PlanNode;
use crate::expression::ExpressionRef;
use crate::storage::{IndexScanRequest, IndexScanSelector, KeyBound, KeyRange, RowStream};

/// One end of a key range, as expressions evaluated at open
#[derive(Debug, Clone)]
pub struct IndexBound {
    pub values: Vec<ExpressionRef>,
    pub inclusive: bool,
}

impl IndexBound {
    pub fn new(values: Vec<ExpressionRef>, inclusive: bool) -> Self {
        Self { values, inclusive }
    }

    fn resolve(&self, bindings: &QueryBindings) -> Result<KeyBound> {
        let values = self
            .values
            .iter()
            .map(|e| e.evaluate(None, bindings))
            .collect::<Result<Vec<Value>>>()?;
        Ok(KeyBound {
            values,
            inclusive: self.inclusive,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndexKeyRange {
    pub lo: Option<IndexBound>,
    pub hi: Option<IndexBound>,
}

impl IndexKeyRange {
    /// Every entry of the index
    pub fn all() -> Self {
        Self::default()
    }

    pub fn bounded(lo: IndexBound, hi: IndexBound) -> Self {
        Self {
            lo: Some(lo),
            hi: Some(hi),
        }
    }

    pub fn starting_at(lo: IndexBound) -> Self {
        Self {
            lo: Some(lo),
            hi: None,
        }
    }

    pub fn ending_at(hi: IndexBound) -> Self {
        Self {
            lo: None,
            hi: Some(hi),
        }
    }

    /// Entries whose leading columns equal `values`
    pub fn equal_to(values: Vec<ExpressionRef>) -> Self {
        Self::bounded(
            IndexBound::new(values.clone(), true),
            IndexBound::new(values, true),
        )
    }

    fn resolve(&self, bindings: &QueryBindings) -> Result<KeyRange> {
        Ok(KeyRange {
            lo: self.lo.as_ref().map(|b| b.resolve(bindings)).transpose()?,
            hi: self.hi.as_ref().map(|b| b.resolve(bindings)).transpose()?,
        })
    }
}

/// Direction and collation per index column.
///
/// Columns past the last listed one follow its direction; an empty
/// ordering scans ascending.
#[derive(Debug, Clone, Default)]
pub struct IndexOrdering {
    ascending: Vec<bool>,
    collators: Vec<Option<CollatorRef>>,
}

impl IndexOrdering {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column(mut self, ascending: bool) -> Self {
        self.ascending.push(ascending);
        self.collators.push(None);
        self
    }

    pub fn column_collated(mut self, ascending: bool, collator: CollatorRef) -> Self {
        self.ascending.push(ascending);
        self.collators.push(Some(collator));
        self
    }

    /// Same columns with every direction flipped
    pub fn reversed(&self) -> Self {
        let ascending = if self.ascending.is_empty() {
            vec![false]
        } else {
            self.ascending.iter().map(|a| !a).collect()
        };
        let mut collators = self.collators.clone();
        collators.resize(ascending.len(), None);
        Self {
            ascending,
            collators,
        }
    }

    pub fn len(&self) -> usize {
        self.ascending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ascending.is_empty()
    }
}

impl fmt::Display for IndexOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dirs: Vec<&str> = self
            .ascending
            .iter()
            .map(|a| if *a { "ASC" } else { "DESC" })
            .collect();
        write!(f, "{}", if dirs.is_empty() { "ASC".to_string() } else { dirs.join(" ") })
    }
}

#[derive(Debug)]
pub struct IndexScan {
    index: IndexId,
    index_type: RowTypeRef,
    range: IndexKeyRange,
    ordering: IndexOrdering,
    selector: IndexScanSelector,
}

impl IndexScan {
    pub fn new(
        index_type: RowTypeRef,
        range: IndexKeyRange,
        ordering: IndexOrdering,
        selector: IndexScanSelector,
    ) -> Result<Self> {
        let index = match index_type.kind() {
            RowTypeKind::Index { index, .. } => *index,
            _ => {
                return Err(Error::invalid_argument(format!(
                    "{} is not an index row type",
                    index_type
                )))
            }
        };
        let columns = index_type.field_count();
        if ordering.len() > columns {
            return Err(Error::invalid_argument(format!(
                "ordering has {} columns, {} has {}",
                ordering.len(),
                index_type,
                columns
            )));
        }
        for bound in range.lo.iter().chain(range.hi.iter()) {
            if bound.values.is_empty() || bound.values.len() > columns {
                return Err(Error::invalid_argument(format!(
                    "key bound with {} columns for {}",
                    bound.values.len(),
                    index_type
                )));
            }
        }
        Ok(Self {
            index,
            index_type,
            range,
            ordering,
            selector,
        })
    }
}

impl PlanNode for IndexScan {
    fn name(&self) -> &'static str {
        "IndexScan_Default"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(IndexScanCursor {
            ctx: ctx.clone(),
            index: self.index,
            range: self.range.clone(),
            ordering: self.ordering.clone(),
            selector: self.selector.clone(),
            batch: ctx.config().index_scan_batch.max(1),
            stream: None,
            buffer: VecDeque::new(),
            rows: 0,
        }))
    }

    fn describe(&self) -> String {
        format!("{} {} {}", self.index_type, self.ordering, self.selector)
    }
}

struct IndexScanCursor {
    ctx: QueryContext,
    index: IndexId,
    range: IndexKeyRange,
    ordering: IndexOrdering,
    selector: IndexScanSelector,
    batch: usize,
    stream: Option<Box<dyn RowStream>>,
    buffer: VecDeque<Row>,
    rows: usize,
}

impl CursorBody for IndexScanCursor {
    fn name(&self) -> &'static str {
        "IndexScan_Default"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        let request = IndexScanRequest {
            index: self.index,
            range: self.range.resolve(bindings)?,
            ascending: self.ordering.ascending.clone(),
            collators: self.ordering.collators.clone(),
            selector: self.selector.clone(),
        };
        log::trace!("index scan {:?}", request.range);
        self.stream = Some(self.ctx.store().scan_index(&request)?);
        self.buffer.clear();
        self.rows = 0;
        Ok(())
    }

    fn next(&mut self, _bindings: &mut QueryBindings) -> Result<Option<Row>> {
        if self.buffer.is_empty() {
            if let Some(stream) = self.stream.as_mut() {
                while self.buffer.len() < self.batch {
                    match stream.next_row()? {
                        Some(row) => self.buffer.push_back(row),
                        None => break,
                    }
                }
            }
        }
        let row = self.buffer.pop_front();
        if row.is_some() {
            self.rows += 1;
        }
        Ok(row)
    }

    fn release(&mut self) {
        self.buffer.clear();
        if self.stream.take().is_some() {
            log::debug!("IndexScan_Default closed after {} entries", self.rows);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CaseInsensitiveCollator;
    use crate::executor::operators::test_support::Fixture;
    use crate::expression::literal;
    use std::sync::Arc;

    fn names(rows: &[Row]) -> Vec<String> {
        rows.iter().map(|r| r[0].to_string()).collect()
    }

    #[test]
    fn test_table_index_range() {
        let f = Fixture::new();
        let index_type = f.api.schema().index_type("customer_name").unwrap();
        let index = f.api.schema().index_by_name("customer_name").unwrap().clone();
        let range = IndexKeyRange::bounded(
            IndexBound::new(vec![literal("alice")], false),
            IndexBound::new(vec![literal("carol")], true),
        );
        let op = f
            .api
            .index_scan(&index_type, range, IndexOrdering::new(), IndexScanSelector::inner(&index))
            .unwrap();
        assert_eq!(names(&f.run(&op)), vec!["bob", "carol"]);
    }

    #[test]
    fn test_reverse_scan_is_exact_reverse() {
        let f = Fixture::new();
        let index_type = f.api.schema().index_type("name_total").unwrap();
        let index = f.api.schema().index_by_name("name_total").unwrap().clone();
        let customer = f.api.schema().table_by_name("customer").unwrap().id;
        let selector = IndexScanSelector::left_join_after(&index, customer).unwrap();

        let forward = IndexOrdering::new().column(true).column(true);
        let asc = f
            .api
            .index_scan(&index_type, IndexKeyRange::all(), forward.clone(), selector.clone())
            .unwrap();
        let desc = f
            .api
            .index_scan(&index_type, IndexKeyRange::all(), forward.reversed(), selector)
            .unwrap();

        let asc_rows = f.run(&asc);
        let mut desc_rows = f.run(&desc);
        desc_rows.reverse();
        assert_eq!(asc_rows.len(), 4);
        assert_eq!(asc_rows, desc_rows);
    }

    #[test]
    fn test_collated_scan_and_batching() {
        let f = Fixture::new();
        f.store
            .insert("customer", vec![Value::integer(4), Value::text("Bob")])
            .unwrap();
        let index_type = f.api.schema().index_type("customer_name").unwrap();
        let index = f.api.schema().index_by_name("customer_name").unwrap().clone();
        let ordering = IndexOrdering::new().column_collated(true, Arc::new(CaseInsensitiveCollator));
        let op = f
            .api
            .index_scan(
                &index_type,
                IndexKeyRange::equal_to(vec![literal("BOB")]),
                ordering,
                IndexScanSelector::inner(&index),
            )
            .unwrap();

        let ctx = QueryContext::with_config(
            f.store.clone(),
            crate::executor::ExecutorConfig::default().with_index_scan_batch(8),
        );
        let mut cursor = op.cursor(&ctx).unwrap();
        let rows = crate::executor::collect(cursor.as_mut(), &mut QueryBindings::new()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(f.store.outstanding_requests(), 0);
    }

    #[test]
    fn test_invalid_index_scans() {
        let f = Fixture::new();
        let customer = f.row_type("customer");
        let index = f.api.schema().index_by_name("customer_name").unwrap().clone();
        assert!(f
            .api
            .index_scan(&customer, IndexKeyRange::all(), IndexOrdering::new(), IndexScanSelector::inner(&index))
            .is_err());

        let index_type = f.api.schema().index_type("customer_name").unwrap();
        let too_long = IndexOrdering::new().column(true).column(false);
        assert!(matches!(
            f.api.index_scan(&index_type, IndexKeyRange::all(), too_long, IndexScanSelector::inner(&index)),
            Err(Error::InvalidArgument(_))
        ));
    }
}
