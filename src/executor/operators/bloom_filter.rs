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

//! Bloom-filter semi-join
//!
//! ```text
//! UsingBloomFilter            builds the filter from the filter input,
//!   <filter input>            binds it at the filter position and streams
//!   SelectBloomFilter         the stream input
//!     <stream input>          each row is hashed and tested; positives
//!     <on-positive plan>      are confirmed by running the nested plan
//! ```
//!
//! Rows whose hash misses the filter are dropped without running the
//! nested plan. A false positive costs one nested execution.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::common::{hash_key, BloomFilter};
use crate::core::{CollatorRef, Error, Result, Row, RowTypeRef};
use crate::executor::bindings::{Binding, QueryBindings};
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};
use crate::expression::ExpressionRef;

fn check_collators(collators: &Option<Vec<Option<CollatorRef>>>, fields: usize) -> Result<()> {
    match collators {
        Some(c) if c.len() != fields => Err(Error::invalid_argument(format!(
            "{} collators for {} filter fields",
            c.len(),
            fields
        ))),
        _ => Ok(()),
    }
}

// ============================================================================
// UsingBloomFilter
// ============================================================================

#[derive(Debug)]
pub struct UsingBloomFilter {
    filter_input: OperatorRef,
    filter_type: RowTypeRef,
    estimated_row_count: usize,
    binding_position: usize,
    stream_input: OperatorRef,
    collators: Option<Vec<Option<CollatorRef>>>,
}

impl UsingBloomFilter {
    pub fn new(
        filter_input: OperatorRef,
        filter_type: RowTypeRef,
        estimated_row_count: usize,
        binding_position: usize,
        stream_input: OperatorRef,
        collators: Option<Vec<Option<CollatorRef>>>,
    ) -> Result<Self> {
        check_collators(&collators, filter_type.field_count())?;
        Ok(Self {
            filter_input,
            filter_type,
            estimated_row_count,
            binding_position,
            stream_input,
            collators,
        })
    }
}

impl PlanNode for UsingBloomFilter {
    fn name(&self) -> &'static str {
        "Using_BloomFilter"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(UsingBloomFilterCursor {
            filter_input: self.filter_input.cursor(ctx)?,
            stream_input: self.stream_input.cursor(ctx)?,
            filter_type: self.filter_type.id(),
            estimated_row_count: self.estimated_row_count,
            false_positive_rate: ctx.config().bloom_false_positive_rate,
            binding_position: self.binding_position,
            collators: self.collators.clone(),
            filter: None,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.filter_input, &self.stream_input]
    }

    fn describe(&self) -> String {
        format!(
            "{} estimated {} at binding {}",
            self.filter_type, self.estimated_row_count, self.binding_position
        )
    }
}

struct UsingBloomFilterCursor {
    filter_input: Box<dyn Cursor>,
    stream_input: Box<dyn Cursor>,
    filter_type: u32,
    estimated_row_count: usize,
    false_positive_rate: f64,
    binding_position: usize,
    collators: Option<Vec<Option<CollatorRef>>>,
    /// The filter binding, pushed around every call into the stream input
    filter: Option<Binding>,
}

impl UsingBloomFilterCursor {
    fn build_filter(&mut self, bindings: &mut QueryBindings) -> Result<BloomFilter> {
        if self.estimated_row_count == 0 {
            log::warn!("Using_BloomFilter sized from a zero row estimate");
        }
        let mut filter = BloomFilter::new(self.estimated_row_count, self.false_positive_rate);
        self.filter_input.open(bindings)?;
        while let Some(row) = self.filter_input.next(bindings)? {
            if row.row_type().id() == self.filter_type {
                filter.insert_hash(hash_key(row.values(), self.collators.as_deref()));
            }
        }
        self.filter_input.close();
        log::debug!(
            "Using_BloomFilter loaded {} keys, estimated false positive rate {:.4}",
            filter.len(),
            filter.estimated_false_positive_rate()
        );
        Ok(filter)
    }

    fn with_filter<R>(
        &mut self,
        bindings: &mut QueryBindings,
        f: impl FnOnce(&mut dyn Cursor, &mut QueryBindings) -> Result<R>,
    ) -> Result<R> {
        let binding = self
            .filter
            .take()
            .ok_or(Error::BindingNotFound(self.binding_position))?;
        let stream = self.stream_input.as_mut();
        let (result, binding) = bindings.scoped(self.binding_position, binding, |b| f(stream, b));
        self.filter = Some(binding);
        result
    }
}

impl CursorBody for UsingBloomFilterCursor {
    fn name(&self) -> &'static str {
        "Using_BloomFilter"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        let filter = self.build_filter(bindings)?;
        self.filter = Some(Binding::BloomFilter(Arc::new(filter)));
        self.with_filter(bindings, |stream, b| stream.open(b))
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        self.with_filter(bindings, |stream, b| stream.next(b))
    }

    fn release(&mut self) {
        self.filter_input.close();
        self.stream_input.close();
        self.filter = None;
    }
}

// ============================================================================
// SelectBloomFilter
// ============================================================================

#[derive(Debug)]
pub struct SelectBloomFilter {
    input: OperatorRef,
    on_positive: OperatorRef,
    fields: Vec<ExpressionRef>,
    collators: Option<Vec<Option<CollatorRef>>>,
    binding_position: usize,
    quantum: usize,
}

impl SelectBloomFilter {
    pub fn new(
        input: OperatorRef,
        on_positive: OperatorRef,
        fields: Vec<ExpressionRef>,
        collators: Option<Vec<Option<CollatorRef>>>,
        binding_position: usize,
        quantum: usize,
    ) -> Result<Self> {
        if fields.is_empty() {
            return Err(Error::invalid_argument("bloom filter select without fields"));
        }
        check_collators(&collators, fields.len())?;
        Ok(Self {
            input,
            on_positive,
            fields,
            collators,
            binding_position,
            quantum,
        })
    }
}

impl PlanNode for SelectBloomFilter {
    fn name(&self) -> &'static str {
        "Select_BloomFilter"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(SelectBloomFilterCursor {
            ctx: ctx.clone(),
            input: self.input.cursor(ctx)?,
            on_positive: Arc::clone(&self.on_positive),
            fields: self.fields.clone(),
            collators: self.collators.clone(),
            binding_position: self.binding_position,
            quantum: self.quantum,
            pending: VecDeque::new(),
            pool: Vec::new(),
            input_done: false,
            stats: ProbeStats::default(),
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input, &self.on_positive]
    }

    fn describe(&self) -> String {
        format!(
            "{} fields at binding {}, lookahead {}",
            self.fields.len(),
            self.binding_position,
            self.quantum
        )
    }
}

/// A filter-positive input row whose confirming plan has been opened
struct Probe {
    row: Row,
    cursor: Box<dyn Cursor>,
}

#[derive(Debug, Default)]
struct ProbeStats {
    rows: usize,
    negatives: usize,
    confirmed: usize,
}

struct SelectBloomFilterCursor {
    ctx: QueryContext,
    input: Box<dyn Cursor>,
    on_positive: OperatorRef,
    fields: Vec<ExpressionRef>,
    collators: Option<Vec<Option<CollatorRef>>>,
    binding_position: usize,
    quantum: usize,
    pending: VecDeque<Probe>,
    /// Closed on-positive cursors, reopened for later probes
    pool: Vec<Box<dyn Cursor>>,
    input_done: bool,
    stats: ProbeStats,
}

impl SelectBloomFilterCursor {
    fn might_match(&self, row: &Row, bindings: &QueryBindings) -> Result<bool> {
        let key = self
            .fields
            .iter()
            .map(|f| f.evaluate(Some(row), bindings))
            .collect::<Result<Vec<_>>>()?;
        let filter = bindings.bloom_filter(self.binding_position)?;
        Ok(filter.might_contain_hash(hash_key(&key, self.collators.as_deref())))
    }

    fn fill(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        while !self.input_done && self.pending.len() < self.quantum {
            let row = match self.input.next(bindings)? {
                Some(row) => row,
                None => {
                    self.input_done = true;
                    break;
                }
            };
            self.stats.rows += 1;
            if !self.might_match(&row, bindings)? {
                self.stats.negatives += 1;
                continue;
            }
            let mut cursor = match self.pool.pop() {
                Some(cursor) => cursor,
                None => self.on_positive.cursor(&self.ctx)?,
            };
            let (opened, binding) =
                bindings.scoped(self.binding_position, Binding::Row(row), |b| cursor.open(b));
            opened?;
            if let Binding::Row(row) = binding {
                self.pending.push_back(Probe { row, cursor });
            }
        }
        Ok(())
    }
}

impl CursorBody for SelectBloomFilterCursor {
    fn name(&self) -> &'static str {
        "Select_BloomFilter"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.pending.clear();
        self.input_done = false;
        self.stats = ProbeStats::default();
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        loop {
            self.fill(bindings)?;
            let Probe { row, mut cursor } = match self.pending.pop_front() {
                Some(probe) => probe,
                None => return Ok(None),
            };
            let (found, binding) =
                bindings.scoped(self.binding_position, Binding::Row(row), |b| cursor.next(b));
            cursor.close();
            self.pool.push(cursor);
            if found?.is_some() {
                self.stats.confirmed += 1;
                if let Binding::Row(row) = binding {
                    return Ok(Some(row));
                }
            }
        }
    }

    fn release(&mut self) {
        for mut probe in self.pending.drain(..) {
            probe.cursor.close();
        }
        self.input.close();
        log::debug!(
            "Select_BloomFilter probed {} rows: {} filtered out, {} confirmed",
            self.stats.rows,
            self.stats.negatives,
            self.stats.confirmed
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{DataType, InputPreservation};
    use crate::executor::operators::test_support::{describe, Fixture};
    use crate::executor::OperatorRef;
    use crate::expression::{field, literal};

    /// Customers whose id is in `keys` and who have an address
    fn customers_with_address(f: &Fixture, keys: &[i64], quantum: usize) -> OperatorRef {
        let key_type = f.api.schema().values_type(vec![DataType::Integer]);
        let filter_input = f
            .api
            .values_scan(key_type.clone(), keys.iter().map(|k| vec![literal(*k)]).collect())
            .unwrap();

        let customer = f.row_type("customer");
        let customers = f.api.filter(f.scan(), &[customer.clone()]).unwrap();
        let addresses = f
            .api
            .branch_lookup_nested(
                0,
                customer.clone(),
                &f.row_type("address"),
                None,
                InputPreservation::DiscardInput,
                3,
            )
            .unwrap();
        let select = f
            .api
            .select_bloom_filter(customers, addresses, vec![field(&customer, 0)], None, 3, quantum)
            .unwrap();
        f.api
            .using_bloom_filter(filter_input, key_type, keys.len() as i64, 3, select, None)
            .unwrap()
    }

    #[test]
    fn test_semi_join() {
        let f = Fixture::new();
        let rows = f.run(&customers_with_address(&f, &[1, 2, 3], 1));
        assert_eq!(describe(&rows), vec!["customer 1", "customer 3"]);

        let rows = f.run(&customers_with_address(&f, &[2, 3], 1));
        assert_eq!(describe(&rows), vec!["customer 3"]);
        assert_eq!(f.store.outstanding_requests(), 0);
    }

    #[test]
    fn test_pipelined_probe_keeps_order() {
        let f = Fixture::new();
        let sequential = f.run(&customers_with_address(&f, &[1, 2, 3], 1));
        for quantum in [2, 8] {
            assert_eq!(f.run(&customers_with_address(&f, &[1, 2, 3], quantum)), sequential);
        }
    }

    #[test]
    fn test_empty_filter_drops_everything() {
        let f = Fixture::new();
        assert!(f.run(&customers_with_address(&f, &[], 1)).is_empty());
    }

    #[test]
    fn test_validation() {
        let f = Fixture::new();
        let customer = f.row_type("customer");
        let scan = f.scan();
        assert!(f
            .api
            .select_bloom_filter(scan.clone(), scan.clone(), vec![], None, 0, 1)
            .is_err());
        assert!(f
            .api
            .select_bloom_filter(scan.clone(), scan.clone(), vec![field(&customer, 0)], Some(vec![]), 0, 1)
            .is_err());
        assert!(f
            .api
            .using_bloom_filter(scan.clone(), customer, -1, 0, scan, None)
            .is_err());
    }
}
