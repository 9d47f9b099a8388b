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

//! Group lookups
//!
//! For each input row of the target type, fetch related rows of the same
//! group: ancestors by truncating the row's hKey, or a whole branch by
//! scanning the subtree below the lowest common ancestor of the input
//! table and the branch root.
//!
//! ```text
//! input item [c1, o10, i100]
//!   ancestor_lookup(customer, order)  scan [c1], [c1, o10]
//!   branch_lookup(address)            scan [c1] deep, keep address rows
//! ```
//!
//! Lookups are pipelined: up to `lookahead_quantum` input rows have their
//! storage requests issued before the oldest one is drained. Entries are
//! drained strictly in input order, so output order never depends on the
//! quantum.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::core::{
    Error, GroupId, InputPreservation, Result, Row, RowType, RowTypeRef, Schema, TableId,
};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};
use crate::executor::utils::leaf_table;
use crate::storage::{RowStream, StoreRef};

// ============================================================================
// Lookup targets
// ============================================================================

/// What a lookup fetches for one input row
#[derive(Debug, Clone)]
pub(crate) enum LookupTarget {
    /// hKey lengths of the ancestors to fetch, shallowest first
    Ancestors { hkey_lens: Vec<usize> },
    /// Subtree below the common ancestor, restricted to `output`
    Branch {
        prefix_len: usize,
        output: Arc<FxHashSet<TableId>>,
    },
}

impl LookupTarget {
    /// Ancestors of `input_type`; the input's own table counts for index rows
    pub(crate) fn ancestors(input_type: &RowType, ancestors: &[RowTypeRef]) -> Result<Self> {
        let input_path = input_type.table_path().ok_or_else(|| {
            Error::invalid_argument(format!("{} does not have an hkey", input_type))
        })?;
        if ancestors.is_empty() {
            return Err(Error::invalid_argument("ancestor lookup without ancestor types"));
        }
        let mut hkey_lens = Vec::with_capacity(ancestors.len());
        for ancestor in ancestors {
            let path = match (ancestor.table_id(), ancestor.table_path()) {
                (Some(_), Some(path)) => path,
                _ => {
                    return Err(Error::invalid_argument(format!(
                        "{} is not a table row type",
                        ancestor
                    )))
                }
            };
            if ancestor.as_ref() == input_type || !input_path.starts_with(path) {
                return Err(Error::invalid_argument(format!(
                    "{} is not an ancestor of {}",
                    ancestor, input_type
                )));
            }
            hkey_lens.push(path.len());
        }
        hkey_lens.sort_unstable();
        hkey_lens.dedup();
        Ok(LookupTarget::Ancestors { hkey_lens })
    }

    /// Branch rooted at `root`, restricted to `output` (default: the whole subtree)
    pub(crate) fn branch(
        schema: &Schema,
        input_type: &RowType,
        root: &RowType,
        output: Option<&[RowTypeRef]>,
    ) -> Result<Self> {
        let input_table = leaf_table(input_type).ok_or_else(|| {
            Error::invalid_argument(format!("{} does not have an hkey", input_type))
        })?;
        let root_table = root.table_id().ok_or_else(|| {
            Error::invalid_argument(format!("{} is not a table row type", root))
        })?;
        let lca = schema
            .common_ancestor(input_table, root_table)?
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "{} and {} are not in the same group",
                    input_type, root
                ))
            })?;
        let prefix_len = schema.table(lca)?.depth + 1;

        let subtree: FxHashSet<TableId> = schema.subtree(root_table).into_iter().collect();
        let output = match output {
            None => subtree,
            Some(types) => {
                let mut selected = FxHashSet::default();
                for t in types {
                    match t.table_id() {
                        Some(id) if subtree.contains(&id) => {
                            selected.insert(id);
                        }
                        _ => {
                            return Err(Error::invalid_argument(format!(
                                "{} is not in the branch rooted at {}",
                                t, root
                            )))
                        }
                    }
                }
                selected
            }
        };
        Ok(LookupTarget::Branch {
            prefix_len,
            output: Arc::new(output),
        })
    }

    /// Start the storage requests for one input row
    pub(crate) fn start(
        &self,
        store: &StoreRef,
        group: GroupId,
        input: Row,
        keep_input: bool,
    ) -> Result<LookupBatch> {
        let hkey = input.require_hkey()?.clone();
        let mut streams = VecDeque::new();
        let output = match self {
            LookupTarget::Ancestors { hkey_lens } => {
                for len in hkey_lens.iter().filter(|len| **len <= hkey.len()) {
                    streams.push_back(store.scan_hkey(group, &hkey.truncate(*len), false)?);
                }
                None
            }
            LookupTarget::Branch { prefix_len, output } => {
                if *prefix_len <= hkey.len() {
                    streams.push_back(store.scan_hkey(group, &hkey.truncate(*prefix_len), true)?);
                }
                Some(Arc::clone(output))
            }
        };
        log::trace!("lookup for {} issued {} requests", hkey, streams.len());
        Ok(LookupBatch {
            input: if keep_input { Some(input) } else { None },
            held: None,
            streams,
            output,
        })
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            LookupTarget::Ancestors { hkey_lens } => format!("ancestors at depths {:?}", hkey_lens),
            LookupTarget::Branch { prefix_len, output } => {
                let mut tables: Vec<_> = output.iter().copied().collect();
                tables.sort_unstable();
                format!("branch below depth {} tables {:?}", prefix_len, tables)
            }
        }
    }
}

/// Looked-up rows for one input row, merged with the input in hKey order
pub(crate) struct LookupBatch {
    input: Option<Row>,
    held: Option<Row>,
    streams: VecDeque<Box<dyn RowStream>>,
    output: Option<Arc<FxHashSet<TableId>>>,
}

impl LookupBatch {
    pub(crate) fn requests(&self) -> usize {
        self.streams.len()
    }

    fn next_found(&mut self) -> Result<Option<Row>> {
        while let Some(stream) = self.streams.front_mut() {
            match stream.next_row()? {
                Some(row) => {
                    let wanted = match (&self.output, row.row_type().table_id()) {
                        (None, _) => true,
                        (Some(output), Some(table)) => output.contains(&table),
                        (Some(_), None) => false,
                    };
                    if wanted {
                        return Ok(Some(row));
                    }
                }
                None => {
                    self.streams.pop_front();
                }
            }
        }
        Ok(None)
    }

    pub(crate) fn next_row(&mut self) -> Result<Option<Row>> {
        let found = match self.held.take() {
            Some(row) => Some(row),
            None => self.next_found()?,
        };
        match (found, self.input.take()) {
            (None, input) => Ok(input),
            (Some(row), None) => Ok(Some(row)),
            (Some(row), Some(input)) => match input.hkey().cmp(&row.hkey()) {
                Ordering::Less => {
                    self.held = Some(row);
                    Ok(Some(input))
                }
                // the input row itself, found again in its branch
                Ordering::Equal if row.row_type() == input.row_type() => Ok(Some(input)),
                Ordering::Equal => {
                    self.held = Some(row);
                    Ok(Some(input))
                }
                Ordering::Greater => {
                    self.input = Some(input);
                    Ok(Some(row))
                }
            },
        }
    }
}

// ============================================================================
// Pipelined lookup cursor
// ============================================================================

enum Pending {
    /// Row of another type, passed through in place
    Row(Row),
    Batch(LookupBatch),
}

struct LookupCursor {
    name: &'static str,
    ctx: QueryContext,
    input: Box<dyn Cursor>,
    input_type: u32,
    group: GroupId,
    target: LookupTarget,
    keep_input: bool,
    quantum: usize,
    pending: VecDeque<Pending>,
    input_done: bool,
    requests: usize,
}

impl LookupCursor {
    fn fill(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        while !self.input_done && self.pending.len() < self.quantum {
            match self.input.next(bindings)? {
                None => self.input_done = true,
                Some(row) if row.row_type().id() == self.input_type => {
                    let batch =
                        self.target
                            .start(self.ctx.store(), self.group, row, self.keep_input)?;
                    self.requests += batch.requests();
                    self.pending.push_back(Pending::Batch(batch));
                }
                Some(row) => self.pending.push_back(Pending::Row(row)),
            }
        }
        Ok(())
    }
}

impl CursorBody for LookupCursor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.pending.clear();
        self.input_done = false;
        self.requests = 0;
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        loop {
            self.fill(bindings)?;
            match self.pending.front_mut() {
                None => return Ok(None),
                Some(Pending::Row(_)) => {
                    if let Some(Pending::Row(row)) = self.pending.pop_front() {
                        return Ok(Some(row));
                    }
                }
                Some(Pending::Batch(batch)) => match batch.next_row()? {
                    Some(row) => return Ok(Some(row)),
                    None => {
                        self.pending.pop_front();
                    }
                },
            }
        }
    }

    fn release(&mut self) {
        let dropped = self.pending.len();
        self.pending.clear();
        self.input.close();
        log::debug!(
            "{} closed: {} requests issued, {} pending entries dropped",
            self.name,
            self.requests,
            dropped
        );
    }
}

#[allow(clippy::too_many_arguments)]
fn lookup_cursor(
    name: &'static str,
    ctx: &QueryContext,
    input: &OperatorRef,
    input_type: &RowTypeRef,
    group: GroupId,
    target: &LookupTarget,
    keep_input: bool,
    quantum: usize,
) -> Result<Box<dyn Cursor>> {
    Ok(managed(LookupCursor {
        name,
        ctx: ctx.clone(),
        input: input.cursor(ctx)?,
        input_type: input_type.id(),
        group,
        target: target.clone(),
        keep_input,
        quantum,
        pending: VecDeque::new(),
        input_done: false,
        requests: 0,
    }))
}

// ============================================================================
// AncestorLookup
// ============================================================================

#[derive(Debug)]
pub struct AncestorLookup {
    input: OperatorRef,
    group: GroupId,
    input_type: RowTypeRef,
    target: LookupTarget,
    flag: InputPreservation,
    quantum: usize,
}

impl AncestorLookup {
    pub fn new(
        input: OperatorRef,
        group: GroupId,
        input_type: RowTypeRef,
        ancestor_types: &[RowTypeRef],
        flag: InputPreservation,
        quantum: usize,
    ) -> Result<Self> {
        let target = LookupTarget::ancestors(&input_type, ancestor_types)?;
        Ok(Self {
            input,
            group,
            input_type,
            target,
            flag,
            quantum,
        })
    }
}

impl PlanNode for AncestorLookup {
    fn name(&self) -> &'static str {
        "AncestorLookup_Default"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        lookup_cursor(
            self.name(),
            ctx,
            &self.input,
            &self.input_type,
            self.group,
            &self.target,
            self.flag == InputPreservation::KeepInput,
            self.quantum,
        )
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn describe(&self) -> String {
        format!(
            "{} -> {}, {:?}, lookahead {}",
            self.input_type,
            self.target.describe(),
            self.flag,
            self.quantum
        )
    }
}

// ============================================================================
// BranchLookup
// ============================================================================

#[derive(Debug)]
pub struct BranchLookup {
    input: OperatorRef,
    group: GroupId,
    input_type: RowTypeRef,
    target: LookupTarget,
    flag: InputPreservation,
    quantum: usize,
}

impl BranchLookup {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        schema: &Schema,
        input: OperatorRef,
        group: GroupId,
        input_type: RowTypeRef,
        root_type: &RowType,
        output_types: Option<&[RowTypeRef]>,
        flag: InputPreservation,
        quantum: usize,
    ) -> Result<Self> {
        let target = LookupTarget::branch(schema, &input_type, root_type, output_types)?;
        Ok(Self {
            input,
            group,
            input_type,
            target,
            flag,
            quantum,
        })
    }
}

impl PlanNode for BranchLookup {
    fn name(&self) -> &'static str {
        "BranchLookup_Default"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        lookup_cursor(
            self.name(),
            ctx,
            &self.input,
            &self.input_type,
            self.group,
            &self.target,
            self.flag == InputPreservation::KeepInput,
            self.quantum,
        )
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn describe(&self) -> String {
        format!(
            "{} -> {}, {:?}, lookahead {}",
            self.input_type,
            self.target.describe(),
            self.flag,
            self.quantum
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InputPreservation::{DiscardInput, KeepInput};
    use crate::executor::operators::test_support::{describe, Fixture};

    #[test]
    fn test_ancestor_lookup_keeps_input_last() {
        let f = Fixture::new();
        let item = f.row_type("item");
        let input = f.api.filter(f.scan(), &[item.clone()]).unwrap();
        let op = f
            .api
            .ancestor_lookup(
                input,
                0,
                item,
                &[f.row_type("order"), f.row_type("customer")],
                KeepInput,
                1,
            )
            .unwrap();
        let rows = f.run(&op);
        assert_eq!(
            describe(&rows[..6]),
            vec![
                "customer 1",
                "order 10",
                "item 100",
                "customer 1",
                "order 10",
                "item 101"
            ]
        );
        assert_eq!(rows.len(), 12);
    }

    #[test]
    fn test_branch_lookup_sibling_branch() {
        let f = Fixture::new();
        let order = f.row_type("order");
        let input = f.api.filter(f.scan(), &[order.clone()]).unwrap();
        let op = f
            .api
            .branch_lookup(input, 0, order, &f.row_type("address"), KeepInput, 2)
            .unwrap();
        let rows = f.run(&op);
        assert_eq!(
            describe(&rows),
            vec![
                "order 10",
                "address 1000",
                "order 11",
                "address 1000",
                "order 20"
            ]
        );
    }

    #[test]
    fn test_branch_lookup_descendants_discarding_input() {
        let f = Fixture::new();
        let customer = f.row_type("customer");
        let input = f.api.filter(f.scan(), &[customer.clone()]).unwrap();
        let op = f
            .api
            .branch_lookup(input, 0, customer, &f.row_type("order"), DiscardInput, 1)
            .unwrap();
        let rows = f.run(&op);
        assert_eq!(
            describe(&rows),
            vec!["order 10", "item 100", "item 101", "order 11", "item 110", "order 20", "item 200"]
        );
    }

    #[test]
    fn test_pipelining_preserves_order() {
        let f = Fixture::new();
        let item = f.row_type("item");
        let run = |quantum| {
            let op = f
                .api
                .ancestor_lookup(f.scan(), 0, item.clone(), &[f.row_type("customer")], KeepInput, quantum)
                .unwrap();
            f.run(&op)
        };
        let serial = run(1);
        assert_eq!(serial, run(3));
        assert_eq!(serial, run(64));
    }

    #[test]
    fn test_close_releases_lookahead() {
        let f = Fixture::new();
        let item = f.row_type("item");
        let op = f
            .api
            .ancestor_lookup(f.scan(), 0, item, &[f.row_type("order")], DiscardInput, 8)
            .unwrap();
        let mut cursor = op.cursor(&f.ctx).unwrap();
        let mut bindings = QueryBindings::new();
        cursor.open(&mut bindings).unwrap();
        cursor.next(&mut bindings).unwrap();
        assert!(f.store.outstanding_requests() > 1);
        cursor.close();
        assert_eq!(f.store.outstanding_requests(), 0);
        cursor.close();
    }

    #[test]
    fn test_lookup_validation() {
        let f = Fixture::new();
        let order = f.row_type("order");
        let item = f.row_type("item");
        assert!(matches!(
            f.api.ancestor_lookup(f.scan(), 0, order.clone(), &[item.clone()], KeepInput, 1),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            f.api.ancestor_lookup(f.scan(), 0, order.clone(), &[f.row_type("customer")], KeepInput, 0),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            f.api.group_lookup(f.scan(), 0, order, &[item, f.row_type("address")], KeepInput, 1),
            Err(Error::InvalidArgument(_))
        ));
    }
}
