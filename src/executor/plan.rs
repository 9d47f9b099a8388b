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

//! Operator descriptions
//!
//! An [`Operator`] is an immutable description of a transformation. It owns
//! its input operators and creates a fresh [`Cursor`] for every execution;
//! all execution state lives in the cursor.

use std::fmt;
use std::sync::Arc;

use crate::core::{Result, RowTypeRef};

use super::context::QueryContext;
use super::cursor::Cursor;
use super::operators::{
    AggregatePartial, AncestorLookup, AncestorLookupNested, BranchLookup, BranchLookupNested,
    Count, CountTableStatus, DeleteReturning, DistinctPartial, EmitBoundRow, Filter, Flatten,
    GroupScan, GroupScanPositional, HKeyUnionOrdered, IfEmpty, IndexScan, InsertReturning,
    IntersectOrdered, Limit, MapNestedLoops, ProductNested, Project, SelectBloomFilter,
    SelectHKeyOrdered, SortGeneral, SortInsertionLimited, UnionAll, UnionOrdered,
    UpdateReturning, UsingBloomFilter, ValuesScan,
};

pub type OperatorRef = Arc<Operator>;

/// Behavior shared by every operator description
pub trait PlanNode: Send + Sync + fmt::Debug {
    /// Operator name as shown by explain
    fn name(&self) -> &'static str;

    /// Fresh cursor for one execution
    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>>;

    fn inputs(&self) -> Vec<&OperatorRef> {
        Vec::new()
    }

    /// Row type this operator derives for its output, if it creates one
    fn output_type(&self) -> Option<RowTypeRef> {
        None
    }

    /// Arguments shown by explain
    fn describe(&self) -> String {
        String::new()
    }
}

/// Closed set of operator descriptions
#[derive(Debug)]
pub enum Operator {
    GroupScan(GroupScan),
    GroupScanPositional(GroupScanPositional),
    ValuesScan(ValuesScan),
    IndexScan(IndexScan),
    AncestorLookup(AncestorLookup),
    BranchLookup(BranchLookup),
    AncestorLookupNested(AncestorLookupNested),
    BranchLookupNested(BranchLookupNested),
    SelectHKeyOrdered(SelectHKeyOrdered),
    Filter(Filter),
    Project(Project),
    Flatten(Flatten),
    ProductNested(ProductNested),
    Limit(Limit),
    SortInsertionLimited(SortInsertionLimited),
    SortGeneral(SortGeneral),
    DistinctPartial(DistinctPartial),
    Count(Count),
    CountTableStatus(CountTableStatus),
    AggregatePartial(AggregatePartial),
    UnionAll(UnionAll),
    UnionOrdered(UnionOrdered),
    HKeyUnionOrdered(HKeyUnionOrdered),
    IntersectOrdered(IntersectOrdered),
    UsingBloomFilter(UsingBloomFilter),
    SelectBloomFilter(SelectBloomFilter),
    MapNestedLoops(MapNestedLoops),
    EmitBoundRow(EmitBoundRow),
    IfEmpty(IfEmpty),
    InsertReturning(InsertReturning),
    UpdateReturning(UpdateReturning),
    DeleteReturning(DeleteReturning),
}

impl Operator {
    fn node(&self) -> &dyn PlanNode {
        match self {
            Operator::GroupScan(op) => op,
            Operator::GroupScanPositional(op) => op,
            Operator::ValuesScan(op) => op,
            Operator::IndexScan(op) => op,
            Operator::AncestorLookup(op) => op,
            Operator::BranchLookup(op) => op,
            Operator::AncestorLookupNested(op) => op,
            Operator::BranchLookupNested(op) => op,
            Operator::SelectHKeyOrdered(op) => op,
            Operator::Filter(op) => op,
            Operator::Project(op) => op,
            Operator::Flatten(op) => op,
            Operator::ProductNested(op) => op,
            Operator::Limit(op) => op,
            Operator::SortInsertionLimited(op) => op,
            Operator::SortGeneral(op) => op,
            Operator::DistinctPartial(op) => op,
            Operator::Count(op) => op,
            Operator::CountTableStatus(op) => op,
            Operator::AggregatePartial(op) => op,
            Operator::UnionAll(op) => op,
            Operator::UnionOrdered(op) => op,
            Operator::HKeyUnionOrdered(op) => op,
            Operator::IntersectOrdered(op) => op,
            Operator::UsingBloomFilter(op) => op,
            Operator::SelectBloomFilter(op) => op,
            Operator::MapNestedLoops(op) => op,
            Operator::EmitBoundRow(op) => op,
            Operator::IfEmpty(op) => op,
            Operator::InsertReturning(op) => op,
            Operator::UpdateReturning(op) => op,
            Operator::DeleteReturning(op) => op,
        }
    }

    pub fn name(&self) -> &'static str {
        self.node().name()
    }

    pub fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        self.node().cursor(ctx)
    }

    pub fn inputs(&self) -> Vec<&OperatorRef> {
        self.node().inputs()
    }

    pub fn describe(&self) -> String {
        self.node().describe()
    }

    pub fn output_type(&self) -> Option<RowTypeRef> {
        self.node().output_type()
    }

    /// Render the operator tree, one operator per line, inputs indented
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.explain_into(&mut out, 0);
        out
    }

    fn explain_into(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(self.name());
        let args = self.describe();
        if !args.is_empty() {
            out.push('(');
            out.push_str(&args);
            out.push(')');
        }
        out.push('\n');
        for input in self.inputs() {
            input.explain_into(out, depth + 1);
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.explain().trim_end())
    }
}
