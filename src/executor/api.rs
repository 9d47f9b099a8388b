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

//! Operator factory
//!
//! [`Api`] is the only way plans are built. Every method validates its
//! arguments against the schema and returns a shared, immutable
//! [`OperatorRef`]; invalid arguments fail with
//! [`Error::InvalidArgument`](crate::core::Error::InvalidArgument) before
//! anything executes.
//!
//! # Example
//!
//! ```ignore
//! let api = Api::new(schema);
//! let scan = api.group_scan(0)?;
//! let orders = api.filter(scan, &[api.schema().table_type("order")?])?;
//! ```

use std::sync::Arc;

use log::debug;

use crate::core::{
    CollatorRef, CollatorRegistry, Error, FlattenOptions, GroupId, InputPreservation,
    IntersectOption, IntersectOptions, JoinType, Result, RowTypeRef, Schema, SortOption,
};
use crate::expression::{ExpressionRef, UpdateFunction};
use crate::storage::IndexScanSelector;

use super::config::ExecutorConfig;
use super::driver::UpdatePlan;
use super::operators::*;
use super::ordering::RowOrdering;
use super::plan::{Operator, OperatorRef};

/// Builds operator trees over one schema
#[derive(Debug, Clone)]
pub struct Api {
    schema: Arc<Schema>,
    config: Arc<ExecutorConfig>,
    collators: CollatorRegistry,
}

impl Api {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            config: Arc::new(ExecutorConfig::default()),
            collators: CollatorRegistry::new(),
        }
    }

    /// Factory with an explicit configuration; the configuration is validated
    pub fn with_config(schema: Arc<Schema>, config: ExecutorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            schema,
            config: Arc::new(config),
            collators: CollatorRegistry::new(),
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Lookahead used by callers that have no better estimate
    pub fn lookahead_quantum(&self) -> usize {
        self.config.lookahead_quantum
    }

    /// Look up a collator by name
    pub fn collator(&self, name: &str) -> Result<CollatorRef> {
        self.collators.get(name)
    }

    /// Register an additional collator
    pub fn register_collator(&mut self, collator: CollatorRef) {
        self.collators.register(collator);
    }

    fn build(&self, op: Operator) -> OperatorRef {
        debug!("built {}", op);
        Arc::new(op)
    }

    // =========================================================================
    // Scans
    // =========================================================================

    /// All rows of a group in hKey order
    pub fn group_scan(&self, group: GroupId) -> Result<OperatorRef> {
        self.schema.group(group)?;
        Ok(self.build(Operator::GroupScan(GroupScan::new(group))))
    }

    /// Rows at the hKey of the row bound at `binding_position`
    ///
    /// With `deep` the whole subtree is returned. When `hkey_type` is given
    /// the bound hKey is first shortened to that type's depth.
    pub fn group_scan_positional(
        &self,
        group: GroupId,
        binding_position: usize,
        deep: bool,
        hkey_type: Option<RowTypeRef>,
    ) -> Result<OperatorRef> {
        self.schema.group(group)?;
        let op = GroupScanPositional::new(group, binding_position, deep, hkey_type)?;
        Ok(self.build(Operator::GroupScanPositional(op)))
    }

    pub fn values_scan(
        &self,
        row_type: RowTypeRef,
        rows: Vec<Vec<ExpressionRef>>,
    ) -> Result<OperatorRef> {
        let op = ValuesScan::new(row_type, rows)?;
        Ok(self.build(Operator::ValuesScan(op)))
    }

    pub fn index_scan(
        &self,
        index_type: &RowTypeRef,
        range: IndexKeyRange,
        ordering: IndexOrdering,
        selector: IndexScanSelector,
    ) -> Result<OperatorRef> {
        let op = IndexScan::new(index_type.clone(), range, ordering, selector)?;
        Ok(self.build(Operator::IndexScan(op)))
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    pub fn ancestor_lookup(
        &self,
        input: OperatorRef,
        group: GroupId,
        input_type: RowTypeRef,
        ancestor_types: &[RowTypeRef],
        flag: InputPreservation,
        quantum: usize,
    ) -> Result<OperatorRef> {
        check_quantum(quantum)?;
        self.schema.group(group)?;
        let op = AncestorLookup::new(input, group, input_type, ancestor_types, flag, quantum)?;
        Ok(self.build(Operator::AncestorLookup(op)))
    }

    /// All rows of the branch rooted at `root_type` for each input row
    pub fn branch_lookup(
        &self,
        input: OperatorRef,
        group: GroupId,
        input_type: RowTypeRef,
        root_type: &RowTypeRef,
        flag: InputPreservation,
        quantum: usize,
    ) -> Result<OperatorRef> {
        check_quantum(quantum)?;
        self.schema.group(group)?;
        let op = BranchLookup::new(
            &self.schema,
            input,
            group,
            input_type,
            root_type,
            None,
            flag,
            quantum,
        )?;
        Ok(self.build(Operator::BranchLookup(op)))
    }

    /// Ancestor lookup when every output type is an ancestor of the input,
    /// otherwise a branch lookup rooted at the shallowest output type
    pub fn group_lookup(
        &self,
        input: OperatorRef,
        group: GroupId,
        input_type: RowTypeRef,
        output_types: &[RowTypeRef],
        flag: InputPreservation,
        quantum: usize,
    ) -> Result<OperatorRef> {
        if output_types.is_empty() {
            return Err(Error::invalid_argument("group lookup without output types"));
        }
        let ancestors = output_types
            .iter()
            .filter(|t| t.is_ancestor_of(&input_type))
            .count();
        if ancestors == output_types.len() {
            return self.ancestor_lookup(input, group, input_type, output_types, flag, quantum);
        }
        if ancestors > 0 {
            return Err(Error::invalid_argument(format!(
                "group lookup from {} mixes ancestor and branch output types",
                input_type
            )));
        }
        check_quantum(quantum)?;
        self.schema.group(group)?;
        let root = output_types
            .iter()
            .min_by_key(|t| t.table_depth().unwrap_or(usize::MAX))
            .cloned()
            .ok_or_else(|| Error::invalid_argument("group lookup without output types"))?;
        let op = BranchLookup::new(
            &self.schema,
            input,
            group,
            input_type,
            &root,
            Some(output_types),
            flag,
            quantum,
        )?;
        Ok(self.build(Operator::BranchLookup(op)))
    }

    pub fn ancestor_lookup_nested(
        &self,
        group: GroupId,
        input_type: RowTypeRef,
        ancestor_types: &[RowTypeRef],
        binding_position: usize,
    ) -> Result<OperatorRef> {
        self.schema.group(group)?;
        let op = AncestorLookupNested::new(group, input_type, ancestor_types, binding_position)?;
        Ok(self.build(Operator::AncestorLookupNested(op)))
    }

    pub fn branch_lookup_nested(
        &self,
        group: GroupId,
        input_type: RowTypeRef,
        root_type: &RowTypeRef,
        output_types: Option<&[RowTypeRef]>,
        flag: InputPreservation,
        binding_position: usize,
    ) -> Result<OperatorRef> {
        self.schema.group(group)?;
        let op = BranchLookupNested::new(
            &self.schema,
            group,
            input_type,
            root_type,
            output_types,
            flag,
            binding_position,
        )?;
        Ok(self.build(Operator::BranchLookupNested(op)))
    }

    // =========================================================================
    // Row flow
    // =========================================================================

    /// Rows of `predicate_type` failing `predicate` are dropped with their descendants
    pub fn select_hkey_ordered(
        &self,
        input: OperatorRef,
        predicate_type: RowTypeRef,
        predicate: ExpressionRef,
    ) -> Result<OperatorRef> {
        let op = SelectHKeyOrdered::new(input, predicate_type, predicate);
        Ok(self.build(Operator::SelectHKeyOrdered(op)))
    }

    pub fn filter(&self, input: OperatorRef, keep_types: &[RowTypeRef]) -> Result<OperatorRef> {
        if keep_types.is_empty() {
            return Err(Error::invalid_argument("filter without row types"));
        }
        let op = Filter::new(input, keep_types.to_vec());
        Ok(self.build(Operator::Filter(op)))
    }

    /// Project rows of `input_type` to a new type derived from the
    /// expressions' result types
    pub fn project(
        &self,
        input: OperatorRef,
        input_type: RowTypeRef,
        projections: Vec<ExpressionRef>,
    ) -> Result<OperatorRef> {
        let fields = projections.iter().map(|p| p.result_type()).collect();
        let output_type = self.schema.projected_type(fields);
        let op = Project::new(input, input_type, output_type, projections)?;
        Ok(self.build(Operator::Project(op)))
    }

    /// Project rows of `input_type` onto an existing table type
    pub fn project_table(
        &self,
        input: OperatorRef,
        input_type: RowTypeRef,
        table_type: RowTypeRef,
        projections: Vec<ExpressionRef>,
    ) -> Result<OperatorRef> {
        if table_type.table_id().is_none() {
            return Err(Error::invalid_argument(format!(
                "{} is not a table row type",
                table_type
            )));
        }
        let op = Project::new(input, input_type, table_type, projections)?;
        Ok(self.build(Operator::Project(op)))
    }

    pub fn flatten_hkey_ordered(
        &self,
        input: OperatorRef,
        parent_type: RowTypeRef,
        child_type: RowTypeRef,
        join_type: JoinType,
        options: FlattenOptions,
    ) -> Result<OperatorRef> {
        let op = Flatten::new(&self.schema, input, parent_type, child_type, join_type, options)?;
        Ok(self.build(Operator::Flatten(op)))
    }

    /// Combine each `inner_type` row with the `outer_type` row bound at
    /// `binding_position`
    pub fn product_nested(
        &self,
        input: OperatorRef,
        outer_type: RowTypeRef,
        inner_type: RowTypeRef,
        binding_position: usize,
    ) -> Result<OperatorRef> {
        let op = ProductNested::new(&self.schema, input, outer_type, inner_type, binding_position)?;
        Ok(self.build(Operator::ProductNested(op)))
    }

    /// Nested-loop product: `inner` runs once per `outer` row bound at
    /// `binding_position`
    #[allow(clippy::too_many_arguments)]
    pub fn product_nested_loops(
        &self,
        outer: OperatorRef,
        inner: OperatorRef,
        outer_type: RowTypeRef,
        inner_type: RowTypeRef,
        binding_position: usize,
        quantum: usize,
    ) -> Result<OperatorRef> {
        let product = self.product_nested(inner, outer_type, inner_type, binding_position)?;
        self.map_nested_loops(outer, product, binding_position, quantum)
    }

    pub fn limit(
        &self,
        input: OperatorRef,
        skip: LimitBound,
        limit: LimitBound,
    ) -> Result<OperatorRef> {
        let op = Limit::new(input, skip, limit)?;
        Ok(self.build(Operator::Limit(op)))
    }

    pub fn sort_insertion_limited(
        &self,
        input: OperatorRef,
        sort_type: RowTypeRef,
        ordering: RowOrdering,
        option: SortOption,
        limit: i64,
    ) -> Result<OperatorRef> {
        let op = SortInsertionLimited::new(input, sort_type, ordering, option, limit)?;
        Ok(self.build(Operator::SortInsertionLimited(op)))
    }

    pub fn sort_general(
        &self,
        input: OperatorRef,
        sort_type: RowTypeRef,
        ordering: RowOrdering,
        option: SortOption,
    ) -> Result<OperatorRef> {
        let op = SortGeneral::new(input, sort_type, ordering, option)?;
        Ok(self.build(Operator::SortGeneral(op)))
    }

    pub fn distinct_partial(
        &self,
        input: OperatorRef,
        distinct_type: RowTypeRef,
        collators: Option<Vec<Option<CollatorRef>>>,
    ) -> Result<OperatorRef> {
        let op = DistinctPartial::new(input, distinct_type, collators)?;
        Ok(self.build(Operator::DistinctPartial(op)))
    }

    pub fn count(&self, input: OperatorRef, count_type: RowTypeRef) -> Result<OperatorRef> {
        let op = Count::new(&self.schema, input, count_type);
        Ok(self.build(Operator::Count(op)))
    }

    /// A single row holding the stored row count of a table
    pub fn count_table_status(&self, table_type: RowTypeRef) -> Result<OperatorRef> {
        let op = CountTableStatus::new(&self.schema, table_type)?;
        Ok(self.build(Operator::CountTableStatus(op)))
    }

    /// Aggregate runs of rows agreeing on the first `group_by` fields
    pub fn aggregate_partial(
        &self,
        input: OperatorRef,
        input_type: RowTypeRef,
        group_by: i64,
        aggregators: Vec<Aggregator>,
    ) -> Result<OperatorRef> {
        let group_by = non_negative("group-by field count", group_by)?;
        let op = AggregatePartial::new(&self.schema, input, input_type, group_by, aggregators)?;
        Ok(self.build(Operator::AggregatePartial(op)))
    }

    pub fn if_empty(
        &self,
        input: OperatorRef,
        row_type: RowTypeRef,
        expressions: Vec<ExpressionRef>,
        preservation: InputPreservation,
    ) -> Result<OperatorRef> {
        let op = IfEmpty::new(input, row_type, expressions, preservation)?;
        Ok(self.build(Operator::IfEmpty(op)))
    }

    // =========================================================================
    // Merges and nested loops
    // =========================================================================

    pub fn union_all(
        &self,
        left: OperatorRef,
        left_type: RowTypeRef,
        right: OperatorRef,
        right_type: RowTypeRef,
        open_both: bool,
    ) -> Result<OperatorRef> {
        let op = UnionAll::new(&self.schema, left, left_type, right, right_type, open_both)?;
        Ok(self.build(Operator::UnionAll(op)))
    }

    /// Merge two streams ordered on their trailing ordering fields
    #[allow(clippy::too_many_arguments)]
    pub fn union_ordered(
        &self,
        left: OperatorRef,
        right: OperatorRef,
        left_type: RowTypeRef,
        right_type: RowTypeRef,
        left_ordering_fields: i64,
        right_ordering_fields: i64,
        ascending: &[bool],
        output_equal: bool,
    ) -> Result<OperatorRef> {
        let op = UnionOrdered::new(
            left,
            right,
            left_type,
            right_type,
            non_negative("left ordering fields", left_ordering_fields)?,
            non_negative("right ordering fields", right_ordering_fields)?,
            ascending.to_vec(),
            output_equal,
        )?;
        Ok(self.build(Operator::UnionOrdered(op)))
    }

    /// Merge two hKey-ordered streams into distinct hKey rows of
    /// `output_table_type`
    pub fn hkey_union_ordered(
        &self,
        left: OperatorRef,
        right: OperatorRef,
        left_type: RowTypeRef,
        right_type: RowTypeRef,
        output_table_type: &RowTypeRef,
    ) -> Result<OperatorRef> {
        let op = HKeyUnionOrdered::new(
            &self.schema,
            left,
            right,
            left_type,
            right_type,
            output_table_type,
        )?;
        Ok(self.build(Operator::HKeyUnionOrdered(op)))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn intersect_ordered(
        &self,
        left: OperatorRef,
        right: OperatorRef,
        left_type: RowTypeRef,
        right_type: RowTypeRef,
        left_ordering_fields: i64,
        right_ordering_fields: i64,
        ascending: &[bool],
        join_type: JoinType,
        options: IntersectOptions,
    ) -> Result<OperatorRef> {
        let op = IntersectOrdered::new(
            left,
            right,
            left_type,
            right_type,
            non_negative("left ordering fields", left_ordering_fields)?,
            non_negative("right ordering fields", right_ordering_fields)?,
            ascending.to_vec(),
            join_type,
            options,
        )?;
        Ok(self.build(Operator::IntersectOrdered(op)))
    }

    /// Intersection comparing `comparison_fields` ascending fields, with a
    /// single output side option
    #[allow(clippy::too_many_arguments)]
    pub fn intersect_ordered_fields(
        &self,
        left: OperatorRef,
        right: OperatorRef,
        left_type: RowTypeRef,
        right_type: RowTypeRef,
        left_ordering_fields: i64,
        right_ordering_fields: i64,
        comparison_fields: i64,
        join_type: JoinType,
        output: IntersectOption,
    ) -> Result<OperatorRef> {
        let compared = non_negative("comparison fields", comparison_fields)?;
        self.intersect_ordered(
            left,
            right,
            left_type,
            right_type,
            left_ordering_fields,
            right_ordering_fields,
            &vec![true; compared],
            join_type,
            IntersectOptions::of(&[output]),
        )
    }

    /// Build a bloom filter from `filter_input` and bind it at
    /// `binding_position` while `stream_input` runs
    pub fn using_bloom_filter(
        &self,
        filter_input: OperatorRef,
        filter_type: RowTypeRef,
        estimated_row_count: i64,
        binding_position: usize,
        stream_input: OperatorRef,
        collators: Option<Vec<Option<CollatorRef>>>,
    ) -> Result<OperatorRef> {
        let op = UsingBloomFilter::new(
            filter_input,
            filter_type,
            non_negative("estimated row count", estimated_row_count)?,
            binding_position,
            stream_input,
            collators,
        )?;
        Ok(self.build(Operator::UsingBloomFilter(op)))
    }

    pub fn select_bloom_filter(
        &self,
        input: OperatorRef,
        on_positive: OperatorRef,
        fields: Vec<ExpressionRef>,
        collators: Option<Vec<Option<CollatorRef>>>,
        binding_position: usize,
        quantum: usize,
    ) -> Result<OperatorRef> {
        check_quantum(quantum)?;
        let op = SelectBloomFilter::new(
            input,
            on_positive,
            fields,
            collators,
            binding_position,
            quantum,
        )?;
        Ok(self.build(Operator::SelectBloomFilter(op)))
    }

    /// Run `inner` once per `outer` row, with the outer row bound at
    /// `binding_position`
    pub fn map_nested_loops(
        &self,
        outer: OperatorRef,
        inner: OperatorRef,
        binding_position: usize,
        quantum: usize,
    ) -> Result<OperatorRef> {
        check_quantum(quantum)?;
        let op = MapNestedLoops::new(outer, inner, binding_position, quantum);
        Ok(self.build(Operator::MapNestedLoops(op)))
    }

    pub fn emit_bound_row_nested(
        &self,
        input: OperatorRef,
        input_type: RowTypeRef,
        output_type: Option<RowTypeRef>,
        bound_type: RowTypeRef,
        binding_position: usize,
    ) -> Result<OperatorRef> {
        let op = EmitBoundRow::new(input, input_type, output_type, bound_type, binding_position)?;
        Ok(self.build(Operator::EmitBoundRow(op)))
    }

    // =========================================================================
    // Modification
    // =========================================================================

    pub fn insert_returning(&self, input: OperatorRef) -> Result<OperatorRef> {
        Ok(self.build(Operator::InsertReturning(InsertReturning::new(input))))
    }

    pub fn update_returning(
        &self,
        input: OperatorRef,
        update: Arc<dyn UpdateFunction>,
    ) -> Result<OperatorRef> {
        Ok(self.build(Operator::UpdateReturning(UpdateReturning::new(input, update))))
    }

    pub fn delete_returning(&self, input: OperatorRef, cascade: bool) -> Result<OperatorRef> {
        Ok(self.build(Operator::DeleteReturning(DeleteReturning::new(input, cascade))))
    }

    /// Plan inserting every row of `input`
    pub fn insert(&self, input: OperatorRef) -> UpdatePlan {
        UpdatePlan::new(input, DmlAction::Insert)
    }

    /// Plan updating every row of `input` selected by `update`
    pub fn update(&self, input: OperatorRef, update: Arc<dyn UpdateFunction>) -> UpdatePlan {
        UpdatePlan::new(input, DmlAction::Update(update))
    }

    /// Plan deleting every row of `input`
    pub fn delete(&self, input: OperatorRef, cascade: bool) -> UpdatePlan {
        UpdatePlan::new(input, DmlAction::Delete { cascade })
    }
}

fn check_quantum(quantum: usize) -> Result<()> {
    if quantum == 0 {
        return Err(Error::invalid_argument("lookahead quantum must be positive"));
    }
    Ok(())
}

fn non_negative(what: &str, n: i64) -> Result<usize> {
    usize::try_from(n).map_err(|_| Error::invalid_argument(format!("negative {}: {}", what, n)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, SchemaBuilder, TableSpec};

    fn api() -> Api {
        let schema = SchemaBuilder::new()
            .table(
                TableSpec::new("parent")
                    .add_primary_key("pid", DataType::Integer)
                    .add("label", DataType::Text),
            )
            .table(
                TableSpec::new("child")
                    .child_of("parent", &["pid"])
                    .add_primary_key("cid", DataType::Integer)
                    .add("pid", DataType::Integer),
            )
            .build()
            .unwrap();
        Api::new(schema)
    }

    #[test]
    fn test_unknown_group() {
        let api = api();
        assert!(api.group_scan(0).is_ok());
        assert!(api.group_scan(7).is_err());
    }

    #[test]
    fn test_negative_counts() {
        let api = api();
        let parent = api.schema().table_type("parent").unwrap();
        let scan = api.group_scan(0).unwrap();
        assert!(matches!(
            api.aggregate_partial(scan.clone(), parent.clone(), -1, vec![Aggregator::count_star()]),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            api.union_ordered(scan.clone(), scan, parent.clone(), parent, -1, 1, &[true], false),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zero_quantum() {
        let api = api();
        let scan = api.group_scan(0).unwrap();
        assert!(matches!(
            api.map_nested_loops(scan.clone(), scan, 0, 0),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_group_lookup_dispatch() {
        let api = api();
        let parent = api.schema().table_type("parent").unwrap();
        let child = api.schema().table_type("child").unwrap();
        let up = api
            .group_lookup(api.group_scan(0).unwrap(), 0, child.clone(), &[parent.clone()], InputPreservation::KeepInput, 1)
            .unwrap();
        assert_eq!(up.name(), "AncestorLookup_Default");
        let down = api
            .group_lookup(api.group_scan(0).unwrap(), 0, parent, &[child], InputPreservation::KeepInput, 1)
            .unwrap();
        assert_eq!(down.name(), "BranchLookup_Default");
    }

    #[test]
    fn test_config_and_collators() {
        let schema = api().schema().clone();
        let api = Api::with_config(schema.clone(), ExecutorConfig::new().with_lookahead_quantum(4)).unwrap();
        assert_eq!(api.lookahead_quantum(), 4);
        assert!(Api::with_config(schema, ExecutorConfig::new().with_lookahead_quantum(0)).is_err());
        assert_eq!(api.collator("en_ci").unwrap().name(), "en_ci");
        assert!(api.collator("nope").is_err());
    }
}
