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

//! Operator implementations
//!
//! Each module holds one operator family: the immutable description built
//! by [`Api`](super::Api) and the cursor it creates per execution.
//!
//! # Available Operators
//!
//! ## Sources
//!
//! - [`GroupScan`], [`GroupScanPositional`], [`ValuesScan`], [`IndexScan`]
//! - [`AncestorLookup`], [`BranchLookup`] (pipelined) and their nested forms
//!
//! ## Row Flow
//!
//! - [`SelectHKeyOrdered`], [`Filter`], [`Project`], [`Flatten`], [`ProductNested`]
//! - [`Limit`], [`DistinctPartial`], [`Count`], [`AggregatePartial`], [`IfEmpty`]
//! - [`SortInsertionLimited`], [`SortGeneral`]
//!
//! ## Merges and Nested Loops
//!
//! - [`UnionAll`], [`UnionOrdered`], [`HKeyUnionOrdered`], [`IntersectOrdered`]
//! - [`UsingBloomFilter`], [`SelectBloomFilter`]
//! - [`MapNestedLoops`], [`EmitBoundRow`]
//!
//! ## Modification
//!
//! - [`InsertReturning`], [`UpdateReturning`], [`DeleteReturning`]
//!
//! Operators whose name ends in `HKeyOrdered` expect their input in hKey
//! order and keep it; rows of types they do not target pass through.

pub mod aggregate;
pub mod bloom_filter;
pub mod count;
pub mod distinct;
pub mod dml;
pub mod flatten;
pub mod if_empty;
pub mod index_scan;
pub mod intersect;
pub mod limit;
pub mod lookup;
pub mod lookup_nested;
pub mod map;
pub mod product;
pub mod project;
pub mod scan;
pub mod select;
pub mod sort;
pub mod union;

pub use aggregate::{AggregateFunction, AggregatePartial, Aggregator};
pub use bloom_filter::{SelectBloomFilter, UsingBloomFilter};
pub use count::{Count, CountTableStatus};
pub use distinct::DistinctPartial;
pub use dml::{DeleteReturning, DmlAction, InsertReturning, UpdateReturning};
pub use flatten::Flatten;
pub use if_empty::IfEmpty;
pub use index_scan::{IndexBound, IndexKeyRange, IndexOrdering, IndexScan};
pub use intersect::IntersectOrdered;
pub use limit::{Limit, LimitBound};
pub use lookup::{AncestorLookup, BranchLookup};
pub use lookup_nested::{AncestorLookupNested, BranchLookupNested};
pub use map::{EmitBoundRow, MapNestedLoops};
pub use product::ProductNested;
pub use project::Project;
pub use scan::{GroupScan, GroupScanPositional, ValuesScan};
pub use select::{Filter, SelectHKeyOrdered};
pub use sort::{SortGeneral, SortInsertionLimited};
pub use union::{HKeyUnionOrdered, UnionAll, UnionOrdered};

#[cfg(test)]
pub(crate) mod test_support {
    //! Customer/order/item/address group shared by operator tests

    use std::sync::Arc;

    use crate::core::{DataType, IndexSpec, Row, RowTypeRef, SchemaBuilder, TableSpec, Value};
    use crate::executor::{collect, Api, OperatorRef, QueryBindings, QueryContext};
    use crate::storage::MemoryStore;

    pub struct Fixture {
        pub api: Api,
        pub store: Arc<MemoryStore>,
        pub ctx: QueryContext,
    }

    impl Fixture {
        pub fn new() -> Self {
            let schema = SchemaBuilder::new()
                .table(
                    TableSpec::new("customer")
                        .add_primary_key("cid", DataType::Integer)
                        .add("name", DataType::Text),
                )
                .table(
                    TableSpec::new("order")
                        .child_of("customer", &["cid"])
                        .add_primary_key("oid", DataType::Integer)
                        .add("cid", DataType::Integer)
                        .add("total", DataType::Integer),
                )
                .table(
                    TableSpec::new("item")
                        .child_of("order", &["oid"])
                        .add_primary_key("iid", DataType::Integer)
                        .add("oid", DataType::Integer)
                        .add("sku", DataType::Text),
                )
                .table(
                    TableSpec::new("address")
                        .child_of("customer", &["cid"])
                        .add_primary_key("aid", DataType::Integer)
                        .add("cid", DataType::Integer)
                        .add("city", DataType::Text),
                )
                .index(IndexSpec::new("customer_name").column("customer", "name"))
                .index(
                    IndexSpec::new("name_total")
                        .column("customer", "name")
                        .column("order", "total"),
                )
                .build()
                .unwrap();

            let store = Arc::new(MemoryStore::new(Arc::clone(&schema)));
            let int = Value::integer;
            for (cid, name) in [(1, "alice"), (2, "bob"), (3, "carol")] {
                store.insert("customer", vec![int(cid), Value::text(name)]).unwrap();
            }
            for (oid, cid, total) in [(10, 1, 100), (11, 1, 50), (20, 2, 75)] {
                store.insert("order", vec![int(oid), int(cid), int(total)]).unwrap();
            }
            for (iid, oid, sku) in [(100, 10, "a"), (101, 10, "b"), (110, 11, "c"), (200, 20, "d")] {
                store.insert("item", vec![int(iid), int(oid), Value::text(sku)]).unwrap();
            }
            for (aid, cid, city) in [(1000, 1, "paris"), (3000, 3, "rome")] {
                store.insert("address", vec![int(aid), int(cid), Value::text(city)]).unwrap();
            }

            let ctx = QueryContext::new(store.clone());
            Self {
                api: Api::new(schema),
                store,
                ctx,
            }
        }

        pub fn row_type(&self, table: &str) -> RowTypeRef {
            self.api.schema().table_type(table).unwrap()
        }

        pub fn scan(&self) -> OperatorRef {
            self.api.group_scan(0).unwrap()
        }

        pub fn run(&self, op: &OperatorRef) -> Vec<Row> {
            self.run_with(op, &mut QueryBindings::new())
        }

        pub fn run_with(&self, op: &OperatorRef, bindings: &mut QueryBindings) -> Vec<Row> {
            let mut cursor = op.cursor(&self.ctx).unwrap();
            collect(cursor.as_mut(), bindings).unwrap()
        }
    }

    /// Table name and first field of each row, e.g. `order 10`
    pub fn describe(rows: &[Row]) -> Vec<String> {
        rows.iter()
            .map(|r| format!("{} {}", r.row_type().name(), r[0]))
            .collect()
    }
}
