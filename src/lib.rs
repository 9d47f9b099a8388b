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

//! # Groupflow - operator algebra for hierarchically clustered storage
//!
//! Groupflow is the query execution core of a database that stores rows in
//! table groups: a root table and its descendants clustered together in
//! hierarchical key (hKey) order, so that every customer row is followed by
//! its orders and every order by its items. Plans are trees of immutable
//! operators built through [`Api`]; executing a plan creates pull-based
//! cursors that preserve hKey ordering wherever the plan promises it.
//!
//! ## Key Features
//!
//! - **Group scans and lookups** - ancestor and branch lookups with bounded lookahead
//! - **Hierarchical joins** - hKey-ordered flatten with inner/left/right/full join semantics
//! - **Ordered merges** - union, hKey union and intersection of sorted streams
//! - **Bloom-filter semi-joins** - filter built from one input, probed by another
//! - **Correlated nested loops** - scoped bindings for outer rows
//! - **Index statistics** - bounded one-pass histogram sampling per column prefix
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use groupflow::{Api, DataType, MemoryStore, QueryBindings, QueryContext, QueryCursor};
//! use groupflow::{SchemaBuilder, TableSpec, Value};
//!
//! let schema = SchemaBuilder::new()
//!     .table(
//!         TableSpec::new("customer")
//!             .add_primary_key("cid", DataType::Integer)
//!             .add("name", DataType::Text),
//!     )
//!     .table(
//!         TableSpec::new("order")
//!             .child_of("customer", &["cid"])
//!             .add_primary_key("oid", DataType::Integer)
//!             .add("cid", DataType::Integer),
//!     )
//!     .build()
//!     .unwrap();
//!
//! let store = Arc::new(MemoryStore::new(Arc::clone(&schema)));
//! store.insert("customer", vec![Value::integer(1), Value::text("alice")]).unwrap();
//! store.insert("order", vec![Value::integer(10), Value::integer(1)]).unwrap();
//!
//! let api = Api::new(schema);
//! let orders = api
//!     .filter(api.group_scan(0).unwrap(), &[api.schema().table_type("order").unwrap()])
//!     .unwrap();
//!
//! let ctx = QueryContext::new(store);
//! let rows: Vec<_> = QueryCursor::single(&orders, &ctx, QueryBindings::new())
//!     .unwrap()
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(rows.len(), 1);
//! ```
//!
//! ## Modules
//!
//! - [`core`] - Core types ([`DataType`], [`Value`], [`HKey`], [`Row`], [`Schema`], [`Error`])
//! - [`common`] - Bloom filter and key hashing
//! - [`expression`] - Expressions evaluated by operators
//! - [`executor`] - Cursor protocol, operators, factory and execution driver
//! - [`storage`] - Group store trait and the in-memory store
//! - [`statistics`] - Histogram sampler and index statistics

pub mod common;
pub mod core;
pub mod executor;
pub mod expression;
pub mod statistics;
pub mod storage;

// Re-export main types for convenience
pub use core::{
    Collator, CollatorRef, CollatorRegistry, CompareOp, DataType, Error, FlattenOption,
    FlattenOptions, HKey, IndexSpec, InputPreservation, IntersectOption, IntersectOptions, JoinType,
    Result, Row, RowType, RowTypeRef, Schema, SchemaBuilder, SortOption, TableSpec, Value,
};

// Re-export executor types
pub use executor::{
    collect, Api, Binding, Cursor, CursorState, ExecutorConfig, MultipleBindingsCursor, Operator,
    OperatorRef, QueryBindings, QueryBindingsCursor, QueryContext, QueryCursor, RowOrdering,
    SingletonBindingsCursor, UpdatePlan, UpdateResult,
};

// Re-export expression types
pub use expression::{Expression, ExpressionRef, ExpressionUpdate, UpdateFunction};

// Re-export storage types
pub use storage::{GroupStore, IndexScanSelector, MemoryStore, RowStream, StoreRef};

// Re-export statistics types
pub use statistics::{
    Histogram, HistogramEntry, IndexStatistics, IndexStatisticsGenerator, Sampler, SamplerConfig,
};
