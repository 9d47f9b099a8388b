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

//! Query executor
//!
//! Plans are trees of immutable [`Operator`] descriptions built through
//! [`Api`]. Executing a plan creates one [`Cursor`] per operator; rows are
//! pulled from the root and flow upward:
//!
//! ```text
//! GroupScan_Default
//!   ↓
//! Select_HKeyOrdered (predicate on one row type)
//!   ↓
//! Flatten_HKeyOrdered (parent/child join)
//!   ↓
//! Sort_InsertionLimited
//!   ↓
//! QueryCursor (one execution per binding set)
//! ```
//!
//! Correlated subplans read outer rows through [`QueryBindings`], a stack of
//! scoped bindings owned by the driver and threaded through every cursor
//! call.
//!
//! # Components
//!
//! - [`Api`] - operator factory and argument validation
//! - [`Cursor`] / [`CursorBody`] - the open/next/close protocol
//! - [`QueryCursor`] / [`UpdatePlan`] - the execution driver
//! - [`operators`] - one module per operator family

pub mod api;
pub mod bindings;
pub mod config;
pub mod context;
pub mod cursor;
pub mod driver;
pub mod operators;
pub mod ordering;
pub mod plan;
pub mod utils;

pub use api::Api;
pub use bindings::{
    Binding, MultipleBindingsCursor, QueryBindings, QueryBindingsCursor, SingletonBindingsCursor,
};
pub use config::{ExecutorConfig, DEFAULT_BLOOM_FPP, DEFAULT_LOOKAHEAD_QUANTUM};
pub use context::{CancellationHandle, QueryContext};
pub use cursor::{collect, managed, Cursor, CursorBody, CursorState, ManagedCursor};
pub use driver::{QueryCursor, UpdatePlan, UpdateResult};
pub use operators::{
    AggregateFunction, Aggregator, DmlAction, IndexBound, IndexKeyRange, IndexOrdering,
    LimitBound,
};
pub use ordering::{RowOrdering, SortKey};
pub use plan::{Operator, OperatorRef, PlanNode};
