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

//! Core types and definitions for groupflow
//!
//! - [`DataType`], [`CompareOp`] and the operator option enums
//! - [`Value`] - runtime values with a total order
//! - [`HKey`] - hierarchical keys locating rows within a group
//! - [`Row`] and [`RowType`] - typed rows and their descriptors
//! - [`Schema`] - groups, tables and indexes
//! - [`Collator`] - text comparison semantics
//! - [`Error`] - error types for plan construction and execution

pub mod collation;
pub mod error;
pub mod hkey;
pub mod row;
pub mod schema;
pub mod types;
pub mod value;

pub use collation::{
    compare_collated, BinaryCollator, CaseInsensitiveCollator, Collator, CollatorRef,
    CollatorRegistry,
};
pub use error::{Error, Result};
pub use hkey::{HKey, HKeySegment};
pub use row::Row;
pub use schema::{
    GroupDef, GroupId, IndexColumn, IndexDef, IndexId, IndexSpec, RowType, RowTypeKind,
    RowTypeRef, Schema, SchemaBuilder, SchemaColumn, TableDef, TableId, TableSpec,
};
pub use types::{
    CompareOp, DataType, FlattenOption, FlattenOptions, InputPreservation, IntersectOption,
    IntersectOptions, JoinType, OptionFlag, OptionSet, SortOption,
};
pub use value::Value;
