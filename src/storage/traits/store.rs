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

//! Group store trait
//!
//! The storage collaborator consumed by scans, lookups, index scans and
//! DML operators. Rows come back in hKey order (index entries in the
//! requested index ordering).

use std::sync::Arc;

use crate::core::{GroupId, HKey, Result, Row, Schema, TableId};

use super::super::request::IndexScanRequest;
use super::stream::RowStream;

pub type StoreRef = Arc<dyn GroupStore>;

/// Hierarchically clustered row storage
pub trait GroupStore: Send + Sync {
    /// Schema the store was created for
    fn schema(&self) -> &Arc<Schema>;

    /// All rows of a group in hKey order
    fn scan_group(&self, group: GroupId) -> Result<Box<dyn RowStream>>;

    /// The row at exactly `hkey`, or with `deep` the row and its whole subtree.
    ///
    /// Used for positional (bound-hKey) scans and for lookups.
    fn scan_hkey(&self, group: GroupId, hkey: &HKey, deep: bool) -> Result<Box<dyn RowStream>>;

    /// Index entries matching the request
    fn scan_index(&self, request: &IndexScanRequest) -> Result<Box<dyn RowStream>>;

    /// Number of rows stored for a table
    fn row_count(&self, table: TableId) -> Result<u64>;

    /// Store a table row, returning it with its hKey
    fn insert_row(&self, row: &Row) -> Result<Row>;

    /// Replace `old` by `new`, returning the stored new row
    fn update_row(&self, old: &Row, new: &Row) -> Result<Row>;

    /// Remove a row, and with `cascade` its descendants
    fn delete_row(&self, row: &Row, cascade: bool) -> Result<()>;
}
