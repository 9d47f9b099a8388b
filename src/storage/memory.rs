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

//! In-memory group store
//!
//! Each group is a `BTreeMap<HKey, Row>`, so iteration order is hKey order
//! and a subtree is a contiguous key range. Index entries are computed on
//! demand from the group rows.
//!
//! Every stream handed out carries a request guard; the store counts
//! outstanding requests so callers can verify that closing a cursor
//! released everything it prefetched.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::core::{
    Error, GroupId, HKey, IndexDef, Result, Row, Schema, TableDef, TableId, Value,
};

use super::request::IndexScanRequest;
use super::traits::{GroupStore, RowStream};

#[derive(Debug, Default)]
struct StoreInner {
    groups: FxHashMap<GroupId, BTreeMap<HKey, Row>>,
    /// Primary key values to hKey, per table
    primary_keys: FxHashMap<TableId, FxHashMap<Vec<Value>, HKey>>,
}

/// Store backed by in-memory B-trees
pub struct MemoryStore {
    schema: Arc<Schema>,
    inner: RwLock<StoreInner>,
    outstanding: Arc<AtomicUsize>,
    requests: AtomicU64,
}

impl MemoryStore {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            inner: RwLock::new(StoreInner::default()),
            outstanding: Arc::new(AtomicUsize::new(0)),
            requests: AtomicU64::new(0),
        }
    }

    /// Streams handed out and not yet dropped
    pub fn outstanding_requests(&self) -> usize {
        self.outstanding.load(AtomicOrdering::SeqCst)
    }

    /// Total streams handed out
    pub fn requests_issued(&self) -> u64 {
        self.requests.load(AtomicOrdering::SeqCst)
    }

    /// Insert a row given table name and values
    pub fn insert(&self, table: &str, values: Vec<Value>) -> Result<Row> {
        let table = self.schema.table_by_name(table)?;
        if values.len() != table.columns.len() {
            return Err(Error::invalid_argument(format!(
                "row for '{}' has {} fields, expected {}",
                table.name,
                values.len(),
                table.columns.len()
            )));
        }
        self.insert_row(&Row::new(Arc::clone(&table.row_type), values))
    }

    fn stream(&self, rows: Vec<Row>) -> Box<dyn RowStream> {
        self.requests.fetch_add(1, AtomicOrdering::SeqCst);
        self.outstanding.fetch_add(1, AtomicOrdering::SeqCst);
        Box::new(MemoryRowStream {
            rows: rows.into_iter(),
            outstanding: Arc::clone(&self.outstanding),
        })
    }

    fn table_of(&self, row: &Row) -> Result<&TableDef> {
        let table = row.row_type().table_id().ok_or_else(|| {
            Error::invalid_argument(format!("{} is not a table row type", row.row_type()))
        })?;
        let def = self.schema.table(table)?;
        if row.len() != def.columns.len() {
            return Err(Error::invalid_argument(format!(
                "row for '{}' has {} fields, expected {}",
                def.name,
                row.len(),
                def.columns.len()
            )));
        }
        Ok(def)
    }

    fn primary_key(table: &TableDef, values: &[Value]) -> Vec<Value> {
        table.primary_key.iter().map(|i| values[*i].clone()).collect()
    }

    /// hKey of a table row. Rows whose parent is not stored get NULL
    /// segments for the unknown ancestors.
    fn compute_hkey(&self, inner: &StoreInner, table: &TableDef, values: &[Value]) -> Result<HKey> {
        let pk = Self::primary_key(table, values);
        let parent = match table.parent {
            Some(parent) => self.schema.table(parent)?,
            None => return Ok(HKey::root(table.ordinal, pk)),
        };
        let parent_pk: Vec<Value> = table.parent_join.iter().map(|i| values[*i].clone()).collect();
        let parent_hkey = match inner
            .primary_keys
            .get(&parent.id)
            .and_then(|keys| keys.get(&parent_pk))
        {
            Some(hkey) => hkey.clone(),
            None => self.orphan_hkey(parent, parent_pk)?,
        };
        Ok(parent_hkey.extend(table.ordinal, pk))
    }

    fn orphan_hkey(&self, table: &TableDef, pk: Vec<Value>) -> Result<HKey> {
        let mut hkey = HKey::new();
        for ancestor in self.schema.path(table.id)? {
            if ancestor == table.id {
                break;
            }
            let def = self.schema.table(ancestor)?;
            let nulls = def
                .primary_key
                .iter()
                .map(|i| Value::null(def.columns[*i].data_type));
            hkey.push(def.ordinal, nulls);
        }
        hkey.push(table.ordinal, pk);
        Ok(hkey)
    }

    fn located_hkey(&self, inner: &StoreInner, row: &Row, table: &TableDef) -> Result<HKey> {
        match row.hkey() {
            Some(hkey) => Ok(hkey.clone()),
            None => self.compute_hkey(inner, table, row.values()),
        }
    }

    fn insert_locked(&self, inner: &mut StoreInner, table: &TableDef, row: &Row) -> Result<Row> {
        let hkey = self.compute_hkey(inner, table, row.values())?;
        let rows = inner.groups.entry(table.group).or_default();
        if rows.contains_key(&hkey) {
            return Err(Error::DuplicateKey(hkey.to_string()));
        }
        let stored = Row::with_hkey(
            Arc::clone(&table.row_type),
            row.values().to_vec(),
            hkey.clone(),
        );
        rows.insert(hkey.clone(), stored.clone());
        inner
            .primary_keys
            .entry(table.id)
            .or_default()
            .insert(Self::primary_key(table, row.values()), hkey);
        Ok(stored)
    }

    fn remove_locked(&self, inner: &mut StoreInner, table: &TableDef, hkey: &HKey) -> Result<Row> {
        let removed = inner
            .groups
            .get_mut(&table.group)
            .and_then(|rows| rows.remove(hkey))
            .ok_or_else(|| Error::RowNotFound(hkey.to_string()))?;
        self.forget_key(inner, &removed)?;
        Ok(removed)
    }

    fn forget_key(&self, inner: &mut StoreInner, row: &Row) -> Result<()> {
        if let Some(table) = row.row_type().table_id() {
            let def = self.schema.table(table)?;
            if let Some(keys) = inner.primary_keys.get_mut(&table) {
                keys.remove(&Self::primary_key(def, row.values()));
            }
        }
        Ok(())
    }

    /// Rows at `hkey` and, with `deep`, below it
    fn subtree(rows: &BTreeMap<HKey, Row>, hkey: &HKey, deep: bool) -> Vec<Row> {
        rows.range((Bound::Included(hkey), Bound::Unbounded))
            .take_while(|(k, _)| if deep { hkey.is_prefix_of(k) } else { *k == hkey })
            .map(|(_, r)| r.clone())
            .collect()
    }

    /// Index entries of `index`, with the presence mask of each entry
    fn index_entries(&self, rows: &BTreeMap<HKey, Row>, index: &IndexDef) -> Result<Vec<(Vec<Value>, u64, HKey)>> {
        let leaf_level = index.path.len() - 1;
        let mut entries = Vec::new();

        for (hkey, row) in rows {
            let table = match row.row_type().table_id() {
                Some(t) => t,
                None => continue,
            };
            let level = match index.level_of(table) {
                Some(l) => l,
                None => continue,
            };

            // Non-leaf rows only produce an entry when nothing below them does
            if level < leaf_level {
                let child = self.schema.table(index.path[level + 1])?;
                let has_child = rows
                    .range((Bound::Excluded(hkey), Bound::Unbounded))
                    .take_while(|(k, _)| hkey.is_prefix_of(k))
                    .any(|(k, _)| k.len() == hkey.len() + 1 && k.leaf_ordinal() == Some(child.ordinal));
                if has_child {
                    continue;
                }
            }

            // Ancestor rows along the index path, by truncated hKey
            let mut present = 0u64;
            let mut level_rows: Vec<Option<&Row>> = vec![None; index.path.len()];
            for (l, path_table) in index.path.iter().enumerate().take(level + 1) {
                let def = self.schema.table(*path_table)?;
                let ancestor_key = hkey.truncate(def.depth + 1);
                let found = if l == level {
                    Some(row)
                } else {
                    rows.get(&ancestor_key).filter(|r| r.row_type().table_id() == Some(def.id))
                };
                if let Some(r) = found {
                    present |= 1 << l;
                    level_rows[l] = Some(r);
                }
            }

            let key = index
                .columns
                .iter()
                .map(|column| {
                    let l = index.level_of(column.table).unwrap_or(0);
                    match level_rows[l] {
                        Some(r) => r[column.column].clone(),
                        None => Value::null(column.data_type),
                    }
                })
                .collect();
            entries.push((key, present, hkey.clone()));
        }
        Ok(entries)
    }
}

impl GroupStore for MemoryStore {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn scan_group(&self, group: GroupId) -> Result<Box<dyn RowStream>> {
        self.schema.group(group)?;
        let inner = self.inner.read();
        let rows = inner
            .groups
            .get(&group)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default();
        Ok(self.stream(rows))
    }

    fn scan_hkey(&self, group: GroupId, hkey: &HKey, deep: bool) -> Result<Box<dyn RowStream>> {
        self.schema.group(group)?;
        let inner = self.inner.read();
        let rows = inner
            .groups
            .get(&group)
            .map(|rows| Self::subtree(rows, hkey, deep))
            .unwrap_or_default();
        Ok(self.stream(rows))
    }

    fn scan_index(&self, request: &IndexScanRequest) -> Result<Box<dyn RowStream>> {
        let index = self.schema.index(request.index)?;
        let inner = self.inner.read();
        let mut entries = match inner.groups.get(&index.group) {
            Some(rows) => self.index_entries(rows, index)?,
            None => Vec::new(),
        };
        drop(inner);

        entries.retain(|(key, present, _)| {
            request.selector.matches(*present) && request.range.contains(key, &request.collators)
        });

        // Ties break on hKey in the direction of the last ordering column,
        // so flipping every direction yields the exact reverse sequence
        let hkey_ascending = request.is_ascending(index.columns.len().saturating_sub(1));
        entries.sort_by(|(ka, _, ha), (kb, _, hb)| {
            request.compare_keys(ka, kb).then_with(|| {
                if hkey_ascending {
                    ha.cmp(hb)
                } else {
                    hb.cmp(ha)
                }
            })
        });

        let rows = entries
            .into_iter()
            .map(|(key, _, hkey)| Row::with_hkey(Arc::clone(&index.row_type), key, hkey))
            .collect();
        Ok(self.stream(rows))
    }

    fn row_count(&self, table: TableId) -> Result<u64> {
        self.schema.table(table)?;
        let inner = self.inner.read();
        Ok(inner
            .primary_keys
            .get(&table)
            .map(|keys| keys.len() as u64)
            .unwrap_or(0))
    }

    fn insert_row(&self, row: &Row) -> Result<Row> {
        let table = self.table_of(row)?;
        let mut inner = self.inner.write();
        let stored = self.insert_locked(&mut inner, table, row)?;
        log::trace!("insert {} at {}", stored, stored.require_hkey()?);
        Ok(stored)
    }

    fn update_row(&self, old: &Row, new: &Row) -> Result<Row> {
        let table = self.table_of(old)?;
        let new_table = self.table_of(new)?;
        if table.id != new_table.id {
            return Err(Error::row_type_mismatch(&table.name, &new_table.name));
        }
        let mut inner = self.inner.write();
        let hkey = self.located_hkey(&inner, old, table)?;
        let removed = self.remove_locked(&mut inner, table, &hkey)?;
        match self.insert_locked(&mut inner, table, new) {
            Ok(stored) => Ok(stored),
            Err(e) => {
                // put the original back
                inner
                    .groups
                    .entry(table.group)
                    .or_default()
                    .insert(hkey.clone(), removed.clone());
                inner
                    .primary_keys
                    .entry(table.id)
                    .or_default()
                    .insert(Self::primary_key(table, removed.values()), hkey);
                Err(e)
            }
        }
    }

    fn delete_row(&self, row: &Row, cascade: bool) -> Result<()> {
        let table = self.table_of(row)?;
        let mut inner = self.inner.write();
        let hkey = self.located_hkey(&inner, row, table)?;
        self.remove_locked(&mut inner, table, &hkey)?;

        if cascade {
            let descendants: Vec<HKey> = inner
                .groups
                .get(&table.group)
                .map(|rows| {
                    rows.range((Bound::Excluded(&hkey), Bound::Unbounded))
                        .take_while(|(k, _)| hkey.is_prefix_of(k))
                        .map(|(k, _)| k.clone())
                        .collect()
                })
                .unwrap_or_default();
            for key in descendants {
                if let Some(removed) = inner.groups.get_mut(&table.group).and_then(|r| r.remove(&key)) {
                    self.forget_key(&mut inner, &removed)?;
                }
            }
        }
        Ok(())
    }
}

/// Stream over a snapshot of rows; decrements the outstanding count on drop
struct MemoryRowStream {
    rows: std::vec::IntoIter<Row>,
    outstanding: Arc<AtomicUsize>,
}

impl RowStream for MemoryRowStream {
    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.next())
    }
}

impl Drop for MemoryRowStream {
    fn drop(&mut self) {
        self.outstanding.fetch_sub(1, AtomicOrdering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, IndexSpec, SchemaBuilder, TableSpec};
    use crate::storage::request::{IndexScanSelector, KeyRange};

    fn store() -> MemoryStore {
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
                    .add("cid", DataType::Integer),
            )
            .index(
                IndexSpec::new("name_oid")
                    .column("customer", "name")
                    .column("order", "oid"),
            )
            .build()
            .unwrap();
        let store = MemoryStore::new(schema);
        store.insert("customer", vec![Value::integer(2), Value::text("b")]).unwrap();
        store.insert("customer", vec![Value::integer(1), Value::text("a")]).unwrap();
        store.insert("order", vec![Value::integer(10), Value::integer(1)]).unwrap();
        store.insert("order", vec![Value::integer(11), Value::integer(1)]).unwrap();
        store.insert("order", vec![Value::integer(30), Value::integer(3)]).unwrap();
        store
    }

    fn drain(mut stream: Box<dyn RowStream>) -> Vec<Row> {
        let mut rows = Vec::new();
        while let Some(row) = stream.next_row().unwrap() {
            rows.push(row);
        }
        rows
    }

    #[test]
    fn test_group_scan_in_hkey_order() {
        let store = store();
        let rows = drain(store.scan_group(0).unwrap());
        // orphan order 30 sits under the missing customer 3
        let keys: Vec<i64> = rows.iter().map(|r| r[0].as_int64().unwrap()).collect();
        assert_eq!(keys, vec![1, 10, 11, 2, 30]);
        assert_eq!(store.outstanding_requests(), 0);
        assert_eq!(store.requests_issued(), 1);
    }

    #[test]
    fn test_orphan_is_adopted_by_later_parent() {
        let store = store();
        store.insert("customer", vec![Value::integer(3), Value::text("c")]).unwrap();
        let rows = drain(store.scan_group(0).unwrap());
        let keys: Vec<i64> = rows.iter().map(|r| r[0].as_int64().unwrap()).collect();
        assert_eq!(keys, vec![1, 10, 11, 2, 3, 30]);

        let c3 = HKey::root(1, [Value::integer(3)]);
        let subtree = drain(store.scan_hkey(0, &c3, true).unwrap());
        assert_eq!(subtree.len(), 2);
        assert_eq!(subtree[1][0], Value::integer(30));
    }

    #[test]
    fn test_subtree_and_cascade_delete() {
        let store = store();
        let c1 = HKey::root(1, [Value::integer(1)]);
        assert_eq!(drain(store.scan_hkey(0, &c1, true).unwrap()).len(), 3);
        assert_eq!(drain(store.scan_hkey(0, &c1, false).unwrap()).len(), 1);

        let customer = store.schema().table_type("customer").unwrap();
        let row = Row::new(customer, vec![Value::integer(1), Value::text("a")]);
        store.delete_row(&row, true).unwrap();
        assert_eq!(drain(store.scan_group(0).unwrap()).len(), 2);
        let order = store.schema().table_by_name("order").unwrap().id;
        assert_eq!(store.row_count(order).unwrap(), 1);
    }

    #[test]
    fn test_duplicate_and_missing_rows() {
        let store = store();
        let err = store
            .insert("customer", vec![Value::integer(1), Value::text("x")])
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(_)));

        let customer = store.schema().table_type("customer").unwrap();
        let ghost = Row::new(customer, vec![Value::integer(9), Value::text("z")]);
        assert!(matches!(store.delete_row(&ghost, false), Err(Error::RowNotFound(_))));
    }

    #[test]
    fn test_group_index_selectors() {
        let store = store();
        let index = store.schema().index_by_name("name_oid").unwrap().clone();
        let customer = store.schema().table_by_name("customer").unwrap().id;
        let order = store.schema().table_by_name("order").unwrap().id;

        let scan = |selector: IndexScanSelector| {
            drain(
                store
                    .scan_index(&IndexScanRequest {
                        index: index.id,
                        range: KeyRange::unbounded(),
                        ascending: vec![true, true],
                        collators: vec![],
                        selector,
                    })
                    .unwrap(),
            )
        };

        // inner: both levels present
        assert_eq!(scan(IndexScanSelector::inner(&index)).len(), 2);
        // customer 2 has no orders
        let left = scan(IndexScanSelector::left_join_after(&index, customer).unwrap());
        assert_eq!(left.len(), 3);
        assert!(left[2][1].is_null());
        // order 30 has no customer
        let right = scan(IndexScanSelector::right_join_until(&index, order).unwrap());
        assert_eq!(right.len(), 3);
        assert!(right[0][0].is_null());
    }
}
