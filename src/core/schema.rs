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

//! Schema metadata: groups, tables, indexes and row types
//!
//! A group is a root table plus all of its descendant tables, stored
//! together in hKey order. Tables know their parent, depth and ordinal
//! within the group. Indexes are either table indexes (all columns on one
//! table) or group indexes whose columns lie along one root-to-leaf path.
//!
//! Every row carries a [`RowType`]. Table and index types are created when
//! the schema is built; operators derive further types (flattened, product,
//! projected, ...) through the `*_type` constructors, which hand out ids from
//! a shared counter.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::error::{Error, Result};
use super::types::DataType;

pub type TableId = u32;
pub type IndexId = u32;
pub type GroupId = u32;
pub type RowTypeRef = Arc<RowType>;

// =============================================================================
// Row types
// =============================================================================

/// What a row type describes
#[derive(Debug, Clone)]
pub enum RowTypeKind {
    /// Rows of a user table
    Table {
        table: TableId,
        name: String,
        ordinal: u32,
        /// Tables from the group root down to this table
        path: Vec<TableId>,
    },
    /// Index entries
    Index {
        index: IndexId,
        name: String,
        /// Tables from the group root down to the index's leaf table
        path: Vec<TableId>,
    },
    /// Parent fields followed by child fields
    Flattened { parent: RowTypeRef, child: RowTypeRef },
    /// Outer fields followed by inner fields
    Product { left: RowTypeRef, right: RowTypeRef },
    /// Rows carrying only an hKey of a table
    HKey { table: TableId, path: Vec<TableId> },
    /// Common type of two union inputs
    Union { left: RowTypeRef, right: RowTypeRef },
    Projected,
    Values,
    Count,
    Aggregated,
}

/// Schema descriptor of a row
#[derive(Debug)]
pub struct RowType {
    id: u32,
    kind: RowTypeKind,
    fields: Vec<DataType>,
}

impl RowType {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn kind(&self) -> &RowTypeKind {
        &self.kind
    }

    pub fn fields(&self) -> &[DataType] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn field_type(&self, index: usize) -> Option<DataType> {
        self.fields.get(index).copied()
    }

    /// Tables from the group root to the table this type's hKeys belong to.
    ///
    /// Flattened types use the child's path, products the inner side's.
    pub fn table_path(&self) -> Option<&[TableId]> {
        match &self.kind {
            RowTypeKind::Table { path, .. }
            | RowTypeKind::Index { path, .. }
            | RowTypeKind::HKey { path, .. } => Some(path.as_slice()),
            RowTypeKind::Flattened { child, .. } => child.table_path(),
            RowTypeKind::Product { right, .. } => right.table_path(),
            _ => None,
        }
    }

    /// Table of a plain table row type
    pub fn table_id(&self) -> Option<TableId> {
        match &self.kind {
            RowTypeKind::Table { table, .. } => Some(*table),
            _ => None,
        }
    }

    /// Depth of the hKey table (root = 0)
    pub fn table_depth(&self) -> Option<usize> {
        self.table_path().map(|p| p.len() - 1)
    }

    /// Number of hKey segments rows of this type carry
    pub fn hkey_len(&self) -> Option<usize> {
        self.table_path().map(|p| p.len())
    }

    /// Strict ancestor relation over table paths
    pub fn is_ancestor_of(&self, other: &RowType) -> bool {
        match (self.table_path(), other.table_path()) {
            (Some(a), Some(b)) => a.len() < b.len() && b.starts_with(a),
            _ => false,
        }
    }

    /// Direct parent relation over table paths
    pub fn is_parent_of(&self, other: &RowType) -> bool {
        match (self.table_path(), other.table_path()) {
            (Some(a), Some(b)) => a.len() + 1 == b.len() && b.starts_with(a),
            _ => false,
        }
    }

    /// True if `other` is a component (parent/child or left/right side) of
    /// this flattened or product type.
    pub fn contains_component(&self, other: &RowType) -> bool {
        match &self.kind {
            RowTypeKind::Flattened { parent, child } => {
                parent.id == other.id
                    || child.id == other.id
                    || parent.contains_component(other)
                    || child.contains_component(other)
            }
            RowTypeKind::Product { left, right } => {
                left.id == other.id
                    || right.id == other.id
                    || left.contains_component(other)
                    || right.contains_component(other)
            }
            _ => false,
        }
    }

    /// Display name
    pub fn name(&self) -> String {
        match &self.kind {
            RowTypeKind::Table { name, .. } => name.clone(),
            RowTypeKind::Index { name, .. } => format!("index({})", name),
            RowTypeKind::Flattened { parent, child } => {
                format!("flatten({}, {})", parent.name(), child.name())
            }
            RowTypeKind::Product { left, right } => {
                format!("product({}, {})", left.name(), right.name())
            }
            RowTypeKind::HKey { table, .. } => format!("hkey({})", table),
            RowTypeKind::Union { left, right } => {
                format!("union({}, {})", left.name(), right.name())
            }
            RowTypeKind::Projected => format!("project#{}", self.id),
            RowTypeKind::Values => format!("values#{}", self.id),
            RowTypeKind::Count => format!("count#{}", self.id),
            RowTypeKind::Aggregated => format!("aggregate#{}", self.id),
        }
    }
}

impl PartialEq for RowType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for RowType {}

impl fmt::Display for RowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// =============================================================================
// Definitions
// =============================================================================

/// Column definition
#[derive(Debug, Clone)]
pub struct SchemaColumn {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

/// A table within a group
#[derive(Debug, Clone)]
pub struct TableDef {
    pub id: TableId,
    pub name: String,
    pub group: GroupId,
    pub parent: Option<TableId>,
    /// Distance from the group root (root = 0)
    pub depth: usize,
    /// Ordinal used in hKey segments, unique within the group
    pub ordinal: u32,
    pub columns: Vec<SchemaColumn>,
    /// Primary key column positions
    pub primary_key: Vec<usize>,
    /// Columns referencing the parent's primary key, in parent key order
    pub parent_join: Vec<usize>,
    pub row_type: RowTypeRef,
}

impl TableDef {
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| Error::ColumnNotFound(format!("{}.{}", self.name, name)))
    }
}

/// A column of an index
#[derive(Debug, Clone)]
pub struct IndexColumn {
    pub table: TableId,
    pub column: usize,
    pub data_type: DataType,
}

/// A table index or group index
#[derive(Debug, Clone)]
pub struct IndexDef {
    pub id: IndexId,
    pub name: String,
    pub group: GroupId,
    /// Shallowest table contributing a column
    pub root_table: TableId,
    /// Deepest table contributing a column
    pub leaf_table: TableId,
    /// Tables from `root_table` down to `leaf_table`
    pub path: Vec<TableId>,
    pub columns: Vec<IndexColumn>,
    pub row_type: RowTypeRef,
}

impl IndexDef {
    pub fn is_group_index(&self) -> bool {
        self.root_table != self.leaf_table
    }

    /// Position of `table` within the index path
    pub fn level_of(&self, table: TableId) -> Option<usize> {
        self.path.iter().position(|t| *t == table)
    }
}

/// A clustered group
#[derive(Debug, Clone)]
pub struct GroupDef {
    pub id: GroupId,
    pub name: String,
    pub root: TableId,
    /// All tables of the group in declaration order
    pub tables: Vec<TableId>,
}

/// Schema of all groups
#[derive(Debug)]
pub struct Schema {
    tables: Vec<TableDef>,
    indexes: Vec<IndexDef>,
    groups: Vec<GroupDef>,
    table_names: FxHashMap<String, TableId>,
    index_names: FxHashMap<String, IndexId>,
    next_type_id: AtomicU32,
}

impl Schema {
    pub fn table(&self, id: TableId) -> Result<&TableDef> {
        self.tables
            .get(id as usize)
            .ok_or_else(|| Error::TableNotFound(format!("#{}", id)))
    }

    pub fn table_by_name(&self, name: &str) -> Result<&TableDef> {
        self.table_names
            .get(name)
            .and_then(|id| self.tables.get(*id as usize))
            .ok_or_else(|| Error::TableNotFound(name.to_string()))
    }

    pub fn index(&self, id: IndexId) -> Result<&IndexDef> {
        self.indexes
            .get(id as usize)
            .ok_or_else(|| Error::IndexNotFound(format!("#{}", id)))
    }

    pub fn index_by_name(&self, name: &str) -> Result<&IndexDef> {
        self.index_names
            .get(name)
            .and_then(|id| self.indexes.get(*id as usize))
            .ok_or_else(|| Error::IndexNotFound(name.to_string()))
    }

    pub fn group(&self, id: GroupId) -> Result<&GroupDef> {
        self.groups
            .get(id as usize)
            .ok_or_else(|| Error::GroupNotFound(format!("#{}", id)))
    }

    pub fn tables(&self) -> &[TableDef] {
        &self.tables
    }

    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    pub fn groups(&self) -> &[GroupDef] {
        &self.groups
    }

    /// Row type of a table
    pub fn table_type(&self, name: &str) -> Result<RowTypeRef> {
        Ok(Arc::clone(&self.table_by_name(name)?.row_type))
    }

    /// Row type of an index
    pub fn index_type(&self, name: &str) -> Result<RowTypeRef> {
        Ok(Arc::clone(&self.index_by_name(name)?.row_type))
    }

    /// Tables from the group root down to `table`
    pub fn path(&self, table: TableId) -> Result<Vec<TableId>> {
        let mut path = Vec::new();
        let mut current = Some(table);
        while let Some(id) = current {
            path.push(id);
            current = self.table(id)?.parent;
        }
        path.reverse();
        Ok(path)
    }

    pub fn children(&self, table: TableId) -> Vec<TableId> {
        self.tables
            .iter()
            .filter(|t| t.parent == Some(table))
            .map(|t| t.id)
            .collect()
    }

    /// `table` and all of its descendants
    pub fn subtree(&self, table: TableId) -> Vec<TableId> {
        let mut out = vec![table];
        let mut i = 0;
        while i < out.len() {
            out.extend(self.children(out[i]));
            i += 1;
        }
        out
    }

    /// Deepest table that is an ancestor-or-self of both tables
    pub fn common_ancestor(&self, a: TableId, b: TableId) -> Result<Option<TableId>> {
        let pa = self.path(a)?;
        let pb = self.path(b)?;
        Ok(pa
            .iter()
            .zip(pb.iter())
            .take_while(|(x, y)| x == y)
            .last()
            .map(|(x, _)| *x))
    }

    // =========================================================================
    // Derived row types
    // =========================================================================

    fn derive(&self, kind: RowTypeKind, fields: Vec<DataType>) -> RowTypeRef {
        let id = self.next_type_id.fetch_add(1, AtomicOrdering::Relaxed);
        Arc::new(RowType { id, kind, fields })
    }

    pub fn flattened_type(&self, parent: &RowTypeRef, child: &RowTypeRef) -> RowTypeRef {
        let fields = parent.fields().iter().chain(child.fields()).copied().collect();
        self.derive(
            RowTypeKind::Flattened {
                parent: Arc::clone(parent),
                child: Arc::clone(child),
            },
            fields,
        )
    }

    pub fn product_type(&self, left: &RowTypeRef, right: &RowTypeRef) -> RowTypeRef {
        let fields = left.fields().iter().chain(right.fields()).copied().collect();
        self.derive(
            RowTypeKind::Product {
                left: Arc::clone(left),
                right: Arc::clone(right),
            },
            fields,
        )
    }

    /// Common type of two union inputs; mismatched fields become NULL-typed
    pub fn union_type(&self, left: &RowTypeRef, right: &RowTypeRef) -> RowTypeRef {
        let fields = left
            .fields()
            .iter()
            .zip(right.fields())
            .map(|(l, r)| if l == r { *l } else { DataType::Null })
            .collect();
        self.derive(
            RowTypeKind::Union {
                left: Arc::clone(left),
                right: Arc::clone(right),
            },
            fields,
        )
    }

    pub fn hkey_type(&self, table: TableId) -> Result<RowTypeRef> {
        let path = self.path(table)?;
        Ok(self.derive(RowTypeKind::HKey { table, path }, Vec::new()))
    }

    pub fn projected_type(&self, fields: Vec<DataType>) -> RowTypeRef {
        self.derive(RowTypeKind::Projected, fields)
    }

    pub fn values_type(&self, fields: Vec<DataType>) -> RowTypeRef {
        self.derive(RowTypeKind::Values, fields)
    }

    pub fn count_type(&self) -> RowTypeRef {
        self.derive(RowTypeKind::Count, vec![DataType::Integer])
    }

    pub fn aggregated_type(&self, fields: Vec<DataType>) -> RowTypeRef {
        self.derive(RowTypeKind::Aggregated, fields)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Declaration of a table for [`SchemaBuilder`]
#[derive(Debug, Clone)]
pub struct TableSpec {
    name: String,
    parent: Option<(String, Vec<String>)>,
    columns: Vec<SchemaColumn>,
    primary_key: Vec<String>,
}

impl TableSpec {
    /// Root table of a new group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            columns: Vec::new(),
            primary_key: Vec::new(),
        }
    }

    /// Make this a child of `parent`, joined through `join_columns`
    /// (listed in the order of the parent's primary key)
    pub fn child_of(mut self, parent: impl Into<String>, join_columns: &[&str]) -> Self {
        self.parent = Some((
            parent.into(),
            join_columns.iter().map(|c| c.to_string()).collect(),
        ));
        self
    }

    fn column(mut self, name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        self.columns.push(SchemaColumn {
            name: name.into(),
            data_type,
            nullable,
        });
        self
    }

    /// Add a non-nullable column
    pub fn add(self, name: impl Into<String>, data_type: DataType) -> Self {
        self.column(name, data_type, false)
    }

    /// Add a nullable column
    pub fn add_nullable(self, name: impl Into<String>, data_type: DataType) -> Self {
        self.column(name, data_type, true)
    }

    /// Add a primary key column
    pub fn add_primary_key(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        let name = name.into();
        self.primary_key.push(name.clone());
        self.column(name, data_type, false)
    }
}

/// Declaration of an index for [`SchemaBuilder`]
#[derive(Debug, Clone)]
pub struct IndexSpec {
    name: String,
    columns: Vec<(String, String)>,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add `table.column` as the next index column
    pub fn column(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.columns.push((table.into(), column.into()));
        self
    }
}

/// Builder for [`Schema`]
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    tables: Vec<TableSpec>,
    indexes: Vec<IndexSpec>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a table; parents must be declared before their children
    pub fn table(mut self, spec: TableSpec) -> Self {
        self.tables.push(spec);
        self
    }

    pub fn index(mut self, spec: IndexSpec) -> Self {
        self.indexes.push(spec);
        self
    }

    pub fn build(self) -> Result<Arc<Schema>> {
        let mut schema = Schema {
            tables: Vec::new(),
            indexes: Vec::new(),
            groups: Vec::new(),
            table_names: FxHashMap::default(),
            index_names: FxHashMap::default(),
            next_type_id: AtomicU32::new(1),
        };

        for spec in self.tables {
            schema.add_table(spec)?;
        }
        for spec in self.indexes {
            schema.add_index(spec)?;
        }
        Ok(Arc::new(schema))
    }
}

impl Schema {
    fn add_table(&mut self, spec: TableSpec) -> Result<()> {
        if self.table_names.contains_key(&spec.name) {
            return Err(Error::invalid_argument(format!(
                "duplicate table '{}'",
                spec.name
            )));
        }
        if spec.primary_key.is_empty() {
            return Err(Error::invalid_argument(format!(
                "table '{}' has no primary key",
                spec.name
            )));
        }

        let id = self.tables.len() as TableId;
        let lookup = |name: &str| {
            spec.columns
                .iter()
                .position(|c| c.name == name)
                .ok_or_else(|| Error::ColumnNotFound(format!("{}.{}", spec.name, name)))
        };
        let primary_key = spec
            .primary_key
            .iter()
            .map(|c| lookup(c))
            .collect::<Result<Vec<_>>>()?;

        let (parent, parent_join, group, depth) = match &spec.parent {
            Some((parent_name, join)) => {
                let parent = self.table_by_name(parent_name)?;
                if join.len() != parent.primary_key.len() {
                    return Err(Error::invalid_argument(format!(
                        "table '{}' joins {} columns to '{}' whose key has {}",
                        spec.name,
                        join.len(),
                        parent.name,
                        parent.primary_key.len()
                    )));
                }
                let join = join.iter().map(|c| lookup(c)).collect::<Result<Vec<_>>>()?;
                (Some(parent.id), join, parent.group, parent.depth + 1)
            }
            None => {
                let group = self.groups.len() as GroupId;
                self.groups.push(GroupDef {
                    id: group,
                    name: spec.name.clone(),
                    root: id,
                    tables: Vec::new(),
                });
                (None, Vec::new(), group, 0)
            }
        };

        let group_def = &mut self.groups[group as usize];
        group_def.tables.push(id);
        let ordinal = group_def.tables.len() as u32;

        let mut path = match parent {
            Some(p) => self.path(p)?,
            None => Vec::new(),
        };
        path.push(id);

        let row_type = self.derive(
            RowTypeKind::Table {
                table: id,
                name: spec.name.clone(),
                ordinal,
                path,
            },
            spec.columns.iter().map(|c| c.data_type).collect(),
        );

        self.table_names.insert(spec.name.clone(), id);
        self.tables.push(TableDef {
            id,
            name: spec.name,
            group,
            parent,
            depth,
            ordinal,
            columns: spec.columns,
            primary_key,
            parent_join,
            row_type,
        });
        Ok(())
    }

    fn add_index(&mut self, spec: IndexSpec) -> Result<()> {
        if spec.columns.is_empty() {
            return Err(Error::invalid_argument(format!(
                "index '{}' has no columns",
                spec.name
            )));
        }
        if self.index_names.contains_key(&spec.name) {
            return Err(Error::invalid_argument(format!(
                "duplicate index '{}'",
                spec.name
            )));
        }

        let mut columns = Vec::with_capacity(spec.columns.len());
        for (table_name, column_name) in &spec.columns {
            let table = self.table_by_name(table_name)?;
            let column = table.column_index(column_name)?;
            columns.push(IndexColumn {
                table: table.id,
                column,
                data_type: table.columns[column].data_type,
            });
        }

        let deepest = |a: &&IndexColumn, b: &&IndexColumn| {
            let da = self.tables[a.table as usize].depth;
            let db = self.tables[b.table as usize].depth;
            da.cmp(&db)
        };
        let leaf_table = columns.iter().max_by(deepest).map(|c| c.table).unwrap_or(0);
        let root_table = columns.iter().min_by(deepest).map(|c| c.table).unwrap_or(0);

        let leaf_path = self.path(leaf_table)?;
        for column in &columns {
            if !leaf_path.contains(&column.table) {
                return Err(Error::invalid_argument(format!(
                    "index '{}' spans more than one branch",
                    spec.name
                )));
            }
        }
        let start = leaf_path
            .iter()
            .position(|t| *t == root_table)
            .unwrap_or(0);
        let path = leaf_path[start..].to_vec();

        let id = self.indexes.len() as IndexId;
        let row_type = self.derive(
            RowTypeKind::Index {
                index: id,
                name: spec.name.clone(),
                path: leaf_path,
            },
            columns.iter().map(|c| c.data_type).collect(),
        );
        let group = self.tables[leaf_table as usize].group;

        self.index_names.insert(spec.name.clone(), id);
        self.indexes.push(IndexDef {
            id,
            name: spec.name,
            group,
            root_table,
            leaf_table,
            path,
            columns,
            row_type,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coi() -> Arc<Schema> {
        SchemaBuilder::new()
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
            .table(
                TableSpec::new("item")
                    .child_of("order", &["oid"])
                    .add_primary_key("iid", DataType::Integer)
                    .add("oid", DataType::Integer),
            )
            .table(
                TableSpec::new("address")
                    .child_of("customer", &["cid"])
                    .add_primary_key("aid", DataType::Integer)
                    .add("cid", DataType::Integer),
            )
            .index(IndexSpec::new("customer_name").column("customer", "name"))
            .index(
                IndexSpec::new("name_iid")
                    .column("customer", "name")
                    .column("item", "iid"),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_group_layout() {
        let schema = coi();
        let customer = schema.table_by_name("customer").unwrap();
        let item = schema.table_by_name("item").unwrap();
        let address = schema.table_by_name("address").unwrap();

        assert_eq!(schema.groups().len(), 1);
        assert_eq!(customer.depth, 0);
        assert_eq!(item.depth, 2);
        assert_eq!(item.ordinal, 3);
        assert_eq!(address.ordinal, 4);
        assert_eq!(schema.path(item.id).unwrap().len(), 3);
        assert_eq!(
            schema.common_ancestor(item.id, address.id).unwrap(),
            Some(customer.id)
        );
        assert_eq!(schema.subtree(customer.id).len(), 4);
    }

    #[test]
    fn test_row_type_relations() {
        let schema = coi();
        let c = schema.table_type("customer").unwrap();
        let o = schema.table_type("order").unwrap();
        let i = schema.table_type("item").unwrap();
        let a = schema.table_type("address").unwrap();

        assert!(c.is_ancestor_of(&i));
        assert!(c.is_parent_of(&o));
        assert!(!c.is_parent_of(&i));
        assert!(!o.is_ancestor_of(&a));

        let co = schema.flattened_type(&c, &o);
        assert_eq!(co.field_count(), 4);
        assert!(co.is_parent_of(&i));
        assert!(co.contains_component(&c));
        assert_ne!(co.id(), c.id());
    }

    #[test]
    fn test_group_index() {
        let schema = coi();
        let index = schema.index_by_name("name_iid").unwrap();
        assert!(index.is_group_index());
        assert_eq!(index.path.len(), 3);
        assert_eq!(index.row_type.table_depth(), Some(2));
        assert!(!schema.index_by_name("customer_name").unwrap().is_group_index());
    }

    #[test]
    fn test_build_errors() {
        let err = SchemaBuilder::new()
            .table(TableSpec::new("t").add("x", DataType::Integer))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = SchemaBuilder::new()
            .table(
                TableSpec::new("child")
                    .child_of("missing", &["p"])
                    .add_primary_key("id", DataType::Integer),
            )
            .build()
            .unwrap_err();
        assert_eq!(err, Error::TableNotFound("missing".to_string()));

        let err = SchemaBuilder::new()
            .table(TableSpec::new("a").add_primary_key("id", DataType::Integer))
            .table(
                TableSpec::new("b")
                    .add_primary_key("id", DataType::Integer)
                    .add("x", DataType::Text),
            )
            .index(IndexSpec::new("bad").column("a", "id").column("b", "x"))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
