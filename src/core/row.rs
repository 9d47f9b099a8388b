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

//! Row type for groupflow
//!
//! A [`Row`] is an ordered list of values tagged with its [`RowType`] and,
//! for rows that live in (or were derived from) a group, the [`HKey`]
//! locating it.

use std::fmt;
use std::ops::Index;

use super::error::{Error, Result};
use super::hkey::HKey;
use super::schema::{RowType, RowTypeRef};
use super::value::Value;

/// A row flowing between cursors
#[derive(Debug, Clone)]
pub struct Row {
    row_type: RowTypeRef,
    values: Vec<Value>,
    hkey: Option<HKey>,
}

impl Row {
    /// Create a row without an hKey
    pub fn new(row_type: RowTypeRef, values: Vec<Value>) -> Self {
        debug_assert_eq!(
            row_type.field_count(),
            values.len(),
            "row arity does not match {}",
            row_type
        );
        Self {
            row_type,
            values,
            hkey: None,
        }
    }

    /// Create a row located at `hkey`
    pub fn with_hkey(row_type: RowTypeRef, values: Vec<Value>, hkey: HKey) -> Self {
        let mut row = Self::new(row_type, values);
        row.hkey = Some(hkey);
        row
    }

    pub fn row_type(&self) -> &RowTypeRef {
        &self.row_type
    }

    /// True if this row is of exactly `row_type`
    pub fn is_of(&self, row_type: &RowType) -> bool {
        self.row_type.id() == row_type.id()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Field access that reports out-of-range indexes as errors
    pub fn value(&self, index: usize) -> Result<&Value> {
        self.values.get(index).ok_or(Error::FieldOutOfRange {
            index,
            len: self.values.len(),
        })
    }

    pub fn hkey(&self) -> Option<&HKey> {
        self.hkey.as_ref()
    }

    /// hKey of a row that must be located in a group
    pub fn require_hkey(&self) -> Result<&HKey> {
        self.hkey
            .as_ref()
            .ok_or_else(|| Error::MissingHKey(self.row_type.name()))
    }

    pub fn set_hkey(&mut self, hkey: Option<HKey>) {
        self.hkey = hkey;
    }

    /// Same values and hKey under another row type
    pub fn retype(self, row_type: RowTypeRef) -> Row {
        Row {
            row_type,
            values: self.values,
            hkey: self.hkey,
        }
    }

    /// Concatenate two rows into a row of `row_type`, keeping `hkey`
    pub fn combine(row_type: RowTypeRef, left: &[Value], right: &[Value], hkey: Option<HKey>) -> Row {
        let mut values = Vec::with_capacity(left.len() + right.len());
        values.extend_from_slice(left);
        values.extend_from_slice(right);
        Row {
            row_type,
            values,
            hkey,
        }
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.row_type.id() == other.row_type.id()
            && self.values == other.values
            && self.hkey == other.hkey
    }
}

impl Eq for Row {}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.row_type.name())?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{SchemaBuilder, TableSpec};
    use crate::core::types::DataType;
    use std::sync::Arc;

    #[test]
    fn test_row_accessors() {
        let schema = SchemaBuilder::new()
            .table(
                TableSpec::new("customer")
                    .add_primary_key("cid", DataType::Integer)
                    .add("name", DataType::Text),
            )
            .build()
            .unwrap();
        let rt = schema.table_type("customer").unwrap();
        let hkey = HKey::root(1, [Value::integer(1)]);
        let row = Row::with_hkey(
            Arc::clone(&rt),
            vec![Value::integer(1), Value::text("Alice")],
            hkey.clone(),
        );

        assert_eq!(row.len(), 2);
        assert_eq!(row[1], Value::text("Alice"));
        assert_eq!(row.require_hkey().unwrap(), &hkey);
        assert!(row.is_of(&rt));
        assert!(matches!(
            row.value(5),
            Err(Error::FieldOutOfRange { index: 5, len: 2 })
        ));
        assert_eq!(row.to_string(), "customer(1, Alice)");

        let bare = Row::new(rt, vec![Value::integer(2), Value::text("Bob")]);
        assert!(matches!(bare.require_hkey(), Err(Error::MissingHKey(_))));
        assert_ne!(bare, row);
    }
}
