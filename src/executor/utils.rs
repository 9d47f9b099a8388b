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

//! Shared utility functions for the executor module.

use std::cmp::Ordering;

use crate::core::{compare_collated, CollatorRef, DataType, RowType, RowTypeKind, TableId, Value};

// ============================================================================
// Row Helpers
// ============================================================================

/// NULLs typed after `fields`, used for the missing side of outer joins
pub fn typed_nulls(fields: &[DataType]) -> Vec<Value> {
    fields.iter().map(|t| Value::null(*t)).collect()
}

/// Offset of the fields of `target` within rows of `row_type`.
///
/// Flattened and product types lay out their components left to right;
/// the type itself is at offset 0.
pub fn component_offset(row_type: &RowType, target: &RowType) -> Option<usize> {
    if row_type == target {
        return Some(0);
    }
    match row_type.kind() {
        RowTypeKind::Flattened {
            parent: left,
            child: right,
        }
        | RowTypeKind::Product { left, right } => component_offset(left, target).or_else(|| {
            component_offset(right, target).map(|offset| offset + left.field_count())
        }),
        _ => None,
    }
}

/// Deepest table of a row type's hKey path
pub fn leaf_table(row_type: &RowType) -> Option<TableId> {
    row_type.table_path().and_then(|p| p.last().copied())
}

// ============================================================================
// Value Comparison
// ============================================================================

/// Compare two value slices field by field under optional collators
pub fn compare_values_collated(
    a: &[Value],
    b: &[Value],
    collators: Option<&[Option<CollatorRef>]>,
) -> Ordering {
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        let collator = collators
            .and_then(|c| c.get(i))
            .and_then(|c| c.as_deref());
        let ord = compare_collated(x, y, collator);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// Compare with a per-field direction; fields past `ascending` are ascending
pub fn compare_directed(a: &[Value], b: &[Value], ascending: &[bool]) -> Ordering {
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        let ord = x.cmp(y);
        let ord = if ascending.get(i).copied().unwrap_or(true) {
            ord
        } else {
            ord.reverse()
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CaseInsensitiveCollator, SchemaBuilder, TableSpec};
    use std::sync::Arc;

    #[test]
    fn test_component_offset() {
        let schema = SchemaBuilder::new()
            .table(
                TableSpec::new("a")
                    .add_primary_key("id", DataType::Integer)
                    .add("x", DataType::Text),
            )
            .table(
                TableSpec::new("b")
                    .child_of("a", &["aid"])
                    .add_primary_key("id", DataType::Integer)
                    .add("aid", DataType::Integer),
            )
            .build()
            .unwrap();
        let a = schema.table_type("a").unwrap();
        let b = schema.table_type("b").unwrap();
        let flat = schema.flattened_type(&a, &b);
        assert_eq!(component_offset(&flat, &a), Some(0));
        assert_eq!(component_offset(&flat, &b), Some(2));
        assert_eq!(component_offset(&a, &b), None);
        assert_eq!(leaf_table(&flat), Some(1));
    }

    #[test]
    fn test_collated_comparison() {
        let collators: Vec<Option<CollatorRef>> = vec![Some(Arc::new(CaseInsensitiveCollator) as CollatorRef)];
        let a = [Value::text("Bob")];
        let b = [Value::text("BOB")];
        assert_eq!(compare_values_collated(&a, &b, Some(&collators)), Ordering::Equal);
        assert_ne!(compare_values_collated(&a, &b, None), Ordering::Equal);
        assert_eq!(
            compare_directed(&[Value::integer(1)], &[Value::integer(2)], &[false]),
            Ordering::Greater
        );
    }
}
