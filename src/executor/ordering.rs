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

//! Row ordering
//!
//! An ordering is a list of (expression, direction, collator) keys. Keys are
//! stored as one list of triples, so the three never drift apart in length.

use std::cmp::Ordering;
use std::fmt;

use crate::core::{compare_collated, CollatorRef, Result, Row, Value};
use crate::expression::ExpressionRef;

use super::bindings::QueryBindings;

#[derive(Debug, Clone)]
pub struct SortKey {
    pub expression: ExpressionRef,
    pub ascending: bool,
    pub collator: Option<CollatorRef>,
}

#[derive(Debug, Clone, Default)]
pub struct RowOrdering {
    keys: Vec<SortKey>,
}

impl RowOrdering {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, expression: ExpressionRef, ascending: bool) {
        self.append_collated(expression, ascending, None);
    }

    pub fn append_collated(
        &mut self,
        expression: ExpressionRef,
        ascending: bool,
        collator: Option<CollatorRef>,
    ) {
        self.keys.push(SortKey {
            expression,
            ascending,
            collator,
        });
    }

    /// Builder form of [`append`](Self::append)
    pub fn then(mut self, expression: ExpressionRef, ascending: bool) -> Self {
        self.append(expression, ascending);
        self
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn ascending(&self, i: usize) -> bool {
        self.keys[i].ascending
    }

    pub fn all_ascending(&self) -> bool {
        self.keys.iter().all(|k| k.ascending)
    }

    pub fn all_descending(&self) -> bool {
        self.keys.iter().all(|k| !k.ascending)
    }

    pub fn collators(&self) -> Vec<Option<CollatorRef>> {
        self.keys.iter().map(|k| k.collator.clone()).collect()
    }

    /// Evaluate every key expression against `row`
    pub fn evaluate(&self, row: &Row, bindings: &QueryBindings) -> Result<Vec<Value>> {
        self.keys
            .iter()
            .map(|k| k.expression.evaluate(Some(row), bindings))
            .collect()
    }

    /// Compare two evaluated key vectors, honoring direction and collation
    pub fn compare_keys(&self, a: &[Value], b: &[Value]) -> Ordering {
        for (key, (x, y)) in self.keys.iter().zip(a.iter().zip(b)) {
            let ord = compare_collated(x, y, key.collator.as_deref());
            let ord = if key.ascending { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

impl fmt::Display for RowOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, key) in self.keys.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:?} {}", key.expression, if key.ascending { "ASC" } else { "DESC" })?;
            if let Some(c) = &key.collator {
                write!(f, " COLLATE {}", c.name())?;
            }
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CaseInsensitiveCollator;
    use crate::expression::literal;
    use std::sync::Arc;

    #[test]
    fn test_compare_keys_directions() {
        let ordering = RowOrdering::new()
            .then(literal(0), true)
            .then(literal(0), false);
        assert_eq!(ordering.len(), 2);
        assert!(!ordering.all_ascending());

        let a = [Value::integer(1), Value::integer(5)];
        let b = [Value::integer(1), Value::integer(3)];
        assert_eq!(ordering.compare_keys(&a, &b), Ordering::Less);
        let c = [Value::integer(0), Value::integer(9)];
        assert_eq!(ordering.compare_keys(&a, &c), Ordering::Greater);
    }

    #[test]
    fn test_collated_keys() {
        let mut ordering = RowOrdering::new();
        ordering.append_collated(literal(""), true, Some(Arc::new(CaseInsensitiveCollator) as CollatorRef));
        assert_eq!(
            ordering.compare_keys(&[Value::text("ABC")], &[Value::text("abc")]),
            Ordering::Equal
        );
        assert_eq!(ordering.collators().len(), 1);
    }
}
