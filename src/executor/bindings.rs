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

//! Query bindings
//!
//! Correlated sub-plans read values bound by an enclosing operator: the
//! outer row of a nested loop, a bloom filter built by a semi-join, or a
//! parameter supplied by the caller. [`QueryBindings`] holds them as an
//! explicit stack of scopes passed by `&mut` into every `open`/`next` call.
//!
//! ```text
//! base:   [0 => Value(10)]                 parameters from the caller
//! scope:  (1 => Row(customer 7))           pushed by map_nested_loops
//! scope:  (2 => BloomFilter)               pushed by using_bloom_filter
//! ```
//!
//! A scope is pushed for exactly one child call and popped when the call
//! returns (see [`QueryBindings::scoped`]), so an inner binding is never
//! visible once its triggering outer row has advanced.

use std::collections::VecDeque;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::common::BloomFilter;
use crate::core::{Error, Result, Row, Value};

/// A value bound at a position
#[derive(Debug, Clone)]
pub enum Binding {
    Value(Value),
    Row(Row),
    BloomFilter(Arc<BloomFilter>),
}

#[derive(Debug, Clone)]
struct Scope {
    position: usize,
    binding: Binding,
}

/// Stack of binding scopes for one execution
#[derive(Debug, Clone, Default)]
pub struct QueryBindings {
    /// Bindings set by the caller before execution
    base: FxHashMap<usize, Binding>,
    /// Scopes pushed by correlated operators, innermost last
    scopes: Vec<Scope>,
}

impl QueryBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a parameter value at the base level
    pub fn set_value(&mut self, position: usize, value: Value) {
        self.base.insert(position, Binding::Value(value));
    }

    /// Bind a row at the base level
    pub fn set_row(&mut self, position: usize, row: Row) {
        self.base.insert(position, Binding::Row(row));
    }

    /// Number of pushed scopes
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Innermost binding at `position`
    pub fn get(&self, position: usize) -> Result<&Binding> {
        self.scopes
            .iter()
            .rev()
            .find(|s| s.position == position)
            .map(|s| &s.binding)
            .or_else(|| self.base.get(&position))
            .ok_or(Error::BindingNotFound(position))
    }

    pub fn value(&self, position: usize) -> Result<&Value> {
        match self.get(position)? {
            Binding::Value(v) => Ok(v),
            _ => Err(Error::BindingTypeMismatch {
                position,
                expected: "value",
            }),
        }
    }

    pub fn row(&self, position: usize) -> Result<&Row> {
        match self.get(position)? {
            Binding::Row(r) => Ok(r),
            _ => Err(Error::BindingTypeMismatch {
                position,
                expected: "row",
            }),
        }
    }

    /// Innermost bloom filter at `position`.
    ///
    /// Unlike [`row`](Self::row) this skips other kinds of bindings, since a
    /// bloom-filter probe binds its candidate row at the same position while
    /// running the positive-match plan.
    pub fn bloom_filter(&self, position: usize) -> Result<&Arc<BloomFilter>> {
        let scoped = self.scopes.iter().rev().find_map(|s| match &s.binding {
            Binding::BloomFilter(f) if s.position == position => Some(f),
            _ => None,
        });
        match scoped {
            Some(filter) => Ok(filter),
            None => match self.base.get(&position) {
                Some(Binding::BloomFilter(f)) => Ok(f),
                Some(_) => Err(Error::BindingTypeMismatch {
                    position,
                    expected: "bloom filter",
                }),
                None => Err(Error::BindingNotFound(position)),
            },
        }
    }

    /// Run `f` with `binding` pushed at `position`, then pop it.
    ///
    /// Returns the result of `f` together with the binding so the caller
    /// can keep ownership of the row or filter across calls.
    pub fn scoped<R>(
        &mut self,
        position: usize,
        binding: Binding,
        f: impl FnOnce(&mut QueryBindings) -> R,
    ) -> (R, Binding) {
        self.scopes.push(Scope { position, binding });
        let depth = self.scopes.len();
        let result = f(self);
        debug_assert_eq!(self.scopes.len(), depth, "unbalanced binding scope");
        self.scopes.truncate(depth);
        // nested scopes are balanced, so ours is on top
        let scope = self.scopes.remove(depth - 1);
        (result, scope.binding)
    }
}

/// Source of binding sets, one per execution of the root cursor
pub trait QueryBindingsCursor: Send {
    fn next_bindings(&mut self) -> Option<QueryBindings>;
}

/// Exactly one binding set
#[derive(Debug)]
pub struct SingletonBindingsCursor {
    bindings: Option<QueryBindings>,
}

impl SingletonBindingsCursor {
    pub fn new(bindings: QueryBindings) -> Self {
        Self {
            bindings: Some(bindings),
        }
    }
}

impl QueryBindingsCursor for SingletonBindingsCursor {
    fn next_bindings(&mut self) -> Option<QueryBindings> {
        self.bindings.take()
    }
}

/// A fixed sequence of binding sets
#[derive(Debug, Default)]
pub struct MultipleBindingsCursor {
    pending: VecDeque<QueryBindings>,
}

impl MultipleBindingsCursor {
    pub fn new(bindings: impl IntoIterator<Item = QueryBindings>) -> Self {
        Self {
            pending: bindings.into_iter().collect(),
        }
    }

    pub fn push(&mut self, bindings: QueryBindings) {
        self.pending.push_back(bindings);
    }
}

impl QueryBindingsCursor for MultipleBindingsCursor {
    fn next_bindings(&mut self) -> Option<QueryBindings> {
        self.pending.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_shadowing() {
        let mut bindings = QueryBindings::new();
        bindings.set_value(0, Value::integer(1));

        let (inner, binding) = bindings.scoped(0, Binding::Value(Value::integer(2)), |b| {
            assert_eq!(b.depth(), 1);
            b.value(0).unwrap().clone()
        });
        assert_eq!(inner, Value::integer(2));
        assert!(matches!(binding, Binding::Value(Value::Integer(2))));
        assert_eq!(bindings.depth(), 0);
        assert_eq!(bindings.value(0).unwrap(), &Value::integer(1));
    }

    #[test]
    fn test_missing_and_mismatched_bindings() {
        let mut bindings = QueryBindings::new();
        assert_eq!(bindings.value(3), Err(Error::BindingNotFound(3)));

        bindings.set_value(3, Value::integer(1));
        assert!(matches!(
            bindings.row(3),
            Err(Error::BindingTypeMismatch {
                position: 3,
                expected: "row"
            })
        ));
        assert!(matches!(
            bindings.bloom_filter(3),
            Err(Error::BindingTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_bloom_filter_lookup_skips_rows() {
        let mut bindings = QueryBindings::new();
        let filter = Arc::new(BloomFilter::new(10, 0.01));
        bindings.scoped(1, Binding::BloomFilter(Arc::clone(&filter)), |b| {
            b.scoped(1, Binding::Value(Value::integer(5)), |b| {
                assert!(b.bloom_filter(1).is_ok());
                assert!(b.value(1).is_ok());
            });
        });
        assert_eq!(bindings.bloom_filter(1).unwrap_err(), Error::BindingNotFound(1));
    }

    #[test]
    fn test_bindings_cursors() {
        let mut single = SingletonBindingsCursor::new(QueryBindings::new());
        assert!(single.next_bindings().is_some());
        assert!(single.next_bindings().is_none());

        let mut multi = MultipleBindingsCursor::new(vec![QueryBindings::new(); 3]);
        let mut count = 0;
        while multi.next_bindings().is_some() {
            count += 1;
        }
        assert_eq!(count, 3);
    }
}
