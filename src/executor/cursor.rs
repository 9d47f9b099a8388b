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

//! Cursor protocol
//!
//! Every operator produces cursors following the same pull-based contract:
//!
//! ```text
//!   Idle ──open──▶ Open ──next()* ──(exhausted)──▶ Closed
//!                   │                               ▲
//!                   └─────────────close────────────┘
//! ```
//!
//! - `next` while `Idle` is an error; `next` once `Closed` returns `None`.
//! - `close` is idempotent and may be called at any point, including after
//!   a child returned an error. It releases children and outstanding
//!   lookahead requests.
//! - A closed cursor can be opened again for another execution.
//!
//! Operator cursors implement [`CursorBody`] and are wrapped in a
//! [`ManagedCursor`], which enforces the state machine once for all of them.

use crate::core::{Error, Result, Row};

use super::bindings::QueryBindings;

/// Lifecycle state of a cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Created, never opened
    Idle,
    Open,
    /// Exhausted or explicitly closed
    Closed,
}

/// Pull-based row iterator for one execution
pub trait Cursor: Send {
    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()>;

    /// Next row, or `None` once exhausted
    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>>;

    /// Release resources; safe to call repeatedly
    fn close(&mut self);

    fn state(&self) -> CursorState;

    /// Operator name, for errors and logs
    fn name(&self) -> &'static str;

    fn is_open(&self) -> bool {
        self.state() == CursorState::Open
    }
}

/// Operator-specific part of a cursor
pub trait CursorBody: Send {
    fn name(&self) -> &'static str;

    /// Prepare for a new execution: open children, reset counters
    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()>;

    /// Produce the next row; only called while open
    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>>;

    /// Close children and drop buffered state
    fn release(&mut self);
}

/// Cursor enforcing the lifecycle around a [`CursorBody`]
pub struct ManagedCursor<B: CursorBody> {
    body: B,
    state: CursorState,
}

impl<B: CursorBody> ManagedCursor<B> {
    pub fn new(body: B) -> Self {
        Self {
            body,
            state: CursorState::Idle,
        }
    }

    pub fn body(&self) -> &B {
        &self.body
    }
}

/// Box a cursor body behind the lifecycle wrapper
pub fn managed<B: CursorBody + 'static>(body: B) -> Box<dyn Cursor> {
    Box::new(ManagedCursor::new(body))
}

impl<B: CursorBody> Cursor for ManagedCursor<B> {
    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        if self.state == CursorState::Open {
            return Err(Error::CursorAlreadyOpen(self.body.name().to_string()));
        }
        if let Err(e) = self.body.open(bindings) {
            self.body.release();
            return Err(e);
        }
        self.state = CursorState::Open;
        Ok(())
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        match self.state {
            CursorState::Idle => Err(Error::CursorNotOpen(self.body.name().to_string())),
            CursorState::Closed => Ok(None),
            CursorState::Open => {
                let row = self.body.next(bindings)?;
                if row.is_none() {
                    self.close();
                }
                Ok(row)
            }
        }
    }

    fn close(&mut self) {
        if self.state == CursorState::Open {
            self.body.release();
        }
        self.state = CursorState::Closed;
    }

    fn state(&self) -> CursorState {
        self.state
    }

    fn name(&self) -> &'static str {
        self.body.name()
    }
}

/// Open `cursor`, drain it and close it, even when a row fails
pub fn collect(cursor: &mut dyn Cursor, bindings: &mut QueryBindings) -> Result<Vec<Row>> {
    cursor.open(bindings)?;
    let mut rows = Vec::new();
    loop {
        match cursor.next(bindings) {
            Ok(Some(row)) => rows.push(row),
            Ok(None) => break,
            Err(e) => {
                cursor.close();
                return Err(e);
            }
        }
    }
    cursor.close();
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DataType, SchemaBuilder, TableSpec, Value};

    struct Counter {
        limit: i64,
        current: i64,
        releases: usize,
        row_type: crate::core::RowTypeRef,
    }

    impl CursorBody for Counter {
        fn name(&self) -> &'static str {
            "Counter"
        }

        fn open(&mut self, _bindings: &mut QueryBindings) -> Result<()> {
            self.current = 0;
            Ok(())
        }

        fn next(&mut self, _bindings: &mut QueryBindings) -> Result<Option<Row>> {
            if self.current == self.limit {
                return Ok(None);
            }
            self.current += 1;
            Ok(Some(Row::new(
                self.row_type.clone(),
                vec![Value::integer(self.current)],
            )))
        }

        fn release(&mut self) {
            self.releases += 1;
        }
    }

    fn counter(limit: i64) -> ManagedCursor<Counter> {
        let schema = SchemaBuilder::new()
            .table(TableSpec::new("t").add_primary_key("id", DataType::Integer))
            .build()
            .unwrap();
        ManagedCursor::new(Counter {
            limit,
            current: 0,
            releases: 0,
            row_type: schema.table_type("t").unwrap(),
        })
    }

    #[test]
    fn test_next_before_open_fails() {
        let mut cursor = counter(2);
        let mut bindings = QueryBindings::new();
        assert!(matches!(
            cursor.next(&mut bindings),
            Err(Error::CursorNotOpen(_))
        ));
    }

    #[test]
    fn test_exhaustion_closes() {
        let mut cursor = counter(2);
        let mut bindings = QueryBindings::new();
        cursor.open(&mut bindings).unwrap();
        assert!(matches!(
            cursor.open(&mut bindings),
            Err(Error::CursorAlreadyOpen(_))
        ));
        assert!(cursor.next(&mut bindings).unwrap().is_some());
        assert!(cursor.next(&mut bindings).unwrap().is_some());
        assert!(cursor.next(&mut bindings).unwrap().is_none());
        assert_eq!(cursor.state(), CursorState::Closed);
        assert!(cursor.next(&mut bindings).unwrap().is_none());
        assert_eq!(cursor.body().releases, 1);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut cursor = counter(5);
        let mut bindings = QueryBindings::new();
        cursor.open(&mut bindings).unwrap();
        cursor.next(&mut bindings).unwrap();
        cursor.close();
        cursor.close();
        assert_eq!(cursor.state(), CursorState::Closed);
        assert_eq!(cursor.body().releases, 1);

        // reopen for another execution
        let rows = collect(&mut cursor, &mut bindings).unwrap();
        assert_eq!(rows.len(), 5);
    }
}
