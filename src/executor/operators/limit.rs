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

//! Skip and limit
//!
//! Either count may be fixed at construction or read from a value binding
//! when the cursor opens. A NULL bound value means no limit.

use std::fmt;

use crate::core::{Error, Result, Row};
use crate::executor::bindings::QueryBindings;
use crate::executor::context::QueryContext;
use crate::executor::cursor::{managed, Cursor, CursorBody};
use crate::executor::plan::{OperatorRef, PlanNode};

/// Source of a skip or limit count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitBound {
    Fixed(i64),
    /// Value bound at a binding position
    Bound(usize),
}

impl LimitBound {
    pub const UNLIMITED: LimitBound = LimitBound::Fixed(i64::MAX);

    fn resolve(&self, bindings: &QueryBindings) -> Result<u64> {
        let n = match self {
            LimitBound::Fixed(n) => *n,
            LimitBound::Bound(pos) => match bindings.value(*pos)? {
                v if v.is_null() => i64::MAX,
                v => v.as_int64().ok_or_else(|| {
                    Error::invalid_argument(format!("limit binding {} is not an integer: {}", pos, v))
                })?,
            },
        };
        u64::try_from(n).map_err(|_| Error::invalid_argument(format!("negative limit {}", n)))
    }
}

impl fmt::Display for LimitBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitBound::Fixed(i64::MAX) => write!(f, "none"),
            LimitBound::Fixed(n) => write!(f, "{}", n),
            LimitBound::Bound(pos) => write!(f, "${}", pos),
        }
    }
}

#[derive(Debug)]
pub struct Limit {
    input: OperatorRef,
    skip: LimitBound,
    limit: LimitBound,
}

impl Limit {
    pub fn new(input: OperatorRef, skip: LimitBound, limit: LimitBound) -> Result<Self> {
        for (what, bound) in [("skip", skip), ("limit", limit)] {
            if let LimitBound::Fixed(n) = bound {
                if n < 0 {
                    return Err(Error::invalid_argument(format!("negative {}: {}", what, n)));
                }
            }
        }
        Ok(Self { input, skip, limit })
    }
}

impl PlanNode for Limit {
    fn name(&self) -> &'static str {
        "Limit_Default"
    }

    fn cursor(&self, ctx: &QueryContext) -> Result<Box<dyn Cursor>> {
        Ok(managed(LimitCursor {
            input: self.input.cursor(ctx)?,
            skip: self.skip,
            limit: self.limit,
            to_skip: 0,
            remaining: 0,
        }))
    }

    fn inputs(&self) -> Vec<&OperatorRef> {
        vec![&self.input]
    }

    fn describe(&self) -> String {
        format!("skip {} limit {}", self.skip, self.limit)
    }
}

struct LimitCursor {
    input: Box<dyn Cursor>,
    skip: LimitBound,
    limit: LimitBound,
    to_skip: u64,
    remaining: u64,
}

impl CursorBody for LimitCursor {
    fn name(&self) -> &'static str {
        "Limit_Default"
    }

    fn open(&mut self, bindings: &mut QueryBindings) -> Result<()> {
        self.to_skip = self.skip.resolve(bindings)?;
        self.remaining = self.limit.resolve(bindings)?;
        self.input.open(bindings)
    }

    fn next(&mut self, bindings: &mut QueryBindings) -> Result<Option<Row>> {
        while self.remaining > 0 {
            let row = match self.input.next(bindings)? {
                Some(row) => row,
                None => return Ok(None),
            };
            if self.to_skip > 0 {
                self.to_skip -= 1;
                continue;
            }
            self.remaining -= 1;
            return Ok(Some(row));
        }
        // stop pulling as soon as the limit is reached
        self.input.close();
        Ok(None)
    }

    fn release(&mut self) {
        self.input.close();
    }
}
