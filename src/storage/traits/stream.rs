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

//! Row stream returned by storage requests

use crate::core::{Result, Row};

/// Pull iterator over rows produced by one storage request
///
/// A stream holds its request open until it is dropped. Cursors that
/// prefetch keep streams in their lookahead queue and release them by
/// dropping the queue on `close()`.
pub trait RowStream: Send {
    /// Next row, or `None` once the request is exhausted
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// Stream over an already materialized list of rows
pub struct VecRowStream {
    rows: std::vec::IntoIter<Row>,
}

impl VecRowStream {
    pub fn new(rows: Vec<Row>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

impl RowStream for VecRowStream {
    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.next())
    }
}
