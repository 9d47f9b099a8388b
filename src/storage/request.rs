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

//! Index scan requests
//!
//! An [`IndexScanRequest`] names an index, a resolved key range, a
//! per-column direction/collation and an [`IndexScanSelector`]. For group
//! indexes the selector decides which hierarchy levels must be present in
//! an entry:
//!
//! ```text
//! index (customer.name, order.date, item.sku)     levels: 0 1 2
//!
//! inner                      customer, order, item all present
//! left_join_after(order)     customer and order present, item optional
//! right_join_until(order)    order and item present, customer optional
//! ```

use std::cmp::Ordering;

use crate::core::{compare_collated, CollatorRef, Error, IndexDef, IndexId, Result, TableId, Value};

/// One end of a key range
#[derive(Debug, Clone, PartialEq)]
pub struct KeyBound {
    /// Values for a prefix of the index columns
    pub values: Vec<Value>,
    pub inclusive: bool,
}

/// Resolved key range; `None` ends are unbounded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyRange {
    pub lo: Option<KeyBound>,
    pub hi: Option<KeyBound>,
}

impl KeyRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// True if `key` lies inside the range under the natural (ascending,
    /// collated) order of the index columns
    pub fn contains(&self, key: &[Value], collators: &[Option<CollatorRef>]) -> bool {
        if let Some(lo) = &self.lo {
            match compare_prefix(key, &lo.values, collators) {
                Ordering::Less => return false,
                Ordering::Equal if !lo.inclusive => return false,
                _ => {}
            }
        }
        if let Some(hi) = &self.hi {
            match compare_prefix(key, &hi.values, collators) {
                Ordering::Greater => return false,
                Ordering::Equal if !hi.inclusive => return false,
                _ => {}
            }
        }
        true
    }
}

/// Compare the first `bound.len()` columns of `key` with `bound`
fn compare_prefix(key: &[Value], bound: &[Value], collators: &[Option<CollatorRef>]) -> Ordering {
    for (i, (k, b)) in key.iter().zip(bound).enumerate() {
        let collator = collators.get(i).and_then(|c| c.as_deref());
        let ord = compare_collated(k, b, collator);
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Which hierarchy levels of a group index entry must be present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexScanSelector {
    /// Bit `i` set: level `i` of the index path must be present
    required: u64,
    description: String,
}

impl IndexScanSelector {
    /// Every level must be present
    pub fn inner(index: &IndexDef) -> Self {
        Self {
            required: mask_range(0, index.path.len()),
            description: "inner".to_string(),
        }
    }

    /// Levels from the index root down to `table` must be present,
    /// deeper levels are optional
    pub fn left_join_after(index: &IndexDef, table: TableId) -> Result<Self> {
        let level = Self::level(index, table)?;
        Ok(Self {
            required: mask_range(0, level + 1),
            description: format!("left_join_after({})", level),
        })
    }

    /// Levels from `table` down to the index leaf must be present,
    /// shallower levels are optional
    pub fn right_join_until(index: &IndexDef, table: TableId) -> Result<Self> {
        let level = Self::level(index, table)?;
        Ok(Self {
            required: mask_range(level, index.path.len()),
            description: format!("right_join_until({})", level),
        })
    }

    fn level(index: &IndexDef, table: TableId) -> Result<usize> {
        index.level_of(table).ok_or_else(|| {
            Error::invalid_argument(format!(
                "table #{} is not on the path of index '{}'",
                table, index.name
            ))
        })
    }

    /// True if an entry with the given presence mask is selected
    pub fn matches(&self, present: u64) -> bool {
        present & self.required == self.required
    }

    /// True if level `level` is required
    pub fn requires(&self, level: usize) -> bool {
        level < 64 && self.required & (1 << level) != 0
    }
}

impl std::fmt::Display for IndexScanSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description)
    }
}

fn mask_range(from: usize, to: usize) -> u64 {
    (from..to.min(64)).fold(0, |m, i| m | (1 << i))
}

/// Request handed to [`GroupStore::scan_index`](super::GroupStore::scan_index)
#[derive(Debug, Clone)]
pub struct IndexScanRequest {
    pub index: IndexId,
    pub range: KeyRange,
    /// Direction per index column; columns past the end follow the last entry
    pub ascending: Vec<bool>,
    /// Collator per index column
    pub collators: Vec<Option<CollatorRef>>,
    pub selector: IndexScanSelector,
}

impl IndexScanRequest {
    /// Direction of column `i`
    pub fn is_ascending(&self, i: usize) -> bool {
        self.ascending
            .get(i)
            .or_else(|| self.ascending.last())
            .copied()
            .unwrap_or(true)
    }

    /// Compare two index keys in scan order (ties are not broken here)
    pub fn compare_keys(&self, a: &[Value], b: &[Value]) -> Ordering {
        for (i, (x, y)) in a.iter().zip(b).enumerate() {
            let collator = self.collators.get(i).and_then(|c| c.as_deref());
            let ord = compare_collated(x, y, collator);
            let ord = if self.is_ascending(i) { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}
