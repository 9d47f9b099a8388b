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

//! Hierarchical keys
//!
//! An [`HKey`] locates a row inside its group. It is the list of key
//! segments from the group root down to the row's own table:
//!
//! ```text
//! customer 7             [1:(7)]
//!   order 70             [1:(7), 2:(70)]
//!     item 700           [1:(7), 2:(70), 3:(700)]
//!   address 71           [1:(7), 4:(71)]
//! ```
//!
//! Each segment is `(table ordinal, key values)`. HKeys compare segment by
//! segment, so a parent sorts immediately before its whole subtree and a
//! child's hKey is always a strict extension of its parent's.

use std::cmp::Ordering;
use std::fmt;

use smallvec::SmallVec;

use super::value::Value;

/// One level of an hKey
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HKeySegment {
    /// Ordinal of the table within its group
    pub ordinal: u32,
    /// Primary key values of the table at this level
    pub values: SmallVec<[Value; 2]>,
}

impl HKeySegment {
    pub fn new(ordinal: u32, values: impl IntoIterator<Item = Value>) -> Self {
        Self {
            ordinal,
            values: values.into_iter().collect(),
        }
    }
}

impl PartialOrd for HKeySegment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HKeySegment {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordinal
            .cmp(&other.ordinal)
            .then_with(|| self.values.as_slice().cmp(other.values.as_slice()))
    }
}

impl fmt::Display for HKeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:(", self.ordinal)?;
        for (i, v) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}

/// Hierarchical key
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct HKey {
    segments: SmallVec<[HKeySegment; 4]>,
}

impl HKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: impl IntoIterator<Item = HKeySegment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// Root-level hKey with a single segment
    pub fn root(ordinal: u32, values: impl IntoIterator<Item = Value>) -> Self {
        Self::from_segments([HKeySegment::new(ordinal, values)])
    }

    pub fn segments(&self) -> &[HKeySegment] {
        &self.segments
    }

    /// Number of segments (table depth + 1)
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Ordinal of the deepest segment
    pub fn leaf_ordinal(&self) -> Option<u32> {
        self.segments.last().map(|s| s.ordinal)
    }

    /// Append a segment in place
    pub fn push(&mut self, ordinal: u32, values: impl IntoIterator<Item = Value>) {
        self.segments.push(HKeySegment::new(ordinal, values));
    }

    /// Copy of this hKey extended by one segment
    pub fn extend(&self, ordinal: u32, values: impl IntoIterator<Item = Value>) -> HKey {
        let mut hkey = self.clone();
        hkey.push(ordinal, values);
        hkey
    }

    /// Ancestor hKey with at most `len` segments
    pub fn truncate(&self, len: usize) -> HKey {
        Self {
            segments: self.segments.iter().take(len).cloned().collect(),
        }
    }

    /// True if `other` equals this hKey or lies in its subtree
    pub fn is_prefix_of(&self, other: &HKey) -> bool {
        self.segments.len() <= other.segments.len()
            && self
                .segments
                .iter()
                .zip(other.segments.iter())
                .all(|(a, b)| a == b)
    }

    /// True if `other` lies strictly below this hKey
    pub fn is_strict_prefix_of(&self, other: &HKey) -> bool {
        self.segments.len() < other.segments.len() && self.is_prefix_of(other)
    }
}

impl PartialOrd for HKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.segments.as_slice().cmp(other.segments.as_slice())
    }
}

impl fmt::Display for HKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, s) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", s)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer(cid: i64) -> HKey {
        HKey::root(1, [Value::integer(cid)])
    }

    #[test]
    fn test_prefix_sorts_before_extension() {
        let c = customer(1);
        let o = c.extend(2, [Value::integer(10)]);
        let i = o.extend(3, [Value::integer(100)]);
        let next_customer = customer(2);

        assert!(c < o);
        assert!(o < i);
        assert!(i < next_customer);
        assert!(c.is_strict_prefix_of(&i));
        assert!(o.is_prefix_of(&o));
        assert!(!o.is_strict_prefix_of(&o));
        assert!(!next_customer.is_prefix_of(&i));
    }

    #[test]
    fn test_sibling_tables_order_by_ordinal() {
        let c = customer(1);
        let order = c.extend(2, [Value::integer(99)]);
        let address = c.extend(4, [Value::integer(1)]);
        assert!(order < address);
    }

    #[test]
    fn test_truncate() {
        let i = customer(1)
            .extend(2, [Value::integer(10)])
            .extend(3, [Value::integer(100)]);
        assert_eq!(i.truncate(1), customer(1));
        assert_eq!(i.truncate(9), i);
        assert_eq!(i.leaf_ordinal(), Some(3));
    }

    #[test]
    fn test_null_segments_sort_first() {
        let orphan = HKey::root(1, [Value::null_unknown()]).extend(2, [Value::integer(5)]);
        assert!(orphan < customer(0));
    }

    #[test]
    fn test_display() {
        let o = customer(7).extend(2, [Value::integer(70)]);
        assert_eq!(o.to_string(), "[1:(7), 2:(70)]");
    }
}
