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

//! Histogram bucket
//!
//! A bucket stands for one sampled value and everything folded into it:
//! the number of occurrences of the value itself and the number of
//! occurrences (and distinct values) that sort between the previous bucket
//! and this one.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket<T> {
    value: T,
    equals: u64,
    less_than: u64,
    less_than_distincts: u64,
}

impl<T> Bucket<T> {
    pub fn new(value: T, equals: u64) -> Self {
        Self {
            value,
            equals,
            less_than: 0,
            less_than_distincts: 0,
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn equals_count(&self) -> u64 {
        self.equals
    }

    pub fn less_than_count(&self) -> u64 {
        self.less_than
    }

    pub fn less_than_distincts_count(&self) -> u64 {
        self.less_than_distincts
    }

    /// Occurrences this bucket accounts for
    pub fn total(&self) -> u64 {
        self.equals + self.less_than
    }

    /// Fold `from`, which sorts before this bucket, into the less-than counts
    pub fn merge_up(&mut self, from: &Bucket<T>) {
        self.less_than_distincts += from.less_than_distincts + 1;
        self.less_than += from.less_than + from.equals;
    }
}

impl<T: fmt::Display> fmt::Display for Bucket<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<{}: eq={}, lt={}, lt_distinct={}>",
            self.value, self.equals, self.less_than, self.less_than_distincts
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_up_keeps_totals() {
        let mut a = Bucket::new(1, 3);
        let mut b = Bucket::new(2, 1);
        let mut c = Bucket::new(5, 4);
        b.merge_up(&a);
        c.merge_up(&b);
        assert_eq!(c.total(), 8);
        assert_eq!(c.less_than_distincts_count(), 2);
        a.merge_up(&Bucket::new(0, 2));
        assert_eq!(a.to_string(), "<1: eq=3, lt=2, lt_distinct=1>");
    }
}
