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

//! Collation provider
//!
//! Text comparisons in orderings, merges, distinct and bloom filters may be
//! locale-aware. A [`Collator`] supplies the comparison and a hash key that
//! is equal for strings the collator considers equal.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;

use super::error::{Error, Result};
use super::value::Value;

pub type CollatorRef = Arc<dyn Collator>;

/// Text comparison semantics
pub trait Collator: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn compare(&self, a: &str, b: &str) -> Ordering;

    /// Normalized form; equal for strings that compare equal
    fn hash_key(&self, s: &str) -> String;
}

/// Code point order
#[derive(Debug, Default)]
pub struct BinaryCollator;

impl Collator for BinaryCollator {
    fn name(&self) -> &str {
        "ucs_binary"
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }

    fn hash_key(&self, s: &str) -> String {
        s.to_string()
    }
}

/// Case-insensitive order over lowercased text
#[derive(Debug, Default)]
pub struct CaseInsensitiveCollator;

impl Collator for CaseInsensitiveCollator {
    fn name(&self) -> &str {
        "en_ci"
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        a.chars()
            .flat_map(char::to_lowercase)
            .cmp(b.chars().flat_map(char::to_lowercase))
    }

    fn hash_key(&self, s: &str) -> String {
        s.to_lowercase()
    }
}

/// Collators by name
#[derive(Debug, Clone)]
pub struct CollatorRegistry {
    collators: FxHashMap<String, CollatorRef>,
}

impl CollatorRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            collators: FxHashMap::default(),
        };
        registry.register(Arc::new(BinaryCollator));
        registry.register(Arc::new(CaseInsensitiveCollator));
        registry
    }

    pub fn register(&mut self, collator: CollatorRef) {
        self.collators.insert(collator.name().to_string(), collator);
    }

    pub fn get(&self, name: &str) -> Result<CollatorRef> {
        self.collators
            .get(name)
            .cloned()
            .ok_or_else(|| Error::CollatorNotFound(name.to_string()))
    }
}

impl Default for CollatorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Total order of two values, applying `collator` when both are text
pub fn compare_collated(a: &Value, b: &Value, collator: Option<&dyn Collator>) -> Ordering {
    match (collator, a, b) {
        (Some(c), Value::Text(x), Value::Text(y)) => c.compare(x, y),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive() {
        let ci = CaseInsensitiveCollator;
        assert_eq!(ci.compare("abc", "ABC"), Ordering::Equal);
        assert_eq!(ci.compare("abc", "ABD"), Ordering::Less);
        assert_eq!(ci.hash_key("MiXeD"), "mixed");
    }

    #[test]
    fn test_registry() {
        let registry = CollatorRegistry::new();
        assert_eq!(registry.get("en_ci").unwrap().name(), "en_ci");
        assert!(matches!(
            registry.get("tr_ci"),
            Err(Error::CollatorNotFound(_))
        ));
    }

    #[test]
    fn test_compare_collated() {
        let ci = CaseInsensitiveCollator;
        let a = Value::text("Apple");
        let b = Value::text("apple");
        assert_eq!(compare_collated(&a, &b, Some(&ci)), Ordering::Equal);
        assert_ne!(compare_collated(&a, &b, None), Ordering::Equal);
        assert_eq!(
            compare_collated(&Value::integer(1), &Value::integer(2), Some(&ci)),
            Ordering::Less
        );
    }
}
