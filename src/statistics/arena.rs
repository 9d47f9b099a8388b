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

//! Bucket arena
//!
//! Buckets live in a slot vector and are addressed by [`BucketId`]. Freed
//! slots go on a free list and are reused before new slots are created.
//! The number of slots ever created is capped; going past the cap means
//! the sampler kept more buckets than its configuration allows, which is a
//! bug in the sampler rather than bad input, so it panics.

use super::bucket::Bucket;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketId(usize);

#[derive(Debug)]
pub struct BucketArena<T> {
    slots: Vec<Option<Bucket<T>>>,
    free: Vec<usize>,
    created_limit: usize,
}

impl<T> BucketArena<T> {
    pub fn new(created_limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            created_limit,
        }
    }

    pub fn alloc(&mut self, bucket: Bucket<T>) -> BucketId {
        if let Some(slot) = self.free.pop() {
            self.slots[slot] = Some(bucket);
            return BucketId(slot);
        }
        assert!(
            self.slots.len() < self.created_limit,
            "bucket arena exceeded its limit of {} buckets",
            self.created_limit
        );
        self.slots.push(Some(bucket));
        BucketId(self.slots.len() - 1)
    }

    pub fn get(&self, id: BucketId) -> &Bucket<T> {
        match &self.slots[id.0] {
            Some(bucket) => bucket,
            None => panic!("bucket {:?} was freed", id),
        }
    }

    pub fn get_mut(&mut self, id: BucketId) -> &mut Bucket<T> {
        match &mut self.slots[id.0] {
            Some(bucket) => bucket,
            None => panic!("bucket {:?} was freed", id),
        }
    }

    /// Remove a bucket, recycling its slot
    pub fn take(&mut self, id: BucketId) -> Bucket<T> {
        match self.slots[id.0].take() {
            Some(bucket) => {
                self.free.push(id.0);
                bucket
            }
            None => panic!("bucket {:?} was freed", id),
        }
    }

    /// Fold `from` into `into` and release `from`
    pub fn merge_up(&mut self, from: BucketId, into: BucketId) {
        let from = self.take(from);
        self.get_mut(into).merge_up(&from);
    }

    /// Slots ever created
    pub fn created(&self) -> usize {
        self.slots.len()
    }

    /// Buckets currently allocated
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_recycled() {
        let mut arena = BucketArena::new(2);
        let a = arena.alloc(Bucket::new("a", 1));
        let b = arena.alloc(Bucket::new("b", 2));
        arena.merge_up(a, b);
        assert_eq!(arena.live(), 1);
        let c = arena.alloc(Bucket::new("c", 1));
        assert_eq!(c, a);
        assert_eq!(arena.created(), 2);
        assert_eq!(arena.get(b).less_than_count(), 1);
    }

    #[test]
    #[should_panic(expected = "exceeded its limit")]
    fn test_limit_is_enforced() {
        let mut arena = BucketArena::new(1);
        arena.alloc(Bucket::new(1, 1));
        arena.alloc(Bucket::new(2, 1));
    }
}
