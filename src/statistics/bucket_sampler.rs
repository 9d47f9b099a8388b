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

//! Weighted bucket sampling
//!
//! [`BucketSampler`] keeps a bounded, value-ordered subset of the buckets
//! it is fed. Selection is systematic and proportional to size: with `n`
//! slots and `N` expected inputs, a selection point falls every `N / n`
//! inputs (starting at an offset), and a bucket is kept when its run of
//! inputs covers the next point. Heavy buckets therefore survive with
//! probability proportional to their count.
//!
//! A bucket that is not kept is folded into the tail, an inline bucket
//! holding everything seen since the last kept bucket. The tail is merged
//! into the next kept bucket, or becomes the last bucket on
//! [`finish`](BucketSampler::finish), so totals are never lost.

use super::arena::{BucketArena, BucketId};
use super::bucket::Bucket;

/// Running mean and sample standard deviation (Welford)
#[derive(Debug, Clone, Default)]
pub struct EqualsStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl EqualsStats {
    pub fn push(&mut self, x: u64) {
        self.count += 1;
        let x = x as f64;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std_dev(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).sqrt()
        }
    }
}

#[derive(Debug)]
pub struct BucketSampler<T> {
    capacity: usize,
    expected_inputs: u128,
    offset: u128,
    /// Index of the next selection point
    next_point: usize,
    inputs: u128,
    results: Vec<BucketId>,
    tail: Option<Bucket<T>>,
    stats: Option<EqualsStats>,
}

impl<T: Ord> BucketSampler<T> {
    /// `offset` is taken modulo `expected_inputs`
    pub fn new(capacity: usize, expected_inputs: u64, offset: u64, track_stats: bool) -> Self {
        let offset = if expected_inputs == 0 {
            0
        } else {
            offset % expected_inputs
        };
        Self {
            capacity,
            expected_inputs: u128::from(expected_inputs),
            offset: u128::from(offset),
            next_point: 0,
            inputs: 0,
            results: Vec::with_capacity(capacity.min(1024)),
            tail: None,
            stats: track_stats.then(EqualsStats::default),
        }
    }

    /// Scaled position of selection point `i`
    fn point(&self, i: usize) -> u128 {
        self.offset + i as u128 * self.expected_inputs
    }

    /// Offer a bucket; returns true if it was kept. A bucket that is not
    /// kept is folded into the tail and its slot released.
    pub fn add(&mut self, arena: &mut BucketArena<T>, id: BucketId) -> bool {
        let bucket = arena.get(id);
        if let Some(stats) = &mut self.stats {
            stats.push(bucket.equals_count());
        }
        self.inputs += u128::from(bucket.total());

        let reached = self.inputs * self.capacity as u128;
        let selected = self.next_point < self.capacity && self.point(self.next_point) < reached;
        while self.next_point < self.capacity && self.point(self.next_point) < reached {
            self.next_point += 1;
        }

        if selected {
            self.push(arena, id);
        } else {
            let mut bucket = arena.take(id);
            if let Some(previous) = self.tail.take() {
                bucket.merge_up(&previous);
            }
            self.tail = Some(bucket);
        }
        selected
    }

    /// Keep a bucket regardless of the selection points
    pub fn append(&mut self, arena: &mut BucketArena<T>, id: BucketId) {
        self.push(arena, id);
    }

    fn push(&mut self, arena: &mut BucketArena<T>, id: BucketId) {
        if let Some(tail) = self.tail.take() {
            arena.get_mut(id).merge_up(&tail);
        }
        self.results.push(id);
    }

    /// Kept buckets in input order, followed by the tail if there is one
    pub fn finish(self, arena: &mut BucketArena<T>) -> Vec<BucketId> {
        self.finish_with(arena, None)
    }

    /// Like [`finish`](Self::finish), but `trailing` (which sorts after every
    /// kept bucket) and the tail end up as one last bucket holding the
    /// greater value
    pub fn finish_with(
        mut self,
        arena: &mut BucketArena<T>,
        trailing: Option<BucketId>,
    ) -> Vec<BucketId> {
        match (trailing, self.tail.take()) {
            (Some(last), Some(mut tail)) => {
                if arena.get(last).value() > tail.value() {
                    arena.get_mut(last).merge_up(&tail);
                    self.results.push(last);
                } else {
                    tail.merge_up(&arena.take(last));
                    self.results.push(arena.alloc(tail));
                }
            }
            (Some(last), None) => self.results.push(last),
            (None, Some(tail)) => self.results.push(arena.alloc(tail)),
            (None, None) => {}
        }
        self.results
    }

    pub fn equals_mean(&self) -> f64 {
        self.stats.as_ref().map_or(0.0, EqualsStats::mean)
    }

    pub fn equals_std_dev(&self) -> f64 {
        self.stats.as_ref().map_or(0.0, EqualsStats::std_dev)
    }

    pub fn inputs(&self) -> u128 {
        self.inputs
    }
}
