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

//! Histogram sampler
//!
//! One pass over a sorted input produces, for every segment of the input
//! (e.g. every column prefix of an index key), at most `max_buckets`
//! value-ordered buckets whose counts add up to the number of inputs.
//!
//! ## Phases
//!
//! 1. Each input is split into segment values and run-length encoded.
//!    Every run becomes a bucket offered to the segment's oversampling
//!    [`BucketSampler`] (`max_buckets * oversample_factor` slots).
//! 2. On [`to_buckets`](Sampler::to_buckets) the candidates are split by
//!    popularity: a bucket whose equals-count reaches
//!    `mean + popularity_std_devs * std_dev` is popular.
//! 3. With at least `max_buckets` popular buckets, the populars are sampled
//!    down and every regular bucket is merged into the next kept popular
//!    one. Otherwise every popular bucket is kept and the regular buckets
//!    are sampled into the remaining slots.
//!
//! One slot is always left for the trailing bucket, so the last bucket of
//! a segment carries the greatest value seen.

use std::collections::VecDeque;
use std::fmt::Debug;

use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::{Error, Result};

use super::arena::{BucketArena, BucketId};
use super::bucket::Bucket;
use super::bucket_sampler::BucketSampler;
use super::config::SamplerConfig;
use super::splitter::{RunLengthSplit, Splitter};

/// Candidates of one segment, partitioned by popularity
struct PopularitySplit {
    regulars: Vec<BucketId>,
    regulars_count: u64,
    populars: VecDeque<BucketId>,
    populars_count: u64,
}

pub struct Sampler<T> {
    split: RunLengthSplit<T>,
    samplers: Vec<BucketSampler<T>>,
    arena: BucketArena<T>,
    max_buckets: usize,
    popularity_std_devs: f64,
    rng: Option<StdRng>,
    finished: bool,
}

impl<T: Ord + Clone + Debug> Sampler<T> {
    /// A sampler over `expected_inputs` sorted inputs
    pub fn new(
        splitter: Box<dyn Splitter<T>>,
        config: &SamplerConfig,
        expected_inputs: u64,
    ) -> Result<Self> {
        config.validate()?;
        let segments = splitter.segments();
        if segments == 0 {
            return Err(Error::invalid_argument("splitter has no segments"));
        }
        let oversample = config.oversample_size();
        let mut rng = config.seed.map(StdRng::seed_from_u64);
        let samplers = (0..segments)
            .map(|_| {
                let offset = draw_offset(&mut rng, expected_inputs);
                BucketSampler::new(oversample, expected_inputs, offset, true)
            })
            .collect();
        Ok(Self {
            split: RunLengthSplit::new(splitter),
            samplers,
            arena: BucketArena::new((oversample + 1) * segments),
            max_buckets: config.max_buckets,
            popularity_std_devs: config.popularity_std_devs,
            rng,
            finished: false,
        })
    }

    pub fn segments(&self) -> usize {
        self.samplers.len()
    }

    /// Feed the next input; inputs must arrive in ascending order
    pub fn visit(&mut self, input: &T) -> Result<()> {
        assert!(!self.finished, "visit() after finish()");
        let samplers = &mut self.samplers;
        let arena = &mut self.arena;
        self.split.visit(input, |segment, value, count| {
            let id = arena.alloc(Bucket::new(value, count));
            samplers[segment].add(arena, id);
        })
    }

    /// Signal the end of input
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        let samplers = &mut self.samplers;
        let arena = &mut self.arena;
        self.split.finish(|segment, value, count| {
            let id = arena.alloc(Bucket::new(value, count));
            samplers[segment].add(arena, id);
        });
        self.finished = true;
    }

    /// Final buckets, one list per segment
    ///
    /// # Panics
    ///
    /// Panics if [`finish`](Self::finish) was not called.
    pub fn to_buckets(mut self) -> Vec<Vec<Bucket<T>>> {
        assert!(self.finished, "to_buckets() called before finish()");
        let samplers = std::mem::take(&mut self.samplers);
        let mut results = Vec::with_capacity(samplers.len());
        for (segment, sampler) in samplers.into_iter().enumerate() {
            let cutoff = (sampler.equals_mean() + self.popularity_std_devs * sampler.equals_std_dev())
                .round()
                .max(0.0) as u64;
            let inputs = sampler.inputs();
            let candidates = sampler.finish(&mut self.arena);
            let candidate_count = candidates.len();
            let split = self.split_by_popularity(candidates, cutoff);
            let popular_count = split.populars.len();
            let merged = if popular_count >= self.max_buckets {
                self.merge_unpopulars_into_populars(split)
            } else {
                self.merge_populars_into_unpopulars(split)
            };
            debug!(
                "segment {}: {} inputs, {} candidates, {} popular (cutoff {}), {} buckets",
                segment,
                inputs,
                candidate_count,
                popular_count,
                cutoff,
                merged.len()
            );
            results.push(merged.into_iter().map(|id| self.arena.take(id)).collect());
        }
        results
    }

    fn split_by_popularity(&self, candidates: Vec<BucketId>, cutoff: u64) -> PopularitySplit {
        let mut split = PopularitySplit {
            regulars: Vec::with_capacity(candidates.len()),
            regulars_count: 0,
            populars: VecDeque::new(),
            populars_count: 0,
        };
        for id in candidates {
            let bucket = self.arena.get(id);
            if bucket.equals_count() >= cutoff {
                split.populars_count += bucket.total();
                split.populars.push_back(id);
            } else {
                split.regulars_count += bucket.total();
                split.regulars.push(id);
            }
        }
        split
    }

    /// Keep every popular bucket and sample the regulars into the rest
    fn merge_populars_into_unpopulars(&mut self, split: PopularitySplit) -> Vec<BucketId> {
        let PopularitySplit {
            regulars,
            regulars_count,
            mut populars,
            ..
        } = split;
        let capacity = self.max_buckets - populars.len() - 1;
        let offset = draw_offset(&mut self.rng, regulars_count);
        let mut sampler = BucketSampler::new(capacity, regulars_count, offset, false);
        for regular in regulars {
            while let Some(&popular) = populars.front() {
                if self.arena.get(popular).value() < self.arena.get(regular).value() {
                    populars.pop_front();
                    sampler.append(&mut self.arena, popular);
                } else {
                    break;
                }
            }
            sampler.add(&mut self.arena, regular);
        }
        for popular in populars {
            sampler.append(&mut self.arena, popular);
        }
        sampler.finish(&mut self.arena)
    }

    /// Sample the popular buckets, folding every regular bucket into the
    /// next kept popular one
    fn merge_unpopulars_into_populars(&mut self, split: PopularitySplit) -> Vec<BucketId> {
        let PopularitySplit {
            regulars,
            populars,
            populars_count,
            ..
        } = split;
        let offset = draw_offset(&mut self.rng, populars_count);
        let mut sampler = BucketSampler::new(self.max_buckets - 1, populars_count, offset, false);
        let mut unpopulars = regulars.into_iter().peekable();
        for popular in populars {
            if !sampler.add(&mut self.arena, popular) {
                continue;
            }
            while let Some(&regular) = unpopulars.peek() {
                if self.arena.get(regular).value() <= self.arena.get(popular).value() {
                    unpopulars.next();
                    self.arena.merge_up(regular, popular);
                } else {
                    break;
                }
            }
        }
        // whatever is left sorts after the last kept popular bucket
        let mut last = None;
        for regular in unpopulars {
            if let Some(previous) = last {
                self.arena.merge_up(previous, regular);
            }
            last = Some(regular);
        }
        sampler.finish_with(&mut self.arena, last)
    }
}

fn draw_offset(rng: &mut Option<StdRng>, expected_inputs: u64) -> u64 {
    match rng {
        Some(rng) if expected_inputs > 0 => rng.gen_range(0..expected_inputs),
        _ => 0,
    }
}
