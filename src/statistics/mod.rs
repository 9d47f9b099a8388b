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

//! Index statistics sampling
//!
//! - [`Sampler`] - bounded, one-pass histogram construction over sorted input
//! - [`BucketSampler`] - systematic weighted selection of buckets
//! - [`BucketArena`] - slot storage with a hard cap on buckets ever created
//! - [`IndexStatisticsGenerator`] - histograms per column prefix of an index

pub mod arena;
pub mod bucket;
pub mod bucket_sampler;
pub mod config;
pub mod index_stats;
pub mod sampler;
pub mod splitter;

pub use arena::{BucketArena, BucketId};
pub use bucket::Bucket;
pub use bucket_sampler::{BucketSampler, EqualsStats};
pub use config::{SamplerConfig, DEFAULT_HISTOGRAM_BUCKETS, OVERSAMPLE_FACTOR};
pub use index_stats::{Histogram, HistogramEntry, IndexStatistics, IndexStatisticsGenerator};
pub use sampler::Sampler;
pub use splitter::{PrefixSplitter, RunLengthSplit, Splitter};
