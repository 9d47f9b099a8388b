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

//! Index statistics
//!
//! [`IndexStatisticsGenerator`] scans an index in ascending key order,
//! feeds every key through a [`Sampler`] split by column prefix, and
//! returns one [`Histogram`] per prefix length.

use std::fmt;

use log::{debug, info};

use crate::core::{IndexId, Result, Value};
use crate::storage::{GroupStore, IndexScanRequest, IndexScanSelector, KeyRange, RowStream};

use super::bucket::Bucket;
use super::config::SamplerConfig;
use super::sampler::Sampler;
use super::splitter::PrefixSplitter;

/// One histogram step
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramEntry {
    /// Key prefix this step ends at
    pub key: Vec<Value>,
    /// Entries equal to `key`
    pub equal_count: u64,
    /// Entries between the previous step and `key`
    pub less_count: u64,
    /// Distinct prefixes between the previous step and `key`
    pub distinct_count: u64,
}

impl From<Bucket<Vec<Value>>> for HistogramEntry {
    fn from(bucket: Bucket<Vec<Value>>) -> Self {
        let equal_count = bucket.equals_count();
        let less_count = bucket.less_than_count();
        let distinct_count = bucket.less_than_distincts_count();
        Self {
            key: bucket.into_value(),
            equal_count,
            less_count,
            distinct_count,
        }
    }
}

/// Distribution of the first `column_count` index columns
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub column_count: usize,
    pub entries: Vec<HistogramEntry>,
}

impl Histogram {
    /// Entries represented by the histogram
    pub fn total_count(&self) -> u64 {
        self.entries.iter().map(|e| e.equal_count + e.less_count).sum()
    }

    /// Distinct prefixes represented by the histogram
    pub fn distinct_count(&self) -> u64 {
        self.entries.iter().map(|e| e.distinct_count + 1).sum()
    }
}

impl fmt::Display for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "histogram({} columns)", self.column_count)?;
        for e in &self.entries {
            let key: Vec<String> = e.key.iter().map(|v| v.to_string()).collect();
            writeln!(
                f,
                "  ({}) eq={} lt={} distinct={}",
                key.join(", "),
                e.equal_count,
                e.less_count,
                e.distinct_count
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexStatistics {
    pub index: IndexId,
    /// Index entries scanned
    pub row_count: u64,
    /// One histogram per column prefix, shortest first
    pub histograms: Vec<Histogram>,
}

impl IndexStatistics {
    pub fn histogram(&self, column_count: usize) -> Option<&Histogram> {
        self.histograms.iter().find(|h| h.column_count == column_count)
    }
}

#[derive(Debug, Clone, Default)]
pub struct IndexStatisticsGenerator {
    config: SamplerConfig,
}

impl IndexStatisticsGenerator {
    pub fn new(config: SamplerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Build statistics for one index
    ///
    /// Entries are counted first so the sampler knows how many inputs to
    /// expect, then scanned again for sampling. Group index entries only
    /// need the index's root table to be present.
    pub fn generate(&self, store: &dyn GroupStore, index: IndexId) -> Result<IndexStatistics> {
        let def = store.schema().index(index)?;
        let columns = def.columns.len();
        let request = IndexScanRequest {
            index,
            range: KeyRange::unbounded(),
            ascending: vec![true; columns],
            collators: vec![None; columns],
            selector: IndexScanSelector::left_join_after(def, def.root_table)?,
        };

        let row_count = count_rows(store.scan_index(&request)?.as_mut())?;
        debug!("index '{}': sampling {} entries", def.name, row_count);

        let mut sampler = Sampler::new(
            Box::new(PrefixSplitter::new(columns)),
            &self.config,
            row_count,
        )?;
        let mut stream = store.scan_index(&request)?;
        while let Some(row) = stream.next_row()? {
            sampler.visit(&row.into_values())?;
        }
        drop(stream);
        sampler.finish();

        let histograms: Vec<Histogram> = sampler
            .to_buckets()
            .into_iter()
            .enumerate()
            .map(|(i, buckets)| Histogram {
                column_count: i + 1,
                entries: buckets.into_iter().map(HistogramEntry::from).collect(),
            })
            .collect();
        info!(
            "index '{}': {} entries, {} histograms",
            def.name,
            row_count,
            histograms.len()
        );
        Ok(IndexStatistics {
            index,
            row_count,
            histograms,
        })
    }
}

fn count_rows(stream: &mut dyn RowStream) -> Result<u64> {
    let mut count = 0;
    while stream.next_row()?.is_some() {
        count += 1;
    }
    Ok(count)
}
