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

// Integration tests for histogram sampling and index statistics

use std::sync::Arc;

use groupflow::statistics::{Bucket, PrefixSplitter};
use groupflow::{
    DataType, IndexSpec, IndexStatisticsGenerator, MemoryStore, Sampler, SamplerConfig,
    SchemaBuilder, TableSpec, Value,
};

fn sample(values: &[i64], config: &SamplerConfig) -> Vec<Bucket<Vec<Value>>> {
    let mut sampler =
        Sampler::new(Box::new(PrefixSplitter::new(1)), config, values.len() as u64).unwrap();
    for v in values {
        sampler.visit(&vec![Value::integer(*v)]).unwrap();
    }
    sampler.finish();
    sampler.to_buckets().remove(0)
}

fn key(bucket: &Bucket<Vec<Value>>) -> i64 {
    bucket.value()[0].as_int64().unwrap()
}

fn check_histogram(buckets: &[Bucket<Vec<Value>>], values: &[i64], max_buckets: usize) {
    assert!(!buckets.is_empty());
    assert!(buckets.len() <= max_buckets);
    assert!(buckets.windows(2).all(|w| key(&w[0]) < key(&w[1])));
    assert_eq!(key(buckets.last().unwrap()), *values.iter().max().unwrap());
    assert_eq!(buckets.iter().map(Bucket::total).sum::<u64>(), values.len() as u64);

    let mut distinct = values.to_vec();
    distinct.dedup();
    let represented: u64 = buckets.iter().map(|b| b.less_than_distincts_count() + 1).sum();
    assert_eq!(represented, distinct.len() as u64);
}

#[test]
fn test_uniform_input_is_conserved() {
    let values: Vec<i64> = (0..5000).map(|i| i / 3).collect();
    for max_buckets in [1, 4, 32] {
        let config = SamplerConfig::new().with_max_buckets(max_buckets).with_seed(11);
        check_histogram(&sample(&values, &config), &values, max_buckets);
    }
}

#[test]
fn test_skewed_input_keeps_heavy_value() {
    let mut values: Vec<i64> = (0..100).collect();
    values.extend(std::iter::repeat(50).take(3000));
    values.sort_unstable();
    let config = SamplerConfig::new().with_max_buckets(8);
    let buckets = sample(&values, &config);
    check_histogram(&buckets, &values, 8);
    let heavy = buckets.iter().find(|b| key(b) == 50).unwrap();
    assert_eq!(heavy.equals_count(), 3001);
}

#[test]
fn test_seeded_sampling_is_repeatable() {
    let values: Vec<i64> = (0..2000).collect();
    let config = SamplerConfig::new().with_max_buckets(10).with_seed(42);
    let first: Vec<i64> = sample(&values, &config).iter().map(key).collect();
    let second: Vec<i64> = sample(&values, &config).iter().map(key).collect();
    assert_eq!(first, second);
}

#[test]
fn test_config_from_params() {
    let config: SamplerConfig = "max_buckets=16&oversample=4&seed=7".parse().unwrap();
    assert_eq!(config.max_buckets, 16);
    assert_eq!(config.oversample_size(), 64);
    assert_eq!(config.seed, Some(7));
    assert!("max_buckets=0".parse::<SamplerConfig>().is_err());
    assert!("seed=x".parse::<SamplerConfig>().is_err());
}

#[test]
fn test_index_statistics_over_skewed_names() {
    let _ = env_logger::builder().is_test(true).try_init();
    let schema = SchemaBuilder::new()
        .table(
            TableSpec::new("customer")
                .add_primary_key("cid", DataType::Integer)
                .add("name", DataType::Text),
        )
        .index(IndexSpec::new("customer_name").column("customer", "name"))
        .build()
        .unwrap();
    let store = Arc::new(MemoryStore::new(Arc::clone(&schema)));
    let mut cid = 0;
    let mut insert = |name: String| {
        cid += 1;
        store
            .insert("customer", vec![Value::integer(cid), Value::text(name)])
            .unwrap();
    };
    for i in 0..200 {
        insert(format!("n{:02}", i % 20));
    }
    for _ in 0..500 {
        insert("m".to_string());
    }

    let generator =
        IndexStatisticsGenerator::new(SamplerConfig::new().with_max_buckets(8).with_seed(5)).unwrap();
    let index = schema.index_by_name("customer_name").unwrap().id;
    let stats = generator.generate(store.as_ref(), index).unwrap();
    assert_eq!(stats.row_count, 700);

    let names = stats.histogram(1).unwrap();
    assert!(names.entries.len() <= 8);
    assert_eq!(names.total_count(), 700);
    assert_eq!(names.distinct_count(), 21);
    let heavy = names
        .entries
        .iter()
        .find(|e| e.key[0] == Value::text("m"))
        .unwrap();
    assert_eq!(heavy.equal_count, 500);
}
