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

//! Key splitting and run-length encoding
//!
//! A [`Splitter`] turns one sorted input key into one value per segment,
//! e.g. the column prefixes of an index key. [`RunLengthSplit`] watches
//! each segment for value changes and reports `(segment, value, count)`
//! once a run ends.

use std::cmp::Ordering;
use std::fmt::Debug;

use crate::core::{Error, Result, Value};

/// Splits an input into one value per segment
pub trait Splitter<T>: Send {
    fn segments(&self) -> usize;

    fn split(&self, input: &T) -> Vec<T>;
}

/// Segment `i` is the first `i + 1` columns of the key
#[derive(Debug, Clone)]
pub struct PrefixSplitter {
    columns: usize,
}

impl PrefixSplitter {
    pub fn new(columns: usize) -> Self {
        Self { columns }
    }
}

impl Splitter<Vec<Value>> for PrefixSplitter {
    fn segments(&self) -> usize {
        self.columns
    }

    fn split(&self, input: &Vec<Value>) -> Vec<Vec<Value>> {
        (1..=self.columns)
            .map(|n| input[..n.min(input.len())].to_vec())
            .collect()
    }
}

/// Change detection over the segments of a sorted input
pub struct RunLengthSplit<T> {
    splitter: Box<dyn Splitter<T>>,
    runs: Vec<Option<(T, u64)>>,
}

impl<T: Ord + Debug> RunLengthSplit<T> {
    pub fn new(splitter: Box<dyn Splitter<T>>) -> Self {
        let runs = (0..splitter.segments()).map(|_| None).collect();
        Self { splitter, runs }
    }

    pub fn segments(&self) -> usize {
        self.runs.len()
    }

    /// Feed one input; `handle` receives every run the input ends
    pub fn visit(
        &mut self,
        input: &T,
        mut handle: impl FnMut(usize, T, u64),
    ) -> Result<()> {
        let values = self.splitter.split(input);
        if values.len() != self.runs.len() {
            return Err(Error::invalid_argument(format!(
                "splitter produced {} segments, expected {}",
                values.len(),
                self.runs.len()
            )));
        }
        for (segment, value) in values.into_iter().enumerate() {
            let order = self.runs[segment].as_ref().map(|(current, _)| value.cmp(current));
            match order {
                None => self.runs[segment] = Some((value, 1)),
                Some(Ordering::Equal) => {
                    if let Some((_, count)) = &mut self.runs[segment] {
                        *count += 1;
                    }
                }
                Some(Ordering::Greater) => {
                    if let Some((ended, count)) = self.runs[segment].replace((value, 1)) {
                        handle(segment, ended, count);
                    }
                }
                Some(Ordering::Less) => {
                    return Err(Error::invalid_argument(format!(
                        "input out of order in segment {}: {:?} after {:?}",
                        segment, value, self.runs[segment]
                    )))
                }
            }
        }
        Ok(())
    }

    /// Report the runs still open
    pub fn finish(&mut self, mut handle: impl FnMut(usize, T, u64)) {
        for (segment, run) in self.runs.iter_mut().enumerate() {
            if let Some((value, count)) = run.take() {
                handle(segment, value, count);
            }
        }
    }
}
