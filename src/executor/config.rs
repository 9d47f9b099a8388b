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

//! Executor configuration
//!
//! Settings threaded through [`Api`](super::Api) into every operator and
//! cursor. Can be parsed from a `key=value&key=value` parameter string:
//!
//! ```text
//! lookahead_quantum=8&bloom_fpp=0.001&check_cancellation=true
//! ```

use std::str::FromStr;

use crate::core::{Error, Result};

/// Default number of outstanding lookahead requests
pub const DEFAULT_LOOKAHEAD_QUANTUM: usize = 1;

/// Default false-positive rate of bloom filters built by semi-joins
pub const DEFAULT_BLOOM_FPP: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutorConfig {
    /// Lookahead used by pipelined operators when the plan gives none
    pub lookahead_quantum: usize,
    /// Target false-positive rate for bloom filters
    pub bloom_false_positive_rate: f64,
    /// Index entries prefetched per storage request
    pub index_scan_batch: usize,
    /// Check the cancellation flag before every row
    pub check_cancellation: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            lookahead_quantum: DEFAULT_LOOKAHEAD_QUANTUM,
            bloom_false_positive_rate: DEFAULT_BLOOM_FPP,
            index_scan_batch: 1,
            check_cancellation: true,
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookahead_quantum(mut self, quantum: usize) -> Self {
        self.lookahead_quantum = quantum;
        self
    }

    pub fn with_bloom_false_positive_rate(mut self, rate: f64) -> Self {
        self.bloom_false_positive_rate = rate;
        self
    }

    pub fn with_index_scan_batch(mut self, batch: usize) -> Self {
        self.index_scan_batch = batch;
        self
    }

    pub fn with_check_cancellation(mut self, check: bool) -> Self {
        self.check_cancellation = check;
        self
    }

    /// Reject settings no operator can run with
    pub fn validate(&self) -> Result<()> {
        if self.lookahead_quantum == 0 {
            return Err(Error::invalid_argument("lookahead_quantum must be positive"));
        }
        if !(self.bloom_false_positive_rate > 0.0 && self.bloom_false_positive_rate < 1.0) {
            return Err(Error::invalid_argument(format!(
                "bloom false positive rate {} is not in (0, 1)",
                self.bloom_false_positive_rate
            )));
        }
        if self.index_scan_batch == 0 {
            return Err(Error::invalid_argument("index_scan_batch must be positive"));
        }
        Ok(())
    }
}

fn parse_param<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| Error::invalid_argument(format!("invalid value '{}' for {}", value, key)))
}

impl FromStr for ExecutorConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut config = ExecutorConfig::default();

        for param in s.split('&').filter(|p| !p.is_empty()) {
            let mut parts = param.splitn(2, '=');
            let key = parts.next().unwrap_or("").trim();
            let value = parts.next().unwrap_or("").trim();

            match key {
                // lookahead_quantum=8
                "lookahead_quantum" | "lookahead" => {
                    config.lookahead_quantum = parse_param(key, value)?;
                }
                // bloom_fpp=0.001
                "bloom_false_positive_rate" | "bloom_fpp" => {
                    config.bloom_false_positive_rate = parse_param(key, value)?;
                }
                "index_scan_batch" => {
                    config.index_scan_batch = parse_param(key, value)?;
                }
                // check_cancellation=on|off|true|false|1|0
                "check_cancellation" => {
                    config.check_cancellation = match value.to_lowercase().as_str() {
                        "on" | "true" | "1" => true,
                        "off" | "false" | "0" => false,
                        _ => {
                            return Err(Error::invalid_argument(format!(
                                "invalid value '{}' for {}",
                                value, key
                            )))
                        }
                    };
                }
                _ => {
                    log::debug!("ignoring unknown executor parameter '{}'", key);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExecutorConfig::default();
        assert_eq!(config.lookahead_quantum, 1);
        assert_eq!(config.bloom_false_positive_rate, 0.01);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_params() {
        let config: ExecutorConfig = "lookahead_quantum=8&bloom_fpp=0.001&check_cancellation=off&color=blue"
            .parse()
            .unwrap();
        assert_eq!(config.lookahead_quantum, 8);
        assert_eq!(config.bloom_false_positive_rate, 0.001);
        assert!(!config.check_cancellation);
        assert_eq!(config.index_scan_batch, 1);
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(matches!(
            "lookahead_quantum=many".parse::<ExecutorConfig>(),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            "lookahead_quantum=0".parse::<ExecutorConfig>(),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            "bloom_fpp=1.5".parse::<ExecutorConfig>(),
            Err(Error::InvalidArgument(_))
        ));
    }
}
