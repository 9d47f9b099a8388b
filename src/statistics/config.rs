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

//! Sampler configuration

use std::str::FromStr;

use crate::core::{Error, Result};

/// Buckets kept per histogram when nothing else is configured
pub const DEFAULT_HISTOGRAM_BUCKETS: usize = 32;

/// Candidate buckets sampled per final bucket before the popularity split
pub const OVERSAMPLE_FACTOR: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    /// Upper bound on buckets per segment
    pub max_buckets: usize,
    pub oversample_factor: usize,
    /// A bucket is popular when its equals-count reaches
    /// mean + `popularity_std_devs` standard deviations
    pub popularity_std_devs: f64,
    /// Seed for the sampling offsets; without one sampling starts at the
    /// first input
    pub seed: Option<u64>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_buckets: DEFAULT_HISTOGRAM_BUCKETS,
            oversample_factor: OVERSAMPLE_FACTOR,
            popularity_std_devs: 1.0,
            seed: None,
        }
    }
}

impl SamplerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_buckets(mut self, max_buckets: usize) -> Self {
        self.max_buckets = max_buckets;
        self
    }

    pub fn with_oversample_factor(mut self, factor: usize) -> Self {
        self.oversample_factor = factor;
        self
    }

    pub fn with_popularity_std_devs(mut self, std_devs: f64) -> Self {
        self.popularity_std_devs = std_devs;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Candidate buckets kept per segment during the first pass
    pub fn oversample_size(&self) -> usize {
        self.max_buckets.saturating_mul(self.oversample_factor)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_buckets == 0 {
            return Err(Error::invalid_argument("max_buckets must be positive"));
        }
        if self.oversample_factor == 0 {
            return Err(Error::invalid_argument("oversample_factor must be positive"));
        }
        if !self.popularity_std_devs.is_finite() {
            return Err(Error::invalid_argument(format!(
                "popularity_std_devs {} is not finite",
                self.popularity_std_devs
            )));
        }
        Ok(())
    }
}

impl FromStr for SamplerConfig {
    type Err = Error;

    /// Parse `max_buckets=16&seed=7` style parameters; unknown keys are ignored
    fn from_str(s: &str) -> Result<Self> {
        let mut config = SamplerConfig::default();
        for param in s.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = param.split_once('=').unwrap_or((param, ""));
            let (key, value) = (key.trim(), value.trim());
            let invalid = || Error::invalid_argument(format!("invalid value '{}' for {}", value, key));
            match key {
                "max_buckets" | "buckets" => {
                    config.max_buckets = value.parse().map_err(|_| invalid())?;
                }
                "oversample_factor" | "oversample" => {
                    config.oversample_factor = value.parse().map_err(|_| invalid())?;
                }
                "popularity_std_devs" => {
                    config.popularity_std_devs = value.parse().map_err(|_| invalid())?;
                }
                "seed" => {
                    config.seed = Some(value.parse().map_err(|_| invalid())?);
                }
                _ => {
                    log::debug!("ignoring unknown sampler parameter '{}'", key);
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
    fn test_defaults() {
        let config = SamplerConfig::default();
        assert_eq!(config.max_buckets, 32);
        assert_eq!(config.oversample_size(), 1600);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_parse() {
        let config: SamplerConfig = "buckets=4&seed=11&popularity_std_devs=2.5&x=y".parse().unwrap();
        assert_eq!(config.max_buckets, 4);
        assert_eq!(config.seed, Some(11));
        assert_eq!(config.popularity_std_devs, 2.5);
        assert!("max_buckets=0".parse::<SamplerConfig>().is_err());
        assert!("seed=abc".parse::<SamplerConfig>().is_err());
    }
}
