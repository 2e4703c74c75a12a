// Copyright 2026 The Chasm Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Immutable, construction-time configuration for a repository backend.

use std::time::Duration;

use crate::digest::DEFAULT_SHARD_PREFIX_LEN;

/// Set once at construction and never mutated afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Sharded-path prefix length, in bytes of the digest (so 2 = "ab/cdef…").
    pub prefix_len: usize,
    /// Bound on batch fan-out concurrency. `None` means unbounded.
    pub max_dop: Option<usize>,
    /// Number of attempts (including the first) for a contention-retried
    /// disk operation.
    pub retry_attempts: usize,
    /// Delay between contention-retry attempts.
    pub retry_delay: Duration,
    /// Default used for `force_overwrite` when a call site omits it.
    pub force_overwrite_default: bool,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            prefix_len: DEFAULT_SHARD_PREFIX_LEN,
            max_dop: None,
            retry_attempts: 10,
            retry_delay: Duration::from_millis(25),
            force_overwrite_default: false,
        }
    }
}

impl RepositoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix_len(mut self, prefix_len: usize) -> Self {
        self.prefix_len = prefix_len;
        self
    }

    pub fn with_max_dop(mut self, max_dop: Option<usize>) -> Self {
        self.max_dop = max_dop;
        self
    }

    pub fn with_retry_policy(mut self, attempts: usize, delay: Duration) -> Self {
        self.retry_attempts = attempts;
        self.retry_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let config = RepositoryConfig::default();
        assert_eq!(config.prefix_len, 2);
        assert_eq!(config.max_dop, None);
        assert_eq!(config.retry_attempts, 10);
        assert_eq!(config.retry_delay, Duration::from_millis(25));
    }

    #[test]
    fn builder_methods_override_fields() {
        let config = RepositoryConfig::new()
            .with_prefix_len(3)
            .with_max_dop(Some(4))
            .with_retry_policy(5, Duration::from_millis(10));
        assert_eq!(config.prefix_len, 3);
        assert_eq!(config.max_dop, Some(4));
        assert_eq!(config.retry_attempts, 5);
        assert_eq!(config.retry_delay, Duration::from_millis(10));
    }
}
