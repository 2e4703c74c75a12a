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

//! Error taxonomy for the codec and repository layers.

use thiserror::Error;

use crate::digest::DigestError;

/// Error raised by a [`Serializer`](crate::serializer::Serializer)
/// implementation.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("cannot deserialize {entity}: expected at least {expected} bytes, got {actual}")]
    TooShort {
        entity: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("cannot deserialize {entity}: {reason}")]
    Malformed {
        entity: &'static str,
        reason: String,
    },
    #[error("cannot serialize {entity}: {reason}")]
    Encode {
        entity: &'static str,
        reason: String,
    },
}

/// Error that may occur at the repository surface.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A required argument was missing or blank. Names the argument.
    #[error("invalid argument: {argument}")]
    InvalidArgument { argument: &'static str },

    #[error("invalid digest: {0}")]
    Digest(#[from] DigestError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),

    /// Compare-and-swap on a commit ref detected a mismatch.
    #[error("concurrency conflict on ref {namespace}/{branch}")]
    ConcurrencyConflict { namespace: String, branch: String },

    /// Underlying storage error not covered by the variants above.
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Cooperative cancellation fired mid-operation.
    #[error("operation cancelled")]
    Cancelled,
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

impl RepositoryError {
    /// Wraps an arbitrary I/O or storage error as [`RepositoryError::Backend`].
    pub fn backend(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Backend(source.into())
    }

    pub fn invalid_argument(argument: &'static str) -> Self {
        Self::InvalidArgument { argument }
    }

    pub fn concurrency_conflict(namespace: impl Into<String>, branch: impl Into<String>) -> Self {
        Self::ConcurrencyConflict {
            namespace: namespace.into(),
            branch: branch.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_error_composes_via_from() {
        let err: RepositoryError = DigestError::InvalidDigestLength {
            expected: 20,
            actual: 3,
        }
        .into();
        assert!(matches!(err, RepositoryError::Digest(_)));
    }

    #[test]
    fn serialization_error_composes_via_from() {
        let err: RepositoryError = SerializationError::TooShort {
            entity: "CommitId",
            expected: 20,
            actual: 4,
        }
        .into();
        assert!(matches!(err, RepositoryError::Serialization(_)));
    }

    #[test]
    fn concurrency_conflict_names_ref() {
        let err = RepositoryError::concurrency_conflict("repo", "main");
        assert_eq!(err.to_string(), "concurrency conflict on ref repo/main");
    }
}
