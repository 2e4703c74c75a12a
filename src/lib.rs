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

//! Chasm is a content-addressed object store: blobs, trees, and commits
//! bound into a history graph, addressed by the digest of their serialized
//! form and reachable through mutable, compare-and-swap commit refs.
//!
//! [`Repository`] is the abstract contract; [`disk::DiskRepository`] is the
//! filesystem-backed implementation.

pub mod config;
pub mod context;
pub mod digest;
pub mod disk;
pub mod error;
mod file_util;
mod hex_util;
pub mod model;
pub mod object_id;
pub mod repository;
pub mod serializer;

pub use config::RepositoryConfig;
pub use context::RequestContext;
pub use digest::Digest;
pub use digest::DigestError;
pub use disk::DiskRepository;
pub use error::RepositoryError;
pub use error::RepositoryResult;
pub use object_id::CommitId;
pub use object_id::TreeId;
pub use repository::Repository;
pub use serializer::BinarySerializer;
pub use serializer::JsonSerializer;
pub use serializer::Serializer;
