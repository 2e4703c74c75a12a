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

//! The codec boundary between the logical data model and stored bytes.
//!
//! A digest is computed over the *serialized* form of an object, so the
//! codec identity is part of a store's persistent format: switching codecs
//! for an existing store changes every digest it would produce. Pick one at
//! repository construction and keep it.

mod binary;
mod json;

pub use binary::BinarySerializer;
pub use json::JsonSerializer;

use crate::digest::Digest;
use crate::error::SerializationError;
use crate::model::Commit;
use crate::model::TreeNodeMap;
use crate::object_id::CommitId;

/// Maps the logical data model to bytes and back, with round-trip fidelity:
/// `deserialize(serialize(v)) == v` for every entity this contract covers.
///
/// `deserialize` of a zero-length span yields the default value for the
/// target type rather than an error; the repository layer relies on this to
/// treat an empty payload as "absent".
pub trait Serializer: Send + Sync + std::fmt::Debug {
    fn serialize_digest(&self, digest: &Digest) -> Vec<u8>;
    fn deserialize_digest(&self, bytes: &[u8]) -> Result<Digest, SerializationError>;

    fn serialize_commit_id(&self, id: &CommitId) -> Vec<u8>;
    fn deserialize_commit_id(&self, bytes: &[u8]) -> Result<CommitId, SerializationError>;

    fn serialize_tree(&self, tree: &TreeNodeMap) -> Result<Vec<u8>, SerializationError>;
    fn deserialize_tree(&self, bytes: &[u8]) -> Result<TreeNodeMap, SerializationError>;

    fn serialize_commit(&self, commit: &Commit) -> Result<Vec<u8>, SerializationError>;
    fn deserialize_commit(&self, bytes: &[u8]) -> Result<Commit, SerializationError>;
}
