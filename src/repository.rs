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

//! The abstract repository contract: a capability interface a backend must
//! implement, plus a default-methods layer for everything derivable from
//! those primitives (batch fan-out, tree/commit lookups through the chain
//! ref → commit → tree, and the `writeTree(parents, …)` convenience that
//! builds a commit on top of a freshly-written tree).
//!
//! Backends specialise a default method only when they can do better than
//! the generic fan-out this module provides.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::io::Cursor;
use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::StreamExt as _;
use tokio::io::AsyncRead;

use crate::digest::Digest;
use crate::error::RepositoryResult;
use crate::file_util::BlockingAsyncReader;
use crate::model::BlobMetadata;
use crate::model::ChasmBlob;
use crate::model::ChasmStream;
use crate::model::Commit;
use crate::model::CommitRef;
use crate::model::NamedAudit;
use crate::model::TreeNodeMap;
use crate::model::WriteResult;
use crate::object_id::CommitId;
use crate::object_id::TreeId;
use crate::serializer::Serializer;

/// Abstract repository over the Object, Tree, Commit, and CommitRef
/// namespaces.
#[async_trait]
pub trait Repository: Any + Send + Sync + Debug {
    /// The codec this repository was constructed with. Its identity is part
    /// of the store's persistent format.
    fn serializer(&self) -> &dyn Serializer;

    /// Bound on batch fan-out concurrency. `None` means unbounded.
    fn max_dop(&self) -> Option<usize> {
        None
    }

    async fn exists(&self, digest: &Digest) -> RepositoryResult<bool>;

    /// Reads an object fully into memory. Returns `None` when absent.
    async fn read(&self, digest: &Digest) -> RepositoryResult<Option<ChasmBlob>>;

    /// Reads an object lazily. Returns `None` when absent.
    async fn read_stream(&self, digest: &Digest) -> RepositoryResult<Option<ChasmStream>>;

    /// Hashes `reader` while writing it to storage; the resulting digest
    /// names the object. A pre-existing object with the same digest is left
    /// untouched (`created = false`) unless `force_overwrite` is set.
    async fn write_stream(
        &self,
        reader: Pin<Box<dyn AsyncRead + Send>>,
        metadata: Option<BlobMetadata>,
        force_overwrite: bool,
    ) -> RepositoryResult<WriteResult<Digest>>;

    /// Enumerates commit-ref namespaces.
    async fn list_names(&self) -> RepositoryResult<Vec<String>>;

    /// Enumerates branches under one namespace.
    async fn list_branches(&self, namespace: &str) -> RepositoryResult<Vec<CommitRef>>;

    async fn read_commit_ref(
        &self,
        namespace: &str,
        branch: &str,
    ) -> RepositoryResult<Option<CommitRef>>;

    /// Compare-and-swap a commit ref: `previous_commit_id` is the caller's
    /// belief about the ref's current value (`None` meaning "I believe it
    /// doesn't exist yet"). Succeeds only if that belief still matches the
    /// stored value at the moment of the write; otherwise the write is
    /// rejected and the ref is left untouched.
    async fn write_commit_ref(
        &self,
        previous_commit_id: Option<CommitId>,
        namespace: &str,
        commit_ref: CommitRef,
    ) -> RepositoryResult<()>;

    // ---- default layer -------------------------------------------------

    /// Writes an in-memory buffer through [`Self::write_stream`].
    async fn write_bytes(
        &self,
        bytes: Vec<u8>,
        metadata: Option<BlobMetadata>,
        force_overwrite: bool,
    ) -> RepositoryResult<WriteResult<Digest>> {
        let reader = Box::pin(BlockingAsyncReader::new(Cursor::new(bytes)));
        self.write_stream(reader, metadata, force_overwrite).await
    }

    /// Reads many objects, fanning out with up to [`Self::max_dop`]
    /// concurrent reads. Absent objects are omitted from the result map.
    async fn read_batch(
        &self,
        digests: &[Digest],
    ) -> RepositoryResult<HashMap<Digest, ChasmBlob>> {
        if digests.is_empty() {
            return Ok(HashMap::new());
        }
        let concurrency = self.max_dop().unwrap_or(digests.len()).max(1);
        let results: Vec<_> = futures::stream::iter(digests.iter().copied())
            .map(|digest| async move { (digest, self.read(&digest).await) })
            .buffer_unordered(concurrency)
            .collect()
            .await;
        let mut map = HashMap::with_capacity(results.len());
        for (digest, result) in results {
            if let Some(blob) = result? {
                map.insert(digest, blob);
            }
        }
        Ok(map)
    }

    /// Writes many buffers, fanning out with up to [`Self::max_dop`]
    /// concurrent writes. A failure in one write does not cancel siblings;
    /// the first error encountered is returned after all writes settle.
    async fn write_batch(
        &self,
        blobs: Vec<(Vec<u8>, Option<BlobMetadata>)>,
        force_overwrite: bool,
    ) -> RepositoryResult<Vec<WriteResult<Digest>>> {
        let concurrency = self.max_dop().unwrap_or(blobs.len().max(1));
        let results: Vec<_> = futures::stream::iter(blobs)
            .map(|(bytes, metadata)| async move {
                self.write_bytes(bytes, metadata, force_overwrite).await
            })
            .buffer_unordered(concurrency.max(1))
            .collect()
            .await;
        results.into_iter().collect()
    }

    /// Reads a tree object and decodes it with [`Self::serializer`].
    async fn read_tree(&self, tree_id: &TreeId) -> RepositoryResult<Option<TreeNodeMap>> {
        let Some(blob) = self.read(&tree_id.digest()).await? else {
            return Ok(None);
        };
        Ok(Some(self.serializer().deserialize_tree(&blob.bytes)?))
    }

    /// Reads many trees, fanning out with up to [`Self::max_dop`] concurrent
    /// reads. Absent ids are omitted from the result map.
    async fn read_tree_batch(
        &self,
        tree_ids: &[TreeId],
    ) -> RepositoryResult<HashMap<TreeId, TreeNodeMap>> {
        if tree_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let digests: Vec<_> = tree_ids.iter().map(TreeId::digest).collect();
        let blobs = self.read_batch(&digests).await?;
        let mut map = HashMap::with_capacity(blobs.len());
        for tree_id in tree_ids {
            if let Some(blob) = blobs.get(&tree_id.digest()) {
                map.insert(*tree_id, self.serializer().deserialize_tree(&blob.bytes)?);
            }
        }
        Ok(map)
    }

    /// Reads the commit's tree, or `None` if either the commit or the tree
    /// is absent.
    async fn read_tree_for_commit(
        &self,
        commit_id: &CommitId,
    ) -> RepositoryResult<Option<TreeNodeMap>> {
        let Some(commit) = self.read_commit(commit_id).await? else {
            return Ok(None);
        };
        self.read_tree(&commit.tree_id).await
    }

    /// Resolves a branch to its commit's tree, or `None` if the ref, the
    /// commit, or the tree is absent.
    async fn read_tree_for_branch(
        &self,
        namespace: &str,
        branch: &str,
    ) -> RepositoryResult<Option<TreeNodeMap>> {
        let Some(commit_ref) = self.read_commit_ref(namespace, branch).await? else {
            return Ok(None);
        };
        self.read_tree_for_commit(&commit_ref.commit_id).await
    }

    /// Serializes and writes a tree object, returning its digest as a
    /// [`TreeId`].
    async fn write_tree(&self, tree: &TreeNodeMap) -> RepositoryResult<TreeId> {
        let bytes = self.serializer().serialize_tree(tree)?;
        let result = self.write_bytes(bytes, None, false).await?;
        Ok(TreeId::new(result.id))
    }

    /// Reads a commit object and decodes it with [`Self::serializer`].
    async fn read_commit(&self, commit_id: &CommitId) -> RepositoryResult<Option<Commit>> {
        let Some(blob) = self.read(&commit_id.digest()).await? else {
            return Ok(None);
        };
        Ok(Some(self.serializer().deserialize_commit(&blob.bytes)?))
    }

    /// Serializes and writes a commit object, returning its digest as a
    /// [`CommitId`].
    async fn write_commit(&self, commit: &Commit) -> RepositoryResult<CommitId> {
        let bytes = self.serializer().serialize_commit(commit)?;
        let result = self.write_bytes(bytes, None, false).await?;
        Ok(CommitId::new(result.id))
    }

    /// Writes `tree`, then constructs and writes a commit pointing to it.
    async fn commit_tree(
        &self,
        parents: Vec<CommitId>,
        tree: TreeNodeMap,
        author: NamedAudit,
        committer: NamedAudit,
        message: Option<String>,
    ) -> RepositoryResult<CommitId> {
        let tree_id = self.write_tree(&tree).await?;
        let commit = Commit {
            parents,
            tree_id,
            author,
            committer,
            message,
        };
        self.write_commit(&commit).await
    }
}

impl dyn Repository {
    /// Recovers the concrete backend type behind a trait object, mirroring
    /// the `downcast_ref` escape hatch other pluggable-backend traits in
    /// this lineage expose.
    pub fn downcast_ref<T: Repository>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref()
    }
}
