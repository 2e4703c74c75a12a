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

//! The file-system-backed [`Repository`] implementation: sharded object
//! layout, hash-while-write through a temp file, and commit-ref
//! compare-and-swap realized with the same temp-and-rename pattern.

use std::fs;
use std::io;
use std::io::Write as _;
use std::path::Path;
use std::path::PathBuf;
use std::pin::Pin;

use async_trait::async_trait;
use sha1::Digest as _;
use sha1::Sha1;
use tempfile::NamedTempFile;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt as _;

use crate::config::RepositoryConfig;
use crate::context::RequestContext;
use crate::digest::Digest;
use crate::disk::paths;
use crate::error::RepositoryError;
use crate::error::RepositoryResult;
use crate::file_util;
use crate::model::BlobMetadata;
use crate::model::ChasmBlob;
use crate::model::ChasmStream;
use crate::model::CommitRef;
use crate::model::WriteResult;
use crate::object_id::CommitId;
use crate::repository::Repository;
use crate::serializer::Serializer;

/// A [`Repository`] backed by a directory tree: `objects/<prefix>/<rest>`
/// for content-addressed blobs/trees/commits and `refs/<ns>/<branch>.commit`
/// for mutable branch pointers.
#[derive(Debug)]
pub struct DiskRepository {
    root: PathBuf,
    serializer: Box<dyn Serializer>,
    config: RepositoryConfig,
    context: Option<RequestContext>,
}

fn not_found_to_option<T>(result: io::Result<T>) -> RepositoryResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(RepositoryError::backend(err)),
    }
}

impl DiskRepository {
    /// Opens (creating if necessary) a disk repository rooted at `root`,
    /// using `serializer` for every tree/commit/ref encoding. The codec
    /// choice is part of the store's persistent format: don't change it for
    /// an existing root.
    pub fn open(
        root: impl Into<PathBuf>,
        serializer: impl Serializer + 'static,
        config: RepositoryConfig,
    ) -> io::Result<Self> {
        let root = root.into();
        file_util::create_or_reuse_dir(&root.join("objects"))?;
        file_util::create_or_reuse_dir(&paths::refs_root(&root))?;
        Ok(Self {
            root,
            serializer: Box::new(serializer),
            config,
            context: None,
        })
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn correlation_id(&self) -> Option<&str> {
        self.context.as_ref().and_then(RequestContext::correlation_id)
    }

    fn object_path(&self, digest: &Digest) -> PathBuf {
        paths::object_path(&self.root, digest, self.config.prefix_len)
    }

    fn metadata_path(&self, digest: &Digest) -> PathBuf {
        paths::object_metadata_path(&self.root, digest, self.config.prefix_len)
    }

    async fn read_metadata_sidecar(&self, digest: &Digest) -> RepositoryResult<Option<BlobMetadata>> {
        let path = self.metadata_path(digest);
        let bytes = not_found_to_option(tokio::fs::read(&path).await)?;
        let Some(bytes) = bytes else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(RepositoryError::backend)
    }

    async fn write_metadata_sidecar(
        &self,
        digest: &Digest,
        metadata: &BlobMetadata,
    ) -> RepositoryResult<()> {
        let path = self.metadata_path(digest);
        let bytes = serde_json::to_vec(metadata).map_err(RepositoryError::backend)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(RepositoryError::backend)
    }

    /// Writes `bytes` to `path` through a temp-file-in-the-same-directory,
    /// fsync, rename, so a reader never observes a partial file.
    async fn persist_via_temp_file(&self, dir: &Path, path: &Path, bytes: Vec<u8>) -> RepositoryResult<()> {
        file_util::create_or_reuse_dir(dir).map_err(RepositoryError::backend)?;
        let dir = dir.to_path_buf();
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || -> io::Result<()> {
            let mut temp_file = NamedTempFile::new_in(&dir)?;
            temp_file.write_all(&bytes)?;
            file_util::persist_content_addressed_temp_file(temp_file, &path)?;
            Ok(())
        })
        .await
        .expect("blocking persist task panicked")
        .map_err(RepositoryError::backend)
    }
}

#[async_trait]
impl Repository for DiskRepository {
    fn serializer(&self) -> &dyn Serializer {
        self.serializer.as_ref()
    }

    fn max_dop(&self) -> Option<usize> {
        self.config.max_dop
    }

    async fn exists(&self, digest: &Digest) -> RepositoryResult<bool> {
        let path = self.object_path(digest);
        let result = file_util::retry_on_contention(
            self.config.retry_attempts,
            self.config.retry_delay,
            || async { tokio::fs::metadata(&path).await.map(|_| ()) },
        )
        .await;
        Ok(not_found_to_option(result)?.is_some())
    }

    async fn read(&self, digest: &Digest) -> RepositoryResult<Option<ChasmBlob>> {
        tracing::debug!(digest = %digest, correlation_id = ?self.correlation_id(), "disk read");
        let path = self.object_path(digest);
        let result = file_util::retry_on_contention(
            self.config.retry_attempts,
            self.config.retry_delay,
            || async { tokio::fs::read(&path).await },
        )
        .await;
        let Some(bytes) = not_found_to_option(result)? else {
            return Ok(None);
        };
        let metadata = self.read_metadata_sidecar(digest).await?;
        Ok(Some(ChasmBlob::new(bytes, metadata)))
    }

    async fn read_stream(&self, digest: &Digest) -> RepositoryResult<Option<ChasmStream>> {
        tracing::debug!(digest = %digest, correlation_id = ?self.correlation_id(), "disk read_stream");
        let path = self.object_path(digest);
        let result = file_util::retry_on_contention(
            self.config.retry_attempts,
            self.config.retry_delay,
            || async { tokio::fs::File::open(&path).await },
        )
        .await;
        let Some(file) = not_found_to_option(result)? else {
            return Ok(None);
        };
        let metadata = self.read_metadata_sidecar(digest).await?;
        let reader: Pin<Box<dyn AsyncRead + Send>> = Box::pin(file);
        Ok(Some(ChasmStream::new(reader, metadata)))
    }

    async fn write_stream(
        &self,
        mut reader: Pin<Box<dyn AsyncRead + Send>>,
        metadata: Option<BlobMetadata>,
        force_overwrite: bool,
    ) -> RepositoryResult<WriteResult<Digest>> {
        let objects_dir = self.root.join("objects");
        file_util::create_or_reuse_dir(&objects_dir).map_err(RepositoryError::backend)?;

        let mut temp_file =
            NamedTempFile::new_in(&objects_dir).map_err(RepositoryError::backend)?;
        let mut hasher = Sha1::new();
        let mut buf = vec![0u8; 16 << 10];
        loop {
            let bytes_read = reader
                .read(&mut buf)
                .await
                .map_err(RepositoryError::backend)?;
            if bytes_read == 0 {
                break;
            }
            let chunk = &buf[..bytes_read];
            temp_file
                .as_file_mut()
                .write_all(chunk)
                .map_err(RepositoryError::backend)?;
            hasher.update(chunk);
        }

        let digest = Digest::from_array(hasher.finalize().into());
        let target = self.object_path(&digest);
        file_util::create_or_reuse_dir(target.parent().unwrap())
            .map_err(RepositoryError::backend)?;

        // Link the temp file into place under its content-addressed name
        // rather than renaming it there: `link` fails with `AlreadyExists`
        // if a concurrent writer of the same content won the race, which is
        // how two racing writers of identical bytes can agree that exactly
        // one of them created the object.
        let created = match fs::hard_link(temp_file.path(), &target) {
            Ok(()) => true,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && !force_overwrite => false,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                file_util::persist_content_addressed_temp_file(temp_file, &target)
                    .map_err(RepositoryError::backend)?;
                true
            }
            Err(err) => return Err(RepositoryError::backend(err)),
        };

        if let Some(metadata) = &metadata {
            self.write_metadata_sidecar(&digest, metadata).await?;
        }

        tracing::debug!(digest = %digest, created, correlation_id = ?self.correlation_id(), "disk write_stream");
        Ok(WriteResult::new(digest, created))
    }

    async fn list_names(&self) -> RepositoryResult<Vec<String>> {
        let refs_root = paths::refs_root(&self.root);
        let mut entries = match tokio::fs::read_dir(&refs_root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(RepositoryError::backend(err)),
        };
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(RepositoryError::backend)? {
            if !entry.file_type().await.map_err(RepositoryError::backend)?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str().and_then(paths::unescape_segment) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    async fn list_branches(&self, namespace: &str) -> RepositoryResult<Vec<CommitRef>> {
        let dir = paths::ref_namespace_dir(&self.root, namespace);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(RepositoryError::backend(err)),
        };
        let mut refs = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(RepositoryError::backend)? {
            let Some(file_name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let Some(branch) = paths::branch_name_from_entry(&file_name) else {
                continue;
            };
            let bytes = tokio::fs::read(entry.path())
                .await
                .map_err(RepositoryError::backend)?;
            let commit_id = self.serializer.deserialize_commit_id(&bytes)?;
            refs.push(CommitRef::new(branch, commit_id));
        }
        refs.sort_by(|a, b| a.branch.cmp(&b.branch));
        Ok(refs)
    }

    async fn read_commit_ref(
        &self,
        namespace: &str,
        branch: &str,
    ) -> RepositoryResult<Option<CommitRef>> {
        let path = paths::ref_path(&self.root, namespace, branch);
        let Some(bytes) = not_found_to_option(tokio::fs::read(&path).await)? else {
            return Ok(None);
        };
        let commit_id = self.serializer.deserialize_commit_id(&bytes)?;
        Ok(Some(CommitRef::new(branch.to_string(), commit_id)))
    }

    async fn write_commit_ref(
        &self,
        previous_commit_id: Option<CommitId>,
        namespace: &str,
        commit_ref: CommitRef,
    ) -> RepositoryResult<()> {
        if namespace.is_empty() {
            return Err(RepositoryError::invalid_argument("namespace"));
        }
        if commit_ref.branch.is_empty() {
            return Err(RepositoryError::invalid_argument("branch"));
        }
        if commit_ref.commit_id.is_empty() {
            return Err(RepositoryError::invalid_argument("commitRef"));
        }

        let path = paths::ref_path(&self.root, namespace, &commit_ref.branch);
        let current_bytes = not_found_to_option(tokio::fs::read(&path).await)?;
        let current_id = current_bytes
            .as_deref()
            .map(|bytes| self.serializer.deserialize_commit_id(bytes))
            .transpose()?;

        let should_write = match current_id {
            None => match previous_commit_id {
                None => true,
                Some(_) => {
                    return Err(RepositoryError::concurrency_conflict(
                        namespace,
                        &commit_ref.branch,
                    ));
                }
            },
            Some(current) if current == commit_ref.commit_id => {
                // Idempotent: the ref already names the intended value.
                false
            }
            Some(current) => match previous_commit_id {
                Some(previous) if previous == current => true,
                _ => {
                    return Err(RepositoryError::concurrency_conflict(
                        namespace,
                        &commit_ref.branch,
                    ));
                }
            },
        };

        if should_write {
            let bytes = self.serializer.serialize_commit_id(&commit_ref.commit_id);
            let dir = paths::ref_namespace_dir(&self.root, namespace);
            self.persist_via_temp_file(&dir, &path, bytes).await?;
            tracing::debug!(
                namespace,
                branch = %commit_ref.branch,
                correlation_id = ?self.correlation_id(),
                "disk write_commit_ref"
            );
        } else {
            tracing::debug!(
                namespace,
                branch = %commit_ref.branch,
                "disk write_commit_ref rejected: ref already at target value"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use assert_matches::assert_matches;

    use super::*;
    use crate::file_util::BlockingAsyncReader;
    use crate::object_id::TreeId;
    use crate::serializer::BinarySerializer;

    fn repo(dir: &tempfile::TempDir) -> DiskRepository {
        DiskRepository::open(dir.path(), BinarySerializer::new(), RepositoryConfig::default())
            .unwrap()
    }

    fn reader(bytes: &'static [u8]) -> Pin<Box<dyn AsyncRead + Send>> {
        Box::pin(BlockingAsyncReader::new(Cursor::new(bytes)))
    }

    #[tokio::test]
    async fn write_then_read_round_trips_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let backend = repo(&dir);
        let result = backend
            .write_stream(reader(b"abc"), None, false)
            .await
            .unwrap();
        assert!(result.created);
        assert_eq!(result.id.to_hex(), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert!(backend.exists(&result.id).await.unwrap());
        let blob = backend.read(&result.id).await.unwrap().unwrap();
        assert_eq!(blob.bytes, b"abc");
    }

    #[tokio::test]
    async fn second_write_of_same_content_is_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let backend = repo(&dir);
        let first = backend
            .write_stream(reader(b"abc"), None, false)
            .await
            .unwrap();
        let second = backend
            .write_stream(reader(b"abc"), None, false)
            .await
            .unwrap();
        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn read_of_absent_digest_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = repo(&dir);
        let missing = Digest::hash(b"never written");
        assert_eq!(backend.read(&missing).await.unwrap(), None);
        assert!(!backend.exists(&missing).await.unwrap());
    }

    #[tokio::test]
    async fn metadata_sidecar_round_trips_through_read() {
        let dir = tempfile::tempdir().unwrap();
        let backend = repo(&dir);
        let metadata = BlobMetadata {
            content_type: Some("text/plain".to_string()),
            filename: Some("hello.txt".to_string()),
        };
        let result = backend
            .write_stream(reader(b"hello"), Some(metadata.clone()), false)
            .await
            .unwrap();
        let blob = backend.read(&result.id).await.unwrap().unwrap();
        assert_eq!(blob.metadata, Some(metadata));
    }

    #[tokio::test]
    async fn ref_cas_create_then_conflict_then_replace() {
        let dir = tempfile::tempdir().unwrap();
        let backend = repo(&dir);
        let c0 = CommitId::new(Digest::hash(b"c0"));
        let c1 = CommitId::new(Digest::hash(b"c1"));
        let c2 = CommitId::new(Digest::hash(b"c2"));

        backend
            .write_commit_ref(None, "repo", CommitRef::new("main", c0))
            .await
            .unwrap();
        assert_eq!(
            backend.read_commit_ref("repo", "main").await.unwrap(),
            Some(CommitRef::new("main", c0))
        );

        // Wrong previous: conflict, ref unchanged.
        let conflict = backend
            .write_commit_ref(Some(c1), "repo", CommitRef::new("main", c2))
            .await;
        assert_matches!(conflict, Err(RepositoryError::ConcurrencyConflict { .. }));
        assert_eq!(
            backend.read_commit_ref("repo", "main").await.unwrap(),
            Some(CommitRef::new("main", c0))
        );

        // Correct previous: replace.
        backend
            .write_commit_ref(Some(c0), "repo", CommitRef::new("main", c1))
            .await
            .unwrap();
        assert_eq!(
            backend.read_commit_ref("repo", "main").await.unwrap(),
            Some(CommitRef::new("main", c1))
        );
    }

    #[tokio::test]
    async fn ref_write_with_no_previous_against_existing_ref_is_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let backend = repo(&dir);
        let c0 = CommitId::new(Digest::hash(b"c0"));
        let c1 = CommitId::new(Digest::hash(b"c1"));
        backend
            .write_commit_ref(None, "repo", CommitRef::new("main", c0))
            .await
            .unwrap();
        let result = backend
            .write_commit_ref(None, "repo", CommitRef::new("main", c1))
            .await;
        assert_matches!(result, Err(RepositoryError::ConcurrencyConflict { .. }));
    }

    #[tokio::test]
    async fn ref_write_to_its_own_current_value_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = repo(&dir);
        let c0 = CommitId::new(Digest::hash(b"c0"));
        backend
            .write_commit_ref(None, "repo", CommitRef::new("main", c0))
            .await
            .unwrap();
        backend
            .write_commit_ref(Some(c0), "repo", CommitRef::new("main", c0))
            .await
            .unwrap();
        assert_eq!(
            backend.read_commit_ref("repo", "main").await.unwrap(),
            Some(CommitRef::new("main", c0))
        );
    }

    #[tokio::test]
    async fn write_commit_ref_rejects_blank_namespace_or_branch() {
        let dir = tempfile::tempdir().unwrap();
        let backend = repo(&dir);
        let c0 = CommitId::new(Digest::hash(b"c0"));
        assert_matches!(
            backend
                .write_commit_ref(None, "", CommitRef::new("main", c0))
                .await,
            Err(RepositoryError::InvalidArgument { argument: "namespace" })
        );
        assert_matches!(
            backend
                .write_commit_ref(None, "repo", CommitRef::new("", c0))
                .await,
            Err(RepositoryError::InvalidArgument { argument: "branch" })
        );
    }

    #[tokio::test]
    async fn write_commit_ref_rejects_empty_commit_id() {
        let dir = tempfile::tempdir().unwrap();
        let backend = repo(&dir);
        assert_matches!(
            backend
                .write_commit_ref(None, "repo", CommitRef::new("main", CommitId::empty()))
                .await,
            Err(RepositoryError::InvalidArgument { argument: "commitRef" })
        );
    }

    #[tokio::test]
    async fn list_names_and_branches_reflect_written_refs() {
        let dir = tempfile::tempdir().unwrap();
        let backend = repo(&dir);
        let c0 = CommitId::new(Digest::hash(b"c0"));
        backend
            .write_commit_ref(None, "repo one", CommitRef::new("main", c0))
            .await
            .unwrap();
        backend
            .write_commit_ref(None, "repo one", CommitRef::new("dev", c0))
            .await
            .unwrap();

        assert_eq!(backend.list_names().await.unwrap(), vec!["repo one"]);
        let mut branches = backend.list_branches("repo one").await.unwrap();
        branches.sort_by(|a, b| a.branch.cmp(&b.branch));
        assert_eq!(
            branches,
            vec![CommitRef::new("dev", c0), CommitRef::new("main", c0)]
        );
    }

    #[tokio::test]
    async fn write_tree_then_read_tree_via_default_methods() {
        use crate::model::NodeKind;
        use crate::model::TreeNode;
        use crate::model::TreeNodeMap;

        let dir = tempfile::tempdir().unwrap();
        let backend = repo(&dir);
        let d1 = Digest::hash(b"leaf");
        let tree = TreeNodeMap::new(vec![TreeNode::new("a", NodeKind::Blob, d1)]).unwrap();
        let tree_id: TreeId = backend.write_tree(&tree).await.unwrap();
        let read_back = backend.read_tree(&tree_id).await.unwrap().unwrap();
        assert_eq!(read_back, tree);
    }
}
