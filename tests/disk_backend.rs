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

//! Disk-backend-specific behavior: on-disk layout, metadata sidecars, and
//! concurrent writers racing to create the same object.

use std::sync::Arc;

use chasm::model::BlobMetadata;
use chasm::model::CommitRef;
use chasm::BinarySerializer;
use chasm::CommitId;
use chasm::Digest;
use chasm::DiskRepository;
use chasm::Repository;
use chasm::RepositoryConfig;

fn open_repo() -> (tempfile::TempDir, DiskRepository) {
    let dir = tempfile::tempdir().unwrap();
    let repo = DiskRepository::open(dir.path(), BinarySerializer::new(), RepositoryConfig::default())
        .unwrap();
    (dir, repo)
}

#[tokio::test]
async fn object_lands_at_sharded_path() {
    let (dir, repo) = open_repo();
    let result = repo.write_bytes(b"abc".to_vec(), None, false).await.unwrap();
    let expected = dir
        .path()
        .join("objects")
        .join("a999")
        .join("3e364706816aba3e25717850c26c9cd0d89d");
    assert!(expected.is_file());
    assert_eq!(std::fs::read(&expected).unwrap(), b"abc");
    assert_eq!(result.id, Digest::hash(b"abc"));
}

#[tokio::test]
async fn ref_file_lands_at_escaped_namespace_and_branch_path() {
    let (dir, repo) = open_repo();
    let commit_id = CommitId::new(Digest::hash(b"commit"));
    repo.write_commit_ref(None, "repo one", CommitRef::new("feature/x", commit_id))
        .await
        .unwrap();
    let expected = dir
        .path()
        .join("refs")
        .join("repo%20one")
        .join("feature%2Fx.commit");
    assert!(expected.is_file());
}

#[tokio::test]
async fn metadata_sidecar_is_written_next_to_the_object() {
    let (dir, repo) = open_repo();
    let metadata = BlobMetadata {
        content_type: Some("image/png".to_string()),
        filename: Some("logo.png".to_string()),
    };
    let result = repo
        .write_bytes(b"\x89PNG".to_vec(), Some(metadata.clone()), false)
        .await
        .unwrap();
    let sidecar = dir
        .path()
        .join("objects")
        .join(&result.id.to_hex()[..4])
        .join(format!("{}.metadata", &result.id.to_hex()[4..]));
    assert!(sidecar.is_file());

    let blob = repo.read(&result.id).await.unwrap().unwrap();
    assert_eq!(blob.metadata, Some(metadata));
}

#[tokio::test]
async fn write_without_metadata_leaves_no_sidecar() {
    let (dir, repo) = open_repo();
    let result = repo.write_bytes(b"no metadata here".to_vec(), None, false).await.unwrap();
    let sidecar = dir
        .path()
        .join("objects")
        .join(&result.id.to_hex()[..4])
        .join(format!("{}.metadata", &result.id.to_hex()[4..]));
    assert!(!sidecar.exists());
    assert_eq!(repo.read(&result.id).await.unwrap().unwrap().metadata, None);
}

#[tokio::test]
async fn force_overwrite_replaces_an_existing_object() {
    let (_dir, repo) = open_repo();
    let first = repo
        .write_bytes(
            b"abc".to_vec(),
            Some(BlobMetadata {
                content_type: Some("text/plain".to_string()),
                filename: None,
            }),
            false,
        )
        .await
        .unwrap();
    let second = repo
        .write_bytes(
            b"abc".to_vec(),
            Some(BlobMetadata {
                content_type: Some("application/octet-stream".to_string()),
                filename: None,
            }),
            true,
        )
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    let blob = repo.read(&first.id).await.unwrap().unwrap();
    assert_eq!(
        blob.metadata.unwrap().content_type.as_deref(),
        Some("application/octet-stream")
    );
}

#[tokio::test]
async fn concurrent_writers_of_identical_content_agree_on_exactly_one_creator() {
    let (_dir, repo) = open_repo();
    let repo = Arc::new(repo);
    let mut handles = Vec::new();
    for _ in 0..8 {
        let repo = Arc::clone(&repo);
        handles.push(tokio::spawn(async move {
            repo.write_bytes(b"racing content".to_vec(), None, false).await.unwrap()
        }));
    }
    let mut created_count = 0;
    for handle in handles {
        let result = handle.await.unwrap();
        assert_eq!(result.id, Digest::hash(b"racing content"));
        if result.created {
            created_count += 1;
        }
    }
    assert_eq!(created_count, 1);
}

#[tokio::test]
async fn list_names_and_list_branches_reflect_nested_refs() {
    let (_dir, repo) = open_repo();
    let c1 = CommitId::new(Digest::hash(b"c1"));
    let c2 = CommitId::new(Digest::hash(b"c2"));
    repo.write_commit_ref(None, "team-a", CommitRef::new("main", c1)).await.unwrap();
    repo.write_commit_ref(None, "team-b", CommitRef::new("main", c2)).await.unwrap();
    repo.write_commit_ref(None, "team-b", CommitRef::new("staging", c1)).await.unwrap();

    let mut names = repo.list_names().await.unwrap();
    names.sort();
    assert_eq!(names, vec!["team-a", "team-b"]);

    let mut branches = repo.list_branches("team-b").await.unwrap();
    branches.sort_by(|a, b| a.branch.cmp(&b.branch));
    assert_eq!(
        branches,
        vec![CommitRef::new("main", c2), CommitRef::new("staging", c1)]
    );
}

#[tokio::test]
async fn reading_an_unwritten_object_is_absent_not_an_error() {
    let (_dir, repo) = open_repo();
    let digest = Digest::hash(b"never written to this repo");
    assert_eq!(repo.read(&digest).await.unwrap(), None);
    assert!(repo.read_stream(&digest).await.unwrap().is_none());
}
