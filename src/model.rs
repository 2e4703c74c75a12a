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

//! The logical data model: tree nodes, commits, audits, blobs, and the
//! uniform write-result wrapper.

use std::pin::Pin;

use tokio::io::AsyncRead;

use crate::object_id::CommitId;
use crate::object_id::TreeId;

/// A name plus timestamp record attached to a [`Commit`] (author or
/// committer).
///
/// The timestamp is represented as two 64-bit tick counts, matching the
/// source format this store's commit codecs speak: `ticks` since a fixed
/// epoch, and `offset_ticks` the UTC offset at the time of the audit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Audit {
    pub ticks: i64,
    pub offset_ticks: i64,
}

/// An [`Audit`] paired with its (possibly empty) name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamedAudit {
    pub name: String,
    pub audit: Audit,
}

impl NamedAudit {
    pub fn new(name: impl Into<String>, ticks: i64, offset_ticks: i64) -> Self {
        Self {
            name: name.into(),
            audit: Audit {
                ticks,
                offset_ticks,
            },
        }
    }
}

/// Tags whether a [`TreeNode`] names a leaf object or a subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Blob,
    Tree,
}

/// One entry of a [`TreeNodeMap`]: a non-empty name, its kind, and the
/// digest of the object it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub kind: NodeKind,
    pub target: crate::digest::Digest,
}

impl TreeNode {
    pub fn new(name: impl Into<String>, kind: NodeKind, target: crate::digest::Digest) -> Self {
        Self {
            name: name.into(),
            kind,
            target,
        }
    }
}

/// Failure building a [`TreeNodeMap`] from candidate nodes.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TreeNodeMapError {
    #[error("tree node name must not be empty")]
    EmptyName,
    #[error("duplicate tree node name {0:?}")]
    DuplicateName(String),
}

/// An ordered, immutable sequence of [`TreeNode`] entries, sorted ascending
/// by name under ordinal (byte-wise) comparison, with unique names. The
/// empty map is a well-defined singleton.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TreeNodeMap {
    nodes: Vec<TreeNode>,
}

impl TreeNodeMap {
    /// The well-defined empty map.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a map from arbitrarily-ordered nodes, sorting them and
    /// rejecting empty or duplicate names.
    pub fn new(mut nodes: Vec<TreeNode>) -> Result<Self, TreeNodeMapError> {
        if nodes.iter().any(|node| node.name.is_empty()) {
            return Err(TreeNodeMapError::EmptyName);
        }
        nodes.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        for pair in nodes.windows(2) {
            if pair[0].name == pair[1].name {
                return Err(TreeNodeMapError::DuplicateName(pair[0].name.clone()));
            }
        }
        Ok(Self { nodes })
    }

    /// Builds a map from nodes that are already sorted and deduplicated,
    /// without re-validating. Used by codecs deserializing trusted bytes.
    pub(crate) fn from_sorted_unchecked(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter()
    }

    pub fn get(&self, name: &str) -> Option<&TreeNode> {
        self.nodes
            .binary_search_by(|node| node.name.as_bytes().cmp(name.as_bytes()))
            .ok()
            .map(|index| &self.nodes[index])
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }
}

impl<'a> IntoIterator for &'a TreeNodeMap {
    type Item = &'a TreeNode;
    type IntoIter = std::slice::Iter<'a, TreeNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

/// An immutable record binding a tree to zero or more parent commits, with
/// authorship metadata. Parent order is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Commit {
    pub parents: Vec<CommitId>,
    pub tree_id: TreeId,
    pub author: NamedAudit,
    pub committer: NamedAudit,
    pub message: Option<String>,
}

/// The pair ⟨branch, commit id⟩, scoped under a containing namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRef {
    pub branch: String,
    pub commit_id: CommitId,
}

impl CommitRef {
    pub fn new(branch: impl Into<String>, commit_id: CommitId) -> Self {
        Self {
            branch: branch.into(),
            commit_id,
        }
    }
}

/// Optional descriptive metadata stashed alongside a blob's bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct BlobMetadata {
    #[serde(rename = "contentType", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(rename = "filename", skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl BlobMetadata {
    pub fn is_empty(&self) -> bool {
        self.content_type.is_none() && self.filename.is_none()
    }
}

/// A payload materialized fully in memory, plus optional metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChasmBlob {
    pub bytes: Vec<u8>,
    pub metadata: Option<BlobMetadata>,
}

impl ChasmBlob {
    pub fn new(bytes: Vec<u8>, metadata: Option<BlobMetadata>) -> Self {
        Self { bytes, metadata }
    }
}

/// A payload yielded lazily, plus optional metadata.
pub struct ChasmStream {
    pub reader: Pin<Box<dyn AsyncRead + Send>>,
    pub metadata: Option<BlobMetadata>,
}

impl ChasmStream {
    pub fn new(reader: Pin<Box<dyn AsyncRead + Send>>, metadata: Option<BlobMetadata>) -> Self {
        Self { reader, metadata }
    }
}

/// The outcome of a content-addressed write: the id it now lives at, and
/// whether this call was the one that actually materialized it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteResult<T> {
    pub id: T,
    pub created: bool,
}

impl<T> WriteResult<T> {
    pub fn new(id: T, created: bool) -> Self {
        Self { id, created }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::Digest;

    #[test]
    fn tree_node_map_sorts_by_name() {
        let d1 = Digest::hash(b"one");
        let d2 = Digest::hash(b"two");
        let map = TreeNodeMap::new(vec![
            TreeNode::new("b", NodeKind::Tree, d2),
            TreeNode::new("a", NodeKind::Blob, d1),
        ])
        .unwrap();
        let names: Vec<_> = map.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn tree_node_map_rejects_duplicate_names() {
        let d = Digest::hash(b"x");
        let err = TreeNodeMap::new(vec![
            TreeNode::new("a", NodeKind::Blob, d),
            TreeNode::new("a", NodeKind::Tree, d),
        ])
        .unwrap_err();
        assert_eq!(err, TreeNodeMapError::DuplicateName("a".to_string()));
    }

    #[test]
    fn tree_node_map_rejects_empty_names() {
        let d = Digest::hash(b"x");
        let err = TreeNodeMap::new(vec![TreeNode::new("", NodeKind::Blob, d)]).unwrap_err();
        assert_eq!(err, TreeNodeMapError::EmptyName);
    }

    #[test]
    fn empty_map_is_a_singleton_value() {
        assert_eq!(TreeNodeMap::empty(), TreeNodeMap::new(vec![]).unwrap());
        assert!(TreeNodeMap::empty().is_empty());
    }

    #[test]
    fn get_finds_node_by_name_via_binary_search() {
        let d = Digest::hash(b"x");
        let map = TreeNodeMap::new(vec![
            TreeNode::new("b", NodeKind::Blob, d),
            TreeNode::new("a", NodeKind::Tree, d),
        ])
        .unwrap();
        assert_eq!(map.get("a").unwrap().kind, NodeKind::Tree);
        assert!(map.get("missing").is_none());
    }

    #[test]
    fn blob_metadata_empty_when_both_fields_absent() {
        assert!(BlobMetadata::default().is_empty());
        assert!(
            !BlobMetadata {
                content_type: Some("text/plain".to_string()),
                filename: None,
            }
            .is_empty()
        );
    }
}
