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

//! Human-readable JSON codec, for debugging and interop. Digests are
//! formatted as 40-character lowercase hex; field names are `parents`,
//! `treeId`, `author`, `committer`, `message`, `name`, `kind`, `nodeId`,
//! `nodes`.

use serde::Deserialize;
use serde::Serialize;

use crate::digest::Digest;
use crate::error::SerializationError;
use crate::model::Commit;
use crate::model::NamedAudit;
use crate::model::NodeKind;
use crate::model::TreeNode;
use crate::model::TreeNodeMap;
use crate::object_id::CommitId;
use crate::object_id::TreeId;
use crate::serializer::Serializer;

/// Human-readable JSON codec, for debugging and interop.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl JsonSerializer {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize, Deserialize)]
struct AuditJson {
    name: String,
    ticks: i64,
    #[serde(rename = "offsetTicks")]
    offset_ticks: i64,
}

impl From<&NamedAudit> for AuditJson {
    fn from(audit: &NamedAudit) -> Self {
        Self {
            name: audit.name.clone(),
            ticks: audit.audit.ticks,
            offset_ticks: audit.audit.offset_ticks,
        }
    }
}

impl From<AuditJson> for NamedAudit {
    fn from(json: AuditJson) -> Self {
        Self {
            name: json.name,
            audit: crate::model::Audit {
                ticks: json.ticks,
                offset_ticks: json.offset_ticks,
            },
        }
    }
}

#[derive(Serialize, Deserialize)]
struct CommitJson {
    parents: Vec<String>,
    #[serde(rename = "treeId")]
    tree_id: String,
    author: AuditJson,
    committer: AuditJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct TreeNodeJson {
    name: String,
    kind: String,
    #[serde(rename = "nodeId")]
    node_id: String,
}

#[derive(Serialize, Deserialize)]
struct TreeNodeMapJson {
    nodes: Vec<TreeNodeJson>,
}

fn parse_digest(hex: &str, entity: &'static str) -> Result<Digest, SerializationError> {
    Digest::from_hex(hex).map_err(|_| SerializationError::Malformed {
        entity,
        reason: format!("{hex:?} is not a valid 40-character hex digest"),
    })
}

impl Serializer for JsonSerializer {
    fn serialize_digest(&self, digest: &Digest) -> Vec<u8> {
        serde_json::to_vec(&digest.to_hex()).expect("hex string always serializes")
    }

    fn deserialize_digest(&self, bytes: &[u8]) -> Result<Digest, SerializationError> {
        if bytes.is_empty() {
            return Ok(Digest::EMPTY);
        }
        let hex: String =
            serde_json::from_slice(bytes).map_err(|err| SerializationError::Malformed {
                entity: "Digest",
                reason: err.to_string(),
            })?;
        parse_digest(&hex, "Digest")
    }

    fn serialize_commit_id(&self, id: &CommitId) -> Vec<u8> {
        self.serialize_digest(&id.digest())
    }

    fn deserialize_commit_id(&self, bytes: &[u8]) -> Result<CommitId, SerializationError> {
        self.deserialize_digest(bytes).map(CommitId::new)
    }

    fn serialize_tree(&self, tree: &TreeNodeMap) -> Result<Vec<u8>, SerializationError> {
        let json = TreeNodeMapJson {
            nodes: tree
                .iter()
                .map(|node| TreeNodeJson {
                    name: node.name.clone(),
                    kind: match node.kind {
                        NodeKind::Blob => "blob".to_string(),
                        NodeKind::Tree => "tree".to_string(),
                    },
                    node_id: node.target.to_hex(),
                })
                .collect(),
        };
        serde_json::to_vec(&json).map_err(|err| SerializationError::Encode {
            entity: "TreeNodeMap",
            reason: err.to_string(),
        })
    }

    fn deserialize_tree(&self, bytes: &[u8]) -> Result<TreeNodeMap, SerializationError> {
        if bytes.is_empty() {
            return Ok(TreeNodeMap::empty());
        }
        let json: TreeNodeMapJson =
            serde_json::from_slice(bytes).map_err(|err| SerializationError::Malformed {
                entity: "TreeNodeMap",
                reason: err.to_string(),
            })?;
        let mut nodes = Vec::with_capacity(json.nodes.len());
        for node in json.nodes {
            let kind = match node.kind.as_str() {
                "blob" => NodeKind::Blob,
                "tree" => NodeKind::Tree,
                other => {
                    return Err(SerializationError::Malformed {
                        entity: "TreeNode.kind",
                        reason: format!("unrecognized kind {other:?}"),
                    });
                }
            };
            let target = parse_digest(&node.node_id, "TreeNode.nodeId")?;
            nodes.push(TreeNode {
                name: node.name,
                kind,
                target,
            });
        }
        // Trusts that deserialized nodes came from a previously-validated
        // serialize() call; a hand-edited file with duplicate/unsorted names
        // would surface later as an ordering mismatch, not a parse error.
        nodes.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        Ok(TreeNodeMap::from_sorted_unchecked(nodes))
    }

    fn serialize_commit(&self, commit: &Commit) -> Result<Vec<u8>, SerializationError> {
        let json = CommitJson {
            parents: commit.parents.iter().map(|id| id.to_hex()).collect(),
            tree_id: commit.tree_id.to_hex(),
            author: AuditJson::from(&commit.author),
            committer: AuditJson::from(&commit.committer),
            message: commit.message.clone(),
        };
        serde_json::to_vec(&json).map_err(|err| SerializationError::Encode {
            entity: "Commit",
            reason: err.to_string(),
        })
    }

    fn deserialize_commit(&self, bytes: &[u8]) -> Result<Commit, SerializationError> {
        if bytes.is_empty() {
            return Ok(Commit::default());
        }
        let json: CommitJson =
            serde_json::from_slice(bytes).map_err(|err| SerializationError::Malformed {
                entity: "Commit",
                reason: err.to_string(),
            })?;
        let mut parents = Vec::with_capacity(json.parents.len());
        for hex in &json.parents {
            parents.push(CommitId::new(parse_digest(hex, "Commit.parents[i]")?));
        }
        let tree_id = TreeId::new(parse_digest(&json.tree_id, "Commit.treeId")?);
        Ok(Commit {
            parents,
            tree_id,
            author: json.author.into(),
            committer: json.committer.into(),
            message: json.message,
        })
    }
}
