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

//! Compact binary codec: length-prefixed records over the logical model.
//!
//! All integers are little-endian. A commit is ⟨parents as a
//! length-prefixed list of digests, tree id digest, author audit, committer
//! audit, optional message⟩; an audit is ⟨length-prefixed name, ticks,
//! offset ticks⟩; a tree node map is ⟨count, nodes⟩ where each node is
//! ⟨length-prefixed name, kind byte, digest⟩.

use crate::digest::DIGEST_LEN;
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

const NO_MESSAGE: i32 = -1;

/// Length-prefixed binary codec, the preferred choice for production use.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinarySerializer;

impl BinarySerializer {
    pub fn new() -> Self {
        Self
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, entity: &'static str, len: usize) -> Result<&'a [u8], SerializationError> {
        if self.bytes.len() < self.pos + len {
            return Err(SerializationError::TooShort {
                entity,
                expected: self.pos + len,
                actual: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn take_u32(&mut self, entity: &'static str) -> Result<u32, SerializationError> {
        let bytes = self.take(entity, 4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn take_i32(&mut self, entity: &'static str) -> Result<i32, SerializationError> {
        let bytes = self.take(entity, 4)?;
        Ok(i32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn take_i64(&mut self, entity: &'static str) -> Result<i64, SerializationError> {
        let bytes = self.take(entity, 8)?;
        Ok(i64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn take_digest(&mut self, entity: &'static str) -> Result<Digest, SerializationError> {
        let bytes = self.take(entity, DIGEST_LEN)?;
        Digest::from_bytes(bytes).map_err(|_| SerializationError::Malformed {
            entity,
            reason: "invalid digest bytes".to_string(),
        })
    }

    fn take_string(&mut self, entity: &'static str) -> Result<String, SerializationError> {
        let len = self.take_u32(entity)? as usize;
        let bytes = self.take(entity, len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerializationError::Malformed {
            entity,
            reason: "name is not valid UTF-8".to_string(),
        })
    }
}

fn write_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn write_audit(out: &mut Vec<u8>, audit: &NamedAudit) {
    write_string(out, &audit.name);
    out.extend_from_slice(&audit.audit.ticks.to_le_bytes());
    out.extend_from_slice(&audit.audit.offset_ticks.to_le_bytes());
}

fn read_audit(reader: &mut Reader<'_>) -> Result<NamedAudit, SerializationError> {
    let name = reader.take_string("Audit.name")?;
    let ticks = reader.take_i64("Audit.ticks")?;
    let offset_ticks = reader.take_i64("Audit.offsetTicks")?;
    Ok(NamedAudit {
        name,
        audit: crate::model::Audit {
            ticks,
            offset_ticks,
        },
    })
}

impl Serializer for BinarySerializer {
    fn serialize_digest(&self, digest: &Digest) -> Vec<u8> {
        digest.as_bytes().to_vec()
    }

    fn deserialize_digest(&self, bytes: &[u8]) -> Result<Digest, SerializationError> {
        if bytes.is_empty() {
            return Ok(Digest::EMPTY);
        }
        if bytes.len() < DIGEST_LEN {
            return Err(SerializationError::TooShort {
                entity: "Digest",
                expected: DIGEST_LEN,
                actual: bytes.len(),
            });
        }
        Digest::from_bytes(bytes).map_err(|_| SerializationError::Malformed {
            entity: "Digest",
            reason: format!("expected exactly {DIGEST_LEN} bytes, got {}", bytes.len()),
        })
    }

    fn serialize_commit_id(&self, id: &CommitId) -> Vec<u8> {
        self.serialize_digest(&id.digest())
    }

    fn deserialize_commit_id(&self, bytes: &[u8]) -> Result<CommitId, SerializationError> {
        self.deserialize_digest(bytes).map(CommitId::new)
    }

    fn serialize_tree(&self, tree: &TreeNodeMap) -> Result<Vec<u8>, SerializationError> {
        let mut out = Vec::new();
        out.extend_from_slice(&(tree.len() as u32).to_le_bytes());
        for node in tree.iter() {
            write_string(&mut out, &node.name);
            out.push(match node.kind {
                NodeKind::Blob => 0,
                NodeKind::Tree => 1,
            });
            out.extend_from_slice(node.target.as_bytes());
        }
        Ok(out)
    }

    fn deserialize_tree(&self, bytes: &[u8]) -> Result<TreeNodeMap, SerializationError> {
        if bytes.is_empty() {
            return Ok(TreeNodeMap::empty());
        }
        let mut reader = Reader::new(bytes);
        let count = reader.take_u32("TreeNodeMap.count")?;
        let mut nodes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = reader.take_string("TreeNode.name")?;
            let kind_byte = reader.take("TreeNode.kind", 1)?[0];
            let kind = match kind_byte {
                0 => NodeKind::Blob,
                1 => NodeKind::Tree,
                other => {
                    return Err(SerializationError::Malformed {
                        entity: "TreeNode.kind",
                        reason: format!("unrecognized kind byte {other}"),
                    });
                }
            };
            let target = reader.take_digest("TreeNode.nodeId")?;
            nodes.push(TreeNode { name, kind, target });
        }
        Ok(TreeNodeMap::from_sorted_unchecked(nodes))
    }

    fn serialize_commit(&self, commit: &Commit) -> Result<Vec<u8>, SerializationError> {
        let mut out = Vec::new();
        out.extend_from_slice(&(commit.parents.len() as u32).to_le_bytes());
        for parent in &commit.parents {
            out.extend_from_slice(parent.digest().as_bytes());
        }
        out.extend_from_slice(commit.tree_id.digest().as_bytes());
        write_audit(&mut out, &commit.author);
        write_audit(&mut out, &commit.committer);
        match &commit.message {
            None => out.extend_from_slice(&NO_MESSAGE.to_le_bytes()),
            Some(message) => {
                out.extend_from_slice(&(message.len() as i32).to_le_bytes());
                out.extend_from_slice(message.as_bytes());
            }
        }
        Ok(out)
    }

    fn deserialize_commit(&self, bytes: &[u8]) -> Result<Commit, SerializationError> {
        if bytes.is_empty() {
            return Ok(Commit::default());
        }
        let mut reader = Reader::new(bytes);
        let parent_count = reader.take_u32("Commit.parents")?;
        let mut parents = Vec::with_capacity(parent_count as usize);
        for _ in 0..parent_count {
            parents.push(CommitId::new(reader.take_digest("Commit.parents[i]")?));
        }
        let tree_id = TreeId::new(reader.take_digest("Commit.treeId")?);
        let author = read_audit(&mut reader)?;
        let committer = read_audit(&mut reader)?;
        let message_len = reader.take_i32("Commit.message")?;
        let message = if message_len == NO_MESSAGE {
            None
        } else {
            let bytes = reader.take("Commit.message", message_len.max(0) as usize)?;
            Some(
                String::from_utf8(bytes.to_vec()).map_err(|_| SerializationError::Malformed {
                    entity: "Commit.message",
                    reason: "message is not valid UTF-8".to_string(),
                })?,
            )
        };
        Ok(Commit {
            parents,
            tree_id,
            author,
            committer,
            message,
        })
    }
}
