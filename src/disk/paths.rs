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

//! On-disk layout: `objects/<prefix>/<remainder>` sharded by digest, and
//! `refs/<namespace>/<branch>.commit` with both segments url-escaped.

use std::path::Path;
use std::path::PathBuf;

use percent_encoding::AsciiSet;
use percent_encoding::NON_ALPHANUMERIC;
use percent_encoding::percent_decode_str;
use percent_encoding::utf8_percent_encode;

use crate::digest::Digest;

const REF_SUFFIX: &str = ".commit";
const METADATA_SUFFIX: &str = ".metadata";

/// Characters left unescaped in a ref path segment, beyond bare
/// alphanumerics: common, unambiguous filename characters so ordinary
/// namespace/branch names stay readable on disk.
const REF_SEGMENT_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

pub fn escape_segment(segment: &str) -> String {
    utf8_percent_encode(segment, REF_SEGMENT_SAFE).to_string()
}

pub fn unescape_segment(segment: &str) -> Option<String> {
    percent_decode_str(segment).decode_utf8().ok().map(|cow| cow.into_owned())
}

pub fn object_path(root: &Path, digest: &Digest, prefix_len: usize) -> PathBuf {
    let (prefix, remainder) = digest.shard_split(prefix_len);
    root.join("objects").join(prefix).join(remainder)
}

pub fn object_metadata_path(root: &Path, digest: &Digest, prefix_len: usize) -> PathBuf {
    let mut path = object_path(root, digest, prefix_len);
    let mut file_name = path.file_name().unwrap().to_os_string();
    file_name.push(METADATA_SUFFIX);
    path.set_file_name(file_name);
    path
}

pub fn refs_root(root: &Path) -> PathBuf {
    root.join("refs")
}

pub fn ref_namespace_dir(root: &Path, namespace: &str) -> PathBuf {
    refs_root(root).join(escape_segment(namespace))
}

pub fn ref_path(root: &Path, namespace: &str, branch: &str) -> PathBuf {
    let mut file_name = escape_segment(branch);
    file_name.push_str(REF_SUFFIX);
    ref_namespace_dir(root, namespace).join(file_name)
}

/// Strips the ref-file suffix from a directory entry name, returning the
/// unescaped branch name, or `None` if the entry isn't a ref file.
pub fn branch_name_from_entry(entry_name: &str) -> Option<String> {
    entry_name
        .strip_suffix(REF_SUFFIX)
        .and_then(unescape_segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_path_shards_by_prefix() {
        let digest = Digest::hash(b"abc");
        let path = object_path(Path::new("/root"), &digest, 2);
        assert_eq!(
            path,
            Path::new("/root/objects/a999/3e364706816aba3e25717850c26c9cd0d89d")
        );
    }

    #[test]
    fn metadata_path_appends_suffix_to_file_name() {
        let digest = Digest::hash(b"abc");
        let path = object_metadata_path(Path::new("/root"), &digest, 2);
        assert!(path.to_string_lossy().ends_with(".metadata"));
        assert!(path.parent().unwrap().ends_with("a999"));
    }

    #[test]
    fn ref_path_escapes_both_segments() {
        let path = ref_path(Path::new("/root"), "repo one", "main/dev");
        assert_eq!(
            path,
            Path::new("/root/refs/repo%20one/main%2Fdev.commit")
        );
    }

    #[test]
    fn escape_unescape_round_trips() {
        let original = "weird name/with:chars";
        let escaped = escape_segment(original);
        assert_eq!(unescape_segment(&escaped).unwrap(), original);
    }

    #[test]
    fn branch_name_from_entry_strips_suffix_and_unescapes() {
        assert_eq!(
            branch_name_from_entry("main%2Fdev.commit").as_deref(),
            Some("main/dev")
        );
        assert_eq!(branch_name_from_entry("not-a-ref-file"), None);
    }
}
