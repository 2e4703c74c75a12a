// Copyright 2020-2024 The Jujutsu Authors
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

//! Strongly-typed wrappers around [`Digest`](crate::digest::Digest) so a
//! tree id and a commit id can never be confused at a call site, even though
//! both are just 20 bytes underneath.

// Defines a new struct type wrapping a `Digest`, with `hex`/`Debug`/`Display`
// support. Documentation comments written inside the macro invocation are
// captured and associated with the type it defines.
//
// Example:
// ```no_run
// id_type!(
//     /// My favorite id type.
//     pub MyId
// );
// ```
macro_rules! id_type {
    ($(#[$attr:meta])* $vis:vis $name:ident) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        $vis struct $name(crate::digest::Digest);

        #[allow(dead_code)]
        impl $name {
            pub fn new(digest: crate::digest::Digest) -> Self {
                Self(digest)
            }

            /// The well-defined empty id (the all-zero digest), used as the
            /// root-commit parent sentinel and the empty-tree id.
            pub fn empty() -> Self {
                Self(crate::digest::Digest::EMPTY)
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            pub fn digest(&self) -> crate::digest::Digest {
                self.0
            }

            pub fn to_hex(self) -> String {
                self.0.to_hex()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::empty()
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.to_hex()).finish()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.pad(&self.to_hex())
            }
        }

        impl From<crate::digest::Digest> for $name {
            fn from(digest: crate::digest::Digest) -> Self {
                Self::new(digest)
            }
        }
    };
}


id_type!(
    /// Identifies a commit by the digest of its serialized form.
    pub CommitId
);

id_type!(
    /// Identifies a tree node map by the digest of its serialized form.
    pub TreeId
);
