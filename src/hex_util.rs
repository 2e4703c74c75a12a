// Copyright 2023 The Jujutsu Authors
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

//! Hex string helpers.

/// Decodes a hex string into bytes. Returns `None` on odd length or any
/// non-hex-digit character, rather than panicking.
pub fn decode_hex(hex: impl AsRef<[u8]>) -> Option<Vec<u8>> {
    let hex = hex.as_ref();
    if hex.len() % 2 != 0 {
        return None;
    }
    hex::decode(hex).ok()
}

/// Encodes `data` as a stable, lowercase hex string.
pub fn encode_hex(data: &[u8]) -> String {
    hex::encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let bytes = b"\x01\x23\x45\x67\x89\xab\xcd\xef";
        let hex = encode_hex(bytes);
        assert_eq!(hex, "0123456789abcdef");
        assert_eq!(decode_hex(&hex).unwrap(), bytes);
    }

    #[test]
    fn odd_length_rejected() {
        assert_eq!(decode_hex("abc"), None);
    }

    #[test]
    fn non_hex_rejected() {
        assert_eq!(decode_hex("zz"), None);
    }
}
