//! Identifier codec
//!
//! Canonical ids are 32 hex digits (hyphens optional). Inside serialized
//! asset references the host stores them in a 23-character compact form:
//! the first 5 hex digits verbatim, then each following group of 3 hex
//! digits (12 bits) as two characters of a base64 alphabet.

use rand::Rng;
use uuid::Uuid;

/// Alphabet used by the compact id encoding
const COMPACT_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Alphabet used for per-record file tags
const FILE_TAG_ALPHABET: &[u8; 64] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789+/";

/// Length of a file tag
pub const FILE_TAG_LEN: usize = 22;

/// Length of a compacted canonical id
pub const COMPACT_ID_LEN: usize = 23;

const CANONICAL_HEX_LEN: usize = 32;
const VERBATIM_PREFIX: usize = 5;

/// Compress a canonical id into its 23-character compact form.
///
/// Anything that is not 32 hex digits after stripping hyphens is returned
/// unchanged.
pub fn compact_id(canonical: &str) -> String {
    let clean = canonical.replace('-', "").to_ascii_lowercase();
    if clean.len() != CANONICAL_HEX_LEN || !clean.bytes().all(|b| b.is_ascii_hexdigit()) {
        return canonical.to_string();
    }

    let mut out = String::with_capacity(COMPACT_ID_LEN);
    out.push_str(&clean[..VERBATIM_PREFIX]);

    for group in clean.as_bytes()[VERBATIM_PREFIX..].chunks(3) {
        let bits = group
            .iter()
            .fold(0usize, |acc, &digit| (acc << 4) | hex_value(digit));
        out.push(COMPACT_ALPHABET[(bits >> 6) & 63] as char);
        out.push(COMPACT_ALPHABET[bits & 63] as char);
    }

    out
}

#[inline]
fn hex_value(digit: u8) -> usize {
    match digit {
        b'0'..=b'9' => (digit - b'0') as usize,
        b'a'..=b'f' => (digit - b'a' + 10) as usize,
        _ => 0,
    }
}

/// Generate a random 22-character file tag.
///
/// Tags only disambiguate records inside one prefab, so a thread-local
/// non-cryptographic generator is enough.
pub fn random_file_tag() -> String {
    let mut rng = rand::thread_rng();
    (0..FILE_TAG_LEN)
        .map(|_| FILE_TAG_ALPHABET[rng.gen_range(0..FILE_TAG_ALPHABET.len())] as char)
        .collect()
}

/// Generate a fresh hyphenated canonical id for objects the asset database
/// never assigned one to.
pub fn random_canonical_id() -> String {
    Uuid::new_v4().to_string()
}
