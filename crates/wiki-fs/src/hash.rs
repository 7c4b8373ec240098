//! Content hashing
//!
//! Every sync comparison goes through this module: local bodies, converted
//! remote bodies and stored base content are all normalized the same way
//! before hashing, so equal content always fingerprints equal. Digests use
//! the canonical `sha256:<hex>` format.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha256};

/// Prefix for all fingerprints produced by this module
const PREFIX: &str = "sha256:";

/// Canonicalize line endings and whitespace.
///
/// CRLF and lone CR become LF, trailing whitespace is stripped from every
/// line, trailing blank lines are dropped and non-empty text ends with
/// exactly one newline. Idempotent.
pub fn normalize(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    for line in unified.split('\n') {
        out.push_str(line.trim_end());
        out.push('\n');
    }
    let trimmed_len = out.trim_end_matches('\n').len();
    out.truncate(trimmed_len);
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// Fingerprint of normalized text.
pub fn hash_text(text: &str) -> String {
    digest(normalize(text).as_bytes())
}

/// Fingerprint of binary content, computed over its base64 encoding.
pub fn hash_bytes(data: &[u8]) -> String {
    digest(STANDARD.encode(data).as_bytes())
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{}{:x}", PREFIX, hasher.finalize())
}
