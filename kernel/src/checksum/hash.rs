//! Content hashing for rendered artifacts.
//!
//! Algorithm: SHA-256, rendered as 64 lowercase hex characters. The hash
//! is used for change detection between a fresh render and its reference,
//! not for adversarial integrity.
//!
//! **Exactly one place computes artifact hashes.** Both the reference
//! writer and the comparator go through [`hash_reader`].

use std::fmt;
use std::io::{self, Read};

use sha2::{Digest, Sha256};

/// Read buffer size for streaming hashes. Artifacts are never loaded whole.
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// A content hash as stored in a checksum index line.
///
/// Invariant: the inner string is non-empty and consists only of ASCII
/// hex digits, normalized to lowercase (enforced by [`ContentHash::parse`]).
/// Digest length is not enforced so that indexes written with an older
/// digest still parse; they simply never match a fresh SHA-256.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash {
    hex: String,
}

impl ContentHash {
    /// Parse a hex digest.
    ///
    /// Returns `None` if the string is empty or contains a non-hex character.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(Self {
            hex: s.to_ascii_lowercase(),
        })
    }

    /// Wrap a raw SHA-256 digest.
    #[must_use]
    pub fn from_digest(bytes: &[u8; 32]) -> Self {
        Self {
            hex: hex::encode(bytes),
        }
    }

    /// The lowercase hex digest.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex)
    }
}

/// Hash everything `reader` yields, [`HASH_CHUNK_SIZE`] bytes at a time.
///
/// # Errors
///
/// Propagates the first read error other than `Interrupted`.
pub fn hash_reader(mut reader: impl Read) -> io::Result<ContentHash> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buf[..n]);
    }
    Ok(finish(hasher))
}

/// Hash an in-memory byte slice.
#[must_use]
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(data);
    finish(hasher)
}

fn finish(hasher: Sha256) -> ContentHash {
    let result = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    ContentHash::from_digest(&out)
}
