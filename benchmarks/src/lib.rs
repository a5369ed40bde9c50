//! Shared helpers for regtest benchmark suites.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regtest_kernel::checksum::hash::hash_bytes;
use regtest_kernel::checksum::index::{ChecksumEntry, ChecksumIndex};

/// Deterministic pseudo-random payload of `len` bytes.
#[must_use]
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    let mut state = u32::from(seed).wrapping_mul(2_654_435_761).max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state.to_le_bytes()[0]
        })
        .collect()
}

/// Index of `pages` synthetic entries rooted at `dir`.
///
/// # Panics
///
/// Panics if a synthetic entry has no basename (never for `page-N.png`).
#[must_use]
pub fn synthetic_index(dir: &Path, pages: usize) -> ChecksumIndex {
    (1..=pages)
        .map(|n| {
            let name = format!("page-{n}.png");
            ChecksumEntry::new(hash_bytes(name.as_bytes()), dir.join(&name))
                .expect("page has a basename")
        })
        .collect()
}

/// A reference directory and an output directory holding the same
/// `pages` artifacts of `page_len` bytes each, with the reference indexed
/// and the output listed as a run would report it.
pub struct ArtifactPair {
    _root: tempfile::TempDir,
    pub refs: PathBuf,
    pub out: PathBuf,
    pub index: ChecksumIndex,
    pub produced: BTreeMap<String, PathBuf>,
}

impl ArtifactPair {
    /// # Panics
    ///
    /// Panics on filesystem failure.
    #[must_use]
    pub fn new(pages: usize, page_len: usize) -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let refs = root.path().join("refs");
        let out = root.path().join("out");
        fs::create_dir_all(&refs).expect("refs dir");
        fs::create_dir_all(&out).expect("out dir");

        let mut index = ChecksumIndex::new();
        let mut produced = BTreeMap::new();
        for n in 1..=pages {
            let name = format!("page-{n}.png");
            let bytes = payload(page_len, u8::try_from(n % 251).unwrap_or(0));
            fs::write(refs.join(&name), &bytes).expect("write ref");
            fs::write(out.join(&name), &bytes).expect("write out");
            produced.insert(name.clone(), out.join(&name));
            let entry = ChecksumEntry::new(hash_bytes(&bytes), refs.join(&name))
                .expect("page has a basename");
            index.push(entry);
        }

        Self {
            _root: root,
            refs,
            out,
            index,
            produced,
        }
    }
}
