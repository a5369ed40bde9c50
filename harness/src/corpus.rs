//! Corpus discovery and the skip list.
//!
//! A corpus is either a directory, walked recursively in file-name order,
//! or a single file whose parent becomes the corpus root. Documents are
//! identified by their path relative to the root.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use regtest_kernel::model::document::Document;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::HarnessError;

/// Skip list looked up at the corpus root when none is configured.
pub const DEFAULT_SKIP_FILE: &str = "Skipped";

/// The ordered document set of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    root: PathBuf,
    documents: Vec<Document>,
}

impl Corpus {
    /// Enumerate the documents under `path`.
    ///
    /// `extensions` filters by file extension, case-insensitively; an empty
    /// slice accepts every regular file except the default skip list.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Corpus`] if `path` does not exist or the walk
    /// fails.
    pub fn discover(path: &Path, extensions: &[String]) -> Result<Self, HarnessError> {
        if path.is_file() {
            return Ok(Self::single(path));
        }
        if !path.is_dir() {
            return Err(HarnessError::Corpus {
                path: path.to_path_buf(),
                detail: "no such file or directory".into(),
            });
        }

        let mut documents = Vec::new();
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry.map_err(|e| HarnessError::Corpus {
                path: path.to_path_buf(),
                detail: e.to_string(),
            })?;
            if !entry.file_type().is_file() || !accepts(entry.path(), extensions) {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(path)
                .map_err(|e| HarnessError::Corpus {
                    path: entry.path().to_path_buf(),
                    detail: e.to_string(),
                })?;
            if relative == Path::new(DEFAULT_SKIP_FILE) {
                continue;
            }
            documents.push(Document::new(relative));
        }
        debug!(root = %path.display(), count = documents.len(), "corpus enumerated");

        Ok(Self {
            root: path.to_path_buf(),
            documents,
        })
    }

    fn single(file: &Path) -> Self {
        let root = match file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let name = file.file_name().map_or_else(|| file.to_path_buf(), PathBuf::from);
        Self {
            root,
            documents: vec![Document::new(name)],
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn accepts(path: &Path, extensions: &[String]) -> bool {
    if extensions.is_empty() {
        return true;
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

/// Documents that are classified `SKIPPED` without running the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipList {
    entries: BTreeSet<PathBuf>,
}

impl SkipList {
    /// Parse newline-separated relative paths. Blank lines and lines
    /// starting with `#` are ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(PathBuf::from)
            .collect();
        Self { entries }
    }

    /// Load the skip list for a corpus.
    ///
    /// An explicitly configured file must exist. Without one, the default
    /// `Skipped` file at the corpus root is used if present.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::SkipList`] if the file cannot be read.
    pub fn load(corpus_root: &Path, configured: Option<&Path>) -> Result<Self, HarnessError> {
        let path = match configured {
            Some(path) => path.to_path_buf(),
            None => corpus_root.join(DEFAULT_SKIP_FILE),
        };
        match fs::read_to_string(&path) {
            Ok(text) => {
                let list = Self::parse(&text);
                debug!(path = %path.display(), entries = list.len(), "skip list loaded");
                Ok(list)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound && configured.is_none() => {
                Ok(Self::default())
            }
            Err(source) => Err(HarnessError::SkipList { path, source }),
        }
    }

    #[must_use]
    pub fn contains(&self, document: &Document) -> bool {
        self.entries.contains(document.relative_path())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
