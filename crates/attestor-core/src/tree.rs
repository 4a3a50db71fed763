use std::path::Path;

use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::digest::{sha256_bytes, sha256_file, Fingerprint};
use crate::error::Result;
use crate::ignore::{collect_entries, IgnoreRuleSet, TreeEntry};

/// Folds the content of a directory tree into one fingerprint.
#[derive(Debug, Clone, Copy)]
pub struct TreeHasher {
    parallel: bool,
}

impl Default for TreeHasher {
    fn default() -> Self {
        Self { parallel: true }
    }
}

impl TreeHasher {
    pub fn new(parallel: bool) -> Self {
        Self { parallel }
    }

    /// Walks `root` with `rules` applied and hashes what remains.
    #[instrument(skip(self, rules))]
    pub fn hash_dir(&self, root: &Path, rules: &IgnoreRuleSet) -> Result<Fingerprint> {
        let entries = collect_entries(root, rules)?;
        self.hash_entries(&entries)
    }

    /// Computes the tree digest from an entry list.
    ///
    /// Each entry contributes `kind \0 relative-path \0 content-digest \n` to a
    /// single running SHA-256, in byte-wise order of the relative path. An
    /// empty list yields the digest of the empty input.
    pub fn hash_entries(&self, entries: &[TreeEntry]) -> Result<Fingerprint> {
        let mut sorted: Vec<&TreeEntry> = entries.iter().collect();
        sorted.sort_by(|a, b| a.relative().as_bytes().cmp(b.relative().as_bytes()));

        // Indexed collect keeps input order, so parallelism cannot reorder records.
        let digests: Vec<Fingerprint> = if self.parallel {
            sorted.par_iter().map(|entry| content_digest(entry)).collect::<Result<_>>()?
        } else {
            sorted.iter().map(|entry| content_digest(entry)).collect::<Result<_>>()?
        };

        let mut hasher = Sha256::new();
        for (entry, digest) in sorted.iter().zip(&digests) {
            hasher.update(entry_kind(entry).as_bytes());
            hasher.update(b"\0");
            hasher.update(entry.relative().as_bytes());
            hasher.update(b"\0");
            hasher.update(digest.as_str().as_bytes());
            hasher.update(b"\n");
            debug!("tree: mixed {} {}", entry_kind(entry), entry.relative());
        }

        Ok(Fingerprint::from_digest(hasher.finalize()))
    }
}

fn entry_kind(entry: &TreeEntry) -> &'static str {
    match entry {
        TreeEntry::File { .. } => "file",
        TreeEntry::Symlink { .. } => "symlink",
    }
}

fn content_digest(entry: &TreeEntry) -> Result<Fingerprint> {
    match entry {
        TreeEntry::File { path, .. } => sha256_file(path),
        TreeEntry::Symlink { target, .. } => Ok(sha256_bytes(target)),
    }
}
