//! Resolves which entries of a directory take part in its fingerprint.
//!
//! Patterns use shell-glob syntax evaluated against the path relative to the
//! hashed root, with `/` as separator: `*` never crosses a separator and `**`
//! matches zero or more whole segments. A matching directory is pruned before
//! descent, so nothing below it is ever visited.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{FingerprintError, Result};

/// Exclude patterns from the command line unioned with the root's ignore file.
#[derive(Debug, Clone)]
pub struct IgnoreRuleSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl IgnoreRuleSet {
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Vec::new();
        let mut builder = GlobSetBuilder::new();

        for raw in patterns {
            let Some(pattern) = normalize_pattern(raw.as_ref())? else {
                continue;
            };
            let glob = GlobBuilder::new(&pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| {
                    FingerprintError::validation(format!("invalid exclude pattern '{pattern}': {e}"))
                })?;
            builder.add(glob);
            normalized.push(pattern);
        }

        let set = builder
            .build()
            .map_err(|e| FingerprintError::validation(format!("invalid exclude patterns: {e}")))?;

        Ok(Self {
            patterns: normalized,
            set,
        })
    }

    /// Builds the rule set for `root`: `excludes` plus `ignore_file` if present there.
    pub fn load(root: &Path, ignore_file: &str, excludes: &[String]) -> Result<Self> {
        let path = root.join(ignore_file);
        let text = match fs::read_to_string(&path) {
            Ok(text) => {
                debug!("loaded ignore rules from {}", path.display());
                text
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(FingerprintError::from_io(path, "ignore file", e)),
        };

        Self::new(
            excludes
                .iter()
                .map(String::as_str)
                .chain(parse_ignore_file(&text)),
        )
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// `relative` uses `/` separators and no leading `./`.
    pub fn is_excluded(&self, relative: &str) -> bool {
        self.set.is_match(relative)
    }
}

fn parse_ignore_file(text: &str) -> impl Iterator<Item = &str> + '_ {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

fn normalize_pattern(raw: &str) -> Result<Option<String>> {
    let trimmed = raw.trim();
    if trimmed.starts_with('!') {
        return Err(FingerprintError::validation(format!(
            "negated pattern '{trimmed}' is not supported"
        )));
    }

    // Backslash is a glob escape on unix and a separator only on windows.
    #[cfg(windows)]
    let mut pattern = trimmed.replace('\\', "/");
    #[cfg(not(windows))]
    let mut pattern = trimmed.to_string();
    while let Some(rest) = pattern.strip_prefix("./") {
        pattern = rest.to_string();
    }
    let pattern = pattern.trim_start_matches('/').trim_end_matches('/');

    if pattern.is_empty() {
        return Ok(None);
    }
    Ok(Some(pattern.to_string()))
}

/// One included leaf of a directory tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEntry {
    File { relative: String, path: PathBuf },
    /// `target` is the link's raw target bytes, never its content.
    Symlink { relative: String, target: Vec<u8> },
}

impl TreeEntry {
    pub fn relative(&self) -> &str {
        match self {
            Self::File { relative, .. } | Self::Symlink { relative, .. } => relative,
        }
    }
}

/// Lists every included file and symlink under `root`, sorted byte-wise by
/// relative path. Symlinks are never followed.
#[instrument(skip(rules), fields(patterns = rules.patterns().len()))]
pub fn collect_entries(root: &Path, rules: &IgnoreRuleSet) -> Result<Vec<TreeEntry>> {
    let meta = fs::metadata(root).map_err(|e| FingerprintError::from_io(root, "directory", e))?;
    if !meta.is_dir() {
        return Err(FingerprintError::NotFound {
            artifact: "directory".to_string(),
            reason: format!("'{}' is not a directory", root.display()),
        });
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_pruned(root, entry, rules));

    let mut entries = Vec::new();
    for item in walker {
        let entry = item.map_err(|e| walk_error(root, e))?;
        let relative = relative_path(root, entry.path())?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            continue;
        }

        if file_type.is_symlink() {
            let target = fs::read_link(entry.path())
                .map_err(|e| FingerprintError::from_io(entry.path(), "symlink", e))?;
            entries.push(TreeEntry::Symlink {
                relative,
                target: link_target_bytes(target),
            });
        } else if file_type.is_file() {
            entries.push(TreeEntry::File {
                relative,
                path: entry.into_path(),
            });
        } else {
            warn!("skipping special file '{}' (not a regular file or symlink)", relative);
        }
    }

    entries.sort_by(|a, b| a.relative().as_bytes().cmp(b.relative().as_bytes()));
    debug!("collected {} entries under {}", entries.len(), root.display());
    Ok(entries)
}

/// Target bytes exactly as stored in the link; windows separators become `/`.
fn link_target_bytes(target: PathBuf) -> Vec<u8> {
    let bytes = target.into_os_string().into_encoded_bytes();
    #[cfg(windows)]
    let bytes: Vec<u8> = bytes
        .into_iter()
        .map(|b| if b == b'\\' { b'/' } else { b })
        .collect();
    bytes
}

fn is_pruned(root: &Path, entry: &DirEntry, rules: &IgnoreRuleSet) -> bool {
    // Paths that fail to convert are reported by the main loop instead.
    match relative_path(root, entry.path()) {
        Ok(relative) => {
            let excluded = rules.is_excluded(&relative);
            if excluded {
                debug!("excluded {}", relative);
            }
            excluded
        }
        Err(_) => false,
    }
}

/// `path` relative to `root`, joined with `/` regardless of platform.
fn relative_path(root: &Path, path: &Path) -> Result<String> {
    let stripped = path.strip_prefix(root).map_err(|_| {
        FingerprintError::validation(format!(
            "'{}' is outside '{}'",
            path.display(),
            root.display()
        ))
    })?;

    let mut parts = Vec::new();
    for component in stripped.components() {
        if let Component::Normal(part) = component {
            let part = part.to_str().ok_or_else(|| {
                FingerprintError::validation(format!(
                    "'{}' is not valid UTF-8 and cannot be fingerprinted",
                    path.display()
                ))
            })?;
            parts.push(part);
        }
    }
    Ok(parts.join("/"))
}

fn walk_error(root: &Path, err: walkdir::Error) -> FingerprintError {
    let path = err
        .path()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    let message = err.to_string();
    match err.into_io_error() {
        Some(source) => FingerprintError::from_io(path, "directory", source),
        None => FingerprintError::Io {
            path,
            source: io::Error::new(io::ErrorKind::Other, message),
        },
    }
}
