//! Directory fingerprint properties: determinism, sensitivity, exclusion and
//! symlink handling, exercised through the public facade.

use std::fs;
use std::path::Path;

use attestor_core::{ArtifactLocator, Fingerprint, Fingerprinter, IgnoreRuleSet, TreeHasher};

fn write(root: &Path, relative: &str, content: &[u8]) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn dir_fingerprint(root: &Path, excludes: &[&str]) -> Fingerprint {
    Fingerprinter::default()
        .fingerprint(&ArtifactLocator::Directory {
            path: root.to_path_buf(),
            excludes: excludes.iter().map(|s| s.to_string()).collect(),
        })
        .expect("directory should fingerprint")
}

#[test]
fn same_tree_created_in_different_orders_matches() {
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();

    let files = [
        ("src/main.rs", b"fn main() {}".as_slice()),
        ("README.md", b"# demo".as_slice()),
        ("src/lib/util.rs", b"pub fn util() {}".as_slice()),
        ("assets/logo.svg", b"<svg/>".as_slice()),
    ];
    for (relative, content) in files {
        write(first.path(), relative, content);
    }
    for (relative, content) in files.iter().rev() {
        write(second.path(), relative, content);
    }

    let a = dir_fingerprint(first.path(), &[]);
    assert_eq!(a, dir_fingerprint(first.path(), &[]));
    assert_eq!(a, dir_fingerprint(second.path(), &[]));
}

#[test]
fn single_byte_change_changes_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a/b/c.txt", b"hello world");
    write(dir.path(), "d.txt", b"other");
    let original = dir_fingerprint(dir.path(), &[]);

    write(dir.path(), "a/b/c.txt", b"hello worle");
    assert_ne!(original, dir_fingerprint(dir.path(), &[]));
}

#[test]
fn renaming_a_file_changes_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "a.txt", b"same");
    let original = dir_fingerprint(dir.path(), &[]);

    fs::rename(dir.path().join("a.txt"), dir.path().join("b.txt")).unwrap();
    assert_ne!(original, dir_fingerprint(dir.path(), &[]));
}

#[test]
fn excluded_directory_equals_removed_directory() {
    let with_log = tempfile::tempdir().unwrap();
    write(with_log.path(), "a/b/c.txt", b"content");
    write(with_log.path(), "a/b/log/x.txt", b"noise");

    let without_log = tempfile::tempdir().unwrap();
    write(without_log.path(), "a/b/c.txt", b"content");

    assert_eq!(
        dir_fingerprint(with_log.path(), &["**/log"]),
        dir_fingerprint(without_log.path(), &[])
    );
    assert_ne!(
        dir_fingerprint(with_log.path(), &[]),
        dir_fingerprint(without_log.path(), &[])
    );
}

#[test]
fn fully_excluded_tree_is_a_valid_empty_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "only.log", b"x");

    let empty = tempfile::tempdir().unwrap();
    let fp = dir_fingerprint(dir.path(), &["*.log"]);
    assert_eq!(fp, dir_fingerprint(empty.path(), &[]));
    assert_eq!(fp.as_str().len(), 64);
}

#[test]
fn fingerprint_does_not_depend_on_root_spelling() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "pkg/data.json", b"{}");

    let rules = IgnoreRuleSet::new(Vec::<String>::new()).unwrap();
    let hasher = TreeHasher::new(false);
    let direct = hasher.hash_dir(dir.path(), &rules).unwrap();
    let dotted = hasher
        .hash_dir(&dir.path().join("pkg").join(".."), &rules)
        .unwrap();
    assert_eq!(direct, dotted);
}

#[cfg(unix)]
#[test]
fn retargeting_a_symlink_changes_fingerprint() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "v1/app.bin", b"same bytes");
    write(dir.path(), "v2/app.bin", b"same bytes");
    symlink("v1", dir.path().join("current")).unwrap();
    let before = dir_fingerprint(dir.path(), &[]);

    fs::remove_file(dir.path().join("current")).unwrap();
    symlink("v2", dir.path().join("current")).unwrap();
    assert_ne!(before, dir_fingerprint(dir.path(), &[]));
}

#[cfg(unix)]
fn retarget_changes_fingerprint(from: &std::ffi::OsStr, to: &std::ffi::OsStr) {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "data.txt", b"unchanged");
    let link = dir.path().join("link");
    symlink(from, &link).unwrap();
    let before = dir_fingerprint(dir.path(), &[]);

    fs::remove_file(&link).unwrap();
    symlink(to, &link).unwrap();
    assert_ne!(before, dir_fingerprint(dir.path(), &[]));
}

#[cfg(unix)]
#[test]
fn backslash_in_symlink_target_is_not_a_separator() {
    use std::ffi::OsStr;

    retarget_changes_fingerprint(OsStr::new("a/b"), OsStr::new("a\\b"));
}

#[cfg(unix)]
#[test]
fn non_utf8_symlink_targets_stay_distinct() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    retarget_changes_fingerprint(OsStr::from_bytes(b"x\xff"), OsStr::from_bytes(b"x\xfe"));
}

#[cfg(unix)]
#[test]
fn broken_symlink_inside_excluded_tree_is_never_visited() {
    use std::os::unix::fs::symlink;

    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "keep.txt", b"k");
    fs::create_dir_all(dir.path().join("vendor")).unwrap();
    symlink("/nonexistent/attestor/target", dir.path().join("vendor/dangling")).unwrap();

    let fp = dir_fingerprint(dir.path(), &["vendor"]);
    let clean = tempfile::tempdir().unwrap();
    write(clean.path(), "keep.txt", b"k");
    assert_eq!(fp, dir_fingerprint(clean.path(), &[]));
}

#[cfg(unix)]
#[test]
fn unreadable_subdirectory_aborts_with_access_error() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "open/a.txt", b"a");
    write(dir.path(), "locked/b.txt", b"b");
    let locked = dir.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Root ignores permission bits; nothing to assert there.
    let readable = fs::read_dir(&locked).is_ok();
    let result = Fingerprinter::default().fingerprint(&ArtifactLocator::Directory {
        path: dir.path().to_path_buf(),
        excludes: Vec::new(),
    });
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    if !readable {
        let err = result.expect_err("partial trees must not fingerprint");
        assert_eq!(err.kind(), attestor_core::ErrorKind::Access);
    }
}
