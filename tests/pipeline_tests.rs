use find_file_dups::{
    DedupError, ReportFormat, ScanOptions, collect_files, find_duplicates, find_duplicates_from_files,
    write_report,
};
use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) -> PathBuf {
    File::create(path).unwrap().write_all(content).unwrap();
    path.canonicalize().unwrap()
}

fn options() -> ScanOptions {
    ScanOptions {
        threads: 2,
        ..ScanOptions::default()
    }
}

fn member_sets(root: &Path, opts: &ScanOptions) -> BTreeSet<BTreeSet<PathBuf>> {
    let (groups, _) = find_duplicates(root, opts).unwrap();
    groups
        .into_values()
        .map(|g| g.paths.into_iter().collect())
        .collect()
}

#[test]
fn test_identical_pair_forms_one_group() {
    let dir = tempdir().unwrap();
    let a = write(&dir.path().join("a.txt"), b"hello");
    let b = write(&dir.path().join("b.txt"), b"hello");
    write(&dir.path().join("c.txt"), b"world");

    let (groups, summary) = find_duplicates(dir.path(), &options()).unwrap();

    assert_eq!(groups.len(), 1);
    let group = groups.values().next().unwrap();
    assert_eq!(group.paths, vec![a, b]);
    assert_eq!(group.size, 5);
    assert_eq!(summary.files_found, 3);
    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.files_hashed, 3);
    assert!(summary.warnings.is_empty());
}

#[test]
fn test_equal_size_different_content() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.bin"), b"0123456789");
    write(&dir.path().join("b.bin"), b"01234567890123456789");
    write(&dir.path().join("c.bin"), b"0123456788");

    let (groups, summary) = find_duplicates(dir.path(), &options()).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.candidates, 2);
}

#[test]
fn test_empty_directory() {
    let dir = tempdir().unwrap();

    let (groups, summary) = find_duplicates(dir.path(), &options()).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.files_found, 0);
    assert!(summary.warnings.is_empty());
}

#[test]
fn test_duplicates_across_nested_directories() {
    let dir = tempdir().unwrap();
    let deep = dir.path().join("one").join("two");
    fs::create_dir_all(&deep).unwrap();
    let a = write(&dir.path().join("top.dat"), b"shared payload");
    let b = write(&deep.join("bottom.dat"), b"shared payload");
    let c = write(&dir.path().join("one").join("mid.dat"), b"shared payload");
    write(&deep.join("other.dat"), b"not the same!!");

    let sets = member_sets(dir.path(), &options());

    assert_eq!(sets, BTreeSet::from([BTreeSet::from([a, b, c])]));
}

#[test]
fn test_groups_never_mix_sizes_or_singletons() {
    let dir = tempdir().unwrap();
    for i in 0..6 {
        write(&dir.path().join(format!("x{i}")), &vec![b'x'; i % 3 + 1]);
    }

    let (groups, _) = find_duplicates(dir.path(), &options()).unwrap();

    assert_eq!(groups.len(), 3);
    for group in groups.values() {
        assert!(group.paths.len() >= 2);
        for path in &group.paths {
            assert_eq!(fs::metadata(path).unwrap().len(), group.size);
        }
    }
}

#[test]
fn test_empty_files_are_duplicates_unless_min_size() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("e1"), b"");
    write(&dir.path().join("e2"), b"");

    assert_eq!(member_sets(dir.path(), &options()).len(), 1);

    let opts = ScanOptions {
        min_size: 1,
        ..options()
    };
    assert!(member_sets(dir.path(), &opts).is_empty());
}

#[test]
fn test_idempotent_runs() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a"), b"alpha");
    write(&dir.path().join("b"), b"alpha");
    write(&dir.path().join("c"), b"gamma");
    write(&dir.path().join("d"), b"gamma");
    write(&dir.path().join("e"), b"delta");

    let first = find_duplicates(dir.path(), &options()).unwrap().0;
    let second = find_duplicates(dir.path(), &options()).unwrap().0;

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[test]
fn test_copy_keeps_digest() {
    let dir = tempdir().unwrap();
    let original = write(&dir.path().join("orig.txt"), b"some content");
    let copy = dir.path().join("copy.txt");
    fs::copy(&original, &copy).unwrap();

    let (groups, _) = find_duplicates(dir.path(), &options()).unwrap();

    let (digest, group) = groups.iter().next().unwrap();
    assert_eq!(*digest, blake3::hash(b"some content").to_hex().to_string());
    assert_eq!(group.paths.len(), 2);
}

#[test]
fn test_verify_keeps_true_duplicates() {
    let dir = tempdir().unwrap();
    let a = write(&dir.path().join("a"), b"verified");
    let b = write(&dir.path().join("b"), b"verified");

    let opts = ScanOptions {
        verify: true,
        ..options()
    };
    let (groups, summary) = find_duplicates(dir.path(), &opts).unwrap();

    assert_eq!(groups.values().next().unwrap().paths, vec![a, b]);
    assert!(summary.warnings.is_empty());
}

#[test]
fn test_invalid_root() {
    let dir = tempdir().unwrap();
    let file = write(&dir.path().join("plain.txt"), b"x");

    assert!(matches!(
        find_duplicates(&file, &options()),
        Err(DedupError::InvalidRoot { .. })
    ));
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_not_candidates() {
    let dir = tempdir().unwrap();
    let target = write(&dir.path().join("target"), b"linked");
    std::os::unix::fs::symlink(&target, dir.path().join("link")).unwrap();

    let (groups, summary) = find_duplicates(dir.path(), &options()).unwrap();

    assert!(groups.is_empty());
    assert_eq!(summary.files_found, 1);
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let a = write(&dir.path().join("a"), b"readable");
    let b = write(&dir.path().join("b"), b"readable");
    let locked = write(&dir.path().join("locked"), b"readable");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if File::open(&locked).is_ok() {
        // Permission bits are not enforced (e.g. running as root)
        return;
    }

    let (groups, summary) = find_duplicates(dir.path(), &options()).unwrap();

    assert_eq!(groups.values().next().unwrap().paths, vec![a, b]);
    assert_eq!(summary.warnings.len(), 1);
    assert!(matches!(
        &summary.warnings[0],
        DedupError::UnreadableFile { path, .. } if *path == locked
    ));

    fs::set_permissions(&locked, fs::Permissions::from_mode(0o644)).unwrap();
}

#[cfg(unix)]
#[test]
fn test_unreadable_directory_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let a = write(&dir.path().join("a"), b"twin");
    let b = write(&dir.path().join("b"), b"twin");
    let closed = dir.path().join("closed");
    fs::create_dir(&closed).unwrap();
    write(&closed.join("hidden"), b"twin");
    fs::set_permissions(&closed, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::read_dir(&closed).is_ok() {
        fs::set_permissions(&closed, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let (groups, summary) = find_duplicates(dir.path(), &options()).unwrap();
    fs::set_permissions(&closed, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(groups.values().next().unwrap().paths, vec![a, b]);
    assert!(summary
        .warnings
        .iter()
        .any(|w| matches!(w, DedupError::TraversalSkip { .. })));
}

#[test]
fn test_report_round_trip_through_disk() {
    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    let out = dir.path().join("out");
    fs::create_dir(&data).unwrap();
    fs::create_dir(&out).unwrap();
    let a = write(&data.join("a"), b"hello");
    let b = write(&data.join("b"), b"hello");

    let (groups, summary) = find_duplicates(&data, &options()).unwrap();
    let at = time::OffsetDateTime::now_utc();
    let report = write_report(&groups, &summary.root, &out, ReportFormat::Text, at).unwrap();

    let name = report.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("duplicates_"));
    assert!(name.ends_with(".txt"));
    let stem = name.trim_end_matches(".txt");
    assert!(!stem.contains(':') && !stem.contains('.') && !stem.contains('-'));

    let expected = format!(
        "{}\n{}\n{}\n",
        blake3::hash(b"hello").to_hex(),
        a.display(),
        b.display()
    );
    assert_eq!(fs::read_to_string(report).unwrap(), expected);
}

#[test]
fn test_vanished_file_is_skipped() {
    let dir = tempdir().unwrap();
    let root = dir.path().canonicalize().unwrap();
    let a = write(&root.join("a"), b"readable");
    let b = write(&root.join("b"), b"readable");
    let gone = write(&root.join("gone"), b"readable");

    let files = collect_files(&root, |_| {}, |e| panic!("unexpected skip: {e}"));
    assert_eq!(files.len(), 3);
    fs::remove_file(&gone).unwrap();

    let (groups, summary) = find_duplicates_from_files(&root, files, &options()).unwrap();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups.values().next().unwrap().paths, vec![a, b]);
    assert_eq!(summary.files_found, 3);
    assert_eq!(summary.warnings.len(), 1);
    assert_eq!(summary.warnings[0].path(), Some(gone.as_path()));
}

#[cfg(unix)]
#[test]
fn test_non_utf8_file_name_in_reports() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = tempdir().unwrap();
    let data = dir.path().join("data");
    let out = dir.path().join("out");
    fs::create_dir(&data).unwrap();
    fs::create_dir(&out).unwrap();
    let a = write(&data.join("a"), b"hello");
    let odd = write(&data.join(OsStr::from_bytes(b"b\xff")), b"hello");

    let (groups, summary) = find_duplicates(&data, &options()).unwrap();
    assert_eq!(groups.len(), 1);

    let at = time::OffsetDateTime::now_utc();
    let json = write_report(&groups, &summary.root, &out, ReportFormat::Json, at).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&fs::read(json).unwrap()).unwrap();
    assert_eq!(value["groups"][0]["paths"].as_array().unwrap().len(), 2);

    let text = write_report(&groups, &summary.root, &out, ReportFormat::Text, at).unwrap();
    let contents = fs::read(text).unwrap();
    let lines: Vec<&[u8]> = contents.split(|&b| b == b'\n').collect();
    assert_eq!(lines[1], a.as_os_str().as_bytes());
    assert_eq!(lines[2], odd.as_os_str().as_bytes());
}

