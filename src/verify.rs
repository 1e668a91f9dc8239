//! Byte-for-byte confirmation of digest groups.
//!
//! A shared digest is treated as proof of equal content everywhere else in
//! the crate. With `--verify` each group is additionally streamed member by
//! member against a representative, so a hash collision can never be
//! reported as a duplicate.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::duplicates::DuplicateGroup;
use crate::error::DedupError;
use crate::scanner::CHUNK_SIZE;

/// Which side of a comparison failed to read.
enum Side {
    Left,
    Right,
}

/// Reads until `buf` is full or the stream ends.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn open(path: &Path, side: Side) -> Result<File, (Side, io::Error)> {
    File::open(path).map_err(|e| (side, e))
}

/// Compares two files chunk by chunk, stopping at the first difference.
fn files_equal(left: &Path, right: &Path) -> Result<bool, (Side, io::Error)> {
    let mut left_file = open(left, Side::Left)?;
    let mut right_file = open(right, Side::Right)?;
    let mut left_buf = [0u8; CHUNK_SIZE];
    let mut right_buf = [0u8; CHUNK_SIZE];

    loop {
        let l = fill(&mut left_file, &mut left_buf).map_err(|e| (Side::Left, e))?;
        let r = fill(&mut right_file, &mut right_buf).map_err(|e| (Side::Right, e))?;
        if l != r || left_buf[..l] != right_buf[..r] {
            return Ok(false);
        }
        if l == 0 {
            return Ok(true);
        }
    }
}

/// Splits `group` into sets of truly identical files and keeps the largest.
///
/// Members that cannot be read are passed to `on_skip`. Returns `None` when
/// fewer than two members are confirmed equal.
pub fn confirm_group<S>(digest: &str, group: DuplicateGroup, mut on_skip: S) -> Option<DuplicateGroup>
where
    S: FnMut(DedupError),
{
    let DuplicateGroup { size, paths } = group;
    let mut subsets: Vec<Vec<PathBuf>> = Vec::new();

    'members: for path in paths {
        if subsets.is_empty() {
            if let Err(source) = File::open(&path) {
                on_skip(DedupError::VerifyFailure { path, source });
                continue;
            }
            subsets.push(vec![path]);
            continue;
        }

        let mut i = 0;
        while i < subsets.len() {
            match files_equal(&subsets[i][0], &path) {
                Ok(true) => {
                    subsets[i].push(path);
                    continue 'members;
                }
                Ok(false) => i += 1,
                Err((Side::Right, source)) => {
                    on_skip(DedupError::VerifyFailure { path, source });
                    continue 'members;
                }
                Err((Side::Left, source)) => {
                    // Drop the unreadable representative; the next member of
                    // its subset takes over and `path` is compared again
                    let dead = subsets[i].remove(0);
                    on_skip(DedupError::VerifyFailure { path: dead, source });
                    if subsets[i].is_empty() {
                        subsets.remove(i);
                    }
                }
            }
        }
        subsets.push(vec![path]);
    }

    let mut best: Option<Vec<PathBuf>> = None;
    for subset in subsets {
        if subset.len() < 2 {
            if let Some(path) = subset.first() {
                debug!("'{}' differs from the rest of group {}", path.display(), digest);
            }
            continue;
        }
        match &best {
            Some(current) if current.len() >= subset.len() => {
                warn!(
                    "Hash collision in group {}: dropping {} identical files starting with '{}'",
                    digest,
                    subset.len(),
                    subset[0].display()
                );
            }
            _ => {
                if let Some(previous) = best.replace(subset) {
                    warn!(
                        "Hash collision in group {}: dropping {} identical files starting with '{}'",
                        digest,
                        previous.len(),
                        previous[0].display()
                    );
                }
            }
        }
    }

    best.map(|paths| DuplicateGroup { size, paths })
}
