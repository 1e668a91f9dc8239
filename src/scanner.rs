use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use log::{debug, info};
use walkdir::WalkDir;

use crate::error::{DedupError, Result};

/// Bytes read per call while hashing; memory use stays flat for any file size.
pub const CHUNK_SIZE: usize = 8192;

/// Resolves `path` to an absolute, readable directory.
pub fn validate_root(path: &Path) -> Result<PathBuf> {
    let invalid = |reason: String| DedupError::InvalidRoot {
        path: path.to_path_buf(),
        reason,
    };

    let absolute = path
        .canonicalize()
        .map_err(|e| invalid(format!("cannot resolve path: {e}")))?;
    if !absolute.is_dir() {
        return Err(invalid("not a directory".to_string()));
    }
    fs::read_dir(&absolute).map_err(|e| invalid(format!("cannot read directory: {e}")))?;

    Ok(absolute)
}

/// Walks `root` and returns every regular file below it.
///
/// Symbolic links are not followed and never collected, nor are devices,
/// sockets or FIFOs. Entries that cannot be read are handed to `on_skip` and
/// the walk carries on with their siblings. `on_file` sees each collected
/// path as it is found.
pub fn collect_files<F, S>(root: &Path, mut on_file: F, mut on_skip: S) -> Vec<PathBuf>
where
    F: FnMut(&Path),
    S: FnMut(DedupError),
{
    let mut files = Vec::new();

    for entry in WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
    {
        match entry {
            Ok(entry) => {
                let file_type = entry.file_type();
                if file_type.is_dir() {
                    info!("Checking directory '{}'", entry.path().display());
                } else if file_type.is_file() {
                    debug!("Found file: '{}'", entry.path().display());
                    on_file(entry.path());
                    files.push(entry.into_path());
                } else {
                    debug!("Ignoring non-regular entry: '{}'", entry.path().display());
                }
            }
            Err(e) => {
                let path = e.path().map(Path::to_path_buf);
                on_skip(DedupError::TraversalSkip { path, source: e });
            }
        }
    }

    files
}

/// Streams `file_path` through BLAKE3 and returns the lowercase hex digest.
pub fn calculate_file_hash(file_path: &Path) -> Result<String> {
    let mut file = fs::File::open(file_path).map_err(|source| DedupError::UnreadableFile {
        path: file_path.to_path_buf(),
        source,
    })?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = [0; CHUNK_SIZE];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(DedupError::HashFailure {
                    path: file_path.to_path_buf(),
                    source,
                });
            }
        };
        hasher.update(&buffer[..bytes_read]);
        total_bytes += bytes_read as u64;
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!("Hash calculated for '{}': {} ({} bytes)", file_path.display(), hash, total_bytes);

    Ok(hash)
}
