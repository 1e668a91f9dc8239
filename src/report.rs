//! Report rendering and writing.
//!
//! Reports are rendered fully in memory and then written to a temporary
//! sibling file that is renamed into place, so a failed write never leaves a
//! truncated report behind.

use std::borrow::Cow;
use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use log::info;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::macros::format_description;

use crate::duplicates::DuplicateGroups;
use crate::error::{DedupError, Result};
use crate::utils::sanitize_file_component;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Digest line followed by one absolute path per line
    #[default]
    Text,
    /// JSON document with one object per group
    Json,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
        }
    }
}

// Paths are stored lossily so a non UTF-8 file name cannot fail the report
#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    root: Cow<'a, str>,
    groups: Vec<JsonGroup<'a>>,
}

#[derive(Serialize)]
struct JsonGroup<'a> {
    digest: &'a str,
    size: u64,
    paths: Vec<Cow<'a, str>>,
}

/// Current local time, or UTC when the local offset cannot be determined.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

fn timestamp(at: OffsetDateTime) -> String {
    let format = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]");
    at.format(&format)
        .unwrap_or_else(|_| at.unix_timestamp().to_string())
}

/// File name for a report generated at `at`, e.g.
/// `duplicates_2024_05_01T12_34_56_789.txt`.
pub fn report_file_name(at: OffsetDateTime, format: ReportFormat) -> String {
    format!(
        "duplicates_{}.{}",
        sanitize_file_component(&timestamp(at)),
        format.extension()
    )
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

/// Digest line, then one path per line. On Unix paths are written as their
/// raw bytes so every line names a file that exists.
pub fn render_text(groups: &DuplicateGroups) -> Vec<u8> {
    let mut out = Vec::new();
    for (digest, group) in groups {
        out.extend_from_slice(digest.as_bytes());
        out.push(b'\n');
        for path in &group.paths {
            out.extend_from_slice(&path_bytes(path));
            out.push(b'\n');
        }
    }
    out
}

pub fn render_json(groups: &DuplicateGroups, root: &Path, at: OffsetDateTime) -> serde_json::Result<String> {
    let report = JsonReport {
        generated_at: timestamp(at),
        root: root.to_string_lossy(),
        groups: groups
            .iter()
            .map(|(digest, group)| JsonGroup {
                digest,
                size: group.size,
                paths: group.paths.iter().map(|p| p.to_string_lossy()).collect(),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&report)
}

/// Picks a report path in `output_dir` that does not exist yet, adding
/// `_1`, `_2`, ... before the extension when reports share a timestamp.
fn unused_report_path(output_dir: &Path, at: OffsetDateTime, format: ReportFormat) -> PathBuf {
    let name = report_file_name(at, format);
    let mut target = output_dir.join(&name);
    let stem = Path::new(&name).file_stem().map(OsStr::to_owned).unwrap_or_default();
    let mut attempt = 1u32;
    while target.exists() {
        let mut candidate = stem.clone();
        candidate.push(format!("_{attempt}.{}", format.extension()));
        target = output_dir.join(candidate);
        attempt += 1;
    }
    target
}

fn write_atomically(target: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp_name = target.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    let result = (|| {
        let mut file = fs::File::create(&tmp)?;
        file.write_all(contents)?;
        file.sync_all()?;
        fs::rename(&tmp, target)
    })();
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

/// Renders `groups` and writes them into `output_dir`, returning the path of
/// the new report.
pub fn write_report(
    groups: &DuplicateGroups,
    root: &Path,
    output_dir: &Path,
    format: ReportFormat,
    at: OffsetDateTime,
) -> Result<PathBuf> {
    let target = unused_report_path(output_dir, at, format);
    let contents = match format {
        ReportFormat::Text => render_text(groups),
        ReportFormat::Json => render_json(groups, root, at)
            .map_err(|e| DedupError::ReportWriteFailure {
                path: target.clone(),
                source: e.into(),
            })?
            .into_bytes(),
    };

    write_atomically(&target, &contents).map_err(|source| DedupError::ReportWriteFailure {
        path: target.clone(),
        source,
    })?;

    // Report paths are absolute; tolerate failure for display only
    let target = target.canonicalize().unwrap_or(target);
    info!("Report written to '{}'", target.display());
    Ok(target)
}
