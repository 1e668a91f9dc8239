use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use colored::Colorize;
use indicatif::{HumanBytes, HumanCount, ProgressBar, ProgressStyle};
use log::{debug, info, warn};
use rayon::prelude::*;

use crate::error::{DedupError, Result};
use crate::scanner::{calculate_file_hash, collect_files, validate_root};
use crate::utils::{FileInfo, format_human_elapsed};
use crate::verify::confirm_group;

/// A path that survived the size pre-filter, with the length it was
/// measured at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub path: PathBuf,
    pub size: u64,
}

/// Candidate paths partitioned by exact byte length. Only lengths shared by
/// at least two files are kept.
#[derive(Debug, Default)]
pub struct SizeBuckets {
    buckets: BTreeMap<u64, Vec<PathBuf>>,
}

impl SizeBuckets {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn get(&self, size: u64) -> Option<&[PathBuf]> {
        self.buckets.get(&size).map(Vec::as_slice)
    }

    /// Number of paths across all buckets.
    pub fn file_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Flattens the buckets into the hashing work list, smallest size first
    /// and in discovery order within a size.
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.buckets
            .into_iter()
            .flat_map(|(size, paths)| paths.into_iter().map(move |path| Candidate { path, size }))
            .collect()
    }
}

/// Files sharing one digest. Always holds at least two paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    pub size: u64,
    pub paths: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Bytes that could be reclaimed by keeping a single copy.
    pub fn wasted_space(&self) -> u64 {
        self.size * (self.paths.len() as u64).saturating_sub(1)
    }
}

/// Digest (lowercase hex) to the files that produced it.
pub type DuplicateGroups = BTreeMap<String, DuplicateGroup>;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Hashing worker count.
    pub threads: usize,
    /// Files shorter than this many bytes are ignored.
    pub min_size: u64,
    /// Re-check every group byte for byte before reporting it.
    pub verify: bool,
    pub show_progress: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            min_size: 0,
            verify: false,
            show_progress: false,
        }
    }
}

/// What a run saw on its way to the duplicate groups.
#[derive(Debug, Default)]
pub struct ScanSummary {
    pub root: PathBuf,
    pub files_found: usize,
    pub candidates: usize,
    pub files_hashed: usize,
    /// Per-path failures that were skipped rather than aborting the run.
    pub warnings: Vec<DedupError>,
    pub elapsed: Duration,
}

/// Measures every path and keeps the lengths shared by two or more files.
///
/// Paths whose length can no longer be read are passed to `on_skip` and left
/// out, as are files smaller than `min_size`.
pub fn bucket_by_size<S>(paths: Vec<PathBuf>, min_size: u64, mut on_skip: S) -> SizeBuckets
where
    S: FnMut(DedupError),
{
    let mut buckets: BTreeMap<u64, Vec<PathBuf>> = BTreeMap::new();

    for path in paths {
        let size = match fs::metadata(&path) {
            Ok(metadata) => metadata.len(),
            Err(source) => {
                on_skip(DedupError::SizeProbeFailure { path, source });
                continue;
            }
        };
        if size < min_size {
            continue;
        }
        buckets.entry(size).or_default().push(path);
    }

    // A file of unique size cannot have a duplicate
    buckets.retain(|_, paths| paths.len() > 1);

    SizeBuckets { buckets }
}

/// Hashes `candidates` on a pool of `threads` workers and groups them by
/// digest, dropping digests seen only once.
///
/// Candidates that fail to hash are passed to `on_skip`. Results are gathered
/// before grouping, so the map has a single owner.
pub fn group_by_digest<S>(
    candidates: Vec<Candidate>,
    threads: usize,
    progress: &ProgressBar,
    mut on_skip: S,
) -> Result<DuplicateGroups>
where
    S: FnMut(DedupError),
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()?;

    let results: Vec<Result<FileInfo>> = pool.install(|| {
        candidates
            .into_par_iter()
            .map(|Candidate { path, size }| {
                let hash = calculate_file_hash(&path);
                progress.inc(size);
                hash.map(|hash| FileInfo { path, size, hash })
            })
            .collect()
    });

    let mut hash_groups: BTreeMap<String, DuplicateGroup> = BTreeMap::new();
    for result in results {
        match result {
            Ok(FileInfo { path, size, hash }) => {
                hash_groups
                    .entry(hash)
                    .or_insert_with(|| DuplicateGroup { size, paths: Vec::new() })
                    .paths
                    .push(path);
            }
            Err(e) => on_skip(e),
        }
    }

    // Filter out groups with only one file (no duplicates)
    hash_groups.retain(|_, group| group.paths.len() > 1);

    Ok(hash_groups)
}

fn spinner(enabled: bool, message: &'static str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn hashing_bar(enabled: bool, total_bytes: u64) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(total_bytes);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {bytes}/{total_bytes} ETA: {eta}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Runs the whole pipeline over `root`: collect, bucket by size, hash and
/// group by digest, then optionally confirm each group byte for byte.
///
/// Only an invalid root or a failure to start the hashing pool is returned
/// as an error. Everything that goes wrong for a single path ends up in
/// [`ScanSummary::warnings`].
pub fn find_duplicates(root: &Path, options: &ScanOptions) -> Result<(DuplicateGroups, ScanSummary)> {
    let start_time = Instant::now();
    let root = validate_root(root)?;
    let mut walk_warnings = Vec::new();

    info!("Scanning {}", root.display());
    let pb = spinner(options.show_progress, "Scanning files and directories...");
    let files = collect_files(&root, |_| pb.tick(), |e| {
        warn!("{}", e);
        walk_warnings.push(e);
    });
    pb.finish_and_clear();
    info!("Found {} files", HumanCount(files.len() as u64));

    let (groups, mut summary) = find_duplicates_from_files(&root, files, options)?;
    walk_warnings.append(&mut summary.warnings);
    summary.warnings = walk_warnings;
    summary.elapsed = start_time.elapsed();
    Ok((groups, summary))
}

/// Runs every stage after the walk over an already collected file list.
///
/// `root` is only recorded in the summary. Paths that vanished or became
/// unreadable since they were collected are skipped with a warning.
pub fn find_duplicates_from_files(
    root: &Path,
    files: Vec<PathBuf>,
    options: &ScanOptions,
) -> Result<(DuplicateGroups, ScanSummary)> {
    let start_time = Instant::now();
    let files_found = files.len();
    let mut warnings = Vec::new();
    let mut record = |e: DedupError| {
        warn!("{}", e);
        warnings.push(e);
    };

    let buckets = bucket_by_size(files, options.min_size, &mut record);
    let candidates = buckets.into_candidates();
    let total_bytes: u64 = candidates.iter().map(|c| c.size).sum();
    info!(
        "{} files ({}) share a size with another file",
        HumanCount(candidates.len() as u64),
        HumanBytes(total_bytes)
    );
    let candidate_count = candidates.len();

    let pb = hashing_bar(options.show_progress, total_bytes);
    let mut hash_failures = 0usize;
    let mut groups = group_by_digest(candidates, options.threads, &pb, |e| {
        hash_failures += 1;
        record(e);
    })?;
    pb.finish_and_clear();
    let files_hashed = candidate_count - hash_failures;

    if options.verify {
        info!("Verifying {} groups byte for byte", HumanCount(groups.len() as u64));
        groups = groups
            .into_iter()
            .filter_map(|(digest, group)| {
                let confirmed = confirm_group(&digest, group, &mut record)?;
                Some((digest, confirmed))
            })
            .collect();
    }

    for (digest, group) in &groups {
        debug!("Group {} ({}, {} files)", digest, HumanBytes(group.size), group.paths.len());
    }

    let summary = ScanSummary {
        root: root.to_path_buf(),
        files_found,
        candidates: candidate_count,
        files_hashed,
        warnings,
        elapsed: start_time.elapsed(),
    };
    Ok((groups, summary))
}

pub fn print_results(duplicates: &DuplicateGroups, summary: &ScanSummary, report: Option<&Path>) {
    if duplicates.is_empty() {
        println!("{}", "No duplicates found.".green());
    } else {
        let total_duplicates: usize = duplicates.values().map(|group| group.paths.len() - 1).sum();
        let total_wasted_space: u64 = duplicates.values().map(DuplicateGroup::wasted_space).sum();

        println!("{}", "Duplicates found!".yellow().bold());
        println!(
            "{} groups, {} redundant files wasting {}",
            HumanCount(duplicates.len() as u64),
            HumanCount(total_duplicates as u64),
            HumanBytes(total_wasted_space)
        );
        if let Some(report) = report {
            println!("Report written to {}", report.display());
        }
    }

    if !summary.warnings.is_empty() {
        println!(
            "{}",
            format!("{} paths could not be read and were skipped", summary.warnings.len()).red()
        );
    }
    info!(
        "Scanned {} files in {}",
        HumanCount(summary.files_found as u64),
        format_human_elapsed(summary.elapsed)
    );
}
