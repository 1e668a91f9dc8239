use std::io;
use std::path::PathBuf;

/// Errors raised by the duplicate detection pipeline.
///
/// Only [`DedupError::InvalidRoot`], [`DedupError::Config`],
/// [`DedupError::ThreadPool`] and [`DedupError::ReportWriteFailure`] end a run.
/// The per-path variants are collected as warnings in the scan summary and
/// the affected path is left out of the result.
#[derive(thiserror::Error, Debug)]
pub enum DedupError {
    /// The scan root is missing, not a directory, or not readable.
    #[error("Invalid root '{}': {reason}", .path.display())]
    InvalidRoot { path: PathBuf, reason: String },

    /// A directory entry could not be visited during the walk.
    #[error("Skipped '{}': {source}", display_optional(.path))]
    TraversalSkip {
        path: Option<PathBuf>,
        #[source]
        source: walkdir::Error,
    },

    /// The length of a candidate could not be read before bucketing.
    #[error("Failed to read size of '{}': {source}", .path.display())]
    SizeProbeFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A candidate could not be opened for hashing.
    #[error("Failed to open '{}': {source}", .path.display())]
    UnreadableFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading a candidate failed part way through hashing.
    #[error("Failed to hash '{}': {source}", .path.display())]
    HashFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A group member could not be read during byte comparison.
    #[error("Failed to compare '{}': {source}", .path.display())]
    VerifyFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write report '{}': {source}", .path.display())]
    ReportWriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid config '{}': {message}", .path.display())]
    Config { path: PathBuf, message: String },

    #[error("Failed to build hashing thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl DedupError {
    /// The path a per-file error refers to, if any.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::InvalidRoot { path, .. }
            | Self::SizeProbeFailure { path, .. }
            | Self::UnreadableFile { path, .. }
            | Self::HashFailure { path, .. }
            | Self::VerifyFailure { path, .. }
            | Self::ReportWriteFailure { path, .. }
            | Self::Config { path, .. } => Some(path.as_path()),
            Self::TraversalSkip { path, .. } => path.as_deref(),
            Self::ThreadPool(_) => None,
        }
    }
}

fn display_optional(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

pub type Result<T> = std::result::Result<T, DedupError>;
