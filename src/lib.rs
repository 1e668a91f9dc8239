pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod report;
pub mod scanner;
pub mod utils;
pub mod verify;

pub use cli::Cli;
pub use config::Settings;
pub use duplicates::{
    Candidate, DuplicateGroup, DuplicateGroups, ScanOptions, ScanSummary, SizeBuckets,
    bucket_by_size, find_duplicates, find_duplicates_from_files, group_by_digest, print_results,
};
pub use error::DedupError;
pub use report::{ReportFormat, write_report};
pub use scanner::{calculate_file_hash, collect_files, validate_root};
pub use utils::FileInfo;
