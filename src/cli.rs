use clap::Parser;
use std::path::PathBuf;

use crate::report::ReportFormat;

#[derive(Parser, Debug)]
#[command(name = "find-file-dups")]
#[command(version, about = "Find files with identical content in a directory tree")]
pub struct Cli {
    /// Directory to scan for duplicates
    pub path: PathBuf,

    /// Number of parallel threads for hashing (default: number of CPU cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Skip files smaller than this many bytes (default: 0)
    #[arg(short, long)]
    pub min_size: Option<u64>,

    /// Directory the report is written to (default: current directory)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Report format
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Compare every duplicate group byte for byte before reporting it
    #[arg(long)]
    pub verify: bool,

    /// Disable progress bars
    #[arg(long)]
    pub no_progress: bool,

    /// TOML config file (default: ./find-file-dups.toml if present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}
