use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;

use crate::cli::Cli;
use crate::duplicates::ScanOptions;
use crate::error::{DedupError, Result};
use crate::report::ReportFormat;

/// Looked up in the current directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = concat!(env!("CARGO_PKG_NAME"), ".toml");

/// Values read from a TOML config file. Every key is optional.
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub threads: Option<usize>,
    pub min_size: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub format: Option<ReportFormat>,
    pub verify: Option<bool>,
    pub progress: Option<bool>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| DedupError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| DedupError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Effective settings for one run: defaults, then the config file, then
/// command line flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub scan: ScanOptions,
    pub output_dir: PathBuf,
    pub format: ReportFormat,
}

impl Settings {
    pub fn resolve(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => {
                info!("Loading config from '{}'", path.display());
                FileConfig::load(path)?
            }
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                info!("Loading config from '{}'", DEFAULT_CONFIG_FILE);
                FileConfig::load(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => FileConfig::default(),
        };
        let settings = Self::merge(cli, file);
        debug!("Effective settings: {:?}", settings);
        Ok(settings)
    }

    pub fn merge(cli: &Cli, file: FileConfig) -> Self {
        let defaults = ScanOptions::default();
        let scan = ScanOptions {
            threads: cli.threads.or(file.threads).unwrap_or(defaults.threads).max(1),
            min_size: cli.min_size.or(file.min_size).unwrap_or(defaults.min_size),
            verify: cli.verify || file.verify.unwrap_or(defaults.verify),
            show_progress: !cli.no_progress && file.progress.unwrap_or(true),
        };

        Self {
            root: cli.path.clone(),
            scan,
            output_dir: cli
                .output_dir
                .clone()
                .or(file.output_dir)
                .unwrap_or_else(|| PathBuf::from(".")),
            format: cli.format.or(file.format).unwrap_or_default(),
        }
    }
}
