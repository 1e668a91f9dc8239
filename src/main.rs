use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info};

use find_file_dups::logging::init_logging;
use find_file_dups::report::now;
use find_file_dups::{Cli, Settings, find_duplicates, print_results, write_report};

fn main() -> Result<()> {
    // Read the local offset while the process is still single-threaded
    let started_at = now();
    let cli = Cli::parse();
    init_logging(cli.verbose).context("Failed to initialize logging")?;

    info!("Starting {} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
    debug!("Command line arguments: {:?}", cli);

    let settings = Settings::resolve(&cli)?;
    info!("Target directory: '{}'", settings.root.display());

    let (duplicates, summary) = find_duplicates(&settings.root, &settings.scan)
        .with_context(|| format!("Failed to scan '{}'", settings.root.display()))?;

    let report = if duplicates.is_empty() {
        None
    } else {
        let path = write_report(
            &duplicates,
            &summary.root,
            &settings.output_dir,
            settings.format,
            started_at,
        )
        .context("Duplicates were found but the report could not be saved")?;
        Some(path)
    };

    print_results(&duplicates, &summary, report.as_deref());
    info!("Program completed successfully");
    Ok(())
}
