pub mod catalog_writer;
pub mod config;
pub mod error;
pub mod layout;
pub mod library_parser;
pub mod logging;
pub mod metadata;
pub mod models;
pub mod stager;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Cli, Config};
use logging::LogSettings;
use models::SongRecord;
use stager::{AudioIndex, StageReport};

/// How a conversion run ended.
#[derive(Debug)]
pub enum Outcome {
    /// A precondition failed; nothing was read or written
    Rejected(String),
    Completed {
        records: usize,
        /// True when a new merged catalog was written
        wrote_catalog: bool,
        /// `None` for dry runs
        staged: Option<StageReport>,
    },
}

/// Entry point for the binary: parse arguments, set up logging, convert.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = if cli.no_log_file {
        None
    } else {
        Some(cli.log_dir.clone().unwrap_or_else(logging::default_log_dir))
    };
    logging::init(&LogSettings {
        debug: cli.debug,
        log_dir,
    })?;

    // Precondition failures are logged inside and end the run normally
    convert(&Config::from(&cli))?;
    Ok(())
}

/// Validates the inputs, loads or fuses the catalog, then stages audio.
pub fn convert(config: &Config) -> Result<Outcome> {
    if !config.tracks_dir.is_dir() {
        let msg = format!(
            "Takeout tracks directory must be a directory. {} is not a directory.",
            absolute(&config.tracks_dir)
        );
        tracing::error!("{}", msg);
        return Ok(Outcome::Rejected(msg));
    }

    if let Some(main_csv) = &config.main_csv {
        if !main_csv.is_file() {
            let msg = format!(
                "Main CSV file must be a csv file. {} is not a csv file.",
                absolute(main_csv)
            );
            tracing::error!("{}", msg);
            return Ok(Outcome::Rejected(msg));
        }
    }

    let (catalog, wrote_catalog) = match &config.main_csv {
        Some(main_csv) => {
            tracing::info!("Using existing catalog {}", main_csv.display());
            let catalog = library_parser::load_catalog(main_csv)
                .with_context(|| format!("Failed to read catalog {}", main_csv.display()))?;
            (catalog, false)
        }
        None => {
            let catalog = library_parser::fuse_catalog(&config.tracks_dir).with_context(|| {
                format!("Failed to merge CSV exports in {}", config.tracks_dir.display())
            })?;
            catalog_writer::write_catalog(&catalog, &config.output)
                .with_context(|| format!("Failed to write {}", config.output.display()))?;
            (catalog, true)
        }
    };

    let index = AudioIndex::scan(&config.tracks_dir)?;
    let staged = if config.dry_run {
        log_dry_run(&catalog, &index, config);
        None
    } else {
        Some(stager::stage_audio_files(
            &catalog,
            &index,
            &config.library_dir,
            config.mode,
        )?)
    };

    Ok(Outcome::Completed {
        records: catalog.len(),
        wrote_catalog,
        staged,
    })
}

fn log_dry_run(catalog: &[SongRecord], index: &AudioIndex, config: &Config) {
    let plan = stager::plan_staging(catalog, index, &config.library_dir);
    for operation in &plan.operations {
        tracing::info!(
            "[dry run] would {} {} -> {}",
            config.mode,
            operation.source.display(),
            operation.destination.display()
        );
    }
    for record in &plan.missing {
        tracing::warn!("[dry run] no audio file for '{}' by '{}'", record.title, record.artist);
    }
    tracing::info!(
        "[dry run] {} files would be staged, {} records have no audio",
        plan.operations.len(),
        plan.missing.len()
    );
}

fn absolute(path: &std::path::Path) -> String {
    std::path::absolute(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
