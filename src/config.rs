use std::path::PathBuf;

use clap::Parser;

use crate::catalog_writer::CATALOG_FILE_NAME;
use crate::stager::StageMode;

const DEFAULT_TRACKS_DIR: &str = "testfiles";
const DEFAULT_LIBRARY_SUBDIR: &str = "library";

#[derive(Debug, Parser)]
#[command(
    name = "takeout-converter",
    version,
    about = "Convert music takeout results to a library-friendly structure"
)]
pub struct Cli {
    /// Directory containing the flat list of tracks and their CSV exports
    #[arg(
        value_name = "TAKEOUT_TRACKS_DIRECTORY",
        env = "TAKEOUT_TRACKS_DIR",
        default_value = DEFAULT_TRACKS_DIR
    )]
    pub takeout_tracks_directory: PathBuf,

    /// Do not rename, remove or create any audio files. The merged CSV is
    /// still written for manual confirmation
    #[arg(long)]
    pub dry_run: bool,

    /// Move files instead of copying them to save space. An interrupted run
    /// cannot be rolled back
    #[arg(long)]
    pub move_files: bool,

    /// Existing merged CSV to stage from. Skips the CSV scrape step; produce
    /// one with --dry-run first
    #[arg(long, value_name = "PATH", env = "TAKEOUT_MAIN_CSV")]
    pub main_csv: Option<PathBuf>,

    /// Where the merged CSV is written
    #[arg(long, value_name = "PATH", default_value = CATALOG_FILE_NAME)]
    pub output: PathBuf,

    /// Root of the staged <Artist>/<Album>/ tree [default: <TAKEOUT_TRACKS_DIRECTORY>/library]
    #[arg(long, value_name = "PATH", env = "TAKEOUT_LIBRARY_DIR")]
    pub library_directory: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Directory for the persistent log file
    #[arg(long, value_name = "PATH", env = "TAKEOUT_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log to the console only
    #[arg(long)]
    pub no_log_file: bool,
}

/// Resolved run settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub tracks_dir: PathBuf,
    pub main_csv: Option<PathBuf>,
    pub output: PathBuf,
    pub library_dir: PathBuf,
    pub dry_run: bool,
    pub mode: StageMode,
}

impl Config {
    pub fn new(tracks_dir: PathBuf) -> Self {
        Config {
            library_dir: tracks_dir.join(DEFAULT_LIBRARY_SUBDIR),
            tracks_dir,
            main_csv: None,
            output: PathBuf::from(CATALOG_FILE_NAME),
            dry_run: false,
            mode: StageMode::Copy,
        }
    }
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        let mut config = Config::new(cli.takeout_tracks_directory.clone());
        if let Some(library_dir) = &cli.library_directory {
            config.library_dir = library_dir.clone();
        }
        // An empty path means "not given"
        config.main_csv = cli
            .main_csv
            .clone()
            .filter(|p| !p.as_os_str().is_empty());
        config.output = cli.output.clone();
        config.dry_run = cli.dry_run;
        config.mode = if cli.move_files {
            StageMode::Move
        } else {
            StageMode::Copy
        };
        config
    }
}
