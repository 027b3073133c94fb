use anyhow::{Context, Result};
use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Maximum size per log file before rotation (~5 MB)
const MAX_LOG_FILE_SIZE: u64 = 5 * 1024 * 1024;
/// Number of rotated log files to keep
const MAX_LOG_FILES: usize = 5;
const LOG_FILE_STEM: &str = "takeout-converter";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

#[derive(Debug, Clone, Default)]
pub struct LogSettings {
    pub debug: bool,
    /// `None` logs to the console only
    pub log_dir: Option<PathBuf>,
}

/// Default persistent log directory: `<data dir>/takeout-converter/logs`
pub fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(LOG_FILE_STEM)
        .join("logs")
}

/// Installs the global subscriber: console on stderr, plus the rotating log
/// file when a directory is configured. `RUST_LOG` overrides the level.
pub fn init(settings: &LogSettings) -> Result<()> {
    let default_level = if settings.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let timer = ChronoLocal::new(TIMESTAMP_FORMAT.to_string());

    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(timer.clone());

    let file = settings
        .log_dir
        .as_ref()
        .and_then(|dir| match RotatingLogFile::open(dir) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("[logging] Log file disabled: {:#}", e);
                None
            }
        })
        .map(|file| {
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .with_timer(timer)
        });

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .context("Failed to install log subscriber")?;

    tracing::info!(
        "=== takeout-converter session started at {} ===",
        Local::now().format("%Y-%m-%d %H:%M:%S %Z")
    );
    Ok(())
}

/// Append-only log file that rotates
/// `takeout-converter.log` → `.1.log` → `.2.log` … once it grows too large.
pub struct RotatingLogFile {
    dir: PathBuf,
    file: File,
    size: u64,
    max_size: u64,
    max_files: usize,
}

impl RotatingLogFile {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        Self::with_limits(dir, MAX_LOG_FILE_SIZE, MAX_LOG_FILES)
    }

    pub fn with_limits<P: AsRef<Path>>(dir: P, max_size: u64, max_files: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

        let path = current_log_path(&dir);
        let file = open_append(&path)?;
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

        Ok(Self {
            dir,
            file,
            size,
            max_size,
            max_files,
        })
    }

    /// The active log file.
    pub fn path(&self) -> PathBuf {
        current_log_path(&self.dir)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        // Shift existing rotated files, the oldest falls off the end
        for i in (1..self.max_files).rev() {
            let from = rotated_log_path(&self.dir, i);
            let to = rotated_log_path(&self.dir, i + 1);
            let _ = fs::rename(&from, &to);
        }
        fs::rename(self.path(), rotated_log_path(&self.dir, 1))?;

        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path())?;
        self.size = 0;
        Ok(())
    }
}

impl Write for RotatingLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.size > 0 && self.size + buf.len() as u64 > self.max_size {
            self.rotate()?;
        }
        let written = self.file.write(buf)?;
        self.size += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

fn current_log_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.log", LOG_FILE_STEM))
}

fn rotated_log_path(dir: &Path, generation: usize) -> PathBuf {
    dir.join(format!("{}.{}.log", LOG_FILE_STEM, generation))
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}
