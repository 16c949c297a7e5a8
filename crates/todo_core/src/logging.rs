//! Process-wide file logging for the todo core.
//!
//! One rolling `todo_*.log` set per process, started by the first successful
//! `init_logging` call. Events are `key=value` metadata: ids, counts and
//! statuses. Todo titles and descriptions never reach the log.

use crate::config::TodoConfig;
use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Once;

const LOG_FILE_BASENAME: &str = "todo";
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;
const KEEP_LOG_FILES: usize = 5;
const PANIC_PAYLOAD_LIMIT: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: Once = Once::new();

/// Logging setup failure.
#[derive(Debug)]
pub enum LoggingError {
    UnsupportedLevel(String),
    InvalidDir(String),
    CreateDir { dir: PathBuf, source: std::io::Error },
    Backend(flexi_logger::FlexiLoggerError),
    /// Logging already runs with a different level or directory.
    Conflict {
        active_level: LevelFilter,
        active_dir: PathBuf,
    },
}

impl Display for LoggingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedLevel(level) => write!(
                f,
                "unsupported log level `{level}`; expected trace|debug|info|warn|error"
            ),
            Self::InvalidDir(message) => f.write_str(message),
            Self::CreateDir { dir, source } => {
                write!(f, "cannot create log directory `{}`: {source}", dir.display())
            }
            Self::Backend(err) => write!(f, "logger backend failed to start: {err}"),
            Self::Conflict {
                active_level,
                active_dir,
            } => write!(
                f,
                "logging already runs at {active_level} in `{}`",
                active_dir.display()
            ),
        }
    }
}

impl Error for LoggingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } => Some(source),
            Self::Backend(err) => Some(err),
            _ => None,
        }
    }
}

struct ActiveLogger {
    level: LevelFilter,
    dir: PathBuf,
    _handle: LoggerHandle,
}

impl ActiveLogger {
    fn accepts(&self, level: LevelFilter, dir: &Path) -> Result<(), LoggingError> {
        if self.level == level && self.dir == dir {
            return Ok(());
        }
        Err(LoggingError::Conflict {
            active_level: self.level,
            active_dir: self.dir.clone(),
        })
    }
}

/// Starts file logging at `level` under the absolute directory `log_dir`.
///
/// Calling again with the same pair is a no-op; any other pair is a
/// `Conflict`. Never panics.
pub fn init_logging(level: &str, log_dir: &str) -> Result<(), LoggingError> {
    let level = parse_level(level)?;
    let dir = parse_dir(log_dir)?;
    ACTIVE
        .get_or_try_init(|| start(level, &dir))?
        .accepts(level, &dir)
}

/// Starts logging from `config`. `Ok(false)` means no `log_dir` was set and
/// logging stays off.
pub fn init_logging_from_config(config: &TodoConfig) -> Result<bool, LoggingError> {
    let Some(dir) = &config.log_dir else {
        return Ok(false);
    };
    let dir = dir.to_str().ok_or_else(|| {
        LoggingError::InvalidDir(format!("log_dir is not valid UTF-8: `{}`", dir.display()))
    })?;
    init_logging(&config.log_level, dir)?;
    Ok(true)
}

/// `debug` for debug builds, `info` otherwise.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(level: LevelFilter, dir: &Path) -> Result<ActiveLogger, LoggingError> {
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
        dir: dir.to_path_buf(),
        source,
    })?;

    let spec = LogSpecification::builder().default(level).build();
    let handle = Logger::with(spec)
        .log_to_file(FileSpec::default().directory(dir).basename(LOG_FILE_BASENAME))
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(LoggingError::Backend)?;

    PANIC_HOOK.call_once(install_panic_hook);
    info!(
        "event=logging_start module=core status=ok level={level} os={} debug_build={} version={}",
        std::env::consts::OS,
        cfg!(debug_assertions),
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        level,
        dir: dir.to_path_buf(),
        _handle: handle,
    })
}

fn parse_level(raw: &str) -> Result<LevelFilter, LoggingError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "trace" => Ok(LevelFilter::Trace),
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" | "warning" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        other => Err(LoggingError::UnsupportedLevel(other.to_string())),
    }
}

fn parse_dir(raw: &str) -> Result<PathBuf, LoggingError> {
    let path = Path::new(raw.trim());
    if path.as_os_str().is_empty() {
        return Err(LoggingError::InvalidDir("log_dir cannot be empty".to_string()));
    }
    if !path.is_absolute() {
        return Err(LoggingError::InvalidDir(format!(
            "log_dir must be an absolute path, got `{}`",
            path.display()
        )));
    }
    Ok(path.to_path_buf())
}

fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let location = panic_info
            .location()
            .map_or_else(|| "unknown".to_string(), |loc| format!("{}:{}", loc.file(), loc.line()));
        let payload = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        error!(
            "event=panic module=core status=error location={location} payload={}",
            one_line(&payload, PANIC_PAYLOAD_LIMIT)
        );
        previous(panic_info);
    }));
}

/// Panic payloads may quote todo text: flatten to one line and cap length.
fn one_line(text: &str, limit: usize) -> String {
    let flat = text.replace(['\n', '\r'], " ");
    if flat.chars().count() <= limit {
        return flat;
    }
    let mut cut: String = flat.chars().take(limit).collect();
    cut.push_str("...");
    cut
}
