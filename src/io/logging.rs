//! File logging for the `gt` binary.
//!
//! Logging is off unless a level is requested (`--log-level` or
//! `GANTRY_LOG`). Initialization happens at most once per process and never
//! panics; a failure is reported to the caller and the program continues
//! without logs.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, LoggerHandle, Naming, WriteMode};

/// Environment variable consulted when no `--log-level` flag is given
pub const LOG_ENV: &str = "GANTRY_LOG";

const LOG_BASENAME: &str = "gantry";
const MAX_LOG_FILE_BYTES: u64 = 5 * 1024 * 1024;
const MAX_LOG_FILES: usize = 3;

struct LoggingState {
    dir: PathBuf,
    handle: LoggerHandle,
}

static LOGGING: OnceLock<LoggingState> = OnceLock::new();

/// Normalize a user-supplied level name
pub fn parse_level(level: &str) -> Result<&'static str, String> {
    match level.trim().to_ascii_lowercase().as_str() {
        "error" => Ok("error"),
        "warn" | "warning" => Ok("warn"),
        "info" => Ok("info"),
        "debug" => Ok("debug"),
        "trace" => Ok("trace"),
        other => Err(format!("unsupported log level `{}`", other)),
    }
}

pub fn log_dir(gantry_dir: &Path) -> PathBuf {
    gantry_dir.join("logs")
}

/// Start rotating file logs under `<gantry_dir>/logs`.
/// Calling again with the same directory is a no-op.
pub fn init_logging(level: &str, gantry_dir: &Path) -> Result<(), String> {
    let level = parse_level(level)?;
    let dir = log_dir(gantry_dir);

    if let Some(state) = LOGGING.get() {
        return if state.dir == dir {
            Ok(())
        } else {
            Err(format!("logging already initialized at {}", state.dir.display()))
        };
    }

    std::fs::create_dir_all(&dir)
        .map_err(|e| format!("could not create log directory {}: {}", dir.display(), e))?;

    let handle = Logger::try_with_str(level)
        .map_err(|e| format!("invalid log level `{}`: {}", level, e))?
        .log_to_file(FileSpec::default().directory(dir.as_path()).basename(LOG_BASENAME))
        .rotate(
            Criterion::Size(MAX_LOG_FILE_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(MAX_LOG_FILES),
        )
        .write_mode(WriteMode::BufferAndFlush)
        .append()
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|e| format!("could not start logger: {}", e))?;

    log::info!(
        "gantry {} logging at {} to {}",
        env!("CARGO_PKG_VERSION"),
        level,
        dir.display()
    );

    let _ = LOGGING.set(LoggingState {
        dir,
        handle,
    });
    Ok(())
}

/// Flush buffered records; call before exiting
pub fn flush() {
    if let Some(state) = LOGGING.get() {
        state.handle.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_names_are_normalized() {
        assert_eq!(parse_level("WARNING"), Ok("warn"));
        assert_eq!(parse_level(" debug "), Ok("debug"));
        assert!(parse_level("loud").is_err());
    }

    #[test]
    fn log_dir_is_inside_gantry_dir() {
        assert_eq!(log_dir(Path::new("/p/gantry")), PathBuf::from("/p/gantry/logs"));
    }
}
