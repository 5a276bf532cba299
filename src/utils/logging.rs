// Luna Miner - Free and Open Source Software Statement
//
// This project, luna-miner, is Free and Open Source Software (FOSS) licensed
// under the MIT License. You are free to use, modify, and distribute this
// software in accordance with the license terms. Contributions are welcome
// via pull requests to the project repository.
//
// File: src/utils/logging.rs
// Version: 1.0.0
// Developer: OIEIEIO <oieieio@protonmail.com>
//
// log4rs setup for the luna-miner binary: a console appender plus a file
// appender at `{data_dir}/logs/luna-miner.log`.

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONSOLE_PATTERN: &str = "{d(%H:%M:%S)} {h({l:5})} {m}{n}";
const FILE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {l:5} [{t}] {m}{n}";

pub const LOG_FILE_NAME: &str = "luna-miner.log";

#[derive(Error, Debug)]
pub enum LoggingError {
    #[error("Unknown log level: {0}")]
    InvalidLevel(String),

    #[error("Cannot open log file {path:?}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid logging configuration: {0}")]
    Config(String),

    #[error("Logging already initialized")]
    AlreadyInitialized,
}

pub fn log_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join("logs").join(LOG_FILE_NAME)
}

/// Install the global logger. `level` is one of error, warn, info, debug, trace.
pub fn init_logging(data_dir: &Path, level: &str) -> Result<PathBuf, LoggingError> {
    let level: LevelFilter = level
        .parse()
        .map_err(|_| LoggingError::InvalidLevel(level.to_string()))?;
    let path = log_file_path(data_dir);

    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();
    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
        .build(&path)
        .map_err(|source| LoggingError::File {
            path: path.clone(),
            source,
        })?;

    let config = Config::builder()
        .appender(Appender::builder().build("console", Box::new(console)))
        .appender(Appender::builder().build("file", Box::new(file)))
        // HTTP client internals are noisy below warn
        .logger(Logger::builder().build("reqwest", LevelFilter::Warn))
        .logger(Logger::builder().build("hyper", LevelFilter::Warn))
        .logger(Logger::builder().build("rustls", LevelFilter::Warn))
        .build(Root::builder().appender("console").appender("file").build(level))
        .map_err(|e| LoggingError::Config(e.to_string()))?;

    log4rs::init_config(config).map_err(|_| LoggingError::AlreadyInitialized)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            init_logging(dir.path(), "loud"),
            Err(LoggingError::InvalidLevel(_))
        ));
    }

    #[test]
    fn test_log_file_lives_under_logs() {
        assert_eq!(
            log_file_path(Path::new("/tmp/luna")),
            PathBuf::from("/tmp/luna/logs/luna-miner.log")
        );
    }
}

// Changelog:
// - v1.0.0 (2025-07-02): Programmatic log4rs console + file logging.
