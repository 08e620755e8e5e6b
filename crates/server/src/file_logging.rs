//! Console logging plus optional rotating file output.
//!
//! # Configuration
//!
//! - `BOARDROOM_FILE_LOGGING`: "true" or "1" enables file logging
//! - `BOARDROOM_LOG_DIR`: log directory (defaults to `{data_dir}/logs`)
//! - `BOARDROOM_LOG_MAX_FILES`: number of daily log files to retain (default: 7)
//!
//! Log files are JSON lines:
//! ```json
//! {"timestamp":"2025-12-26T10:30:00Z","level":"INFO","target":"server","message":"..."}
//! ```

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};
use utils::assets::data_dir;

const LOG_FILE_PREFIX: &str = "boardroom.log";
const DEFAULT_MAX_FILES: usize = 7;

#[derive(Debug, Clone)]
pub struct FileLoggingConfig {
    pub enabled: bool,
    pub log_dir: PathBuf,
    pub max_files: usize,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        let enabled = std::env::var("BOARDROOM_FILE_LOGGING")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        let log_dir = std::env::var("BOARDROOM_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir().join("logs"));

        let max_files = std::env::var("BOARDROOM_LOG_MAX_FILES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MAX_FILES);

        Self {
            enabled,
            log_dir,
            max_files,
        }
    }
}

/// Filter applied to both outputs: our crates at `log_level`, everything else at warn.
pub fn filter_directives(log_level: &str) -> String {
    format!(
        "warn,server={level},services={level},db={level},utils={level}",
        level = log_level
    )
}

fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_new(filter_directives(log_level)).unwrap_or_else(|e| {
        eprintln!("Invalid log level '{}': {}, using info", log_level, e);
        EnvFilter::new(filter_directives("info"))
    })
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop and must live as long
/// as the process. `None` when file logging is off or could not be set up.
pub fn init_logging(log_level: &str) -> Option<WorkerGuard> {
    let config = FileLoggingConfig::default();
    let console_layer = tracing_subscriber::fmt::layer().with_filter(env_filter(log_level));

    if !config.enabled {
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    }

    if let Err(e) = std::fs::create_dir_all(&config.log_dir) {
        eprintln!("Failed to create log directory {:?}: {}", config.log_dir, e);
        tracing_subscriber::registry().with(console_layer).init();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(env_filter(log_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!(
        log_dir = ?config.log_dir,
        max_files = config.max_files,
        "File logging enabled"
    );

    let log_dir = config.log_dir.clone();
    let max_files = config.max_files;
    std::thread::spawn(move || {
        cleanup_old_logs(&log_dir, max_files);
    });

    Some(guard)
}

/// Keep only the newest `max_files` log files.
fn cleanup_old_logs(log_dir: &Path, max_files: usize) {
    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };

    let mut log_files: Vec<_> = entries
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(LOG_FILE_PREFIX))
        })
        .filter_map(|e| {
            e.metadata()
                .ok()
                .and_then(|m| m.modified().ok())
                .map(|t| (e.path(), t))
        })
        .collect();

    // Newest first
    log_files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, _) in log_files.into_iter().skip(max_files) {
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!("Failed to remove old log file {:?}: {}", path, e);
        } else {
            tracing::debug!("Removed old log file: {:?}", path);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, thread, time::Duration};

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn directives_cover_every_crate() {
        let directives = filter_directives("debug");
        for target in ["server=debug", "services=debug", "db=debug", "utils=debug"] {
            assert!(directives.contains(target), "{directives}");
        }
        assert!(directives.starts_with("warn,"));
    }

    #[test]
    fn cleanup_keeps_the_newest_files() {
        let dir = TempDir::new().unwrap();
        for day in ["2025-01-01", "2025-01-02", "2025-01-03"] {
            fs::write(dir.path().join(format!("{LOG_FILE_PREFIX}.{day}")), day).unwrap();
            thread::sleep(Duration::from_millis(20));
        }
        fs::write(dir.path().join("other.txt"), "keep").unwrap();

        cleanup_old_logs(dir.path(), 2);

        assert!(!dir.path().join(format!("{LOG_FILE_PREFIX}.2025-01-01")).exists());
        assert!(dir.path().join(format!("{LOG_FILE_PREFIX}.2025-01-03")).exists());
        assert!(dir.path().join("other.txt").exists());
    }
}
