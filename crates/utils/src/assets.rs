use std::path::{Path, PathBuf};

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");

/// Directory holding the SQLite database and log files.
///
/// Respects `BOARDROOM_DATA_DIR`. Debug builds default to `dev_data/` at the
/// workspace root, release builds to the platform data directory
/// (`~/.local/share/boardroom` on Linux).
pub fn data_dir() -> PathBuf {
    let path = if let Ok(custom) = std::env::var("BOARDROOM_DATA_DIR") {
        expand_tilde(&custom)
    } else if cfg!(debug_assertions) {
        PathBuf::from(PROJECT_ROOT).join("../../dev_data")
    } else {
        ProjectDirs::from("dev", "boardroom", "boardroom")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    };

    if !path.exists()
        && let Err(error) = std::fs::create_dir_all(&path)
    {
        tracing::warn!(?error, path = %path.display(), "failed to create data directory");
    }

    path
}

/// Default SQLite file location: `{data_dir}/boardroom.sqlite`.
pub fn default_database_path() -> PathBuf {
    data_dir().join("boardroom.sqlite")
}

/// Expand a leading `~/` using `$HOME`.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Ok(home) = std::env::var("HOME")
    {
        return Path::new(&home).join(rest);
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn expands_home_prefix() {
        let home = std::env::var("HOME").unwrap_or_default();
        let expanded = expand_tilde("~/boards/db.sqlite");
        assert_eq!(expanded, Path::new(&home).join("boards/db.sqlite"));
    }

    #[test]
    fn leaves_absolute_paths_alone() {
        assert_eq!(expand_tilde("/var/lib/db.sqlite"), PathBuf::from("/var/lib/db.sqlite"));
    }

    #[test]
    #[serial]
    fn data_dir_honours_override() {
        let temp = tempfile::TempDir::new().unwrap();
        let target = temp.path().join("nested");
        // SAFETY: serialised with the other env-touching tests in this module.
        unsafe { std::env::set_var("BOARDROOM_DATA_DIR", &target) };
        let dir = data_dir();
        unsafe { std::env::remove_var("BOARDROOM_DATA_DIR") };

        assert_eq!(dir, target);
        assert!(target.exists());
    }
}
