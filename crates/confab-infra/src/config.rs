//! Data directory and database URL resolution.

use std::path::PathBuf;

/// Resolve the data directory: `CONFAB_DATA_DIR` if set, else `~/.confab`.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CONFAB_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".confab")
}

/// The database URL for a given data directory, in read-write-create mode.
pub fn database_url(data_dir: &std::path::Path) -> String {
    format!("sqlite://{}?mode=rwc", data_dir.join("confab.db").display())
}
