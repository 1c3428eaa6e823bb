use anyhow::Result;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Opens the SQLite pool behind the live backend.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    prepare_sqlite_file(database_url)?;
    // Every connection to `:memory:` is its own database, so keep exactly one alive.
    let options = if is_in_memory(database_url) {
        SqlitePoolOptions::new().max_connections(1).idle_timeout(None).max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };
    Ok(options.connect(database_url).await?)
}

fn is_in_memory(database_url: &str) -> bool { database_url.contains(":memory:") }

/// Ensures the SQLite file (and its parent directory) exists for file-backed URLs.
pub fn prepare_sqlite_file(database_url: &str) -> Result<()> {
    if is_in_memory(database_url) { return Ok(()); }
    let Some(path) = database_url.strip_prefix("sqlite://") else { return Ok(()) };
    let path = path.split('?').next().unwrap_or(path);
    // On Windows, absolute paths may look like /C:/path
    let path = if cfg!(windows) && path.len() >= 3 && path.as_bytes()[0] == b'/' && path.as_bytes()[2] == b':' {
        &path[1..]
    } else {
        path
    };
    use std::{fs, fs::OpenOptions, path::Path};
    let p = Path::new(path);
    if let Some(parent) = p.parent() {
        if !parent.as_os_str().is_empty() { fs::create_dir_all(parent)?; }
    }
    if !p.exists() {
        OpenOptions::new().create(true).append(true).open(p)?;
    }
    Ok(())
}
