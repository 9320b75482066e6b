use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

/// Turns a bare or relative path into an absolute `sqlite://` URL. In-memory
/// URLs pass through untouched.
pub fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if is_in_memory(trimmed) || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn is_in_memory(url: &str) -> bool {
    url == "sqlite::memory:" || url.contains("mode=memory")
}

/// Creates the database file and its parent directories so the first
/// connection does not fail on a fresh checkout.
pub fn prepare_sqlite_file(db_url: &str) -> Result<()> {
    if is_in_memory(db_url) {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid database url: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid database url: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_urls_are_kept() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        let shared = "sqlite:file:demo?mode=memory&cache=shared";
        assert_eq!(normalize_sqlite_url(shared), shared);
        assert!(prepare_sqlite_file(shared).is_ok());
    }

    #[test]
    fn relative_paths_become_absolute() {
        let url = normalize_sqlite_url("sqlite:data/prep.sqlite3");
        assert!(url.starts_with("sqlite:///"));
        assert!(url.ends_with("data/prep.sqlite3"));
    }

    #[test]
    fn absolute_urls_are_kept() {
        assert_eq!(
            normalize_sqlite_url("sqlite:///tmp/prep.sqlite3"),
            "sqlite:///tmp/prep.sqlite3"
        );
    }

    #[test]
    fn non_file_urls_are_rejected() {
        assert!(prepare_sqlite_file("postgres://localhost/prep").is_err());
    }
}
