use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crumb_core::DatabaseEntry;

use crate::optimizer::optimize_entries;
use crate::parser::parse_cookie_database;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not valid UTF-8")]
    InvalidUtf8 { path: PathBuf },
    #[error("{path} contains no usable cookie entries")]
    Empty { path: PathBuf },
}

/// Read, parse and optimize a database file.
pub fn load_database(path: impl AsRef<Path>) -> Result<Vec<DatabaseEntry>, DatabaseError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| DatabaseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let text = String::from_utf8(bytes).map_err(|_| DatabaseError::InvalidUtf8 {
        path: path.to_path_buf(),
    })?;

    let entries = load_database_text(&text);
    if entries.is_empty() {
        return Err(DatabaseError::Empty { path: path.to_path_buf() });
    }

    log::info!("Loaded {} cookie database entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Parse and optimize database text already in memory.
pub fn load_database_text(text: &str) -> Vec<DatabaseEntry> {
    let output = parse_cookie_database(text);
    if output.skipped > 0 {
        log::warn!("Skipped {} malformed database rows", output.skipped);
    }

    let mut entries = output.entries;
    let stats = optimize_entries(&mut entries);
    log::debug!(
        "Database optimize: {} -> {} entries ({} duplicates, {} without name)",
        stats.before,
        stats.after,
        stats.deduped,
        stats.empty_names
    );
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("crumb-db-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_database() {
        let path = temp_file(
            "ok.csv",
            b"ID,a,b,c,d,e,f,g,h,i\n1,Google,Analytics,_ga,x,Tracks,2y,G,p,0\n2,Google,Analytics,_ga,x,Dup,2y,G,p,0\n",
        );
        let entries = load_database(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].description, "Tracks");
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file() {
        let err = load_database("/nonexistent/crumb.csv").unwrap_err();
        assert!(matches!(err, DatabaseError::Io { .. }));
    }

    #[test]
    fn test_empty_database_is_error() {
        let path = temp_file("empty.csv", b"ID,a,b,c,d,e,f,g,h,i\n");
        assert!(matches!(load_database(&path), Err(DatabaseError::Empty { .. })));
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_invalid_utf8() {
        let path = temp_file("bad.csv", &[0xff, 0xfe, 0x00]);
        assert!(matches!(load_database(&path), Err(DatabaseError::InvalidUtf8 { .. })));
        fs::remove_file(path).ok();
    }
}
