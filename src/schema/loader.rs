//! Load `.avsc` files and directories into one [`SchemaSet`]

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{SchemaParser, SchemaSet};
use crate::error::{GenError, Result};

/// File extension of schema sources
pub const SCHEMA_EXTENSION: &str = "avsc";

/// Parse every schema file reachable from `paths`.
///
/// Directories are walked recursively in sorted order; plain files are
/// parsed whatever their extension.
pub fn load_schemas(paths: &[PathBuf]) -> Result<SchemaSet> {
    let mut parser = SchemaParser::new();
    let mut hasher = Sha256::new();
    let mut sources = Vec::new();

    for path in paths {
        for file in schema_files(path)? {
            let content = fs::read_to_string(&file).map_err(|e| GenError::io(&file, e))?;
            hasher.update(content.as_bytes());
            let declared = parser.parse_source(&content, &file.display().to_string())?;
            debug!("Loaded {:?}: {:?}", file, declared);
            sources.push(file);
        }
    }

    let mut set = parser.finish()?;
    set.sources = sources;
    set.bundle_hash = format!("{:x}", hasher.finalize());

    info!(
        "Loaded {} schema files ({} named types), bundle hash {}",
        set.sources.len(),
        set.len(),
        &set.bundle_hash[..12]
    );
    Ok(set)
}

fn schema_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(GenError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "schema path does not exist"),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let message = e.to_string();
            GenError::io(path, e.into_io_error().unwrap_or_else(|| std::io::Error::other(message)))
        })?;
        let file = entry.path();
        if file.is_file() && file.extension().map(|e| e == SCHEMA_EXTENSION).unwrap_or(false) {
            files.push(file.to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_directory_in_sorted_order() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested/b.avsc"),
            r#"{"type": "enum", "name": "t.B", "symbols": ["X"]}"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("a.avsc"),
            r#"{"type": "record", "name": "t.A", "fields": [{"name": "b", "type": "t.B"}]}"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let set = load_schemas(&[dir.path().to_path_buf()]).unwrap();
        assert_eq!(set.sources().len(), 2);
        assert_eq!(set.top_level(), &["t.A".to_string(), "t.B".to_string()]);
        assert_eq!(set.bundle_hash().len(), 64);
    }

    #[test]
    fn test_missing_path_is_io_error() {
        let err = load_schemas(&[PathBuf::from("/definitely/not/here")]).unwrap_err();
        assert_eq!(err.category(), crate::error::ErrorCategory::Io);
    }
}
