// pipewright-core/src/infrastructure/fs.rs

use crate::infrastructure::error::InfrastructureError;
use std::io::Write;
use std::path::Path;

/// Replaces `path` with `content` in one rename.
///
/// The bytes go to a temporary file next to the target, which is then
/// persisted over it, so readers see either the old file or the new one.
/// Missing parent directories are created.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    // Same directory, so the rename never crosses filesystems
    let mut staged = tempfile::NamedTempFile::new_in(parent)?;
    staged.write_all(content.as_ref())?;
    staged.flush()?;
    staged
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;

    Ok(())
}

/// Deletes `path` if it exists. Returns whether something was removed.
pub fn remove_if_exists<P: AsRef<Path>>(path: P) -> Result<bool, InfrastructureError> {
    match std::fs::remove_file(path.as_ref()) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(InfrastructureError::Io(e)),
    }
}

/// True when the file exists and holds at least one byte.
pub fn has_content<P: AsRef<Path>>(path: P) -> bool {
    std::fs::metadata(path.as_ref()).is_ok_and(|m| m.len() > 0)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_creates_parents_and_overwrites() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("out").join("orders.csv");

        atomic_write(&file_path, "a,b\n")?;
        atomic_write(&file_path, "c,d\n")?;

        assert_eq!(fs::read_to_string(&file_path)?, "c,d\n");
        // No stray temp files left next to the target
        assert_eq!(fs::read_dir(file_path.parent().unwrap())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_remove_if_exists_is_idempotent() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("gone.csv");
        fs::write(&file_path, "x")?;

        assert!(has_content(&file_path));
        assert!(remove_if_exists(&file_path)?);
        assert!(!remove_if_exists(&file_path)?);
        assert!(!has_content(&file_path));
        Ok(())
    }
}
