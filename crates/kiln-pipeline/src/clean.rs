//! Output directory cleaning.

use std::{fs, io, path::Path};

use tracing::debug;

/// Remove the output directory tree.
///
/// Returns whether anything was removed. A missing directory is not an error.
pub fn clean_output(dir: &Path) -> io::Result<bool> {
    match fs::remove_dir_all(dir) {
        Ok(()) => {
            debug!(dir = %dir.display(), "cleaned output directory");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_clean_removes_tree() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("dist");
        fs::create_dir_all(output.join("js")).unwrap();
        fs::write(output.join("js/app.js"), "x").unwrap();

        assert!(clean_output(&output).unwrap());
        assert!(!output.exists());
    }

    #[test]
    fn test_clean_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("dist");
        fs::create_dir_all(&output).unwrap();

        assert!(clean_output(&output).unwrap());
        assert!(!clean_output(&output).unwrap());
        assert!(!clean_output(&output).unwrap());
    }
}
