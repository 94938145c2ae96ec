//! Source discovery from glob patterns.
//!
//! Patterns follow the usual front-end build conventions: dotfiles are not matched, and a
//! match keeps its path relative to the pattern's base (the leading components
//! that contain no glob syntax).

use std::path::{Path, PathBuf};

use glob::MatchOptions;
use thiserror::Error;

/// Source discovery errors.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Malformed glob pattern.
    #[error("invalid pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// A matched path could not be read.
    #[error("unreadable match: {0}")]
    Glob(#[from] glob::GlobError),
}

/// Result type for source discovery.
pub type Result<T> = std::result::Result<T, SourceError>;

/// A file matched by a pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// Path on disk.
    pub path: PathBuf,

    /// Path relative to the pattern's base.
    pub relative: PathBuf,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Leading part of a pattern that contains no glob syntax.
#[must_use]
pub fn glob_base(pattern: &str) -> PathBuf {
    Path::new(pattern)
        .components()
        .take_while(|c| {
            !c.as_os_str()
                .to_string_lossy()
                .contains(['*', '?', '[', '{'])
        })
        .collect()
}

/// Every path (file or directory) matched by any pattern, sorted and deduplicated.
pub fn expand(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();

    for pattern in patterns {
        let paths = glob::glob_with(pattern, MATCH_OPTIONS).map_err(|source| {
            SourceError::Pattern {
                pattern: pattern.clone(),
                source,
            }
        })?;
        for path in paths {
            matches.push(path?);
        }
    }

    matches.sort();
    matches.dedup();
    Ok(matches)
}

/// Regular files matched by any pattern, with their base-relative paths.
pub fn expand_files(patterns: &[String]) -> Result<Vec<SourceFile>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let base = glob_base(pattern);
        for path in expand(std::slice::from_ref(pattern))? {
            if !path.is_file() {
                continue;
            }
            let relative = match path.strip_prefix(&base) {
                Ok(rel) => rel.to_path_buf(),
                Err(_) => PathBuf::from(path.file_name().unwrap_or_default()),
            };
            files.push(SourceFile { path, relative });
        }
    }

    files.sort();
    files.dedup_by(|a, b| a.path == b.path);
    Ok(files)
}
