//! Verbatim copying of static assets and markup.

use std::{fs, path::Path};

use kiln_core::AssetPaths;
use thiserror::Error;
use tracing::{debug, info};

use crate::sources::{self, SourceError, SourceFile};

/// Copy errors.
#[derive(Debug, Error)]
pub enum CopyError {
    /// Source discovery error.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for copy operations.
pub type Result<T> = std::result::Result<T, CopyError>;

/// Where a matched file lands under the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Keep the path relative to the pattern base.
    Preserve,
    /// Drop directories, keep the file name only.
    Flat,
}

/// Copies matched files into an output directory.
#[derive(Debug)]
pub struct FileCopier<'a> {
    paths: &'a AssetPaths,
    layout: Layout,
}

impl<'a> FileCopier<'a> {
    /// Static assets, copied with their directory structure.
    #[must_use]
    pub fn static_files(paths: &'a AssetPaths) -> Self {
        Self {
            paths,
            layout: Layout::Preserve,
        }
    }

    /// Top-level markup, copied flat.
    #[must_use]
    pub fn markup(paths: &'a AssetPaths) -> Self {
        Self {
            paths,
            layout: Layout::Flat,
        }
    }

    /// Copy every matched file. Returns the number of files copied.
    pub fn process(&self) -> Result<usize> {
        info!(
            output = %self.paths.output.display(),
            layout = ?self.layout,
            "copying files"
        );

        let files = sources::expand_files(&self.paths.input)?;
        for file in &files {
            let dest = self.paths.output.join(self.relative(file));
            copy_file(&file.path, &dest)?;
            debug!(src = %file.path.display(), dest = %dest.display(), "copied file");
        }

        info!(count = files.len(), "files copied");
        Ok(files.len())
    }

    fn relative<'f>(&self, file: &'f SourceFile) -> &'f Path {
        match self.layout {
            Layout::Preserve => &file.relative,
            Layout::Flat => file
                .path
                .file_name()
                .map_or(file.relative.as_path(), Path::new),
        }
    }
}

/// Copy a single file, creating parent directories.
pub fn copy_file(source: &Path, dest: &Path) -> std::io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, dest)?;
    Ok(())
}
