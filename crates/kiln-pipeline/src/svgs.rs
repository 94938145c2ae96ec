//! SVG optimization.
//!
//! Files are parsed and re-serialized by usvg, which drops editor metadata,
//! comments and unused definitions and rounds coordinates. Optimization is
//! best-effort per file: a file usvg cannot handle is copied unchanged.

use std::{fs, path::PathBuf};

use kiln_core::AssetPaths;
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::sources::{self, SourceError, SourceFile};

/// SVG optimization errors.
#[derive(Debug, Error)]
pub enum SvgError {
    /// Source discovery error.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for SVG operations.
pub type Result<T> = std::result::Result<T, SvgError>;

/// What happened to one SVG file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SvgOutcome {
    /// Written in optimized form.
    Optimized,
    /// Optimization did not shrink the file; original kept.
    Unchanged,
    /// Optimization failed; original copied.
    Failed,
}

/// Optimize SVG markup.
///
/// Returns `Ok(None)` when the optimized form is not smaller than the input.
pub fn optimize(svg: &str) -> std::result::Result<Option<String>, usvg::Error> {
    let tree = usvg::Tree::from_str(svg, &usvg::Options::default())?;
    let optimized = tree.to_string(&usvg::WriteOptions {
        preserve_text: true,
        coordinates_precision: 3,
        transforms_precision: 5,
        ..usvg::WriteOptions::default()
    });

    Ok((optimized.len() < svg.len()).then_some(optimized))
}

/// Optimizes SVG files into the SVG output directory.
#[derive(Debug)]
pub struct SvgOptimizer<'a> {
    paths: &'a AssetPaths,
}

impl<'a> SvgOptimizer<'a> {
    /// Create an optimizer for the given paths.
    #[must_use]
    pub fn new(paths: &'a AssetPaths) -> Self {
        Self { paths }
    }

    /// Optimize every matched file. Returns the number of files written.
    pub fn process(&self) -> Result<usize> {
        info!(output = %self.paths.output.display(), "optimizing SVGs");

        let files = sources::expand_files(&self.paths.input)?;
        if files.is_empty() {
            debug!("no SVG files");
            return Ok(0);
        }

        fs::create_dir_all(&self.paths.output)?;

        let outcomes = files
            .par_iter()
            .map(|file| self.process_file(file))
            .collect::<Result<Vec<_>>>()?;

        let failed = outcomes
            .iter()
            .filter(|o| **o == SvgOutcome::Failed)
            .count();
        info!(count = outcomes.len(), failed, "SVGs optimized");
        Ok(outcomes.len())
    }

    fn process_file(&self, file: &SourceFile) -> Result<SvgOutcome> {
        let dest = self.destination(file);
        let original = fs::read_to_string(&file.path)?;

        let (contents, outcome) = match optimize(&original) {
            Ok(Some(optimized)) => (optimized, SvgOutcome::Optimized),
            Ok(None) => (original, SvgOutcome::Unchanged),
            Err(e) => {
                warn!(path = %file.path.display(), error = %e, "SVG optimization failed, copying original");
                (original, SvgOutcome::Failed)
            }
        };

        fs::write(&dest, contents)?;
        debug!(src = %file.path.display(), dest = %dest.display(), ?outcome, "wrote SVG");
        Ok(outcome)
    }

    fn destination(&self, file: &SourceFile) -> PathBuf {
        self.paths
            .output
            .join(file.path.file_name().unwrap_or_default())
    }
}
