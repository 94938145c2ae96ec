//! Style pipeline: Sass compilation, vendor prefixing, purge and minification.

use std::{
    fs,
    path::{Path, PathBuf},
};

use kiln_core::{AssetPaths, Config};
use lightningcss::{
    stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet},
    targets::{Browsers, Targets},
};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    banner::Banner,
    purge::{self, ContentIndex},
    sources::{self, SourceError, SourceFile},
};

/// Style pipeline errors.
#[derive(Debug, Error)]
pub enum StyleError {
    /// Source discovery error.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Sass compilation failed.
    #[error("failed to compile {}: {message}", .path.display())]
    Compile { path: PathBuf, message: String },

    /// CSS parsing, prefixing or printing failed.
    #[error("failed to process {}: {message}", .path.display())]
    Process { path: PathBuf, message: String },

    /// Browserslist query could not be resolved.
    #[error("invalid browser targets: {0}")]
    Targets(String),
}

/// Result type for style operations.
pub type Result<T> = std::result::Result<T, StyleError>;

/// Expanded and minified CSS of one stylesheet, without banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedCss {
    pub expanded: String,
    pub minified: String,
}

/// Compile a Sass/SCSS file to expanded CSS.
pub fn compile(path: &Path) -> Result<String> {
    let options = grass::Options::default().style(grass::OutputStyle::Expanded);
    grass::from_path(path, &options).map_err(|e| StyleError::Compile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Sass partials (`_name.scss`) are only compiled through imports.
fn is_partial(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|name| name.to_string_lossy().starts_with('_'))
}

/// Compiles stylesheets into the style output directory.
#[derive(Debug)]
pub struct StyleProcessor<'a> {
    paths: &'a AssetPaths,
    purge_content: &'a [String],
    browsers: Option<Browsers>,
}

impl<'a> StyleProcessor<'a> {
    /// Create a processor, resolving the browserslist queries.
    pub fn new(config: &'a Config) -> Result<Self> {
        let browsers = Browsers::from_browserslist(config.targets.browsers.iter())
            .map_err(|e| StyleError::Targets(e.to_string()))?;

        Ok(Self {
            paths: &config.paths.styles,
            purge_content: &config.paths.purge_content,
            browsers,
        })
    }

    fn targets(&self) -> Targets {
        Targets {
            browsers: self.browsers,
            ..Targets::default()
        }
    }

    /// Build the markup token index used by the purge step.
    pub fn scan_content(&self) -> Result<ContentIndex> {
        let mut index = ContentIndex::default();
        let files = sources::expand_files(self.purge_content)?;
        for file in &files {
            index.add(&fs::read_to_string(&file.path)?);
        }
        debug!(files = files.len(), tokens = index.len(), "scanned purge content");
        Ok(index)
    }

    /// Prefix, purge and print compiled CSS.
    ///
    /// Rules whose selectors all reference a class or id missing from `index`
    /// are dropped once, before both variants are printed.
    pub fn finish(&self, path: &Path, css: &str, index: &ContentIndex) -> Result<ProcessedCss> {
        let process_error = |message: String| StyleError::Process {
            path: path.to_path_buf(),
            message,
        };

        let unused_symbols = purge::unused_symbols(css, index);
        if !unused_symbols.is_empty() {
            debug!(path = %path.display(), count = unused_symbols.len(), "purging unused selectors");
        }

        let mut sheet = StyleSheet::parse(
            css,
            ParserOptions {
                filename: path.display().to_string(),
                ..ParserOptions::default()
            },
        )
        .map_err(|e| process_error(e.to_string()))?;

        sheet
            .minify(MinifyOptions {
                targets: self.targets(),
                unused_symbols,
                ..MinifyOptions::default()
            })
            .map_err(|e| process_error(e.to_string()))?;

        let expanded = sheet
            .to_css(PrinterOptions {
                targets: self.targets(),
                ..PrinterOptions::default()
            })
            .map_err(|e| process_error(e.to_string()))?
            .code;

        let minified = sheet
            .to_css(PrinterOptions {
                minify: true,
                targets: self.targets(),
                ..PrinterOptions::default()
            })
            .map_err(|e| process_error(e.to_string()))?
            .code;

        Ok(ProcessedCss { expanded, minified })
    }

    /// Compile every stylesheet and write both variants. Returns the count.
    pub fn process(&self, banner: &Banner) -> Result<usize> {
        info!(output = %self.paths.output.display(), "building styles");

        let files: Vec<_> = sources::expand_files(&self.paths.input)?
            .into_iter()
            .filter(|file| !is_partial(&file.path))
            .collect();

        if files.is_empty() {
            debug!("no stylesheets");
            return Ok(0);
        }

        let index = self.scan_content()?;

        files
            .par_iter()
            .map(|file| self.write_stylesheet(file, &index, banner))
            .collect::<Result<Vec<_>>>()?;

        info!(count = files.len(), "styles built");
        Ok(files.len())
    }

    fn write_stylesheet(&self, file: &SourceFile, index: &ContentIndex, banner: &Banner) -> Result<()> {
        let css = compile(&file.path)?;
        let processed = self.finish(&file.path, &css, index)?;

        let path = self.paths.output.join(&file.relative).with_extension("css");
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, banner.apply(&processed.expanded))?;
        debug!(path = %path.display(), "wrote stylesheet");

        let min_path = path.with_extension("min.css");
        fs::write(&min_path, banner.apply(&processed.minified))?;
        debug!(path = %min_path.display(), "wrote minified stylesheet");

        Ok(())
    }
}
