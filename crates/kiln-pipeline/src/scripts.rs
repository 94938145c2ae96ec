//! Script pipeline: bundle discovery, concatenation, transpiling and minification.
//!
//! Every match of the script patterns is an entry. A plain `.js` file becomes a
//! bundle of its own; a directory becomes a bundle of the `.js` files directly
//! inside it. With polyfills enabled, a directory yields two bundles: one
//! without the polyfill files and a `.polyfills` one with everything.
//!
//! Bundles are loaded with classic `<script>` tags, so members must not use
//! `import` or `export`; such files are rejected by name.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use kiln_core::{Config, ScriptPaths};
use oxc::{
    allocator::Allocator,
    codegen::{Codegen, CodegenOptions},
    diagnostics::OxcDiagnostic,
    minifier::{CompressOptions, MangleOptions, Minifier, MinifierOptions},
    parser::Parser,
    semantic::SemanticBuilder,
    span::SourceType,
    transformer::{TransformOptions, Transformer},
};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    banner::Banner,
    sources::{self, SourceError},
};

/// Script pipeline errors.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Source discovery error.
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Two entries resolve to the same output file.
    #[error("bundle {name} is produced by both {} and {}", .first.display(), .second.display())]
    DuplicateBundle {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// Unknown transpile target.
    #[error("invalid script target {target}: {message}")]
    Target { target: String, message: String },

    /// A member file uses `import`/`export`, which bundles cannot resolve.
    #[error("{} uses import/export; bundles are classic scripts without module resolution", .path.display())]
    ModuleSyntax { path: PathBuf },

    /// Syntax error in a bundle.
    #[error("failed to parse {bundle}: {message}")]
    Parse { bundle: String, message: String },

    /// Transpiler diagnostics.
    #[error("failed to transpile {bundle}: {message}")]
    Transpile { bundle: String, message: String },
}

/// Result type for script operations.
pub type Result<T> = std::result::Result<T, ScriptError>;

/// A matched script entry, resolved once during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEntry {
    /// A single `.js` file.
    File(PathBuf),

    /// A directory whose `.js` files are concatenated.
    Directory(PathBuf),
}

impl ScriptEntry {
    /// Classify a matched path. Non-script files yield `None`.
    #[must_use]
    pub fn resolve(path: &Path) -> Option<Self> {
        if path.is_dir() {
            Some(Self::Directory(path.to_path_buf()))
        } else if path.is_file() && is_script(path) {
            Some(Self::File(path.to_path_buf()))
        } else {
            None
        }
    }

    fn path(&self) -> &Path {
        match self {
            Self::File(path) | Self::Directory(path) => path,
        }
    }
}

/// A named group of files emitted as one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    /// Output name without the `.js` extension.
    pub name: String,

    /// Member files, in concatenation order.
    pub files: Vec<PathBuf>,
}

impl Bundle {
    /// Unminified output file name.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("{}.js", self.name)
    }

    /// Minified output file name.
    #[must_use]
    pub fn min_file_name(&self) -> String {
        format!("{}.min.js", self.name)
    }
}

fn is_script(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "js")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned()
}

/// `.js` files directly inside `dir`, sorted by name.
fn directory_scripts(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let hidden = file_name(&path).starts_with('.');
        if !hidden && path.is_file() && is_script(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Turn entries into bundles.
///
/// `polyfill_suffix` is `Some` when polyfill splitting is enabled. Fails if two
/// entries would write the same file.
pub fn plan_bundles(entries: &[ScriptEntry], polyfill_suffix: Option<&str>) -> Result<Vec<Bundle>> {
    let mut bundles = Vec::new();
    let mut owners: HashMap<String, PathBuf> = HashMap::new();

    for entry in entries {
        let mut planned = Vec::new();

        match entry {
            ScriptEntry::File(path) => {
                let stem = path.file_stem().unwrap_or_default().to_string_lossy();
                planned.push(Bundle {
                    name: stem.into_owned(),
                    files: vec![path.clone()],
                });
            }
            ScriptEntry::Directory(dir) => {
                let name = file_name(dir);
                let all = directory_scripts(dir)?;

                match polyfill_suffix {
                    Some(suffix) => {
                        let regular: Vec<_> = all
                            .iter()
                            .filter(|p| !file_name(p).ends_with(suffix))
                            .cloned()
                            .collect();
                        planned.push(Bundle {
                            name: name.clone(),
                            files: regular,
                        });
                        planned.push(Bundle {
                            name: format!("{name}.polyfills"),
                            files: all,
                        });
                    }
                    None => planned.push(Bundle { name, files: all }),
                }
            }
        }

        for bundle in planned {
            if bundle.files.is_empty() {
                debug!(bundle = %bundle.name, "no files, skipping bundle");
                continue;
            }
            if let Some(first) = owners.insert(bundle.name.clone(), entry.path().to_path_buf()) {
                return Err(ScriptError::DuplicateBundle {
                    name: bundle.file_name(),
                    first,
                    second: entry.path().to_path_buf(),
                });
            }
            bundles.push(bundle);
        }
    }

    Ok(bundles)
}

fn diagnostics(errors: &[OxcDiagnostic]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn transform_options(target: &str) -> Result<TransformOptions> {
    TransformOptions::from_target(target).map_err(|e| ScriptError::Target {
        target: target.to_string(),
        message: e.to_string(),
    })
}

/// Check that one member file parses and has no module syntax.
pub fn check_member(path: &Path, source: &str) -> Result<()> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::unambiguous()).parse();

    if !parsed.errors.is_empty() {
        return Err(ScriptError::Parse {
            bundle: path.display().to_string(),
            message: diagnostics(&parsed.errors),
        });
    }
    if parsed.module_record.has_module_syntax {
        return Err(ScriptError::ModuleSyntax {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Transpile concatenated script source down to `target`.
pub fn transpile(bundle: &str, source: &str, target: &str) -> Result<String> {
    let options = transform_options(target)?;
    let allocator = Allocator::default();

    let parsed = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if !parsed.errors.is_empty() {
        return Err(ScriptError::Parse {
            bundle: bundle.to_string(),
            message: diagnostics(&parsed.errors),
        });
    }
    let mut program = parsed.program;

    let scoping = SemanticBuilder::new()
        .build(&program)
        .semantic
        .into_scoping();
    let transformed = Transformer::new(&allocator, Path::new(bundle), &options)
        .build_with_scoping(scoping, &mut program);
    if !transformed.errors.is_empty() {
        return Err(ScriptError::Transpile {
            bundle: bundle.to_string(),
            message: diagnostics(&transformed.errors),
        });
    }

    Ok(Codegen::new().build(&program).code)
}

/// Compress and mangle already transpiled source.
pub fn minify(bundle: &str, source: &str) -> Result<String> {
    let allocator = Allocator::default();

    let parsed = Parser::new(&allocator, source, SourceType::cjs()).parse();
    if !parsed.errors.is_empty() {
        return Err(ScriptError::Parse {
            bundle: bundle.to_string(),
            message: diagnostics(&parsed.errors),
        });
    }
    let mut program = parsed.program;

    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::default()),
    };
    let minified = Minifier::new(options).build(&allocator, &mut program);

    Ok(Codegen::new()
        .with_options(CodegenOptions::minify())
        .with_scoping(minified.scoping)
        .build(&program)
        .code)
}

/// Builds script bundles into the script output directory.
#[derive(Debug)]
pub struct ScriptBundler<'a> {
    paths: &'a ScriptPaths,
    polyfills: bool,
    target: &'a str,
}

impl<'a> ScriptBundler<'a> {
    /// Create a bundler from the build configuration.
    #[must_use]
    pub fn new(config: &'a Config) -> Self {
        Self {
            paths: &config.paths.scripts,
            polyfills: config.settings.polyfills,
            target: &config.targets.scripts,
        }
    }

    /// Discover entries and write every bundle pair. Returns the bundle count.
    pub fn process(&self, banner: &Banner) -> Result<usize> {
        info!(output = %self.paths.output.display(), "bundling scripts");

        // Reject a bad target before anything is written.
        transform_options(self.target)?;

        let entries: Vec<_> = sources::expand(&self.paths.input)?
            .iter()
            .filter_map(|path| {
                let entry = ScriptEntry::resolve(path);
                if entry.is_none() {
                    debug!(path = %path.display(), "not a script entry, skipping");
                }
                entry
            })
            .collect();

        let suffix = self.polyfills.then_some(self.paths.polyfills.as_str());
        let bundles = plan_bundles(&entries, suffix)?;

        if bundles.is_empty() {
            debug!("no script bundles");
            return Ok(0);
        }

        fs::create_dir_all(&self.paths.output)?;

        bundles
            .par_iter()
            .map(|bundle| self.write_bundle(bundle, banner))
            .collect::<Result<Vec<_>>>()?;

        info!(count = bundles.len(), "scripts bundled");
        Ok(bundles.len())
    }

    fn write_bundle(&self, bundle: &Bundle, banner: &Banner) -> Result<()> {
        let mut source = String::new();
        for file in &bundle.files {
            let member = fs::read_to_string(file)?;
            check_member(file, &member)?;
            if !source.is_empty() {
                source.push('\n');
            }
            source.push_str(&member);
        }

        let name = bundle.file_name();
        let code = transpile(&name, &source, self.target)?;
        let path = self.paths.output.join(&name);
        fs::write(&path, banner.apply(&code))?;
        debug!(path = %path.display(), files = bundle.files.len(), "wrote bundle");

        let min_name = bundle.min_file_name();
        let minified = minify(&min_name, &code)?;
        let min_path = self.paths.output.join(&min_name);
        fs::write(&min_path, banner.apply(&minified))?;
        debug!(path = %min_path.display(), "wrote minified bundle");

        Ok(())
    }
}
