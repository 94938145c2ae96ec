//! Build orchestration.
//!
//! Cleans the output tree, then runs every enabled asset stage in parallel and
//! collects their failures.

use std::{fmt, time::Instant};

use kiln_core::{Config, CoreError, PackageMeta, Stage};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{error, info};

use crate::{
    banner::Banner,
    clean::clean_output,
    copy::{CopyError, FileCopier},
    scripts::{ScriptBundler, ScriptError},
    styles::{StyleError, StyleProcessor},
    svgs::{SvgError, SvgOptimizer},
};

/// Error raised by a single asset stage.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Style(#[from] StyleError),

    #[error(transparent)]
    Svg(#[from] SvgError),

    #[error(transparent)]
    Copy(#[from] CopyError),
}

/// A stage that failed, with its error.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: StageError,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage, self.error)
    }
}

/// Build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The output directory could not be removed.
    #[error("failed to clean output directory: {0}")]
    Clean(#[source] std::io::Error),

    /// The package manifest could not be read.
    #[error("package error: {0}")]
    Package(#[from] CoreError),

    /// One or more stages failed.
    #[error("build failed in {} stage(s): {}", .0.len(), join_failures(.0))]
    Stages(Vec<StageFailure>),
}

fn join_failures(failures: &[StageFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Build statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Script bundles written (each as `.js` and `.min.js`).
    pub bundles: usize,

    /// Stylesheets written (each as `.css` and `.min.css`).
    pub stylesheets: usize,

    /// SVG files written.
    pub svgs: usize,

    /// Static files copied.
    pub static_files: usize,

    /// Markup files copied.
    pub pages: usize,

    /// Whether an existing output directory was removed.
    pub cleaned: bool,

    /// Build duration in milliseconds.
    pub duration_ms: u64,
}

impl BuildStats {
    fn record(&mut self, stage: Stage, count: usize) {
        match stage {
            Stage::Scripts => self.bundles = count,
            Stage::Styles => self.stylesheets = count,
            Stage::Svgs => self.svgs = count,
            Stage::Static => self.static_files = count,
            Stage::Html => self.pages = count,
        }
    }

    /// Count recorded for one stage.
    #[must_use]
    pub fn count(&self, stage: Stage) -> usize {
        match stage {
            Stage::Scripts => self.bundles,
            Stage::Styles => self.stylesheets,
            Stage::Svgs => self.svgs,
            Stage::Static => self.static_files,
            Stage::Html => self.pages,
        }
    }
}

/// Runs the full asset build.
#[derive(Debug)]
pub struct Builder {
    config: Config,
    banner: Banner,
}

impl Builder {
    /// Create a builder with already loaded package metadata.
    #[must_use]
    pub fn new(config: Config, package: &PackageMeta) -> Self {
        Self {
            config,
            banner: Banner::new(package),
        }
    }

    /// Create a builder, reading `package.json` when a bannered stage is enabled.
    pub fn from_config(config: Config) -> Result<Self> {
        let settings = &config.settings;
        let package = if settings.scripts || settings.styles {
            PackageMeta::load(&config.paths.package)?
        } else {
            PackageMeta::default()
        };

        Ok(Self::new(config, &package))
    }

    /// The configuration this builder runs with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Execute the build: clean, then every stage in parallel.
    pub fn build(&self) -> Result<BuildStats> {
        let start = Instant::now();
        let mut stats = BuildStats::default();

        info!(output = %self.config.paths.output.display(), "starting build");

        if self.config.settings.clean {
            stats.cleaned = clean_output(&self.config.paths.output).map_err(BuildError::Clean)?;
        }

        let results: Vec<_> = Stage::ALL
            .par_iter()
            .map(|&stage| (stage, self.run_stage(stage)))
            .collect();

        let mut failures = Vec::new();
        for (stage, result) in results {
            match result {
                Ok(count) => stats.record(stage, count),
                Err(e) => {
                    error!(%stage, error = %e, "stage failed");
                    failures.push(StageFailure { stage, error: e });
                }
            }
        }

        if !failures.is_empty() {
            return Err(BuildError::Stages(failures));
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            bundles = stats.bundles,
            stylesheets = stats.stylesheets,
            svgs = stats.svgs,
            static_files = stats.static_files,
            pages = stats.pages,
            duration_ms = stats.duration_ms,
            "build complete"
        );

        Ok(stats)
    }

    fn run_stage(&self, stage: Stage) -> std::result::Result<usize, StageError> {
        if !self.config.settings.is_enabled(stage) {
            info!(%stage, "stage disabled");
            return Ok(0);
        }

        let paths = &self.config.paths;
        let count = match stage {
            Stage::Scripts => ScriptBundler::new(&self.config).process(&self.banner)?,
            Stage::Styles => StyleProcessor::new(&self.config)?.process(&self.banner)?,
            Stage::Svgs => SvgOptimizer::new(&paths.svgs).process()?,
            Stage::Static => FileCopier::static_files(&paths.static_files).process()?,
            Stage::Html => FileCopier::markup(&paths.html).process()?,
        };
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, path::Path};

    use tempfile::TempDir;

    use super::*;

    const PACKAGE: &str = r#"{
  "name": "demo-site",
  "version": "2.1.0",
  "author": "Jane Doe",
  "license": "MIT",
  "repository": "https://example.com/demo-site.git"
}"#;

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn project() -> (TempDir, Config) {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(root, "package.json", PACKAGE);
        write(root, "src/index.html", r#"<main class="page"><h1>Hi</h1></main>"#);
        write(root, "src/js/app.js", "const greet = (name) => `hi ${name}`;\nconsole.log(greet('x'));\n");
        write(root, "src/sass/main.scss", ".page { h1 { color: red; } }\n");
        write(
            root,
            "src/svg/dot.svg",
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="4" height="4"><circle cx="2" cy="2" r="2"/></svg>"#,
        );
        write(root, "src/static/robots.txt", "User-agent: *\n");
        let config = Config::rooted_at(root);
        (dir, config)
    }

    #[test]
    fn test_build_all_stages() {
        let (dir, config) = project();
        let builder = Builder::from_config(config).unwrap();

        let stats = builder.build().unwrap();

        assert_eq!(stats.bundles, 1);
        assert_eq!(stats.stylesheets, 1);
        assert_eq!(stats.svgs, 1);
        assert_eq!(stats.static_files, 1);
        assert_eq!(stats.pages, 1);

        let dist = dir.path().join("dist");
        for path in ["js/app.js", "js/app.min.js", "css/main.css", "css/main.min.css"] {
            let contents = fs::read_to_string(dist.join(path)).unwrap();
            assert!(contents.starts_with("/*! demo-site v2.1.0 | (c) "), "{path}");
        }
        assert!(dist.join("static/svg/dot.svg").exists());
        assert!(dist.join("static/robots.txt").exists());
        assert!(dist.join("index.html").exists());
    }

    #[test]
    fn test_clean_removes_stale_output() {
        let (dir, config) = project();
        write(dir.path(), "dist/stale.txt", "old");

        let stats = Builder::from_config(config).unwrap().build().unwrap();

        assert!(stats.cleaned);
        assert!(!dir.path().join("dist/stale.txt").exists());
    }

    #[test]
    fn test_disabled_stage_does_nothing() {
        let (dir, mut config) = project();
        config.settings.clean = false;
        config.settings.styles = false;
        write(dir.path(), "dist/css/keep.css", "kept");

        let stats = Builder::from_config(config).unwrap().build().unwrap();

        assert_eq!(stats.stylesheets, 0);
        assert_eq!(stats.count(Stage::Scripts), 1);
        let css: Vec<_> = fs::read_dir(dir.path().join("dist/css")).unwrap().collect();
        assert_eq!(css.len(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("dist/css/keep.css")).unwrap(),
            "kept"
        );
    }

    #[test]
    fn test_package_not_needed_without_bannered_stages() {
        let (dir, mut config) = project();
        fs::remove_file(dir.path().join("package.json")).unwrap();
        config.settings.scripts = false;
        config.settings.styles = false;

        let stats = Builder::from_config(config).unwrap().build().unwrap();
        assert_eq!(stats.pages, 1);
    }

    #[test]
    fn test_missing_package_is_an_error() {
        let (dir, config) = project();
        fs::remove_file(dir.path().join("package.json")).unwrap();

        assert!(matches!(
            Builder::from_config(config),
            Err(BuildError::Package(_))
        ));
    }

    #[test]
    fn test_all_failures_are_reported() {
        let (dir, config) = project();
        write(dir.path(), "src/js/broken.js", "function (\n");
        write(dir.path(), "src/sass/broken.scss", ".a { color: red; \n");

        let err = Builder::from_config(config).unwrap().build().unwrap_err();

        let BuildError::Stages(failures) = &err else {
            panic!("expected stage failures, got {err}");
        };
        let stages: Vec<_> = failures.iter().map(|f| f.stage).collect();
        assert_eq!(stages, vec![Stage::Scripts, Stage::Styles]);
        assert!(err.to_string().starts_with("build failed in 2 stage(s)"));
    }

    #[test]
    fn test_build_stats_default() {
        let stats = BuildStats::default();
        assert_eq!(stats.bundles, 0);
        assert!(!stats.cleaned);
        assert_eq!(stats.duration_ms, 0);
    }
}
