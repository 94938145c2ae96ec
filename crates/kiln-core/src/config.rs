//! Build configuration: feature toggles, path map and compile targets.

use std::{
    fmt,
    path::{Component, Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Main configuration structure for kiln.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Feature toggles, one per stage.
    #[serde(default)]
    pub settings: Settings,

    /// Input globs and output directories per asset class.
    #[serde(default)]
    pub paths: Paths,

    /// Transpile and prefixing targets.
    #[serde(default)]
    pub targets: Targets,
}

/// Asset pipeline stages that run concurrently after the clean step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Scripts,
    Styles,
    Svgs,
    Static,
    Html,
}

impl Stage {
    /// Every asset stage, in report order.
    pub const ALL: [Stage; 5] = [
        Stage::Scripts,
        Stage::Styles,
        Stage::Svgs,
        Stage::Static,
        Stage::Html,
    ];

    /// Name used in logs and in the settings table.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Stage::Scripts => "scripts",
            Stage::Styles => "styles",
            Stage::Svgs => "svgs",
            Stage::Static => "static",
            Stage::Html => "html",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Feature toggles. A disabled stage does no filesystem work at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Remove the output directory before building.
    pub clean: bool,

    /// Bundle, transpile and minify scripts.
    pub scripts: bool,

    /// Emit polyfill files as a separate `.polyfills` bundle.
    pub polyfills: bool,

    /// Compile, prefix, purge and minify stylesheets.
    pub styles: bool,

    /// Optimize SVG files.
    pub svgs: bool,

    /// Copy static files.
    #[serde(rename = "static")]
    pub static_files: bool,

    /// Copy top-level HTML files.
    pub html: bool,

    /// Serve the output and reload browsers in watch mode.
    pub reload: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            clean: true,
            scripts: true,
            polyfills: true,
            styles: true,
            svgs: true,
            static_files: true,
            html: true,
            reload: true,
        }
    }
}

impl Settings {
    /// Whether the given asset stage should run.
    #[must_use]
    pub fn is_enabled(&self, stage: Stage) -> bool {
        match stage {
            Stage::Scripts => self.scripts,
            Stage::Styles => self.styles,
            Stage::Svgs => self.svgs,
            Stage::Static => self.static_files,
            Stage::Html => self.html,
        }
    }
}

/// Input patterns and output directory of one asset class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetPaths {
    /// Glob patterns selecting the sources.
    pub input: Vec<String>,

    /// Directory receiving the processed files.
    pub output: PathBuf,
}

impl AssetPaths {
    fn new(input: &[&str], output: &str) -> Self {
        Self {
            input: input.iter().map(|p| (*p).to_string()).collect(),
            output: PathBuf::from(output),
        }
    }
}

/// Script sources: entries are files or directories of files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPaths {
    /// Glob patterns selecting script entries.
    pub input: Vec<String>,

    /// File name suffix marking a polyfill file.
    #[serde(default = "default_polyfill_suffix")]
    pub polyfills: String,

    /// Directory receiving the bundles.
    pub output: PathBuf,
}

/// Path map for every asset class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Paths {
    /// Source tree root, watched in watch mode.
    pub input: PathBuf,

    /// Output tree root, removed by the clean step.
    pub output: PathBuf,

    /// Script entries.
    pub scripts: ScriptPaths,

    /// Sass/SCSS sources.
    pub styles: AssetPaths,

    /// SVG sources.
    pub svgs: AssetPaths,

    /// Static files copied with their relative paths.
    #[serde(rename = "static")]
    pub static_files: AssetPaths,

    /// Top-level HTML files copied flat.
    pub html: AssetPaths,

    /// Markup scanned for live selectors by the purge step.
    pub purge_content: Vec<String>,

    /// Directory served by the dev server.
    pub reload: PathBuf,

    /// Package manifest providing banner metadata.
    pub package: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            input: PathBuf::from("src/"),
            output: PathBuf::from("dist/"),
            scripts: ScriptPaths {
                input: vec!["src/js/*".to_string()],
                polyfills: default_polyfill_suffix(),
                output: PathBuf::from("dist/js/"),
            },
            styles: AssetPaths::new(&["src/sass/**/*.scss", "src/sass/**/*.sass"], "dist/css/"),
            svgs: AssetPaths::new(&["src/svg/*.svg"], "dist/static/svg/"),
            static_files: AssetPaths::new(&["src/static/**/*"], "dist/static/"),
            html: AssetPaths::new(&["src/*.html"], "dist/"),
            purge_content: vec!["src/*.html".to_string()],
            reload: PathBuf::from("dist/"),
            package: PathBuf::from("package.json"),
        }
    }
}

impl Paths {
    /// Anchor every relative path and pattern at `base`.
    pub fn resolve(&mut self, base: &Path) {
        if base.as_os_str().is_empty() {
            return;
        }

        for dir in [
            &mut self.input,
            &mut self.output,
            &mut self.scripts.output,
            &mut self.styles.output,
            &mut self.svgs.output,
            &mut self.static_files.output,
            &mut self.html.output,
            &mut self.reload,
            &mut self.package,
        ] {
            if dir.is_relative() {
                *dir = base.join(&*dir);
            }
        }

        for patterns in [
            &mut self.scripts.input,
            &mut self.styles.input,
            &mut self.svgs.input,
            &mut self.static_files.input,
            &mut self.html.input,
            &mut self.purge_content,
        ] {
            for pattern in patterns.iter_mut() {
                if Path::new(pattern.as_str()).is_relative() {
                    *pattern = base.join(pattern.as_str()).to_string_lossy().into_owned();
                }
            }
        }
    }
}

/// Compile targets handed to the transpiler and the CSS processor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Targets {
    /// ECMAScript version scripts are lowered to (e.g. `es2015`).
    pub scripts: String,

    /// Browserslist queries driving vendor prefixing.
    pub browsers: Vec<String>,
}

impl Default for Targets {
    fn default() -> Self {
        Self {
            scripts: "es2015".to_string(),
            browsers: vec!["defaults".to_string()],
        }
    }
}

/// Absolute form of `path` with `.` and `..` folded lexically.
fn normalize(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

fn default_polyfill_suffix() -> String {
    ".polyfill.js".to_string()
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// Relative paths are resolved against the directory holding the file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CoreError::config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content).map_err(|e| {
            CoreError::config_with_source(
                format!("Failed to parse config file: {}", path.display()),
                e,
            )
        })?;

        let root = path.parent().unwrap_or_else(|| Path::new(""));
        config.paths.resolve(root);
        config.validate_at(root)?;
        Ok(config)
    }

    /// Load the configuration file if present, otherwise use the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        tracing::info!(path = %path.display(), "no configuration file, using defaults");
        let config = Config::default();
        config.validate()?;
        Ok(config)
    }

    /// Default configuration anchored at a project root.
    #[must_use]
    pub fn rooted_at(root: &Path) -> Self {
        let mut config = Config::default();
        config.paths.resolve(root);
        config
    }

    /// Validate the configuration against the working directory.
    pub fn validate(&self) -> Result<()> {
        self.validate_at(Path::new(""))
    }

    /// Validate the configuration of the project rooted at `root`.
    pub fn validate_at(&self, root: &Path) -> Result<()> {
        let paths = &self.paths;

        if paths.output.as_os_str().is_empty() {
            return Err(CoreError::config("paths.output cannot be empty"));
        }

        if paths.scripts.polyfills.is_empty() {
            return Err(CoreError::config("paths.scripts.polyfills cannot be empty"));
        }

        // The clean step deletes the output root recursively.
        if self.settings.clean {
            let output = normalize(&paths.output)?;

            if normalize(&paths.input)?.starts_with(&output) {
                return Err(CoreError::config(format!(
                    "paths.output ({}) must not contain paths.input ({})",
                    paths.output.display(),
                    paths.input.display()
                )));
            }

            let root = normalize(root)?;
            if root.starts_with(&output) {
                return Err(CoreError::config(format!(
                    "paths.output ({}) must not contain the project root ({})",
                    paths.output.display(),
                    root.display()
                )));
            }
        }

        if self.targets.scripts.is_empty() {
            return Err(CoreError::config("targets.scripts cannot be empty"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> String {
        r#"
[settings]
clean = false
polyfills = false
static = false
reload = false

[paths]
input = "assets/"
output = "public/"
purge_content = ["assets/**/*.html"]

[paths.scripts]
input = ["assets/scripts/*"]
output = "public/scripts/"

[paths.styles]
input = ["assets/scss/*.scss"]
output = "public/styles/"

[targets]
scripts = "es2017"
browsers = ["last 2 versions"]
"#
        .to_string()
    }

    #[test]
    fn test_load_config() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("kiln.toml");
        std::fs::write(&config_path, create_test_config()).expect("write");

        let config = Config::load(&config_path).expect("load config");

        assert!(!config.settings.clean);
        assert!(config.settings.scripts);
        assert!(!config.settings.polyfills);
        assert!(!config.settings.static_files);
        assert!(!config.settings.reload);

        assert_eq!(config.paths.input, dir.path().join("assets/"));
        assert_eq!(config.paths.output, dir.path().join("public/"));
        assert_eq!(config.paths.scripts.polyfills, ".polyfill.js");
        assert_eq!(
            config.paths.scripts.input,
            vec![dir.path().join("assets/scripts/*").to_string_lossy().into_owned()]
        );
        assert_eq!(config.paths.styles.output, dir.path().join("public/styles/"));
        // Tables absent from the file keep their defaults, anchored at the root.
        assert_eq!(config.paths.svgs.output, dir.path().join("dist/static/svg/"));

        assert_eq!(config.targets.scripts, "es2017");
        assert_eq!(config.targets.browsers, vec!["last 2 versions"]);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::default();

        assert!(config.settings.clean);
        assert!(config.settings.polyfills);
        assert!(config.settings.reload);
        assert_eq!(config.paths.output, PathBuf::from("dist/"));
        assert_eq!(config.paths.scripts.input, vec!["src/js/*"]);
        assert_eq!(config.paths.scripts.polyfills, ".polyfill.js");
        assert_eq!(config.paths.styles.input.len(), 2);
        assert_eq!(config.paths.svgs.output, PathBuf::from("dist/static/svg/"));
        assert_eq!(config.paths.purge_content, vec!["src/*.html"]);
        assert_eq!(config.targets.scripts, "es2015");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default_without_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/kiln.toml"))
            .expect("defaults should load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_not_found() {
        let result = Config::load(Path::new("/nonexistent/kiln.toml"));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }

    #[test]
    fn test_config_invalid_toml() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("kiln.toml");
        std::fs::write(&config_path, "[settings\nclean = ").expect("write");

        let result = Config::load(&config_path);
        assert!(result.unwrap_err().to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_output_must_not_contain_input() {
        let mut config = Config::default();
        config.paths.output = PathBuf::from("site");
        config.paths.input = PathBuf::from("site/src");

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must not contain"));

        // Without the clean step nothing gets deleted.
        config.settings.clean = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_output_must_not_be_project_root() {
        let dir = tempfile::tempdir().expect("create temp dir");

        for output in [".", "./", "dist/.."] {
            let mut config = Config::default();
            config.paths.output = PathBuf::from(output);
            config.paths.resolve(dir.path());
            config.paths.input = PathBuf::from("/elsewhere/src");

            let err = config.validate_at(dir.path()).unwrap_err();
            assert!(err.to_string().contains("project root"), "{output}: {err}");

            config.settings.clean = false;
            assert!(config.validate_at(dir.path()).is_ok(), "{output}");
        }
    }

    #[test]
    fn test_current_dir_output_contains_input() {
        for output in [".", "./"] {
            let mut config = Config::default();
            config.paths.output = PathBuf::from(output);

            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("must not contain"), "{output}");
        }
    }

    #[test]
    fn test_load_rejects_output_at_config_dir() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let config_path = dir.path().join("kiln.toml");
        std::fs::write(&config_path, "[paths]\noutput = \"./\"\n").expect("write");

        assert!(Config::load(&config_path).is_err());
    }

    #[test]
    fn test_rooted_at() {
        let config = Config::rooted_at(Path::new("/project"));
        assert_eq!(config.paths.output, PathBuf::from("/project/dist/"));
        assert_eq!(config.paths.package, PathBuf::from("/project/package.json"));
        assert_eq!(config.paths.html.input, vec!["/project/src/*.html"]);
    }

    #[test]
    fn test_settings_stage_lookup() {
        let settings = Settings {
            svgs: false,
            static_files: false,
            ..Settings::default()
        };

        assert!(settings.is_enabled(Stage::Scripts));
        assert!(settings.is_enabled(Stage::Styles));
        assert!(!settings.is_enabled(Stage::Svgs));
        assert!(!settings.is_enabled(Stage::Static));
        assert!(settings.is_enabled(Stage::Html));
        assert_eq!(Stage::Static.to_string(), "static");
    }
}
