//! Kiln Pipeline Library
//!
//! Front-end asset build engine for kiln.
//!
//! # Modules
//!
//! - [`sources`] - Glob expansion of stage inputs
//! - [`banner`] - License banner for scripts and stylesheets
//! - [`clean`] - Output directory removal
//! - [`scripts`] - Script bundling, transpiling and minification
//! - [`styles`] - Sass compilation, prefixing, purge and minification
//! - [`purge`] - Unused selector detection
//! - [`svgs`] - SVG optimization
//! - [`copy`] - Static file and markup copying
//! - [`build`] - Build orchestration

pub mod banner;
pub mod build;
pub mod clean;
pub mod copy;
pub mod purge;
pub mod scripts;
pub mod sources;
pub mod styles;
pub mod svgs;

pub use banner::Banner;
pub use build::{BuildError, BuildStats, Builder, StageError, StageFailure};
pub use copy::FileCopier;
pub use scripts::ScriptBundler;
pub use styles::StyleProcessor;
pub use svgs::SvgOptimizer;
