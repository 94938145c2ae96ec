//! kiln Core Library
//!
//! Configuration, package metadata, and error handling for the kiln asset pipeline.

pub mod config;
pub mod error;
pub mod package;

pub use config::{AssetPaths, Config, Paths, ScriptPaths, Settings, Stage, Targets};
pub use error::{CoreError, Result};
pub use package::PackageMeta;
