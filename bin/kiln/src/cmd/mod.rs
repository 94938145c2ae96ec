//! CLI command implementations.

pub mod build;
pub mod watch;

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use kiln_core::Config;
use kiln_pipeline::BuildStats;

/// Load `kiln.toml`, falling back to defaults relative to the working directory.
pub(crate) fn load_config(config_path: &Path) -> Result<Config> {
    let config = Config::load_or_default(config_path).wrap_err("Failed to load configuration")?;
    tracing::debug!(?config, "Loaded configuration");
    Ok(config)
}

/// Print build statistics in a user-friendly format.
pub(crate) fn print_build_stats(stats: &BuildStats, output: &Path) {
    println!();
    println!("  Build Statistics:");
    println!("  ─────────────────────────────────");
    println!("  Script bundles: {:>6}", stats.bundles);
    println!("  Stylesheets:    {:>6}", stats.stylesheets);
    println!("  SVGs:           {:>6}", stats.svgs);
    println!("  Static files:   {:>6}", stats.static_files);
    println!("  Pages:          {:>6}", stats.pages);
    println!("  ─────────────────────────────────");
    println!("  Duration:       {:>6}ms", stats.duration_ms);
    println!("  Output:         {}", output.display());
    println!();
}
