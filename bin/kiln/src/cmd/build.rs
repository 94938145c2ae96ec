//! Build command - runs every enabled stage once

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use kiln_pipeline::Builder;

use super::{load_config, print_build_stats};

/// Run the build command.
pub fn run(config_path: &Path) -> Result<()> {
    tracing::info!(?config_path, "Starting build");

    let config = load_config(config_path)?;
    let output = config.paths.output.clone();

    let builder = Builder::from_config(config).wrap_err("Failed to prepare build")?;
    let stats = builder.build().wrap_err("Build failed")?;

    println!();
    println!("  Build completed successfully!");
    print_build_stats(&stats, &output);

    tracing::info!(?stats, "Build completed successfully");

    Ok(())
}
