//! Kiln CLI
//!
//! Single binary front-end build tool.
//!
//! This is the binary entry point. The library functionality is in `lib.rs`.

use clap::Parser;
use color_eyre::eyre::Result;

/// Command-line interface for kiln.
#[derive(Parser)]
#[command(
    name = "kiln",
    version,
    about = "Build scripts, styles, SVGs and static files for a static site"
)]
struct Cli {
    /// Path to configuration file (optional, defaults apply when missing)
    #[arg(short, long, default_value = "kiln.toml")]
    config: std::path::PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(clap::Subcommand)]
enum Commands {
    /// Run every enabled stage once
    Build,
    /// Build, then rebuild on change and reload connected browsers
    Watch {
        /// Port to listen on
        #[arg(short, long, default_value_t = 3000)]
        port: u16,
        /// Open browser automatically
        #[arg(long)]
        open: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    kiln::init_tracing(cli.verbose);

    match cli.command {
        Commands::Build => {
            kiln::cmd::build::run(&cli.config)?;
        }
        Commands::Watch { port, open } => {
            kiln::cmd::watch::run(&cli.config, port, open).await?;
        }
    }

    Ok(())
}
