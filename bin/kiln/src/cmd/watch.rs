//! Watch command - rebuild on change, serve and live reload

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use color_eyre::eyre::{Result, WrapErr, eyre};
use kiln_pipeline::{BuildStats, Builder};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::{net::TcpListener, sync::mpsc, task};

use super::{load_config, print_build_stats};
use crate::server::{ServerState, create_router, inject_livereload};

/// Debounce interval for file changes.
const DEBOUNCE_MS: u64 = 200;

/// Run the watch command.
///
/// Builds once, then rebuilds whenever the input tree changes. With `reload`
/// enabled the output is served and browsers reload after every rebuild.
pub async fn run(config_path: &Path, port: u16, open_browser: bool) -> Result<()> {
    tracing::info!(?config_path, port, "Starting watch mode");

    let config = load_config(config_path)?;
    let reload = config.settings.reload;
    let input_dir = config.paths.input.clone();
    let output_dir = config.paths.output.clone();
    let serve_dir = config.paths.reload.clone();

    let builder = Arc::new(Builder::from_config(config).wrap_err("Failed to prepare build")?);

    tracing::info!("Running initial build...");
    let stats = build_once(&builder, reload.then_some(serve_dir.as_path()))?;
    print_build_stats(&stats, &output_dir);

    let state = Arc::new(ServerState::new());

    // One pending rebuild at most; further events while it waits are dropped.
    let (tx, mut rx) = mpsc::channel::<()>(1);
    let ignored = output_dir.clone();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) if is_relevant(&event, &ignored) => {
                let _ = tx.try_send(());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "watch error"),
        },
        notify::Config::default(),
    )
    .wrap_err("Failed to create file watcher")?;

    watcher
        .watch(&input_dir, RecursiveMode::Recursive)
        .wrap_err_with(|| format!("Failed to watch {}", input_dir.display()))?;
    tracing::debug!(dir = %input_dir.display(), "Watching input directory");

    let rebuild_state = state.clone();
    let rebuild_root = reload.then(|| serve_dir.clone());
    tokio::spawn(async move {
        while rx.recv().await.is_some() {
            tokio::time::sleep(Duration::from_millis(DEBOUNCE_MS)).await;
            while rx.try_recv().is_ok() {}

            println!("  File change detected, rebuilding...");
            let builder = builder.clone();
            let root = rebuild_root.clone();
            let result = task::spawn_blocking(move || build_once(&builder, root.as_deref())).await;

            match result {
                Ok(Ok(stats)) => {
                    println!(
                        "  ✓ Rebuilt {} artifacts in {}ms",
                        total_artifacts(&stats),
                        stats.duration_ms
                    );
                    let clients = rebuild_state.notify_reload();
                    tracing::debug!(clients, "Sent reload");
                }
                Ok(Err(e)) => {
                    tracing::error!("Rebuild failed: {e:?}");
                    eprintln!("  ✗ Rebuild failed: {e}");
                }
                Err(e) => tracing::error!(error = %e, "Rebuild task panicked"),
            }
        }
    });

    // Keep watcher alive
    let _watcher = watcher;

    if !reload {
        println!("  Watching {} (live reload disabled)", input_dir.display());
        println!("  Press Ctrl+C to stop");
        tokio::signal::ctrl_c()
            .await
            .wrap_err("Failed to listen for Ctrl+C")?;
        return Ok(());
    }

    let app = create_router(&serve_dir, state);
    let addr = format!("127.0.0.1:{port}");

    let listener = TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Failed to bind to {addr}"))?;

    println!();
    println!("  Dev server running at http://{addr}");
    println!("  Press Ctrl+C to stop");
    println!();

    if open_browser {
        if let Err(e) = open::that(format!("http://{addr}")) {
            tracing::warn!(error = %e, "Failed to open browser");
        }
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .wrap_err("Server error")?;

    Ok(())
}

/// Changes that warrant a rebuild: anything outside the output tree.
fn is_relevant(event: &notify::Event, output_dir: &Path) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| !p.starts_with(output_dir))
}

fn total_artifacts(stats: &BuildStats) -> usize {
    stats.bundles * 2 + stats.stylesheets * 2 + stats.svgs + stats.static_files + stats.pages
}

/// Run a full build and, when serving, inject the reload client.
fn build_once(builder: &Builder, serve_dir: Option<&Path>) -> Result<BuildStats> {
    let stats = builder.build().wrap_err("Build failed")?;

    if let Some(dir) = serve_dir {
        let injected = inject_livereload_into_html(dir)?;
        tracing::debug!(pages = injected, "Injected live reload client");
    }

    tracing::debug!(?stats, "Build completed");
    Ok(stats)
}

/// Inject the live reload client into every HTML file under `dir`.
pub fn inject_livereload_into_html(dir: &Path) -> Result<usize> {
    if !dir.is_dir() {
        return Err(eyre!("Serve directory {} does not exist", dir.display()));
    }

    let pages: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|p| p.extension().is_some_and(|ext| ext == "html"))
        .collect();

    let mut count = 0;
    for path in pages {
        let content =
            fs::read_to_string(&path).wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        if let Some(modified) = inject_livereload(&content) {
            fs::write(&path, modified)
                .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
            count += 1;
        }
    }

    Ok(count)
}
