//! Watch command - rebuilds the site when sources change

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use color_eyre::eyre::{Result, WrapErr};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::{Mutex, RwLock};
use quillpress_core::Config;
use quillpress_generator::{BuildOptions, generate};
use tokio::{sync::mpsc, time::MissedTickBehavior};

use crate::watch::{
    TickOutcome, WatchScheduler, WatchTarget, diff_targets, is_relevant_path, watched_dirs,
};

/// The file watcher and the directories it currently watches.
struct WatchSet {
    watcher: RecommendedWatcher,
    targets: Vec<WatchTarget>,
}

impl WatchSet {
    /// Move the watcher to `next`, keeping directories present in both.
    fn apply(&mut self, next: Vec<WatchTarget>) -> notify::Result<()> {
        let (removed, added) = diff_targets(&self.targets, &next);
        for target in &removed {
            if let Err(e) = self.watcher.unwatch(&target.path) {
                tracing::debug!(path = %target.path.display(), error = %e, "failed to unwatch");
            }
            tracing::debug!(path = %target.path.display(), "stopped watching directory");
        }
        for target in &added {
            let mode = if target.recursive {
                RecursiveMode::Recursive
            } else {
                RecursiveMode::NonRecursive
            };
            self.watcher.watch(&target.path, mode)?;
            tracing::debug!(
                path = %target.path.display(),
                recursive = target.recursive,
                "watching directory"
            );
        }
        self.targets = next;
        Ok(())
    }
}

/// Shared between the ticker and rebuild tasks.
struct WatchState {
    scheduler: WatchScheduler,
    watch_set: Mutex<WatchSet>,
    output_dir: RwLock<PathBuf>,
}

fn load_config(options: &BuildOptions) -> Result<Config> {
    if options.env_overrides {
        Config::load_with_env(&options.config_file.path)
    } else {
        Config::load_file(&options.config_file)
    }
    .wrap_err("Failed to load configuration")
}

/// Run the watch command.
///
/// Builds once, then rebuilds after every settled burst of changes until
/// Ctrl+C. A failed initial build aborts; failed rebuilds are logged and the
/// loop keeps running. After each rebuild the config is read again so the
/// watched directories follow edits to it. Only the initial build is
/// archived.
pub async fn run(mut options: BuildOptions) -> Result<()> {
    options.enable_watch = true;
    tracing::info!(config = %options.config_file.path.display(), "Starting watch mode");

    let config = load_config(&options)?;
    let stats = super::build::run(&options)?;
    options.build_archive = false;

    let output_dir = stats.output_dir;
    let (tx, mut rx) = mpsc::channel::<Event>(64);
    let watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    let _ = tx.blocking_send(event);
                }
            }
            Err(e) => tracing::warn!(error = %e, "file watcher error"),
        },
        notify::Config::default(),
    )
    .wrap_err("Failed to create file watcher")?;

    let mut watch_set = WatchSet {
        watcher,
        targets: Vec::new(),
    };
    watch_set
        .apply(watched_dirs(&config, &options.root, &options.config_file.path, &output_dir))
        .wrap_err("Failed to watch source directories")?;

    let state = Arc::new(WatchState {
        scheduler: WatchScheduler::new(Duration::from_millis(config.watch.debounce_ms)),
        watch_set: Mutex::new(watch_set),
        output_dir: RwLock::new(output_dir),
    });

    let events = {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let output_dir = state.output_dir.read().clone();
                if event.paths.iter().any(|p| is_relevant_path(p, &output_dir)) {
                    tracing::debug!(kind = ?event.kind, paths = ?event.paths, "change detected");
                    state.scheduler.gate().notify(Instant::now());
                }
            }
        })
    };

    let mut ticker = tokio::time::interval(Duration::from_millis(config.watch.tick_ms.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    println!("  Watching for changes, press Ctrl+C to stop");
    println!();

    loop {
        tokio::select! {
            res = &mut shutdown => {
                res.wrap_err("Failed to listen for Ctrl+C")?;
                tracing::info!("Stopping watch mode");
                break;
            }
            _ = ticker.tick() => {
                if !state.scheduler.gate().ready(Instant::now()) {
                    continue;
                }

                let task_state = Arc::clone(&state);
                let options = options.clone();
                let handle = tokio::task::spawn_blocking(move || rebuild(&task_state, &options));
                tokio::spawn(async move {
                    if let Err(e) = handle.await {
                        tracing::error!(error = %e, "rebuild task failed");
                        eprintln!("  ✗ Rebuild task failed: {e}");
                    }
                });
            }
        }
    }

    events.abort();
    Ok(())
}

fn rebuild(state: &WatchState, options: &BuildOptions) {
    match state.scheduler.tick(Instant::now(), || generate(options)) {
        TickOutcome::Generated(Ok(stats)) => {
            println!(
                "  ✓ Rebuilt {} files in {}ms",
                stats.outputs, stats.duration_ms
            );
            *state.output_dir.write() = stats.output_dir.clone();
            refresh_watched(state, options, &stats.output_dir);
        }
        TickOutcome::Generated(Err(e)) => {
            tracing::error!(error = %e, "rebuild failed");
            eprintln!("  ✗ Rebuild failed: {e}");
        }
        TickOutcome::Busy => {
            tracing::info!("previous rebuild still running, change stays pending");
        }
        TickOutcome::Idle | TickOutcome::Debouncing => {}
    }
}

/// Re-read the config and move the watcher to its directories.
fn refresh_watched(state: &WatchState, options: &BuildOptions, output_dir: &Path) {
    let config = match load_config(options) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "keeping watched directories");
            return;
        }
    };

    let next = watched_dirs(&config, &options.root, &options.config_file.path, output_dir);
    if let Err(e) = state.watch_set.lock().apply(next) {
        tracing::warn!(error = %e, "failed to update watched directories");
    }
}
