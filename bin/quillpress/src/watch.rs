//! Rebuild scheduling for watch mode.
//!
//! A [`WatchScheduler`] is shared between the file event task and the ticker
//! task. Events push the [`DebounceGate`] forward; each tick runs at most one
//! generation pass once the gate has settled, guarded by a
//! [`GenerationPermit`] so passes never overlap.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use quillpress_core::Config;
use tracing::debug;

/// Holds the earliest time a pending change may be rebuilt.
#[derive(Debug)]
pub struct DebounceGate {
    window: Duration,
    next: Mutex<Option<Instant>>,
}

impl DebounceGate {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            next: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Record a change; pushes the gate to `now + window`.
    pub fn notify(&self, now: Instant) {
        *self.next.lock() = Some(now + self.window);
    }

    /// Whether a change is waiting to be rebuilt.
    pub fn is_pending(&self) -> bool {
        self.next.lock().is_some()
    }

    /// A change is pending and the window has passed.
    pub fn ready(&self, now: Instant) -> bool {
        self.next.lock().is_some_and(|at| now >= at)
    }

    /// Clear the gate if it is ready. Returns whether it was.
    ///
    /// Changes recorded after this call schedule another pass.
    pub fn take_ready(&self, now: Instant) -> bool {
        let mut next = self.next.lock();
        match *next {
            Some(at) if now >= at => {
                *next = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending change.
    pub fn reset(&self) {
        *self.next.lock() = None;
    }
}

/// Non-blocking token allowing one generation pass at a time.
#[derive(Debug, Default)]
pub struct GenerationPermit {
    busy: AtomicBool,
}

impl GenerationPermit {
    pub fn try_acquire(&self) -> Option<PermitGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| PermitGuard { permit: self })
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// Releases the permit on drop.
#[derive(Debug)]
pub struct PermitGuard<'a> {
    permit: &'a GenerationPermit,
}

impl Drop for PermitGuard<'_> {
    fn drop(&mut self) {
        self.permit.busy.store(false, Ordering::Release);
    }
}

/// What a scheduler tick did.
#[derive(Debug, PartialEq, Eq)]
pub enum TickOutcome<T> {
    /// Nothing changed since the last pass.
    Idle,
    /// Changes are still arriving.
    Debouncing,
    /// A pass is already running; the change stays pending.
    Busy,
    /// A pass ran.
    Generated(T),
}

/// Shared watch state: the debounce gate and the generation permit.
#[derive(Debug)]
pub struct WatchScheduler {
    gate: DebounceGate,
    permit: GenerationPermit,
}

impl WatchScheduler {
    #[must_use]
    pub fn new(window: Duration) -> Self {
        Self {
            gate: DebounceGate::new(window),
            permit: GenerationPermit::default(),
        }
    }

    pub fn gate(&self) -> &DebounceGate {
        &self.gate
    }

    pub fn permit(&self) -> &GenerationPermit {
        &self.permit
    }

    /// Run `generate` if a settled change is pending and no pass is running.
    pub fn tick<T>(&self, now: Instant, generate: impl FnOnce() -> T) -> TickOutcome<T> {
        if !self.gate.is_pending() {
            return TickOutcome::Idle;
        }
        if !self.gate.ready(now) {
            return TickOutcome::Debouncing;
        }

        let Some(_guard) = self.permit.try_acquire() else {
            debug!("generation already running, skipping tick");
            return TickOutcome::Busy;
        };
        if !self.gate.take_ready(now) {
            return TickOutcome::Debouncing;
        }

        TickOutcome::Generated(generate())
    }
}

/// A directory to watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchTarget {
    pub path: PathBuf,
    pub recursive: bool,
}

/// Directories whose changes trigger a rebuild.
///
/// The content, theme and static asset directories are watched recursively.
/// The directory holding the config file is watched on its own, so the output
/// directory usually living beside it is not. Any target that is the output
/// directory or lies inside it is dropped, as are targets that do not exist.
pub fn watched_dirs(
    config: &Config,
    root: &Path,
    config_file: &Path,
    output_dir: &Path,
) -> Vec<WatchTarget> {
    let output = normalize(output_dir);

    let mut candidates: Vec<WatchTarget> = [config.content_dir(root), config.theme_dir(root)]
        .into_iter()
        .chain(config.build.static_assets_dir.iter().map(|dir| root.join(dir)))
        .map(|path| WatchTarget {
            path,
            recursive: true,
        })
        .collect();

    let config_parent = config_file
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    candidates.push(WatchTarget {
        path: config_parent,
        recursive: false,
    });

    let mut targets: Vec<WatchTarget> = Vec::new();
    for target in candidates {
        if !target.path.is_dir() {
            debug!(path = %target.path.display(), "watch target does not exist, skipping");
            continue;
        }
        if normalize(&target.path).starts_with(&output) {
            debug!(path = %target.path.display(), "skipping output directory");
            continue;
        }
        if !targets.iter().any(|t| normalize(&t.path) == normalize(&target.path)) {
            targets.push(target);
        }
    }
    targets
}

/// Targets to stop watching and targets to start watching when the watched
/// set moves from `current` to `next`.
///
/// A target whose recursion mode changes appears in both lists.
pub fn diff_targets(
    current: &[WatchTarget],
    next: &[WatchTarget],
) -> (Vec<WatchTarget>, Vec<WatchTarget>) {
    let removed = current.iter().filter(|t| !next.contains(t)).cloned().collect();
    let added = next.iter().filter(|t| !current.contains(t)).cloned().collect();
    (removed, added)
}

/// Whether a changed path should schedule a rebuild.
pub fn is_relevant_path(path: &Path, output_dir: &Path) -> bool {
    if quillpress_generator::is_temp_file(path) {
        return false;
    }
    !(path.starts_with(output_dir) || normalize(path).starts_with(normalize(output_dir)))
}

fn normalize(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
