//! Filesystem change monitoring for the authorization store paths.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

use crate::store::{StoreSet, RULE_FILE_EXTENSION};

/// Watches the top-level authorization store paths from a background thread.
///
/// The watch is coarse: a modification signature covering the top-levels,
/// their direct subdirectories and the rule files inside is sampled on an
/// interval, and any difference purges and rebuilds the whole store set.
/// The swap happens under the store-set lock, so a query observes either the
/// entirely-old or the entirely-new set. Each rebuild emits one notification
/// on `events`. Dropping the monitor stops the thread.
#[derive(Debug)]
pub struct StoreMonitor {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl StoreMonitor {
    pub fn spawn(
        paths: Vec<PathBuf>,
        stores: Arc<RwLock<StoreSet>>,
        interval: Duration,
        events: Sender<()>,
    ) -> StoreMonitor {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        for path in &paths {
            tracing::debug!(path = %path.display(), "monitoring for changes");
        }

        let handle = std::thread::spawn(move || {
            let mut last = signature(&paths);
            while !thread_stop.load(Ordering::Relaxed) {
                sleep_while_running(interval, &thread_stop);
                if thread_stop.load(Ordering::Relaxed) {
                    break;
                }
                let current = signature(&paths);
                if current != last {
                    tracing::debug!("authorization store change detected, rebuilding");
                    let rebuilt = StoreSet::build(&paths);
                    *stores.write().unwrap_or_else(PoisonError::into_inner) = rebuilt;
                    last = current;
                    let _ = events.send(());
                }
            }
        });

        StoreMonitor {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for StoreMonitor {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Sleep for `interval` in short ticks so a stop request is honored
/// promptly.
fn sleep_while_running(interval: Duration, stop: &AtomicBool) {
    let tick = interval.min(Duration::from_millis(100)).max(Duration::from_millis(1));
    let mut waited = Duration::ZERO;
    while waited < interval && !stop.load(Ordering::Relaxed) {
        std::thread::sleep(tick);
        waited += tick;
    }
}

/// Modification times of everything that feeds the store set: the top-level
/// directories, their direct subdirectories, and the rule files inside.
fn signature(paths: &[PathBuf]) -> Vec<(PathBuf, Option<SystemTime>)> {
    let wanted = RULE_FILE_EXTENSION.trim_start_matches('.');
    let mut sig = Vec::new();

    for toplevel in paths {
        sig.push((toplevel.clone(), mtime(toplevel)));
        let Ok(entries) = fs::read_dir(toplevel) else {
            continue;
        };
        for entry in entries.flatten() {
            let dir = entry.path();
            if !dir.is_dir() {
                continue;
            }
            sig.push((dir.clone(), mtime(&dir)));
            let Ok(files) = fs::read_dir(&dir) else {
                continue;
            };
            for file in files.flatten() {
                let path = file.path();
                if path.extension().map(|ext| ext == wanted).unwrap_or(false) {
                    sig.push((path.clone(), mtime(&path)));
                }
            }
        }
    }

    sig.sort();
    sig
}

fn mtime(path: &std::path::Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
