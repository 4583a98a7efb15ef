//! Best-effort cleanup of overlay config files on abnormal exit.
//!
//! Signal and panic cleanup deletes overlay files only. The gateway
//! subprocess is deliberately left running: it is a host-machine-scoped
//! singleton that later invocations of this program (or other programs
//! entirely) are expected to discover and reuse.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static OVERLAY_REGISTRY: OnceLock<Mutex<HashSet<PathBuf>>> = OnceLock::new();

fn registry() -> &'static Mutex<HashSet<PathBuf>> {
    OVERLAY_REGISTRY.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Track an overlay file for deletion on signal/panic exit.
pub fn register_overlay(path: &Path) {
    registry().lock().insert(path.to_path_buf());
}

/// Stop tracking an overlay (its owner is deleting it itself).
pub fn unregister_overlay(path: &Path) {
    registry().lock().remove(path);
}

/// Delete every registered overlay file. Idempotent, best-effort.
pub fn cleanup_overlays() {
    let paths: Vec<PathBuf> = registry().lock().drain().collect();
    for path in paths {
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!("Removed overlay config {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove overlay {}: {}", path.display(), e),
        }
    }
}

/// Install a panic hook that removes overlay files before the default hook
/// re-raises. Call once at startup.
pub fn install_panic_cleanup() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        cleanup_overlays();
        previous(info);
    }));
}

/// Spawn background listeners for interrupt/terminate/hangup that remove
/// overlay files and then exit. Never touches the gateway subprocess.
#[cfg(unix)]
pub fn install_signal_cleanup() {
    use tokio::signal::unix::{signal, SignalKind};

    for kind in [
        SignalKind::interrupt(),
        SignalKind::terminate(),
        SignalKind::hangup(),
    ] {
        tokio::spawn(async move {
            let Ok(mut stream) = signal(kind) else {
                return;
            };
            stream.recv().await;
            tracing::info!("Signal received, removing overlay configs and exiting");
            cleanup_overlays();
            std::process::exit(130);
        });
    }
}

#[cfg(not(unix))]
pub fn install_signal_cleanup() {
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            cleanup_overlays();
            std::process::exit(130);
        }
    });
}
